use crate::*;

const EDGE_PREFIX: &str = "potential_edge";
const USAGE_SENTINEL: &str = "Edge-splitter costs:";

static USAGE_LINE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^[^(]*\(([^)]*)\)[^(]*\(([^)]*)\)").expect("usage line pattern")
});

// --------------------------------------------------------------------------------
// ### Switch token grammar
// --------------------------------------------------------------------------------

fn tap_suffix(wire: &Wire) -> &'static str {
    match wire.axis() {
        Axis::V => "_tap_0",
        Axis::H => "",
    }
}

/// `potential_edge__V1_U_0_tap_0__lutm1_H2_R_0`
pub fn switch_token(universe: &SwitchUniverse, id: SwitchId) -> String {
    let s = universe.switch(id);
    let alphabet = universe.alphabet();
    let (driver, target) = (alphabet.get(s.driver), alphabet.get(s.target));
    format!(
        "{}__{}{}__lut{}_{}{}",
        EDGE_PREFIX,
        driver,
        tap_suffix(driver),
        signed_tag(s.depth),
        target,
        tap_suffix(target)
    )
}

/// Parses a token into its (driver name, target name, depth) parts.
pub fn parse_token(token: &str) -> Option<(String, String, i32)> {
    let mut parts = token.split("__");
    let (prefix, driver, target) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || !prefix.ends_with(EDGE_PREFIX) {
        return None;
    }
    let driver = driver.split("_tap").next()?;
    let (lut, target) = target.split_once('_')?;
    let target = target.split("_tap").next()?;
    let depth = parse_signed_tag(lut.strip_prefix("lut")?)?;
    Some((driver.to_string(), target.to_string(), depth))
}

pub fn resolve_token(universe: &SwitchUniverse, token: &str) -> Option<SwitchId> {
    let (driver, target, depth) = parse_token(token)?;
    let alphabet = universe.alphabet();
    universe.lookup(&Switch::new(
        alphabet.find(&driver)?,
        alphabet.find(&target)?,
        depth,
    ))
}

// --------------------------------------------------------------------------------
// ### Patterns
// --------------------------------------------------------------------------------

/// A sorted, duplicate-free switch selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    switches: Vec<SwitchId>,
}

impl Pattern {
    pub fn from_ids(ids: impl IntoIterator<Item = SwitchId>) -> Self {
        let mut switches = ids.into_iter().collect_vec();
        switches.sort_unstable();
        switches.dedup();
        Self { switches }
    }
    pub fn contains(&self, id: SwitchId) -> bool {
        self.switches.binary_search(&id).is_ok()
    }
    pub fn len(&self) -> usize {
        self.switches.len()
    }
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.switches.iter().copied()
    }
    pub fn ids(&self) -> &[SwitchId] {
        &self.switches
    }
    pub fn overlap(&self, other: &Pattern) -> usize {
        self.iter().filter(|&id| other.contains(id)).count()
    }
    pub fn any_of(&self, ids: &[SwitchId]) -> bool {
        ids.iter().any(|&id| self.contains(id))
    }
}

/// One line per present switch: `token usage`, or `token adopted` when the log never saw it.
pub fn render_pattern(universe: &SwitchUniverse, pattern: &Pattern, usage: &UsageTable) -> String {
    pattern
        .iter()
        .map(|id| match usage.get(id) {
            Some(u) => format!("{} {}", switch_token(universe, id), u.cur),
            None => format!("{} adopted", switch_token(universe, id)),
        })
        .join("\n")
}

/// Lists the whole universe, prefixing switches absent from `pattern` with `~`.
pub fn render_final_pattern(universe: &SwitchUniverse, pattern: &Pattern) -> String {
    universe
        .ids()
        .map(|id| {
            let token = switch_token(universe, id);
            if pattern.contains(id) {
                token
            } else {
                format!("~{}", token)
            }
        })
        .join("\n")
}

/// Reads a stored pattern; `~` lines are explicit absences and contribute nothing.
pub fn parse_pattern(universe: &SwitchUniverse, text: &str, origin: &str) -> Result<Pattern> {
    let mut ids = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        if token.starts_with('~') {
            continue;
        }
        let id = resolve_token(universe, token).ok_or_else(|| {
            SynthError::parse(origin, lineno + 1, format!("`{}` is not a legal switch", token))
        })?;
        ids.push(id);
    }
    Ok(Pattern::from_ids(ids))
}

pub fn read_pattern(universe: &SwitchUniverse, path: &Path) -> Result<Pattern> {
    let text = fs::read_to_string(path).map_err(|e| SynthError::io(path, e))?;
    parse_pattern(universe, &text, &path.display().to_string())
}

// --------------------------------------------------------------------------------
// ### Traffic logs
// --------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub cur: i64,
    pub hist: i64,
    pub prev: i64,
}

/// Observed per-switch traffic, keyed by universe id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTable {
    entries: IndexMap<SwitchId, Usage>,
}

impl UsageTable {
    pub fn insert(&mut self, id: SwitchId, usage: Usage) {
        self.entries.insert(id, usage);
    }
    pub fn get(&self, id: SwitchId) -> Option<&Usage> {
        self.entries.get(&id)
    }
    pub fn current(&self, id: SwitchId) -> i64 {
        self.entries.get(&id).map_or(0, |u| u.cur)
    }
    pub fn contains(&self, id: SwitchId) -> bool {
        self.entries.contains_key(&id)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Entries in switch order.
    pub fn sorted(&self) -> Vec<(SwitchId, Usage)> {
        self.entries
            .iter()
            .map(|(k, v)| (*k, *v))
            .sorted_by_key(|(k, _)| *k)
            .collect()
    }
    pub fn set_current(&mut self, id: SwitchId, cur: i64) {
        if let Some(u) = self.entries.get_mut(&id) {
            u.cur = cur;
        }
    }
}

/// Parses the usage block that follows the last `Edge-splitter costs:` header.
/// Unrelated lines and switches outside the universe are skipped.
pub fn parse_usage_log(universe: &SwitchUniverse, text: &str) -> UsageTable {
    let lines = text.lines().collect_vec();
    let start = match lines.iter().rposition(|l| l.starts_with(USAGE_SENTINEL)) {
        Some(i) => i + 1,
        None => {
            warn!("no `{}` header found, scanning the whole log", USAGE_SENTINEL);
            0
        }
    };
    let mut table = UsageTable::default();
    let mut skipped = 0;
    for line in &lines[start..] {
        if !line.contains(EDGE_PREFIX) {
            continue;
        }
        let parsed = USAGE_LINE.captures(line).and_then(|caps| {
            let id = resolve_token(universe, caps[1].trim())?;
            let counters = caps[2]
                .split(',')
                .map(|c| c.trim().parse::<i64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .ok()?;
            match counters[..] {
                [cur, hist, prev] => Some((id, Usage { cur, hist, prev })),
                _ => None,
            }
        });
        match parsed {
            Some((id, usage)) => table.insert(id, usage),
            None => skipped += 1,
        }
    }
    debug!(
        "usage log: {} switches parsed, {} lines skipped",
        table.len(),
        skipped
    );
    table
}

pub fn read_usage_log(universe: &SwitchUniverse, path: &Path) -> Result<UsageTable> {
    let text = fs::read_to_string(path).map_err(|e| SynthError::io(path, e))?;
    Ok(parse_usage_log(universe, &text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn universe() -> SwitchUniverse {
        let alphabet =
            WireAlphabet::parse(&["H1_L_0", "H1_R_0", "H2_R_0", "V1_U_0", "V1_D_0"]).unwrap();
        SwitchUniverse::new(alphabet, 1)
    }

    #[test]
    fn test_token_grammar() {
        let u = universe();
        let a = u.alphabet();
        let id = u
            .lookup(&Switch::new(a.find("V1_U_0").unwrap(), a.find("H2_R_0").unwrap(), -1))
            .unwrap();
        let token = switch_token(&u, id);
        assert_eq!(token, "potential_edge__V1_U_0_tap_0__lutm1_H2_R_0");
        assert_eq!(resolve_token(&u, &token), Some(id));
        assert_eq!(resolve_token(&u, "potential_edge__H1_L_0__lutp0_H1_R_0"), None);
    }
    #[test]
    fn test_pattern_round_trip() {
        let u = universe();
        let pattern = Pattern::from_ids([7, 3, 11, 3, 20]);
        let mut usage = UsageTable::default();
        usage.insert(3, Usage { cur: 9, hist: 1, prev: 0 });
        let text = render_pattern(&u, &pattern, &usage);
        assert!(text.lines().any(|l| l.ends_with("adopted")));
        assert_eq!(parse_pattern(&u, &text, "mem").unwrap(), pattern);
        let listing = render_final_pattern(&u, &pattern);
        assert_eq!(listing.lines().count(), u.len());
        assert_eq!(listing.lines().filter(|l| !l.starts_with('~')).count(), 4);
        assert_eq!(parse_pattern(&u, &listing, "mem").unwrap(), pattern);
    }
    #[test]
    fn test_illegal_token_is_error() {
        let u = universe();
        let err = parse_pattern(&u, "\npotential_edge__H1_L_0__lutp0_H1_R_0 3\n", "p.txt");
        assert!(matches!(err, Err(SynthError::Parse { line: 2, .. })));
    }
    #[test]
    fn test_parse_usage_log() {
        let u = universe();
        let log = "\
Edge-splitter costs:
stale (potential_edge__H1_L_0__lutp0_V1_U_0_tap_0) (100, 0, 0)
routing done
Edge-splitter costs:
edge (potential_edge__H1_L_0__lutp0_V1_U_0_tap_0) (5, 2, 1)
edge (potential_edge__H1_R_0__lutp0_H1_L_0) (4, 0, 0)
edge (potential_edge__V1_D_0_tap_0__lutm1_H2_R_0) (7, 3, 3)
garbage line
edge (potential_edge__H1_R_0__lutp1_H2_R_0) (bad, 1, 1)
";
        let table = parse_usage_log(&u, log);
        assert_eq!(table.len(), 2);
        let a = u.alphabet();
        let id = u
            .lookup(&Switch::new(a.find("H1_L_0").unwrap(), a.find("V1_U_0").unwrap(), 0))
            .unwrap();
        assert_eq!(table.get(id), Some(&Usage { cur: 5, hist: 2, prev: 1 }));
    }
}
