//! Solver-free audit of a switch set against every feature family.
use crate::*;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCheck {
    pub feature: &'static str,
    /// Whether the configuration asks for this feature.
    pub enforced: bool,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureReport {
    pub checks: Vec<FeatureCheck>,
}

impl FeatureReport {
    pub fn get(&self, feature: &str) -> Option<&FeatureCheck> {
        self.checks.iter().find(|c| c.feature == feature)
    }
    pub fn passed(&self, feature: &str) -> Option<bool> {
        self.get(feature).map(|c| c.passed)
    }
    /// Enforced features that do not hold.
    pub fn failures(&self) -> Vec<&FeatureCheck> {
        self.checks.iter().filter(|c| c.enforced && !c.passed).collect()
    }
    pub fn all_enforced_pass(&self) -> bool {
        self.failures().is_empty()
    }
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.add_row(row!["Feature", "Enforced", "Result", "Detail"]);
        for c in &self.checks {
            let result = match (c.passed, c.enforced) {
                (true, _) => "pass".green(),
                (false, true) => "FAIL".red(),
                (false, false) => "fail".yellow(),
            };
            let enforced = if c.enforced { "yes" } else { "" };
            table.add_row(row![c.feature, enforced, result, c.detail]);
        }
        table
    }
}

fn check(
    feature: &'static str,
    enforced: bool,
    failures: usize,
    total: usize,
    example: Option<String>,
) -> FeatureCheck {
    let mut detail = format!("{} of {} relations broken", failures, total);
    if let Some(example) = example {
        detail.push_str(&format!(", e.g. {}", example));
    }
    FeatureCheck {
        feature,
        enforced,
        passed: failures == 0,
        detail,
    }
}

pub fn check_hop_optimality(
    oracle: &HopOracle,
    universe: &SwitchUniverse,
    pattern: &Pattern,
    enforced: bool,
) -> FeatureCheck {
    let report = oracle.check_pattern(universe, pattern);
    // worst offset; a disconnected sink counts as -100%
    let example = report
        .differences()
        .into_iter()
        .max_by_key(|(_, diff)| OrderedFloat(diff.abs()))
        .map(|(offset, diff)| format!("{:?} at {:+.1}%", offset, diff));
    check("hop_optimality", enforced, report.violations.len(), report.checked, example)
}

pub fn check_symmetry(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    kind: SymmetryKind,
    enforced: bool,
) -> FeatureCheck {
    let pairs = symmetry_pairs(universe, kind);
    let broken = pairs.iter().filter(|p| !p.holds(pattern)).collect_vec();
    let example = broken.first().map(|p| universe.describe(p.switch));
    let feature = match kind {
        SymmetryKind::External => "external_symmetry",
        SymmetryKind::Internal => "internal_symmetry",
    };
    check(feature, enforced, broken.len(), pairs.len(), example)
}

pub fn check_coverage(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    kind: CoverageKind,
    enforced: bool,
) -> FeatureCheck {
    let groups = coverage_groups(universe, kind);
    let broken = groups.iter().filter(|g| !g.holds(pattern)).collect_vec();
    let example = broken.first().map(|g| universe.wire_name(g.wire).to_string());
    check(kind.name(), enforced, broken.len(), groups.len(), example)
}

/// Every wire's fan on `side` equals `value`.
pub fn check_fan_exact(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    side: FanSide,
    value: u32,
    enforced: bool,
) -> FeatureCheck {
    let sizes = fan_sizes(universe, pattern, side);
    let broken = sizes.iter().positions(|&s| s != value as usize).collect_vec();
    let example = broken
        .first()
        .map(|&w| format!("{} has {}", universe.wire_name(w), sizes[w]));
    let feature = match side {
        FanSide::In => "fanin",
        FanSide::Out => "fanout",
    };
    check(feature, enforced, broken.len(), sizes.len(), example)
}

/// At most `limit` distinct fan sizes, all drawn from `allowed`.
pub fn check_size_diversity(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    side: FanSide,
    allowed: &[u32],
    limit: u32,
) -> FeatureCheck {
    let sizes = fan_sizes(universe, pattern, side);
    let distinct = sizes.iter().copied().sorted().dedup().collect_vec();
    let illegal = distinct
        .iter()
        .filter(|&&s| !allowed.contains(&(s as u32)))
        .count();
    let too_many = limit > 0 && distinct.len() > limit as usize;
    FeatureCheck {
        feature: match side {
            FanSide::In => "mux_size_number",
            FanSide::Out => "fanout_size_number",
        },
        enforced: limit > 0,
        passed: !too_many && (limit == 0 || illegal == 0),
        detail: format!("sizes {:?}, {} outside the allowed set", distinct, illegal),
    }
}

pub fn check_pair_share(universe: &SwitchUniverse, pattern: &Pattern, k: u32) -> FeatureCheck {
    let mut covered = vec![k == 0; universe.alphabet().len()];
    for pair in shared_input_pairs(universe) {
        if pair.shared_in(pattern) >= k as usize {
            covered[pair.a] = true;
            covered[pair.b] = true;
        }
    }
    let broken = covered.iter().positions(|c| !c).collect_vec();
    let example = broken.first().map(|&w| universe.wire_name(w).to_string());
    check("mux_pair_input_share", k > 0, broken.len(), covered.len(), example)
}

pub fn check_max_switches(pattern: &Pattern, limit: u32) -> FeatureCheck {
    FeatureCheck {
        feature: "max_switch_number",
        enforced: limit > 0,
        passed: limit == 0 || pattern.len() <= limit as usize,
        detail: format!("{} switches, limit {}", pattern.len(), limit),
    }
}

pub fn check_opposite(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    enforced: bool,
) -> FeatureCheck {
    let pairs = opposite_pairs(universe);
    let broken = pairs
        .iter()
        .filter(|(a, b)| pattern.contains(*a) && pattern.contains(*b))
        .collect_vec();
    let example = broken.first().map(|(a, _)| universe.describe(*a));
    check("prohibit_opposite", enforced, broken.len(), pairs.len(), example)
}

pub fn check_length_order(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    order: LengthOrder,
) -> FeatureCheck {
    let alphabet = universe.alphabet();
    let broken = pattern
        .iter()
        .filter(|&id| {
            let s = universe.switch(id);
            let (d, t) = (alphabet.get(s.driver), alphabet.get(s.target));
            d.axis() == t.axis()
                && match order {
                    LengthOrder::Free => false,
                    LengthOrder::NonIncreasing => t.length() > d.length(),
                    LengthOrder::NonDecreasing => t.length() < d.length(),
                }
        })
        .collect_vec();
    let example = broken.first().map(|&id| universe.describe(id));
    check("length_order", order != LengthOrder::Free, broken.len(), pattern.len(), example)
}

pub fn check_replica_limit(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    limit: u32,
) -> FeatureCheck {
    let mut counts: IndexMap<(WireId, WireId), usize> = IndexMap::default();
    for id in pattern.iter() {
        let s = universe.switch(id);
        *counts.entry((s.driver, s.target)).or_default() += 1;
    }
    let broken = counts
        .iter()
        .filter(|(_, n)| limit > 0 && **n > limit as usize)
        .collect_vec();
    let example = broken
        .first()
        .map(|((d, t), n)| format!("{} -> {} x{}", universe.wire_name(*d), universe.wire_name(*t), n));
    check("limit_lut_offset_replicas", limit > 0, broken.len(), counts.len(), example)
}

pub fn check_uniform_fan(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    side: FanSide,
    mode: UniformFan,
) -> FeatureCheck {
    let sizes = fan_sizes(universe, pattern, side);
    let alphabet = universe.alphabet();
    let groups = sizes
        .iter()
        .enumerate()
        .into_group_map_by(|(w, _)| match mode {
            UniformFan::WithinAxis => Some(alphabet.get(*w).axis()),
            _ => None,
        });
    let broken = groups
        .values()
        .filter(|g| g.iter().map(|(_, s)| **s).unique().count() > 1)
        .count();
    FeatureCheck {
        feature: match side {
            FanSide::In => "uniform_fanin",
            FanSide::Out => "uniform_fanout",
        },
        enforced: mode != UniformFan::Off,
        passed: broken == 0,
        detail: format!("{} of {} groups with differing sizes", broken, groups.len()),
    }
}

/// Recomputes every feature relation on `pattern`. Hop optimality is only audited when an
/// oracle is given. Pure: the same inputs always give the same report.
#[time("Verify pattern")]
pub fn verify_pattern(
    config: &ResolvedConfig,
    universe: &SwitchUniverse,
    oracle: Option<&HopOracle>,
    pattern: &Pattern,
) -> FeatureReport {
    let mut checks = Vec::new();
    if let Some(oracle) = oracle {
        checks.push(check_hop_optimality(oracle, universe, pattern, config.enforce_hop_optimality));
    }
    checks.push(check_fan_exact(
        universe,
        pattern,
        FanSide::In,
        config.fanin,
        config.enforce_fanin,
    ));
    checks.push(check_fan_exact(
        universe,
        pattern,
        FanSide::Out,
        config.fanout,
        config.enforce_fanout,
    ));
    checks.push(check_size_diversity(
        universe,
        pattern,
        FanSide::In,
        &config.allowed_mux_sizes,
        config.limit_mux_size_number,
    ));
    checks.push(check_size_diversity(
        universe,
        pattern,
        FanSide::Out,
        &config.allowed_fanout_sizes,
        config.limit_fanout_size_number,
    ));
    checks.push(check_uniform_fan(universe, pattern, FanSide::In, config.uniform_fanin));
    checks.push(check_uniform_fan(universe, pattern, FanSide::Out, config.uniform_fanout));
    checks.push(check_pair_share(universe, pattern, config.mux_pair_input_share));
    checks.push(check_max_switches(pattern, config.max_switch_number));
    let symmetry = [
        (SymmetryKind::External, config.enforce_external_symmetry),
        (SymmetryKind::Internal, config.enforce_internal_symmetry),
    ];
    for (kind, enforced) in symmetry {
        checks.push(check_symmetry(universe, pattern, kind, enforced));
    }
    let coverage = [
        (CoverageKind::Continuation, config.enforce_continuation),
        (CoverageKind::RelaxedContinuation, config.enforce_relaxed_continuation),
        (CoverageKind::TwoTurns, config.enforce_two_turns),
        (CoverageKind::OneTurn, config.enforce_one_turn),
    ];
    for (kind, enforced) in coverage {
        checks.push(check_coverage(universe, pattern, kind, enforced));
    }
    checks.push(check_opposite(universe, pattern, config.prohibit_opposite));
    checks.push(check_length_order(universe, pattern, config.length_order));
    checks.push(check_replica_limit(universe, pattern, config.limit_lut_offset_replicas));
    FeatureReport { checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(wires: &[&str]) -> ResolvedConfig {
        SynthConfig::builder()
            .wires(wires.iter().map(|w| w.to_string()).collect())
            .max_depth(0)
            .fanin(1)
            .fanout(1)
            .build()
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_two_hop_chain() {
        let config = config(&["H1_R_0"]);
        let universe = config.universe();
        let oracle = HopOracle::build()
            .alphabet(config.alphabet())
            .window((2, 0))
            .mode(OracleMode::CheckOnly)
            .call();
        assert_eq!(oracle.hops((2, 0)), Some(2));
        let chain = Pattern::from_ids([0]);
        let report = verify_pattern(&config, &universe, Some(&oracle), &chain);
        assert_eq!(report.passed("hop_optimality"), Some(true));
        assert!(report.all_enforced_pass());

        let empty = Pattern::default();
        let report = verify_pattern(&config, &universe, Some(&oracle), &empty);
        assert_eq!(report.passed("hop_optimality"), Some(false));
        assert!(!report.all_enforced_pass());
    }
    #[test]
    fn test_verifier_is_idempotent() {
        let config = config(&["H1_L_0", "H1_R_0", "V1_U_0", "V1_D_0"]);
        let universe = config.universe();
        let pattern = Pattern::from_ids(universe.ids().step_by(3));
        let a = verify_pattern(&config, &universe, None, &pattern);
        let b = verify_pattern(&config, &universe, None, &pattern);
        assert_eq!(a, b);
        assert!(a.get("hop_optimality").is_none());
    }
    #[test]
    fn test_symmetry_closure() {
        let config = config(&["H1_L_0", "H1_R_0", "V1_U_0", "V1_D_0"]);
        let universe = config.universe();
        let pairs = symmetry_pairs(&universe, SymmetryKind::External);
        let seed = pairs[0];
        let closed = Pattern::from_ids([Some(seed.switch), seed.partner].into_iter().flatten());
        assert!(check_symmetry(&universe, &closed, SymmetryKind::External, true).passed);
        let open = Pattern::from_ids([seed.switch]);
        assert!(!check_symmetry(&universe, &open, SymmetryKind::External, true).passed);
    }
    #[test]
    fn test_fan_and_coverage_checks() {
        let config = config(&["H1_L_0", "H1_R_0", "V1_U_0", "V1_D_0"]);
        let universe = config.universe();
        let continuation = Pattern::from_ids(
            universe
                .alphabet()
                .ids()
                .flat_map(|w| universe.family(w, w)),
        );
        let report = verify_pattern(&config, &universe, None, &continuation);
        assert_eq!(report.passed("fanin"), Some(true));
        assert_eq!(report.passed("fanout"), Some(true));
        assert_eq!(report.passed("continuation"), Some(true));
        assert_eq!(report.passed("two_turns"), Some(false));
        assert_eq!(report.passed("uniform_fanin"), Some(true));
        assert_eq!(report.passed("prohibit_opposite"), Some(true));
        assert!(report.all_enforced_pass());
        assert!(!check_max_switches(&continuation, 3).passed);
    }
}
