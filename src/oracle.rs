use crate::*;
use std::hash::Hasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HopNode {
    Source,
    Wire(i32, i32, WireId),
    Sink(i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleMode {
    /// Hop counts, U-turn relaxed counts, shortest paths and multiplicity caps.
    Full,
    /// Hop counts only, for auditing patterns.
    CheckOnly,
}

/// Canonical shortest paths of one offset, as wire sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetPaths {
    Enumerated(Vec<Vec<WireId>>),
    /// More than the enumeration threshold; only the (saturated) count is kept.
    TooMany(usize),
}

impl OffsetPaths {
    pub fn count(&self) -> usize {
        match self {
            OffsetPaths::Enumerated(paths) => paths.len(),
            OffsetPaths::TooMany(n) => *n,
        }
    }
}

/// Builds the offset graph: wire nodes for every window coordinate, a sink at each
/// segment endpoint and one source feeding the wires that start at the origin.
/// `edge_allowed(u, v)` decides whether wire `u` may continue into wire `v`.
fn build_offset_graph(
    alphabet: &WireAlphabet,
    window: Coord,
    coords: &[Coord],
    edge_allowed: impl Fn(WireId, WireId) -> bool,
) -> DiGraph<HopNode> {
    let n = alphabet.len();
    let mut g = DiGraph::with_capacity(coords.len() * (n + 1), coords.len() * n * (n + 1));
    g.add_node(HopNode::Source);
    for &(x, y) in coords {
        if x.abs() > window.0 || y.abs() > window.1 {
            continue;
        }
        for (u, wire) in alphabet.iter() {
            let (dx, dy) = wire.offset();
            let node = HopNode::Wire(x, y, u);
            g.add_edge(node, HopNode::Sink(x + dx, y + dy));
            for v in alphabet.ids() {
                if edge_allowed(u, v) {
                    g.add_edge(node, HopNode::Wire(x + dx, y + dy, v));
                }
            }
            if (x, y) == (0, 0) {
                g.add_edge(HopNode::Source, node);
            }
        }
    }
    debug!(
        target: "internal",
        "offset graph: {} nodes, {} edges",
        g.node_count(),
        g.edge_count()
    );
    g
}

fn window_coords(window: Coord) -> Vec<Coord> {
    (-window.0..=window.0)
        .cartesian_product(-window.1..=window.1)
        .collect()
}

/// Hop-distance lower bounds for every offset of a bounded window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopOracle {
    alphabet: WireAlphabet,
    window: Coord,
    mode: OracleMode,
    index_threshold: usize,
    hops: IndexMap<Coord, u32>,
    unreachable: Vec<Coord>,
    relaxed_hops: Dict<Coord, u32>,
    paths: Dict<Coord, OffsetPaths>,
    max_counts: Dict<(WireId, Coord), u32>,
}

#[bon]
impl HopOracle {
    #[time("Compute optimal hop counts")]
    #[builder]
    pub fn build(
        alphabet: &WireAlphabet,
        window: Option<Coord>,
        #[builder(default = OracleMode::Full)] mode: OracleMode,
        #[builder(default = 100)] index_threshold: usize,
    ) -> Self {
        let window = window.unwrap_or_else(|| alphabet.default_window());
        let coords = window_coords(window);
        let graph = build_offset_graph(alphabet, window, &coords, |u, v| {
            !is_u_turn(alphabet, u, v)
        });
        let dist = graph.hop_distances(&HopNode::Source);
        let sink_hops = |g: &DiGraph<HopNode>, dist: &[Option<usize>], c: Coord| {
            g.index_of(&HopNode::Sink(c.0, c.1))
                .and_then(|idx| dist[idx.index()])
                .map(|d| (d - 1) as u32)
        };

        let mut hops = IndexMap::default();
        let mut unreachable = Vec::new();
        for &c in coords.iter().filter(|&&c| c != (0, 0)) {
            match sink_hops(&graph, &dist, c) {
                Some(h) => {
                    hops.insert(c, h);
                }
                None => unreachable.push(c),
            }
        }
        if !unreachable.is_empty() {
            warn!(
                "{} of {} offsets are unreachable with the current wire alphabet",
                unreachable.len(),
                coords.len() - 1
            );
        }

        let mut oracle = Self {
            alphabet: alphabet.clone(),
            window,
            mode,
            index_threshold,
            hops,
            unreachable,
            relaxed_hops: Dict::new(),
            paths: Dict::new(),
            max_counts: Dict::new(),
        };
        if mode == OracleMode::CheckOnly {
            return oracle;
        }

        let relaxed = build_offset_graph(alphabet, window, &coords, |_, _| true);
        let relaxed_dist = relaxed.hop_distances(&HopNode::Source);
        for &c in coords.iter().filter(|&&c| c != (0, 0)) {
            if let Some(h) = sink_hops(&relaxed, &relaxed_dist, c) {
                oracle.relaxed_hops.insert(c, h);
            }
        }

        let counts = graph.count_shortest_paths(&dist, index_threshold + 1);
        for &c in oracle.hops.keys() {
            let Some(sink) = graph.index_of(&HopNode::Sink(c.0, c.1)) else {
                continue;
            };
            let n = counts[sink.index()];
            let entry = if n <= index_threshold {
                let paths = graph
                    .shortest_paths_to(&dist, sink)
                    .into_iter()
                    .map(|p| {
                        p.into_iter()
                            .filter_map(|idx| match graph.key(idx) {
                                HopNode::Wire(_, _, w) => Some(*w),
                                _ => None,
                            })
                            .collect_vec()
                    })
                    .sorted()
                    .collect_vec();
                OffsetPaths::Enumerated(paths)
            } else {
                OffsetPaths::TooMany(n)
            };
            oracle.paths.insert(c, entry);
        }
        oracle.max_counts = oracle.compute_max_counts();
        debug!(
            target: "internal",
            "oracle: {} offsets, {} enumerated",
            oracle.hops.len(),
            oracle
                .paths
                .values()
                .filter(|p| matches!(p, OffsetPaths::Enumerated(_)))
                .count()
        );
        oracle
    }
}

impl HopOracle {
    /// Greedy bound on how often one wire can appear in an optimal realization of each offset.
    fn compute_max_counts(&self) -> Dict<(WireId, Coord), u32> {
        let mut max_counts = Dict::new();
        for (w, wire) in self.alphabet.iter() {
            let (dx, dy) = wire.offset();
            for (&offset, &d) in &self.hops {
                let mut success = 0;
                for i in 1..=d as i32 {
                    let rem = (offset.0 - i * dx, offset.1 - i * dy);
                    let new_d = if rem == (0, 0) {
                        i as u32
                    } else {
                        match self.relaxed_hops.get(&rem) {
                            Some(&h) => i as u32 + h,
                            None => break,
                        }
                    };
                    if new_d > d {
                        break;
                    }
                    success = i as u32;
                }
                max_counts.insert((w, offset), success);
            }
        }
        max_counts
    }

    pub fn alphabet(&self) -> &WireAlphabet {
        &self.alphabet
    }
    pub fn window(&self) -> Coord {
        self.window
    }
    pub fn mode(&self) -> OracleMode {
        self.mode
    }
    pub fn index_threshold(&self) -> usize {
        self.index_threshold
    }
    /// Reachable offsets with their optimal hop counts, in window order.
    pub fn offsets(&self) -> impl Iterator<Item = (Coord, u32)> + '_ {
        self.hops.iter().map(|(c, h)| (*c, *h))
    }
    pub fn hops(&self, offset: Coord) -> Option<u32> {
        self.hops.get(&offset).copied()
    }
    pub fn relaxed_hops(&self, offset: Coord) -> Option<u32> {
        self.relaxed_hops.get(&offset).copied()
    }
    pub fn unreachable(&self) -> &[Coord] {
        &self.unreachable
    }
    pub fn paths(&self, offset: Coord) -> Option<&OffsetPaths> {
        self.paths.get(&offset)
    }
    pub fn max_count(&self, wire: WireId, offset: Coord) -> u32 {
        self.max_counts.get(&(wire, offset)).copied().unwrap_or(0)
    }

    /// Re-derives hop distances using only the switches of `pattern` (any depth).
    #[time("Check hop optimality")]
    pub fn check_pattern(&self, universe: &SwitchUniverse, pattern: &Pattern) -> OptimalityReport {
        let n = self.alphabet.len();
        let mut allowed = vec![false; n * n];
        for id in pattern.iter() {
            let s = universe.switch(id);
            allowed[s.driver * n + s.target] = true;
        }
        let coords = window_coords(self.window);
        let graph = build_offset_graph(&self.alphabet, self.window, &coords, |u, v| {
            allowed[u * n + v]
        });
        let dist = graph.hop_distances(&HopNode::Source);
        let mut report = OptimalityReport::default();
        for (offset, expected) in self.offsets() {
            let observed = graph
                .index_of(&HopNode::Sink(offset.0, offset.1))
                .and_then(|idx| dist[idx.index()])
                .map(|d| (d - 1) as u32);
            report.checked += 1;
            if observed != Some(expected) {
                debug!(
                    target: "internal",
                    "offset {:?}: expected {} hops, observed {:?}",
                    offset,
                    expected,
                    observed
                );
                report.violations.push(HopViolation {
                    offset,
                    expected,
                    observed,
                });
            }
        }
        report
    }

    fn cache_name(
        alphabet: &WireAlphabet,
        window: Coord,
        mode: OracleMode,
        threshold: usize,
    ) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        alphabet.names().hash(&mut hasher);
        window.hash(&mut hasher);
        mode.hash(&mut hasher);
        threshold.hash(&mut hasher);
        format!("oracle_{:016x}.bin", hasher.finish())
    }

    /// Loads a previously built oracle from `store`, building and caching it on a miss.
    pub fn cached(
        store: &file_save::FileStore,
        alphabet: &WireAlphabet,
        window: Option<Coord>,
        mode: OracleMode,
        index_threshold: usize,
    ) -> Result<Self> {
        let window = window.unwrap_or_else(|| alphabet.default_window());
        let name = Self::cache_name(alphabet, window, mode, index_threshold);
        if store.exists(&name) {
            match store.load_binary::<HopOracle>(&name) {
                Ok(oracle) if oracle.alphabet == *alphabet && oracle.window == window => {
                    info!("Loaded hop oracle from {}", store.path_of(&name).display());
                    return Ok(oracle);
                }
                Ok(_) => warn!("stale oracle cache {}, rebuilding", name),
                Err(e) => warn!("unreadable oracle cache {}: {}", name, e),
            }
        }
        let oracle = HopOracle::build()
            .alphabet(alphabet)
            .window(window)
            .mode(mode)
            .index_threshold(index_threshold)
            .call();
        store
            .save_binary(&oracle, &name)
            .map_err(|e| SynthError::serde(store.path_of(&name), e))?;
        Ok(oracle)
    }

    pub fn summary_table(&self) -> Table {
        let mut per_hops: std::collections::BTreeMap<u32, (usize, usize, usize)> = Default::default();
        for (offset, h) in self.offsets() {
            let entry = per_hops.entry(h).or_default();
            entry.0 += 1;
            match self.paths(offset) {
                Some(OffsetPaths::Enumerated(p)) => entry.1 += p.len(),
                Some(OffsetPaths::TooMany(_)) => entry.2 += 1,
                None => {}
            }
        }
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.add_row(row!["Hops", "Offsets", "Enumerated paths", "Lazy offsets"]);
        for (h, (offsets, paths, lazy)) in per_hops {
            table.add_row(row![h, offsets, paths, lazy]);
        }
        table.add_row(row!["unreachable", self.unreachable.len(), "", ""]);
        table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopViolation {
    pub offset: Coord,
    pub expected: u32,
    /// `None` when the offset is disconnected under the pattern.
    pub observed: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimalityReport {
    pub checked: usize,
    pub violations: Vec<HopViolation>,
}

impl OptimalityReport {
    pub fn is_optimal(&self) -> bool {
        self.violations.is_empty()
    }
    /// Relative hop-count excess per violating offset in percent; -100 for a disconnected sink.
    pub fn differences(&self) -> Vec<(Coord, f64)> {
        self.violations
            .iter()
            .map(|v| {
                let diff = match v.observed {
                    Some(o) => (o as f64 - v.expected as f64) / v.expected as f64 * 100.0,
                    None => -100.0,
                };
                (v.offset, diff)
            })
            .collect()
    }
    pub fn into_result(self) -> Result<()> {
        match self.violations.first() {
            None => Ok(()),
            Some(first) => Err(SynthError::HopOptimalityViolated {
                violations: self.violations.len(),
                first: first.offset,
            }),
        }
    }
}
