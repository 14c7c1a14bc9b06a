//! Feature relations derived from the switch universe, shared by the encoder and the verifier.
use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetryKind {
    /// Wires of opposite directions carry mirrored fanouts.
    External,
    /// Each fanout is mirrored across the driver's own axis.
    Internal,
}

/// Two switches that must be selected together. `partner == None` means the mirror image is
/// not a legal switch, so `switch` itself must stay unselected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymmetryPair {
    pub switch: SwitchId,
    pub partner: Option<SwitchId>,
}

impl SymmetryPair {
    pub fn holds(&self, pattern: &Pattern) -> bool {
        let partner = self.partner.is_some_and(|p| pattern.contains(p));
        pattern.contains(self.switch) == partner
    }
}

fn mirror(universe: &SwitchUniverse, id: SwitchId, kind: SymmetryKind) -> Option<SwitchId> {
    let s = universe.switch(id);
    let alphabet = universe.alphabet();
    let driver_dir = alphabet.get(s.driver).direction();
    let target_dir = alphabet.get(s.target).direction();
    let (driver, target) = match kind {
        SymmetryKind::External => {
            let target = if target_dir == driver_dir {
                alphabet.redirected(s.target, target_dir.opposite())?
            } else {
                s.target
            };
            (alphabet.redirected(s.driver, driver_dir.opposite())?, target)
        }
        SymmetryKind::Internal => {
            let target = if target_dir.axis() != driver_dir.axis() {
                alphabet.redirected(s.target, target_dir.opposite())?
            } else {
                s.target
            };
            (s.driver, target)
        }
    };
    universe.lookup(&Switch::new(driver, target, s.depth))
}

/// Deduplicated mirror pairs; self-symmetric switches are omitted.
pub fn symmetry_pairs(universe: &SwitchUniverse, kind: SymmetryKind) -> Vec<SymmetryPair> {
    let mut pairs = std::collections::BTreeSet::new();
    for id in universe.ids() {
        let pair = match mirror(universe, id, kind) {
            Some(image) if image == id => continue,
            Some(image) => SymmetryPair {
                switch: id.min(image),
                partner: Some(id.max(image)),
            },
            None => SymmetryPair {
                switch: id,
                partner: None,
            },
        };
        pairs.insert(pair);
    }
    pairs.into_iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageKind {
    /// Each wire continues into a replica of itself, at any depth.
    Continuation,
    /// Each wire continues into some wire of its own direction.
    RelaxedContinuation,
    /// Each wire turns into both perpendicular directions.
    TwoTurns,
    /// Each wire turns into at least one perpendicular direction.
    OneTurn,
}

impl CoverageKind {
    pub fn name(self) -> &'static str {
        match self {
            CoverageKind::Continuation => "continuation",
            CoverageKind::RelaxedContinuation => "relaxed_continuation",
            CoverageKind::TwoTurns => "two_turns",
            CoverageKind::OneTurn => "one_turn",
        }
    }
}

/// At least one switch of `switches` must be selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGroup {
    pub wire: WireId,
    pub switches: Vec<SwitchId>,
}

impl CoverageGroup {
    pub fn holds(&self, pattern: &Pattern) -> bool {
        pattern.any_of(&self.switches)
    }
}

pub fn coverage_groups(universe: &SwitchUniverse, kind: CoverageKind) -> Vec<CoverageGroup> {
    let alphabet = universe.alphabet();
    let mut groups = Vec::new();
    for (wire, w) in alphabet.iter() {
        let dir = w.direction();
        match kind {
            CoverageKind::Continuation => groups.push(CoverageGroup {
                wire,
                switches: universe.family(wire, wire),
            }),
            CoverageKind::RelaxedContinuation => groups.push(CoverageGroup {
                wire,
                switches: universe.into_direction(wire, dir),
            }),
            CoverageKind::TwoTurns => {
                for turn in dir.perpendicular() {
                    groups.push(CoverageGroup {
                        wire,
                        switches: universe.into_direction(wire, turn),
                    });
                }
            }
            CoverageKind::OneTurn => {
                let [a, b] = dir.perpendicular();
                let mut switches = universe.into_direction(wire, a);
                switches.extend(universe.into_direction(wire, b));
                switches.sort_unstable();
                groups.push(CoverageGroup { wire, switches });
            }
        }
    }
    groups
}

/// Incoming switches of wires `a < b` that share a driver and depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedInputs {
    pub a: WireId,
    pub b: WireId,
    pub matches: Vec<(SwitchId, SwitchId)>,
}

impl SharedInputs {
    pub fn shared_in(&self, pattern: &Pattern) -> usize {
        self.matches
            .iter()
            .filter(|(x, y)| pattern.contains(*x) && pattern.contains(*y))
            .count()
    }
}

pub fn shared_input_pairs(universe: &SwitchUniverse) -> Vec<SharedInputs> {
    let alphabet = universe.alphabet();
    let keyed = |wire: WireId| -> Dict<(WireId, i32), SwitchId> {
        universe
            .incoming(wire)
            .iter()
            .map(|&id| {
                let s = universe.switch(id);
                ((s.driver, s.depth), id)
            })
            .collect()
    };
    let inputs = alphabet.ids().map(keyed).collect_vec();
    let mut pairs = Vec::new();
    for a in alphabet.ids() {
        for b in a + 1..alphabet.len() {
            let matches = universe
                .incoming(a)
                .iter()
                .filter_map(|&x| {
                    let s = universe.switch(x);
                    inputs[b].get(&(s.driver, s.depth)).map(|&y| (x, y))
                })
                .collect_vec();
            pairs.push(SharedInputs { a, b, matches });
        }
    }
    pairs
}

/// `(a -> b, d)` together with `(b -> a, d)` for distinct wires.
pub fn opposite_pairs(universe: &SwitchUniverse) -> Vec<(SwitchId, SwitchId)> {
    universe
        .iter()
        .filter(|(_, s)| s.driver < s.target)
        .filter_map(|(id, s)| {
            universe
                .lookup(&Switch::new(s.target, s.driver, s.depth))
                .map(|other| (id, other))
        })
        .collect()
}

pub fn fan_switches(universe: &SwitchUniverse, wire: WireId, side: FanSide) -> &[SwitchId] {
    match side {
        FanSide::In => universe.incoming(wire),
        FanSide::Out => universe.outgoing(wire),
    }
}

/// Per-wire count of selected switches on one side.
pub fn fan_sizes(universe: &SwitchUniverse, pattern: &Pattern, side: FanSide) -> Vec<usize> {
    universe
        .alphabet()
        .ids()
        .map(|w| {
            fan_switches(universe, w, side)
                .iter()
                .filter(|&&id| pattern.contains(id))
                .count()
        })
        .collect()
}
