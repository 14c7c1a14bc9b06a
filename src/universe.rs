use crate::*;

/// A directed connection from `driver` into `target`, `depth` logic levels up or down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, new,
)]
pub struct Switch {
    pub driver: WireId,
    pub target: WireId,
    pub depth: i32,
}

pub type SwitchId = usize;

pub fn is_u_turn(alphabet: &WireAlphabet, driver: WireId, target: WireId) -> bool {
    alphabet.get(target).direction() == alphabet.get(driver).direction().opposite()
}

/// Every legal switch over an alphabet, in (driver, target, depth) order.
#[derive(Debug, Clone)]
pub struct SwitchUniverse {
    alphabet: WireAlphabet,
    max_depth: i32,
    switches: Vec<Switch>,
    index: Dict<Switch, SwitchId>,
    incoming: Vec<Vec<SwitchId>>,
    outgoing: Vec<Vec<SwitchId>>,
}

impl SwitchUniverse {
    pub fn new(alphabet: WireAlphabet, max_depth: i32) -> Self {
        let max_depth = max_depth.max(0);
        let n = alphabet.len();
        let mut switches = Vec::new();
        for driver in alphabet.ids() {
            for target in alphabet.ids() {
                if is_u_turn(&alphabet, driver, target) {
                    continue;
                }
                for depth in -max_depth..=max_depth {
                    switches.push(Switch::new(driver, target, depth));
                }
            }
        }
        let index: Dict<_, _> = switches.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        let mut incoming = vec![Vec::new(); n];
        let mut outgoing = vec![Vec::new(); n];
        for (id, s) in switches.iter().enumerate() {
            incoming[s.target].push(id);
            outgoing[s.driver].push(id);
        }
        debug!(
            target: "internal",
            "universe: {} wires, depth +-{}, {} switches",
            n,
            max_depth,
            switches.len()
        );
        Self {
            alphabet,
            max_depth,
            switches,
            index,
            incoming,
            outgoing,
        }
    }
    pub fn alphabet(&self) -> &WireAlphabet {
        &self.alphabet
    }
    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }
    pub fn depths(&self) -> std::ops::RangeInclusive<i32> {
        -self.max_depth..=self.max_depth
    }
    pub fn len(&self) -> usize {
        self.switches.len()
    }
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
    pub fn switch(&self, id: SwitchId) -> Switch {
        self.switches[id]
    }
    pub fn iter(&self) -> impl Iterator<Item = (SwitchId, Switch)> + '_ {
        self.switches.iter().copied().enumerate()
    }
    pub fn ids(&self) -> std::ops::Range<SwitchId> {
        0..self.switches.len()
    }
    pub fn lookup(&self, switch: &Switch) -> Option<SwitchId> {
        self.index.get(switch).copied()
    }
    pub fn incoming(&self, wire: WireId) -> &[SwitchId] {
        &self.incoming[wire]
    }
    pub fn outgoing(&self, wire: WireId) -> &[SwitchId] {
        &self.outgoing[wire]
    }
    pub fn is_u_turn(&self, driver: WireId, target: WireId) -> bool {
        is_u_turn(&self.alphabet, driver, target)
    }
    /// All depth replicas of `driver -> target`; empty for a U-turn pair.
    pub fn family(&self, driver: WireId, target: WireId) -> Vec<SwitchId> {
        self.depths()
            .filter_map(|depth| self.lookup(&Switch::new(driver, target, depth)))
            .collect()
    }
    /// Switches from `driver` into any wire travelling in `direction`.
    pub fn into_direction(&self, driver: WireId, direction: Direction) -> Vec<SwitchId> {
        self.outgoing(driver)
            .iter()
            .copied()
            .filter(|&id| self.alphabet.get(self.switches[id].target).direction() == direction)
            .collect()
    }
    pub fn describe(&self, id: SwitchId) -> String {
        let s = self.switches[id];
        format!(
            "{} -> {} @ {:+}",
            self.alphabet.get(s.driver),
            self.alphabet.get(s.target),
            s.depth
        )
    }
    pub fn wire_name(&self, wire: WireId) -> &str {
        self.alphabet.get(wire).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_wires(depth: i32) -> SwitchUniverse {
        let alphabet = WireAlphabet::parse(&["H1_L_0", "H1_R_0", "V1_U_0", "V1_D_0"]).unwrap();
        SwitchUniverse::new(alphabet, depth)
    }
    fn id_of(u: &SwitchUniverse, d: &str, t: &str, depth: i32) -> Option<SwitchId> {
        let a = u.alphabet();
        u.lookup(&Switch::new(a.find(d)?, a.find(t)?, depth))
    }

    #[test]
    fn test_no_u_turns() {
        let u = four_wires(0);
        assert_eq!(id_of(&u, "H1_L_0", "H1_R_0", 0), None);
        assert_eq!(id_of(&u, "H1_R_0", "H1_L_0", 0), None);
        assert!(id_of(&u, "H1_L_0", "V1_U_0", 0).is_some());
        for (_, s) in u.iter() {
            assert!(!u.is_u_turn(s.driver, s.target));
        }
        // 4 drivers x 3 legal targets
        assert_eq!(u.len(), 12);
    }
    #[test]
    fn test_stable_order_and_depths() {
        let u = four_wires(1);
        assert_eq!(u.len(), 36);
        let all = u.iter().map(|(_, s)| s).collect_vec();
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
        let h_l = u.alphabet().find("H1_L_0").unwrap();
        assert_eq!(u.family(h_l, h_l).len(), 3);
        assert!(u.family(h_l, u.alphabet().find("H1_R_0").unwrap()).is_empty());
        assert_eq!(u.incoming(h_l).len(), 9);
    }
    #[test]
    fn test_empty_alphabet() {
        let u = SwitchUniverse::new(WireAlphabet::default(), 1);
        assert!(u.is_empty());
    }
}
