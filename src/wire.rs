use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    H,
    V,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    L,
    R,
    U,
    D,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::L, Direction::R, Direction::U, Direction::D];

    pub fn opposite(self) -> Self {
        match self {
            Direction::L => Direction::R,
            Direction::R => Direction::L,
            Direction::U => Direction::D,
            Direction::D => Direction::U,
        }
    }
    pub fn axis(self) -> Axis {
        match self {
            Direction::L | Direction::R => Axis::H,
            Direction::U | Direction::D => Axis::V,
        }
    }
    pub fn perpendicular(self) -> [Direction; 2] {
        match self.axis() {
            Axis::H => [Direction::U, Direction::D],
            Axis::V => [Direction::R, Direction::L],
        }
    }
    pub fn is_negative(self) -> bool {
        matches!(self, Direction::L | Direction::D)
    }
    fn from_char(c: &str) -> Option<Self> {
        match c {
            "L" => Some(Direction::L),
            "R" => Some(Direction::R),
            "U" => Some(Direction::U),
            "D" => Some(Direction::D),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::L => "L",
            Direction::R => "R",
            Direction::U => "U",
            Direction::D => "D",
        };
        f.write_str(c)
    }
}

/// A wire segment type such as `H4_R_0`: axis, length, travel direction and a replica index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Wire {
    name: String,
    axis: Axis,
    length: i32,
    direction: Direction,
    replica: u32,
}

impl Wire {
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || SynthError::InvalidWire(name.to_string());
        let mut parts = name.split('_');
        let (head, dir, idx) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(d), Some(i), None) => (h, d, i),
            _ => return Err(invalid()),
        };
        let axis = match head.get(..1) {
            Some("H") => Axis::H,
            Some("V") => Axis::V,
            _ => return Err(invalid()),
        };
        let length = head[1..].parse::<i32>().map_err(|_| invalid())?;
        let direction = Direction::from_char(dir).ok_or_else(invalid)?;
        let replica = idx.parse::<u32>().map_err(|_| invalid())?;
        if length <= 0 || direction.axis() != axis {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            axis,
            length,
            direction,
            replica,
        })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn axis(&self) -> Axis {
        self.axis
    }
    pub fn length(&self) -> i32 {
        self.length
    }
    pub fn direction(&self) -> Direction {
        self.direction
    }
    pub fn replica(&self) -> u32 {
        self.replica
    }
    /// Endpoint displacement of the segment.
    pub fn offset(&self) -> Coord {
        let len = if self.direction.is_negative() {
            -self.length
        } else {
            self.length
        };
        match self.axis {
            Axis::H => (len, 0),
            Axis::V => (0, len),
        }
    }
    /// Name of the same segment travelling in `direction`.
    pub fn renamed(&self, direction: Direction) -> String {
        format!(
            "{:?}{}_{}_{}",
            self.axis, self.length, direction, self.replica
        )
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub type WireId = usize;

/// Sorted, deduplicated wire alphabet. A wire's position is its stable id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAlphabet {
    wires: Vec<Wire>,
}

impl WireAlphabet {
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut wires = names
            .iter()
            .map(|n| Wire::parse(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        wires.sort_by(|a, b| a.name.cmp(&b.name));
        wires.dedup_by(|a, b| a.name == b.name);
        Ok(Self { wires })
    }
    pub fn len(&self) -> usize {
        self.wires.len()
    }
    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }
    pub fn get(&self, id: WireId) -> &Wire {
        &self.wires[id]
    }
    pub fn iter(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter().enumerate()
    }
    pub fn ids(&self) -> std::ops::Range<WireId> {
        0..self.wires.len()
    }
    pub fn find(&self, name: &str) -> Option<WireId> {
        self.wires
            .binary_search_by(|w| w.name.as_str().cmp(name))
            .ok()
    }
    pub fn names(&self) -> Vec<&str> {
        self.wires.iter().map(|w| w.name()).collect()
    }
    pub fn with_direction(&self, direction: Direction) -> Vec<WireId> {
        self.iter()
            .filter(|(_, w)| w.direction() == direction)
            .map(|(i, _)| i)
            .collect()
    }
    /// Image of `id` when its direction is replaced, if such a wire exists.
    pub fn redirected(&self, id: WireId, direction: Direction) -> Option<WireId> {
        let wire = self.get(id);
        if wire.direction() == direction {
            return Some(id);
        }
        self.find(&wire.renamed(direction))
    }
    /// Half-width of the default search window: summed R lengths by summed U lengths, doubled.
    pub fn default_window(&self) -> Coord {
        let sum = |d: Direction| -> i32 {
            self.wires
                .iter()
                .filter(|w| w.direction() == d)
                .map(|w| w.length())
                .sum()
        };
        (2 * sum(Direction::R), 2 * sum(Direction::U))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire() {
        let w = Wire::parse("H4_L_0").unwrap();
        assert_eq!(w.axis(), Axis::H);
        assert_eq!(w.length(), 4);
        assert_eq!(w.direction(), Direction::L);
        assert_eq!(w.offset(), (-4, 0));
        assert_eq!(Wire::parse("V1_U_1").unwrap().offset(), (0, 1));
        assert_eq!(w.renamed(Direction::R), "H4_R_0");
    }
    #[test]
    fn test_reject_bad_names() {
        assert!(Wire::parse("H4_U_0").is_err());
        assert!(Wire::parse("X1_L_0").is_err());
        assert!(Wire::parse("H0_L_0").is_err());
        assert!(Wire::parse("H1_L").is_err());
    }
    #[test]
    fn test_alphabet_is_sorted() {
        let alphabet = WireAlphabet::parse(&["V1_U_0", "H1_R_0", "H1_L_0", "H1_R_0"]).unwrap();
        assert_eq!(alphabet.names(), vec!["H1_L_0", "H1_R_0", "V1_U_0"]);
        assert_eq!(alphabet.find("V1_U_0"), Some(2));
        assert_eq!(alphabet.redirected(0, Direction::R), Some(1));
        assert_eq!(alphabet.redirected(2, Direction::D), None);
        assert_eq!(alphabet.default_window(), (2, 2));
    }
}
