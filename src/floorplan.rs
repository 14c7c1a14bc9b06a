use crate::*;

/// Physical multiplexer footprint and the height of one logic-block column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuxGeometry {
    pub mux_width: f64,
    pub mux_height: f64,
    pub lut_height: f64,
}

impl Default for MuxGeometry {
    fn default() -> Self {
        Self {
            mux_width: 552.0,
            mux_height: 264.0,
            lut_height: 2112.0,
        }
    }
}

fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

/// Cell grid the multiplexers are stacked into, with normalized cell dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuxGrid {
    pub columns: i32,
    pub column_height: i32,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl MuxGrid {
    pub fn new(geometry: &MuxGeometry, wires: usize) -> Self {
        let column_height = ((geometry.lut_height / geometry.mux_height).floor() as i32).max(1);
        let columns = ((wires as f64 / column_height as f64).ceil() as i32).max(1);
        let norm = geometry.mux_width.max(geometry.mux_height);
        Self {
            columns,
            column_height,
            cell_width: round4(geometry.mux_width / norm),
            cell_height: round4(geometry.mux_height / norm),
        }
    }
    pub fn cells(&self) -> impl Iterator<Item = Coord> + Clone {
        (0..self.columns).cartesian_product(0..self.column_height)
    }
    pub fn num_cells(&self) -> usize {
        (self.columns * self.column_height) as usize
    }
    pub fn contains(&self, cell: Coord) -> bool {
        (0..self.columns).contains(&cell.0) && (0..self.column_height).contains(&cell.1)
    }
    /// Manhattan length of a switch; a depth offset shifts the target by whole columns.
    pub fn switch_len(&self, driver: Coord, target: Coord, depth: i32) -> f64 {
        let dx = (target.0 - driver.0).abs() as f64;
        let dy = (target.1 - driver.1 + depth * self.column_height).abs() as f64;
        dx * self.cell_width + dy * self.cell_height
    }
}

/// Wire -> multiplexer cell, one distinct cell per wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floorplan {
    cells: Vec<Coord>,
}

impl Floorplan {
    /// Wires in sorted order, filling each column before opening the next.
    pub fn stacked(grid: &MuxGrid, wires: usize) -> Self {
        let h = grid.column_height as usize;
        Self {
            cells: (0..wires)
                .map(|w| ((w / h) as i32, (w % h) as i32))
                .collect(),
        }
    }
    /// Builds a floorplan from decoded cells; `None` if a wire is missing or two share a cell.
    pub fn from_cells(cells: Vec<Option<Coord>>) -> Option<Self> {
        let cells = cells.into_iter().collect::<Option<Vec<_>>>()?;
        let unique = cells.iter().collect::<Set<_>>().len() == cells.len();
        unique.then_some(Self { cells })
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn cell(&self, wire: WireId) -> Coord {
        self.cells[wire]
    }
    pub fn iter(&self) -> impl Iterator<Item = (WireId, Coord)> + '_ {
        self.cells.iter().copied().enumerate()
    }
    pub fn swap(&mut self, a: WireId, b: WireId) {
        self.cells.swap(a, b);
    }
    pub fn switch_len(&self, grid: &MuxGrid, switch: &Switch) -> f64 {
        grid.switch_len(self.cells[switch.driver], self.cells[switch.target], switch.depth)
    }
    pub fn wirelength(&self, grid: &MuxGrid, universe: &SwitchUniverse, pattern: &Pattern) -> f64 {
        pattern
            .iter()
            .map(|id| self.switch_len(grid, &universe.switch(id)))
            .sum()
    }
}

/// Usage-greedy pattern that ignores every structural feature except the pattern size.
#[derive(Debug, Clone)]
pub struct GreedyReference {
    pub pattern: Pattern,
    pub usage: f64,
    pub wirelength: f64,
    pub stacking: Floorplan,
}

/// Top `wires · fanin` logged switches by current usage, ties broken by switch order,
/// measured on the default stacking.
pub fn greedy_reference(
    universe: &SwitchUniverse,
    usage: &UsageTable,
    grid: &MuxGrid,
    fanin: u32,
) -> GreedyReference {
    let size = universe.alphabet().len() * fanin as usize;
    let chosen = usage
        .sorted()
        .into_iter()
        .sorted_by_key(|(id, u)| (std::cmp::Reverse(u.cur), *id))
        .take(size)
        .collect_vec();
    let pattern = Pattern::from_ids(chosen.iter().map(|(id, _)| *id));
    let stacking = Floorplan::stacked(grid, universe.alphabet().len());
    GreedyReference {
        usage: chosen.iter().map(|(_, u)| u.cur as f64).sum(),
        wirelength: stacking.wirelength(grid, universe, &pattern),
        pattern,
        stacking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions() {
        let grid = MuxGrid::new(&MuxGeometry::default(), 16);
        assert_eq!(grid.column_height, 8);
        assert_eq!(grid.columns, 2);
        assert_eq!(grid.cell_width, 1.0);
        assert_eq!(grid.cell_height, 0.4783);
        assert_eq!(grid.cells().count(), 16);
        let one = MuxGrid::new(&MuxGeometry::default(), 1);
        assert_eq!((one.columns, one.num_cells()), (1, 8));
    }
    #[test]
    fn test_switch_len() {
        let grid = MuxGrid::new(&MuxGeometry::default(), 16);
        assert_eq!(grid.switch_len((0, 0), (1, 0), 0), 1.0);
        assert!((grid.switch_len((0, 7), (0, 0), 1) - 0.4783).abs() < 1e-9);
        assert_eq!(grid.switch_len((0, 3), (0, 3), 0), 0.0);
    }
    #[test]
    fn test_stacked_and_decoded() {
        let grid = MuxGrid::new(&MuxGeometry::default(), 10);
        let f = Floorplan::stacked(&grid, 10);
        assert_eq!(f.cell(7), (0, 7));
        assert_eq!(f.cell(8), (1, 0));
        assert!(Floorplan::from_cells(vec![Some((0, 0)), Some((0, 0))]).is_none());
        assert!(Floorplan::from_cells(vec![Some((0, 0)), None]).is_none());
        assert_eq!(
            Floorplan::from_cells(vec![Some((0, 1)), Some((0, 0))]).map(|f| f.cell(1)),
            Some((0, 0))
        );
    }
    #[test]
    fn test_greedy_reference() {
        let alphabet = WireAlphabet::parse(&["H1_L_0", "H1_R_0", "V1_U_0"]).unwrap();
        let universe = SwitchUniverse::new(alphabet, 0);
        let grid = MuxGrid::new(&MuxGeometry::default(), 3);
        let mut usage = UsageTable::default();
        for (id, cur) in [(0, 5), (1, 9), (2, 5), (3, 1)] {
            usage.insert(id, Usage { cur, hist: 0, prev: 0 });
        }
        let g = greedy_reference(&universe, &usage, &grid, 1);
        assert_eq!(g.pattern.ids(), &[0, 1, 2]);
        assert_eq!(g.usage, 19.0);
        let expected = g.pattern.iter().map(|id| g.stacking.switch_len(&grid, &universe.switch(id))).sum::<f64>();
        assert_eq!(g.wirelength, expected);
    }
}
