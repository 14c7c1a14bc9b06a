//! Feature families as independent functions over (model, universe, oracle), and the
//! assembly of one synthesis round.
use crate::*;
use std::cmp::Reverse;

fn emit(model: &mut Model, lazy: bool, expr: LinExpr, sense: Sense, rhs: f64) {
    if lazy {
        model.add_lazy(expr, sense, rhs);
    } else {
        model.add(expr, sense, rhs);
    }
}

fn switch_sum(model: &mut Model, ids: &[SwitchId]) -> LinExpr {
    LinExpr::sum(model.switch_vars(ids))
}

/// `var - Σ_d x(u, v, d)`: the pair (u, v) may only be used if some depth replica exists.
fn implies_family(
    model: &mut Model,
    universe: &SwitchUniverse,
    var: VarId,
    u: WireId,
    v: WireId,
) -> LinExpr {
    let mut row = LinExpr::term(1.0, var);
    for x in model.switch_vars(&universe.family(u, v)) {
        row -= x;
    }
    row
}

// --------------------------------------------------------------------------------
// ### Hop optimality
// --------------------------------------------------------------------------------

/// Every offset of the oracle must be realizable in its optimal hop count.
pub fn encode_hop_optimality(
    model: &mut Model,
    universe: &SwitchUniverse,
    oracle: &HopOracle,
    skip_third_quadrant: bool,
    lazy_slots: bool,
) -> Result<()> {
    if oracle.mode() != OracleMode::Full {
        return Err(SynthError::InvalidConfig(
            "hop-optimality encoding needs a full oracle".into(),
        ));
    }
    if oracle.alphabet() != universe.alphabet() {
        return Err(SynthError::InvalidConfig(
            "oracle and universe were built from different alphabets".into(),
        ));
    }
    let (mut indexed, mut slotted) = (0, 0);
    for (offset, hops) in oracle.offsets() {
        if skip_third_quadrant && offset.0 < 0 && offset.1 < 0 {
            continue;
        }
        match oracle.paths(offset) {
            Some(OffsetPaths::Enumerated(paths)) => {
                encode_offset_paths(model, universe, offset, paths);
                indexed += 1;
            }
            _ => {
                encode_offset_slots(model, universe, oracle, offset, hops, lazy_slots);
                slotted += 1;
            }
        }
    }
    debug!(
        target: "internal",
        "hop optimality: {} path-indexed offsets, {} hop-slot offsets",
        indexed,
        slotted
    );
    Ok(())
}

/// One path indicator per canonical shortest path; exactly one must be realized.
fn encode_offset_paths(
    model: &mut Model,
    universe: &SwitchUniverse,
    offset: Coord,
    paths: &[Vec<WireId>],
) {
    let mut choice = LinExpr::new();
    for (index, path) in paths.iter().enumerate() {
        let sp = model.binary(VarKey::PathChoice { offset, index });
        for (&u, &v) in path.iter().tuple_windows() {
            let row = implies_family(model, universe, sp, u, v);
            model.le(row, 0.0);
        }
        choice += sp;
    }
    model.eq(choice, 1.0);
}

/// Hop-by-hop encoding: one wire per hop position, reaching the offset exactly.
fn encode_offset_slots(
    model: &mut Model,
    universe: &SwitchUniverse,
    oracle: &HopOracle,
    offset: Coord,
    hops: u32,
    lazy: bool,
) {
    let alphabet = universe.alphabet();
    let slot = |model: &mut Model, wire: WireId, position: u32| {
        model.binary(VarKey::HopSlot {
            offset,
            wire,
            position,
        })
    };
    let mut reach_x = LinExpr::new();
    let mut reach_y = LinExpr::new();
    for position in 0..hops {
        let mut one = LinExpr::new();
        for (w, wire) in alphabet.iter() {
            let s = slot(model, w, position);
            one += s;
            let (dx, dy) = wire.offset();
            if dx != 0 {
                reach_x += (dx as f64, s);
            }
            if dy != 0 {
                reach_y += (dy as f64, s);
            }
        }
        emit(model, lazy, one, Sense::Eq, 1.0);
    }
    for position in 1..hops {
        for u in alphabet.ids() {
            for v in alphabet.ids() {
                let a = slot(model, u, position - 1);
                let b = slot(model, v, position);
                if universe.is_u_turn(u, v) {
                    emit(model, lazy, LinExpr::sum([a, b]), Sense::Le, 1.0);
                    continue;
                }
                let both = model.and(&[a, b]);
                let row = implies_family(model, universe, both, u, v);
                emit(model, lazy, row, Sense::Le, 0.0);
            }
        }
    }
    // an axis no wire moves along is already at its target
    if !reach_x.is_empty() {
        emit(model, lazy, reach_x, Sense::Eq, offset.0 as f64);
    }
    if !reach_y.is_empty() {
        emit(model, lazy, reach_y, Sense::Eq, offset.1 as f64);
    }
    for w in alphabet.ids() {
        let row = LinExpr::sum((0..hops).map(|p| slot(model, w, p)));
        emit(model, lazy, row, Sense::Le, oracle.max_count(w, offset) as f64);
    }
}

// --------------------------------------------------------------------------------
// ### Fan bounds
// --------------------------------------------------------------------------------

pub fn encode_fan_exact(model: &mut Model, universe: &SwitchUniverse, side: FanSide, value: u32) {
    for w in universe.alphabet().ids() {
        let row = switch_sum(model, fan_switches(universe, w, side));
        model.eq(row, value as f64);
    }
}

/// All wires (or all wires of one axis) share one integer fan size.
pub fn encode_uniform_fan(
    model: &mut Model,
    universe: &SwitchUniverse,
    side: FanSide,
    mode: UniformFan,
) {
    if mode == UniformFan::Off {
        return;
    }
    for (w, wire) in universe.alphabet().iter() {
        let axis = match mode {
            UniformFan::WithinAxis => Some(wire.axis()),
            _ => None,
        };
        let ub = fan_switches(universe, w, side).len() as f64;
        let shared = model.integer(VarKey::UniformFan { side, axis }, 0.0, ub);
        let mut row = switch_sum(model, fan_switches(universe, w, side));
        row -= shared;
        model.eq(row, 0.0);
    }
}

/// At most `limit` distinct fan sizes, each drawn from `sizes`.
pub fn encode_size_diversity(
    model: &mut Model,
    universe: &SwitchUniverse,
    side: FanSide,
    sizes: &[u32],
    limit: u32,
    mode: SizeIndicator,
) {
    let sizes = sizes.iter().copied().sorted().dedup().collect_vec();
    let mut per_size: IndexMap<u32, Vec<VarId>> = IndexMap::default();
    for w in universe.alphabet().ids() {
        let switches = fan_switches(universe, w, side);
        let count = switch_sum(model, switches);
        let mut weighted = count.clone();
        let mut one = LinExpr::new();
        for &size in &sizes {
            let ind = model.binary(VarKey::SizeChoice {
                side,
                wire: w,
                size,
            });
            one += ind;
            match mode {
                SizeIndicator::Weighted => weighted += (-(size as f64), ind),
                SizeIndicator::Exact => {
                    model.equals_const(ind, &count, size as f64, switches.len() as f64)
                }
            }
            per_size.entry(size).or_default().push(ind);
        }
        if mode == SizeIndicator::Weighted {
            model.eq(weighted, 0.0);
        }
        model.eq(one, 1.0);
    }
    let mut present = LinExpr::new();
    for (size, indicators) in per_size {
        let var = model.binary(VarKey::SizePresent { side, size });
        model.or_into(&indicators, var);
        present += var;
    }
    model.le(present, limit as f64);
}

/// Every multiplexer shares at least `k` (driver, depth) inputs with some partner.
pub fn encode_pair_share(model: &mut Model, universe: &SwitchUniverse, k: u32) -> Result<()> {
    let mut coverage = vec![LinExpr::new(); universe.alphabet().len()];
    for pair in shared_input_pairs(universe) {
        if pair.matches.len() < k as usize {
            continue;
        }
        let mut shared = LinExpr::new();
        for &(x, y) in &pair.matches {
            let (vx, vy) = (model.switch_var(x), model.switch_var(y));
            shared += model.and(&[vx, vy]);
        }
        let (a, b) = (pair.a, pair.b);
        let sharing = model.continuous(VarKey::Sharing { a, b }, 0.0, pair.matches.len() as f64);
        shared -= sharing;
        model.eq(shared, 0.0);
        let force = model.binary(VarKey::PairForce { a, b });
        model.le(LinExpr::term(k as f64, force).add(-1.0, sharing), 0.0);
        coverage[a] += force;
        coverage[b] += force;
    }
    for (w, row) in coverage.into_iter().enumerate() {
        if row.is_empty() {
            return Err(SynthError::UncoverableFeature {
                feature: "mux_pair_input_share",
                wire: universe.wire_name(w).to_string(),
            });
        }
        model.ge(row, 1.0);
    }
    Ok(())
}

pub fn encode_max_switches(model: &mut Model, universe: &SwitchUniverse, limit: u32) {
    let all = universe.ids().collect_vec();
    let row = switch_sum(model, &all);
    model.le(row, limit as f64);
}

// --------------------------------------------------------------------------------
// ### Structural features
// --------------------------------------------------------------------------------

pub fn encode_symmetry(model: &mut Model, universe: &SwitchUniverse, kind: SymmetryKind) {
    for pair in symmetry_pairs(universe, kind) {
        let a = model.switch_var(pair.switch);
        match pair.partner {
            Some(b) => {
                let b = model.switch_var(b);
                model.eq(LinExpr::term(1.0, a).add(-1.0, b), 0.0);
            }
            None => model.fix(a, 0.0),
        }
    }
}

pub fn encode_coverage(
    model: &mut Model,
    universe: &SwitchUniverse,
    kind: CoverageKind,
) -> Result<()> {
    for group in coverage_groups(universe, kind) {
        if group.switches.is_empty() {
            return Err(SynthError::UncoverableFeature {
                feature: kind.name(),
                wire: universe.wire_name(group.wire).to_string(),
            });
        }
        let row = switch_sum(model, &group.switches);
        model.ge(row, 1.0);
    }
    Ok(())
}

pub fn encode_length_order(model: &mut Model, universe: &SwitchUniverse, order: LengthOrder) {
    let alphabet = universe.alphabet();
    for (id, s) in universe.iter() {
        let (d, t) = (alphabet.get(s.driver), alphabet.get(s.target));
        if d.axis() != t.axis() {
            continue;
        }
        let banned = match order {
            LengthOrder::Free => false,
            LengthOrder::NonIncreasing => t.length() > d.length(),
            LengthOrder::NonDecreasing => t.length() < d.length(),
        };
        if banned {
            let x = model.switch_var(id);
            model.fix(x, 0.0);
        }
    }
}

pub fn encode_opposite_prohibition(model: &mut Model, universe: &SwitchUniverse) {
    for (a, b) in opposite_pairs(universe) {
        let row = switch_sum(model, &[a, b]);
        model.le(row, 1.0);
    }
}

/// At most `limit` depth replicas of each (driver, target) pair.
pub fn encode_replica_limit(model: &mut Model, universe: &SwitchUniverse, limit: u32) {
    for (_, s) in universe.iter().filter(|(_, s)| s.depth == 0) {
        let row = switch_sum(model, &universe.family(s.driver, s.target));
        model.le(row, limit as f64);
    }
}

/// The `fanin · mult` most used incoming switches of every wire.
pub fn greedy_preselect(
    universe: &SwitchUniverse,
    usage: &UsageTable,
    fanin: u32,
    mult: u32,
) -> Vec<SwitchId> {
    let ranked = usage
        .sorted()
        .into_iter()
        .sorted_by_key(|(id, u)| (Reverse(u.cur), *id))
        .map(|(id, _)| id)
        .collect_vec();
    let quota = (fanin * mult) as usize;
    let mut keep = Vec::new();
    for w in universe.alphabet().ids() {
        keep.extend(
            ranked
                .iter()
                .copied()
                .filter(|&id| universe.switch(id).target == w)
                .take(quota),
        );
    }
    keep.sort_unstable();
    keep
}

pub fn encode_nonselected(model: &mut Model, universe: &SwitchUniverse, keep: &[SwitchId]) {
    for id in universe.ids() {
        if keep.binary_search(&id).is_err() {
            let x = model.switch_var(id);
            model.fix(x, 0.0);
        }
    }
}

/// Switches the traffic log never mentioned are kept unconditionally.
pub fn encode_adopted(model: &mut Model, universe: &SwitchUniverse, usage: &UsageTable) -> usize {
    let mut adopted = 0;
    for id in universe.ids().filter(|&id| !usage.contains(id)) {
        let x = model.switch_var(id);
        model.fix(x, 1.0);
        adopted += 1;
    }
    adopted
}

/// Largest overlap a new solution may share with the banned ones.
/// `None` when nothing is banned or when `min_difference` leaves no room for a bound.
pub fn overlap_limit(banned: &[Pattern], min_difference: usize) -> Option<usize> {
    let largest = banned.iter().map(|p| p.len()).max()?;
    if min_difference >= largest {
        warn!(
            "Minimum difference {} is not below the largest earlier solution ({} switches), solutions are not forced apart",
            min_difference, largest
        );
        return None;
    }
    Some(largest - min_difference)
}

/// Bounds the overlap with each earlier solution; a zero bound is not enforced.
pub fn encode_overlap_bounds(
    model: &mut Model,
    solutions: &[Pattern],
    min_overlap: usize,
    max_overlap: usize,
) {
    for solution in solutions {
        let row = switch_sum(model, solution.ids());
        if min_overlap > 0 {
            model.ge(row.clone(), min_overlap as f64);
        }
        if max_overlap > 0 {
            model.le(row, max_overlap as f64);
        }
    }
}

// --------------------------------------------------------------------------------
// ### Placement and objectives
// --------------------------------------------------------------------------------

/// Restricts each wire to cells near its hinted position.
#[derive(Debug, Clone, Copy)]
pub struct PlacementLock<'a> {
    pub hint: &'a Floorplan,
    /// Chebyshev radius around the hint; 0 pins the wire to it.
    pub radius: i32,
}

impl PlacementLock<'_> {
    fn admits(&self, grid: &MuxGrid, wire: WireId, cell: Coord) -> bool {
        let hinted = self.hint.cell(wire);
        if !grid.contains(hinted) {
            return true;
        }
        chebyshev(cell, hinted) <= self.radius
    }
}

/// Multiplexer placement with one cell per wire, one wire per cell and a `total_wl`
/// variable summing the lengths of the selected switches.
pub fn encode_placement(
    model: &mut Model,
    universe: &SwitchUniverse,
    grid: &MuxGrid,
    lock: Option<PlacementLock>,
) -> VarId {
    let cells = grid.cells().collect_vec();
    let wires = universe.alphabet().len();
    let admissible = |wire: WireId, cell: Coord| lock.map_or(true, |l| l.admits(grid, wire, cell));
    let pos = |model: &mut Model, wire: WireId, cell: Coord| model.binary(VarKey::MuxPos { wire, cell });

    let mut per_cell = vec![LinExpr::new(); cells.len()];
    for w in 0..wires {
        let mut one = LinExpr::new();
        for (i, &c) in cells.iter().enumerate() {
            let p = pos(model, w, c);
            one += p;
            per_cell[i] += p;
        }
        model.eq(one, 1.0);
    }
    for row in per_cell {
        model.le(row, 1.0);
    }

    let mut total = LinExpr::new();
    for (id, s) in universe.iter() {
        let x = model.switch_var(id);
        for &cd in cells.iter().filter(|&&c| admissible(s.driver, c)) {
            for &ct in cells.iter().filter(|&&c| admissible(s.target, c)) {
                if (s.driver == s.target) != (cd == ct) {
                    continue;
                }
                let len = grid.switch_len(cd, ct, s.depth);
                if len == 0.0 {
                    continue;
                }
                let (pd, pt) = (pos(model, s.driver, cd), pos(model, s.target, ct));
                let ind = model.and(&[x, pd, pt]);
                total += (len, ind);
            }
        }
    }
    let wl = model.free(VarKey::TotalWl);
    total -= wl;
    model.eq(total, 0.0);

    if let Some(lock) = lock {
        for w in 0..wires {
            let hinted = lock.hint.cell(w);
            if !grid.contains(hinted) {
                continue;
            }
            for &c in &cells {
                if lock.radius == 0 && c == hinted {
                    let p = pos(model, w, c);
                    model.fix(p, 1.0);
                } else if lock.radius > 0 && !lock.admits(grid, w, c) {
                    let p = pos(model, w, c);
                    model.fix(p, 0.0);
                }
            }
        }
    }
    wl
}

/// Pulls every driver towards the average position of its fanout. Returns the sum of
/// absolute deltas as a secondary objective.
pub fn encode_fanout_centering(
    model: &mut Model,
    universe: &SwitchUniverse,
    grid: &MuxGrid,
    fanin: u32,
) -> LinExpr {
    let h = grid.column_height;
    let shift = (universe.max_depth() * h) as f64;
    let max_x = grid.columns as f64;
    let max_y = (h - 1) as f64;
    let x_ub = grid.columns as f64 * grid.cell_width;
    let y_ub = ((1 + universe.max_depth()) * h) as f64 * grid.cell_height;
    let fanin = fanin.max(1) as f64;
    let coord = |model: &mut Model, wire: WireId, axis: Axis| match axis {
        Axis::H => model.continuous(VarKey::WireCoord { wire, axis }, 0.0, max_x),
        Axis::V => model.continuous(VarKey::WireCoord { wire, axis }, shift, h as f64 + shift),
    };

    for w in universe.alphabet().ids() {
        let (xv, yv) = (coord(model, w, Axis::H), coord(model, w, Axis::V));
        let mut xr = LinExpr::new();
        let mut yr = LinExpr::new();
        for c in grid.cells() {
            let p = model.binary(VarKey::MuxPos { wire: w, cell: c });
            xr += (c.0 as f64, p);
            yr += (c.1 as f64 + shift, p);
        }
        xr -= xv;
        yr -= yv;
        model.eq(xr, 0.0);
        model.eq(yr, 0.0);
    }

    let mut secondary = LinExpr::new();
    for w in universe.alphabet().ids() {
        let mut fx = LinExpr::new();
        let mut fy = LinExpr::new();
        for &id in universe.outgoing(w) {
            let s = universe.switch(id);
            let x = model.switch_var(id);
            let (tx, ty) = (coord(model, s.target, Axis::H), coord(model, s.target, Axis::V));
            let px = model.continuous(VarKey::CoordProduct { switch: id, axis: Axis::H }, 0.0, max_x);
            model.continuous_product(x, tx, px, max_x, 0.0);
            let py = model.continuous(VarKey::CoordProduct { switch: id, axis: Axis::V }, 0.0, max_y + shift);
            model.continuous_product(x, ty, py, max_y + shift, (s.depth * h) as f64);
            fx += (grid.cell_width / fanin, px);
            fy += (grid.cell_height / fanin, py);
        }
        let scaled = [
            (Axis::H, fx, grid.cell_width, x_ub),
            (Axis::V, fy, grid.cell_height, y_ub),
        ];
        for (axis, mut row, scale, ub) in scaled {
            let delta = model.continuous(VarKey::FanoutDelta { wire: w, axis }, -ub, ub);
            row += (-scale, coord(model, w, axis));
            row -= delta;
            model.eq(row, 0.0);
            let abs = model.continuous(VarKey::FanoutAbsDelta { wire: w, axis }, 0.0, ub);
            model.ge(LinExpr::term(1.0, abs).add(-1.0, delta), 0.0);
            model.ge(LinExpr::term(1.0, abs).add(1.0, delta), 0.0);
            secondary += abs;
        }
    }
    secondary
}

/// `Σ weight · x - max_util = 0` with weights from current usage plus optional bumps.
pub fn encode_usage_weights(
    model: &mut Model,
    universe: &SwitchUniverse,
    usage: &UsageTable,
    bump_up: Option<&Dict<SwitchId, i64>>,
) -> VarId {
    let mut row = LinExpr::new();
    for id in universe.ids() {
        let bump = bump_up.and_then(|b| b.get(&id)).copied().unwrap_or(0);
        let x = model.switch_var(id);
        row += ((usage.current(id) + bump) as f64, x);
    }
    let max_util = model.free(VarKey::MaxUtil);
    row -= max_util;
    model.eq(row, 0.0);
    max_util
}

fn nonzero(norm: f64) -> f64 {
    if norm > 0.0 {
        norm
    } else {
        1.0
    }
}

// --------------------------------------------------------------------------------
// ### Round assembly
// --------------------------------------------------------------------------------

/// Builds the complete model of one synthesis round.
#[time("Encode synthesis round")]
#[builder]
pub fn encode_round(
    config: &ResolvedConfig,
    universe: &SwitchUniverse,
    oracle: Option<&HopOracle>,
    grid: &MuxGrid,
    usage: &UsageTable,
    hint: Option<&Floorplan>,
    // (usage, wirelength) normalization factors of the previous round
    #[builder(default = (1.0, 1.0))]
    norms: (f64, f64),
    #[builder(default)] banned: &[Pattern],
    #[builder(default)] min_difference: usize,
    bump_up: Option<&Dict<SwitchId, i64>>,
) -> Result<Model> {
    let mut model = Model::new();
    // switch variables first so that their handles follow universe order
    for id in universe.ids() {
        model.switch_var(id);
    }
    if let Some(limit) = overlap_limit(banned, min_difference) {
        encode_overlap_bounds(&mut model, banned, 0, limit);
    }

    let max_util = encode_usage_weights(&mut model, universe, usage, bump_up);
    let total_wl = config.multi_round().then(|| {
        let lock = hint.map(|hint| PlacementLock {
            hint,
            radius: config.placement_radius,
        });
        encode_placement(&mut model, universe, grid, lock)
    });
    let secondary = match total_wl {
        Some(_) if config.fanout_centering => {
            Some(encode_fanout_centering(&mut model, universe, grid, config.fanin))
        }
        _ => None,
    };
    match (config.objective, total_wl) {
        (ObjectiveKind::MinSwitches, _) => {
            let all = universe.ids().collect_vec();
            let expr = switch_sum(&mut model, &all);
            model.set_objective(ObjectiveSense::Minimize, expr);
        }
        (ObjectiveKind::MaxUsage, Some(wl)) => {
            let t = config.wl_tradeoff;
            let (un, wn) = norms;
            let mut expr =
                LinExpr::term(-(1.0 - t) / nonzero(un), max_util).add(t / nonzero(wn), wl);
            if let Some(secondary) = &secondary {
                for &(c, v) in secondary.terms() {
                    expr += (c * config.centering_weight, v);
                }
            }
            model.set_objective(ObjectiveSense::Minimize, expr);
        }
        (ObjectiveKind::MaxUsage, None) => {
            model.set_objective(ObjectiveSense::Maximize, LinExpr::term(1.0, max_util));
        }
    }

    if config.enforce_hop_optimality {
        let oracle = oracle.ok_or_else(|| {
            SynthError::InvalidConfig("hop optimality is enforced but no oracle was given".into())
        })?;
        encode_hop_optimality(
            &mut model,
            universe,
            oracle,
            config.enforce_external_symmetry,
            config.lazy_hop_rows,
        )?;
    }
    if config.enforce_fanin {
        encode_fan_exact(&mut model, universe, FanSide::In, config.fanin);
    }
    if config.enforce_fanout {
        encode_fan_exact(&mut model, universe, FanSide::Out, config.fanout);
    }
    encode_uniform_fan(&mut model, universe, FanSide::In, config.uniform_fanin);
    encode_uniform_fan(&mut model, universe, FanSide::Out, config.uniform_fanout);
    if config.limit_mux_size_number > 0 {
        encode_size_diversity(
            &mut model,
            universe,
            FanSide::In,
            &config.allowed_mux_sizes,
            config.limit_mux_size_number,
            config.size_indicator,
        );
    }
    if config.limit_fanout_size_number > 0 {
        encode_size_diversity(
            &mut model,
            universe,
            FanSide::Out,
            &config.allowed_fanout_sizes,
            config.limit_fanout_size_number,
            config.size_indicator,
        );
    }
    if config.mux_pair_input_share > 0 {
        encode_pair_share(&mut model, universe, config.mux_pair_input_share)?;
    }
    if config.max_switch_number > 0 {
        encode_max_switches(&mut model, universe, config.max_switch_number);
    }
    if config.enforce_external_symmetry {
        encode_symmetry(&mut model, universe, SymmetryKind::External);
    }
    if config.enforce_internal_symmetry {
        encode_symmetry(&mut model, universe, SymmetryKind::Internal);
    }
    if config.enforce_continuation {
        encode_coverage(&mut model, universe, CoverageKind::Continuation)?;
    } else if config.enforce_relaxed_continuation {
        encode_coverage(&mut model, universe, CoverageKind::RelaxedContinuation)?;
    }
    if config.enforce_two_turns {
        encode_coverage(&mut model, universe, CoverageKind::TwoTurns)?;
    } else if config.enforce_one_turn {
        encode_coverage(&mut model, universe, CoverageKind::OneTurn)?;
    }
    encode_length_order(&mut model, universe, config.length_order);
    if config.prohibit_opposite {
        encode_opposite_prohibition(&mut model, universe);
    }
    if config.prohibit_nonselected {
        let keep = greedy_preselect(universe, usage, config.fanin, config.preselect_mult);
        encode_nonselected(&mut model, universe, &keep);
    }
    if config.limit_lut_offset_replicas > 0 {
        encode_replica_limit(&mut model, universe, config.limit_lut_offset_replicas);
    }
    if config.force_adopted {
        let adopted = encode_adopted(&mut model, universe, usage);
        if adopted > 0 {
            info!("{} switches absent from the log are adopted", adopted);
        }
    }
    debug!(
        target: "internal",
        "round model: {} variables, {} rows",
        model.vars.len(),
        model.num_constraints()
    );
    Ok(model)
}
