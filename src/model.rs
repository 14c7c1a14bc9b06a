use crate::*;

/// Opaque handle of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FanSide {
    /// Incoming switches of a wire (multiplexer size).
    In,
    /// Outgoing switches of a wire.
    Out,
}

/// Structured identity of every variable the encoder can create.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarKey {
    Switch(SwitchId),
    PathChoice { offset: Coord, index: usize },
    HopSlot { offset: Coord, wire: WireId, position: u32 },
    /// Conjunction of the (sorted) operands.
    And(Vec<VarId>),
    Or(Vec<VarId>),
    SizeChoice { side: FanSide, wire: WireId, size: u32 },
    SizePresent { side: FanSide, size: u32 },
    Sharing { a: WireId, b: WireId },
    PairForce { a: WireId, b: WireId },
    MuxPos { wire: WireId, cell: Coord },
    UniformFan { side: FanSide, axis: Option<Axis> },
    AtLeast(VarId),
    AtMost(VarId),
    WireCoord { wire: WireId, axis: Axis },
    CoordProduct { switch: SwitchId, axis: Axis },
    FanoutDelta { wire: WireId, axis: Axis },
    FanoutAbsDelta { wire: WireId, axis: Axis },
    MaxUtil,
    TotalWl,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    Binary,
    Integer { lb: f64, ub: f64 },
    Continuous { lb: f64, ub: f64 },
    /// Unbounded in both directions; written as `free` in LP bounds.
    Free,
}

#[derive(Debug, Clone, Copy)]
pub struct Interned {
    pub id: VarId,
    pub fresh: bool,
}

/// Maps structured keys to variable handles and back.
#[derive(Debug, Default)]
pub struct VarRegistry {
    keys: Vec<(VarKey, Domain)>,
    index: Dict<VarKey, VarId>,
}

impl VarRegistry {
    pub fn intern(&mut self, key: VarKey, domain: Domain) -> Interned {
        if let Some(&id) = self.index.get(&key) {
            return Interned { id, fresh: false };
        }
        let id = VarId(self.keys.len() as u32);
        self.keys.push((key.clone(), domain));
        self.index.insert(key, id);
        Interned { id, fresh: true }
    }
    pub fn get(&self, key: &VarKey) -> Option<VarId> {
        self.index.get(key).copied()
    }
    pub fn key(&self, id: VarId) -> &VarKey {
        &self.keys[id.index()].0
    }
    pub fn domain(&self, id: VarId) -> Domain {
        self.keys[id.index()].1
    }
    pub fn set_domain(&mut self, id: VarId, domain: Domain) {
        self.keys[id.index()].1 = domain;
    }
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VarKey, Domain)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, (k, d))| (VarId(i as u32), k, *d))
    }
}

// --------------------------------------------------------------------------------
// ### Linear expressions
// --------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(f64, VarId)>,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (1.0, v)).collect(),
        }
    }
    pub fn term(coef: f64, var: VarId) -> Self {
        Self {
            terms: vec![(coef, var)],
        }
    }
    pub fn add(mut self, coef: f64, var: VarId) -> Self {
        self.terms.push((coef, var));
        self
    }
    pub fn terms(&self) -> &[(f64, VarId)] {
        &self.terms
    }
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
    /// Merges repeated variables and drops zero coefficients.
    pub fn normalized(&self) -> Self {
        let mut merged: IndexMap<VarId, f64> = IndexMap::default();
        for &(c, v) in &self.terms {
            *merged.entry(v).or_insert(0.0) += c;
        }
        Self {
            terms: merged
                .into_iter()
                .filter(|(_, c)| *c != 0.0)
                .map(|(v, c)| (c, v))
                .collect(),
        }
    }
    pub fn evaluate(&self, value: impl Fn(VarId) -> f64) -> f64 {
        self.terms.iter().map(|&(c, v)| c * value(v)).sum()
    }
}

impl std::ops::AddAssign<(f64, VarId)> for LinExpr {
    fn add_assign(&mut self, (coef, var): (f64, VarId)) {
        self.terms.push((coef, var));
    }
}

impl std::ops::AddAssign<VarId> for LinExpr {
    fn add_assign(&mut self, var: VarId) {
        self.terms.push((1.0, var));
    }
}

impl std::ops::SubAssign<VarId> for LinExpr {
    fn sub_assign(&mut self, var: VarId) {
        self.terms.push((-1.0, var));
    }
}

impl std::ops::AddAssign<&LinExpr> for LinExpr {
    fn add_assign(&mut self, other: &LinExpr) {
        self.terms.extend_from_slice(&other.terms);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        const EPS: f64 = 1e-6;
        match self {
            Sense::Le => lhs <= rhs + EPS,
            Sense::Ge => lhs >= rhs - EPS,
            Sense::Eq => (lhs - rhs).abs() <= EPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
    pub lazy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: LinExpr,
}

// --------------------------------------------------------------------------------
// ### Model
// --------------------------------------------------------------------------------

/// Linear 0/1 model owned by one synthesis round.
#[derive(Debug, Default)]
pub struct Model {
    pub vars: VarRegistry,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn binary(&mut self, key: VarKey) -> VarId {
        self.vars.intern(key, Domain::Binary).id
    }
    pub fn switch_var(&mut self, id: SwitchId) -> VarId {
        self.binary(VarKey::Switch(id))
    }
    pub fn switch_vars(&mut self, ids: &[SwitchId]) -> Vec<VarId> {
        ids.iter().map(|&id| self.switch_var(id)).collect()
    }
    pub fn continuous(&mut self, key: VarKey, lb: f64, ub: f64) -> VarId {
        self.vars.intern(key, Domain::Continuous { lb, ub }).id
    }
    pub fn free(&mut self, key: VarKey) -> VarId {
        self.vars.intern(key, Domain::Free).id
    }
    pub fn integer(&mut self, key: VarKey, lb: f64, ub: f64) -> VarId {
        self.vars.intern(key, Domain::Integer { lb, ub }).id
    }
    pub fn add(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            expr,
            sense,
            rhs,
            lazy: false,
        });
    }
    pub fn add_lazy(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            expr,
            sense,
            rhs,
            lazy: true,
        });
    }
    pub fn le(&mut self, expr: LinExpr, rhs: f64) {
        self.add(expr, Sense::Le, rhs);
    }
    pub fn ge(&mut self, expr: LinExpr, rhs: f64) {
        self.add(expr, Sense::Ge, rhs);
    }
    pub fn eq(&mut self, expr: LinExpr, rhs: f64) {
        self.add(expr, Sense::Eq, rhs);
    }
    pub fn fix(&mut self, var: VarId, value: f64) {
        self.eq(LinExpr::term(1.0, var), value);
    }
    pub fn set_objective(&mut self, sense: ObjectiveSense, expr: LinExpr) {
        self.objective = Some(Objective { sense, expr });
    }
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
    /// Checks every constraint against an assignment; returns the indices of violated rows.
    pub fn violated(&self, value: impl Fn(VarId) -> f64) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.sense.holds(c.expr.evaluate(&value), c.rhs))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_interns_once() {
        let mut model = Model::new();
        let a = model.switch_var(3);
        let b = model.switch_var(3);
        assert_eq!(a, b);
        let c = model.vars.intern(VarKey::MaxUtil, Domain::Free);
        assert!(c.fresh);
        assert!(!model.vars.intern(VarKey::MaxUtil, Domain::Free).fresh);
        assert_eq!(model.vars.len(), 2);
        assert_eq!(model.vars.key(a), &VarKey::Switch(3));
    }
    #[test]
    fn test_normalized_expr() {
        let mut model = Model::new();
        let a = model.switch_var(0);
        let b = model.switch_var(1);
        let mut e = LinExpr::sum([a, b]);
        e += (2.0, a);
        e -= b;
        assert_eq!(e.normalized().terms(), &[(3.0, a)]);
    }
    #[test]
    fn test_violated_rows() {
        let mut model = Model::new();
        let a = model.switch_var(0);
        let b = model.switch_var(1);
        model.le(LinExpr::sum([a, b]), 1.0);
        model.fix(a, 1.0);
        let ones = |_: VarId| 1.0;
        assert_eq!(model.violated(ones), vec![0]);
        assert!(model.violated(|v| if v == a { 1.0 } else { 0.0 }).is_empty());
    }
}
