//! Boolean and product relations expressed as linear rows over 0/1 variables.
use crate::*;

/// Margin used to separate `x >= b` from `x <= b - 1` for integer-valued `x`.
const INTEGER_MARGIN: f64 = 0.5;

fn canonical(operands: &[VarId]) -> Vec<VarId> {
    let mut ops = operands.to_vec();
    ops.sort_unstable();
    ops.dedup();
    ops
}

impl Model {
    /// `result = AND(operands)`: `Σa - c <= n - 1` and `c - a_i <= 0`.
    pub fn and_into(&mut self, operands: &[VarId], result: VarId) {
        let mut all = LinExpr::sum(operands.iter().copied());
        all -= result;
        self.le(all, operands.len() as f64 - 1.0);
        for &a in operands {
            self.le(LinExpr::term(1.0, result).add(-1.0, a), 0.0);
        }
    }
    /// Shared conjunction variable; its rows are emitted only the first time.
    pub fn and(&mut self, operands: &[VarId]) -> VarId {
        let ops = canonical(operands);
        if let [single] = ops[..] {
            return single;
        }
        let interned = self.vars.intern(VarKey::And(ops.clone()), Domain::Binary);
        if interned.fresh {
            self.and_into(&ops, interned.id);
        }
        interned.id
    }
    /// `result = OR(operands)`: `Σa - c >= 0` and `c - a_i >= 0`.
    pub fn or_into(&mut self, operands: &[VarId], result: VarId) {
        let mut all = LinExpr::sum(operands.iter().copied());
        all -= result;
        self.ge(all, 0.0);
        for &a in operands {
            self.ge(LinExpr::term(1.0, result).add(-1.0, a), 0.0);
        }
    }
    pub fn or(&mut self, operands: &[VarId]) -> VarId {
        let ops = canonical(operands);
        if let [single] = ops[..] {
            return single;
        }
        let interned = self.vars.intern(VarKey::Or(ops.clone()), Domain::Binary);
        if interned.fresh {
            self.or_into(&ops, interned.id);
        }
        interned.id
    }
    /// `indicator = [observed == target]` for an integer-valued expression in `[0, upper]`.
    ///
    /// Two big-M sandwiches decide `observed >= target` and `observed <= target`; with
    /// `M = max(upper, target) + 1` and a half-unit margin every integer value is classified
    /// exactly, including `target = 0` and targets above `upper`.
    pub fn equals_const(&mut self, indicator: VarId, observed: &LinExpr, target: f64, upper: f64) {
        let big_m = upper.max(target) + 1.0;
        let at_least = self.binary(VarKey::AtLeast(indicator));
        let at_most = self.binary(VarKey::AtMost(indicator));
        let low = target - INTEGER_MARGIN;
        let high = target + INTEGER_MARGIN;

        // M z1 >= x - (b - d)
        let mut row = LinExpr::term(big_m, at_least);
        row += &negated(observed);
        self.ge(row, -low);
        // M (1 - z1) >= (b - d) - x
        let mut row = observed.clone();
        row += (-big_m, at_least);
        self.ge(row, low - big_m);
        // M z2 >= (b + d) - x
        let mut row = LinExpr::term(big_m, at_most);
        row += observed;
        self.ge(row, high);
        // M (1 - z2) >= x - (b + d)
        let mut row = negated(observed);
        row += (-big_m, at_most);
        self.ge(row, -high - big_m);

        let both = self.and(&[at_least, at_most]);
        self.eq(LinExpr::term(1.0, indicator).add(-1.0, both), 0.0);
    }
    /// `product = indicator * continuous` for `0 <= continuous <= upper`, optionally shifted:
    /// the product tracks `continuous + shift` when the indicator is set and is 0 otherwise.
    pub fn continuous_product(
        &mut self,
        indicator: VarId,
        continuous: VarId,
        product: VarId,
        upper: f64,
        shift: f64,
    ) {
        let ub = upper + shift;
        self.ge(LinExpr::term(ub, indicator).add(-1.0, product), 0.0);
        self.le(LinExpr::term(1.0, product).add(-1.0, continuous), shift);
        self.le(
            LinExpr::term(1.0, continuous)
                .add(ub, indicator)
                .add(-1.0, product),
            ub - shift,
        );
        self.vars
            .set_domain(product, Domain::Continuous { lb: 0.0, ub });
    }
}

fn negated(expr: &LinExpr) -> LinExpr {
    let mut out = LinExpr::new();
    for &(c, v) in expr.terms() {
        out += (-c, v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Brute-forces every 0/1 assignment of `free` plus the derived variables and returns
    /// the feasible ones.
    fn feasible(model: &Model, n: usize) -> Vec<Vec<f64>> {
        (0..1u32 << n)
            .map(|mask| (0..n).map(|i| ((mask >> i) & 1) as f64).collect_vec())
            .filter(|vals| model.violated(|v| vals[v.index()]).is_empty())
            .collect()
    }

    #[test]
    fn test_and_truth_table() {
        let mut model = Model::new();
        let a = model.switch_var(0);
        let b = model.switch_var(1);
        let c = model.switch_var(2);
        let r = model.and(&[a, b, c]);
        assert_eq!(model.and(&[c, b, a]), r);
        let rows = model.num_constraints();
        model.and(&[a, c, b]);
        assert_eq!(model.num_constraints(), rows);
        for vals in feasible(&model, 4) {
            let expected = vals[0] * vals[1] * vals[2];
            assert_eq!(vals[r.index()], expected);
        }
        assert_eq!(feasible(&model, 4).len(), 8);
    }
    #[test]
    fn test_or_truth_table() {
        let mut model = Model::new();
        let a = model.switch_var(0);
        let b = model.switch_var(1);
        let r = model.or(&[a, b]);
        let rows = feasible(&model, 3);
        assert_eq!(rows.len(), 4);
        for vals in rows {
            assert_eq!(vals[r.index()], vals[0].max(vals[1]));
        }
    }
    #[test]
    fn test_equals_const_is_exact() {
        for target in [0, 1, 2, 3, 5] {
            let mut model = Model::new();
            let xs = (0..3).map(|i| model.switch_var(i)).collect_vec();
            let ind = model.binary(VarKey::MaxUtil);
            model.equals_const(ind, &LinExpr::sum(xs.clone()), target as f64, 3.0);
            let n = model.vars.len();
            let rows = feasible(&model, n);
            // exactly one completion per assignment of the observed switches
            assert_eq!(rows.len(), 8, "target {}", target);
            for vals in rows {
                let count = xs.iter().map(|x| vals[x.index()]).sum::<f64>();
                let expected = if count == target as f64 { 1.0 } else { 0.0 };
                assert_eq!(vals[ind.index()], expected);
            }
        }
    }
    #[test]
    fn test_continuous_product() {
        let mut model = Model::new();
        let z = model.switch_var(0);
        let x = model.continuous(VarKey::WireCoord { wire: 0, axis: Axis::H }, 0.0, 4.0);
        let p = model.continuous(VarKey::CoordProduct { switch: 0, axis: Axis::H }, 0.0, 4.0);
        model.continuous_product(z, x, p, 4.0, 2.0);
        let eval = |zv: f64, xv: f64, pv: f64| {
            model
                .violated(|v| match v {
                    v if v == z => zv,
                    v if v == x => xv,
                    _ => pv,
                })
                .is_empty()
        };
        assert!(eval(1.0, 3.0, 5.0));
        assert!(!eval(1.0, 3.0, 4.0));
        assert!(eval(0.0, 3.0, 0.0));
        assert!(!eval(0.0, 3.0, 1.0));
        assert_eq!(
            model.vars.domain(p),
            Domain::Continuous { lb: 0.0, ub: 6.0 }
        );
    }
}
