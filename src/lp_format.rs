//! CPLEX LP text for a [`Model`], and the MST warm-start file. Variable names exist only here.
use crate::*;
use std::fmt::Write as _;

/// Terms per physical line; the LP reader caps line length.
const TERMS_PER_LINE: usize = 8;

fn axis_tag(axis: Axis) -> &'static str {
    match axis {
        Axis::H => "x",
        Axis::V => "y",
    }
}

fn side_tag(side: FanSide) -> &'static str {
    match side {
        FanSide::In => "mux",
        FanSide::Out => "fanout",
    }
}

fn switch_name(universe: &SwitchUniverse, id: SwitchId) -> String {
    let s = universe.switch(id);
    format!(
        "x_{}_{}_{}",
        universe.wire_name(s.driver),
        universe.wire_name(s.target),
        signed_tag(s.depth)
    )
}

/// Solver-facing name of a variable.
pub fn var_name(universe: &SwitchUniverse, id: VarId, key: &VarKey) -> String {
    let wire = |w: WireId| universe.wire_name(w);
    match key {
        VarKey::Switch(s) => switch_name(universe, *s),
        VarKey::PathChoice { offset, index } => {
            format!("sp{}_{}_{}", index, signed_tag(offset.0), signed_tag(offset.1))
        }
        VarKey::HopSlot {
            offset,
            wire: w,
            position,
        } => format!(
            "offset_{}_{}_{}_{}",
            signed_tag(offset.0),
            signed_tag(offset.1),
            wire(*w),
            position
        ),
        VarKey::And(_) => format!("land_{}", id.index()),
        VarKey::Or(_) => format!("lor_{}", id.index()),
        VarKey::SizeChoice { side, wire: w, size } => {
            format!("{}_size_{}_{}", side_tag(*side), wire(*w), size)
        }
        VarKey::SizePresent { side, size } => {
            format!("{}_size_{}_present", side_tag(*side), size)
        }
        VarKey::Sharing { a, b } => format!("sharing_{}_and_{}", wire(*a), wire(*b)),
        VarKey::PairForce { a, b } => {
            format!("force_input_sharing_{}_and_{}", wire(*a), wire(*b))
        }
        VarKey::MuxPos { wire: w, cell } => {
            format!("mux_pos___{}___{}___{}", wire(*w), cell.0, cell.1)
        }
        VarKey::UniformFan { side, axis } => {
            let base = match side {
                FanSide::In => "fanin",
                FanSide::Out => "fanout",
            };
            match axis {
                Some(Axis::H) => format!("{}H", base),
                Some(Axis::V) => format!("{}V", base),
                None => base.to_string(),
            }
        }
        VarKey::AtLeast(v) => format!("geq_{}", v.index()),
        VarKey::AtMost(v) => format!("leq_{}", v.index()),
        VarKey::WireCoord { wire: w, axis } => format!("{}_{}", wire(*w), axis_tag(*axis)),
        VarKey::CoordProduct { switch, axis } => {
            format!("prod_{}_{}", axis_tag(*axis), switch_name(universe, *switch))
        }
        VarKey::FanoutDelta { wire: w, axis } => {
            format!("fanout_delta_{}_{}", axis_tag(*axis), wire(*w))
        }
        VarKey::FanoutAbsDelta { wire: w, axis } => {
            format!("fanout_abs_delta_{}_{}", axis_tag(*axis), wire(*w))
        }
        VarKey::MaxUtil => "max_util".to_string(),
        VarKey::TotalWl => "total_wl".to_string(),
    }
}

/// A rendered model together with the name <-> handle maps used to decode solutions.
#[derive(Debug, Clone)]
pub struct LpProblem {
    text: String,
    names: Vec<String>,
    lookup: Dict<String, VarId>,
}

impl LpProblem {
    #[time("Render LP model")]
    pub fn render(model: &Model, universe: &SwitchUniverse, lp_relax: bool) -> Self {
        let names = model
            .vars
            .iter()
            .map(|(id, key, _)| var_name(universe, id, key))
            .collect_vec();
        let lookup = model
            .vars
            .iter()
            .map(|(id, _, _)| (names[id.index()].clone(), id))
            .collect();
        let mut problem = Self {
            text: String::new(),
            names,
            lookup,
        };
        problem.text = problem.write_text(model, lp_relax);
        debug!(
            target: "internal",
            "LP model: {} variables, {} rows, {} bytes",
            problem.names.len(),
            model.num_constraints(),
            problem.text.len()
        );
        problem
    }

    fn write_expr(&self, out: &mut String, expr: &LinExpr) {
        let expr = expr.normalized();
        if expr.is_empty() {
            match self.names.first() {
                Some(name) => out.push_str(&format!(" 0 {}", name)),
                None => out.push_str(" 0"),
            }
            return;
        }
        for (i, chunk) in expr.terms().chunks(TERMS_PER_LINE).enumerate() {
            if i > 0 {
                out.push_str("\n   ");
            }
            for (j, &(c, v)) in chunk.iter().enumerate() {
                let name = &self.names[v.index()];
                let sign = if c < 0.0 { "-" } else { "+" };
                let coef = if c.abs() == 1.0 {
                    String::new()
                } else {
                    format!("{} ", c.abs())
                };
                if i == 0 && j == 0 && c >= 0.0 {
                    write!(out, " {}{}", coef, name).ok();
                } else {
                    write!(out, " {} {}{}", sign, coef, name).ok();
                }
            }
        }
    }

    fn write_rows(&self, out: &mut String, prefix: char, rows: &[&Constraint]) {
        for (i, c) in rows.iter().enumerate() {
            write!(out, " {}{}:", prefix, i).ok();
            self.write_expr(out, &c.expr);
            let op = match c.sense {
                Sense::Le => "<=",
                Sense::Ge => ">=",
                Sense::Eq => "=",
            };
            writeln!(out, " {} {}", op, c.rhs).ok();
        }
    }

    fn write_text(&self, model: &Model, lp_relax: bool) -> String {
        let mut out = String::new();
        match model.objective() {
            Some(objective) => {
                out.push_str(match objective.sense {
                    ObjectiveSense::Minimize => "Minimize\n obj:",
                    ObjectiveSense::Maximize => "Maximize\n obj:",
                });
                self.write_expr(&mut out, &objective.expr);
            }
            None => {
                out.push_str("Minimize\n obj:");
                self.write_expr(&mut out, &LinExpr::new());
            }
        }
        out.push('\n');

        let (lazy, hard): (Vec<_>, Vec<_>) = model.constraints().iter().partition(|c| c.lazy);
        out.push_str("Subject To\n");
        self.write_rows(&mut out, 'C', &hard);
        if !lazy.is_empty() {
            out.push_str("Lazy Constraints\n");
            self.write_rows(&mut out, 'L', &lazy);
        }

        let mut binaries = Vec::new();
        let mut generals = Vec::new();
        out.push_str("Bounds\n");
        for (id, _, domain) in model.vars.iter() {
            let name = &self.names[id.index()];
            let (lb, ub) = match domain {
                Domain::Binary if lp_relax => (0.0, 1.0),
                Domain::Binary => {
                    binaries.push(name);
                    continue;
                }
                Domain::Integer { lb, ub } => {
                    if !lp_relax {
                        generals.push(name);
                    }
                    (lb, ub)
                }
                Domain::Continuous { lb, ub } => (lb, ub),
                Domain::Free => {
                    writeln!(out, " {} free", name).ok();
                    continue;
                }
            };
            writeln!(out, " {} <= {} <= {}", lb, name, ub).ok();
        }
        for (header, vars) in [("Binary", binaries), ("General", generals)] {
            if vars.is_empty() {
                continue;
            }
            writeln!(out, "{}", header).ok();
            for chunk in vars.chunks(TERMS_PER_LINE) {
                writeln!(out, " {}", chunk.iter().join(" ")).ok();
            }
        }
        out.push_str("End\n");
        out
    }

    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn name(&self, id: VarId) -> &str {
        &self.names[id.index()]
    }
    pub fn var(&self, name: &str) -> Option<VarId> {
        self.lookup.get(name).copied()
    }
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.text).map_err(|e| SynthError::io(path, e))
    }

    /// CPLEX MIP start carrying `values`; names unknown to this problem are dropped.
    pub fn render_mst<'a>(&self, values: impl IntoIterator<Item = (&'a str, f64)>) -> String {
        let mut out = String::new();
        out.push_str("<?xml version = \"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        out.push_str("<CPLEXSolutions version=\"1.2\">\n");
        out.push_str(" <CPLEXSolution version=\"1.2\">\n");
        out.push_str(
            "  <header problemName=\"prob.lp\" solutionName=\"m1\" solutionIndex=\"-1\" MIPStartEffortLevel=\"0\" writeLevel=\"2\"/>\n",
        );
        out.push_str("  <variables>\n");
        for (name, value) in values {
            if let Some(id) = self.var(name) {
                writeln!(
                    out,
                    "   <variable name=\"{}\" index=\"{}\" value=\"{}\"/>",
                    name,
                    id.index(),
                    value
                )
                .ok();
            }
        }
        out.push_str("  </variables>\n");
        out.push_str(" </CPLEXSolution>\n");
        out.push_str("</CPLEXSolutions>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (SwitchUniverse, Model) {
        let alphabet = WireAlphabet::parse(&["H1_R_0", "V1_U_0"]).unwrap();
        let universe = SwitchUniverse::new(alphabet, 0);
        let mut model = Model::new();
        let a = model.switch_var(0);
        let b = model.switch_var(1);
        let and = model.and(&[a, b]);
        model.add_lazy(LinExpr::sum([a, b]), Sense::Le, 1.0);
        let n = model.integer(VarKey::UniformFan { side: FanSide::In, axis: None }, 0.0, 4.0);
        model.eq(LinExpr::term(2.0, and).add(-1.0, n), 0.0);
        let util = model.free(VarKey::MaxUtil);
        model.set_objective(ObjectiveSense::Maximize, LinExpr::term(1.0, util));
        (universe, model)
    }

    #[test]
    fn test_sections_and_names() {
        let (universe, model) = small();
        let lp = LpProblem::render(&model, &universe, false);
        let text = lp.text();
        let sections = [
            "Maximize",
            "Subject To",
            "Lazy Constraints",
            "Bounds",
            "Binary",
            "General",
            "End",
        ];
        let positions = sections.iter().map(|s| text.find(s).unwrap()).collect_vec();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);
        let first = model.vars.get(&VarKey::Switch(0)).unwrap();
        assert_eq!(lp.name(first), "x_H1_R_0_H1_R_0_p0");
        assert!(text.contains(" L0: x_H1_R_0_H1_R_0_p0 + x_H1_R_0_V1_U_0_p0 <= 1"));
        assert!(text.contains(" 0 <= fanin <= 4"));
        assert!(text.contains(" max_util free"));
        assert!(!text.contains("<= max_util"));
        assert_eq!(lp.var("max_util").map(|v| model.vars.key(v).clone()), Some(VarKey::MaxUtil));
    }
    #[test]
    fn test_lp_relax_drops_integrality() {
        let (universe, model) = small();
        let lp = LpProblem::render(&model, &universe, true);
        assert!(!lp.text().contains("Binary"));
        assert!(!lp.text().contains("General"));
        assert!(lp.text().contains(" 0 <= x_H1_R_0_H1_R_0_p0 <= 1"));
    }
    #[test]
    fn test_mst_filters_unknown_names() {
        let (universe, model) = small();
        let lp = LpProblem::render(&model, &universe, false);
        let mst = lp.render_mst([("max_util", 7.0), ("x_gone", 1.0)]);
        assert!(mst.contains("name=\"max_util\""));
        assert!(!mst.contains("x_gone"));
    }
}
