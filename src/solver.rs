//! The external MILP solver seen as a black box: files in, a value listing out.
use crate::*;

const LISTING_HEADER: &str = "Variable Name";
const SELECTED_EPS: f64 = 1e-6;

/// `name value` rows printed after the `Variable Name` header. Variables the solver did
/// not print are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverListing {
    values: IndexMap<String, f64>,
}

impl SolverListing {
    pub fn parse(text: &str) -> Self {
        let mut values = IndexMap::default();
        let mut reading = false;
        for line in text.lines() {
            if line.starts_with(LISTING_HEADER) {
                reading = true;
                continue;
            }
            if !reading {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(name), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
                continue;
            };
            if let Ok(value) = value.parse::<f64>() {
                values.insert(name.to_string(), value);
            }
        }
        Self { values }
    }
    pub fn from_values<S: Into<String>>(values: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            values: values.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
    pub fn selected(&self, name: &str) -> bool {
        self.value(name).is_some_and(|v| (v - 1.0).abs() < SELECTED_EPS)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Switches whose indicator is printed as 1.
    pub fn pattern(&self, model: &Model, problem: &LpProblem) -> Pattern {
        Pattern::from_ids(model.vars.iter().filter_map(|(id, key, _)| match key {
            VarKey::Switch(s) if self.selected(problem.name(id)) => Some(*s),
            _ => None,
        }))
    }
    /// Placement read back through the position variables; `None` unless every wire has
    /// exactly one distinct cell.
    pub fn floorplan(&self, model: &Model, problem: &LpProblem, wires: usize) -> Option<Floorplan> {
        let mut cells = vec![None; wires];
        for (name, _) in self.iter().filter(|(n, _)| self.selected(n)) {
            let Some(id) = problem.var(name) else {
                continue;
            };
            if let VarKey::MuxPos { wire, cell } = model.vars.key(id) {
                if cells[*wire].replace(*cell).is_some() {
                    return None;
                }
            }
        }
        Floorplan::from_cells(cells)
    }
}

/// Paths of one solver invocation, relative to `workdir`.
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub workdir: &'a Path,
    pub model_file: &'a str,
    pub warm_start: Option<&'a str>,
    pub log_file: &'a str,
    pub time_limit: u64,
}

/// Something that turns a written LP model into a value listing.
pub trait SolverBackend: Sync {
    fn solve(&self, request: &SolveRequest) -> Result<SolverListing>;
}

/// Runs the CPLEX interactive optimizer and reads the listing from its log file.
#[derive(Debug, Clone, new)]
pub struct CplexBackend {
    executable: PathBuf,
}

impl Default for CplexBackend {
    fn default() -> Self {
        Self::new("cplex".into())
    }
}

impl CplexBackend {
    fn script(&self, request: &SolveRequest) -> Vec<String> {
        let mut script = vec![
            format!("set timelimit {}", request.time_limit),
            format!("read {}", request.model_file),
        ];
        if let Some(mst) = request.warm_start {
            script.push(format!("read {}", mst));
        }
        script.extend([
            "optimize".to_string(),
            format!("set logfile {}", request.log_file),
            "display solution variables *".to_string(),
            "set output writelevel 4".to_string(),
            format!("write {}", request.warm_start.unwrap_or("prob.mst")),
            "quit".to_string(),
        ]);
        script
    }
}

impl SolverBackend for CplexBackend {
    #[time("Run CPLEX")]
    fn solve(&self, request: &SolveRequest) -> Result<SolverListing> {
        let log_path = request.workdir.join(request.log_file);
        if log_path.exists() {
            fs::remove_file(&log_path).map_err(|e| SynthError::io(&log_path, e))?;
        }
        let script = self.script(request);
        debug!(target: "internal", "cplex -c {}", script.iter().map(|s| format!("\"{}\"", s)).join(" "));
        let output = Command::new(&self.executable)
            .arg("-c")
            .args(&script)
            .current_dir(request.workdir)
            .output()
            .map_err(|e| SynthError::Solver(format!("cannot start {}: {}", self.executable.display(), e)))?;
        if !output.status.success() {
            return Err(SynthError::Solver(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        // no log means no incumbent was found within the limit
        match fs::read_to_string(&log_path) {
            Ok(text) => Ok(SolverListing::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("solver left no log in {}", request.workdir.display());
                Ok(SolverListing::default())
            }
            Err(e) => Err(SynthError::io(&log_path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
CPLEX> Incumbent solution
Variable Name           Solution Value
x_H1_R_0_H1_R_0_p0            1.000000
x_H1_R_0_V1_U_0_p0            0.999999999
mux_pos___H1_R_0___0___1      1.000000
mux_pos___V1_U_0___0___0      1.000000
max_util                     42.000000
All other variables in the range 1-12 are 0.
";

    fn problem() -> (SwitchUniverse, Model, LpProblem) {
        let alphabet = WireAlphabet::parse(&["H1_R_0", "V1_U_0"]).unwrap();
        let universe = SwitchUniverse::new(alphabet, 0);
        let mut model = Model::new();
        for id in universe.ids() {
            model.switch_var(id);
        }
        let grid = MuxGrid::new(&MuxGeometry::default(), 2);
        for (w, c) in (0..2).cartesian_product(grid.cells()) {
            model.binary(VarKey::MuxPos { wire: w, cell: c });
        }
        model.free(VarKey::MaxUtil);
        let lp = LpProblem::render(&model, &universe, false);
        (universe, model, lp)
    }

    #[test]
    fn test_parse_listing() {
        let listing = SolverListing::parse(LOG);
        assert_eq!(listing.value("max_util"), Some(42.0));
        assert_eq!(listing.value("total_wl"), None);
        assert!(listing.selected("x_H1_R_0_V1_U_0_p0"));
        assert!(SolverListing::parse("MIP - no integer solution\n").is_empty());
    }
    #[test]
    fn test_decode_pattern_and_floorplan() {
        let (_, model, lp) = problem();
        let listing = SolverListing::parse(LOG);
        assert_eq!(listing.pattern(&model, &lp).ids(), &[0, 1]);
        let floorplan = listing.floorplan(&model, &lp, 2).unwrap();
        assert_eq!(floorplan.cell(0), (0, 1));
        assert_eq!(floorplan.cell(1), (0, 0));
        let partial = SolverListing::from_values([("mux_pos___H1_R_0___0___1", 1.0)]);
        assert!(partial.floorplan(&model, &lp, 2).is_none());
    }
    #[test]
    fn test_cplex_script() {
        let backend = CplexBackend::default();
        let workdir = PathBuf::from(".");
        let request = SolveRequest {
            workdir: &workdir,
            model_file: "prob.lp",
            warm_start: Some("prob.mst"),
            log_file: "prob.log",
            time_limit: 60,
        };
        let script = backend.script(&request);
        assert_eq!(script[0], "set timelimit 60");
        assert_eq!(&script[1..4], ["read prob.lp", "read prob.mst", "optimize"]);
        assert_eq!(script.last().map(String::as_str), Some("quit"));
    }
}
