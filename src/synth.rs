//! Iterative solve/convergence loop around the external solver.
use crate::*;

const MODEL_FILE: &str = "prob.lp";
const WARM_START_FILE: &str = "prob.mst";
const LOG_FILE: &str = "prob.log";
const TRACE_FILE: &str = "rounds.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub pattern: Pattern,
    pub floorplan: Floorplan,
    /// `max_util` as reported by the solver.
    pub usage_cost: f64,
    /// Wirelength of the pattern on the quenched floorplan.
    pub wirelength: f64,
    pub rounds: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Solved(Solution),
    /// The solver selected nothing with nonzero usage, or printed no costs.
    NoSolution { rounds: usize },
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Solved(s) => Some(s),
            Outcome::NoSolution { .. } => None,
        }
    }
    pub fn into_solution(self) -> Option<Solution> {
        match self {
            Outcome::Solved(s) => Some(s),
            Outcome::NoSolution { .. } => None,
        }
    }
}

/// Scales (usage, wirelength) by their maximum.
pub fn normalized(usage: f64, wirelength: f64) -> (f64, f64) {
    let norm = usage.max(wirelength);
    if norm > 0.0 {
        (usage / norm, wirelength / norm)
    } else {
        (1.0, 1.0)
    }
}

/// `|new - prev| / prev`, or the absolute change when `prev` is 0.
pub fn relative_change(new: f64, prev: f64) -> f64 {
    let diff = (new - prev).abs();
    if prev == 0.0 {
        diff
    } else {
        diff / prev.abs()
    }
}

/// Mean and population deviation of `|s0| - |s0 ∩ s|` over all solutions, `s0` first.
pub fn analyze_similarity(solutions: &[Pattern]) -> (f64, f64) {
    let Some(first) = solutions.first() else {
        return (0.0, 0.0);
    };
    let differences = solutions
        .iter()
        .map(|s| (first.len() - first.overlap(s)) as f64)
        .collect_vec();
    (mean(&differences), pstdev(&differences))
}

pub fn similarity_table(solutions: &[Pattern]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.add_row(row!["Solution", "Switches", "Differs from #0"]);
    if let Some(first) = solutions.first() {
        for (i, s) in solutions.iter().enumerate() {
            table.add_row(row![i, s.len(), first.len() - first.overlap(s)]);
        }
    }
    let (m, sd) = analyze_similarity(solutions);
    table.add_row(row!["mean / std", "", format!("{:.2} / {:.2}", m, sd)]);
    table
}

/// Owns everything that stays fixed across the attempts of one configuration.
pub struct Synthesizer<B> {
    config: ResolvedConfig,
    universe: SwitchUniverse,
    grid: MuxGrid,
    oracle: Option<HopOracle>,
    backend: B,
}

#[bon]
impl<B: SolverBackend> Synthesizer<B> {
    /// Without an explicit oracle one is built over the solve window when hop optimality
    /// is enforced.
    #[builder]
    pub fn new(config: ResolvedConfig, backend: B, oracle: Option<HopOracle>) -> Result<Self> {
        let oracle = match oracle {
            Some(oracle) => Some(oracle),
            None if config.enforce_hop_optimality => Some(
                HopOracle::build()
                    .alphabet(config.alphabet())
                    .window(config.solve_window)
                    .index_threshold(config.index_threshold)
                    .call(),
            ),
            None => None,
        };
        if let Some(oracle) = &oracle {
            if oracle.alphabet() != config.alphabet() || oracle.mode() != OracleMode::Full {
                return Err(SynthError::InvalidConfig(
                    "the oracle must be a full oracle over the configured alphabet".into(),
                ));
            }
        }
        Ok(Self {
            universe: config.universe(),
            grid: config.grid(),
            config,
            oracle,
            backend,
        })
    }
}

impl<B: SolverBackend> Synthesizer<B> {
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }
    pub fn universe(&self) -> &SwitchUniverse {
        &self.universe
    }
    pub fn grid(&self) -> &MuxGrid {
        &self.grid
    }
    pub fn oracle(&self) -> Option<&HopOracle> {
        self.oracle.as_ref()
    }

    /// Reads a traffic log, replacing it by an approximation when configured.
    pub fn load_usage(&self, log: &Path) -> Result<UsageTable> {
        let usage = read_usage_log(&self.universe, log)?;
        info!("{} logged switches in {}", usage.len(), log.display());
        if self.config.approximate_usage > 0.0 {
            return Ok(approximate_usage(
                &usage,
                self.config.approximate_usage,
                self.config.usage_seed,
            ));
        }
        Ok(usage)
    }

    #[time("Solve traffic log")]
    pub fn solve_log(&self, log: &Path, workdir: &Path) -> Result<(Outcome, UsageTable)> {
        let usage = self.load_usage(log)?;
        let outcome = self.solve_usage(&usage, workdir)?;
        Ok((outcome, usage))
    }

    pub fn solve_usage(&self, usage: &UsageTable, workdir: &Path) -> Result<Outcome> {
        self.solve_rounds(usage, workdir, &[], 0)
    }

    fn solve_rounds(
        &self,
        usage: &UsageTable,
        workdir: &Path,
        banned: &[Pattern],
        min_difference: usize,
    ) -> Result<Outcome> {
        fs::create_dir_all(workdir).map_err(|e| SynthError::io(workdir, e))?;
        let warm_start = workdir.join(WARM_START_FILE);
        if warm_start.exists() {
            fs::remove_file(&warm_start).map_err(|e| SynthError::io(&warm_start, e))?;
        }
        let trace = FileWriter::new(workdir.join(TRACE_FILE))?;
        let wires = self.universe.alphabet().len();
        let multi_round = self.config.multi_round();
        let max_rounds = if multi_round {
            self.config.max_rounds.max(1)
        } else {
            1
        };

        let greedy = greedy_reference(&self.universe, usage, &self.grid, self.config.fanin);
        let mut norms = normalized(greedy.usage, greedy.wirelength);
        let mut stacking = greedy.stacking;
        trace.write_line(&format!(
            "greedy: usage {:.3} wirelength {:.4} norms ({:.4}, {:.4})",
            greedy.usage, greedy.wirelength, norms.0, norms.1
        ))?;
        let mut previous: Option<SolverListing> = None;
        let mut last = None;

        for round in 0..max_rounds {
            let model = encode_round()
                .config(&self.config)
                .universe(&self.universe)
                .maybe_oracle(self.oracle.as_ref())
                .grid(&self.grid)
                .usage(usage)
                .hint(&stacking)
                .norms(norms)
                .banned(banned)
                .min_difference(min_difference)
                .call()?;
            let problem = LpProblem::render(&model, &self.universe, self.config.lp_relax);
            problem.write(&workdir.join(MODEL_FILE))?;
            if let Some(listing) = &previous {
                fs::write(&warm_start, problem.render_mst(listing.iter()))
                    .map_err(|e| SynthError::io(&warm_start, e))?;
            }
            let request = SolveRequest {
                workdir,
                model_file: MODEL_FILE,
                warm_start: previous.is_some().then_some(WARM_START_FILE),
                log_file: LOG_FILE,
                time_limit: self.config.solver_time_limit,
            };
            let listing = self.backend.solve(&request)?;

            let Some(usage_cost) = listing.value("max_util") else {
                info!("Round {}: no costs reported, stopping without a solution", round);
                trace.write_line(&format!("round {}: no solution", round))?;
                return Ok(Outcome::NoSolution { rounds: round + 1 });
            };
            // no traffic-bearing switch was selected
            if usage_cost == 0.0 {
                info!("Round {}: usage cost is zero, stopping without a solution", round);
                trace.write_line(&format!("round {}: degenerate, zero usage", round))?;
                return Ok(Outcome::NoSolution { rounds: round + 1 });
            }
            let wirelength_cost = listing.value("total_wl").unwrap_or(0.0);
            let pattern = listing.pattern(&model, &problem);
            let decoded = listing
                .floorplan(&model, &problem, wires)
                .unwrap_or_else(|| stacking.clone());
            let quenched = quench_floorplan(
                &self.universe,
                &pattern,
                decoded,
                &self.grid,
                self.config.floorplan_seed,
            );
            if let Some(oracle) = &self.oracle {
                oracle.check_pattern(&self.universe, &pattern).into_result()?;
            }

            let next = normalized(usage_cost, wirelength_cost);
            let converged = !multi_round
                || relative_change(next.0, norms.0) < self.config.tolerance
                    && relative_change(next.1, norms.1) < self.config.tolerance;
            trace.write_line(&format!(
                "round {}: {} switches, usage {:.3}, wirelength {:.4} -> {:.4}, norms ({:.4}, {:.4}){}",
                round,
                pattern.len(),
                usage_cost,
                quenched.initial_wirelength,
                quenched.wirelength,
                next.0,
                next.1,
                if converged { ", converged" } else { "" }
            ))?;
            info!(
                "Round {}: {} switches, usage {}, wirelength {:.4}",
                round,
                pattern.len(),
                usage_cost.to_string().green(),
                quenched.wirelength
            );
            last = Some(Solution {
                pattern,
                floorplan: quenched.floorplan.clone(),
                usage_cost,
                wirelength: quenched.wirelength,
                rounds: round + 1,
                converged,
            });
            if converged {
                break;
            }
            norms = next;
            stacking = quenched.floorplan;
            previous = Some(listing);
        }
        trace.flush()?;
        if last.as_ref().is_some_and(|s| !s.converged) {
            warn!("No convergence after {} rounds, keeping the last solution", max_rounds);
        }
        Ok(last.map_or(Outcome::NoSolution { rounds: 0 }, Outcome::Solved))
    }

    /// Collects up to `count` solutions, each differing from all earlier ones in at least
    /// `min_difference` switches. Stops early when no further solution exists.
    #[time("Collect diverse solutions")]
    pub fn diverse_solutions(
        &self,
        usage: &UsageTable,
        workdir: &Path,
        count: usize,
        min_difference: usize,
    ) -> Result<Vec<Solution>> {
        let mut found: Vec<Solution> = Vec::new();
        for i in 0..count {
            let banned = found.iter().map(|s| s.pattern.clone()).collect_vec();
            let dir = workdir.join(format!("solution_{}", i));
            match self.solve_rounds(usage, &dir, &banned, min_difference)? {
                Outcome::Solved(solution) => found.push(solution),
                Outcome::NoSolution { .. } => {
                    warn!("Only {} of {} solutions found", found.len(), count);
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Independent attempts, one work directory per log.
    pub fn solve_batch(&self, logs: &[PathBuf], root: &Path) -> Vec<Result<(Outcome, UsageTable)>> {
        logs.par_iter()
            .enumerate()
            .map(|(i, log)| {
                let stem = log
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.solve_log(log, &root.join(format!("attempt_{}_{}", i, stem)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalized(50.0, 10.0), (1.0, 0.2));
        assert_eq!(normalized(0.0, 0.0), (1.0, 1.0));
        assert_eq!(normalized(30.0, 0.0), (1.0, 0.0));
        assert!(relative_change(1.0005, 1.0) < 0.001);
        assert!(relative_change(1.01, 1.0) > 0.001);
        assert_eq!(relative_change(0.0, 0.0), 0.0);
    }
    #[test]
    fn test_similarity() {
        let a = Pattern::from_ids([1, 2, 3, 4]);
        let b = Pattern::from_ids([1, 2, 5, 6]);
        let c = Pattern::from_ids([1, 2, 3, 7]);
        let (m, sd) = analyze_similarity(&[a.clone(), b, c]);
        assert!((m - 1.0).abs() < 1e-9);
        assert!((sd - (2.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(analyze_similarity(&[]), (0.0, 0.0));
        assert_eq!(analyze_similarity(&[a]), (0.0, 0.0));
    }
}
