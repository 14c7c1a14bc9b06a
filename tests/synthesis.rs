use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use switch_pattern::*;

const WIRES: [&str; 4] = ["H1_R_0", "H1_L_0", "V1_U_0", "V1_D_0"];

const USAGE_LOG: &str = "\
router: iteration 40
Edge-splitter costs:
edge (potential_edge__H1_R_0__lutp0_H1_R_0) (9, 4, 2)
edge (potential_edge__H1_R_0__lutp0_V1_U_0_tap_0) (5, 2, 1)
edge (potential_edge__V1_U_0_tap_0__lutp0_H1_L_0) (3, 1, 0)
edge (potential_edge__V1_D_0_tap_0__lutp0_V1_D_0_tap_0) (2, 2, 2)
";

/// Answers every request with whatever `respond` makes of the written LP text.
struct MockBackend<F> {
    respond: F,
    calls: AtomicUsize,
    warm_starts: AtomicUsize,
}

impl<F> MockBackend<F>
where
    F: Fn(&str, usize) -> SolverListing + Sync,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
            warm_starts: AtomicUsize::new(0),
        }
    }
}

impl<F> SolverBackend for MockBackend<F>
where
    F: Fn(&str, usize) -> SolverListing + Sync,
{
    fn solve(&self, request: &SolveRequest) -> Result<SolverListing> {
        let path = request.workdir.join(request.model_file);
        let text = fs::read_to_string(&path).map_err(|e| SynthError::io(&path, e))?;
        if let Some(mst) = request.warm_start {
            assert!(request.workdir.join(mst).exists());
            self.warm_starts.fetch_add(1, Ordering::SeqCst);
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.respond)(&text, call))
    }
}

fn switch_names(lp: &str) -> Vec<String> {
    let re = Regex::new(r"\bx_[A-Za-z0-9_]+").unwrap();
    re.find_iter(lp)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect()
}

fn select_all(lp: &str, _: usize) -> SolverListing {
    let mut values = switch_names(lp).into_iter().map(|n| (n, 1.0)).collect_vec();
    values.push(("max_util".to_string(), 10.0));
    values.push(("total_wl".to_string(), 5.0));
    SolverListing::from_values(values)
}

fn config() -> SynthConfig {
    SynthConfig::builder()
        .wires(WIRES.iter().map(|w| w.to_string()).collect())
        .max_depth(0)
        .fanin(3)
        .fanout(3)
        .solve_window((3, 3))
        .build()
}

fn synthesizer<F>(config: SynthConfig, respond: F) -> Synthesizer<MockBackend<F>>
where
    F: Fn(&str, usize) -> SolverListing + Sync,
{
    Synthesizer::builder()
        .config(config.resolve().unwrap())
        .backend(MockBackend::new(respond))
        .build()
        .unwrap()
}

fn write_log(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, USAGE_LOG).unwrap();
    path
}

#[test]
fn test_single_round_without_wirelength() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path(), "run.log");
    let synth = synthesizer(config(), select_all);
    let (outcome, usage) = synth.solve_log(&log, &dir.path().join("work")).unwrap();
    assert_eq!(usage.len(), 4);

    let solution = outcome.into_solution().unwrap();
    assert_eq!(solution.pattern.len(), synth.universe().len());
    assert_eq!(solution.rounds, 1);
    assert!(solution.converged);
    assert_eq!(solution.usage_cost, 10.0);
    assert_eq!(solution.floorplan.len(), WIRES.len());

    let work = dir.path().join("work");
    assert!(work.join("prob.lp").exists());
    let trace = fs::read_to_string(work.join("rounds.log")).unwrap();
    assert!(trace.starts_with("greedy:"));
    assert!(trace.contains("round 0"));
}

#[test]
fn test_wirelength_rounds_converge_with_warm_start() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path(), "run.log");
    let synth = synthesizer(
        SynthConfig {
            wl_tradeoff: 0.5,
            ..config()
        },
        select_all,
    );
    let (outcome, _) = synth.solve_log(&log, dir.path()).unwrap();
    let solution = outcome.into_solution().unwrap();
    assert_eq!(solution.rounds, 2);
    assert!(solution.converged);
    assert!(dir.path().join("prob.mst").exists());

    let lp = fs::read_to_string(dir.path().join("prob.lp")).unwrap();
    assert!(lp.starts_with("Minimize"));
    assert!(lp.contains("total_wl"));
}

#[test]
fn test_missing_costs_end_without_solution() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(config(), |_: &str, _| SolverListing::default());
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let outcome = synth.solve_usage(&usage, dir.path()).unwrap();
    assert!(matches!(outcome, Outcome::NoSolution { rounds: 1 }));
    assert!(outcome.solution().is_none());
}

#[test]
fn test_zero_costs_are_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(config(), |lp: &str, _| {
        let mut values = switch_names(lp).into_iter().map(|n| (n, 1.0)).collect_vec();
        values.push(("max_util".to_string(), 0.0));
        SolverListing::from_values(values)
    });
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let outcome = synth.solve_usage(&usage, dir.path()).unwrap();
    assert_eq!(outcome, Outcome::NoSolution { rounds: 1 });
}

fn select_none_with_wirelength(lp: &str, _: usize) -> SolverListing {
    let mut values = switch_names(lp).into_iter().map(|n| (n, 0.0)).collect_vec();
    values.push(("max_util".to_string(), 0.0));
    values.push(("total_wl".to_string(), 3.0));
    SolverListing::from_values(values)
}

#[test]
fn test_zero_usage_with_wirelength_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(
        SynthConfig {
            wl_tradeoff: 0.5,
            ..config()
        },
        select_none_with_wirelength,
    );
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let outcome = synth.solve_usage(&usage, dir.path()).unwrap();
    assert_eq!(outcome, Outcome::NoSolution { rounds: 1 });
    let trace = fs::read_to_string(dir.path().join("rounds.log")).unwrap();
    assert!(trace.contains("round 0: degenerate, zero usage"));
}

#[test]
fn test_zero_usage_without_hop_check_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(
        SynthConfig {
            wl_tradeoff: 0.5,
            enforce_hop_optimality: false,
            ..config()
        },
        select_none_with_wirelength,
    );
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let outcome = synth.solve_usage(&usage, dir.path()).unwrap();
    assert_eq!(outcome, Outcome::NoSolution { rounds: 1 });
}

#[test]
fn test_suboptimal_selection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(config(), |lp: &str, _| {
        let first = switch_names(lp).into_iter().next().unwrap();
        SolverListing::from_values([(first, 1.0), ("max_util".to_string(), 1.0)])
    });
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let err = synth.solve_usage(&usage, dir.path()).unwrap_err();
    assert!(matches!(err, SynthError::HopOptimalityViolated { .. }));
}

#[test]
fn test_relaxed_hops_skip_validation() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(
        SynthConfig {
            enforce_hop_optimality: false,
            ..config()
        },
        |lp: &str, _| {
            let first = switch_names(lp).into_iter().next().unwrap();
            SolverListing::from_values([(first, 1.0), ("max_util".to_string(), 1.0)])
        },
    );
    assert!(synth.oracle().is_none());
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let solution = synth.solve_usage(&usage, dir.path()).unwrap().into_solution().unwrap();
    assert_eq!(solution.pattern.len(), 1);
}

#[test]
fn test_diverse_solutions_stop_when_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(config(), |lp: &str, call| match call {
        0 => select_all(lp, call),
        _ => SolverListing::default(),
    });
    let usage = synth.load_usage(&write_log(dir.path(), "run.log")).unwrap();
    let found = synth.diverse_solutions(&usage, dir.path(), 3, 2).unwrap();
    assert_eq!(found.len(), 1);
    assert!(dir.path().join("solution_0/prob.lp").exists());
    assert!(dir.path().join("solution_1/prob.lp").exists());
    assert!(!dir.path().join("solution_2").exists());
}

#[test]
fn test_batch_uses_one_directory_per_log() {
    let dir = tempfile::tempdir().unwrap();
    let logs = vec![write_log(dir.path(), "a.log"), write_log(dir.path(), "b.log")];
    let synth = synthesizer(config(), select_all);
    let results = synth.solve_batch(&logs, &dir.path().join("batch"));
    assert_eq!(results.len(), 2);
    for result in results {
        let (outcome, _) = result.unwrap();
        assert!(outcome.solution().is_some());
    }
    assert!(dir.path().join("batch/attempt_0_a/prob.lp").exists());
    assert!(dir.path().join("batch/attempt_1_b/prob.lp").exists());
}

#[test]
fn test_oracle_must_match_alphabet() {
    let other = WireAlphabet::parse(&["H1_R_0", "V1_U_0"]).unwrap();
    let oracle = HopOracle::build().alphabet(&other).window((2, 2)).call();
    let result = Synthesizer::builder()
        .config(config().resolve().unwrap())
        .backend(MockBackend::new(select_all))
        .oracle(oracle)
        .build();
    assert!(matches!(result, Err(SynthError::InvalidConfig(_))));
}
