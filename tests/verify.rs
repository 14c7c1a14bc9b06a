use pretty_assertions::assert_eq;
use switch_pattern::*;

fn config() -> ResolvedConfig {
    SynthConfig::builder()
        .wires(
            ["H1_R_0", "H1_L_0", "V1_U_0", "V1_D_0"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        )
        .max_depth(0)
        .fanin(3)
        .fanout(3)
        .build()
        .resolve()
        .unwrap()
}

fn check_only_oracle(config: &ResolvedConfig) -> HopOracle {
    HopOracle::build()
        .alphabet(config.alphabet())
        .window((4, 4))
        .mode(OracleMode::CheckOnly)
        .call()
}

#[test]
fn test_finalized_pattern_round_trip() {
    let config = config();
    let universe = config.universe();
    let pattern = Pattern::from_ids(universe.ids().filter(|id| id % 2 == 0));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final.txt");
    let text = render_final_pattern(&universe, &pattern);
    assert_eq!(text.lines().count(), universe.len());
    assert_eq!(
        text.lines().filter(|l| l.starts_with('~')).count(),
        universe.len() - pattern.len()
    );
    fs::write(&path, text).unwrap();
    assert_eq!(read_pattern(&universe, &path).unwrap(), pattern);
}

#[test]
fn test_rendered_pattern_reads_back() {
    let config = config();
    let universe = config.universe();
    let usage = parse_usage_log(
        &universe,
        "Edge-splitter costs:\nedge (potential_edge__H1_R_0__lutp0_H1_R_0) (9, 4, 2)\n",
    );
    let pattern = Pattern::from_ids([0, 4, 7]);
    let text = render_pattern(&universe, &pattern, &usage);
    assert_eq!(text.lines().filter(|l| l.ends_with(" adopted")).count(), 2);
    assert_eq!(parse_pattern(&universe, &text, "pattern.txt").unwrap(), pattern);
}

#[test]
fn test_complete_universe_meets_enforced_features() {
    let config = config();
    let universe = config.universe();
    let oracle = check_only_oracle(&config);
    let full = Pattern::from_ids(universe.ids());
    let report = verify_pattern(&config, &universe, Some(&oracle), &full);
    assert!(report.all_enforced_pass(), "{:?}", report.failures());
    assert_eq!(report.passed("hop_optimality"), Some(true));
    assert_eq!(report.passed("fanin"), Some(true));
    assert_eq!(report.passed("fanout"), Some(true));
    assert!(report.get("fanin").unwrap().enforced);
}

#[test]
fn test_dropped_switch_is_reported() {
    let config = config();
    let universe = config.universe();
    let oracle = check_only_oracle(&config);
    let dropped = universe
        .lookup(&Switch::new(
            config.alphabet().find("H1_R_0").unwrap(),
            config.alphabet().find("H1_R_0").unwrap(),
            0,
        ))
        .unwrap();
    let pattern = Pattern::from_ids(universe.ids().filter(|&id| id != dropped));
    let report = verify_pattern(&config, &universe, Some(&oracle), &pattern);
    assert_eq!(report.passed("fanin"), Some(false));
    assert_eq!(report.passed("fanout"), Some(false));
    // straight runs to the right now need a detour
    assert_eq!(report.passed("hop_optimality"), Some(false));
    let failed = report.failures().iter().map(|c| c.feature).collect_vec();
    assert_eq!(failed, vec!["hop_optimality", "fanin", "fanout"]);
}

#[test]
fn test_without_oracle_hops_are_not_reported() {
    let config = config();
    let universe = config.universe();
    let full = Pattern::from_ids(universe.ids());
    let report = verify_pattern(&config, &universe, None, &full);
    assert!(report.get("hop_optimality").is_none());
    assert!(report.all_enforced_pass());
}
