use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{Level, LevelFilter};
use pretty_env_logger::formatted_builder;
use switch_pattern::*;

/// Switch-pattern synthesis for FPGA routing multiplexers
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Synthesis configuration (JSON); unset fields take template defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also print debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a pattern from one or more routing traffic logs
    Synthesize {
        /// Traffic logs; several logs are solved in parallel
        #[arg(required = true)]
        logs: Vec<PathBuf>,

        /// Work directory for solver files and results
        #[arg(short, long, default_value = "synthesis")]
        workdir: PathBuf,

        /// CPLEX interactive optimizer executable
        #[arg(long, default_value = "cplex")]
        cplex: PathBuf,

        /// Number of mutually different solutions to collect from the first log
        #[arg(long, default_value_t = 1)]
        solutions: usize,

        /// Minimum number of differing switches between collected solutions
        #[arg(long, default_value_t = 5)]
        min_diff: usize,

        /// Directory holding cached hop oracles
        #[arg(long)]
        oracle_cache: Option<PathBuf>,
    },

    /// Check a stored pattern against every feature family
    Verify {
        pattern: PathBuf,

        /// Hop-optimality window (defaults to the configured verify window)
        #[arg(long, num_args = 2, value_names = ["X", "Y"])]
        window: Option<Vec<i32>>,
    },

    /// List the whole switch universe with absent switches prefixed by `~`
    Finalize {
        pattern: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print optimal hop counts, and optionally how far a pattern is from them
    Hops {
        #[arg(long, num_args = 2, value_names = ["X", "Y"])]
        window: Option<Vec<i32>>,

        #[arg(long)]
        pattern: Option<PathBuf>,

        #[arg(long)]
        oracle_cache: Option<PathBuf>,
    },
}

fn init_logger_with_target_filter(verbose: bool) {
    formatted_builder()
        .filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .filter_module("internal", LevelFilter::Off)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    let raw = match path {
        Some(path) => SynthConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => SynthConfig::default(),
    };
    Ok(raw.resolve()?)
}

fn window_arg(window: Option<Vec<i32>>, fallback: Coord) -> Coord {
    match window.as_deref() {
        Some([x, y]) => (*x, *y),
        _ => fallback,
    }
}

fn oracle_for(
    config: &ResolvedConfig,
    window: Coord,
    mode: OracleMode,
    cache: Option<&Path>,
) -> Result<HopOracle> {
    Ok(match cache {
        Some(dir) => HopOracle::cached(
            &file_save::FileStore::new(dir),
            config.alphabet(),
            Some(window),
            mode,
            config.index_threshold,
        )?,
        None => HopOracle::build()
            .alphabet(config.alphabet())
            .window(window)
            .mode(mode)
            .index_threshold(config.index_threshold)
            .call(),
    })
}

fn write_solution(
    universe: &SwitchUniverse,
    usage: &UsageTable,
    solution: &Solution,
    dir: &Path,
) -> Result<()> {
    let path = dir.join("pattern.txt");
    fs::write(&path, render_pattern(universe, &solution.pattern, usage))
        .with_context(|| format!("writing {}", path.display()))?;
    file_save::FileStore::new(dir)
        .save_json(&solution.floorplan, "floorplan.json")
        .map_err(|e| anyhow::anyhow!("writing floorplan: {}", e))?;
    info!(
        "{} switches, usage {}, wirelength {:.4}, {} round(s){} -> {}",
        solution.pattern.len(),
        solution.usage_cost,
        solution.wirelength,
        solution.rounds,
        if solution.converged { "" } else { " (not converged)" },
        path.display().to_string().cyan()
    );
    Ok(())
}

fn synthesize(
    config: ResolvedConfig,
    logs: &[PathBuf],
    workdir: &Path,
    cplex: PathBuf,
    solutions: usize,
    min_diff: usize,
    oracle_cache: Option<&Path>,
) -> Result<()> {
    let oracle = if config.enforce_hop_optimality {
        let window = config.solve_window;
        Some(oracle_for(&config, window, OracleMode::Full, oracle_cache)?)
    } else {
        None
    };
    let synthesizer = Synthesizer::builder()
        .config(config)
        .backend(CplexBackend::new(cplex))
        .maybe_oracle(oracle)
        .build()?;
    let universe = synthesizer.universe();

    if solutions > 1 {
        let usage = synthesizer.load_usage(&logs[0])?;
        let found = synthesizer.diverse_solutions(&usage, workdir, solutions, min_diff)?;
        for (i, solution) in found.iter().enumerate() {
            let dir = workdir.join(format!("solution_{}", i));
            write_solution(universe, &usage, solution, &dir)?;
        }
        let patterns = found.into_iter().map(|s| s.pattern).collect_vec();
        similarity_table(&patterns).printstd();
        return Ok(());
    }

    let results = if logs.len() == 1 {
        vec![synthesizer.solve_log(&logs[0], workdir)]
    } else {
        synthesizer.solve_batch(logs, workdir)
    };
    for (log, result) in logs.iter().zip(results) {
        let (outcome, usage) = result.with_context(|| format!("solving {}", log.display()))?;
        match outcome {
            Outcome::Solved(solution) => {
                let dir = if logs.len() == 1 {
                    workdir.to_path_buf()
                } else {
                    workdir.join(log.file_stem().unwrap_or_default())
                };
                fs::create_dir_all(&dir)?;
                write_solution(universe, &usage, &solution, &dir)?;
            }
            Outcome::NoSolution { rounds } => {
                warn!("{}: no solution after {} round(s)", log.display(), rounds);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with_target_filter(cli.verbose);
    let config = load_config(cli.config.as_deref())?;
    let tmr = timer!(Level::Info; "Switch pattern tool");
    match cli.command {
        Commands::Synthesize {
            logs,
            workdir,
            cplex,
            solutions,
            min_diff,
            oracle_cache,
        } => synthesize(
            config,
            &logs,
            &workdir,
            cplex,
            solutions,
            min_diff,
            oracle_cache.as_deref(),
        )?,
        Commands::Verify { pattern, window } => {
            let universe = config.universe();
            let stored = read_pattern(&universe, &pattern)?;
            let window = window_arg(window, config.verify_window);
            let oracle = oracle_for(&config, window, OracleMode::CheckOnly, None)?;
            let report = verify_pattern(&config, &universe, Some(&oracle), &stored);
            report.table().printstd();
            let failures = report.failures();
            if !failures.is_empty() {
                bail!(
                    "{} enforced feature(s) violated: {}",
                    failures.len(),
                    failures.iter().map(|c| c.feature).join(", ")
                );
            }
            info!("{}", "All enforced features hold".green());
        }
        Commands::Finalize { pattern, output } => {
            let universe = config.universe();
            let stored = read_pattern(&universe, &pattern)?;
            fs::write(&output, render_final_pattern(&universe, &stored))
                .with_context(|| format!("writing {}", output.display()))?;
            info!(
                "{} of {} switches present -> {}",
                stored.len(),
                universe.len(),
                output.display()
            );
        }
        Commands::Hops {
            window,
            pattern,
            oracle_cache,
        } => {
            let window = window_arg(window, config.alphabet().default_window());
            let oracle = oracle_for(&config, window, OracleMode::Full, oracle_cache.as_deref())?;
            oracle.summary_table().printstd();
            if let Some(pattern) = pattern {
                let universe = config.universe();
                let stored = read_pattern(&universe, &pattern)?;
                let report = oracle.check_pattern(&universe, &stored);
                let mut table = Table::new();
                table.set_format(*format::consts::FORMAT_BOX_CHARS);
                table.add_row(row!["Offset", "Expected", "Observed", "Difference"]);
                for (v, (_, diff)) in report.violations.iter().zip(report.differences()) {
                    let observed = v.observed.map_or("-".to_string(), |o| o.to_string());
                    table.add_row(row![
                        format!("{:?}", v.offset),
                        v.expected,
                        observed,
                        format!("{:+.1}%", diff)
                    ]);
                }
                table.printstd();
                info!(
                    "{} of {} offsets optimal",
                    report.checked - report.violations.len(),
                    report.checked
                );
            }
        }
    }
    finish!(tmr);
    Ok(())
}
