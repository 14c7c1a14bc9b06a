//! Metropolis annealing over reversible moves: floorplan quenching and usage approximation.
use crate::*;

const CALIBRATION_MOVES: usize = 1000;

/// Adaptive cooling keyed by the acceptance ratio of the last round.
pub struct CoolingSchedule;

impl CoolingSchedule {
    pub fn factor(alpha: f64) -> f64 {
        if alpha > 0.96 {
            0.5
        } else if alpha > 0.8 {
            0.9
        } else if alpha > 0.15 {
            0.95
        } else {
            0.8
        }
    }
    /// Proposals per temperature step for a state of `n` movable items.
    pub fn move_limit(n: usize) -> usize {
        (10.0 * (n as f64).powf(4.0 / 3.0)).ceil() as usize
    }
}

/// A state with random reversible moves and a full cost evaluation.
pub trait Chain {
    type Undo;
    type Snapshot;
    fn propose(&mut self, rng: &mut StdRng) -> Self::Undo;
    fn revert(&mut self, undo: Self::Undo);
    fn cost(&self) -> f64;
    fn snapshot(&self) -> Self::Snapshot;
}

struct ChainOutcome<S> {
    best: S,
    best_cost: f64,
    rounds: usize,
}

/// Cost of each calibration move relative to the starting cost; the state is left unchanged.
fn calibrate<C: Chain>(chain: &mut C, rng: &mut StdRng, start: f64) -> Vec<f64> {
    (0..CALIBRATION_MOVES)
        .map(|_| {
            let undo = chain.propose(rng);
            let delta = chain.cost() - start;
            chain.revert(undo);
            delta
        })
        .collect()
}

fn run_chain<C: Chain>(
    chain: &mut C,
    rng: &mut StdRng,
    mut temperature: f64,
    move_limit: usize,
    keep_going: impl Fn(f64, f64, f64) -> bool,
) -> ChainOutcome<C::Snapshot> {
    let mut current = chain.cost();
    let mut best_cost = current;
    let mut best = chain.snapshot();
    let mut rounds = 0;
    while temperature > 0.0 && keep_going(temperature, current, best_cost) {
        let mut accepted = 0;
        for _ in 0..move_limit {
            let undo = chain.propose(rng);
            let proposed = chain.cost();
            if proposed < current {
                current = proposed;
                accepted += 1;
                if proposed <= best_cost {
                    best_cost = proposed;
                    best = chain.snapshot();
                }
                continue;
            }
            let energy = (-(proposed - current) / temperature).exp();
            if rng.gen::<f64>() < energy {
                current = proposed;
                accepted += 1;
            } else {
                chain.revert(undo);
            }
        }
        let alpha = accepted as f64 / move_limit as f64;
        temperature *= CoolingSchedule::factor(alpha);
        rounds += 1;
        debug!(
            target: "internal",
            "round {}: T = {:.5}, cost = {:.4}, accepted {:.3}",
            rounds,
            temperature,
            current,
            alpha
        );
    }
    ChainOutcome {
        best,
        best_cost,
        rounds,
    }
}

fn distinct_pair(rng: &mut StdRng, n: usize) -> (usize, usize) {
    let a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n - 1);
    if b >= a {
        b += 1;
    }
    (a, b)
}

// --------------------------------------------------------------------------------
// ### Floorplan quench
// --------------------------------------------------------------------------------

struct FloorplanChain<'a> {
    floorplan: Floorplan,
    grid: &'a MuxGrid,
    switches: Vec<Switch>,
}

impl Chain for FloorplanChain<'_> {
    type Undo = (WireId, WireId);
    type Snapshot = Floorplan;
    fn propose(&mut self, rng: &mut StdRng) -> Self::Undo {
        let (a, b) = distinct_pair(rng, self.floorplan.len());
        self.floorplan.swap(a, b);
        (a, b)
    }
    fn revert(&mut self, (a, b): Self::Undo) {
        self.floorplan.swap(a, b);
    }
    fn cost(&self) -> f64 {
        self.switches
            .iter()
            .map(|s| self.floorplan.switch_len(self.grid, s))
            .sum()
    }
    fn snapshot(&self) -> Floorplan {
        self.floorplan.clone()
    }
}

#[derive(Debug, Clone)]
pub struct QuenchResult {
    pub floorplan: Floorplan,
    pub wirelength: f64,
    pub initial_wirelength: f64,
    pub rounds: usize,
}

/// Swaps multiplexer positions to shorten the pattern's wirelength. Returns the best
/// floorplan seen; the same seed always gives the same result.
#[time("Quench floorplan")]
pub fn quench_floorplan(
    universe: &SwitchUniverse,
    pattern: &Pattern,
    floorplan: Floorplan,
    grid: &MuxGrid,
    seed: u64,
) -> QuenchResult {
    let n = floorplan.len();
    let mut chain = FloorplanChain {
        floorplan,
        grid,
        switches: pattern.iter().map(|id| universe.switch(id)).collect(),
    };
    let initial = chain.cost();
    if n < 2 || initial == 0.0 {
        return QuenchResult {
            floorplan: chain.floorplan,
            wirelength: initial,
            initial_wirelength: initial,
            rounds: 0,
        };
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let temperature = 2.0 * stdev(&calibrate(&mut chain, &mut rng, initial));
    let outcome = run_chain(
        &mut chain,
        &mut rng,
        temperature,
        CoolingSchedule::move_limit(n),
        |t, wl, _| t > 0.005 * wl / n as f64,
    );
    info!(
        "Quenched wirelength {:.4} -> {:.4} in {} rounds",
        initial, outcome.best_cost, outcome.rounds
    );
    QuenchResult {
        floorplan: outcome.best,
        wirelength: outcome.best_cost,
        initial_wirelength: initial,
        rounds: outcome.rounds,
    }
}

// --------------------------------------------------------------------------------
// ### Usage approximation
// --------------------------------------------------------------------------------

struct UsageChain {
    values: Vec<i64>,
    original: Vec<f64>,
    target: f64,
}

impl UsageChain {
    fn distance(&self) -> f64 {
        let values = self.values.iter().map(|&v| v as f64).collect_vec();
        euclidean(&self.original, &values)
    }
}

impl Chain for UsageChain {
    /// (source, old source value, sink, old sink value)
    type Undo = (usize, i64, usize, i64);
    type Snapshot = Vec<i64>;
    fn propose(&mut self, rng: &mut StdRng) -> Self::Undo {
        let n = self.values.len();
        let source = loop {
            let i = rng.gen_range(0..n);
            if self.values[i] > 0 {
                break i;
            }
        };
        let mut sink = rng.gen_range(0..n - 1);
        if sink >= source {
            sink += 1;
        }
        let undo = (source, self.values[source], sink, self.values[sink]);
        let quantity = rng.gen_range(1..=self.values[source]);
        self.values[source] -= quantity;
        self.values[sink] += quantity;
        undo
    }
    fn revert(&mut self, (source, s, sink, k): Self::Undo) {
        self.values[source] = s;
        self.values[sink] = k;
    }
    fn cost(&self) -> f64 {
        (self.distance() - self.target).abs()
    }
    fn snapshot(&self) -> Vec<i64> {
        self.values.clone()
    }
}

/// Redistributes current usage so that the result lies at `fraction` of the original
/// vector's norm from it. Total usage is preserved.
#[time("Approximate usage")]
pub fn approximate_usage(usage: &UsageTable, fraction: f64, seed: u64) -> UsageTable {
    let entries = usage.sorted();
    let values = entries.iter().map(|(_, u)| u.cur).collect_vec();
    if fraction <= 0.0 || values.len() < 2 || values.iter().all(|&v| v <= 0) {
        return usage.clone();
    }
    let original = values.iter().map(|&v| v as f64).collect_vec();
    let target = fraction * euclidean(&original, &vec![0.0; original.len()]);
    info!("Target usage distance: {:.3}", target);
    let n = values.len();
    let mut chain = UsageChain {
        values,
        original,
        target,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let deltas = calibrate(&mut chain, &mut rng, target)
        .into_iter()
        .map(f64::abs)
        .collect_vec();
    let outcome = run_chain(
        &mut chain,
        &mut rng,
        20.0 * stdev(&deltas),
        CoolingSchedule::move_limit(n),
        |t, cur, best| t > 0.005 * cur / n as f64 && best > 1.0,
    );
    info!("Approximated usage at distance error {:.3}", outcome.best_cost);
    let mut approximated = usage.clone();
    for ((id, _), cur) in entries.iter().zip(outcome.best) {
        approximated.set_current(*id, cur);
    }
    approximated
}
