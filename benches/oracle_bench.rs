use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use switch_pattern::*;

const WIRES: [&str; 8] = [
    "H1_R_0", "H1_L_0", "V1_U_0", "V1_D_0", "H2_R_0", "H2_L_0", "V2_U_0", "V2_D_0",
];

// Builds the offset graph and runs BFS for growing windows.
fn bench_oracle_build(c: &mut Criterion) {
    let alphabet = WireAlphabet::parse(&WIRES).unwrap();
    let mut group = c.benchmark_group("Hop oracle");
    for size in [2, 4, 6] {
        for mode in [OracleMode::CheckOnly, OracleMode::Full] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), size),
                &size,
                |b, &size| {
                    b.iter(|| {
                        black_box(
                            HopOracle::build()
                                .alphabet(&alphabet)
                                .window((size, size))
                                .mode(mode)
                                .call(),
                        )
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_quench(c: &mut Criterion) {
    let alphabet = WireAlphabet::parse(&WIRES).unwrap();
    let universe = SwitchUniverse::new(alphabet, 1);
    let grid = MuxGrid::new(&MuxGeometry::default(), WIRES.len());
    let pattern = Pattern::from_ids(universe.ids().step_by(3));
    let stacking = Floorplan::stacked(&grid, WIRES.len());
    c.bench_function("Quench stacked floorplan", |b| {
        b.iter(|| {
            black_box(quench_floorplan(
                &universe,
                &pattern,
                stacking.clone(),
                &grid,
                7,
            ))
        });
    });
}

criterion_group!(benches, bench_oracle_build, bench_quench);
criterion_main!(benches);
