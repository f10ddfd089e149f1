use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use superboids_core::{Parameters, Simulation};

fn params(cells: usize, threads: usize) -> Parameters {
    let mut params = Parameters::default();
    params.cells.cells = cells;
    params.run.threads = threads;
    params.run.seed = Some(7);
    params
}

fn bench_single_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for threads in [1, 4] {
        group.bench_function(format!("tick_61_cells_{threads}_threads"), |b| {
            b.iter_batched(
                || Simulation::new(params(61, threads)).ok(),
                |sim| {
                    if let Some(mut sim) = sim {
                        black_box(sim.step().ok());
                    }
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_warm_ticks(c: &mut Criterion) {
    let Ok(mut sim) = Simulation::new(params(127, 4)) else {
        return;
    };
    c.bench_function("warm_tick_127_cells", |b| {
        b.iter(|| black_box(sim.step().map(|r| r.live_cells).ok()))
    });
}

criterion_group!(benches, bench_single_tick, bench_warm_ticks);
criterion_main!(benches);
