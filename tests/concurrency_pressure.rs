mod common;

use common::SimulationBuilder;
use std::collections::HashSet;

#[test]
fn test_dense_packing_under_many_workers() {
    // Sites closer than two equilibrium radii: cells grow into each other.
    let mut sim = SimulationBuilder::new()
        .with_seed(99)
        .with_params(|p| {
            p.cells.cells = 37;
            p.cells.max_cells = Some(40);
            p.domain.initial_distance = 1.5;
            p.run.threads = 8;
            p.division.interval = 7;
        })
        .build();

    for _ in 0..60 {
        match sim.step() {
            Ok(report) => {
                let flagged: HashSet<_> = report.flagged.iter().map(|(id, _)| *id).collect();
                assert_eq!(flagged.len(), report.flagged.len(), "cell flagged twice");
            }
            Err(e) if e.is_runtime_abort() => break,
            Err(e) => panic!("tick failed: {e}"),
        }
        assert_grid_consistent!(sim);
        assert_finite_state!(sim);
    }

    let ids: HashSet<_> = sim.cells().iter().filter(|c| c.is_active()).map(|c| c.id).collect();
    assert_eq!(ids.len(), sim.live_count());
    for cell in sim.cells().iter().filter(|c| c.is_active()) {
        assert!(!cell.contacts.contains(&cell.id), "cell {} lists itself", cell.id);
    }
}

#[test]
fn test_virtual_budget_is_respected_every_tick() {
    let mut sim = SimulationBuilder::new()
        .with_seed(5)
        .with_params(|p| {
            p.cells.cells = 19;
            p.domain.initial_distance = 1.7;
            p.run.threads = 3;
        })
        .build();
    let n = sim.settings().particles_per_cell();

    for _ in 0..30 {
        let Ok(report) = sim.step() else {
            break;
        };
        assert!(report.virtuals <= 4 * n * report.live_cells.max(1));
        // Virtual particles never outlive their tick.
        assert!(sim.cells().iter().all(|c| c.virtuals.is_empty()));
    }
}
