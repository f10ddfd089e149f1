mod common;

use common::{periodic_distance, SimulationBuilder};
use superboids_core::Simulation;
use superboids_data::Vec2;

fn quiet() -> SimulationBuilder {
    SimulationBuilder::new().with_params(|p| {
        p.mechanics.eta = 0.0;
        p.mechanics.auto_alpha = vec![0.0];
        p.mechanics.inter_alpha = vec![vec![0.0]];
        p.mechanics.speed = vec![0.05];
    })
}

fn cortex_centroid(sim: &Simulation, id: u32) -> Vec2 {
    let cell = sim.cell(id).expect("missing cell");
    let ring = &cell.particles[1..];
    ring.iter().fold(Vec2::ZERO, |acc, p| acc + p.position) / ring.len() as f64
}

#[test]
fn test_isolated_cells_feel_no_inter_cell_force() {
    let mut sim = SimulationBuilder::new()
        .with_cells(vec![(0, Vec2::new(-5.0, 0.0)), (0, Vec2::new(5.0, 0.0))])
        .build();
    let cutoff = sim.settings().params.domain.neighbor_distance;
    assert!(10.0 - 2.0 * sim.settings().params.mechanics.radial_eq[0] > cutoff);

    let report = sim.step().expect("tick failed");
    assert_eq!(report.dropped_contacts, 0);
    for cell in sim.cells().iter().filter(|c| c.is_active()) {
        assert!(cell.contacts.is_empty(), "cell {} has contacts", cell.id);
        assert!(cell.hard_core_vectors.is_empty());
        assert!(cell.invasion_vectors.is_empty());
        for p in &cell.particles {
            assert!(p.neighbors.is_empty());
        }
    }
}

#[test]
fn test_touching_cells_see_each_other() {
    let mut sim = quiet()
        .with_cells(vec![(0, Vec2::new(-1.4, 0.0)), (0, Vec2::new(1.4, 0.0))])
        .build();
    sim.step().expect("tick failed");
    assert!(sim.cell(0).map_or(false, |c| c.contacts.contains(&1)));
    assert!(sim.cell(1).map_or(false, |c| c.contacts.contains(&0)));
}

#[test]
fn test_forced_overlap_pushes_cells_apart() {
    let mut sim = quiet()
        .with_cells(vec![(0, Vec2::new(-0.05, 0.0)), (0, Vec2::new(0.05, 0.0))])
        .build();
    let domain = sim.settings().domain();
    assert!(0.1 < sim.settings().core_diameter());
    let before = periodic_distance(cortex_centroid(&sim, 0), cortex_centroid(&sim, 1), domain);

    sim.step().expect("tick failed");
    assert!(
        sim.cells().iter().any(|c| !c.hard_core_vectors.is_empty()),
        "no hard-core contact recorded"
    );
    let after = periodic_distance(cortex_centroid(&sim, 0), cortex_centroid(&sim, 1), domain);
    assert!(after > before, "separation {before} -> {after}");

    let nuclei_before = 0.1;
    for _ in 0..3 {
        sim.step().expect("tick failed");
    }
    let nuclei_after = periodic_distance(
        sim.cell(0).expect("missing cell").nucleus_position(),
        sim.cell(1).expect("missing cell").nucleus_position(),
        domain,
    );
    assert!(nuclei_after > nuclei_before, "nuclei {nuclei_before} -> {nuclei_after}");
}
