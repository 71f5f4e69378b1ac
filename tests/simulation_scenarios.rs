use std::collections::BTreeSet;
use vertex_tissue::forces::{
    AreaPerimeterForce, CellParameters, ForceEvaluator, LateralParameters, MonolayerForce,
    StretchForce, SurfaceParameters,
};
use vertex_tissue::mesh_generation::{
    HoneycombOptions, hexagonal_prism_mesh, honeycomb_mesh, monolayer_from_2d, square_element,
};
use vertex_tissue::simulation::{
    DivisionAxis, IntegratorConfig, LifecycleEvent, ParameterTable, Simulation,
};
use vertex_tissue::topology::{AuditOptions, ElementId, VertexMesh, audit};

fn only_element(mesh: &VertexMesh) -> ElementId {
    let ids: Vec<_> = mesh.element_ids().collect();
    assert_eq!(ids.len(), 1);
    ids[0]
}

#[test]
fn square_relaxes_to_target_area_and_follows_a_new_target() {
    let params = CellParameters {
        target_area: 3.0,
        area_elasticity: 350.0,
        ..CellParameters::default()
    };
    let config = IntegratorConfig {
        dt: 1e-4,
        ..IntegratorConfig::default()
    };
    let mut sim = Simulation::new(
        square_element(1.0).unwrap(),
        ForceEvaluator::new().with_law(AreaPerimeterForce::new()),
        ParameterTable::new(params),
        config,
    )
    .unwrap();

    sim.run_until(0.05).unwrap();
    let e = only_element(sim.mesh());
    assert!((sim.time() - 0.05).abs() < 1e-10);
    assert!((sim.mesh().area(e).unwrap() - 3.0).abs() < 0.05);

    sim.biology_mut().set_default(CellParameters {
        target_area: 1.5,
        ..params
    });
    sim.run_until(0.1).unwrap();
    assert!((sim.mesh().area(e).unwrap() - 1.5).abs() < 0.05);
    assert_eq!(sim.mesh().element(e).unwrap().num_vertices(), 4);
}

#[test]
fn single_cube_reaches_target_volume() {
    let cube = monolayer_from_2d(&square_element(1.0).unwrap(), 1.0).unwrap();
    let silent = SurfaceParameters {
        line_tension: 0.0,
        area_elasticity: 0.0,
        target_area: 1.0,
    };
    let force = MonolayerForce::balanced(
        silent,
        LateralParameters {
            surface_tension: 0.0,
            line_tension: 0.0,
        },
    );
    let params = CellParameters {
        target_volume: 3.0,
        volume_elasticity: 350.0,
        ..CellParameters::default()
    };
    let mut sim = Simulation::new(
        cube,
        ForceEvaluator::new().with_law(force),
        ParameterTable::new(params),
        IntegratorConfig {
            dt: 1e-4,
            ..IntegratorConfig::default()
        },
    )
    .unwrap();

    let end = 0.1;
    sim.run_until(end).unwrap();
    let e = only_element(sim.mesh());
    assert!((sim.time() - end).abs() < 1e-10);
    assert!((sim.mesh().volume(e).unwrap() - 3.0).abs() < 0.05);

    sim.biology_mut().set_default(CellParameters {
        target_volume: 1.5,
        ..params
    });
    sim.run_until(2.0 * end).unwrap();
    assert!((sim.time() - 2.0 * end).abs() < 1e-10);
    assert!((sim.mesh().volume(e).unwrap() - 1.5).abs() < 0.05);
}

#[test]
fn stretched_honeycomb_monolayer_keeps_every_cell() {
    let height = 1.0;
    let mesh = hexagonal_prism_mesh(8, 10, 1.0, height).unwrap();
    assert_eq!(mesh.num_elements(), 80);

    let surface = SurfaceParameters {
        line_tension: 0.05,
        area_elasticity: 1.0,
        target_area: 1.0,
    };
    let monolayer = MonolayerForce::balanced(
        surface,
        LateralParameters {
            surface_tension: 0.1,
            line_tension: 0.05,
        },
    );
    let forces = ForceEvaluator::new()
        .with_law(monolayer)
        .with_law(StretchForce::new(0.25, 0.08));
    let params = CellParameters {
        target_volume: height,
        volume_elasticity: 1.0,
        ..CellParameters::default()
    };
    let config = IntegratorConfig {
        dt: 0.01,
        ..IntegratorConfig::default()
    };
    let mut sim = Simulation::new(mesh, forces, ParameterTable::new(params), config).unwrap();

    let end_time = 15.0;
    let summary = sim.run_until(end_time).unwrap();
    assert!(!summary.stopped_early);
    assert_eq!(summary.t2_collapses, 0);
    assert_eq!(sim.mesh().num_elements(), 80);
    assert!((sim.time() - end_time).abs() < 1e-10);
    assert!(sim.halted().is_none());

    let mesh = sim.mesh();
    for f in mesh.face_ids() {
        let distinct: BTreeSet<_> = mesh.face(f).unwrap().vertices().iter().collect();
        assert!(distinct.len() >= 3);
    }
    for e in mesh.element_ids() {
        assert!(mesh.volume(e).unwrap() > 0.0);
    }
    audit(mesh, AuditOptions::all()).unwrap();
}

#[test]
fn element_count_follows_divisions_and_deaths() {
    let mesh = honeycomb_mesh(4, 4, HoneycombOptions::default()).unwrap();
    let initial = mesh.num_elements();
    let mut sim = Simulation::new(
        mesh,
        ForceEvaluator::new().with_law(AreaPerimeterForce::new()),
        ParameterTable::new(CellParameters::default()),
        IntegratorConfig {
            dt: 0.01,
            rng_seed: 11,
            ..IntegratorConfig::default()
        },
    )
    .unwrap();

    let overridden = sim.mesh().cell_of(ElementId::new(5)).unwrap();
    sim.biology_mut().set(
        overridden,
        CellParameters {
            target_area: 2.0,
            ..CellParameters::default()
        },
    );

    let child = sim
        .divide_element(ElementId::new(5), DivisionAxis::ShortAxis)
        .unwrap();
    sim.divide_element(ElementId::new(10), DivisionAxis::Fixed([1.0, 0.3, 0.0]))
        .unwrap();
    sim.divide_element(ElementId::new(0), DivisionAxis::Random)
        .unwrap();
    sim.remove_element(ElementId::new(15)).unwrap();
    sim.remove_element(ElementId::new(3)).unwrap();

    let (divisions, deaths) = (3, 2);
    assert_eq!(sim.mesh().num_elements(), initial + divisions - deaths);
    assert_eq!(sim.biology().divisions(), divisions);
    assert_eq!(sim.biology().deaths(), deaths);
    // the daughter inherits the parent's override
    let child_cell = sim.mesh().cell_of(child).unwrap();
    assert!(sim.biology().has_override(child_cell));

    let summary = sim.run(5).unwrap();
    assert_eq!(summary.steps, 5);
    assert_eq!(summary.compactions, 1);
    assert_eq!(sim.mesh().num_elements(), initial + divisions - deaths);
    assert!(!sim.mesh().has_tombstones());
    assert!(sim.mesh().element_of_cell(child_cell).is_some());
    audit(sim.mesh(), AuditOptions::all()).unwrap();
}

#[test]
fn steps_report_renumbering_once() {
    let mesh = honeycomb_mesh(3, 3, HoneycombOptions::default()).unwrap();
    let mut sim = Simulation::new(
        mesh,
        ForceEvaluator::new().with_law(AreaPerimeterForce::new()),
        CellParameters::default(),
        IntegratorConfig {
            dt: 0.01,
            compact_interval: Some(2),
            ..IntegratorConfig::default()
        },
    )
    .unwrap();
    sim.remove_element(ElementId::new(4)).unwrap();

    let first = sim.step().unwrap();
    assert!(first.events.is_empty());
    let second = sim.step().unwrap();
    assert_eq!(second.step, 2);
    assert!(matches!(
        second.events.as_slice(),
        [LifecycleEvent::Renumbered(map)] if map.element(ElementId::new(4)).is_none()
    ));
    assert!(sim.step().unwrap().events.is_empty());
}

#[test]
fn stop_request_from_another_thread_is_seen_between_steps() {
    let mesh = honeycomb_mesh(2, 2, HoneycombOptions::default()).unwrap();
    let mut sim = Simulation::new(
        mesh,
        ForceEvaluator::new().with_law(AreaPerimeterForce::new()),
        CellParameters::default(),
        IntegratorConfig::default(),
    )
    .unwrap();
    sim.run(2).unwrap();

    let handle = sim.stop_handle();
    std::thread::spawn(move || handle.request_stop())
        .join()
        .unwrap();
    let summary = sim.run(100).unwrap();
    assert!(summary.stopped_early);
    assert_eq!(summary.steps, 0);
    assert_eq!(sim.step_index(), 2);
    assert_eq!(sim.last_valid_time(), sim.time());

    sim.stop_handle().reset();
    assert_eq!(sim.run(3).unwrap().steps, 3);
}
