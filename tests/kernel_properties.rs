use proptest::prelude::*;
use vertex_tissue::forces::{
    AreaPerimeterForce, CellParameters, ForceEvaluator, LateralParameters, MonolayerForce,
    StretchForce, SurfaceParameters,
};
use vertex_tissue::mesh_generation::{
    HoneycombOptions, hexagon_side, honeycomb_mesh, monolayer_from_2d,
};
use vertex_tissue::simulation::SimulationContext;
use vertex_tissue::topology::{AuditOptions, ElementId, VertexId, VertexMesh, audit};

fn norm(f: [f64; 3]) -> f64 {
    (f[0] * f[0] + f[1] * f[1] + f[2] * f[2]).sqrt()
}

/// Central-difference check of `F = -∇E` on the listed vertices.
fn assert_forces_match_energy(
    mesh: &VertexMesh,
    forces: &ForceEvaluator,
    params: &CellParameters,
    vertices: &[VertexId],
    axes: usize,
) {
    let ctx = SimulationContext::new(0.01, 0);
    let field = forces.evaluate(mesh, params, &ctx).unwrap();
    let h = 1e-6;
    for &v in vertices {
        for axis in 0..axes {
            let mut probe = mesh.clone();
            let p = mesh.position(v).unwrap();
            let mut plus = p;
            plus[axis] += h;
            probe.set_position(v, plus).unwrap();
            let e_plus = forces.energy(&probe, params).unwrap();
            let mut minus = p;
            minus[axis] -= h;
            probe.set_position(v, minus).unwrap();
            let e_minus = forces.energy(&probe, params).unwrap();
            let numeric = -(e_plus - e_minus) / (2.0 * h);
            let analytic = field.get(v)[axis];
            assert!(
                (numeric - analytic).abs() < 1e-5 * analytic.abs().max(1.0),
                "vertex {v} axis {axis}: analytic {analytic}, numeric {numeric}"
            );
        }
    }
}

#[test]
fn regular_hexagon_at_equilibrium_feels_no_force() {
    let mesh = honeycomb_mesh(1, 1, HoneycombOptions::default()).unwrap();
    let (gamma, lambda, k) = (0.04, 0.12, 1.0);
    let side = hexagon_side(1.0);
    let perimeter = 6.0 * side;
    // area pressure balances perimeter tension for this target
    let target = 1.0 + (gamma * perimeter + lambda) / (3f64.sqrt() * k * side);
    let params = CellParameters {
        target_area: target,
        area_elasticity: k,
        perimeter_contractility: gamma,
        line_tension: lambda,
        ..CellParameters::default()
    };
    let forces = ForceEvaluator::new().with_law(AreaPerimeterForce::new());
    let field = forces
        .evaluate(&mesh, &params, &SimulationContext::new(0.01, 0))
        .unwrap();
    for v in mesh.vertex_ids() {
        assert!(norm(field.get(v)) < 1e-10, "vertex {v}: {:?}", field.get(v));
    }
}

#[test]
fn hexagon_without_tension_at_target_area_feels_no_force() {
    let mesh = honeycomb_mesh(1, 1, HoneycombOptions::default()).unwrap();
    let params = CellParameters {
        target_area: 1.0,
        perimeter_contractility: 0.0,
        line_tension: 0.0,
        ..CellParameters::default()
    };
    let forces = ForceEvaluator::new().with_law(AreaPerimeterForce::new());
    let field = forces
        .evaluate(&mesh, &params, &SimulationContext::new(0.01, 0))
        .unwrap();
    assert!(field.max_norm() < 1e-10);
    assert!(forces.energy(&mesh, &params).unwrap().abs() < 1e-20);
}

#[test]
fn tension_pulls_hexagon_vertices_inwards_symmetrically() {
    let mesh = honeycomb_mesh(1, 1, HoneycombOptions::default()).unwrap();
    let params = CellParameters {
        target_area: 1.0,
        ..CellParameters::default()
    };
    let forces = ForceEvaluator::new().with_law(AreaPerimeterForce::new());
    let field = forces
        .evaluate(&mesh, &params, &SimulationContext::new(0.01, 0))
        .unwrap();
    assert!(norm(field.net()) < 1e-10);
    let centre = mesh.centroid(ElementId::new(0)).unwrap();
    let magnitudes: Vec<f64> = mesh.vertex_ids().map(|v| norm(field.get(v))).collect();
    for v in mesh.vertex_ids() {
        let p = mesh.position(v).unwrap();
        let f = field.get(v);
        let outward = (p[0] - centre[0]) * f[0] + (p[1] - centre[1]) * f[1];
        assert!(outward < 0.0);
        assert!((norm(f) - magnitudes[0]).abs() < 1e-12);
    }
}

#[test]
fn planar_forces_are_the_energy_gradient() {
    let mesh = honeycomb_mesh(
        3,
        2,
        HoneycombOptions {
            jitter: 0.1,
            seed: 3,
            ..HoneycombOptions::default()
        },
    )
    .unwrap();
    let params = CellParameters {
        target_area: 0.8,
        ..CellParameters::default()
    };
    let forces = ForceEvaluator::new().with_law(AreaPerimeterForce::new());
    let probe: Vec<VertexId> = mesh.vertex_ids().step_by(3).collect();
    assert_forces_match_energy(&mesh, &forces, &params, &probe, 2);
}

#[test]
fn monolayer_forces_are_the_energy_gradient() {
    let sheet = honeycomb_mesh(
        2,
        2,
        HoneycombOptions {
            jitter: 0.1,
            seed: 5,
            ..HoneycombOptions::default()
        },
    )
    .unwrap();
    let mut mesh = monolayer_from_2d(&sheet, 1.2).unwrap();
    // lift one apical vertex so faces are not all axis-aligned
    let lifted = mesh.vertex_ids().nth(3).unwrap();
    let p = mesh.position(lifted).unwrap();
    mesh.set_position(lifted, [p[0], p[1], p[2] + 0.1]).unwrap();

    let force = MonolayerForce {
        apical: SurfaceParameters {
            line_tension: 0.3,
            area_elasticity: 1.5,
            target_area: 0.7,
        },
        basal: SurfaceParameters {
            line_tension: 0.2,
            area_elasticity: 1.0,
            target_area: 0.9,
        },
        lateral: LateralParameters {
            surface_tension: 0.1,
            line_tension: 0.4,
        },
    };
    let params = CellParameters {
        target_volume: 1.0,
        volume_elasticity: 3.0,
        ..CellParameters::default()
    };
    let forces = ForceEvaluator::new().with_law(force);
    let probe: Vec<VertexId> = mesh.vertex_ids().step_by(2).collect();
    assert_forces_match_energy(&mesh, &forces, &params, &probe, 3);
}

#[test]
fn stretch_load_has_no_net_force() {
    let mesh = honeycomb_mesh(4, 3, HoneycombOptions::default()).unwrap();
    let forces = ForceEvaluator::new().with_law(StretchForce::new(0.25, 0.08));
    let field = forces
        .evaluate(
            &mesh,
            &CellParameters::default(),
            &SimulationContext::new(0.01, 0),
        )
        .unwrap();
    assert!(norm(field.net()) < 1e-12);
    let pulled: f64 = field.iter().map(|(_, f)| f[0].max(0.0)).sum();
    assert!((pulled - 0.25).abs() < 1e-12);
}

#[test]
fn wrong_dimension_is_rejected() {
    let prisms = monolayer_from_2d(&honeycomb_mesh(1, 1, HoneycombOptions::default()).unwrap(), 1.0)
        .unwrap();
    let forces = ForceEvaluator::new().with_law(AreaPerimeterForce::new());
    assert!(
        forces
            .evaluate(
                &prisms,
                &CellParameters::default(),
                &SimulationContext::new(0.01, 0)
            )
            .is_err()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn jittered_sheets_stay_valid_under_division(
        nx in 1usize..5,
        ny in 1usize..5,
        seed in any::<u64>(),
        pick in any::<usize>(),
    ) {
        let mut mesh = honeycomb_mesh(nx, ny, HoneycombOptions {
            jitter: 0.15,
            seed,
            ..HoneycombOptions::default()
        }).unwrap();
        prop_assert!(audit(&mesh, AuditOptions::all()).is_ok());

        let before: f64 = mesh.element_ids().map(|e| mesh.area(e).unwrap()).sum();
        let target = ElementId::new((pick % (nx * ny)) as u32);
        mesh.divide_element(target, None).unwrap();
        let after: f64 = mesh.element_ids().map(|e| mesh.area(e).unwrap()).sum();

        prop_assert_eq!(mesh.num_elements(), nx * ny + 1);
        prop_assert!((before - after).abs() < 1e-9);
        prop_assert!(audit(&mesh, AuditOptions::all()).is_ok());
    }

    #[test]
    fn snapshots_restore_connectivity(
        nx in 1usize..4,
        ny in 1usize..4,
        seed in any::<u64>(),
    ) {
        let mesh = honeycomb_mesh(nx, ny, HoneycombOptions {
            jitter: 0.1,
            seed,
            ..HoneycombOptions::default()
        }).unwrap();
        let snap = mesh.snapshot();
        let decoded = vertex_tissue::io::MeshSnapshot::decode(&snap.encode()).unwrap();
        prop_assert_eq!(&decoded, &snap);
        let restored = VertexMesh::from_snapshot(&decoded).unwrap();
        for e in mesh.element_ids() {
            prop_assert_eq!(mesh.element_cycle(e).unwrap(), restored.element_cycle(e).unwrap());
        }
        for v in mesh.vertex_ids() {
            prop_assert_eq!(mesh.position(v).unwrap(), restored.position(v).unwrap());
        }
    }
}
