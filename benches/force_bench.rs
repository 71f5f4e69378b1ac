use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use vertex_tissue::forces::{
    AreaPerimeterForce, CellParameters, ForceEvaluator, LateralParameters, MonolayerForce,
    StretchForce, SurfaceParameters,
};
use vertex_tissue::mesh_generation::{HoneycombOptions, hexagonal_prism_mesh, honeycomb_mesh};
use vertex_tissue::remodel::{RemodelConfig, Remodeler};
use vertex_tissue::simulation::SimulationContext;

fn sheet(n: usize) -> vertex_tissue::topology::VertexMesh {
    honeycomb_mesh(
        n,
        n,
        HoneycombOptions {
            jitter: 0.1,
            seed: 7,
            ..HoneycombOptions::default()
        },
    )
    .expect("honeycomb")
}

fn bench_planar_forces(c: &mut Criterion) {
    let mut group = c.benchmark_group("planar_forces");
    let forces = ForceEvaluator::new()
        .with_law(AreaPerimeterForce::new())
        .with_law(StretchForce::new(0.25, 0.08));
    let params = CellParameters::default();
    let ctx = SimulationContext::new(0.01, 0);

    for &n in &[16usize, 48] {
        let mesh = sheet(n);
        group.bench_with_input(BenchmarkId::new("evaluate", n * n), &n, |b, _| {
            b.iter(|| {
                let field = forces.evaluate(&mesh, &params, &ctx).expect("forces");
                black_box(field);
            });
        });
        group.bench_with_input(BenchmarkId::new("energy", n * n), &n, |b, _| {
            b.iter(|| black_box(forces.energy(&mesh, &params).expect("energy")));
        });
    }
    group.finish();
}

fn bench_monolayer_forces(c: &mut Criterion) {
    let mut group = c.benchmark_group("monolayer_forces");
    let surface = SurfaceParameters {
        line_tension: 0.05,
        area_elasticity: 1.0,
        target_area: 1.0,
    };
    let forces = ForceEvaluator::new().with_law(MonolayerForce::balanced(
        surface,
        LateralParameters {
            surface_tension: 0.1,
            line_tension: 0.05,
        },
    ));
    let params = CellParameters::default();
    let ctx = SimulationContext::new(0.01, 0);

    for &n in &[8usize, 24] {
        let mesh = hexagonal_prism_mesh(n, n, 1.0, 1.0).expect("prisms");
        group.bench_with_input(BenchmarkId::new("evaluate", n * n), &n, |b, _| {
            b.iter(|| {
                let field = forces.evaluate(&mesh, &params, &ctx).expect("forces");
                black_box(field);
            });
        });
    }
    group.finish();
}

fn bench_remodel_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("remodel_scan");
    let remodeler = Remodeler::new(RemodelConfig::default());
    for &n in &[16usize, 48] {
        let mesh = sheet(n);
        group.bench_with_input(BenchmarkId::new("scan", n * n), &n, |b, _| {
            b.iter(|| black_box(remodeler.scan(&mesh).expect("scan")));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_planar_forces,
    bench_monolayer_forces,
    bench_remodel_scan
);
criterion_main!(benches);
