//! Structured tissue generators: square sheets, honeycomb sheets, and
//! monolayer prisms extruded from a 2D sheet.
//!
//! Every generator returns a fully wired [`VertexMesh`] with boundary flags
//! refreshed, so it can be handed straight to a
//! [`Simulation`](crate::simulation::Simulation).

use crate::mesh_error::TissueMeshError;
use crate::topology::ids::VertexId;
use crate::topology::mesh::{MeshDimension, VertexMesh};
use hashbrown::HashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Options for [`honeycomb_mesh`].
#[derive(Clone, Copy, Debug)]
pub struct HoneycombOptions {
    /// Area of every (unjittered) hexagon.
    pub element_area: f64,
    /// Uniform vertex perturbation, as a fraction of the hexagon side.
    pub jitter: f64,
    /// Seed for the jitter generator.
    pub seed: u64,
}

impl Default for HoneycombOptions {
    fn default() -> Self {
        Self {
            element_area: 1.0,
            jitter: 0.0,
            seed: 0,
        }
    }
}

fn invalid_geometry(message: impl Into<String>) -> TissueMeshError {
    TissueMeshError::InvalidConfig(message.into())
}

fn positive(name: &str, value: f64) -> Result<(), TissueMeshError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid_geometry(format!("{name} must be positive, got {value}")))
    }
}

/// A single square element `[0, side]²`.
pub fn square_element(side: f64) -> Result<VertexMesh, TissueMeshError> {
    positive("side", side)?;
    VertexMesh::from_polygons(
        &[[0.0, 0.0], [side, 0.0], [side, side], [0.0, side]],
        &[vec![0, 1, 2, 3]],
    )
}

/// Structured quadrilateral sheet over `[min, max]` with `nx`×`ny` elements.
pub fn quad_mesh(
    nx: usize,
    ny: usize,
    min: [f64; 2],
    max: [f64; 2],
) -> Result<VertexMesh, TissueMeshError> {
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    if !(max[0] > min[0] && max[1] > min[1]) {
        return Err(invalid_geometry("max must exceed min in both directions"));
    }

    let dx = (max[0] - min[0]) / nx as f64;
    let dy = (max[1] - min[1]) / ny as f64;
    let mut positions = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        let y = min[1] + dy * j as f64;
        for i in 0..=nx {
            positions.push([min[0] + dx * i as f64, y]);
        }
    }

    let row_stride = nx + 1;
    let mut cycles = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v0 = j * row_stride + i;
            let v3 = v0 + row_stride;
            cycles.push(vec![v0, v0 + 1, v3 + 1, v3]);
        }
    }
    VertexMesh::from_polygons(&positions, &cycles)
}

/// Side length of a regular hexagon with the given area.
pub fn hexagon_side(area: f64) -> f64 {
    (2.0 * area / (3.0 * 3f64.sqrt())).sqrt()
}

/// Honeycomb sheet of `nx` columns by `ny` rows of pointy-top hexagons.
///
/// Odd rows are shifted by half a hexagon width. Shared corners are merged,
/// so interior vertices are three-way junctions. Element `j * nx + i` sits at
/// column `i`, row `j`.
pub fn honeycomb_mesh(
    nx: usize,
    ny: usize,
    options: HoneycombOptions,
) -> Result<VertexMesh, TissueMeshError> {
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    positive("element_area", options.element_area)?;
    if !(0.0..0.25).contains(&options.jitter) {
        return Err(invalid_geometry(format!(
            "jitter must lie in [0, 0.25), got {}",
            options.jitter
        )));
    }

    let side = hexagon_side(options.element_area);
    let width = 3f64.sqrt() * side;
    let corners: Vec<[f64; 2]> = (0..6)
        .map(|k| {
            let angle = (-90.0 + 60.0 * k as f64).to_radians();
            [side * angle.cos(), side * angle.sin()]
        })
        .collect();

    // Corners shared between hexagons agree up to round-off; key them on a
    // lattice much finer than the side length.
    let key = |p: [f64; 2]| {
        (
            (p[0] / side * 1e6).round() as i64,
            (p[1] / side * 1e6).round() as i64,
        )
    };
    let mut index_of: HashMap<(i64, i64), usize> = HashMap::new();
    let mut positions: Vec<[f64; 2]> = Vec::new();
    let mut cycles = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        let shift = if j % 2 == 1 { 0.5 * width } else { 0.0 };
        let cy = 1.5 * side * j as f64;
        for i in 0..nx {
            let cx = width * i as f64 + shift;
            let cycle = corners
                .iter()
                .map(|c| {
                    let p = [cx + c[0], cy + c[1]];
                    *index_of.entry(key(p)).or_insert_with(|| {
                        positions.push(p);
                        positions.len() - 1
                    })
                })
                .collect();
            cycles.push(cycle);
        }
    }

    if options.jitter > 0.0 {
        let mut rng = SmallRng::seed_from_u64(options.seed);
        let amplitude = options.jitter * side;
        for p in &mut positions {
            p[0] += rng.gen_range(-amplitude..=amplitude);
            p[1] += rng.gen_range(-amplitude..=amplitude);
        }
    }

    let mesh = VertexMesh::from_polygons(&positions, &cycles)?;
    log::debug!(
        "honeycomb {nx}x{ny}: {} vertices, side {side:.6}",
        mesh.num_vertices()
    );
    Ok(mesh)
}

/// Extrude a 2D sheet into a monolayer of prisms.
///
/// Every live vertex becomes a basal vertex at `z = 0` and an apical partner
/// at `z = height`. Element labels carry over; cell handles are assigned in
/// element order.
pub fn monolayer_from_2d(sheet: &VertexMesh, height: f64) -> Result<VertexMesh, TissueMeshError> {
    sheet.expect_dimension(MeshDimension::Two)?;
    positive("height", height)?;

    let mut mesh = VertexMesh::new(MeshDimension::Three);
    let mut apical_of: Vec<Option<VertexId>> = vec![None; sheet.vertex_capacity()];
    for v in sheet.vertex_ids() {
        let p = sheet.position(v)?;
        let basal = mesh.add_vertex([p[0], p[1], 0.0]);
        let apical = mesh.add_vertex([p[0], p[1], height]);
        mesh.link_partners(apical, basal)?;
        apical_of[v.index()] = Some(apical);
    }

    for e in sheet.element_ids() {
        let element = sheet.element(e)?;
        let cycle = element
            .vertices()
            .iter()
            .map(|v| {
                apical_of[v.index()].ok_or(TissueMeshError::DanglingVertex {
                    element: e.index(),
                    vertex: v.index(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let prism = mesh.add_monolayer_element(&cycle)?;
        mesh.set_label(prism, element.label())?;
    }
    mesh.collect_orphans();
    mesh.refresh_boundary_flags();
    log::debug!(
        "extruded monolayer: {} vertices, {} faces, {} elements",
        mesh.num_vertices(),
        mesh.num_faces(),
        mesh.num_elements()
    );
    Ok(mesh)
}

/// Honeycomb monolayer of `nx`×`ny` hexagonal prisms with the given apical
/// area and height.
pub fn hexagonal_prism_mesh(
    nx: usize,
    ny: usize,
    area: f64,
    height: f64,
) -> Result<VertexMesh, TissueMeshError> {
    let sheet = honeycomb_mesh(
        nx,
        ny,
        HoneycombOptions {
            element_area: area,
            ..HoneycombOptions::default()
        },
    )?;
    monolayer_from_2d(&sheet, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::validation::{AuditOptions, audit};

    #[test]
    fn square_has_requested_area() {
        let mesh = square_element(2.0).unwrap();
        let e = mesh.element_ids().next().unwrap();
        assert!((mesh.area(e).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(mesh.boundary_vertices().len(), 4);
    }

    #[test]
    fn quad_mesh_shares_interior_vertices() {
        let mesh = quad_mesh(3, 2, [0.0, 0.0], [3.0, 2.0]).unwrap();
        assert_eq!(mesh.num_elements(), 6);
        assert_eq!(mesh.num_vertices(), 12);
        assert!(quad_mesh(0, 2, [0.0, 0.0], [1.0, 1.0]).is_err());
    }

    #[test]
    fn honeycomb_counts_and_areas() {
        let mesh = honeycomb_mesh(4, 3, HoneycombOptions::default()).unwrap();
        assert_eq!(mesh.num_elements(), 12);
        // 2 * nx * (ny + 1) + 2 * ny corners for an offset-row honeycomb
        assert_eq!(mesh.num_vertices(), 2 * 4 * 4 + 2 * 3);
        for e in mesh.element_ids() {
            assert_eq!(mesh.element(e).unwrap().vertices().len(), 6);
            assert!((mesh.area(e).unwrap() - 1.0).abs() < 1e-9);
        }
        audit(&mesh, AuditOptions::all()).unwrap();
    }

    #[test]
    fn jitter_is_seeded() {
        let opts = HoneycombOptions {
            jitter: 0.1,
            seed: 7,
            ..HoneycombOptions::default()
        };
        let a = honeycomb_mesh(3, 3, opts).unwrap();
        let b = honeycomb_mesh(3, 3, opts).unwrap();
        let v = a.vertex_ids().next().unwrap();
        assert_eq!(a.position(v).unwrap(), b.position(v).unwrap());
        assert!(
            honeycomb_mesh(
                2,
                2,
                HoneycombOptions {
                    jitter: 0.5,
                    ..opts
                }
            )
            .is_err()
        );
    }

    #[test]
    fn prisms_have_expected_volume() {
        let mesh = hexagonal_prism_mesh(3, 2, 1.0, 0.5).unwrap();
        assert_eq!(mesh.dimension(), MeshDimension::Three);
        assert_eq!(mesh.num_elements(), 6);
        assert!(mesh.is_monolayer());
        for e in mesh.element_ids() {
            assert_eq!(mesh.element(e).unwrap().faces().len(), 8);
            assert!((mesh.volume(e).unwrap() - 0.5).abs() < 1e-9);
        }
        audit(&mesh, AuditOptions::all()).unwrap();
    }

    #[test]
    fn extrusion_rejects_3d_input() {
        let prisms = hexagonal_prism_mesh(1, 1, 1.0, 1.0).unwrap();
        assert!(monolayer_from_2d(&prisms, 1.0).is_err());
        let sheet = square_element(1.0).unwrap();
        assert!(monolayer_from_2d(&sheet, 0.0).is_err());
    }
}
