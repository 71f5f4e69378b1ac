//! Element shape descriptors.
//!
//! # Conventions
//! Descriptors are evaluated on the planar cycle of an element: the polygon
//! itself in 2D and the apical face of a monolayer cell in 3D.
//!
//! - `shape_index` is `P / √A`; a regular hexagon scores about 3.72 and
//!   tissues are commonly read as solid-like below roughly 3.81.
//! - `aspect_ratio` is the longest over the shortest cycle edge.
//!
//! # Examples
//! ```rust
//! use vertex_tissue::geometry::quality::element_shape;
//! use vertex_tissue::topology::ids::ElementId;
//! use vertex_tissue::topology::mesh::VertexMesh;
//!
//! let mesh = VertexMesh::from_polygons(
//!     &[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]],
//!     &[vec![0, 1, 2, 3]],
//! )?;
//! let shape = element_shape(&mesh, ElementId::new(0))?;
//! assert!((shape.aspect_ratio - 2.0).abs() < 1e-12);
//! # Ok::<(), vertex_tissue::mesh_error::TissueMeshError>(())
//! ```

use crate::geometry::metrics::{EPS, distance, face_area, perimeter, signed_area_xy};
use crate::mesh_error::TissueMeshError;
use crate::topology::ids::ElementId;
use crate::topology::mesh::{MeshDimension, VertexMesh};
use itertools::Itertools;

/// Shape descriptors of one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementShape {
    /// Unsigned area of the planar cycle.
    pub area: f64,
    pub perimeter: f64,
    pub shape_index: f64,
    pub aspect_ratio: f64,
    /// Shortest cycle edge.
    pub min_edge: f64,
}

/// Compute shape descriptors for an element.
pub fn element_shape(mesh: &VertexMesh, e: ElementId) -> Result<ElementShape, TissueMeshError> {
    let cycle = mesh.element_cycle(e)?;
    let pts = mesh.positions_of(&cycle)?;
    let area = match mesh.dimension() {
        MeshDimension::Two => signed_area_xy(&pts).abs(),
        MeshDimension::Three => face_area(&pts),
    };
    let (mut min_edge, mut max_edge) = (f64::INFINITY, 0.0f64);
    for (&a, &b) in pts.iter().circular_tuple_windows() {
        let len = distance(a, b);
        min_edge = min_edge.min(len);
        max_edge = max_edge.max(len);
    }
    let p = perimeter(&pts);
    Ok(ElementShape {
        area,
        perimeter: p,
        shape_index: if area > EPS { p / area.sqrt() } else { f64::INFINITY },
        aspect_ratio: if min_edge > EPS {
            max_edge / min_edge
        } else {
            f64::INFINITY
        },
        min_edge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_shape_index_is_four() {
        let mesh = VertexMesh::from_polygons(
            &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            &[vec![0, 1, 2, 3]],
        )
        .unwrap();
        let shape = element_shape(&mesh, ElementId::new(0)).unwrap();
        assert!((shape.shape_index - 4.0).abs() < 1e-12);
        assert!((shape.aspect_ratio - 1.0).abs() < 1e-12);
        assert!((shape.min_edge - 1.0).abs() < 1e-12);
    }
}
