//! Symmetric uniaxial stretch load.
//!
//! Vertices within `relative_width × extent` of the smallest x coordinate
//! are pulled towards −x and those near the largest towards +x. Each side
//! shares `magnitude` evenly, so the load has zero net force.

use super::{CellParameterProvider, ForceField, ForceLaw};
use crate::mesh_error::TissueMeshError;
use crate::simulation::context::SimulationContext;
use crate::topology::ids::VertexId;
use crate::topology::mesh::VertexMesh;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StretchForce {
    /// Total force applied on each side.
    pub magnitude: f64,
    /// Band width as a fraction of the tissue's x extent.
    pub relative_width: f64,
}

impl StretchForce {
    pub fn new(magnitude: f64, relative_width: f64) -> Self {
        Self {
            magnitude,
            relative_width,
        }
    }

    /// Vertices in the left and right load bands.
    pub fn bands(&self, mesh: &VertexMesh) -> (Vec<VertexId>, Vec<VertexId>) {
        let xs: Vec<(VertexId, f64)> = mesh
            .vertex_ids()
            .map(|v| (v, mesh.vertices[v.index()].position[0]))
            .collect();
        let (min_x, max_x) = xs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, x)| {
                (lo.min(x), hi.max(x))
            });
        if xs.is_empty() || max_x <= min_x {
            return (Vec::new(), Vec::new());
        }
        let band = self.relative_width * (max_x - min_x);
        let left = xs
            .iter()
            .filter(|(_, x)| *x <= min_x + band)
            .map(|(v, _)| *v)
            .collect();
        let right = xs
            .iter()
            .filter(|(_, x)| *x >= max_x - band)
            .map(|(v, _)| *v)
            .collect();
        (left, right)
    }
}

impl ForceLaw for StretchForce {
    fn name(&self) -> &'static str {
        "stretch"
    }

    fn contribute(
        &self,
        mesh: &VertexMesh,
        _parameters: &dyn CellParameterProvider,
        _context: &SimulationContext,
        field: &mut ForceField,
    ) -> Result<(), TissueMeshError> {
        let (left, right) = self.bands(mesh);
        if left.is_empty() || right.is_empty() {
            return Ok(());
        }
        let fl = self.magnitude / left.len() as f64;
        let fr = self.magnitude / right.len() as f64;
        for v in left {
            field.add(v, [-fl, 0.0, 0.0]);
        }
        for v in right {
            field.add(v, [fr, 0.0, 0.0]);
        }
        Ok(())
    }
}
