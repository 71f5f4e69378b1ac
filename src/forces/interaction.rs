//! Linear spring interaction between nearby boundary vertices.
//!
//! Two live boundary vertices that share no element and lie closer than the
//! cutoff are joined by a spring `f = k (d − r0)` along their separation.
//! Candidate pairs come from a uniform spatial hash with cell size equal to
//! the cutoff.

use super::{CellParameterProvider, ForceField, ForceLaw};
use crate::geometry::metrics::{EPS, distance, scale, sub};
use crate::mesh_error::TissueMeshError;
use crate::simulation::context::SimulationContext;
use crate::topology::ids::VertexId;
use crate::topology::mesh::VertexMesh;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Spring repulsion/attraction between non-adjacent boundary vertices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryInteractionForce {
    pub spring_constant: f64,
    pub rest_length: f64,
    pub cutoff: f64,
}

impl Default for BoundaryInteractionForce {
    fn default() -> Self {
        Self {
            spring_constant: 1.0,
            rest_length: 0.25,
            cutoff: 0.25,
        }
    }
}

type GridKey = [i64; 3];

impl BoundaryInteractionForce {
    fn key(&self, p: [f64; 3]) -> GridKey {
        [
            (p[0] / self.cutoff).floor() as i64,
            (p[1] / self.cutoff).floor() as i64,
            (p[2] / self.cutoff).floor() as i64,
        ]
    }

    /// Interacting pairs `(a, b, distance)` with `a < b`, ascending.
    pub fn pairs(&self, mesh: &VertexMesh) -> Result<Vec<(VertexId, VertexId, f64)>, TissueMeshError> {
        if self.cutoff.is_nan() || self.cutoff <= 0.0 {
            return Err(TissueMeshError::InvalidConfig(format!(
                "interaction cutoff must be positive, got {}",
                self.cutoff
            )));
        }
        let boundary = mesh.boundary_vertices();
        let mut grid: HashMap<GridKey, Vec<VertexId>> = HashMap::new();
        for &v in &boundary {
            grid.entry(self.key(mesh.position(v)?)).or_default().push(v);
        }
        let mut pairs = Vec::new();
        for &a in &boundary {
            let pa = mesh.position(a)?;
            let [kx, ky, kz] = self.key(pa);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = grid.get(&[kx + dx, ky + dy, kz + dz]) else {
                            continue;
                        };
                        for &b in bucket {
                            if b <= a || shares_element(mesh, a, b)? {
                                continue;
                            }
                            let d = distance(pa, mesh.position(b)?);
                            if d < self.cutoff && d > EPS {
                                pairs.push((a, b, d));
                            }
                        }
                    }
                }
            }
        }
        pairs.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        Ok(pairs)
    }
}

fn shares_element(mesh: &VertexMesh, a: VertexId, b: VertexId) -> Result<bool, TissueMeshError> {
    let (ea, eb) = (mesh.vertex(a)?.elements(), mesh.vertex(b)?.elements());
    Ok(ea.iter().any(|e| eb.binary_search(e).is_ok()))
}

impl ForceLaw for BoundaryInteractionForce {
    fn name(&self) -> &'static str {
        "boundary-interaction"
    }

    fn contribute(
        &self,
        mesh: &VertexMesh,
        _parameters: &dyn CellParameterProvider,
        _context: &SimulationContext,
        field: &mut ForceField,
    ) -> Result<(), TissueMeshError> {
        for (a, b, d) in self.pairs(mesh)? {
            let dir = scale(sub(mesh.position(b)?, mesh.position(a)?), 1.0 / d);
            let f = scale(dir, self.spring_constant * (d - self.rest_length));
            field.add(a, f);
            field.add(b, scale(f, -1.0));
        }
        Ok(())
    }

    fn energy(
        &self,
        mesh: &VertexMesh,
        _parameters: &dyn CellParameterProvider,
    ) -> Result<Option<f64>, TissueMeshError> {
        let total = self
            .pairs(mesh)?
            .iter()
            .map(|&(_, _, d)| 0.5 * self.spring_constant * (d - self.rest_length).powi(2))
            .sum();
        Ok(Some(total))
    }
}
