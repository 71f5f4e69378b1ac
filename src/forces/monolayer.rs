//! Apical/basal/lateral energy law for 3D monolayer cells.
//!
//! Per cell:
//!
//! ```text
//! E = Σ_{apical f} κa (A_f − A0a)² + λa P_f
//!   + Σ_{basal f}  κb (A_f − A0b)² + λb P_f
//!   + Σ_{lateral f} γ A_f
//!   + λl Σ_{apical–basal edges} ℓ
//!   + K_V (V − V0)²
//! ```
//!
//! Surface parameters are global to the law; `K_V` and `V0` come from the
//! per-cell [`CellParameters`](super::CellParameters). Untagged faces are
//! treated as lateral.

use super::{
    CellParameterProvider, ElementForces, ForceField, ForceLaw, accumulate_elements, sum_elements,
};
use crate::geometry::metrics::{
    distance, edge_length_gradient, face_area, face_area_gradient, face_volume_term, perimeter,
    perimeter_gradient, scale,
};
use crate::mesh_error::TissueMeshError;
use crate::simulation::context::SimulationContext;
use crate::topology::entity::{FaceKind, RegionTag};
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::{MeshDimension, VertexMesh};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Line tension and area elasticity of an apical or basal surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceParameters {
    pub line_tension: f64,
    pub area_elasticity: f64,
    pub target_area: f64,
}

/// Surface tension of lateral faces and tension of apical–basal edges.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LateralParameters {
    pub surface_tension: f64,
    pub line_tension: f64,
}

/// Monolayer energy law.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonolayerForce {
    pub apical: SurfaceParameters,
    pub basal: SurfaceParameters,
    pub lateral: LateralParameters,
}

impl MonolayerForce {
    /// Same surface parameters on both sides of the sheet.
    pub fn balanced(surface: SurfaceParameters, lateral: LateralParameters) -> Self {
        Self {
            apical: surface,
            basal: surface,
            lateral,
        }
    }

    fn check(mesh: &VertexMesh) -> Result<(), TissueMeshError> {
        if mesh.dimension() != MeshDimension::Three {
            return Err(TissueMeshError::DimensionMismatch {
                expected: 3,
                found: mesh.dimension().as_u8(),
            });
        }
        Ok(())
    }

    fn surface(&self, kind: FaceKind) -> Option<&SurfaceParameters> {
        match kind {
            FaceKind::Apical => Some(&self.apical),
            FaceKind::Basal => Some(&self.basal),
            FaceKind::Lateral | FaceKind::Untagged => None,
        }
    }

    /// Energy and per-vertex gradient of one element.
    fn element_terms(
        &self,
        mesh: &VertexMesh,
        e: ElementId,
        parameters: &dyn CellParameterProvider,
        with_gradient: bool,
    ) -> Result<(f64, ElementForces), TissueMeshError> {
        let el = mesh.element(e)?;
        let cell = parameters.parameters(el.cell());
        let mut energy = 0.0;
        let mut grad: ElementForces = Vec::new();
        let mut volume = 0.0;
        let mut volume_grad: ElementForces = Vec::new();
        let mut lateral_edges = BTreeSet::new();

        for of in el.faces() {
            let face = mesh.face(of.face)?;
            let ids = face.oriented_vertices(of.reversed);
            let pts = mesh.positions_of(&ids)?;
            let area = face_area(&pts);
            match self.surface(face.kind()) {
                Some(s) => {
                    let per = perimeter(&pts);
                    energy += s.area_elasticity * (area - s.target_area).powi(2)
                        + s.line_tension * per;
                    if with_gradient {
                        let ga = face_area_gradient(&pts);
                        let gp = perimeter_gradient(&pts);
                        let ca = 2.0 * s.area_elasticity * (area - s.target_area);
                        for (i, &v) in ids.iter().enumerate() {
                            grad.push((v, scale(ga[i], ca)));
                            grad.push((v, scale(gp[i], s.line_tension)));
                        }
                    }
                }
                None => {
                    energy += self.lateral.surface_tension * area;
                    if with_gradient {
                        let ga = face_area_gradient(&pts);
                        for (i, &v) in ids.iter().enumerate() {
                            grad.push((v, scale(ga[i], self.lateral.surface_tension)));
                        }
                    }
                    collect_lateral_edges(mesh, &ids, &mut lateral_edges)?;
                }
            }
            let (v_f, g_f) = face_volume_term(&pts);
            volume += v_f;
            if with_gradient {
                volume_grad.extend(ids.iter().copied().zip(g_f));
            }
        }

        for &(a, b) in &lateral_edges {
            let (pa, pb) = (mesh.position(a)?, mesh.position(b)?);
            energy += self.lateral.line_tension * distance(pa, pb);
            if with_gradient {
                let g = edge_length_gradient(pa, pb);
                grad.push((a, scale(g, self.lateral.line_tension)));
                grad.push((b, scale(g, -self.lateral.line_tension)));
            }
        }

        let dv = volume - cell.target_volume;
        energy += cell.volume_elasticity * dv * dv;
        let cv = 2.0 * cell.volume_elasticity * dv;
        grad.extend(volume_grad.into_iter().map(|(v, g)| (v, scale(g, cv))));

        // force is the negative gradient
        let forces = grad.into_iter().map(|(v, g)| (v, scale(g, -1.0))).collect();
        Ok((energy, forces))
    }
}

/// Apical–basal edges of a lateral face, as ordered pairs.
fn collect_lateral_edges(
    mesh: &VertexMesh,
    ids: &[VertexId],
    out: &mut BTreeSet<(VertexId, VertexId)>,
) -> Result<(), TissueMeshError> {
    let n = ids.len();
    for i in 0..n {
        let (a, b) = (ids[i], ids[(i + 1) % n]);
        let (ra, rb) = (mesh.vertex(a)?.region(), mesh.vertex(b)?.region());
        let crosses = matches!(
            (ra, rb),
            (RegionTag::Apical, RegionTag::Basal) | (RegionTag::Basal, RegionTag::Apical)
        );
        if crosses {
            out.insert((a.min(b), a.max(b)));
        }
    }
    Ok(())
}

impl ForceLaw for MonolayerForce {
    fn name(&self) -> &'static str {
        "monolayer"
    }

    fn contribute(
        &self,
        mesh: &VertexMesh,
        parameters: &dyn CellParameterProvider,
        _context: &SimulationContext,
        field: &mut ForceField,
    ) -> Result<(), TissueMeshError> {
        Self::check(mesh)?;
        accumulate_elements(mesh, field, |e| {
            Ok(self.element_terms(mesh, e, parameters, true)?.1)
        })
    }

    fn energy(
        &self,
        mesh: &VertexMesh,
        parameters: &dyn CellParameterProvider,
    ) -> Result<Option<f64>, TissueMeshError> {
        Self::check(mesh)?;
        let total = sum_elements(mesh, |e| {
            Ok(self.element_terms(mesh, e, parameters, false)?.0)
        })?;
        Ok(Some(total))
    }
}
