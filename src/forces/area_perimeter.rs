//! Planar area/perimeter energy law.
//!
//! `E = Σ_cells K (A − A0)² + Γ/2 P² + Λ P`
//!
//! Line tension is charged per element perimeter, so an edge shared by two
//! cells carries `2Λ` in total while an exterior edge carries `Λ`.

use super::{
    CellParameterProvider, ElementForces, ForceField, ForceLaw, accumulate_elements, sum_elements,
};
use crate::geometry::metrics::{
    perimeter, perimeter_gradient, signed_area_gradient_xy, signed_area_xy,
};
use crate::mesh_error::TissueMeshError;
use crate::simulation::context::SimulationContext;
use crate::topology::mesh::{MeshDimension, VertexMesh};

/// Area elasticity, perimeter contractility, and line tension on 2D cells.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AreaPerimeterForce;

impl AreaPerimeterForce {
    pub fn new() -> Self {
        Self
    }

    fn check(mesh: &VertexMesh) -> Result<(), TissueMeshError> {
        if mesh.dimension() != MeshDimension::Two {
            return Err(TissueMeshError::DimensionMismatch {
                expected: 2,
                found: mesh.dimension().as_u8(),
            });
        }
        Ok(())
    }
}

impl ForceLaw for AreaPerimeterForce {
    fn name(&self) -> &'static str {
        "area-perimeter"
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
            let el = mesh.element(e)?;
            let p = parameters.parameters(el.cell());
            let cycle = el.vertices();
            let pts = mesh.positions_of(cycle)?;
            let area = signed_area_xy(&pts);
            let per = perimeter(&pts);
            let grad_a = signed_area_gradient_xy(&pts);
            let grad_p = perimeter_gradient(&pts);
            let coef_a = 2.0 * p.area_elasticity * (area - p.target_area);
            let coef_p = p.perimeter_contractility * per + p.line_tension;
            let forces: ElementForces = cycle
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let f = [
                        -(coef_a * grad_a[i][0] + coef_p * grad_p[i][0]),
                        -(coef_a * grad_a[i][1] + coef_p * grad_p[i][1]),
                        0.0,
                    ];
                    (v, f)
                })
                .collect();
            Ok(forces)
        })
    }

    fn energy(
        &self,
        mesh: &VertexMesh,
        parameters: &dyn CellParameterProvider,
    ) -> Result<Option<f64>, TissueMeshError> {
        Self::check(mesh)?;
        let total = sum_elements(mesh, |e| {
            let el = mesh.element(e)?;
            let p = parameters.parameters(el.cell());
            let pts = mesh.positions_of(el.vertices())?;
            let area = signed_area_xy(&pts);
            let per = perimeter(&pts);
            Ok(p.area_elasticity * (area - p.target_area).powi(2)
                + 0.5 * p.perimeter_contractility * per * per
                + p.line_tension * per)
        })?;
        Ok(Some(total))
    }
}
