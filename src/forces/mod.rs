//! Force/energy evaluator.
//!
//! Each [`ForceLaw`] reads the mesh read-only and adds its contribution into
//! a [`ForceField`] indexed by vertex handle. A [`ForceEvaluator`] runs a list
//! of laws in order and rejects any non-finite result. Forces are the
//! negative gradient of each law's energy where one exists.
//!
//! Per-element work is gathered first (in parallel with the `rayon`
//! feature) and then reduced sequentially in element order, so the summed
//! forces are identical with and without the feature.

pub mod area_perimeter;
pub mod interaction;
pub mod monolayer;
pub mod stretch;

pub use area_perimeter::AreaPerimeterForce;
pub use interaction::BoundaryInteractionForce;
pub use monolayer::{LateralParameters, MonolayerForce, SurfaceParameters};
pub use stretch::StretchForce;

use crate::geometry::metrics::{add, norm};
use crate::mesh_error::TissueMeshError;
use crate::simulation::context::SimulationContext;
use crate::topology::ids::{CellHandle, ElementId, VertexId};
use crate::topology::mesh::VertexMesh;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mechanical parameters of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    /// Preferred area (2D elements).
    pub target_area: f64,
    /// Preferred volume (3D elements).
    pub target_volume: f64,
    /// Tension per unit boundary length.
    pub line_tension: f64,
    /// Stiffness `K` of the `K (A - A0)²` area term.
    pub area_elasticity: f64,
    /// Coefficient `Γ` of the `Γ/2 P²` perimeter term.
    pub perimeter_contractility: f64,
    /// Stiffness of the `K_V (V - V0)²` volume term.
    pub volume_elasticity: f64,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            target_area: 1.0,
            target_volume: 1.0,
            line_tension: 0.12,
            area_elasticity: 1.0,
            perimeter_contractility: 0.04,
            volume_elasticity: 1.0,
        }
    }
}

/// Source of per-cell mechanical parameters.
pub trait CellParameterProvider: Sync {
    fn parameters(&self, cell: CellHandle) -> CellParameters;
}

/// A single parameter set applies to every cell.
impl CellParameterProvider for CellParameters {
    fn parameters(&self, _cell: CellHandle) -> CellParameters {
        *self
    }
}

/// Per-vertex force vectors, indexed by vertex table slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceField {
    forces: Vec<[f64; 3]>,
}

impl ForceField {
    pub fn zeros(len: usize) -> Self {
        Self {
            forces: vec![[0.0; 3]; len],
        }
    }

    /// Zero field sized for every slot of `mesh`.
    pub fn for_mesh(mesh: &VertexMesh) -> Self {
        Self::zeros(mesh.vertex_capacity())
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn add(&mut self, v: VertexId, f: [f64; 3]) {
        if let Some(slot) = self.forces.get_mut(v.index()) {
            *slot = add(*slot, f);
        } else {
            debug_assert!(false, "force on vertex {v} outside field of {}", self.len());
        }
    }

    pub fn get(&self, v: VertexId) -> [f64; 3] {
        self.forces.get(v.index()).copied().unwrap_or([0.0; 3])
    }

    pub fn as_slice(&self) -> &[[f64; 3]] {
        &self.forces
    }

    /// `(vertex, force)` for every slot.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, [f64; 3])> + '_ {
        self.forces
            .iter()
            .enumerate()
            .map(|(i, f)| (VertexId::from_index(i), *f))
    }

    /// Sum of all forces.
    pub fn net(&self) -> [f64; 3] {
        self.forces.iter().fold([0.0; 3], |acc, f| add(acc, *f))
    }

    pub fn max_norm(&self) -> f64 {
        self.forces.iter().map(|f| norm(*f)).fold(0.0, f64::max)
    }
}

/// A mechanical contribution to the vertex forces.
pub trait ForceLaw: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Add this law's forces into `field`.
    fn contribute(
        &self,
        mesh: &VertexMesh,
        parameters: &dyn CellParameterProvider,
        context: &SimulationContext,
        field: &mut ForceField,
    ) -> Result<(), TissueMeshError>;

    /// Total energy whose negative gradient is the contributed force, for
    /// laws that have one.
    fn energy(
        &self,
        _mesh: &VertexMesh,
        _parameters: &dyn CellParameterProvider,
    ) -> Result<Option<f64>, TissueMeshError> {
        Ok(None)
    }
}

/// Ordered list of force laws.
#[derive(Debug, Default)]
pub struct ForceEvaluator {
    laws: Vec<Box<dyn ForceLaw>>,
}

impl ForceEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_law(mut self, law: impl ForceLaw + 'static) -> Self {
        self.laws.push(Box::new(law));
        self
    }

    pub fn push(&mut self, law: Box<dyn ForceLaw>) {
        self.laws.push(law);
    }

    pub fn len(&self) -> usize {
        self.laws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laws.is_empty()
    }

    pub fn law_names(&self) -> Vec<&'static str> {
        self.laws.iter().map(|l| l.name()).collect()
    }

    /// Evaluate every law on `mesh`.
    ///
    /// Fails with [`TissueMeshError::NonFiniteForce`] naming the first law
    /// that leaves a NaN or infinite component on a live vertex.
    pub fn evaluate(
        &self,
        mesh: &VertexMesh,
        parameters: &dyn CellParameterProvider,
        context: &SimulationContext,
    ) -> Result<ForceField, TissueMeshError> {
        let mut field = ForceField::for_mesh(mesh);
        for law in &self.laws {
            law.contribute(mesh, parameters, context, &mut field)?;
            if let Some(vertex) = mesh
                .vertex_ids()
                .find(|v| field.get(*v).iter().any(|c| !c.is_finite()))
            {
                log::error!("force law `{}` produced a non-finite force on {vertex}", law.name());
                return Err(TissueMeshError::NonFiniteForce {
                    law: law.name(),
                    vertex,
                });
            }
        }
        Ok(field)
    }

    /// Sum of the energies of every law that defines one.
    pub fn energy(
        &self,
        mesh: &VertexMesh,
        parameters: &dyn CellParameterProvider,
    ) -> Result<f64, TissueMeshError> {
        let mut total = 0.0;
        for law in &self.laws {
            total += law.energy(mesh, parameters)?.unwrap_or(0.0);
        }
        Ok(total)
    }
}

/// Per-element force contributions.
pub(crate) type ElementForces = Vec<(VertexId, [f64; 3])>;

/// Evaluate `per_element` on every live element and add the results into
/// `field` in ascending element order.
pub(crate) fn accumulate_elements<F>(
    mesh: &VertexMesh,
    field: &mut ForceField,
    per_element: F,
) -> Result<(), TissueMeshError>
where
    F: Fn(ElementId) -> Result<ElementForces, TissueMeshError> + Send + Sync,
{
    let ids: Vec<ElementId> = mesh.element_ids().collect();

    #[cfg(feature = "rayon")]
    let contributions: Vec<ElementForces> = {
        use rayon::prelude::*;
        ids.par_iter()
            .map(|&e| per_element(e))
            .collect::<Result<Vec<_>, _>>()?
    };
    #[cfg(not(feature = "rayon"))]
    let contributions: Vec<ElementForces> = ids
        .iter()
        .map(|&e| per_element(e))
        .collect::<Result<Vec<_>, _>>()?;

    for element in contributions {
        for (v, f) in element {
            field.add(v, f);
        }
    }
    Ok(())
}

/// Sum `per_element` over live elements.
pub(crate) fn sum_elements<F>(mesh: &VertexMesh, per_element: F) -> Result<f64, TissueMeshError>
where
    F: Fn(ElementId) -> Result<f64, TissueMeshError>,
{
    let mut total = 0.0;
    for e in mesh.element_ids() {
        total += per_element(e)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_accumulates_and_reports() {
        let mut field = ForceField::zeros(3);
        field.add(VertexId::new(0), [1.0, 0.0, 0.0]);
        field.add(VertexId::new(2), [-1.0, 2.0, 0.0]);
        field.add(VertexId::new(2), [0.0, 1.0, 0.0]);
        assert_eq!(field.get(VertexId::new(2)), [-1.0, 3.0, 0.0]);
        assert_eq!(field.net(), [0.0, 3.0, 0.0]);
        assert!((field.max_norm() - 10f64.sqrt()).abs() < 1e-12);
        assert_eq!(field.get(VertexId::new(7)), [0.0; 3]);
    }

    #[test]
    fn uniform_parameters_provide_themselves() {
        let p = CellParameters {
            target_area: 2.5,
            ..CellParameters::default()
        };
        assert_eq!(p.parameters(CellHandle(11)).target_area, 2.5);
    }
}
