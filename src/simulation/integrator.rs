//! Overdamped time integration.
//!
//! One [`Simulation::step`]:
//!
//! 1. evaluate forces on the current geometry;
//! 2. move every live vertex by `dt · mobility · F`;
//! 3. run the remodeler until the topology is stable;
//! 4. audit the mesh;
//! 5. advance the clock, compact tombstones if due, and hand the step's
//!    lifecycle events to the biology collaborator.
//!
//! Any failure halts the simulation. The mesh is left as the failing step
//! left it; the state after the last successful step stays available
//! through [`Simulation::last_valid_snapshot`].

use super::biology::{CellBiology, DivisionAxis, LifecycleEvent};
use super::context::SimulationContext;
use crate::forces::{ForceEvaluator, ForceField};
use crate::geometry::metrics::{add, norm, scale};
use crate::io::snapshot::MeshSnapshot;
use crate::mesh_error::TissueMeshError;
use crate::remodel::{RemodelConfig, RemodelReport, Remodeler};
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::VertexMesh;
use crate::topology::validation::{AuditOptions, audit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Integrator settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    pub dt: f64,
    /// Velocity per unit force.
    pub mobility: f64,
    /// Compact every this many steps when tombstones exist; `None` never.
    pub compact_interval: Option<u64>,
    pub rng_seed: u64,
    pub audit: AuditOptions,
    pub remodel: RemodelConfig,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            dt: 0.002,
            mobility: 1.0,
            compact_interval: Some(1),
            rng_seed: 0,
            audit: AuditOptions::all(),
            remodel: RemodelConfig::default(),
        }
    }
}

impl IntegratorConfig {
    pub fn validate(&self) -> Result<(), TissueMeshError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(TissueMeshError::InvalidConfig(format!(
                "dt must be positive and finite, got {}",
                self.dt
            )));
        }
        if !self.mobility.is_finite() || self.mobility <= 0.0 {
            return Err(TissueMeshError::InvalidConfig(format!(
                "mobility must be positive and finite, got {}",
                self.mobility
            )));
        }
        if self.compact_interval == Some(0) {
            return Err(TissueMeshError::InvalidConfig(
                "compact_interval must be at least 1".into(),
            ));
        }
        self.remodel.validate()
    }
}

/// Shared flag for stopping [`Simulation::run`] between steps.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What one step did.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Index of the completed step, starting at 1.
    pub step: u64,
    pub time: f64,
    pub max_displacement: f64,
    pub remodel: RemodelReport,
    pub events: Vec<LifecycleEvent>,
}

/// Totals over a [`Simulation::run`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub stopped_early: bool,
    pub time: f64,
    pub t1_swaps: usize,
    pub t2_collapses: usize,
    pub boundary_merges: usize,
    pub absorptions: usize,
    pub compactions: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &StepReport) {
        self.steps += 1;
        self.time = report.time;
        self.t1_swaps += report.remodel.t1_swaps;
        self.t2_collapses += report.remodel.t2_collapses;
        self.boundary_merges += report.remodel.boundary_merges;
        self.absorptions += report.remodel.absorptions;
        self.compactions += report
            .events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Renumbered(_)))
            .count();
    }
}

/// A mesh, its force laws, and its biology, advanced together.
#[derive(Debug)]
pub struct Simulation<B: CellBiology> {
    mesh: VertexMesh,
    forces: ForceEvaluator,
    biology: B,
    remodeler: Remodeler,
    config: IntegratorConfig,
    context: SimulationContext,
    stop: StopHandle,
    last_valid: MeshSnapshot,
    last_valid_time: f64,
    halted: Option<TissueMeshError>,
}

impl<B: CellBiology> Simulation<B> {
    /// Set up a run. The initial mesh must pass the configured audit.
    pub fn new(
        mesh: VertexMesh,
        forces: ForceEvaluator,
        biology: B,
        config: IntegratorConfig,
    ) -> Result<Self, TissueMeshError> {
        config.validate()?;
        audit(&mesh, config.audit)?;
        let context = SimulationContext::new(config.dt, config.rng_seed);
        let last_valid = MeshSnapshot::capture(&mesh);
        log::info!(
            "simulation set up: {} elements, {} vertices, laws {:?}",
            mesh.num_elements(),
            mesh.num_vertices(),
            forces.law_names()
        );
        Ok(Self {
            mesh,
            forces,
            biology,
            remodeler: Remodeler::new(config.remodel),
            config,
            context,
            stop: StopHandle::default(),
            last_valid,
            last_valid_time: 0.0,
            halted: None,
        })
    }

    pub fn mesh(&self) -> &VertexMesh {
        &self.mesh
    }

    pub fn biology(&self) -> &B {
        &self.biology
    }

    /// Mutable access for changing parameters between steps.
    pub fn biology_mut(&mut self) -> &mut B {
        &mut self.biology
    }

    pub fn forces(&self) -> &ForceEvaluator {
        &self.forces
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn time(&self) -> f64 {
        self.context.time()
    }

    pub fn step_index(&self) -> u64 {
        self.context.step_index()
    }

    /// Handle that stops [`run`](Self::run) before its next step.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The error that halted the run, if any.
    pub fn halted(&self) -> Option<&TissueMeshError> {
        self.halted.as_ref()
    }

    /// Mesh state after the last successful step.
    pub fn last_valid_snapshot(&self) -> &MeshSnapshot {
        &self.last_valid
    }

    pub fn last_valid_time(&self) -> f64 {
        self.last_valid_time
    }

    /// Forces on the current geometry, without moving anything.
    pub fn forces_now(&self) -> Result<ForceField, TissueMeshError> {
        self.forces.evaluate(&self.mesh, &self.biology, &self.context)
    }

    /// Total energy of every law that defines one.
    pub fn energy(&self) -> Result<f64, TissueMeshError> {
        self.forces.energy(&self.mesh, &self.biology)
    }

    fn ensure_running(&self) -> Result<(), TissueMeshError> {
        match &self.halted {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn halt(&mut self, err: TissueMeshError) -> TissueMeshError {
        log::error!(
            "simulation halted at step {} (t = {}): {err}",
            self.context.step_index(),
            self.context.time()
        );
        self.halted = Some(err.clone());
        err
    }

    fn dispatch(&mut self, events: &[LifecycleEvent]) {
        for event in events {
            match event {
                LifecycleEvent::Divided { parent, child, .. } => {
                    log::info!("element {parent} divided; daughter {child}")
                }
                LifecycleEvent::Died { element, cell } => {
                    log::info!("element {element} ({cell}) died")
                }
                LifecycleEvent::Renumbered(map) => {
                    log::info!("mesh compacted to generation {}", map.generation)
                }
            }
            self.biology.on_lifecycle(event);
        }
    }

    /// Advance one time step.
    pub fn step(&mut self) -> Result<StepReport, TissueMeshError> {
        self.ensure_running()?;
        match self.advance() {
            Ok(report) => {
                self.dispatch(&report.events);
                self.last_valid = MeshSnapshot::capture(&self.mesh);
                self.last_valid_time = report.time;
                Ok(report)
            }
            Err(err) => Err(self.halt(err)),
        }
    }

    fn advance(&mut self) -> Result<StepReport, TissueMeshError> {
        let field = self
            .forces
            .evaluate(&self.mesh, &self.biology, &self.context)?;
        let s = self.context.dt() * self.config.mobility;
        let guard = 0.5 * self.config.remodel.t1_threshold;
        let mut max_displacement: f64 = 0.0;
        let ids: Vec<VertexId> = self.mesh.vertex_ids().collect();
        for v in ids {
            let d = scale(field.get(v), s);
            let moved = norm(d);
            max_displacement = max_displacement.max(moved);
            if moved > guard {
                log::warn!("vertex {v} moved {moved:.3e} in one step (guard {guard:.3e})");
            }
            let p = self.mesh.position(v)?;
            self.mesh.set_position(v, add(p, d))?;
        }

        let remodel = self.remodeler.remodel(&mut self.mesh)?;
        audit(&self.mesh, self.config.audit)?;
        self.context.advance();

        let mut events: Vec<LifecycleEvent> = remodel
            .died
            .iter()
            .map(|&(element, cell)| LifecycleEvent::Died { element, cell })
            .collect();
        if let Some(k) = self.config.compact_interval {
            if self.context.step_index() % k == 0 && self.mesh.has_tombstones() {
                events.push(LifecycleEvent::Renumbered(self.mesh.compact()));
            }
        }
        Ok(StepReport {
            step: self.context.step_index(),
            time: self.context.time(),
            max_displacement,
            remodel,
            events,
        })
    }

    /// Take up to `steps` steps, stopping early if requested.
    pub fn run(&mut self, steps: u64) -> Result<RunSummary, TissueMeshError> {
        self.ensure_running()?;
        log::info!("running {steps} steps from t = {}", self.time());
        let mut summary = RunSummary {
            time: self.time(),
            ..RunSummary::default()
        };
        for _ in 0..steps {
            if self.stop.is_stop_requested() {
                summary.stopped_early = true;
                log::info!("stop requested; halting after {} steps", summary.steps);
                break;
            }
            let report = self.step()?;
            summary.absorb(&report);
        }
        Ok(summary)
    }

    /// Step until the clock reaches `end_time`. A shorter final step lands
    /// exactly on `end_time` when it is not a whole number of steps away.
    pub fn run_until(&mut self, end_time: f64) -> Result<RunSummary, TissueMeshError> {
        self.ensure_running()?;
        let dt = self.context.dt();
        let remaining = end_time - self.time();
        if !remaining.is_finite() || remaining <= 0.0 {
            return Ok(RunSummary {
                time: self.time(),
                ..RunSummary::default()
            });
        }
        let whole = (remaining / dt + 1e-9).floor() as u64;
        let mut summary = self.run(whole)?;
        let rest = end_time - self.time();
        if !summary.stopped_early && rest > 1e-12 * end_time.abs().max(1.0) {
            if self.stop.is_stop_requested() {
                summary.stopped_early = true;
                return Ok(summary);
            }
            self.context.set_dt(rest);
            let step = self.step();
            self.context.set_dt(dt);
            summary.absorb(&step?);
        }
        Ok(summary)
    }

    /// Split an element between steps; the daughter is announced to the
    /// biology collaborator before this returns.
    pub fn divide_element(
        &mut self,
        element: ElementId,
        axis: DivisionAxis,
    ) -> Result<ElementId, TissueMeshError> {
        self.ensure_running()?;
        let parent_cell = self.mesh.cell_of(element)?;
        let axis = axis.resolve(&mut self.context);
        let child = self.mesh.divide_element(element, axis)?;
        let event = LifecycleEvent::Divided {
            parent: element,
            child,
            parent_cell,
            child_cell: self.mesh.cell_of(child)?,
        };
        self.dispatch(&[event]);
        Ok(child)
    }

    /// Remove an element between steps (cell death).
    pub fn remove_element(&mut self, element: ElementId) -> Result<(), TissueMeshError> {
        self.ensure_running()?;
        let cell = self.mesh.cell_of(element)?;
        self.mesh.remove_element(element)?;
        self.dispatch(&[LifecycleEvent::Died { element, cell }]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{AreaPerimeterForce, CellParameters};

    fn unit_square() -> VertexMesh {
        VertexMesh::from_polygons(
            &[[0., 0.], [1., 0.], [1., 1.], [0., 1.]],
            &[vec![0, 1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn config_validation() {
        assert!(IntegratorConfig::default().validate().is_ok());
        let bad = IntegratorConfig {
            dt: 0.0,
            ..IntegratorConfig::default()
        };
        assert!(matches!(bad.validate(), Err(TissueMeshError::InvalidConfig(_))));
        let bad = IntegratorConfig {
            compact_interval: Some(0),
            ..IntegratorConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn run_until_lands_on_end_time() {
        let mut sim = Simulation::new(
            unit_square(),
            ForceEvaluator::new().with_law(AreaPerimeterForce),
            CellParameters::default(),
            IntegratorConfig {
                dt: 0.01,
                ..IntegratorConfig::default()
            },
        )
        .unwrap();
        let summary = sim.run_until(0.105).unwrap();
        assert_eq!(summary.steps, 11);
        assert!((sim.time() - 0.105).abs() < 1e-12);
        assert!((sim.context().dt() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn stop_is_observed_between_steps() {
        let mut sim = Simulation::new(
            unit_square(),
            ForceEvaluator::new().with_law(AreaPerimeterForce),
            CellParameters::default(),
            IntegratorConfig::default(),
        )
        .unwrap();
        sim.run(3).unwrap();
        sim.stop_handle().request_stop();
        let summary = sim.run(10).unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.steps, 0);
        assert_eq!(sim.step_index(), 3);
    }
}
