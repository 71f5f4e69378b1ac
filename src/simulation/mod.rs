//! Time integration and the biology collaborator interface.
//!
//! The [`Simulation`] driver owns the mesh and is the only writer to it
//! during a run. Collaborators (parameter providers, lifecycle consumers)
//! are called at step boundaries, never inside a step.

pub mod biology;
pub mod context;
pub mod integrator;

pub use biology::{CellBiology, DivisionAxis, LifecycleEvent, ParameterTable};
pub use context::SimulationContext;
pub use integrator::{IntegratorConfig, RunSummary, Simulation, StepReport, StopHandle};
