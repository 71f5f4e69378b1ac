#![cfg_attr(docsrs, feature(doc_cfg))]
//! # vertex-tissue
//!
//! vertex-tissue is a vertex-model engine for epithelial tissue mechanics.
//! Cells are polygons (2D) or apical/basal/lateral polyhedra (3D monolayers)
//! sharing vertices; forces derived from per-cell energies move the vertices,
//! and local topology rewrites keep the mesh valid as cells rearrange, shrink
//! away, or collide with the free boundary.
//!
//! ## Features
//! - Flat-table mesh with strong `u32` handles, tombstones and compaction
//! - Geometry kernel: areas, perimeters, volumes, centroids and their gradients
//! - Pluggable force laws (area/perimeter, 3D monolayer surface/volume,
//!   boundary stretch, boundary interaction)
//! - T1 neighbour exchange, T2 extrusion, T3 boundary merge/absorption
//! - Forward-Euler integrator with stop handle and rollback snapshot
//! - Validity checker, binary/serde snapshots, VTK and record export
//!
//! ## Determinism
//!
//! All randomized decisions use `SmallRng` seeds drawn from configuration so
//! runs are reproducible. Remodeling candidates are ordered by kind, metric
//! and entity index, never by hash order. With the `rayon` feature the force
//! reduction still happens in element order, so results do not depend on the
//! thread count.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! vertex-tissue = "0.1"
//! # Optional features:
//! # features = ["rayon", "check-invariants"]
//! ```

pub mod debug_invariants;
pub mod forces;
pub mod geometry;
pub mod io;
pub mod mesh_error;
pub mod mesh_generation;
pub mod remodel;
pub mod simulation;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::forces::{
        AreaPerimeterForce, BoundaryInteractionForce, CellParameterProvider, CellParameters,
        ForceEvaluator, ForceField, ForceLaw, MonolayerForce, StretchForce,
    };
    pub use crate::io::{MeshSnapshot, MeshWriter, RecordWriter, VtkWriter};
    pub use crate::mesh_error::TissueMeshError;
    pub use crate::mesh_generation::{
        HoneycombOptions, hexagonal_prism_mesh, honeycomb_mesh, monolayer_from_2d, quad_mesh,
        square_element,
    };
    pub use crate::remodel::{RemodelConfig, RemodelReport, RemodelState, Remodeler};
    pub use crate::simulation::{
        CellBiology, DivisionAxis, IntegratorConfig, LifecycleEvent, ParameterTable, RunSummary,
        Simulation, SimulationContext, StepReport, StopHandle,
    };
    pub use crate::topology::{
        AuditOptions, CellHandle, ElementId, FaceId, MeshDimension, MeshViolation, VertexId,
        VertexMesh, audit,
    };
}
