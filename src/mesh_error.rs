//! TissueMeshError: Unified error type for vertex-tissue public APIs
//!
//! Every fallible operation of the geometry kernel, force evaluation,
//! remodeling, and persistence layers reports through this type. The
//! simulation driver treats all of them as unrecoverable for the current run.

use crate::topology::ids::{ElementId, EntityKind, EntityRef, FaceId, VertexId};
use crate::topology::validation::MeshViolation;
use thiserror::Error;

/// Unified error type for vertex-tissue operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TissueMeshError {
    // ----- construction ---------------------------------------------------
    /// An element references a vertex index that does not exist or is dead.
    #[error("construction error: element {element} references missing vertex {vertex}")]
    DanglingVertex { element: usize, vertex: usize },
    /// An element references a face index that does not exist or is dead.
    #[error("construction error: element {element} references missing face {face}")]
    DanglingFace { element: usize, face: usize },
    /// An element boundary has fewer than three distinct vertices or no area.
    #[error("construction error: element {element} is degenerate ({reason})")]
    DegenerateElement { element: usize, reason: String },
    /// A face has fewer than three distinct vertices.
    #[error("construction error: face {face} is degenerate ({reason})")]
    DegenerateFace { face: usize, reason: String },
    /// The number of biological cells does not match the number of elements.
    #[error("construction error: {cells} cells supplied for {elements} elements")]
    CellCountMismatch { elements: usize, cells: usize },
    /// An operation was asked for a dimension the mesh does not have.
    #[error("dimension mismatch: expected {expected}D mesh, found {found}D")]
    DimensionMismatch { expected: u8, found: u8 },

    // ----- queries --------------------------------------------------------
    /// Lookup of a tombstoned entity.
    #[error("{kind} {index} has been deleted")]
    NotFound { kind: EntityKind, index: usize },
    /// Lookup beyond the end of an entity table.
    #[error("{kind} index {index} out of range (table length {len})")]
    OutOfRange {
        kind: EntityKind,
        index: usize,
        len: usize,
    },
    /// A tombstone was requested for an entity still used by a live one.
    #[error("{entity} is still referenced by {by}")]
    EntityInUse { entity: EntityRef, by: EntityRef },

    // ----- geometry and remodeling ----------------------------------------
    /// Post-step audit found an invalid mesh state.
    #[error("mesh violation: {0}")]
    Violation(MeshViolation),
    /// The remodeler hit its iteration bound with candidates still pending.
    #[error("topology remodeling did not stabilise after {iterations} passes; unresolved: {unresolved:?}")]
    RemodelNonConvergence {
        iterations: usize,
        unresolved: Vec<EntityRef>,
    },
    /// A rewrite was requested on an edge that is not shared the way it needs.
    #[error("edge ({0}, {1}) is not an interior edge of the mesh")]
    NotAnEdge(VertexId, VertexId),
    /// Division could not find two boundary crossings.
    #[error("element {element} cannot be divided: {reason}")]
    DivisionFailed { element: ElementId, reason: String },
    /// Operation not available for this mesh layout.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    /// A force law produced a non-finite value.
    #[error("force law `{law}` produced a non-finite force on vertex {vertex}")]
    NonFiniteForce { law: &'static str, vertex: VertexId },
    /// A face lookup for a monolayer rebuild failed.
    #[error("face {0} is not a lateral face of a monolayer")]
    NotLateral(FaceId),

    // ----- configuration and persistence ----------------------------------
    /// Configuration value outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Snapshot version is not understood by this build.
    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u16, expected: u16 },
    /// Snapshot bytes could not be decoded.
    #[error("snapshot decode error: {0}")]
    SnapshotDecode(String),
    /// Writer failure during export.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TissueMeshError {
    fn from(err: std::io::Error) -> Self {
        TissueMeshError::Io(err.to_string())
    }
}

impl From<MeshViolation> for TissueMeshError {
    fn from(violation: MeshViolation) -> Self {
        TissueMeshError::Violation(violation)
    }
}
