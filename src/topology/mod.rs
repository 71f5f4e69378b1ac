//! Top-level module for tissue mesh topology.
//!
//! This module provides:
//! - Strong handles for vertices, faces, elements, and biological cells
//! - Entity records and the flat-table [`VertexMesh`] container
//! - The mutation layer (division, death, tombstones, compaction)
//! - The mesh validity checker
//!
//! Geometry queries live on [`VertexMesh`] itself; topology rewrites driven
//! by mechanics live in [`crate::remodel`].

pub mod entity;
pub mod ids;
pub mod mesh;
pub mod mutate;
pub mod validation;

pub use entity::{Element, Face, FaceKind, OrientedFace, RegionTag, Vertex};
pub use ids::{CellHandle, ElementId, EntityKind, EntityRef, FaceId, VertexId};
pub use mesh::{FaceSpec, MeshDimension, VertexMesh};
pub use mutate::CompactionMap;
pub use validation::{AuditOptions, MeshViolation, ViolationKind, audit, audit_all};

#[cfg(test)]
mod tests;
