//! Geometry utilities for vertex-tissue.
//!
//! `metrics` holds the coordinate-level formulas (areas, volumes, centroids,
//! and their gradients) shared by the mesh kernel and the force laws;
//! `quality` derives per-element shape descriptors from them.

pub mod metrics;
pub mod quality;
