//! Persistence and visualisation output.
//!
//! [`snapshot`] holds the checkpoint format; [`export`] and [`vtk`] are
//! one-way writers for looking at a mesh.

pub mod export;
pub mod snapshot;
pub mod vtk;

pub use export::{ElementRecord, RecordWriter, element_records};
pub use snapshot::{MeshSnapshot, SNAPSHOT_VERSION};
pub use vtk::VtkWriter;

use crate::mesh_error::TissueMeshError;
use crate::topology::mesh::VertexMesh;
use std::io::Write;

/// Trait for writers that serialize the live part of a mesh.
pub trait MeshWriter {
    /// Write the mesh to a writer.
    fn write<W: Write>(&self, writer: W, mesh: &VertexMesh) -> Result<(), TissueMeshError>;

    /// Write into a fresh string.
    fn write_string(&self, mesh: &VertexMesh) -> Result<String, TissueMeshError> {
        let mut out = Vec::new();
        self.write(&mut out, mesh)?;
        String::from_utf8(out).map_err(|e| TissueMeshError::Io(e.to_string()))
    }
}
