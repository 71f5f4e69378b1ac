//! Legacy VTK (`.vtk`) writer.
//!
//! Writes an ASCII `UNSTRUCTURED_GRID` of the live mesh: polygons (type 7)
//! in 2D, polyhedra (type 42, face-stream connectivity) in 3D. Element
//! attributes go to `CELL_DATA`; boundary flags to `POINT_DATA`.

use super::MeshWriter;
use super::export::element_records;
use crate::mesh_error::TissueMeshError;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::{MeshDimension, VertexMesh};
use std::io::Write;

const VTK_POLYGON: i32 = 7;
const VTK_POLYHEDRON: i32 = 42;

#[derive(Debug, Default, Clone)]
pub struct VtkWriter;

impl VtkWriter {
    fn vtk_cell_type(dimension: MeshDimension) -> i32 {
        match dimension {
            MeshDimension::Two => VTK_POLYGON,
            MeshDimension::Three => VTK_POLYHEDRON,
        }
    }

    /// Connectivity entries of one element, without the leading count.
    fn connectivity(
        mesh: &VertexMesh,
        e: ElementId,
        point_of: &[Option<usize>],
    ) -> Result<Vec<usize>, TissueMeshError> {
        let index = |v: VertexId| {
            point_of.get(v.index()).copied().flatten().ok_or(
                TissueMeshError::UnsupportedOperation("element references a dead vertex"),
            )
        };
        let el = mesh.element(e)?;
        let mut out = Vec::new();
        match mesh.dimension() {
            MeshDimension::Two => {
                for &v in el.vertices() {
                    out.push(index(v)?);
                }
            }
            MeshDimension::Three => {
                out.push(el.faces().len());
                for of in el.faces() {
                    let ids = mesh.face(of.face)?.oriented_vertices(of.reversed);
                    out.push(ids.len());
                    for v in ids {
                        out.push(index(v)?);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl MeshWriter for VtkWriter {
    fn write<W: Write>(&self, mut writer: W, mesh: &VertexMesh) -> Result<(), TissueMeshError> {
        let mut point_of = vec![None; mesh.vertex_capacity()];
        let points: Vec<VertexId> = mesh.vertex_ids().collect();
        for (i, v) in points.iter().enumerate() {
            point_of[v.index()] = Some(i);
        }

        writeln!(writer, "# vtk DataFile Version 3.0")?;
        writeln!(writer, "vertex-tissue mesh generation {}", mesh.generation())?;
        writeln!(writer, "ASCII")?;
        writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;
        writeln!(writer, "POINTS {} double", points.len())?;
        for &v in &points {
            let p = mesh.position(v)?;
            writeln!(writer, "{} {} {}", p[0], p[1], p[2])?;
        }

        let elements: Vec<_> = mesh.element_ids().collect();
        let cells = elements
            .iter()
            .map(|&e| Self::connectivity(mesh, e, &point_of))
            .collect::<Result<Vec<_>, _>>()?;
        let total: usize = cells.iter().map(|c| c.len() + 1).sum();
        writeln!(writer, "CELLS {} {}", cells.len(), total)?;
        for c in &cells {
            let line: Vec<String> = c.iter().map(|x| x.to_string()).collect();
            writeln!(writer, "{} {}", c.len(), line.join(" "))?;
        }
        writeln!(writer, "CELL_TYPES {}", cells.len())?;
        let ty = Self::vtk_cell_type(mesh.dimension());
        for _ in &cells {
            writeln!(writer, "{ty}")?;
        }

        let records = element_records(mesh)?;
        writeln!(writer, "CELL_DATA {}", records.len())?;
        writeln!(writer, "SCALARS area double 1")?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for r in &records {
            writeln!(writer, "{}", r.area)?;
        }
        if mesh.dimension() == MeshDimension::Three {
            writeln!(writer, "SCALARS volume double 1")?;
            writeln!(writer, "LOOKUP_TABLE default")?;
            for r in &records {
                writeln!(writer, "{}", r.volume.unwrap_or(0.0))?;
            }
        }
        writeln!(writer, "SCALARS label int 1")?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for r in &records {
            writeln!(writer, "{}", r.label)?;
        }
        writeln!(writer, "SCALARS cell_id long 1")?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for r in &records {
            writeln!(writer, "{}", r.cell.0)?;
        }

        writeln!(writer, "POINT_DATA {}", points.len())?;
        writeln!(writer, "SCALARS boundary int 1")?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for &v in &points {
            writeln!(writer, "{}", u8::from(mesh.vertex(v)?.is_boundary()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_polygons_with_dense_point_indices() {
        let mut mesh = VertexMesh::from_polygons(
            &[[0., 0.], [1., 0.], [2., 0.], [0., 1.], [1., 1.], [2., 1.]],
            &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]],
        )
        .unwrap();
        mesh.remove_element(ElementId::new(0))
            .unwrap();
        let text = VtkWriter.write_string(&mesh).unwrap();
        assert!(text.contains("POINTS 4 double"));
        assert!(text.contains("CELLS 1 5"));
        // vertices 1, 2, 4, 5 become 0, 1, 2, 3
        assert!(text.contains("\n4 0 1 3 2\n"));
        assert!(text.contains("CELL_TYPES 1\n7\n"));
    }
}
