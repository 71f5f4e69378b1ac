//! Element boundary records for external visualisation.

use super::MeshWriter;
use crate::geometry::quality::element_shape;
use crate::mesh_error::TissueMeshError;
use crate::topology::entity::FaceKind;
use crate::topology::ids::{CellHandle, ElementId};
use crate::topology::mesh::{MeshDimension, VertexMesh};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Boundary and attributes of one live element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub element: ElementId,
    pub cell: CellHandle,
    pub label: i32,
    /// Signed area in 2D, total surface area in 3D.
    pub area: f64,
    /// 3D only.
    pub volume: Option<f64>,
    /// `P / √A` of the planar cycle; absent for general polyhedra.
    pub shape_index: Option<f64>,
    /// The boundary cycle in 2D; every outward-oriented face in 3D.
    pub rings: Vec<Vec<[f64; 3]>>,
    /// Kind of each ring, parallel to `rings`.
    pub kinds: Vec<FaceKind>,
}

/// Records of every live element, in handle order.
pub fn element_records(mesh: &VertexMesh) -> Result<Vec<ElementRecord>, TissueMeshError> {
    let planar = mesh.dimension() == MeshDimension::Two || mesh.is_monolayer();
    mesh.element_ids()
        .map(|e| {
            let el = mesh.element(e)?;
            let (rings, kinds, volume) = match mesh.dimension() {
                MeshDimension::Two => (
                    vec![mesh.positions_of(el.vertices())?],
                    vec![FaceKind::Untagged],
                    None,
                ),
                MeshDimension::Three => {
                    let kinds = el
                        .faces()
                        .iter()
                        .map(|of| mesh.face(of.face).map(|f| f.kind()))
                        .collect::<Result<Vec<_>, _>>()?;
                    (
                        mesh.element_face_positions(e)?,
                        kinds,
                        Some(mesh.volume(e)?),
                    )
                }
            };
            Ok(ElementRecord {
                element: e,
                cell: el.cell(),
                label: el.label(),
                area: mesh.area(e)?,
                volume,
                shape_index: if planar {
                    Some(element_shape(mesh, e)?.shape_index)
                } else {
                    None
                },
                rings,
                kinds,
            })
        })
        .collect()
}

/// Plain-text record format, one block per element:
///
/// ```text
/// element <id> cell <handle> label <i32> area <f64> volume <f64|-> shape <f64|-> rings <n>
/// ring <kind-code> <k> x0 y0 z0 … x(k-1) y(k-1) z(k-1)
/// ```
#[derive(Debug, Default, Clone)]
pub struct RecordWriter;

impl MeshWriter for RecordWriter {
    fn write<W: Write>(&self, mut writer: W, mesh: &VertexMesh) -> Result<(), TissueMeshError> {
        writeln!(
            writer,
            "# vertex-tissue records dim={} elements={}",
            mesh.dimension().as_u8(),
            mesh.num_elements()
        )?;
        for rec in element_records(mesh)? {
            let volume = rec
                .volume
                .map_or_else(|| "-".to_string(), |v| format!("{v:.12e}"));
            let shape = rec
                .shape_index
                .map_or_else(|| "-".to_string(), |s| format!("{s:.6}"));
            writeln!(
                writer,
                "element {} cell {} label {} area {:.12e} volume {} shape {} rings {}",
                rec.element.get(),
                rec.cell.0,
                rec.label,
                rec.area,
                volume,
                shape,
                rec.rings.len()
            )?;
            for (ring, kind) in rec.rings.iter().zip(&rec.kinds) {
                write!(writer, "ring {} {}", kind.code(), ring.len())?;
                for p in ring {
                    write!(writer, " {:.12e} {:.12e} {:.12e}", p[0], p[1], p[2])?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_follow_live_elements() {
        let mut mesh = VertexMesh::from_polygons(
            &[[0., 0.], [1., 0.], [2., 0.], [0., 1.], [1., 1.], [2., 1.]],
            &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]],
        )
        .unwrap();
        mesh.set_label(ElementId::new(1), 7).unwrap();
        mesh.remove_element(ElementId::new(0)).unwrap();
        let recs = element_records(&mesh).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].element, ElementId::new(1));
        assert_eq!(recs[0].label, 7);
        assert!((recs[0].area - 1.0).abs() < 1e-12);
        assert_eq!(recs[0].rings[0].len(), 4);
        assert!((recs[0].shape_index.unwrap() - 4.0).abs() < 1e-12);

        let text = RecordWriter.write_string(&mesh).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("# vertex-tissue"));
        assert!(lines.next().unwrap().starts_with("element 1 cell 1 label 7"));
        assert!(lines.next().unwrap().starts_with("ring 0 4 "));
    }
}
