//! Versioned mesh snapshots for checkpointing.
//!
//! A [`MeshSnapshot`] is a plain copy of the three entity tables, including
//! tombstones, so a restored mesh has the same handles as the original.
//! Reverse adjacency is not stored; it is rebuilt on restore.
//!
//! Besides serde, a snapshot has a fixed little-endian binary form:
//!
//! ```text
//! SnapshotHeader (24 B) | WireCounts (16 B) | WireVertex (32 B) × nv
//! | faces:    kind u8, live u8, n u32, n × vertex u32
//! | elements: cell u64, label i32, live u8, nv u32, nv × u32,
//!             nf u32, nf × (face u32, reversed u8)
//! ```

use crate::mesh_error::TissueMeshError;
use crate::topology::entity::{Element, Face, FaceKind, OrientedFace, RegionTag, Vertex};
use crate::topology::ids::{CellHandle, FaceId, VertexId};
use crate::topology::mesh::{MeshDimension, VertexMesh, distinct_count};
use crate::topology::validation::{AuditOptions, audit};
use bytemuck::{Pod, Zeroable};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use std::mem::size_of;

/// Bump when the layout or semantics change in incompatible ways.
pub const SNAPSHOT_VERSION: u16 = 1;

const MAGIC: [u8; 4] = *b"VTSN";
const NO_PARTNER: u32 = u32::MAX;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVertex {
    pub position: [f64; 3],
    pub boundary: bool,
    pub region: RegionTag,
    pub partner: Option<u32>,
    pub live: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFace {
    pub vertices: Vec<u32>,
    pub kind: FaceKind,
    pub live: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotElement {
    pub vertices: Vec<u32>,
    /// `(face, reversed)`; empty in 2D.
    pub faces: Vec<(u32, bool)>,
    pub cell: u64,
    pub label: i32,
    pub live: bool,
}

/// Complete, self-contained copy of a mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub version: u16,
    /// 2 or 3.
    pub dimension: u8,
    pub generation: u32,
    pub next_cell: u64,
    pub vertices: Vec<SnapshotVertex>,
    pub faces: Vec<SnapshotFace>,
    pub elements: Vec<SnapshotElement>,
}

// ===== Binary records ======================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SnapshotHeader {
    magic: [u8; 4],
    version_le: u16,
    dimension: u8,
    _pad: u8,
    generation_le: u32,
    reserved_le: u32, // keep zero
    next_cell_le: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct WireCounts {
    vertices_le: u32,
    faces_le: u32,
    elements_le: u32,
    _pad: u32,
}

/// Vertex record; `partner_le == u32::MAX` means none.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct WireVertex {
    position_le: [u64; 3],
    partner_le: u32,
    flags: u8, // bit 0 live, bit 1 boundary
    region: u8,
    _pad: [u8; 2],
}

const_assert_eq!(size_of::<SnapshotHeader>(), 24);
const_assert_eq!(size_of::<WireCounts>(), 16);
const_assert_eq!(size_of::<WireVertex>(), 32);

impl WireVertex {
    fn new(v: &SnapshotVertex) -> Self {
        Self {
            position_le: v.position.map(|x| x.to_bits().to_le()),
            partner_le: v.partner.unwrap_or(NO_PARTNER).to_le(),
            flags: u8::from(v.live) | (u8::from(v.boundary) << 1),
            region: v.region.code(),
            _pad: [0; 2],
        }
    }

    fn decode(&self) -> Result<SnapshotVertex, TissueMeshError> {
        let partner = u32::from_le(self.partner_le);
        Ok(SnapshotVertex {
            position: self.position_le.map(|x| f64::from_bits(u64::from_le(x))),
            boundary: self.flags & 0b10 != 0,
            region: RegionTag::from_code(self.region).ok_or_else(|| {
                TissueMeshError::SnapshotDecode(format!("unknown region code {}", self.region))
            })?,
            partner: (partner != NO_PARTNER).then_some(partner),
            live: self.flags & 0b01 != 0,
        })
    }
}

fn read_pod<T: Pod>(buf: &mut &[u8], what: &str) -> Result<T, TissueMeshError> {
    let n = size_of::<T>();
    if buf.remaining() < n {
        return Err(TissueMeshError::SnapshotDecode(format!(
            "truncated {what}: need {n} bytes, have {}",
            buf.remaining()
        )));
    }
    let value = bytemuck::pod_read_unaligned(&buf[..n]);
    buf.advance(n);
    Ok(value)
}

fn need(buf: &&[u8], n: usize, what: &str) -> Result<(), TissueMeshError> {
    if buf.remaining() < n {
        Err(TissueMeshError::SnapshotDecode(format!(
            "truncated {what}: need {n} bytes, have {}",
            buf.remaining()
        )))
    } else {
        Ok(())
    }
}

fn read_ids(buf: &mut &[u8], what: &str) -> Result<Vec<u32>, TissueMeshError> {
    need(buf, 4, what)?;
    let n = buf.get_u32_le() as usize;
    need(buf, 4 * n, what)?;
    Ok((0..n).map(|_| buf.get_u32_le()).collect())
}

impl MeshSnapshot {
    pub fn capture(mesh: &VertexMesh) -> Self {
        let id = |v: VertexId| v.get();
        Self {
            version: SNAPSHOT_VERSION,
            dimension: mesh.dimension.as_u8(),
            generation: mesh.generation,
            next_cell: mesh.next_cell,
            vertices: mesh
                .vertices
                .iter()
                .map(|v| SnapshotVertex {
                    position: v.position,
                    boundary: v.boundary,
                    region: v.region,
                    partner: v.partner.map(id),
                    live: v.live,
                })
                .collect(),
            faces: mesh
                .faces
                .iter()
                .map(|f| SnapshotFace {
                    vertices: f.vertices.iter().copied().map(id).collect(),
                    kind: f.kind,
                    live: f.live,
                })
                .collect(),
            elements: mesh
                .elements
                .iter()
                .map(|e| SnapshotElement {
                    vertices: e.vertices.iter().copied().map(id).collect(),
                    faces: e.faces.iter().map(|of| (of.face.get(), of.reversed)).collect(),
                    cell: e.cell.0,
                    label: e.label,
                    live: e.live,
                })
                .collect(),
        }
    }

    /// Rebuild the mesh, reverse adjacency included.
    ///
    /// Fails on an unknown version, out-of-range references, live elements
    /// or faces with fewer than three distinct vertices, or a topologically
    /// inconsistent table.
    pub fn restore(&self) -> Result<VertexMesh, TissueMeshError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(TissueMeshError::SnapshotVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let dimension = match self.dimension {
            2 => MeshDimension::Two,
            3 => MeshDimension::Three,
            d => {
                return Err(TissueMeshError::SnapshotDecode(format!(
                    "unsupported dimension {d}"
                )));
            }
        };
        let (nv, nf) = (self.vertices.len(), self.faces.len());
        let vertex_ref = |i: u32, owner: &str| {
            if (i as usize) < nv {
                Ok(VertexId::new(i))
            } else {
                Err(TissueMeshError::SnapshotDecode(format!(
                    "{owner} references vertex {i} of {nv}"
                )))
            }
        };

        let mut mesh = VertexMesh::new(dimension);
        mesh.generation = self.generation;
        mesh.next_cell = self.next_cell;
        for (i, v) in self.vertices.iter().enumerate() {
            let mut vertex = Vertex::new(v.position);
            vertex.boundary = v.boundary;
            vertex.region = v.region;
            vertex.partner = v
                .partner
                .map(|p| vertex_ref(p, &format!("vertex {i}")))
                .transpose()?;
            vertex.live = v.live;
            mesh.vertices.push(vertex);
        }
        for (i, f) in self.faces.iter().enumerate() {
            let owner = format!("face {i}");
            let vertices = f
                .vertices
                .iter()
                .map(|&v| vertex_ref(v, &owner))
                .collect::<Result<Vec<_>, _>>()?;
            if f.live && distinct_count(&vertices) < 3 {
                return Err(TissueMeshError::DegenerateFace {
                    face: i,
                    reason: format!("{} distinct vertices", distinct_count(&vertices)),
                });
            }
            let mut face = Face::new(vertices, f.kind);
            face.live = f.live;
            mesh.faces.push(face);
        }
        for (i, e) in self.elements.iter().enumerate() {
            let owner = format!("element {i}");
            let vertices = e
                .vertices
                .iter()
                .map(|&v| vertex_ref(v, &owner))
                .collect::<Result<Vec<_>, _>>()?;
            let faces = e
                .faces
                .iter()
                .map(|&(f, reversed)| {
                    if (f as usize) < nf {
                        Ok(OrientedFace::new(FaceId::new(f), reversed))
                    } else {
                        Err(TissueMeshError::SnapshotDecode(format!(
                            "{owner} references face {f} of {nf}"
                        )))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            if e.live {
                let reason = match dimension {
                    MeshDimension::Two if distinct_count(&vertices) < 3 => {
                        Some(format!("{} distinct vertices", distinct_count(&vertices)))
                    }
                    MeshDimension::Three if faces.len() < 4 => {
                        Some(format!("{} faces", faces.len()))
                    }
                    _ => None,
                };
                if let Some(reason) = reason {
                    return Err(TissueMeshError::DegenerateElement { element: i, reason });
                }
            }
            let mut element = Element::new(vertices, faces, CellHandle(e.cell));
            element.label = e.label;
            element.live = e.live;
            mesh.elements.push(element);
        }
        let live: Vec<_> = mesh.element_ids().collect();
        for e in live {
            mesh.attach_element(e);
        }
        audit(&mesh, AuditOptions::topology_only())?;
        Ok(mesh)
    }

    /// Little-endian binary form.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        let header = SnapshotHeader {
            magic: MAGIC,
            version_le: self.version.to_le(),
            dimension: self.dimension,
            _pad: 0,
            generation_le: self.generation.to_le(),
            reserved_le: 0,
            next_cell_le: self.next_cell.to_le(),
        };
        let counts = WireCounts {
            vertices_le: (self.vertices.len() as u32).to_le(),
            faces_le: (self.faces.len() as u32).to_le(),
            elements_le: (self.elements.len() as u32).to_le(),
            _pad: 0,
        };
        buf.put_slice(bytemuck::bytes_of(&header));
        buf.put_slice(bytemuck::bytes_of(&counts));
        for v in &self.vertices {
            buf.put_slice(bytemuck::bytes_of(&WireVertex::new(v)));
        }
        for f in &self.faces {
            buf.put_u8(f.kind.code());
            buf.put_u8(u8::from(f.live));
            buf.put_u32_le(f.vertices.len() as u32);
            for &v in &f.vertices {
                buf.put_u32_le(v);
            }
        }
        for e in &self.elements {
            buf.put_u64_le(e.cell);
            buf.put_i32_le(e.label);
            buf.put_u8(u8::from(e.live));
            buf.put_u32_le(e.vertices.len() as u32);
            for &v in &e.vertices {
                buf.put_u32_le(v);
            }
            buf.put_u32_le(e.faces.len() as u32);
            for &(f, reversed) in &e.faces {
                buf.put_u32_le(f);
                buf.put_u8(u8::from(reversed));
            }
        }
        buf.freeze()
    }

    /// Inverse of [`encode`](Self::encode). Trailing bytes are an error.
    pub fn decode(bytes: &[u8]) -> Result<Self, TissueMeshError> {
        let mut buf = bytes;
        let header: SnapshotHeader = read_pod(&mut buf, "header")?;
        if header.magic != MAGIC {
            return Err(TissueMeshError::SnapshotDecode("bad magic".into()));
        }
        let version = u16::from_le(header.version_le);
        if version != SNAPSHOT_VERSION {
            return Err(TissueMeshError::SnapshotVersion {
                found: version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let counts: WireCounts = read_pod(&mut buf, "counts")?;

        let nv = u32::from_le(counts.vertices_le) as usize;
        need(&buf, nv * size_of::<WireVertex>(), "vertex table")?;
        let mut vertices = Vec::with_capacity(nv);
        for _ in 0..nv {
            let wire: WireVertex = read_pod(&mut buf, "vertex")?;
            vertices.push(wire.decode()?);
        }

        let nf = u32::from_le(counts.faces_le) as usize;
        let mut faces = Vec::with_capacity(nf.min(buf.remaining()));
        for _ in 0..nf {
            need(&buf, 2, "face")?;
            let code = buf.get_u8();
            let kind = FaceKind::from_code(code).ok_or_else(|| {
                TissueMeshError::SnapshotDecode(format!("unknown face kind {code}"))
            })?;
            let live = buf.get_u8() != 0;
            let vertices = read_ids(&mut buf, "face vertices")?;
            faces.push(SnapshotFace {
                vertices,
                kind,
                live,
            });
        }

        let ne = u32::from_le(counts.elements_le) as usize;
        let mut elements = Vec::with_capacity(ne.min(buf.remaining()));
        for _ in 0..ne {
            need(&buf, 13, "element")?;
            let cell = buf.get_u64_le();
            let label = buf.get_i32_le();
            let live = buf.get_u8() != 0;
            let vertices = read_ids(&mut buf, "element vertices")?;
            need(&buf, 4, "element faces")?;
            let n = buf.get_u32_le() as usize;
            need(&buf, 5 * n, "element faces")?;
            let faces = (0..n)
                .map(|_| (buf.get_u32_le(), buf.get_u8() != 0))
                .collect();
            elements.push(SnapshotElement {
                vertices,
                faces,
                cell,
                label,
                live,
            });
        }
        if buf.has_remaining() {
            return Err(TissueMeshError::SnapshotDecode(format!(
                "{} trailing bytes",
                buf.remaining()
            )));
        }
        Ok(Self {
            version,
            dimension: header.dimension,
            generation: u32::from_le(header.generation_le),
            next_cell: u64::from_le(header.next_cell_le),
            vertices,
            faces,
            elements,
        })
    }
}

impl VertexMesh {
    pub fn snapshot(&self) -> MeshSnapshot {
        MeshSnapshot::capture(self)
    }

    pub fn from_snapshot(snapshot: &MeshSnapshot) -> Result<Self, TissueMeshError> {
        snapshot.restore()
    }
}
