//! Entity records stored in the mesh tables.
//!
//! Records are plain data. Forward references (element → vertices, element →
//! faces, face → vertices) are authoritative; the reverse lists kept on
//! vertices and faces are derived and maintained by the mutation layer.

use crate::topology::ids::{CellHandle, ElementId, FaceId, VertexId};
use serde::{Deserialize, Serialize};

/// Which epithelial layer a vertex belongs to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionTag {
    /// Vertex of a 2D mesh or of an untagged 3D mesh.
    #[default]
    Untagged,
    Apical,
    Basal,
}

impl RegionTag {
    pub fn code(self) -> u8 {
        match self {
            RegionTag::Untagged => 0,
            RegionTag::Apical => 1,
            RegionTag::Basal => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RegionTag::Untagged),
            1 => Some(RegionTag::Apical),
            2 => Some(RegionTag::Basal),
            _ => None,
        }
    }
}

/// Role of a face within a monolayer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceKind {
    #[default]
    Untagged,
    Apical,
    Basal,
    Lateral,
}

impl FaceKind {
    /// Stable integer code used by the exporters.
    pub fn code(self) -> u8 {
        match self {
            FaceKind::Untagged => 0,
            FaceKind::Apical => 1,
            FaceKind::Basal => 2,
            FaceKind::Lateral => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FaceKind::Untagged),
            1 => Some(FaceKind::Apical),
            2 => Some(FaceKind::Basal),
            3 => Some(FaceKind::Lateral),
            _ => None,
        }
    }
}

/// A mesh vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub(crate) position: [f64; 3],
    pub(crate) boundary: bool,
    pub(crate) region: RegionTag,
    /// Apical ↔ basal counterpart in a monolayer.
    pub(crate) partner: Option<VertexId>,
    pub(crate) live: bool,
    /// Live elements containing this vertex, ascending.
    pub(crate) elements: Vec<ElementId>,
}

impl Vertex {
    pub(crate) fn new(position: [f64; 3]) -> Self {
        Self {
            position,
            boundary: false,
            region: RegionTag::Untagged,
            partner: None,
            live: true,
            elements: Vec::new(),
        }
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// Lies on the tissue exterior. Recomputed after every topology change.
    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    pub fn region(&self) -> RegionTag {
        self.region
    }

    pub fn partner(&self) -> Option<VertexId> {
        self.partner
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }
}

/// A face reference together with its orientation inside one element.
///
/// When `reversed` is false the stored vertex order of the face is already
/// counter-clockwise seen from outside the element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrientedFace {
    pub face: FaceId,
    pub reversed: bool,
}

impl OrientedFace {
    pub fn new(face: FaceId, reversed: bool) -> Self {
        Self { face, reversed }
    }
}

/// A polygonal face of a 3D mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) kind: FaceKind,
    pub(crate) live: bool,
    /// Live elements bounded by this face, ascending.
    pub(crate) elements: Vec<ElementId>,
}

impl Face {
    pub(crate) fn new(vertices: Vec<VertexId>, kind: FaceKind) -> Self {
        Self {
            vertices,
            kind,
            live: true,
            elements: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// Vertex cycle as seen through the given orientation.
    pub fn oriented_vertices(&self, reversed: bool) -> Vec<VertexId> {
        if reversed {
            self.vertices.iter().rev().copied().collect()
        } else {
            self.vertices.clone()
        }
    }

    pub fn kind(&self) -> FaceKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }
}

/// An element: a polygon (2D) or polyhedron (3D) standing for one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// 2D: the counter-clockwise boundary cycle. 3D: every vertex of the
    /// element, apical cycle first for monolayer cells.
    pub(crate) vertices: Vec<VertexId>,
    /// Bounding faces with outward orientation; empty in 2D.
    pub(crate) faces: Vec<OrientedFace>,
    pub(crate) cell: CellHandle,
    pub(crate) label: i32,
    pub(crate) live: bool,
}

impl Element {
    pub(crate) fn new(vertices: Vec<VertexId>, faces: Vec<OrientedFace>, cell: CellHandle) -> Self {
        Self {
            vertices,
            faces,
            cell,
            label: 0,
            live: true,
        }
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn faces(&self) -> &[OrientedFace] {
        &self.faces
    }

    pub fn cell(&self) -> CellHandle {
        self.cell
    }

    /// User attribute carried through division, snapshots, and export.
    pub fn label(&self) -> i32 {
        self.label
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
}

/// Insert `id` into an ascending list if absent.
pub(crate) fn insert_sorted<T: Ord + Copy>(list: &mut Vec<T>, id: T) {
    if let Err(pos) = list.binary_search(&id) {
        list.insert(pos, id);
    }
}

/// Remove `id` from an ascending list if present.
pub(crate) fn remove_sorted<T: Ord + Copy>(list: &mut Vec<T>, id: T) {
    if let Ok(pos) = list.binary_search(&id) {
        list.remove(pos);
    }
}
