//! Strong index handles for mesh entities.
//!
//! Vertices, faces, and elements live in flat tables owned by
//! [`VertexMesh`](crate::topology::mesh::VertexMesh). Every cross reference
//! between entities is one of these `u32` handles; nothing owns anything
//! else. A handle stays valid until the next compaction, after which the
//! [`CompactionMap`](crate::topology::mutate::CompactionMap) tells callers
//! where it moved.
//!
//! [`CellHandle`] is different: it is the opaque identity of the biological
//! cell an element stands for. The mesh stores it but never interprets it.

use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use std::fmt;

macro_rules! index_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw table index.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Table slot of this handle.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw `u32` value, as written to snapshots.
            #[inline]
            pub const fn get(self) -> u32 {
                self.0
            }

            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, "entity table overflow");
                Self(index as u32)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $label, self.0)
            }
        }
    };
}

index_handle!(
    /// Handle of a mesh vertex.
    VertexId,
    "v"
);
index_handle!(
    /// Handle of a polygonal face (3D meshes only).
    FaceId,
    "f"
);
index_handle!(
    /// Handle of an element, i.e. the geometric footprint of one cell.
    ElementId,
    "e"
);

assert_eq_size!(VertexId, u32);
assert_eq_size!(FaceId, u32);
assert_eq_size!(ElementId, u32);
assert_eq_size!(CellHandle, u64);

/// Opaque identity of the biological cell attached to an element.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[repr(transparent)]
pub struct CellHandle(pub u64);

impl fmt::Display for CellHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// The three entity tables of a mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Vertex,
    Face,
    Element,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Vertex => "vertex",
            EntityKind::Face => "face",
            EntityKind::Element => "element",
        };
        f.write_str(name)
    }
}

/// A handle into any of the entity tables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    Vertex(VertexId),
    Face(FaceId),
    Element(ElementId),
}

impl EntityRef {
    pub fn kind(self) -> EntityKind {
        match self {
            EntityRef::Vertex(_) => EntityKind::Vertex,
            EntityRef::Face(_) => EntityKind::Face,
            EntityRef::Element(_) => EntityKind::Element,
        }
    }

    pub fn index(self) -> usize {
        match self {
            EntityRef::Vertex(v) => v.index(),
            EntityRef::Face(f) => f.index(),
            EntityRef::Element(e) => e.index(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Vertex(v) => write!(f, "vertex {v}"),
            EntityRef::Face(x) => write!(f, "face {x}"),
            EntityRef::Element(e) => write!(f, "element {e}"),
        }
    }
}

impl From<VertexId> for EntityRef {
    fn from(v: VertexId) -> Self {
        EntityRef::Vertex(v)
    }
}

impl From<FaceId> for EntityRef {
    fn from(f: FaceId) -> Self {
        EntityRef::Face(f)
    }
}

impl From<ElementId> for EntityRef {
    fn from(e: ElementId) -> Self {
        EntityRef::Element(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_debug() {
        let v = VertexId::new(7);
        assert_eq!(format!("{v}"), "v7");
        assert_eq!(format!("{v:?}"), "VertexId(7)");
        assert_eq!(format!("{}", EntityRef::from(ElementId::new(3))), "element e3");
        assert_eq!(format!("{}", CellHandle(9)), "cell#9");
    }

    #[test]
    fn ordering_follows_index() {
        let mut ids = vec![FaceId::new(5), FaceId::new(1), FaceId::new(3)];
        ids.sort();
        assert_eq!(ids, vec![FaceId::new(1), FaceId::new(3), FaceId::new(5)]);
        assert_eq!(ids[2].index(), 5);
    }

    #[test]
    fn serde_is_transparent_number() {
        let e = ElementId::new(42);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, "42");
        let back: ElementId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
