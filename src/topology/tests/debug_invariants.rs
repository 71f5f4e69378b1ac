#![cfg(any(debug_assertions, feature = "strict-invariants"))]

use crate::debug_invariants::DebugInvariants;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::VertexMesh;

fn strip() -> VertexMesh {
    VertexMesh::from_polygons(
        &[[0., 0.], [1., 0.], [2., 0.], [0., 1.], [1., 1.], [2., 1.]],
        &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]],
    )
    .unwrap()
}

#[test]
fn intact_mesh_passes() {
    let mesh = strip();
    mesh.debug_assert_invariants();
    assert!(mesh.validate_invariants().is_ok());
}

#[test]
#[should_panic]
fn missing_reverse_entry_panics_in_debug() {
    let mut mesh = strip();
    mesh.vertices[VertexId::new(1).index()].elements.clear();
    mesh.debug_assert_invariants();
}

#[test]
#[should_panic]
fn dead_vertex_in_cycle_panics_in_debug() {
    let mut mesh = strip();
    mesh.vertices[VertexId::new(4).index()].live = false;
    mesh.debug_assert_invariants();
}

#[test]
#[should_panic]
fn stale_element_listing_panics_in_debug() {
    let mut mesh = strip();
    mesh.elements[ElementId::new(0).index()].live = false;
    mesh.debug_assert_invariants();
}
