use crate::mesh_error::TissueMeshError;
use crate::mesh_generation::hexagonal_prism_mesh;
use crate::topology::ids::{CellHandle, ElementId, EntityRef, VertexId};
use crate::topology::mesh::VertexMesh;
use crate::topology::validation::{AuditOptions, audit};

fn strip() -> VertexMesh {
    VertexMesh::from_polygons(
        &[[0., 0.], [1., 0.], [2., 0.], [0., 1.], [1., 1.], [2., 1.]],
        &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]],
    )
    .unwrap()
}

fn total_area(mesh: &VertexMesh) -> f64 {
    mesh.element_ids().map(|e| mesh.area(e).unwrap()).sum()
}

#[test]
fn vertical_division_leaves_neighbour_alone() {
    let mut mesh = strip();
    let e0 = ElementId::new(0);
    let child = mesh.divide_element(e0, Some([0.0, 1.0, 0.0])).unwrap();

    assert_eq!(mesh.num_elements(), 3);
    assert_eq!(mesh.cell_of(child).unwrap(), CellHandle(2));
    assert!((mesh.area(e0).unwrap() - 0.5).abs() < 1e-12);
    assert!((mesh.area(child).unwrap() - 0.5).abs() < 1e-12);
    assert_eq!(mesh.element(ElementId::new(1)).unwrap().num_vertices(), 4);
    assert!((total_area(&mesh) - 2.0).abs() < 1e-12);
    audit(&mesh, AuditOptions::all()).unwrap();
}

#[test]
fn cut_on_shared_edge_reaches_neighbour() {
    let mut mesh = strip();
    let child = mesh
        .divide_element(ElementId::new(0), Some([1.0, 0.0, 0.0]))
        .unwrap();

    let neighbour = mesh.element(ElementId::new(1)).unwrap();
    assert_eq!(neighbour.num_vertices(), 5);
    let shared: Vec<VertexId> = neighbour
        .vertices()
        .iter()
        .copied()
        .filter(|v| mesh.vertex(*v).unwrap().elements().contains(&child))
        .collect();
    assert!(!shared.is_empty());
    assert!((total_area(&mesh) - 2.0).abs() < 1e-12);
    audit(&mesh, AuditOptions::all()).unwrap();
}

#[test]
fn default_axis_splits_across_the_long_side() {
    let mut mesh = VertexMesh::from_polygons(
        &[[-2.0, -0.5], [2.0, -0.5], [2.0, 0.5], [-2.0, 0.5]],
        &[vec![0, 1, 2, 3]],
    )
    .unwrap();
    let e0 = ElementId::new(0);
    let child = mesh.divide_element(e0, None).unwrap();

    assert!((mesh.area(e0).unwrap() - 2.0).abs() < 1e-9);
    assert!((mesh.area(child).unwrap() - 2.0).abs() < 1e-9);
    let new_vertices: Vec<_> = mesh
        .element(child)
        .unwrap()
        .vertices()
        .iter()
        .filter(|v| v.index() >= 4)
        .map(|&v| mesh.position(v).unwrap())
        .collect();
    assert_eq!(new_vertices.len(), 2);
    for p in new_vertices {
        assert!(p[0].abs() < 1e-9);
    }
}

#[test]
fn division_rejects_degenerate_axis() {
    let mut mesh = strip();
    let err = mesh
        .divide_element(ElementId::new(0), Some([0.0, 0.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, TissueMeshError::DivisionFailed { .. }));
    assert_eq!(mesh.num_elements(), 2);
}

#[test]
fn prism_division_conserves_volume() {
    let mut mesh = hexagonal_prism_mesh(2, 1, 1.0, 0.5).unwrap();
    let before: f64 = mesh.element_ids().map(|e| mesh.volume(e).unwrap()).sum();
    let e0 = ElementId::new(0);
    let child = mesh.divide_element(e0, None).unwrap();
    let after: f64 = mesh.element_ids().map(|e| mesh.volume(e).unwrap()).sum();

    assert_eq!(mesh.num_elements(), 3);
    assert!((before - after).abs() < 1e-9);
    assert!(mesh.volume(child).unwrap() > 0.0);
    assert!(mesh.is_monolayer());
    audit(&mesh, AuditOptions::all()).unwrap();
}

#[test]
fn removal_tombstones_private_vertices() {
    let mut mesh = strip();
    mesh.remove_element(ElementId::new(0)).unwrap();
    assert_eq!(mesh.num_elements(), 1);
    assert_eq!(mesh.num_vertices(), 4);
    assert!(mesh.has_tombstones());
    assert!(matches!(
        mesh.vertex(VertexId::new(0)),
        Err(TissueMeshError::NotFound { .. })
    ));
    // the former shared edge is now on the free boundary
    assert!(mesh.vertex(VertexId::new(1)).unwrap().is_boundary());
    audit(&mesh, AuditOptions::all()).unwrap();
}

#[test]
fn compaction_renumbers_densely() {
    let mut mesh = strip();
    mesh.remove_element(ElementId::new(0)).unwrap();
    let map = mesh.compact();

    assert_eq!(map.generation, 1);
    assert_eq!(mesh.generation(), 1);
    assert!(!map.is_identity());
    assert_eq!(map.element(ElementId::new(0)), None);
    assert_eq!(map.element(ElementId::new(1)), Some(ElementId::new(0)));
    assert_eq!(map.vertex(VertexId::new(1)), Some(VertexId::new(0)));
    assert_eq!(map.vertex(VertexId::new(3)), None);
    assert!(!mesh.has_tombstones());
    assert_eq!(mesh.cell_of(ElementId::new(0)).unwrap(), CellHandle(1));
    assert!((mesh.area(ElementId::new(0)).unwrap() - 1.0).abs() < 1e-12);
    audit(&mesh, AuditOptions::all()).unwrap();

    assert!(mesh.compact().is_identity());
}

#[test]
fn mark_deleted_refuses_used_entities() {
    let mut mesh = strip();
    let err = mesh
        .mark_deleted(EntityRef::Vertex(VertexId::new(1)))
        .unwrap_err();
    assert!(matches!(err, TissueMeshError::EntityInUse { .. }));

    let free = mesh.add_vertex([5.0, 5.0, 0.0]);
    mesh.mark_deleted(EntityRef::Vertex(free)).unwrap();
    assert!(mesh.vertex(free).is_err());

    mesh.mark_deleted(EntityRef::Element(ElementId::new(1)))
        .unwrap();
    assert_eq!(mesh.num_elements(), 1);
    assert!(
        mesh.vertex(VertexId::new(2))
            .unwrap()
            .elements()
            .is_empty()
    );
}
