use crate::mesh_generation::hexagonal_prism_mesh;
use crate::topology::entity::{FaceKind, RegionTag};
use crate::topology::ids::{ElementId, EntityRef, VertexId};
use crate::topology::mesh::VertexMesh;
use crate::topology::validation::{AuditOptions, ViolationKind, audit, audit_all};

fn square_pair() -> VertexMesh {
    VertexMesh::from_polygons(
        &[[0., 0.], [2., 0.], [4., 0.], [0., 2.], [2., 2.], [4., 2.]],
        &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]],
    )
    .unwrap()
}

fn kinds(mesh: &VertexMesh, options: AuditOptions) -> Vec<ViolationKind> {
    audit_all(mesh, options).into_iter().map(|v| v.kind).collect()
}

#[test]
fn generated_meshes_are_valid() {
    audit(&square_pair(), AuditOptions::all()).unwrap();
    audit(&hexagonal_prism_mesh(3, 3, 1.0, 1.0).unwrap(), AuditOptions::all()).unwrap();
}

#[test]
fn non_finite_position_is_reported_first() {
    let mut mesh = square_pair();
    mesh.set_position(VertexId::new(4), [f64::NAN, 2.0, 0.0])
        .unwrap();
    let err = audit(&mesh, AuditOptions::all()).unwrap_err();
    assert_eq!(err.kind, ViolationKind::NonFinitePosition);
    assert_eq!(err.location, EntityRef::Vertex(VertexId::new(4)));
}

#[test]
fn asymmetric_reverse_list_is_reported() {
    let mut mesh = square_pair();
    mesh.vertices[VertexId::new(4).index()]
        .elements
        .retain(|&e| e != ElementId::new(1));
    let err = audit(&mesh, AuditOptions::topology_only()).unwrap_err();
    assert_eq!(err.kind, ViolationKind::AsymmetricAdjacency);
    assert_eq!(err.location, EntityRef::Element(ElementId::new(1)));
}

#[test]
fn orphan_vertex_is_reported() {
    let mut mesh = square_pair();
    let stray = mesh.add_vertex([9.0, 9.0, 0.0]);
    let err = audit(&mesh, AuditOptions::all()).unwrap_err();
    assert_eq!(err.kind, ViolationKind::OrphanedEntity);
    assert_eq!(err.location, EntityRef::Vertex(stray));

    let relaxed = AuditOptions {
        check_orphans: false,
        ..AuditOptions::all()
    };
    assert!(audit(&mesh, relaxed).is_ok());
}

#[test]
fn inverted_element_is_reported() {
    let mut mesh = square_pair();
    mesh.elements[0].vertices.reverse();
    assert_eq!(
        kinds(&mesh, AuditOptions::all()),
        vec![ViolationKind::InvertedElement]
    );
    assert!(audit(&mesh, AuditOptions::topology_only()).is_ok());
}

#[test]
fn collapsed_element_is_degenerate() {
    let mut mesh = square_pair();
    // squash the right square onto its left edge
    mesh.set_position(VertexId::new(2), [2.0, 0.0, 0.0]).unwrap();
    mesh.set_position(VertexId::new(5), [2.0, 2.0, 0.0]).unwrap();
    let found = kinds(&mesh, AuditOptions::all());
    assert!(found.contains(&ViolationKind::DegenerateElement));
}

#[test]
fn crossing_boundary_is_reported() {
    let mut mesh = VertexMesh::from_polygons(
        &[[0., 0.], [2., 0.], [2., 2.], [0., 2.]],
        &[vec![0, 1, 2, 3]],
    )
    .unwrap();
    // pull a corner across the opposite edge
    mesh.set_position(VertexId::new(1), [-1.0, 1.5, 0.0]).unwrap();
    let found = kinds(&mesh, AuditOptions::all());
    assert!(found.contains(&ViolationKind::SelfIntersection));

    let geometry_off = AuditOptions {
        check_self_intersection: false,
        check_orientation: false,
        ..AuditOptions::all()
    };
    assert!(audit(&mesh, geometry_off).is_ok());
}

#[test]
fn broken_partner_link_is_reported() {
    let mut mesh = hexagonal_prism_mesh(1, 1, 1.0, 1.0).unwrap();
    let v = mesh.vertex_ids().next().unwrap();
    let partner = mesh.vertex(v).unwrap().partner().unwrap();
    mesh.vertices[partner.index()].partner = None;
    let err = audit(&mesh, AuditOptions::topology_only()).unwrap_err();
    assert_eq!(err.kind, ViolationKind::AsymmetricAdjacency);
    assert_eq!(err.location, EntityRef::Vertex(v));
}

#[test]
fn lateral_face_must_pair_apical_and_basal_edges() {
    let mut mesh = hexagonal_prism_mesh(2, 1, 1.0, 1.0).unwrap();
    let f = mesh
        .face_ids()
        .find(|&f| mesh.face(f).unwrap().kind() == FaceKind::Lateral)
        .unwrap();
    let region = |m: &VertexMesh, v: VertexId| m.vertex(v).unwrap().region();
    let verts = mesh.faces[f.index()].vertices.clone();
    let basal: Vec<_> = verts
        .iter()
        .copied()
        .filter(|&v| region(&mesh, v) == RegionTag::Basal)
        .collect();
    let apical: Vec<_> = verts
        .iter()
        .copied()
        .filter(|&v| region(&mesh, v) == RegionTag::Apical)
        .collect();
    assert_eq!((basal.len(), apical.len()), (2, 2));

    // same four vertices, alternating layers
    mesh.faces[f.index()].vertices = vec![basal[0], apical[0], basal[1], apical[1]];
    let err = audit(&mesh, AuditOptions::topology_only()).unwrap_err();
    assert_eq!(err.kind, ViolationKind::MalformedLateralFace);
    assert_eq!(err.location, EntityRef::Face(f));
}

#[test]
fn audit_all_keeps_going() {
    let mut mesh = square_pair();
    mesh.elements[0].vertices.reverse();
    mesh.elements[1].vertices.reverse();
    assert_eq!(audit_all(&mesh, AuditOptions::all()).len(), 2);
}
