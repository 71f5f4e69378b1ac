//! Mesh validity checker.
//!
//! [`audit`] inspects a mesh after every simulation step and reports the
//! first invalid state it finds: dangling or asymmetric references,
//! orphaned entities, malformed monolayer lateral faces, degenerate or
//! inverted elements, and self-crossing element boundaries. The checker
//! never repairs anything.

use crate::debug_invariants::DebugInvariants;
use crate::geometry::metrics::{
    EPS, distance, face_area, polyhedron_volume, self_intersections_xy, signed_area_xy,
};
use crate::mesh_error::TissueMeshError;
use crate::topology::entity::{FaceKind, RegionTag};
use crate::topology::ids::{ElementId, EntityRef, FaceId, VertexId};
use crate::topology::mesh::{MeshDimension, VertexMesh, cycle_has_edge, distinct_count};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional toggles for the audit passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditOptions {
    /// Forward references point at live entities; reverse lists agree;
    /// lateral faces bridge one apical and one basal edge.
    pub check_references: bool,
    /// Every live vertex and face is used by a live element.
    pub check_orphans: bool,
    /// Fewer than three distinct vertices, zero-length edges, vanishing measure.
    pub check_degeneracy: bool,
    /// Negative signed area (2D) or volume (3D).
    pub check_orientation: bool,
    /// Element boundary cycles (2D) and apical/basal faces (3D) do not cross themselves.
    pub check_self_intersection: bool,
    /// Areas and volumes at or below this are degenerate.
    pub min_measure: f64,
}

impl AuditOptions {
    /// Enable every audit pass.
    pub fn all() -> Self {
        Self {
            check_references: true,
            check_orphans: true,
            check_degeneracy: true,
            check_orientation: true,
            check_self_intersection: true,
            min_measure: EPS,
        }
    }

    /// Reference and orphan checks only; no geometry.
    pub fn topology_only() -> Self {
        Self {
            check_degeneracy: false,
            check_orientation: false,
            check_self_intersection: false,
            ..Self::all()
        }
    }
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self::all()
    }
}

/// Category of an audit failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    NonFinitePosition,
    DanglingReference,
    AsymmetricAdjacency,
    OrphanedEntity,
    NonManifoldFace,
    /// A lateral face that is not a quad over one apical edge and its basal
    /// partner edge, or whose owners do not have that edge.
    MalformedLateralFace,
    DegenerateFace,
    DegenerateElement,
    InvertedElement,
    SelfIntersection,
}

/// One invalid mesh state, with the entity where it was found.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshViolation {
    pub kind: ViolationKind,
    pub location: EntityRef,
    pub detail: String,
}

impl MeshViolation {
    fn new(kind: ViolationKind, location: impl Into<EntityRef>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for MeshViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}: {}", self.kind, self.location, self.detail)
    }
}

impl std::error::Error for MeshViolation {}

/// First violation found, if any.
pub fn audit(mesh: &VertexMesh, options: AuditOptions) -> Result<(), MeshViolation> {
    match collect(mesh, options, true).into_iter().next() {
        Some(v) => Err(v),
        None => Ok(()),
    }
}

/// Every violation found.
pub fn audit_all(mesh: &VertexMesh, options: AuditOptions) -> Vec<MeshViolation> {
    collect(mesh, options, false)
}

fn collect(mesh: &VertexMesh, options: AuditOptions, first_only: bool) -> Vec<MeshViolation> {
    let mut out = Vec::new();
    macro_rules! report {
        ($v:expr) => {{
            let violation = $v;
            log::warn!("mesh audit: {violation}");
            out.push(violation);
            if first_only {
                return out;
            }
        }};
    }

    for v in mesh.vertex_ids() {
        let p = mesh.vertices[v.index()].position;
        if p.iter().any(|c| !c.is_finite()) {
            report!(MeshViolation::new(
                ViolationKind::NonFinitePosition,
                v,
                format!("position {p:?}")
            ));
        }
    }

    if options.check_references {
        for e in mesh.element_ids() {
            if let Some(v) = check_element_references(mesh, e) {
                report!(v);
            }
        }
        for f in mesh.face_ids() {
            if let Some(v) = check_face_references(mesh, f) {
                report!(v);
            }
        }
        for v in mesh.vertex_ids() {
            if let Some(violation) = check_vertex_references(mesh, v) {
                report!(violation);
            }
        }
    }

    if options.check_orphans {
        for v in mesh.vertex_ids() {
            if mesh.vertices[v.index()].elements.is_empty() {
                report!(MeshViolation::new(
                    ViolationKind::OrphanedEntity,
                    v,
                    "live vertex belongs to no element"
                ));
            }
        }
        for f in mesh.face_ids() {
            let owners = mesh.faces[f.index()].elements.len();
            if owners == 0 {
                report!(MeshViolation::new(
                    ViolationKind::OrphanedEntity,
                    f,
                    "live face bounds no element"
                ));
            } else if owners > 2 {
                report!(MeshViolation::new(
                    ViolationKind::NonManifoldFace,
                    f,
                    format!("face bounds {owners} elements")
                ));
            }
        }
    }

    // geometry needs intact references
    if !out.is_empty() {
        return out;
    }

    if options.check_references && mesh.dimension == MeshDimension::Three {
        for f in mesh.face_ids() {
            if mesh.faces[f.index()].kind != FaceKind::Lateral {
                continue;
            }
            if let Some(v) = check_lateral_face(mesh, f) {
                report!(v);
            }
        }
    }

    for e in mesh.element_ids() {
        let found = match mesh.dimension {
            MeshDimension::Two => check_polygon(mesh, e, options),
            MeshDimension::Three => check_polyhedron(mesh, e, options),
        };
        for v in found {
            report!(v);
        }
    }
    out
}

fn check_element_references(mesh: &VertexMesh, e: ElementId) -> Option<MeshViolation> {
    let el = &mesh.elements[e.index()];
    for &v in &el.vertices {
        match mesh.vertices.get(v.index()) {
            Some(vx) if vx.live => {
                if vx.elements.binary_search(&e).is_err() {
                    return Some(MeshViolation::new(
                        ViolationKind::AsymmetricAdjacency,
                        e,
                        format!("vertex {v} does not list the element"),
                    ));
                }
            }
            _ => {
                return Some(MeshViolation::new(
                    ViolationKind::DanglingReference,
                    e,
                    format!("references missing vertex {v}"),
                ));
            }
        }
    }
    for of in &el.faces {
        match mesh.faces.get(of.face.index()) {
            Some(face) if face.live => {
                if face.elements.binary_search(&e).is_err() {
                    return Some(MeshViolation::new(
                        ViolationKind::AsymmetricAdjacency,
                        e,
                        format!("face {} does not list the element", of.face),
                    ));
                }
            }
            _ => {
                return Some(MeshViolation::new(
                    ViolationKind::DanglingReference,
                    e,
                    format!("references missing face {}", of.face),
                ));
            }
        }
    }
    None
}

fn check_face_references(mesh: &VertexMesh, f: FaceId) -> Option<MeshViolation> {
    let face = &mesh.faces[f.index()];
    for &v in &face.vertices {
        if !mesh.vertices.get(v.index()).is_some_and(|vx| vx.live) {
            return Some(MeshViolation::new(
                ViolationKind::DanglingReference,
                f,
                format!("references missing vertex {v}"),
            ));
        }
    }
    for &e in &face.elements {
        let listed = mesh
            .elements
            .get(e.index())
            .is_some_and(|el| el.live && el.faces.iter().any(|of| of.face == f));
        if !listed {
            return Some(MeshViolation::new(
                ViolationKind::AsymmetricAdjacency,
                f,
                format!("element {e} does not reference the face"),
            ));
        }
    }
    None
}

fn check_vertex_references(mesh: &VertexMesh, v: VertexId) -> Option<MeshViolation> {
    let vx = &mesh.vertices[v.index()];
    for &e in &vx.elements {
        let listed = mesh
            .elements
            .get(e.index())
            .is_some_and(|el| el.live && el.vertices.contains(&v));
        if !listed {
            return Some(MeshViolation::new(
                ViolationKind::AsymmetricAdjacency,
                v,
                format!("element {e} does not reference the vertex"),
            ));
        }
    }
    if let Some(p) = vx.partner {
        let back = mesh
            .vertices
            .get(p.index())
            .is_some_and(|pv| pv.live && pv.partner == Some(v));
        if !back {
            return Some(MeshViolation::new(
                ViolationKind::AsymmetricAdjacency,
                v,
                format!("partner {p} does not point back"),
            ));
        }
    }
    None
}

/// A lateral face is stored as `[b0, b1, a1, a0]` up to rotation and
/// reversal: two basal vertices followed by their apical partners. Each
/// owner must have `a0-a1` on its apical face and `b0-b1` on its basal face.
fn check_lateral_face(mesh: &VertexMesh, f: FaceId) -> Option<MeshViolation> {
    let face = &mesh.faces[f.index()];
    let malformed =
        |detail: String| Some(MeshViolation::new(ViolationKind::MalformedLateralFace, f, detail));
    let vs = &face.vertices;
    if vs.len() != 4 || distinct_count(vs) != 4 {
        return malformed(format!("{} vertices, {} distinct", vs.len(), distinct_count(vs)));
    }
    let region = |v: VertexId| mesh.vertices[v.index()].region;
    let partner = |v: VertexId| mesh.vertices[v.index()].partner;
    let start = (0..4).find(|&k| {
        region(vs[k]) == RegionTag::Basal
            && region(vs[(k + 1) % 4]) == RegionTag::Basal
            && region(vs[(k + 2) % 4]) == RegionTag::Apical
            && region(vs[(k + 3) % 4]) == RegionTag::Apical
    });
    let Some(k) = start else {
        return malformed("vertices are not two basal followed by two apical".into());
    };
    let (b0, b1, a1, a0) = (vs[k], vs[(k + 1) % 4], vs[(k + 2) % 4], vs[(k + 3) % 4]);
    if partner(a0) != Some(b0) || partner(a1) != Some(b1) {
        return malformed(format!("{a0}-{a1} is not partnered with {b0}-{b1}"));
    }
    for &e in &face.elements {
        for of in &mesh.elements[e.index()].faces {
            let cap = &mesh.faces[of.face.index()];
            let (x, y) = match cap.kind {
                FaceKind::Apical => (a0, a1),
                FaceKind::Basal => (b0, b1),
                _ => continue,
            };
            if !cycle_has_edge(&cap.vertices, x, y) {
                return malformed(format!(
                    "owner {e} has no {:?} edge {x}-{y}",
                    cap.kind
                ));
            }
        }
    }
    None
}

fn check_polygon(mesh: &VertexMesh, e: ElementId, options: AuditOptions) -> Vec<MeshViolation> {
    let mut out = Vec::new();
    let cycle = &mesh.elements[e.index()].vertices;
    let pts: Vec<[f64; 3]> = cycle
        .iter()
        .map(|v| mesh.vertices[v.index()].position)
        .collect();
    let n = cycle.len();
    if options.check_degeneracy {
        if n < 3 || distinct_count(cycle) != n {
            out.push(MeshViolation::new(
                ViolationKind::DegenerateElement,
                e,
                format!("cycle of {n} vertices with {} distinct", distinct_count(cycle)),
            ));
            return out;
        }
        if let Some(i) = (0..n).find(|&i| distance(pts[i], pts[(i + 1) % n]) < EPS) {
            out.push(MeshViolation::new(
                ViolationKind::DegenerateElement,
                e,
                format!("zero-length edge {}-{}", cycle[i], cycle[(i + 1) % n]),
            ));
        }
    }
    let area = signed_area_xy(&pts);
    if options.check_degeneracy && area.abs() <= options.min_measure {
        out.push(MeshViolation::new(
            ViolationKind::DegenerateElement,
            e,
            format!("area {area:e}"),
        ));
    } else if options.check_orientation && area < 0.0 {
        out.push(MeshViolation::new(
            ViolationKind::InvertedElement,
            e,
            format!("signed area {area}"),
        ));
    }
    if options.check_self_intersection {
        if let Some(&(i, j)) = self_intersections_xy(&pts).first() {
            out.push(MeshViolation::new(
                ViolationKind::SelfIntersection,
                e,
                format!(
                    "edges {}-{} and {}-{} cross",
                    cycle[i],
                    cycle[(i + 1) % n],
                    cycle[j],
                    cycle[(j + 1) % n]
                ),
            ));
        }
    }
    out
}

fn check_polyhedron(mesh: &VertexMesh, e: ElementId, options: AuditOptions) -> Vec<MeshViolation> {
    let mut out = Vec::new();
    let el = &mesh.elements[e.index()];
    let mut faces = Vec::with_capacity(el.faces.len());
    for of in &el.faces {
        let face = &mesh.faces[of.face.index()];
        let pts: Vec<[f64; 3]> = face
            .oriented_vertices(of.reversed)
            .iter()
            .map(|v| mesh.vertices[v.index()].position)
            .collect();
        if options.check_degeneracy {
            let n = face.vertices.len();
            if n < 3 || distinct_count(&face.vertices) != n {
                out.push(MeshViolation::new(
                    ViolationKind::DegenerateFace,
                    of.face,
                    format!("{n} vertices"),
                ));
            } else if face_area(&pts) <= options.min_measure {
                out.push(MeshViolation::new(
                    ViolationKind::DegenerateFace,
                    of.face,
                    "zero area",
                ));
            }
        }
        if options.check_self_intersection
            && matches!(face.kind, FaceKind::Apical | FaceKind::Basal)
        {
            if let Some(&(i, j)) = self_intersections_xy(&pts).first() {
                out.push(MeshViolation::new(
                    ViolationKind::SelfIntersection,
                    of.face,
                    format!("{:?} face edges {i} and {j} cross", face.kind),
                ));
            }
        }
        faces.push(pts);
    }
    let volume = polyhedron_volume(&faces);
    if options.check_degeneracy && volume.abs() <= options.min_measure {
        out.push(MeshViolation::new(
            ViolationKind::DegenerateElement,
            e,
            format!("volume {volume:e}"),
        ));
    } else if options.check_orientation && volume < 0.0 {
        out.push(MeshViolation::new(
            ViolationKind::InvertedElement,
            e,
            format!("signed volume {volume}"),
        ));
    }
    out
}

impl DebugInvariants for VertexMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "VertexMesh");
    }

    fn validate_invariants(&self) -> Result<(), TissueMeshError> {
        audit(self, AuditOptions::topology_only()).map_err(TissueMeshError::from)
    }
}
