//! `VertexMesh`: shared-vertex cell mesh and its geometry kernel.
//!
//! A tissue is a set of elements (one per cell) whose boundaries share
//! vertices with their neighbours. In 2D an element is a counter-clockwise
//! vertex cycle. In 3D it is a closed set of polygonal faces, each carried
//! with the orientation that makes its normal point out of the element;
//! monolayer cells additionally tag one apical face, one basal face, and a
//! ring of lateral faces, and pair every apical vertex with a basal partner.
//!
//! Entities are never removed from their tables while a simulation step is
//! running: deletion sets a tombstone and [`compact`](VertexMesh::compact)
//! renumbers at step boundaries.

use crate::geometry::metrics::{
    self, EPS, centroid_xy, face_area, polyhedron_centroid, polyhedron_volume, signed_area_xy,
};
use crate::mesh_error::TissueMeshError;
use crate::topology::entity::{Element, Face, FaceKind, OrientedFace, RegionTag, Vertex};
use crate::topology::ids::{CellHandle, ElementId, EntityKind, FaceId, VertexId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Spatial dimension of a mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshDimension {
    Two,
    Three,
}

impl MeshDimension {
    pub fn as_u8(self) -> u8 {
        match self {
            MeshDimension::Two => 2,
            MeshDimension::Three => 3,
        }
    }
}

/// One face of a polyhedral mesh description, see [`VertexMesh::from_polyhedra`].
#[derive(Clone, Debug, PartialEq)]
pub struct FaceSpec {
    pub vertices: Vec<usize>,
    pub kind: FaceKind,
}

impl FaceSpec {
    pub fn new(vertices: Vec<usize>, kind: FaceKind) -> Self {
        Self { vertices, kind }
    }
}

/// Vertex-based tissue mesh.
#[derive(Clone, Debug)]
pub struct VertexMesh {
    pub(crate) dimension: MeshDimension,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) faces: Vec<Face>,
    pub(crate) elements: Vec<Element>,
    pub(crate) next_cell: u64,
    pub(crate) generation: u32,
}

impl VertexMesh {
    /// Empty mesh of the given dimension.
    pub fn new(dimension: MeshDimension) -> Self {
        Self {
            dimension,
            vertices: Vec::new(),
            faces: Vec::new(),
            elements: Vec::new(),
            next_cell: 0,
            generation: 0,
        }
    }

    /// Build a 2D mesh from vertex positions and polygon index cycles.
    ///
    /// Clockwise cycles are reversed so every element is counter-clockwise.
    /// Element `i` is attached to `CellHandle(i)`. Positions not used by any
    /// element are tombstoned.
    pub fn from_polygons(
        positions: &[[f64; 2]],
        cycles: &[Vec<usize>],
    ) -> Result<Self, TissueMeshError> {
        let mut mesh = Self::new(MeshDimension::Two);
        for p in positions {
            mesh.add_vertex([p[0], p[1], 0.0]);
        }
        for (i, cycle) in cycles.iter().enumerate() {
            let ids = cycle
                .iter()
                .map(|&v| {
                    if v < positions.len() {
                        Ok(VertexId::from_index(v))
                    } else {
                        Err(TissueMeshError::DanglingVertex {
                            element: i,
                            vertex: v,
                        })
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            mesh.insert_polygon(i, ids, CellHandle(i as u64))?;
        }
        mesh.next_cell = cycles.len() as u64;
        mesh.collect_orphans();
        mesh.refresh_boundary_flags();
        log::debug!(
            "built 2D mesh: {} vertices, {} elements",
            mesh.num_vertices(),
            mesh.num_elements()
        );
        Ok(mesh)
    }

    /// Build a 3D mesh from vertex positions, faces, and per-element
    /// `(face index, reversed)` lists.
    ///
    /// Elements whose faces enclose a negative volume get every orientation
    /// flipped. Vertices on apical/basal faces receive the matching region
    /// tag and lateral quads link apical vertices to their basal partners.
    pub fn from_polyhedra(
        positions: &[[f64; 3]],
        faces: &[FaceSpec],
        elements: &[Vec<(usize, bool)>],
    ) -> Result<Self, TissueMeshError> {
        let mut mesh = Self::new(MeshDimension::Three);
        for p in positions {
            mesh.add_vertex(*p);
        }
        for (i, spec) in faces.iter().enumerate() {
            if let Some(&bad) = spec.vertices.iter().find(|&&v| v >= positions.len()) {
                return Err(TissueMeshError::DegenerateFace {
                    face: i,
                    reason: format!("missing vertex {bad}"),
                });
            }
            let ids: Vec<VertexId> = spec
                .vertices
                .iter()
                .map(|&v| VertexId::from_index(v))
                .collect();
            if distinct_count(&ids) < 3 || ids.len() != distinct_count(&ids) {
                return Err(TissueMeshError::DegenerateFace {
                    face: i,
                    reason: "fewer than three distinct vertices".into(),
                });
            }
            mesh.push_face(ids, spec.kind);
        }
        for (i, list) in elements.iter().enumerate() {
            let mut oriented = Vec::with_capacity(list.len());
            for &(f, reversed) in list {
                if f >= faces.len() {
                    return Err(TissueMeshError::DanglingFace {
                        element: i,
                        face: f,
                    });
                }
                oriented.push(OrientedFace::new(FaceId::from_index(f), reversed));
            }
            if oriented.len() < 4 {
                return Err(TissueMeshError::DegenerateElement {
                    element: i,
                    reason: "a closed polyhedron needs at least four faces".into(),
                });
            }
            let e = mesh.push_element(Vec::new(), oriented, CellHandle(i as u64));
            mesh.elements[e.index()].vertices = mesh.vertices_of_faces(e);
            let volume = mesh.polyhedral_volume(e);
            if volume.abs() < EPS {
                return Err(TissueMeshError::DegenerateElement {
                    element: i,
                    reason: "zero enclosed volume".into(),
                });
            }
            if volume < 0.0 {
                for of in &mut mesh.elements[e.index()].faces {
                    of.reversed = !of.reversed;
                }
            }
            mesh.attach_element(e);
        }
        mesh.next_cell = elements.len() as u64;
        mesh.tag_regions_from_faces();
        mesh.collect_orphans();
        mesh.refresh_boundary_flags();
        log::debug!(
            "built 3D mesh: {} vertices, {} faces, {} elements",
            mesh.num_vertices(),
            mesh.num_faces(),
            mesh.num_elements()
        );
        Ok(mesh)
    }

    /// Replace the cell handles of all live elements, in element order.
    pub fn with_cells(mut self, cells: Vec<CellHandle>) -> Result<Self, TissueMeshError> {
        let live: Vec<ElementId> = self.element_ids().collect();
        if live.len() != cells.len() {
            return Err(TissueMeshError::CellCountMismatch {
                elements: live.len(),
                cells: cells.len(),
            });
        }
        for (e, cell) in live.into_iter().zip(cells) {
            self.elements[e.index()].cell = cell;
        }
        self.next_cell = self
            .elements
            .iter()
            .map(|el| el.cell.0 + 1)
            .max()
            .unwrap_or(0);
        Ok(self)
    }

    // -----------------------------------------------------------------------
    // Table access
    // -----------------------------------------------------------------------

    pub fn dimension(&self) -> MeshDimension {
        self.dimension
    }

    /// Incremented by every compaction.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex, TissueMeshError> {
        let len = self.vertices.len();
        match self.vertices.get(id.index()) {
            None => Err(TissueMeshError::OutOfRange {
                kind: EntityKind::Vertex,
                index: id.index(),
                len,
            }),
            Some(v) if !v.live => Err(TissueMeshError::NotFound {
                kind: EntityKind::Vertex,
                index: id.index(),
            }),
            Some(v) => Ok(v),
        }
    }

    pub fn face(&self, id: FaceId) -> Result<&Face, TissueMeshError> {
        let len = self.faces.len();
        match self.faces.get(id.index()) {
            None => Err(TissueMeshError::OutOfRange {
                kind: EntityKind::Face,
                index: id.index(),
                len,
            }),
            Some(f) if !f.live => Err(TissueMeshError::NotFound {
                kind: EntityKind::Face,
                index: id.index(),
            }),
            Some(f) => Ok(f),
        }
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, TissueMeshError> {
        let len = self.elements.len();
        match self.elements.get(id.index()) {
            None => Err(TissueMeshError::OutOfRange {
                kind: EntityKind::Element,
                index: id.index(),
                len,
            }),
            Some(e) if !e.live => Err(TissueMeshError::NotFound {
                kind: EntityKind::Element,
                index: id.index(),
            }),
            Some(e) => Ok(e),
        }
    }

    /// Length of the vertex table, tombstones included.
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_capacity(&self) -> usize {
        self.faces.len()
    }

    pub fn element_capacity(&self) -> usize {
        self.elements.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.iter().filter(|v| v.live).count()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.iter().filter(|f| f.live).count()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.iter().filter(|e| e.live).count()
    }

    /// Live vertex handles, ascending.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.live)
            .map(|(i, _)| VertexId::from_index(i))
    }

    /// Live face handles, ascending.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.live)
            .map(|(i, _)| FaceId::from_index(i))
    }

    /// Live element handles, ascending.
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.live)
            .map(|(i, _)| ElementId::from_index(i))
    }

    /// Whether any table holds a tombstone.
    pub fn has_tombstones(&self) -> bool {
        self.vertices.iter().any(|v| !v.live)
            || self.faces.iter().any(|f| !f.live)
            || self.elements.iter().any(|e| !e.live)
    }

    pub fn position(&self, v: VertexId) -> Result<[f64; 3], TissueMeshError> {
        Ok(self.vertex(v)?.position)
    }

    pub fn set_position(&mut self, v: VertexId, position: [f64; 3]) -> Result<(), TissueMeshError> {
        self.vertex(v)?;
        self.vertices[v.index()].position = position;
        Ok(())
    }

    pub fn cell_of(&self, e: ElementId) -> Result<CellHandle, TissueMeshError> {
        Ok(self.element(e)?.cell)
    }

    /// Live element attached to `cell`, if any.
    pub fn element_of_cell(&self, cell: CellHandle) -> Option<ElementId> {
        self.element_ids()
            .find(|&e| self.elements[e.index()].cell == cell)
    }

    pub fn set_label(&mut self, e: ElementId, label: i32) -> Result<(), TissueMeshError> {
        self.element(e)?;
        self.elements[e.index()].label = label;
        Ok(())
    }

    /// Tag a vertex as apical or basal.
    pub fn set_region(&mut self, v: VertexId, region: RegionTag) -> Result<(), TissueMeshError> {
        self.vertex(v)?;
        self.vertices[v.index()].region = region;
        Ok(())
    }

    /// Pair an apical vertex with its basal counterpart (both directions).
    pub fn link_partners(
        &mut self,
        apical: VertexId,
        basal: VertexId,
    ) -> Result<(), TissueMeshError> {
        self.vertex(apical)?;
        self.vertex(basal)?;
        let a = &mut self.vertices[apical.index()];
        a.partner = Some(basal);
        a.region = RegionTag::Apical;
        let b = &mut self.vertices[basal.index()];
        b.partner = Some(apical);
        b.region = RegionTag::Basal;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Incremental construction
    // -----------------------------------------------------------------------

    /// Append a free vertex. It stays live only once an element uses it.
    pub fn add_vertex(&mut self, position: [f64; 3]) -> VertexId {
        let id = VertexId::from_index(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    /// Append a 2D element with a fresh cell handle.
    pub fn add_element(&mut self, cycle: &[VertexId]) -> Result<ElementId, TissueMeshError> {
        self.expect_dimension(MeshDimension::Two)?;
        for &v in cycle {
            self.vertex(v)?;
        }
        let cell = CellHandle(self.next_cell);
        let e = self.insert_polygon(self.elements.len(), cycle.to_vec(), cell)?;
        self.next_cell += 1;
        self.refresh_boundary_flags();
        Ok(e)
    }

    /// Append a monolayer element given its apical cycle. Every apical
    /// vertex must already be linked to a basal partner.
    pub fn add_monolayer_element(
        &mut self,
        apical_cycle: &[VertexId],
    ) -> Result<ElementId, TissueMeshError> {
        self.expect_dimension(MeshDimension::Three)?;
        let index = self.elements.len();
        let mut cycle = apical_cycle.to_vec();
        if cycle.len() < 3 || distinct_count(&cycle) != cycle.len() {
            return Err(TissueMeshError::DegenerateElement {
                element: index,
                reason: "apical cycle needs at least three distinct vertices".into(),
            });
        }
        let pts = self.positions_of(&cycle)?;
        let area = signed_area_xy(&pts);
        if area.abs() < EPS {
            return Err(TissueMeshError::DegenerateElement {
                element: index,
                reason: "zero apical area".into(),
            });
        }
        if area < 0.0 {
            cycle.reverse();
        }
        let cell = CellHandle(self.next_cell);
        let e = self.push_element(Vec::new(), Vec::new(), cell);
        if let Err(err) = self.rebuild_monolayer_element(e, &cycle) {
            self.elements[e.index()].live = false;
            return Err(err);
        }
        self.next_cell += 1;
        Ok(e)
    }

    fn insert_polygon(
        &mut self,
        index: usize,
        mut cycle: Vec<VertexId>,
        cell: CellHandle,
    ) -> Result<ElementId, TissueMeshError> {
        let n = cycle.len();
        if n < 3 || distinct_count(&cycle) != n {
            return Err(TissueMeshError::DegenerateElement {
                element: index,
                reason: "cycle needs at least three distinct vertices".into(),
            });
        }
        let pts = self.positions_of(&cycle).map_err(|_| TissueMeshError::DegenerateElement {
            element: index,
            reason: "cycle references a deleted vertex".into(),
        })?;
        let area = signed_area_xy(&pts);
        if area.abs() < EPS {
            return Err(TissueMeshError::DegenerateElement {
                element: index,
                reason: "zero area".into(),
            });
        }
        if area < 0.0 {
            cycle.reverse();
        }
        let e = self.push_element(cycle, Vec::new(), cell);
        self.attach_element(e);
        Ok(e)
    }

    pub(crate) fn push_element(
        &mut self,
        vertices: Vec<VertexId>,
        faces: Vec<OrientedFace>,
        cell: CellHandle,
    ) -> ElementId {
        let id = ElementId::from_index(self.elements.len());
        self.elements.push(Element::new(vertices, faces, cell));
        id
    }

    pub(crate) fn push_face(&mut self, vertices: Vec<VertexId>, kind: FaceKind) -> FaceId {
        let id = FaceId::from_index(self.faces.len());
        self.faces.push(Face::new(vertices, kind));
        id
    }

    pub(crate) fn expect_dimension(&self, expected: MeshDimension) -> Result<(), TissueMeshError> {
        if self.dimension == expected {
            Ok(())
        } else {
            Err(TissueMeshError::DimensionMismatch {
                expected: expected.as_u8(),
                found: self.dimension.as_u8(),
            })
        }
    }

    fn vertices_of_faces(&self, e: ElementId) -> Vec<VertexId> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for of in &self.elements[e.index()].faces {
            for &v in &self.faces[of.face.index()].vertices {
                if seen.insert(v) {
                    out.push(v);
                }
            }
        }
        out
    }

    fn tag_regions_from_faces(&mut self) {
        for f in 0..self.faces.len() {
            let region = match self.faces[f].kind {
                FaceKind::Apical => RegionTag::Apical,
                FaceKind::Basal => RegionTag::Basal,
                _ => continue,
            };
            for i in 0..self.faces[f].vertices.len() {
                let v = self.faces[f].vertices[i];
                self.vertices[v.index()].region = region;
            }
        }
        for f in 0..self.faces.len() {
            if self.faces[f].kind != FaceKind::Lateral {
                continue;
            }
            let verts = self.faces[f].vertices.clone();
            let n = verts.len();
            for i in 0..n {
                let (a, b) = (verts[i], verts[(i + 1) % n]);
                let (ra, rb) = (self.vertices[a.index()].region, self.vertices[b.index()].region);
                let pair = match (ra, rb) {
                    (RegionTag::Apical, RegionTag::Basal) => Some((a, b)),
                    (RegionTag::Basal, RegionTag::Apical) => Some((b, a)),
                    _ => None,
                };
                if let Some((apical, basal)) = pair {
                    self.vertices[apical.index()].partner = Some(basal);
                    self.vertices[basal.index()].partner = Some(apical);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Topology queries
    // -----------------------------------------------------------------------

    /// Whether every live element is a tagged monolayer prism.
    pub fn is_monolayer(&self) -> bool {
        self.dimension == MeshDimension::Three
            && self.element_ids().all(|e| {
                let faces = &self.elements[e.index()].faces;
                let count = |kind| {
                    faces
                        .iter()
                        .filter(|of| self.faces[of.face.index()].kind == kind)
                        .count()
                };
                count(FaceKind::Apical) == 1 && count(FaceKind::Basal) == 1
            })
    }

    /// Number of vertex layers a planar rewrite acts on: one in 2D, apical
    /// and basal in a monolayer.
    pub(crate) fn layer_count(&self) -> usize {
        match self.dimension {
            MeshDimension::Two => 1,
            MeshDimension::Three => 2,
        }
    }

    /// `v` itself for layer 0, its basal partner for layer 1.
    pub(crate) fn on_layer(&self, v: VertexId, layer: usize) -> Result<VertexId, TissueMeshError> {
        if layer == 0 {
            return Ok(v);
        }
        self.vertex(v)?
            .partner
            .ok_or(TissueMeshError::UnsupportedOperation(
                "apical vertex has no basal partner",
            ))
    }

    /// The planar boundary cycle of an element: the polygon in 2D, the
    /// outward-oriented apical face of a monolayer cell.
    pub fn element_cycle(&self, e: ElementId) -> Result<Vec<VertexId>, TissueMeshError> {
        let el = self.element(e)?;
        match self.dimension {
            MeshDimension::Two => Ok(el.vertices.clone()),
            MeshDimension::Three => el
                .faces
                .iter()
                .find(|of| self.faces[of.face.index()].kind == FaceKind::Apical)
                .map(|of| self.faces[of.face.index()].oriented_vertices(of.reversed))
                .ok_or(TissueMeshError::UnsupportedOperation(
                    "planar cycle requires a 2D mesh or a monolayer element",
                )),
        }
    }

    /// Positions of the vertex list, in order.
    pub fn positions_of(&self, ids: &[VertexId]) -> Result<Vec<[f64; 3]>, TissueMeshError> {
        ids.iter().map(|&v| self.position(v)).collect()
    }

    /// Positions of a cycle lifted onto `layer`.
    pub(crate) fn layer_positions(
        &self,
        cycle: &[VertexId],
        layer: usize,
    ) -> Result<Vec<[f64; 3]>, TissueMeshError> {
        cycle
            .iter()
            .map(|&v| self.position(self.on_layer(v, layer)?))
            .collect()
    }

    /// Outward-oriented coordinates of every face of a 3D element.
    pub fn element_face_positions(
        &self,
        e: ElementId,
    ) -> Result<Vec<Vec<[f64; 3]>>, TissueMeshError> {
        let el = self.element(e)?;
        el.faces
            .iter()
            .map(|of| {
                let face = self.face(of.face)?;
                self.positions_of(&face.oriented_vertices(of.reversed))
            })
            .collect()
    }

    /// Elements sharing at least one vertex with `e`.
    pub fn neighbors_of(&self, e: ElementId) -> Result<BTreeSet<ElementId>, TissueMeshError> {
        let el = self.element(e)?;
        let mut out = BTreeSet::new();
        for &v in &el.vertices {
            out.extend(self.vertices[v.index()].elements.iter().copied());
        }
        out.remove(&e);
        Ok(out)
    }

    /// Live elements whose planar cycle visits `a` and `b` consecutively.
    pub fn elements_with_edge(&self, a: VertexId, b: VertexId) -> Vec<ElementId> {
        let (Some(va), Some(vb)) = (self.vertices.get(a.index()), self.vertices.get(b.index()))
        else {
            return Vec::new();
        };
        va.elements
            .iter()
            .filter(|&&e| vb.elements.binary_search(&e).is_ok())
            .filter(|&&e| {
                self.element_cycle(e)
                    .map(|cycle| cycle_has_edge(&cycle, a, b))
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    /// Live vertices flagged as boundary.
    pub fn boundary_vertices(&self) -> Vec<VertexId> {
        self.vertex_ids()
            .filter(|v| self.vertices[v.index()].boundary)
            .collect()
    }

    /// Recompute every boundary flag from the current topology.
    ///
    /// 2D: a vertex is boundary when it lies on an edge owned by exactly one
    /// element. 3D: when it lies on a non-apical, non-basal face bounded by
    /// exactly one element.
    pub fn refresh_boundary_flags(&mut self) {
        for v in &mut self.vertices {
            v.boundary = false;
        }
        match self.dimension {
            MeshDimension::Two => {
                let mut counts: HashMap<(VertexId, VertexId), usize> = HashMap::new();
                for el in self.elements.iter().filter(|el| el.live) {
                    let n = el.vertices.len();
                    for i in 0..n {
                        let (a, b) = (el.vertices[i], el.vertices[(i + 1) % n]);
                        *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                    }
                }
                for ((a, b), count) in counts {
                    if count == 1 {
                        self.vertices[a.index()].boundary = true;
                        self.vertices[b.index()].boundary = true;
                    }
                }
            }
            MeshDimension::Three => {
                for f in 0..self.faces.len() {
                    let face = &self.faces[f];
                    if !face.live
                        || face.elements.len() != 1
                        || matches!(face.kind, FaceKind::Apical | FaceKind::Basal)
                    {
                        continue;
                    }
                    for i in 0..face.vertices.len() {
                        let v = self.faces[f].vertices[i];
                        self.vertices[v.index()].boundary = true;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Signed area of a 2D element (positive when valid); total surface
    /// area of a 3D element.
    pub fn area(&self, e: ElementId) -> Result<f64, TissueMeshError> {
        match self.dimension {
            MeshDimension::Two => {
                let pts = self.positions_of(&self.element(e)?.vertices)?;
                Ok(signed_area_xy(&pts))
            }
            MeshDimension::Three => Ok(self
                .element_face_positions(e)?
                .iter()
                .map(|f| face_area(f))
                .sum()),
        }
    }

    /// Enclosed volume of a 3D element; positive when faces point outward.
    pub fn volume(&self, e: ElementId) -> Result<f64, TissueMeshError> {
        self.expect_dimension(MeshDimension::Three)?;
        Ok(polyhedron_volume(&self.element_face_positions(e)?))
    }

    fn polyhedral_volume(&self, e: ElementId) -> f64 {
        let faces: Vec<Vec<[f64; 3]>> = self.elements[e.index()]
            .faces
            .iter()
            .map(|of| {
                self.faces[of.face.index()]
                    .oriented_vertices(of.reversed)
                    .iter()
                    .map(|v| self.vertices[v.index()].position)
                    .collect()
            })
            .collect();
        polyhedron_volume(&faces)
    }

    /// Perimeter of the planar cycle (apical for monolayer cells).
    pub fn perimeter(&self, e: ElementId) -> Result<f64, TissueMeshError> {
        let cycle = self.element_cycle(e)?;
        Ok(metrics::perimeter(&self.positions_of(&cycle)?))
    }

    /// Area-weighted centroid in 2D, volume-weighted centroid in 3D.
    pub fn centroid(&self, e: ElementId) -> Result<[f64; 3], TissueMeshError> {
        match self.dimension {
            MeshDimension::Two => {
                let pts = self.positions_of(&self.element(e)?.vertices)?;
                Ok(centroid_xy(&pts))
            }
            MeshDimension::Three => Ok(polyhedron_centroid(&self.element_face_positions(e)?)),
        }
    }

    pub fn face_area(&self, f: FaceId) -> Result<f64, TissueMeshError> {
        Ok(face_area(&self.positions_of(&self.face(f)?.vertices)?))
    }

    pub fn edge_length(&self, a: VertexId, b: VertexId) -> Result<f64, TissueMeshError> {
        Ok(metrics::distance(self.position(a)?, self.position(b)?))
    }
}

/// Number of distinct entries.
pub(crate) fn distinct_count(ids: &[VertexId]) -> usize {
    ids.iter().collect::<BTreeSet<_>>().len()
}

/// Whether `a` and `b` are consecutive (either order) in a closed cycle.
pub(crate) fn cycle_has_edge(cycle: &[VertexId], a: VertexId, b: VertexId) -> bool {
    let n = cycle.len();
    (0..n).any(|i| {
        let (x, y) = (cycle[i], cycle[(i + 1) % n]);
        (x == a && y == b) || (x == b && y == a)
    })
}

/// Index of `v` in `cycle`.
pub(crate) fn position_in(cycle: &[VertexId], v: VertexId) -> Option<usize> {
    cycle.iter().position(|&x| x == v)
}

/// Successor of `v` in a closed cycle.
pub(crate) fn next_in(cycle: &[VertexId], v: VertexId) -> Option<VertexId> {
    position_in(cycle, v).map(|i| cycle[(i + 1) % cycle.len()])
}
