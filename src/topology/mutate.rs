//! Mutation layer of [`VertexMesh`]: membership bookkeeping, monolayer face
//! rebuilds, element death and division, tombstones, and compaction.
//!
//! Planar rewrites (remodeling, division) are expressed on element cycles.
//! In 2D the cycle is the element. In a monolayer the cycle is the apical
//! face and [`VertexMesh::rebuild_monolayer_element`] regenerates the basal
//! face and the lateral ring from it, reusing any lateral face another
//! element already has for the same apical edge.

use crate::geometry::metrics::{EPS, centroid_xy, lerp, short_axis_xy, sub};
use crate::mesh_error::TissueMeshError;
use crate::topology::entity::{
    Element, Face, FaceKind, OrientedFace, RegionTag, Vertex, insert_sorted, remove_sorted,
};
use crate::topology::ids::{CellHandle, ElementId, EntityRef, FaceId, VertexId};
use crate::topology::mesh::{MeshDimension, VertexMesh, position_in};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fraction of an edge kept clear of its endpoints when a division line
/// passes through or next to a vertex.
const SPLIT_MARGIN: f64 = 0.05;

/// Old-to-new handle translation produced by [`VertexMesh::compact`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompactionMap {
    pub vertices: Vec<Option<VertexId>>,
    pub faces: Vec<Option<FaceId>>,
    pub elements: Vec<Option<ElementId>>,
    /// Mesh generation after compaction.
    pub generation: u32,
}

impl CompactionMap {
    pub fn vertex(&self, old: VertexId) -> Option<VertexId> {
        self.vertices.get(old.index()).copied().flatten()
    }

    pub fn face(&self, old: FaceId) -> Option<FaceId> {
        self.faces.get(old.index()).copied().flatten()
    }

    pub fn element(&self, old: ElementId) -> Option<ElementId> {
        self.elements.get(old.index()).copied().flatten()
    }

    /// No handle moved and nothing was dropped.
    pub fn is_identity(&self) -> bool {
        fn same<T: Copy>(map: &[Option<T>], make: fn(usize) -> T) -> bool
        where
            T: PartialEq,
        {
            map.iter()
                .enumerate()
                .all(|(i, slot)| *slot == Some(make(i)))
        }
        same(&self.vertices, VertexId::from_index)
            && same(&self.faces, FaceId::from_index)
            && same(&self.elements, ElementId::from_index)
    }
}

fn dense_map<T>(live: impl Iterator<Item = bool>, make: fn(usize) -> T) -> Vec<Option<T>> {
    let mut next = 0usize;
    live.map(|alive| {
        if alive {
            next += 1;
            Some(make(next - 1))
        } else {
            None
        }
    })
    .collect()
}

impl VertexMesh {
    // -----------------------------------------------------------------------
    // Reverse-adjacency bookkeeping
    // -----------------------------------------------------------------------

    pub(crate) fn attach_element(&mut self, e: ElementId) {
        let VertexMesh {
            vertices,
            faces,
            elements,
            ..
        } = self;
        let el = &elements[e.index()];
        for v in &el.vertices {
            insert_sorted(&mut vertices[v.index()].elements, e);
        }
        for of in &el.faces {
            insert_sorted(&mut faces[of.face.index()].elements, e);
        }
    }

    pub(crate) fn detach_element(&mut self, e: ElementId) {
        let VertexMesh {
            vertices,
            faces,
            elements,
            ..
        } = self;
        let el = &elements[e.index()];
        for v in &el.vertices {
            remove_sorted(&mut vertices[v.index()].elements, e);
        }
        for of in &el.faces {
            remove_sorted(&mut faces[of.face.index()].elements, e);
        }
    }

    /// Replace the planar cycle of an element, keeping every reverse list
    /// in step. Callers are responsible for orientation.
    pub(crate) fn set_cycle(
        &mut self,
        e: ElementId,
        cycle: Vec<VertexId>,
    ) -> Result<(), TissueMeshError> {
        match self.dimension {
            MeshDimension::Two => {
                self.detach_element(e);
                self.elements[e.index()].vertices = cycle;
                self.attach_element(e);
                Ok(())
            }
            MeshDimension::Three => self.rebuild_monolayer_element(e, &cycle),
        }
    }

    /// Regenerate the faces of a monolayer element from its apical cycle.
    pub(crate) fn rebuild_monolayer_element(
        &mut self,
        e: ElementId,
        apical: &[VertexId],
    ) -> Result<(), TissueMeshError> {
        let basal = apical
            .iter()
            .map(|&v| self.on_layer(v, 1))
            .collect::<Result<Vec<_>, _>>()?;

        let mut apical_face = None;
        let mut basal_face = None;
        for of in &self.elements[e.index()].faces {
            match self.faces[of.face.index()].kind {
                FaceKind::Apical => apical_face = Some(of.face),
                FaceKind::Basal => basal_face = Some(of.face),
                _ => {}
            }
        }
        let apical_face = match apical_face {
            Some(f) => {
                self.faces[f.index()].vertices = apical.to_vec();
                f
            }
            None => self.push_face(apical.to_vec(), FaceKind::Apical),
        };
        // stored in the apical winding, seen reversed from this element
        let basal_face = match basal_face {
            Some(f) => {
                self.faces[f.index()].vertices = basal.clone();
                f
            }
            None => self.push_face(basal.clone(), FaceKind::Basal),
        };

        let n = apical.len();
        let mut faces = Vec::with_capacity(n + 2);
        faces.push(OrientedFace::new(apical_face, false));
        faces.push(OrientedFace::new(basal_face, true));
        for i in 0..n {
            let j = (i + 1) % n;
            let outward = [basal[i], basal[j], apical[j], apical[i]];
            let lateral = match self.find_lateral_face(e, &outward)? {
                Some(found) => found,
                None => OrientedFace::new(
                    self.push_face(outward.to_vec(), FaceKind::Lateral),
                    false,
                ),
            };
            faces.push(lateral);
        }

        self.detach_element(e);
        let el = &mut self.elements[e.index()];
        el.faces = faces;
        el.vertices = apical.iter().chain(basal.iter()).copied().collect();
        self.attach_element(e);
        Ok(())
    }

    /// Existing lateral quad over the same four vertices, oriented to match
    /// `outward`.
    fn find_lateral_face(
        &self,
        e: ElementId,
        outward: &[VertexId; 4],
    ) -> Result<Option<OrientedFace>, TissueMeshError> {
        let mut key = *outward;
        key.sort();
        let mut owners = BTreeSet::new();
        owners.insert(e);
        for v in [outward[2], outward[3]] {
            owners.extend(self.vertices[v.index()].elements.iter().copied());
        }
        for x in owners {
            for of in &self.elements[x.index()].faces {
                let face = &self.faces[of.face.index()];
                if !face.live || face.kind != FaceKind::Lateral || face.vertices.len() != 4 {
                    continue;
                }
                let mut stored = [
                    face.vertices[0],
                    face.vertices[1],
                    face.vertices[2],
                    face.vertices[3],
                ];
                stored.sort();
                if stored != key {
                    continue;
                }
                if is_rotation(&face.vertices, outward) {
                    return Ok(Some(OrientedFace::new(of.face, false)));
                }
                let reversed: Vec<VertexId> = outward.iter().rev().copied().collect();
                if is_rotation(&face.vertices, &reversed) {
                    return Ok(Some(OrientedFace::new(of.face, true)));
                }
                return Err(TissueMeshError::NotLateral(of.face));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Vertices
    // -----------------------------------------------------------------------

    /// Create a vertex at `positions[0]` and, in a monolayer, its basal
    /// partner at `positions[1]`. Returns the apical (or only) vertex.
    pub(crate) fn spawn_vertex(&mut self, positions: &[[f64; 3]]) -> VertexId {
        let top = self.add_vertex(positions[0]);
        if self.layer_count() == 2 {
            let bottom = self.add_vertex(positions.get(1).copied().unwrap_or(positions[0]));
            let a = &mut self.vertices[top.index()];
            a.partner = Some(bottom);
            a.region = RegionTag::Apical;
            let b = &mut self.vertices[bottom.index()];
            b.partner = Some(top);
            b.region = RegionTag::Basal;
        }
        top
    }

    /// Per-layer positions of `v`.
    pub(crate) fn layer_stack(&self, v: VertexId) -> Result<Vec<[f64; 3]>, TissueMeshError> {
        (0..self.layer_count())
            .map(|layer| self.position(self.on_layer(v, layer)?))
            .collect()
    }

    /// Move `v` (and its partner) to per-layer positions.
    pub(crate) fn place_stack(
        &mut self,
        v: VertexId,
        positions: &[[f64; 3]],
    ) -> Result<(), TissueMeshError> {
        for (layer, p) in positions.iter().enumerate() {
            let target = self.on_layer(v, layer)?;
            self.vertices[target.index()].position = *p;
        }
        Ok(())
    }

    /// Tombstone entities no live element refers to. Returns how many.
    pub(crate) fn collect_orphans(&mut self) -> usize {
        let mut removed = 0;
        for f in self.faces.iter_mut().filter(|f| f.live && f.elements.is_empty()) {
            f.live = false;
            removed += 1;
        }
        for v in self
            .vertices
            .iter_mut()
            .filter(|v| v.live && v.elements.is_empty())
        {
            v.live = false;
            removed += 1;
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Public mutation API
    // -----------------------------------------------------------------------

    /// Tombstone a single entity.
    ///
    /// Vertices and faces must no longer be referenced by a live element.
    /// An element is detached from its vertices and faces, which stay live.
    pub fn mark_deleted(&mut self, entity: EntityRef) -> Result<(), TissueMeshError> {
        match entity {
            EntityRef::Vertex(v) => {
                if let Some(&by) = self.vertex(v)?.elements.first() {
                    return Err(TissueMeshError::EntityInUse {
                        entity,
                        by: by.into(),
                    });
                }
                self.vertices[v.index()].live = false;
            }
            EntityRef::Face(f) => {
                if let Some(&by) = self.face(f)?.elements.first() {
                    return Err(TissueMeshError::EntityInUse {
                        entity,
                        by: by.into(),
                    });
                }
                self.faces[f.index()].live = false;
            }
            EntityRef::Element(e) => {
                self.element(e)?;
                self.detach_element(e);
                self.elements[e.index()].live = false;
            }
        }
        Ok(())
    }

    /// Remove an element (cell death), leaving a hole. Vertices and faces
    /// only it used are tombstoned as well.
    pub fn remove_element(&mut self, e: ElementId) -> Result<(), TissueMeshError> {
        self.element(e)?;
        self.detach_element(e);
        self.elements[e.index()].live = false;
        let orphans = self.collect_orphans();
        self.refresh_boundary_flags();
        log::debug!("removed element {e}; {orphans} orphaned entities tombstoned");
        Ok(())
    }

    /// Insert a new vertex on edge `a`–`b` at fraction `t` from `a`, into
    /// every element that has that edge.
    pub(crate) fn split_edge(
        &mut self,
        a: VertexId,
        b: VertexId,
        t: f64,
    ) -> Result<VertexId, TissueMeshError> {
        let owners = self.elements_with_edge(a, b);
        if owners.is_empty() {
            return Err(TissueMeshError::NotAnEdge(a, b));
        }
        let (sa, sb) = (self.layer_stack(a)?, self.layer_stack(b)?);
        let positions: Vec<[f64; 3]> = sa
            .iter()
            .zip(&sb)
            .map(|(&pa, &pb)| lerp(pa, pb, t))
            .collect();
        let v = self.spawn_vertex(&positions);
        for x in owners {
            let mut cycle = self.element_cycle(x)?;
            let n = cycle.len();
            let slot = (0..n).find(|&k| {
                let (p, q) = (cycle[k], cycle[(k + 1) % n]);
                (p == a && q == b) || (p == b && q == a)
            });
            if let Some(k) = slot {
                cycle.insert(k + 1, v);
                self.set_cycle(x, cycle)?;
            }
        }
        Ok(v)
    }

    /// Split an element in two along a line through its centroid.
    ///
    /// `axis` is the in-plane direction of the division line; `None` uses
    /// the element's short principal axis. The parent keeps the half on the
    /// negative side of the line normal and its handle; the child gets a
    /// fresh cell handle and inherits the label. Neighbours sharing a cut
    /// edge receive the new vertex too.
    pub fn divide_element(
        &mut self,
        e: ElementId,
        axis: Option<[f64; 3]>,
    ) -> Result<ElementId, TissueMeshError> {
        let cycle = self.element_cycle(e)?;
        let pts = self.positions_of(&cycle)?;
        let centre = centroid_xy(&pts);
        let axis = match axis {
            Some(a) => {
                let len = (a[0] * a[0] + a[1] * a[1]).sqrt();
                if !len.is_finite() || len < EPS {
                    return Err(TissueMeshError::DivisionFailed {
                        element: e,
                        reason: "division axis has no in-plane component".into(),
                    });
                }
                [a[0] / len, a[1] / len, 0.0]
            }
            None => short_axis_xy(&pts),
        };
        let normal = [-axis[1], axis[0]];
        let offset = |p: [f64; 3]| {
            let d = sub(p, centre);
            d[0] * normal[0] + d[1] * normal[1]
        };

        let n = cycle.len();
        let side: Vec<f64> = pts.iter().map(|&p| offset(p)).collect();
        // (edge start, fraction along edge, signed distance along the axis)
        let mut crossings: Vec<(usize, f64, f64)> = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            if (side[i] < 0.0) != (side[j] < 0.0) {
                let t = (side[i] / (side[i] - side[j])).clamp(SPLIT_MARGIN, 1.0 - SPLIT_MARGIN);
                let d = sub(lerp(pts[i], pts[j], t), centre);
                crossings.push((i, t, d[0] * axis[0] + d[1] * axis[1]));
            }
        }
        let ahead = crossings
            .iter()
            .filter(|c| c.2 >= 0.0)
            .min_by(|x, y| x.2.total_cmp(&y.2))
            .copied();
        let behind = crossings
            .iter()
            .filter(|c| c.2 < 0.0)
            .max_by(|x, y| x.2.total_cmp(&y.2))
            .copied();
        let (Some(ahead), Some(behind)) = (ahead, behind) else {
            return Err(TissueMeshError::DivisionFailed {
                element: e,
                reason: "division line does not cross the boundary twice".into(),
            });
        };
        let (first, second) = if ahead.0 < behind.0 {
            (ahead, behind)
        } else {
            (behind, ahead)
        };

        let u = self.split_edge(cycle[first.0], cycle[(first.0 + 1) % n], first.1)?;
        let w = self.split_edge(cycle[second.0], cycle[(second.0 + 1) % n], second.1)?;

        let cycle = self.element_cycle(e)?;
        let m = cycle.len();
        let (Some(iu), Some(iw)) = (position_in(&cycle, u), position_in(&cycle, w)) else {
            return Err(TissueMeshError::DivisionFailed {
                element: e,
                reason: "cut vertices missing from the element".into(),
            });
        };
        let walk = |from: usize, to: usize| {
            let mut out = Vec::new();
            let mut k = from;
            loop {
                out.push(cycle[k]);
                if k == to {
                    break;
                }
                k = (k + 1) % m;
            }
            out
        };
        let first_half = walk(iu, iw);
        let second_half = walk(iw, iu);
        let probe = self.position(first_half[1])?;
        let (keep, give) = if offset(probe) < 0.0 {
            (first_half, second_half)
        } else {
            (second_half, first_half)
        };

        let label = self.elements[e.index()].label;
        self.set_cycle(e, keep)?;
        let cell = CellHandle(self.next_cell);
        self.next_cell += 1;
        let child = match self.dimension {
            MeshDimension::Two => {
                let c = self.push_element(give, Vec::new(), cell);
                self.attach_element(c);
                c
            }
            MeshDimension::Three => {
                let c = self.push_element(Vec::new(), Vec::new(), cell);
                self.rebuild_monolayer_element(c, &give)?;
                c
            }
        };
        self.elements[child.index()].label = label;
        self.collect_orphans();
        self.refresh_boundary_flags();
        log::debug!("divided element {e} into {e} and {child}");
        Ok(child)
    }

    /// Drop every tombstone and renumber the survivors densely, preserving
    /// relative order.
    pub fn compact(&mut self) -> CompactionMap {
        let vmap = dense_map(self.vertices.iter().map(|v| v.live), VertexId::from_index);
        let fmap = dense_map(self.faces.iter().map(|f| f.live), FaceId::from_index);
        let emap = dense_map(self.elements.iter().map(|e| e.live), ElementId::from_index);

        let vertices: Vec<Vertex> = self
            .vertices
            .iter()
            .filter(|v| v.live)
            .map(|v| Vertex {
                position: v.position,
                boundary: v.boundary,
                region: v.region,
                partner: v.partner.and_then(|p| vmap[p.index()]),
                live: true,
                elements: v.elements.iter().filter_map(|e| emap[e.index()]).collect(),
            })
            .collect();
        let faces: Vec<Face> = self
            .faces
            .iter()
            .filter(|f| f.live)
            .map(|f| Face {
                vertices: f.vertices.iter().filter_map(|v| vmap[v.index()]).collect(),
                kind: f.kind,
                live: true,
                elements: f.elements.iter().filter_map(|e| emap[e.index()]).collect(),
            })
            .collect();
        let elements: Vec<Element> = self
            .elements
            .iter()
            .filter(|e| e.live)
            .map(|e| Element {
                vertices: e.vertices.iter().filter_map(|v| vmap[v.index()]).collect(),
                faces: e
                    .faces
                    .iter()
                    .filter_map(|of| fmap[of.face.index()].map(|f| OrientedFace::new(f, of.reversed)))
                    .collect(),
                cell: e.cell,
                label: e.label,
                live: true,
            })
            .collect();

        let dropped = (self.vertices.len() - vertices.len())
            + (self.faces.len() - faces.len())
            + (self.elements.len() - elements.len());
        self.vertices = vertices;
        self.faces = faces;
        self.elements = elements;
        self.generation += 1;
        log::debug!(
            "compacted mesh to generation {}: {dropped} tombstones dropped",
            self.generation
        );
        CompactionMap {
            vertices: vmap,
            faces: fmap,
            elements: emap,
            generation: self.generation,
        }
    }
}

/// Whether `a` is a cyclic rotation of `b`.
pub(crate) fn is_rotation(a: &[VertexId], b: &[VertexId]) -> bool {
    let n = a.len();
    if n != b.len() {
        return false;
    }
    if n == 0 {
        return true;
    }
    (0..n).any(|shift| (0..n).all(|k| a[(k + shift) % n] == b[k]))
}
