//! T3 boundary operations.
//!
//! Two rewrites keep the free boundary of the tissue well formed:
//!
//! * **merge**: an exterior edge shorter than the merge threshold collapses
//!   to its midpoint, the higher-numbered endpoint being replaced by the
//!   lower one everywhere;
//! * **absorption**: a boundary vertex that has moved inside another
//!   element is pulled back onto the nearest exterior edge of that element
//!   and inserted into its cycle, so the two elements share the vertex
//!   instead of overlapping.

use super::{Admissibility, RemodelConfig};
use crate::geometry::metrics::{
    closest_point_on_segment, distance, lerp, midpoint, point_in_polygon_xy,
};
use crate::mesh_error::TissueMeshError;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::entity::RegionTag;
use crate::topology::mesh::{VertexMesh, distinct_count, position_in};
use hashbrown::HashMap;
use itertools::Itertools;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MergePlan {
    pub keep: VertexId,
    pub drop: VertexId,
    pub owner: ElementId,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AbsorptionPlan {
    pub vertex: VertexId,
    pub element: ElementId,
    pub edge: (VertexId, VertexId),
    pub t: f64,
}

/// Edges of `e`'s cycle that no other element shares.
fn exterior_edges(
    mesh: &VertexMesh,
    e: ElementId,
) -> Result<Vec<(VertexId, VertexId)>, TissueMeshError> {
    let cycle = mesh.element_cycle(e)?;
    Ok(cycle
        .into_iter()
        .circular_tuple_windows()
        .filter(|&(a, b)| mesh.elements_with_edge(a, b).len() == 1)
        .collect())
}

pub(crate) fn plan_merge(
    mesh: &VertexMesh,
    p: VertexId,
    q: VertexId,
) -> Result<Admissibility<MergePlan>, TissueMeshError> {
    if mesh.vertex(p).is_err() || mesh.vertex(q).is_err() {
        return Ok(Admissibility::Deferred("edge endpoint was removed"));
    }
    let owners = mesh.elements_with_edge(p, q);
    let &[owner] = owners.as_slice() else {
        return Ok(Admissibility::Deferred("edge is not on the tissue boundary"));
    };
    if mesh.element_cycle(owner)?.len() <= 3 {
        return Ok(Admissibility::Deferred(
            "element would drop below three vertices",
        ));
    }
    let (keep, drop) = (p.min(q), p.max(q));
    for &e in mesh.vertex(drop)?.elements() {
        if e == owner {
            continue;
        }
        if position_in(&mesh.element_cycle(e)?, keep).is_some() {
            return Ok(Admissibility::Deferred(
                "another element already holds both endpoints",
            ));
        }
    }
    Ok(Admissibility::Ready(MergePlan { keep, drop, owner }))
}

pub(crate) fn apply_merge(mesh: &mut VertexMesh, plan: MergePlan) -> Result<(), TissueMeshError> {
    let MergePlan { keep, drop, owner } = plan;
    let target: Vec<[f64; 3]> = mesh
        .layer_stack(keep)?
        .into_iter()
        .zip(mesh.layer_stack(drop)?)
        .map(|(a, b)| midpoint(a, b))
        .collect();
    mesh.place_stack(keep, &target)?;

    let mut holders = vec![owner];
    holders.extend(
        mesh.vertex(drop)?
            .elements()
            .iter()
            .copied()
            .filter(|&e| e != owner),
    );
    for e in holders {
        let mut cycle: Vec<VertexId> = Vec::new();
        for v in mesh.element_cycle(e)? {
            let v = if v == drop { keep } else { v };
            if cycle.last() != Some(&v) {
                cycle.push(v);
            }
        }
        while cycle.len() > 1 && cycle.first() == cycle.last() {
            cycle.pop();
        }
        mesh.set_cycle(e, cycle)?;
    }
    mesh.collect_orphans();
    Ok(())
}

/// Boundary vertices lying strictly inside an element they do not belong
/// to, with their distance to that element's exterior.
pub(crate) fn penetrations(
    mesh: &VertexMesh,
) -> Result<Vec<(VertexId, ElementId, f64)>, TissueMeshError> {
    // exterior polygons with their xy bounding boxes
    let mut exterior: HashMap<ElementId, (Vec<[f64; 3]>, [f64; 4])> = HashMap::new();
    for e in mesh.element_ids() {
        if exterior_edges(mesh, e)?.is_empty() {
            continue;
        }
        let pts = mesh.positions_of(&mesh.element_cycle(e)?)?;
        let bbox = pts.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |b, p| [b[0].min(p[0]), b[1].min(p[1]), b[2].max(p[0]), b[3].max(p[1])],
        );
        exterior.insert(e, (pts, bbox));
    }
    let mut order: Vec<ElementId> = exterior.keys().copied().collect();
    order.sort();

    let mut found = Vec::new();
    for v in mesh.boundary_vertices() {
        let vertex = mesh.vertex(v)?;
        if vertex.region() == RegionTag::Basal {
            continue;
        }
        let p = vertex.position();
        for &e in &order {
            if vertex.elements().binary_search(&e).is_ok() {
                continue;
            }
            let (pts, bbox) = &exterior[&e];
            if p[0] < bbox[0] || p[1] < bbox[1] || p[0] > bbox[2] || p[1] > bbox[3] {
                continue;
            }
            if !point_in_polygon_xy(p, pts) {
                continue;
            }
            let mut depth = f64::INFINITY;
            for (a, b) in exterior_edges(mesh, e)? {
                let (_, c) = closest_point_on_segment(p, mesh.position(a)?, mesh.position(b)?);
                depth = depth.min(distance(p, c));
            }
            found.push((v, e, depth));
        }
    }
    Ok(found)
}

pub(crate) fn plan_absorption(
    mesh: &VertexMesh,
    vertex: VertexId,
    element: ElementId,
    config: &RemodelConfig,
) -> Result<Admissibility<AbsorptionPlan>, TissueMeshError> {
    let (Ok(v), Ok(_)) = (mesh.vertex(vertex), mesh.element(element)) else {
        return Ok(Admissibility::Deferred("entity was removed"));
    };
    let cycle = mesh.element_cycle(element)?;
    if position_in(&cycle, vertex).is_some() {
        return Ok(Admissibility::Deferred("vertex already belongs to the element"));
    }
    let p = v.position();
    if !point_in_polygon_xy(p, &mesh.positions_of(&cycle)?) {
        return Ok(Admissibility::Deferred("vertex is no longer inside the element"));
    }
    let mut best: Option<((VertexId, VertexId), f64, f64)> = None;
    for (a, b) in exterior_edges(mesh, element)? {
        let (pa, pb) = (mesh.position(a)?, mesh.position(b)?);
        let (t, c) = closest_point_on_segment(p, pa, pb);
        let d = distance(p, c);
        if best.is_none_or(|(_, _, bd)| d < bd) {
            best = Some(((a, b), t, d));
        }
    }
    let Some(((a, b), t, _)) = best else {
        return Ok(Admissibility::Deferred("element has no exterior edge"));
    };
    for &x in v.elements() {
        let held = mesh.element_cycle(x)?;
        if position_in(&held, a).is_some() && position_in(&held, b).is_some() {
            return Ok(Admissibility::Deferred(
                "vertex already shares an element with both edge ends",
            ));
        }
    }
    // keep both new edges clear of the T1 threshold
    let length = distance(mesh.position(a)?, mesh.position(b)?);
    let margin = (config.t1_separation_ratio * config.t1_threshold / length).min(0.5);
    let t = t.clamp(margin, 1.0 - margin);
    Ok(Admissibility::Ready(AbsorptionPlan {
        vertex,
        element,
        edge: (a, b),
        t,
    }))
}

pub(crate) fn apply_absorption(
    mesh: &mut VertexMesh,
    plan: AbsorptionPlan,
) -> Result<(), TissueMeshError> {
    let AbsorptionPlan {
        vertex,
        element,
        edge: (a, b),
        t,
    } = plan;
    let target: Vec<[f64; 3]> = mesh
        .layer_stack(a)?
        .into_iter()
        .zip(mesh.layer_stack(b)?)
        .map(|(pa, pb)| lerp(pa, pb, t))
        .collect();
    mesh.place_stack(vertex, &target)?;

    let mut cycle = mesh.element_cycle(element)?;
    let Some(i) = position_in(&cycle, a) else {
        return Err(TissueMeshError::NotAnEdge(a, b));
    };
    cycle.insert(i + 1, vertex);
    debug_assert_eq!(distinct_count(&cycle), cycle.len());
    mesh.set_cycle(element, cycle)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two squares side by side, the right one pulled away so that their
    /// shared corner is a pair of boundary vertices 0.004 apart.
    fn notched_pair() -> VertexMesh {
        VertexMesh::from_polygons(
            &[
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
                [1.004, 1.0],
                [2.0, 1.0],
                [2.0, 0.0],
            ],
            &[vec![0, 1, 2, 3], vec![1, 6, 5, 4, 2]],
        )
        .unwrap()
    }

    #[test]
    fn short_exterior_edge_merges_to_midpoint() {
        let mut mesh = notched_pair();
        let (p, q) = (VertexId::new(2), VertexId::new(4));
        let Admissibility::Ready(plan) = plan_merge(&mesh, p, q).unwrap() else {
            panic!("merge should be admissible");
        };
        assert_eq!(plan.keep, p);
        apply_merge(&mut mesh, plan).unwrap();
        assert!(mesh.vertex(q).is_err());
        let pos = mesh.position(p).unwrap();
        assert!((pos[0] - 1.002).abs() < 1e-12);
        assert_eq!(mesh.element_cycle(ElementId::new(1)).unwrap().len(), 4);
    }

    #[test]
    fn vertex_inside_neighbour_is_absorbed() {
        // the right square's corner 4 pokes into the left square
        let mut mesh = VertexMesh::from_polygons(
            &[
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
                [0.95, 0.5],
                [2.0, 1.0],
                [2.0, 0.0],
                [1.5, -0.5],
            ],
            &[vec![0, 1, 2, 3], vec![7, 6, 5, 4]],
        )
        .unwrap();
        let found = penetrations(&mesh).unwrap();
        assert_eq!(found.len(), 1);
        let (v, e, depth) = found[0];
        assert_eq!((v, e), (VertexId::new(4), ElementId::new(0)));
        assert!((depth - 0.05).abs() < 1e-12);

        let Admissibility::Ready(plan) =
            plan_absorption(&mesh, v, e, &RemodelConfig::default()).unwrap()
        else {
            panic!("absorption should be admissible");
        };
        apply_absorption(&mut mesh, plan).unwrap();
        let pos = mesh.position(v).unwrap();
        assert!((pos[0] - 1.0).abs() < 1e-12);
        assert!((pos[1] - 0.5).abs() < 1e-12);
        let cycle = mesh.element_cycle(e).unwrap();
        assert_eq!(cycle.len(), 5);
        assert!(mesh.area(e).unwrap() > 0.0);
    }
}
