//! T2 collapse: a vanishing element is replaced by a single vertex at its
//! centroid, and every neighbour's run of the element's vertices becomes
//! that vertex.

use super::Admissibility;
use crate::geometry::metrics::centroid_xy;
use crate::mesh_error::TissueMeshError;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::{VertexMesh, distinct_count};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct T2Plan {
    pub element: ElementId,
    pub cycle: Vec<VertexId>,
    pub neighbours: Vec<ElementId>,
}

/// Replace every vertex of `dead` in `cycle` with `m` and drop the
/// repeats that creates, cyclically.
pub(crate) fn collapse_cycle(
    cycle: &[VertexId],
    dead: &BTreeSet<VertexId>,
    m: VertexId,
) -> Vec<VertexId> {
    let mut out: Vec<VertexId> = Vec::with_capacity(cycle.len());
    for &v in cycle {
        let v = if dead.contains(&v) { m } else { v };
        if out.last() != Some(&v) {
            out.push(v);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

pub(crate) fn plan(
    mesh: &VertexMesh,
    element: ElementId,
) -> Result<Admissibility<T2Plan>, TissueMeshError> {
    if mesh.element(element).is_err() {
        return Ok(Admissibility::Deferred("element was removed"));
    }
    let cycle = mesh.element_cycle(element)?;
    let dead: BTreeSet<VertexId> = cycle.iter().copied().collect();
    // any vertex of the dying element stands in for the new one
    let stand_in = cycle[0];
    let mut neighbours = Vec::new();
    for n in mesh.neighbors_of(element)? {
        let collapsed = collapse_cycle(&mesh.element_cycle(n)?, &dead, stand_in);
        if collapsed.len() < 3 {
            return Ok(Admissibility::Deferred(
                "a neighbour would drop below three vertices",
            ));
        }
        if distinct_count(&collapsed) != collapsed.len() {
            return Ok(Admissibility::Deferred(
                "a neighbour touches the element at separate places",
            ));
        }
        neighbours.push(n);
    }
    Ok(Admissibility::Ready(T2Plan {
        element,
        cycle,
        neighbours,
    }))
}

/// Collapse the element. Returns the new vertex.
pub(crate) fn apply(mesh: &mut VertexMesh, plan: T2Plan) -> Result<VertexId, TissueMeshError> {
    let positions = (0..mesh.layer_count())
        .map(|layer| Ok(centroid_xy(&mesh.layer_positions(&plan.cycle, layer)?)))
        .collect::<Result<Vec<_>, TissueMeshError>>()?;
    let m = mesh.spawn_vertex(&positions);
    let dead: BTreeSet<VertexId> = plan.cycle.iter().copied().collect();
    for n in plan.neighbours {
        let collapsed = collapse_cycle(&mesh.element_cycle(n)?, &dead, m);
        mesh.set_cycle(n, collapsed)?;
    }
    mesh.detach_element(plan.element);
    mesh.elements[plan.element.index()].live = false;
    mesh.collect_orphans();
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_merges_runs_including_wraparound() {
        let v = VertexId::new;
        let dead: BTreeSet<VertexId> = [v(1), v(2), v(5)].into_iter().collect();
        let out = collapse_cycle(&[v(1), v(3), v(4), v(5), v(2)], &dead, v(9));
        assert_eq!(out, vec![v(9), v(3), v(4)]);
    }

    #[test]
    fn small_triangle_collapses_into_neighbours() {
        // a tiny triangle 3-4-5 inside the fan formed by three quads
        let pts = [
            [0.0, 0.0],
            [2.0, 0.0],
            [1.0, 2.0],
            [0.99, 0.6],
            [1.01, 0.6],
            [1.0, 0.62],
            [1.0, -1.0],
            [2.5, 1.5],
            [-0.5, 1.5],
        ];
        let mut mesh = VertexMesh::from_polygons(
            &pts,
            &[
                vec![3, 4, 5],
                vec![0, 6, 1, 4, 3],
                vec![1, 7, 2, 5, 4],
                vec![2, 8, 0, 3, 5],
            ],
        )
        .unwrap();
        let tri = ElementId::new(0);
        let Admissibility::Ready(plan) = plan(&mesh, tri).unwrap() else {
            panic!("collapse should be admissible");
        };
        let m = apply(&mut mesh, plan).unwrap();
        assert!(mesh.element(tri).is_err());
        assert_eq!(mesh.num_elements(), 3);
        for e in mesh.element_ids() {
            let cycle = mesh.element_cycle(e).unwrap();
            assert_eq!(cycle.len(), 4);
            assert!(cycle.contains(&m));
            assert!(mesh.area(e).unwrap() > 0.0);
        }
        for old in [3, 4, 5] {
            assert!(mesh.vertex(VertexId::new(old)).is_err());
        }
        let c = mesh.position(m).unwrap();
        assert!((c[0] - 1.0).abs() < 1e-12);
    }
}
