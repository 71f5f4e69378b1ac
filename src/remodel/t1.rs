//! T1 neighbour exchange.
//!
//! For a short interior edge `p → q` shared by elements A (where `q`
//! follows `p`) and B (where `p` follows `q`):
//!
//! ```text
//!        A                     A
//!   ─────p────q─────   ─▶  ────  p  ────
//!    C        │    D       C     │     D
//!   ──────────┴─────       ───   q  ────
//!        B                     B
//! ```
//!
//! A loses `q`, B loses `p`, C (the third element at `p`) gains `q` just
//! before `p`, and D (the third element at `q`) gains `p` just before `q`.
//! The new edge is perpendicular to the old one, centred on its midpoint,
//! with length `t1_separation_ratio × t1_threshold`.

use super::{Admissibility, RemodelConfig};
use crate::geometry::metrics::{EPS, add, midpoint, scale, sub};
use crate::mesh_error::TissueMeshError;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::{VertexMesh, next_in, position_in};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct T1Plan {
    pub p: VertexId,
    pub q: VertexId,
    /// `q` follows `p` here.
    pub a: ElementId,
    /// `p` follows `q` here.
    pub b: ElementId,
    /// Contains `p` but not `q`.
    pub c: Option<ElementId>,
    /// Contains `q` but not `p`.
    pub d: Option<ElementId>,
}

pub(crate) fn plan(
    mesh: &VertexMesh,
    p: VertexId,
    q: VertexId,
) -> Result<Admissibility<T1Plan>, TissueMeshError> {
    if mesh.vertex(p).is_err() || mesh.vertex(q).is_err() {
        return Ok(Admissibility::Deferred("edge endpoint was removed"));
    }
    let owners = mesh.elements_with_edge(p, q);
    if owners.len() != 2 {
        return Ok(Admissibility::Deferred(
            "edge is not shared by exactly two elements",
        ));
    }
    let (mut a, mut b) = (None, None);
    for &e in &owners {
        let cycle = mesh.element_cycle(e)?;
        if next_in(&cycle, p) == Some(q) {
            a = Some(e);
        } else if next_in(&cycle, q) == Some(p) {
            b = Some(e);
        }
    }
    let (Some(a), Some(b)) = (a, b) else {
        return Ok(Admissibility::Deferred(
            "elements on the edge disagree in winding",
        ));
    };
    if mesh.element_cycle(a)?.len() <= 3 || mesh.element_cycle(b)?.len() <= 3 {
        return Ok(Admissibility::Deferred(
            "a triangle on the edge would lose a vertex",
        ));
    }

    let others = |v: VertexId| -> Result<Vec<ElementId>, TissueMeshError> {
        Ok(mesh
            .vertex(v)?
            .elements()
            .iter()
            .copied()
            .filter(|&e| e != a && e != b)
            .collect())
    };
    let (at_p, at_q) = (others(p)?, others(q)?);
    if at_p.len() > 1 || at_q.len() > 1 {
        return Ok(Admissibility::Deferred(
            "edge endpoint is shared by more than three elements",
        ));
    }
    let (c, d) = (at_p.first().copied(), at_q.first().copied());
    if c.is_none() && d.is_none() {
        return Ok(Admissibility::Deferred(
            "swap would leave the new edge outside every element",
        ));
    }
    if let Some(c) = c {
        if position_in(&mesh.element_cycle(c)?, q).is_some() {
            return Ok(Admissibility::Deferred(
                "third element touches both edge endpoints",
            ));
        }
    }
    if let Some(d) = d {
        if position_in(&mesh.element_cycle(d)?, p).is_some() {
            return Ok(Admissibility::Deferred(
                "third element touches both edge endpoints",
            ));
        }
    }
    Ok(Admissibility::Ready(T1Plan { p, q, a, b, c, d }))
}

/// Per-layer positions of the swapped endpoints.
fn swapped_positions(
    mesh: &VertexMesh,
    plan: &T1Plan,
    config: &RemodelConfig,
) -> Result<(Vec<[f64; 3]>, Vec<[f64; 3]>), TissueMeshError> {
    let half = 0.5 * config.t1_separation_ratio * config.t1_threshold;
    let (sp, sq) = (mesh.layer_stack(plan.p)?, mesh.layer_stack(plan.q)?);
    let mut new_p = Vec::with_capacity(sp.len());
    let mut new_q = Vec::with_capacity(sq.len());
    for (&pp, &pq) in sp.iter().zip(&sq) {
        let m = midpoint(pp, pq);
        let d = sub(pq, pp);
        let len = (d[0] * d[0] + d[1] * d[1]).sqrt();
        let dir = if len < EPS {
            [1.0, 0.0]
        } else {
            [d[0] / len, d[1] / len]
        };
        // left of p→q, i.e. into A
        let perp = [-dir[1], dir[0], 0.0];
        new_p.push(add(m, scale(perp, half)));
        new_q.push(sub(m, scale(perp, half)));
    }
    Ok((new_p, new_q))
}

pub(crate) fn apply(
    mesh: &mut VertexMesh,
    plan: T1Plan,
    config: &RemodelConfig,
) -> Result<(), TissueMeshError> {
    let T1Plan { p, q, a, b, c, d } = plan.clone();
    let (new_p, new_q) = swapped_positions(mesh, &plan, config)?;

    let insert_before = |mut cycle: Vec<VertexId>, anchor: VertexId, v: VertexId| {
        if let Some(i) = position_in(&cycle, anchor) {
            cycle.insert(i, v);
        }
        cycle
    };
    let without = |cycle: Vec<VertexId>, v: VertexId| -> Vec<VertexId> {
        cycle.into_iter().filter(|&x| x != v).collect()
    };

    let cycle_a = without(mesh.element_cycle(a)?, q);
    let cycle_b = without(mesh.element_cycle(b)?, p);
    let cycle_c = c
        .map(|c| mesh.element_cycle(c).map(|cy| insert_before(cy, p, q)))
        .transpose()?;
    let cycle_d = d
        .map(|d| mesh.element_cycle(d).map(|cy| insert_before(cy, q, p)))
        .transpose()?;

    mesh.place_stack(p, &new_p)?;
    mesh.place_stack(q, &new_q)?;
    // C and D first so the old p–q lateral face is picked up again
    if let (Some(c), Some(cycle)) = (c, cycle_c) {
        mesh.set_cycle(c, cycle)?;
    }
    if let (Some(d), Some(cycle)) = (d, cycle_d) {
        mesh.set_cycle(d, cycle)?;
    }
    mesh.set_cycle(a, cycle_a)?;
    mesh.set_cycle(b, cycle_b)?;
    mesh.collect_orphans();
    Ok(())
}
