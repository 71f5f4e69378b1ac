//! Topology remodeler: T1 neighbour exchange, T2 element collapse, and T3
//! boundary merges.
//!
//! A call to [`Remodeler::remodel`] runs a small state machine:
//!
//! ```text
//! Scan ─▶ Apply ─▶ Recheck ─▶ Stable
//!           ▲         │
//!           └─────────┘ (candidates remain, passes < max)
//!                     └─▶ Failed
//! ```
//!
//! Each pass applies candidates in a fixed order: T2 first, then T1, then
//! T3, each group by ascending metric with ties broken by entity index.
//! Every candidate is re-validated against the current mesh right before
//! it is applied, and no entity is touched twice within one pass. A
//! candidate that cannot be applied without breaking the mesh is deferred
//! and logged; it is never applied in a partial state.

mod t1;
mod t2;
mod t3;

use crate::geometry::metrics::{distance, signed_area_xy};
use crate::mesh_error::TissueMeshError;
use crate::topology::ids::{CellHandle, ElementId, EntityRef, VertexId};
use crate::topology::mesh::{MeshDimension, VertexMesh};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Thresholds and bounds of the remodeler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemodelConfig {
    /// Interior edges shorter than this are swapped.
    pub t1_threshold: f64,
    /// New edge length after a swap, as a multiple of `t1_threshold`.
    pub t1_separation_ratio: f64,
    /// Elements whose area (2D) or volume (3D) falls below this collapse.
    pub t2_threshold: f64,
    /// Exterior edges shorter than this are merged into one vertex.
    pub boundary_merge_threshold: f64,
    /// Apply passes before giving up.
    pub max_iterations: usize,
    pub enable_t1: bool,
    pub enable_t2: bool,
    /// Run the T3 boundary operations.
    pub enable_t3: bool,
}

impl Default for RemodelConfig {
    fn default() -> Self {
        Self {
            t1_threshold: 0.01,
            t1_separation_ratio: 1.5,
            t2_threshold: 0.001,
            boundary_merge_threshold: 0.01,
            max_iterations: 16,
            enable_t1: true,
            enable_t2: true,
            enable_t3: true,
        }
    }
}

impl RemodelConfig {
    pub fn validate(&self) -> Result<(), TissueMeshError> {
        let positive = [
            ("t1_threshold", self.t1_threshold),
            ("t2_threshold", self.t2_threshold),
            ("boundary_merge_threshold", self.boundary_merge_threshold),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TissueMeshError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.t1_separation_ratio.is_finite() || self.t1_separation_ratio <= 1.0 {
            return Err(TissueMeshError::InvalidConfig(format!(
                "t1_separation_ratio must exceed 1, got {}",
                self.t1_separation_ratio
            )));
        }
        if self.max_iterations == 0 {
            return Err(TissueMeshError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// States of one remodel call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemodelState {
    #[default]
    Scan,
    Apply,
    Recheck,
    Stable,
    Failed,
}

/// A pending topology rewrite.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Candidate {
    /// Collapse an element to a point.
    T2 { element: ElementId, measure: f64 },
    /// Swap the neighbour relation across a short interior edge.
    T1 { edge: (VertexId, VertexId), length: f64 },
    /// Merge the two ends of a short exterior edge.
    BoundaryMerge { edge: (VertexId, VertexId), length: f64 },
    /// Pull a boundary vertex that entered another element onto its edge.
    Absorption {
        vertex: VertexId,
        element: ElementId,
        depth: f64,
    },
}

impl Candidate {
    fn rank(&self) -> u8 {
        match self {
            Candidate::T2 { .. } => 0,
            Candidate::T1 { .. } => 1,
            Candidate::BoundaryMerge { .. } => 2,
            Candidate::Absorption { .. } => 3,
        }
    }

    /// The ordering metric: measure, edge length, or penetration depth.
    pub fn metric(&self) -> f64 {
        match *self {
            Candidate::T2 { measure, .. } => measure,
            Candidate::T1 { length, .. } | Candidate::BoundaryMerge { length, .. } => length,
            Candidate::Absorption { depth, .. } => depth,
        }
    }

    fn tie_break(&self) -> (u32, u32) {
        match *self {
            Candidate::T2 { element, .. } => (element.get(), 0),
            Candidate::T1 { edge, .. } | Candidate::BoundaryMerge { edge, .. } => {
                (edge.0.get(), edge.1.get())
            }
            Candidate::Absorption {
                vertex, element, ..
            } => (vertex.get(), element.get()),
        }
    }

    /// Application order within a pass.
    pub fn order(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then(self.metric().total_cmp(&other.metric()))
            .then(self.tie_break().cmp(&other.tie_break()))
    }

    /// Entities named by the candidate.
    pub fn entities(&self) -> Vec<EntityRef> {
        match *self {
            Candidate::T2 { element, .. } => vec![element.into()],
            Candidate::T1 { edge, .. } | Candidate::BoundaryMerge { edge, .. } => {
                vec![edge.0.into(), edge.1.into()]
            }
            Candidate::Absorption {
                vertex, element, ..
            } => vec![vertex.into(), element.into()],
        }
    }
}

/// A candidate that was found but cannot be applied safely.
#[derive(Clone, Debug, PartialEq)]
pub struct Deferred {
    pub candidate: Candidate,
    pub reason: &'static str,
}

/// Candidates and deferrals from one scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanReport {
    /// Admissible rewrites in application order.
    pub candidates: Vec<Candidate>,
    pub deferred: Vec<Deferred>,
}

/// Outcome of a remodel call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemodelReport {
    pub passes: usize,
    pub t1_swaps: usize,
    pub t2_collapses: usize,
    pub boundary_merges: usize,
    pub absorptions: usize,
    /// Deferrals reported by the last scan.
    pub deferred: Vec<Deferred>,
    /// Elements removed by T2 collapses, with their cells.
    pub died: Vec<(ElementId, CellHandle)>,
    pub state: RemodelState,
}

impl RemodelReport {
    pub fn total_operations(&self) -> usize {
        self.t1_swaps + self.t2_collapses + self.boundary_merges + self.absorptions
    }
}

/// Result of re-validating a candidate against the current mesh.
pub(crate) enum Admissibility<P> {
    Ready(P),
    Deferred(&'static str),
}

/// Topology remodeler.
#[derive(Clone, Debug, Default)]
pub struct Remodeler {
    config: RemodelConfig,
}

impl Remodeler {
    pub fn new(config: RemodelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RemodelConfig {
        &self.config
    }

    /// Find every rewrite the mesh currently needs.
    pub fn scan(&self, mesh: &VertexMesh) -> Result<ScanReport, TissueMeshError> {
        let cfg = &self.config;
        let mut report = ScanReport::default();
        let mut admit = |candidate: Candidate, verdict: Option<&'static str>| match verdict {
            None => report.candidates.push(candidate),
            Some(reason) => report.deferred.push(Deferred { candidate, reason }),
        };

        for e in mesh.element_ids().filter(|_| cfg.enable_t2) {
            let measure = element_measure(mesh, e)?;
            if measure < cfg.t2_threshold {
                let verdict = t2::plan(mesh, e)?.reason();
                admit(Candidate::T2 { element: e, measure }, verdict);
            }
        }

        for (p, q) in unique_edges(mesh)? {
            let length = edge_metric(mesh, p, q)?;
            match mesh.elements_with_edge(p, q).len() {
                2 if cfg.enable_t1 && length < cfg.t1_threshold => {
                    let verdict = t1::plan(mesh, p, q)?.reason();
                    admit(Candidate::T1 { edge: (p, q), length }, verdict);
                }
                1 if cfg.enable_t3 && length < cfg.boundary_merge_threshold => {
                    let verdict = t3::plan_merge(mesh, p, q)?.reason();
                    admit(Candidate::BoundaryMerge { edge: (p, q), length }, verdict);
                }
                _ => {}
            }
        }

        if cfg.enable_t3 {
            for (vertex, element, depth) in t3::penetrations(mesh)? {
                let verdict = t3::plan_absorption(mesh, vertex, element, cfg)?.reason();
                admit(
                    Candidate::Absorption {
                        vertex,
                        element,
                        depth,
                    },
                    verdict,
                );
            }
        }

        report.candidates.sort_by(|a, b| a.order(b));
        for d in &report.deferred {
            log::warn!(
                "deferring {:?}: {}",
                d.candidate,
                d.reason
            );
        }
        Ok(report)
    }

    /// Rewrite the mesh until no candidate remains.
    ///
    /// Fails with [`TissueMeshError::RemodelNonConvergence`] after
    /// `max_iterations` passes that still leave candidates.
    pub fn remodel(&self, mesh: &mut VertexMesh) -> Result<RemodelReport, TissueMeshError> {
        self.config.validate()?;
        let mut report = RemodelReport::default();
        let mut pending = Vec::new();
        let mut state = RemodelState::Scan;
        loop {
            state = match state {
                RemodelState::Scan | RemodelState::Recheck => {
                    let scan = self.scan(mesh)?;
                    report.deferred = scan.deferred;
                    pending = scan.candidates;
                    if pending.is_empty() {
                        RemodelState::Stable
                    } else if report.passes >= self.config.max_iterations {
                        RemodelState::Failed
                    } else {
                        RemodelState::Apply
                    }
                }
                RemodelState::Apply => {
                    report.passes += 1;
                    self.apply_pass(mesh, &pending, &mut report)?;
                    mesh.refresh_boundary_flags();
                    crate::debug_invariants!(
                        crate::debug_invariants::DebugInvariants::validate_invariants(&*mesh),
                        "after remodel pass"
                    );
                    RemodelState::Recheck
                }
                RemodelState::Stable => {
                    report.state = RemodelState::Stable;
                    if report.total_operations() > 0 {
                        log::info!(
                            "remodel stable after {} passes: {} T1, {} T2, {} merges, {} absorptions",
                            report.passes,
                            report.t1_swaps,
                            report.t2_collapses,
                            report.boundary_merges,
                            report.absorptions
                        );
                    }
                    return Ok(report);
                }
                RemodelState::Failed => {
                    let unresolved: Vec<EntityRef> =
                        pending.iter().flat_map(|c| c.entities()).collect();
                    log::error!(
                        "remodel failed to stabilise after {} passes; {} candidates left",
                        report.passes,
                        pending.len()
                    );
                    return Err(TissueMeshError::RemodelNonConvergence {
                        iterations: report.passes,
                        unresolved,
                    });
                }
            };
        }
    }

    fn apply_pass(
        &self,
        mesh: &mut VertexMesh,
        pending: &[Candidate],
        report: &mut RemodelReport,
    ) -> Result<(), TissueMeshError> {
        let mut touched_vertices: HashSet<VertexId> = HashSet::new();
        let mut touched_elements: HashSet<ElementId> = HashSet::new();
        for candidate in pending {
            let Some((vertices, elements)) = footprint(mesh, candidate) else {
                continue;
            };
            if vertices.iter().any(|v| touched_vertices.contains(v))
                || elements.iter().any(|e| touched_elements.contains(e))
            {
                log::trace!("{candidate:?} overlaps an earlier rewrite; next pass");
                continue;
            }
            let applied = match *candidate {
                Candidate::T2 { element, .. } => {
                    if element_measure(mesh, element)? >= self.config.t2_threshold {
                        false
                    } else if let Admissibility::Ready(plan) = t2::plan(mesh, element)? {
                        let cell = mesh.cell_of(element)?;
                        t2::apply(mesh, plan)?;
                        log::debug!("T2 collapsed element {element} ({cell})");
                        report.t2_collapses += 1;
                        report.died.push((element, cell));
                        true
                    } else {
                        false
                    }
                }
                Candidate::T1 { edge: (p, q), .. } => {
                    if let Admissibility::Ready(plan) = t1::plan(mesh, p, q)? {
                        t1::apply(mesh, plan, &self.config)?;
                        log::debug!("T1 swap on edge {p}-{q}");
                        report.t1_swaps += 1;
                        true
                    } else {
                        false
                    }
                }
                Candidate::BoundaryMerge { edge: (p, q), .. } => {
                    if let Admissibility::Ready(plan) = t3::plan_merge(mesh, p, q)? {
                        t3::apply_merge(mesh, plan)?;
                        log::debug!("T3 merged boundary edge {p}-{q}");
                        report.boundary_merges += 1;
                        true
                    } else {
                        false
                    }
                }
                Candidate::Absorption {
                    vertex, element, ..
                } => {
                    if let Admissibility::Ready(plan) =
                        t3::plan_absorption(mesh, vertex, element, &self.config)?
                    {
                        t3::apply_absorption(mesh, plan)?;
                        log::debug!("T3 moved vertex {vertex} onto element {element}");
                        report.absorptions += 1;
                        true
                    } else {
                        false
                    }
                }
            };
            if applied {
                touched_vertices.extend(vertices);
                touched_elements.extend(elements);
            }
        }
        Ok(())
    }
}

impl<P> Admissibility<P> {
    fn reason(&self) -> Option<&'static str> {
        match self {
            Admissibility::Ready(_) => None,
            Admissibility::Deferred(reason) => Some(reason),
        }
    }
}

/// Vertices and elements a candidate would modify, or `None` if its
/// entities no longer exist.
fn footprint(
    mesh: &VertexMesh,
    candidate: &Candidate,
) -> Option<(BTreeSet<VertexId>, BTreeSet<ElementId>)> {
    let mut vertices = BTreeSet::new();
    let mut elements = BTreeSet::new();
    let mut around = |v: VertexId, vertices: &mut BTreeSet<VertexId>| -> Option<()> {
        vertices.insert(v);
        elements.extend(mesh.vertex(v).ok()?.elements().iter().copied());
        Some(())
    };
    match *candidate {
        Candidate::T2 { element, .. } => {
            for v in mesh.element_cycle(element).ok()? {
                around(v, &mut vertices)?;
            }
        }
        Candidate::T1 { edge: (p, q), .. } | Candidate::BoundaryMerge { edge: (p, q), .. } => {
            around(p, &mut vertices)?;
            around(q, &mut vertices)?;
        }
        Candidate::Absorption {
            vertex, element, ..
        } => {
            around(vertex, &mut vertices)?;
            for v in mesh.element_cycle(element).ok()? {
                around(v, &mut vertices)?;
            }
        }
    }
    Some((vertices, elements))
}

/// Signed area (2D) or volume (3D) used by the T2 criterion.
pub(crate) fn element_measure(mesh: &VertexMesh, e: ElementId) -> Result<f64, TissueMeshError> {
    match mesh.dimension() {
        MeshDimension::Two => Ok(signed_area_xy(&mesh.positions_of(&mesh.element_cycle(e)?)?)),
        MeshDimension::Three => mesh.volume(e),
    }
}

/// Edge length; the shorter of the apical and basal edges in a monolayer.
pub(crate) fn edge_metric(
    mesh: &VertexMesh,
    p: VertexId,
    q: VertexId,
) -> Result<f64, TissueMeshError> {
    let mut best = f64::INFINITY;
    for layer in 0..mesh.layer_count() {
        let a = mesh.position(mesh.on_layer(p, layer)?)?;
        let b = mesh.position(mesh.on_layer(q, layer)?)?;
        best = best.min(distance(a, b));
    }
    Ok(best)
}

/// Every planar cycle edge, as `(low, high)` pairs.
pub(crate) fn unique_edges(
    mesh: &VertexMesh,
) -> Result<BTreeSet<(VertexId, VertexId)>, TissueMeshError> {
    let mut edges = BTreeSet::new();
    for e in mesh.element_ids() {
        let cycle = mesh.element_cycle(e)?;
        let n = cycle.len();
        for i in 0..n {
            let (a, b) = (cycle[i], cycle[(i + 1) % n]);
            edges.insert((a.min(b), a.max(b)));
        }
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_is_kind_then_metric_then_index() {
        let v = VertexId::new;
        let mut list = vec![
            Candidate::BoundaryMerge {
                edge: (v(0), v(1)),
                length: 0.001,
            },
            Candidate::T1 {
                edge: (v(5), v(6)),
                length: 0.004,
            },
            Candidate::T1 {
                edge: (v(3), v(4)),
                length: 0.004,
            },
            Candidate::T1 {
                edge: (v(9), v(8)),
                length: 0.002,
            },
            Candidate::T2 {
                element: ElementId::new(2),
                measure: 0.0005,
            },
        ];
        list.sort_by(|a, b| a.order(b));
        assert!(matches!(list[0], Candidate::T2 { .. }));
        assert_eq!(list[1].metric(), 0.002);
        assert!(matches!(list[2], Candidate::T1 { edge, .. } if edge.0 == v(3)));
        assert!(matches!(list[3], Candidate::T1 { edge, .. } if edge.0 == v(5)));
        assert!(matches!(list[4], Candidate::BoundaryMerge { .. }));
    }

    #[test]
    fn config_validation() {
        assert!(RemodelConfig::default().validate().is_ok());
        let bad = RemodelConfig {
            t1_separation_ratio: 0.5,
            ..RemodelConfig::default()
        };
        assert!(matches!(bad.validate(), Err(TissueMeshError::InvalidConfig(_))));
        let bad = RemodelConfig {
            max_iterations: 0,
            ..RemodelConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
