//! Redistribution Engine - Planning and Executing Layout Changes
//!
//! Converts a distributed matrix from one descriptor to another. Planning is
//! a pure function of the two descriptors, the grid shape and the global
//! dimensions, so every process computes the same plan without talking.
//!
//! A direct step is chosen by exact, constant-time checks on the descriptor
//! pair, in order: copy, scatter/gather for single-owner layouts, filter
//! (zero communication), whole-block exchange, all-to-all within one grid
//! axis, all-to-all over the grid to `[*,*]`. Pairs without a direct step are
//! routed through intermediate descriptors, picking the route with the least
//! estimated traffic.
//!
//! # Example
//! ```rust
//! use gridmat_dist::prelude::*;
//!
//! let shape = GridShape::new(2, 3).unwrap();
//! let source = Descriptor::cyclic();
//! let target = Descriptor::new(Dist::Mr, Dist::Mc).unwrap();
//! let plan = plan(shape, 12, 12, source, target, 3).unwrap();
//! assert_eq!(plan.len(), 3);
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::HashMap;
use std::sync::Arc;

use gridmat_core::{Error, LocalBlock, Numeric, Result, Scalar};
use serde::{Deserialize, Serialize};

use crate::comm::Transfer;
use crate::config::RedistConfig;
use crate::dist::{Descriptor, Dist};
use crate::grid::{CommScope, GridShape, ProcessGrid};
use crate::matrix::DistMatrix;

// =============================================================================
// Plan
// =============================================================================

/// The primitive a hop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Identical layouts; local copy.
    Copy,
    /// Target already resident; local strided copy.
    Filter,
    /// Whole-block send/receive between partners.
    Exchange,
    /// All-to-all within a communicator.
    AllToAll(CommScope),
    /// Point-to-point collection onto a single owner.
    Gather,
    /// Point-to-point distribution from a single owner.
    Scatter,
}

impl StepKind {
    /// True if the step sends no messages.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, StepKind::Copy | StepKind::Filter)
    }
}

impl core::fmt::Display for StepKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StepKind::Copy => f.write_str("copy"),
            StepKind::Filter => f.write_str("filter"),
            StepKind::Exchange => f.write_str("exchange"),
            StepKind::AllToAll(scope) => write!(f, "all-to-all ({scope})"),
            StepKind::Gather => f.write_str("gather"),
            StepKind::Scatter => f.write_str("scatter"),
        }
    }
}

/// One step of a plan: a primitive and the descriptor it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// Primitive to run.
    pub kind: StepKind,
    /// Layout after the step.
    pub target: Descriptor,
}

/// A route from a source descriptor to a target descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Starting layout.
    pub source: Descriptor,
    /// Steps in execution order; the last one produces the target.
    pub hops: Vec<Hop>,
    /// Estimated elements received per process, summed over the hops.
    pub cost: usize,
}

impl Plan {
    /// Number of hops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// True if the plan has no hops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Primitive of every hop, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StepKind> {
        self.hops.iter().map(|hop| hop.kind).collect()
    }

    /// Final layout.
    #[must_use]
    pub fn target(&self) -> Descriptor {
        self.hops.last().map_or(self.source, |hop| hop.target)
    }

    /// True if no hop communicates.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.hops.iter().all(|hop| hop.kind.is_local())
    }
}

impl core::fmt::Display for Plan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.source)?;
        for hop in &self.hops {
            write!(f, " -{}-> {}", hop.kind, hop.target)?;
        }
        Ok(())
    }
}

// =============================================================================
// Direct Steps
// =============================================================================

/// Grid axis along which a single-axis all-to-all runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Vary the grid row (communicate within a grid column).
    Rows,
    /// Vary the grid column (communicate within a grid row).
    Cols,
}

impl Axis {
    const fn scope(self) -> CommScope {
        match self {
            Axis::Rows => CommScope::GridColumn,
            Axis::Cols => CommScope::GridRow,
        }
    }

    const fn uses(self, dist: Dist) -> bool {
        match self {
            Axis::Rows => dist.uses_rows(),
            Axis::Cols => dist.uses_cols(),
        }
    }
}

/// One dimension of a descriptor pair: (source dist, source align, target dist, target align).
type DimPair = (Dist, usize, Dist, usize);

fn dim_pairs(s: &Descriptor, t: &Descriptor) -> [DimPair; 2] {
    [
        (s.col_dist, s.col_align, t.col_dist, t.col_align),
        (s.row_dist, s.row_align, t.row_dist, t.row_align),
    ]
}

/// True if every target index of the dimension is already held under the source.
fn filters(shape: GridShape, (sd, sa, td, ta): DimPair) -> bool {
    match (sd, td) {
        (Dist::Star, _) => true,
        _ if sd == td => sa == ta,
        (Dist::Mc, Dist::Vc | Dist::Md) => ta % shape.height == sa,
        (Dist::Mr, Dist::Vr | Dist::Md) => ta % shape.width == sa,
        _ => false,
    }
}

/// True if the target splits a source dimension that does not depend on `axis`.
fn refines(shape: GridShape, axis: Axis, (sd, sa, td, ta): DimPair) -> bool {
    match (axis, sd, td) {
        (Axis::Rows, Dist::Star, Dist::Mc) | (Axis::Cols, Dist::Star, Dist::Mr) => true,
        (Axis::Rows, Dist::Mr, Dist::Vr) => ta % shape.width == sa,
        (Axis::Cols, Dist::Mc, Dist::Vc) => ta % shape.height == sa,
        _ => false,
    }
}

/// True if the target merges the pieces held along `axis` into one.
fn coarsens(shape: GridShape, axis: Axis, (sd, sa, td, ta): DimPair) -> bool {
    match (axis, sd, td) {
        (Axis::Rows, Dist::Mc, Dist::Star) | (Axis::Cols, Dist::Mr, Dist::Star) => true,
        (Axis::Rows, Dist::Vr, Dist::Mr) => sa % shape.width == ta,
        (Axis::Cols, Dist::Vc, Dist::Mc) => sa % shape.height == ta,
        _ => false,
    }
}

fn untouched(axis: Axis, (sd, sa, td, ta): DimPair) -> bool {
    sd == td && sa == ta && !axis.uses(sd)
}

/// True if the target layout can be extracted locally from the source layout.
#[must_use]
pub fn filterable(s: &Descriptor, t: &Descriptor, shape: GridShape) -> bool {
    if s.is_single_owner() || t.is_single_owner() {
        return s == t || (s.is_replicated() && t.is_single_owner());
    }
    dim_pairs(s, t).into_iter().all(|pair| filters(shape, pair))
}

fn exchangeable(s: &Descriptor, t: &Descriptor, shape: GridShape) -> bool {
    if s.is_single_owner() || t.is_single_owner() {
        return false;
    }
    let same_strides = dim_pairs(s, t).into_iter().all(|(sd, _, td, _)| match (sd, td) {
        // Transposing grid rows onto grid columns pairs processes one to one.
        (Dist::Mc, Dist::Mr) | (Dist::Mr, Dist::Mc) => shape.is_square(),
        _ => sd.stride(shape) == td.stride(shape) && (sd == Dist::Md) == (td == Dist::Md),
    });
    same_strides && s.uses_rows() == t.uses_rows() && s.uses_cols() == t.uses_cols()
}

fn single_axis(s: &Descriptor, t: &Descriptor, shape: GridShape) -> Option<CommScope> {
    if s.is_single_owner() || t.is_single_owner() {
        return None;
    }
    let [a, b] = dim_pairs(s, t);
    [Axis::Cols, Axis::Rows].into_iter().find_map(|axis| {
        let other_ok = |pair| refines(shape, axis, pair) || untouched(axis, pair);
        let fits = (coarsens(shape, axis, a) && other_ok(b)) || (coarsens(shape, axis, b) && other_ok(a));
        fits.then_some(axis.scope())
    })
}

/// The single primitive that takes `s` to `t`, if there is one.
///
/// Both descriptors must be normalized against `shape`.
#[must_use]
pub fn direct_step(s: &Descriptor, t: &Descriptor, shape: GridShape) -> Option<StepKind> {
    if s == t {
        return Some(StepKind::Copy);
    }
    if s.is_single_owner() {
        return Some(StepKind::Scatter);
    }
    if t.is_single_owner() {
        return if s.is_replicated() {
            Some(StepKind::Filter)
        } else if s.is_redundant() {
            None
        } else {
            Some(StepKind::Gather)
        };
    }
    if filterable(s, t, shape) {
        return Some(StepKind::Filter);
    }
    if exchangeable(s, t, shape) {
        return Some(StepKind::Exchange);
    }
    if let Some(scope) = single_axis(s, t, shape) {
        return Some(StepKind::AllToAll(scope));
    }
    if t.is_replicated() && !s.is_redundant() {
        return Some(StepKind::AllToAll(CommScope::Grid));
    }
    None
}

// =============================================================================
// Routing
// =============================================================================

/// Every non-single-owner pair, linear-cyclic layouts first.
const ROUTE_PAIRS: [(Dist, Dist); 13] = [
    (Dist::Vc, Dist::Star),
    (Dist::Star, Dist::Vc),
    (Dist::Vr, Dist::Star),
    (Dist::Star, Dist::Vr),
    (Dist::Mc, Dist::Mr),
    (Dist::Mr, Dist::Mc),
    (Dist::Mc, Dist::Star),
    (Dist::Star, Dist::Mr),
    (Dist::Mr, Dist::Star),
    (Dist::Star, Dist::Mc),
    (Dist::Md, Dist::Star),
    (Dist::Star, Dist::Md),
    (Dist::Star, Dist::Star),
];

/// Estimated elements a process holds under `desc`.
fn volume(desc: &Descriptor, shape: GridShape, m: usize, n: usize) -> usize {
    if desc.is_single_owner() {
        return m * n;
    }
    m.div_ceil(desc.col_dist.stride(shape)) * n.div_ceil(desc.row_dist.stride(shape))
}

fn hop_cost(kind: StepKind, target: &Descriptor, shape: GridShape, m: usize, n: usize) -> usize {
    let traffic = match kind {
        StepKind::Copy | StepKind::Filter => 0,
        StepKind::Exchange | StepKind::AllToAll(_) => volume(target, shape, m, n),
        StepKind::Gather | StepKind::Scatter => m * n,
    };
    traffic + 1
}

/// Intermediate layouts worth considering between `s` and `t`.
fn candidates(s: &Descriptor, t: &Descriptor, shape: GridShape) -> Vec<Descriptor> {
    let seeds = [s.col_align, s.row_align, t.col_align, t.row_align, 0];
    let aligns = |dist: Dist| -> Vec<usize> {
        let stride = dist.stride(shape);
        let mut out: Vec<usize> = Vec::new();
        for a in seeds.iter().map(|a| a % stride) {
            if !out.contains(&a) {
                out.push(a);
            }
        }
        out
    };

    let mut out = Vec::new();
    for (col, row) in ROUTE_PAIRS {
        for ca in aligns(col) {
            for ra in aligns(row) {
                out.push(Descriptor {
                    col_dist: col,
                    row_dist: row,
                    col_align: ca,
                    row_align: ra,
                    root: 0,
                });
            }
        }
    }
    for root in [s.root, t.root] {
        let circ = Descriptor::single_owner(root);
        if !out.contains(&circ) {
            out.push(circ);
        }
    }
    if !out.contains(t) {
        out.push(*t);
    }
    out
}

/// Plans a redistribution of an `m x n` matrix from `source` to `target`.
///
/// Both descriptors are normalized first. A direct step is always taken when
/// one exists; otherwise routes of up to `max_hops` hops are searched.
pub fn plan(
    shape: GridShape,
    m: usize,
    n: usize,
    source: Descriptor,
    target: Descriptor,
    max_hops: usize,
) -> Result<Plan> {
    let s = source.normalize(shape)?;
    let t = target.normalize(shape)?;

    if let Some(kind) = direct_step(&s, &t, shape) {
        return Ok(Plan {
            source: s,
            hops: vec![Hop { kind, target: t }],
            cost: hop_cost(kind, &t, shape, m, n),
        });
    }

    let nodes = candidates(&s, &t, shape);
    let mut best: HashMap<Descriptor, usize> = HashMap::from([(s, 0)]);
    let mut frontier: Vec<(Descriptor, usize, Vec<Hop>)> = vec![(s, 0, Vec::new())];
    let mut found: Option<(usize, Vec<Hop>)> = None;

    for _ in 0..max_hops {
        let mut next = Vec::new();
        for (u, cost, hops) in &frontier {
            for v in &nodes {
                let Some(kind) = direct_step(u, v, shape) else {
                    continue;
                };
                if kind == StepKind::Copy {
                    continue;
                }
                let total = cost + hop_cost(kind, v, shape, m, n);
                if best.get(v).is_some_and(|&c| c <= total) {
                    continue;
                }
                best.insert(*v, total);

                let mut route = hops.clone();
                route.push(Hop { kind, target: *v });
                if *v == t {
                    found = Some((total, route));
                } else {
                    next.push((*v, total, route));
                }
            }
        }
        frontier = next;
    }

    let (cost, hops) = found.ok_or_else(|| {
        Error::invalid_operation(format!("no route from {s} to {t} within {max_hops} hops on a {shape} grid"))
    })?;
    Ok(Plan { source: s, hops, cost })
}

// =============================================================================
// Redistributor
// =============================================================================

/// Plans and runs redistributions under one configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Redistributor {
    config: RedistConfig,
}

impl Redistributor {
    /// Creates a redistributor.
    #[must_use]
    pub const fn new(config: RedistConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RedistConfig {
        &self.config
    }

    /// Plans the redistribution of `source` to `target` without running it.
    pub fn plan<T: Scalar>(&self, source: &DistMatrix<T>, target: &Descriptor) -> Result<Plan> {
        plan(
            source.grid().shape(),
            source.height(),
            source.width(),
            *source.descriptor(),
            *target,
            self.config.max_hops,
        )
    }

    /// Returns a new matrix holding `source`'s values under `target`.
    ///
    /// Collective over the grid: every process must call it with the same target.
    pub fn redistribute<T: Scalar>(&self, source: &DistMatrix<T>, target: &Descriptor) -> Result<DistMatrix<T>> {
        let plan = self.plan(source, target)?;
        let grid = source.grid();
        if self.config.trace {
            tracing::debug!(
                rank = grid.rank(),
                height = source.height(),
                width = source.width(),
                cost = plan.cost,
                %plan,
                "redistributing"
            );
        }

        let block = self.guard(grid, self.run_plan(source, &plan))?;
        DistMatrix::from_parts(Arc::clone(grid), source.height(), source.width(), plan.target(), block)
    }

    fn run_plan<T: Scalar>(&self, source: &DistMatrix<T>, plan: &Plan) -> Result<LocalBlock<T>> {
        let grid = source.grid();
        let mut current = plan.source;
        let mut owned: Option<LocalBlock<T>> = None;

        for (index, hop) in plan.hops.iter().enumerate() {
            let transfer = Transfer::new(grid, source.height(), source.width(), current, hop.target)
                .verify(self.config.verify);
            let input = owned.as_ref().unwrap_or_else(|| source.block());
            let output = run_hop(&transfer, hop.kind, input)?;
            if self.config.trace {
                tracing::trace!(
                    rank = grid.rank(),
                    hop = index,
                    kind = %hop.kind,
                    target = %hop.target,
                    local_height = output.height(),
                    local_width = output.width(),
                    "hop complete"
                );
            }
            owned = Some(output);
            current = hop.target;
        }

        Ok(owned.unwrap_or_else(|| source.block().deep_copy()))
    }

    /// Sums the replicated partial values of `source` into `target`.
    ///
    /// `target` must be extractable from `source` without communication
    /// (e.g. `[MC,*]` into `[MC,MR]`); each target element becomes the sum of
    /// that element over every process holding a copy of it. Floating-point
    /// totals depend on the number of copies.
    pub fn contract<T: Numeric>(&self, source: &DistMatrix<T>, target: &Descriptor) -> Result<DistMatrix<T>> {
        let grid = source.grid();
        let shape = grid.shape();
        let s = *source.descriptor();
        let t = target.normalize(shape)?;
        if s != t && !filterable(&s, &t, shape) {
            return Err(Error::distribution_mismatch(format!(
                "cannot contract {s} onto {t}: the target is not contained in the source"
            )));
        }

        let transfer = Transfer::new(grid, source.height(), source.width(), s, t).verify(self.config.verify);
        if self.config.trace {
            tracing::debug!(
                rank = grid.rank(),
                source = %s,
                target = %t,
                scope = ?transfer.replication_scope(),
                dtype = %T::DTYPE,
                exact = T::DTYPE.has_exact_sums(),
                "contracting"
            );
        }

        let block = self.guard(grid, transfer.sum_scatter(source.block()))?;
        DistMatrix::from_parts(Arc::clone(grid), source.height(), source.width(), t, block)
    }

    /// Aborts the job on a failed transfer when configured to.
    fn guard<R>(&self, grid: &ProcessGrid, result: Result<R>) -> Result<R> {
        if let Err(err) = &result {
            if self.config.abort_on_error {
                grid.world().abort(&err.to_string());
            } else if self.config.trace {
                tracing::warn!(rank = grid.rank(), error = %err, "redistribution failed");
            }
        }
        result
    }
}

fn run_hop<T: Scalar>(transfer: &Transfer<'_>, kind: StepKind, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
    match kind {
        StepKind::Copy => transfer.copy(block),
        StepKind::Filter => transfer.filter(block),
        StepKind::Exchange => transfer.exchange(block),
        StepKind::AllToAll(scope) => transfer.all_to_all_promote(scope, block),
        StepKind::Gather => transfer.gather(block),
        StepKind::Scatter => transfer.scatter(block),
    }
}

/// Redistributes with the default configuration.
pub fn redistribute<T: Scalar>(source: &DistMatrix<T>, target: &Descriptor) -> Result<DistMatrix<T>> {
    Redistributor::default().redistribute(source, target)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(h: usize, w: usize) -> GridShape {
        GridShape::new(h, w).unwrap()
    }

    fn d(col: Dist, row: Dist) -> Descriptor {
        Descriptor::new(col, row).unwrap()
    }

    #[test]
    fn test_direct_steps() {
        let sq = shape(2, 2);
        let cases = [
            (Descriptor::cyclic(), Descriptor::cyclic(), StepKind::Copy),
            (Descriptor::cyclic(), Descriptor::cyclic().aligned(1, 1), StepKind::Exchange),
            (Descriptor::cyclic(), d(Dist::Mr, Dist::Mc), StepKind::Exchange),
            (d(Dist::Vc, Dist::Star), d(Dist::Vr, Dist::Star), StepKind::Exchange),
            (Descriptor::cyclic(), d(Dist::Mc, Dist::Star), StepKind::AllToAll(CommScope::GridRow)),
            (Descriptor::cyclic(), d(Dist::Vc, Dist::Star), StepKind::AllToAll(CommScope::GridRow)),
            (d(Dist::Vc, Dist::Star), Descriptor::cyclic(), StepKind::AllToAll(CommScope::GridRow)),
            (d(Dist::Vc, Dist::Star), d(Dist::Mc, Dist::Star), StepKind::AllToAll(CommScope::GridRow)),
            (d(Dist::Vr, Dist::Star), d(Dist::Mr, Dist::Mc), StepKind::AllToAll(CommScope::GridColumn)),
            (d(Dist::Mc, Dist::Star), d(Dist::Star, Dist::Mc), StepKind::AllToAll(CommScope::GridColumn)),
            (Descriptor::cyclic(), Descriptor::replicated(), StepKind::AllToAll(CommScope::Grid)),
            (d(Dist::Md, Dist::Star), Descriptor::replicated(), StepKind::AllToAll(CommScope::Grid)),
            (Descriptor::replicated(), Descriptor::cyclic(), StepKind::Filter),
            (d(Dist::Mc, Dist::Star), Descriptor::cyclic(), StepKind::Filter),
            (d(Dist::Mc, Dist::Star), d(Dist::Vc, Dist::Star), StepKind::Filter),
            (d(Dist::Mr, Dist::Star), d(Dist::Vr, Dist::Star), StepKind::Filter),
            (d(Dist::Mc, Dist::Star), d(Dist::Md, Dist::Star), StepKind::Filter),
            (Descriptor::replicated(), Descriptor::single_owner(3), StepKind::Filter),
            (Descriptor::cyclic(), Descriptor::single_owner(0), StepKind::Gather),
            (Descriptor::single_owner(0), Descriptor::cyclic(), StepKind::Scatter),
            (Descriptor::single_owner(0), Descriptor::single_owner(2), StepKind::Scatter),
        ];
        for (s, t, kind) in cases {
            assert_eq!(direct_step(&s, &t, sq), Some(kind), "{s} -> {t}");
        }

        assert_eq!(direct_step(&d(Dist::Mc, Dist::Star), &Descriptor::single_owner(0), sq), None);
        // [MC,*] with alignment 1 does not hold the [VC,*] rows of alignment 0.
        assert_ne!(
            direct_step(&d(Dist::Mc, Dist::Star).aligned(1, 0), &d(Dist::Vc, Dist::Star), sq),
            Some(StepKind::Filter)
        );
    }

    #[test]
    fn test_non_square_transpose_has_no_direct_step() {
        let s = shape(2, 3);
        assert_eq!(direct_step(&Descriptor::cyclic(), &d(Dist::Mr, Dist::Mc), s), None);
    }

    #[test]
    fn test_square_transpose_is_one_exchange() {
        let plan = plan(shape(3, 3), 10, 10, Descriptor::cyclic(), d(Dist::Mr, Dist::Mc), 3).unwrap();
        assert_eq!(plan.kinds(), vec![StepKind::Exchange]);
    }

    #[test]
    fn test_non_square_transpose_route() {
        let plan = plan(shape(2, 3), 12, 12, Descriptor::cyclic(), d(Dist::Mr, Dist::Mc), 3).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.kinds()[1], StepKind::Exchange);
        assert!(matches!(plan.kinds()[0], StepKind::AllToAll(_)));
        assert!(matches!(plan.kinds()[2], StepKind::AllToAll(_)));
        assert!(plan.hops.iter().all(|hop| hop.target.category() != crate::dist::Category::Replicated));
        assert_eq!(plan.target(), d(Dist::Mr, Dist::Mc));
    }

    #[test]
    fn test_route_respects_alignments() {
        let source = Descriptor::cyclic().aligned(1, 0);
        let target = d(Dist::Mr, Dist::Mc).aligned(2, 1);
        let plan = plan(shape(2, 3), 12, 12, source, target, 3).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.target(), target);

        // Every hop must itself be a direct step.
        let mut current = plan.source;
        for hop in &plan.hops {
            assert_eq!(direct_step(&current, &hop.target, shape(2, 3)), Some(hop.kind));
            current = hop.target;
        }
    }

    #[test]
    fn test_redundant_to_single_owner_route() {
        let plan = plan(shape(2, 2), 6, 6, d(Dist::Mc, Dist::Star), Descriptor::single_owner(1), 3).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.kinds()[0], StepKind::Filter);
        assert_eq!(plan.kinds()[1], StepKind::Gather);
    }

    #[test]
    fn test_every_pair_has_a_route() {
        for s in [shape(1, 1), shape(2, 2), shape(2, 3), shape(3, 2), shape(1, 4)] {
            let mut all: Vec<Descriptor> = ROUTE_PAIRS.iter().map(|&(c, r)| d(c, r)).collect();
            all.push(Descriptor::single_owner(s.size() - 1));
            for a in &all {
                for b in &all {
                    let p = plan(s, 7, 5, *a, *b, 3);
                    assert!(p.is_ok(), "{a} -> {b} on {s}");
                }
            }
        }
    }

    #[test]
    fn test_max_hops_limits_routes() {
        let err = plan(shape(2, 3), 12, 12, Descriptor::cyclic(), d(Dist::Mr, Dist::Mc), 1).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation { .. }));
    }

    #[test]
    fn test_plan_rejects_invalid_descriptors() {
        let bad = Descriptor {
            col_dist: Dist::Vc,
            row_dist: Dist::Vr,
            col_align: 0,
            row_align: 0,
            root: 0,
        };
        assert!(matches!(
            plan(shape(2, 2), 4, 4, Descriptor::cyclic(), bad, 3),
            Err(Error::InvalidDistribution { .. })
        ));
        assert!(matches!(
            plan(shape(2, 2), 4, 4, Descriptor::cyclic(), Descriptor::single_owner(4), 3),
            Err(Error::GridTopologyError { .. })
        ));
    }

    #[test]
    fn test_plan_display() {
        let plan = plan(shape(2, 2), 4, 4, Descriptor::cyclic(), Descriptor::replicated(), 3).unwrap();
        assert_eq!(plan.to_string(), "[MC,MR] -all-to-all (grid)-> [*,*]");
        assert!(!plan.is_local());
    }
}
