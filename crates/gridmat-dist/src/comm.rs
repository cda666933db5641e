//! Communication Primitives - The Building Blocks of Every Redistribution
//!
//! A [`Transfer`] captures one hop of a redistribution: the grid, the global
//! dimensions and the source/target descriptors. Each primitive consumes the
//! calling process's source block and returns its target block:
//!
//! - **Filter**: local strided copy, no communication
//! - **Exchange**: one send and one receive of a whole block
//! - **All-to-all promote**: collective over a grid row, grid column or the
//!   grid, an all-gather when every member wants the same values
//! - **Gather / Scatter**: point-to-point loops to or from a single owner, a
//!   broadcast when the target is replicated
//! - **Sum-scatter**: reduce-scatter of replicated partial sums
//!
//! Message sizes are never exchanged. Both sides derive them from the index
//! mapping and a disagreement is reported as `SizeMismatch`.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use gridmat_core::{Error, LocalBlock, Numeric, Result, Scalar};

use crate::dist::{Descriptor, Dist};
use crate::grid::{CommScope, GridShape, ProcessGrid};
use crate::index::{overlap, DimMap};
use crate::process_group::{tags, ReduceOp};

// =============================================================================
// Transfer
// =============================================================================

/// One hop of a redistribution, as seen from the calling process.
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'a> {
    grid: &'a ProcessGrid,
    height: usize,
    width: usize,
    source: Descriptor,
    target: Descriptor,
    verify: bool,
}

impl<'a> Transfer<'a> {
    /// Creates a hop between two normalized descriptors of an `height x width` matrix.
    #[must_use]
    pub const fn new(
        grid: &'a ProcessGrid,
        height: usize,
        width: usize,
        source: Descriptor,
        target: Descriptor,
    ) -> Self {
        Self {
            grid,
            height,
            width,
            source,
            target,
            verify: true,
        }
    }

    /// Enables or disables the assembled-element count check.
    #[must_use]
    pub const fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// The source descriptor.
    #[must_use]
    pub const fn source(&self) -> &Descriptor {
        &self.source
    }

    /// The target descriptor.
    #[must_use]
    pub const fn target(&self) -> &Descriptor {
        &self.target
    }

    fn shape(&self) -> GridShape {
        self.grid.shape()
    }

    fn rank(&self) -> usize {
        self.grid.rank()
    }

    fn source_maps(&self, rank: usize) -> (DimMap, DimMap) {
        self.source.dim_maps_of(self.shape(), rank)
    }

    fn target_maps(&self, rank: usize) -> (DimMap, DimMap) {
        self.target.dim_maps_of(self.shape(), rank)
    }

    /// Local dimensions of this process's target block.
    #[must_use]
    pub fn target_dims(&self) -> (usize, usize) {
        let (c, r) = self.target_maps(self.rank());
        (c.length(self.height), r.length(self.width))
    }

    fn check_source<T: Scalar>(&self, stage: &str, block: &LocalBlock<T>) -> Result<()> {
        let (c, r) = self.source_maps(self.rank());
        let expected = (c.length(self.height), r.length(self.width));
        if (block.height(), block.width()) == expected {
            Ok(())
        } else {
            Err(Error::corrupt_transfer(
                format!("{stage} input"),
                expected.0 * expected.1,
                block.len(),
            ))
        }
    }

    fn check_assembled(&self, stage: &str, expected: usize, actual: usize) -> Result<()> {
        if self.verify && expected != actual {
            return Err(Error::corrupt_transfer(stage, expected, actual));
        }
        Ok(())
    }

    /// Values of `block` that `rank` holds under the target descriptor.
    fn pack_for<T: Scalar>(&self, block: &LocalBlock<T>, rank: usize) -> Result<Vec<T>> {
        let (sc, sr) = self.source_maps(self.rank());
        let (tc, tr) = self.target_maps(rank);
        let (rows, _) = overlap(self.height, &sc, &tc);
        let (cols, _) = overlap(self.width, &sr, &tr);
        block.pack(&rows, &cols)
    }

    /// Writes the values `rank` packed for this process into `out`.
    fn unpack_from<T: Scalar>(&self, out: &LocalBlock<T>, rank: usize, values: &[T]) -> Result<usize> {
        let (sc, sr) = self.source_maps(rank);
        let (tc, tr) = self.target_maps(self.rank());
        let (_, rows) = overlap(self.height, &sc, &tc);
        let (_, cols) = overlap(self.width, &sr, &tr);
        if values.len() != rows.len() * cols.len() {
            return Err(Error::SizeMismatch {
                expected: rows.len() * cols.len(),
                actual: values.len(),
            });
        }
        out.unpack(&rows, &cols, values)?;
        Ok(values.len())
    }

    // -------------------------------------------------------------------------
    // Copy / Filter
    // -------------------------------------------------------------------------

    /// Copies the block when source and target describe the same layout.
    pub fn copy<T: Scalar>(&self, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        self.check_source("copy", block)?;
        let (th, tw) = self.target_dims();
        if (block.height(), block.width()) != (th, tw) {
            return Err(Error::corrupt_transfer("copy", th * tw, block.len()));
        }
        Ok(block.deep_copy())
    }

    /// Extracts the target block from a source block that already holds it.
    pub fn filter<T: Scalar>(&self, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        self.check_source("filter", block)?;
        let (sc, sr) = self.source_maps(self.rank());
        let (tc, tr) = self.target_maps(self.rank());
        let (row_offset, row_stride, height) = strided(self.height, &sc, &tc)?;
        let (col_offset, col_stride, width) = strided(self.width, &sr, &tr)?;
        block.filter(row_offset, row_stride, height, col_offset, col_stride, width)
    }

    // -------------------------------------------------------------------------
    // Exchange
    // -------------------------------------------------------------------------

    /// Partner ranks (send to, receive from) of a whole-block exchange.
    ///
    /// Requires both descriptors to have equal per-dimension strides and to
    /// depend on the same grid axes; coordinates neither descriptor fixes are
    /// taken from this process.
    #[must_use]
    pub fn exchange_partners(&self) -> Option<(usize, usize)> {
        let shape = self.shape();
        let (row, col) = (self.grid.row(), self.grid.col());
        let (sc, sr) = self.source_maps(self.rank());
        let (tc, tr) = self.target_maps(self.rank());

        let locate = |dims: [(Dist, usize, Option<usize>); 2]| -> Option<usize> {
            let (mut r, mut c) = (None, None);
            for (dist, align, held) in dims {
                let stride = dist.stride(shape);
                let k = (held? + align) % stride;
                let (pr, pc) = dist.position_of(shape, k);
                r = r.or(pr);
                c = c.or(pc);
            }
            Some(shape.rank_of(r.unwrap_or(row), c.unwrap_or(col)))
        };

        // My source block lands where the target shift equals my source shift.
        let send_to = locate([
            (self.target.col_dist, self.target.col_align, sc.shift),
            (self.target.row_dist, self.target.row_align, sr.shift),
        ])?;
        // My target block lives where the source shift equals my target shift.
        let recv_from = locate([
            (self.source.col_dist, self.source.col_align, tc.shift),
            (self.source.row_dist, self.source.row_align, tr.shift),
        ])?;
        Some((send_to, recv_from))
    }

    /// Sends the whole source block to one partner and receives the whole
    /// target block from another.
    pub fn exchange<T: Scalar>(&self, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        self.check_source("exchange", block)?;
        let (th, tw) = self.target_dims();
        let Some((send_to, recv_from)) = self.exchange_partners() else {
            // Not on the diagonal path: nothing held on either side.
            return Ok(LocalBlock::zeros(th, tw));
        };

        let me = self.rank();
        let values = if send_to == me && recv_from == me {
            block.to_vec()
        } else {
            let world = self.grid.world();
            world.send(&block.to_vec(), send_to, tags::EXCHANGE)?;
            world.recv(recv_from, tags::EXCHANGE)?
        };

        if values.len() != th * tw {
            return Err(Error::SizeMismatch {
                expected: th * tw,
                actual: values.len(),
            });
        }
        LocalBlock::from_col_major(th, tw, values)
    }

    // -------------------------------------------------------------------------
    // All-to-all
    // -------------------------------------------------------------------------

    /// Redistributes within a communicator: every member sends each other
    /// member the part of its block that member holds under the target.
    pub fn all_to_all_promote<T: Scalar>(&self, scope: CommScope, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        self.check_source("all-to-all", block)?;
        let group = self.grid.comm(scope);
        let mine = self.target_maps(self.rank());
        let uniform = group.ranks().iter().all(|&q| self.target_maps(q) == mine);
        let recvs = if uniform {
            // Every member wants the same part of each block.
            group.all_gather(&self.pack_for(block, self.rank())?)?
        } else {
            let sends = group
                .ranks()
                .iter()
                .map(|&q| self.pack_for(block, q))
                .collect::<Result<Vec<_>>>()?;
            group.all_to_all(&sends)?
        };

        let (th, tw) = self.target_dims();
        let out = LocalBlock::zeros(th, tw);
        let mut assembled = 0;
        for (&q, values) in group.ranks().iter().zip(&recvs) {
            assembled += self.unpack_from(&out, q, values)?;
        }
        self.check_assembled("all-to-all", out.len(), assembled)?;
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Gather / Scatter
    // -------------------------------------------------------------------------

    /// Collects a non-redundant source onto the target's single owner.
    pub fn gather<T: Scalar>(&self, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        self.check_source("gather", block)?;
        let root = self.target.root;
        let me = self.rank();
        let world = self.grid.world();
        let (th, tw) = self.target_dims();

        if me != root {
            if !block.is_empty() {
                world.send(&block.to_vec(), root, tags::GATHER)?;
            }
            return Ok(LocalBlock::zeros(th, tw));
        }

        let out = LocalBlock::zeros(th, tw);
        let mut assembled = 0;
        for q in 0..self.grid.size() {
            let (qc, qr) = self.source_maps(q);
            let rows = qc.indices(self.height);
            let cols = qr.indices(self.width);
            if rows.is_empty() || cols.is_empty() {
                continue;
            }
            let values = if q == me {
                block.to_vec()
            } else {
                world.recv(q, tags::GATHER)?
            };
            if values.len() != rows.len() * cols.len() {
                return Err(Error::SizeMismatch {
                    expected: rows.len() * cols.len(),
                    actual: values.len(),
                });
            }
            out.unpack(&rows, &cols, &values)?;
            assembled += values.len();
        }
        self.check_assembled("gather", out.len(), assembled)?;
        Ok(out)
    }

    /// Sends every process its target block from the source's single owner.
    ///
    /// A fully replicated target is a broadcast of the whole block.
    pub fn scatter<T: Scalar>(&self, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        self.check_source("scatter", block)?;
        let root = self.source.root;
        let me = self.rank();
        let world = self.grid.world();
        let (th, tw) = self.target_dims();

        if self.target.is_replicated() {
            let values = world.broadcast(&block.to_vec(), root)?;
            if values.len() != th * tw {
                return Err(Error::SizeMismatch {
                    expected: th * tw,
                    actual: values.len(),
                });
            }
            return LocalBlock::from_col_major(th, tw, values);
        }

        if me == root {
            let mut own = Vec::new();
            for q in 0..self.grid.size() {
                let (qc, qr) = self.target_maps(q);
                let rows = qc.indices(self.height);
                let cols = qr.indices(self.width);
                if rows.is_empty() || cols.is_empty() {
                    continue;
                }
                let values = block.pack(&rows, &cols)?;
                if q == me {
                    own = values;
                } else {
                    world.send(&values, q, tags::SCATTER)?;
                }
            }
            return LocalBlock::from_col_major(th, tw, own)
                .map_err(|_| Error::corrupt_transfer("scatter", th * tw, 0));
        }

        if th * tw == 0 {
            return Ok(LocalBlock::zeros(th, tw));
        }
        let values = world.recv(root, tags::SCATTER)?;
        if values.len() != th * tw {
            return Err(Error::SizeMismatch {
                expected: th * tw,
                actual: values.len(),
            });
        }
        LocalBlock::from_col_major(th, tw, values)
    }

    // -------------------------------------------------------------------------
    // Sum-scatter
    // -------------------------------------------------------------------------

    /// Communicator over which the source is replicated, if it is replicated at all.
    #[must_use]
    pub fn replication_scope(&self) -> Option<CommScope> {
        match (self.source.uses_rows(), self.source.uses_cols()) {
            (true, true) => None,
            (true, false) => Some(CommScope::GridRow),
            (false, true) => Some(CommScope::GridColumn),
            (false, false) => Some(CommScope::Grid),
        }
    }

    /// Sums the replicated copies of the source and scatters the totals into
    /// the target layout.
    ///
    /// Every process's source block holds partial sums; the result at each
    /// target element is the sum of that element over all copies.
    pub fn sum_scatter<T: Numeric>(&self, block: &LocalBlock<T>) -> Result<LocalBlock<T>> {
        let Some(scope) = self.replication_scope() else {
            return self.filter(block);
        };
        self.check_source("sum-scatter", block)?;

        let group = self.grid.comm(scope);
        let contributions = group
            .ranks()
            .iter()
            .map(|&q| self.pack_for(block, q))
            .collect::<Result<Vec<_>>>()?;
        let values = group.reduce_scatter(&contributions, ReduceOp::Sum)?;

        let (th, tw) = self.target_dims();
        if values.len() != th * tw {
            return Err(Error::SizeMismatch {
                expected: th * tw,
                actual: values.len(),
            });
        }
        LocalBlock::from_col_major(th, tw, values)
    }
}

/// (offset, stride, length) of the target indices inside the source's local indices.
fn strided(n: usize, source: &DimMap, target: &DimMap) -> Result<(usize, usize, usize)> {
    let len = target.length(n);
    if len == 0 {
        return Ok((0, 1, 0));
    }
    let first = target.local_to_global(0).unwrap_or_default();
    let offset = source.global_to_local(first).ok_or_else(|| {
        Error::distribution_mismatch(format!("index {first} is not held locally and cannot be filtered"))
    })?;
    if target.stride % source.stride != 0 {
        return Err(Error::distribution_mismatch(format!(
            "target stride {} is not a multiple of source stride {}",
            target.stride, source.stride
        )));
    }
    Ok((offset, target.stride / source.stride, len))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;

    fn desc(col: Dist, row: Dist) -> Descriptor {
        Descriptor::new(col, row).unwrap()
    }

    /// Local block of `desc` filled with the global value `i + j * m`.
    fn block_of(grid: &ProcessGrid, desc: &Descriptor, m: usize, n: usize) -> LocalBlock<i64> {
        let (c, r) = desc.dim_maps(grid.shape(), grid.row(), grid.col());
        let rows = c.indices(m);
        let cols = r.indices(n);
        LocalBlock::from_fn(rows.len(), cols.len(), |i, j| (rows[i] + cols[j] * m) as i64)
    }

    fn on_grid<R: Send>(size: usize, height: usize, f: impl Fn(&ProcessGrid) -> R + Sync) -> Vec<R> {
        LocalBackend::run_world(size, |backend| {
            let grid = ProcessGrid::new(backend, height).unwrap();
            f(&grid)
        })
    }

    #[test]
    fn test_strided() {
        // [MC,*] on 2 rows -> [VC,*] on a 2x3 grid, process (1, 2): vc = 5.
        let source = DimMap::cyclic(2, 1);
        let target = DimMap::cyclic(6, 5);
        assert_eq!(strided(12, &source, &target).unwrap(), (2, 3, 2));
        assert_eq!(strided(3, &source, &target).unwrap(), (0, 1, 0));
        assert!(strided(12, &DimMap::cyclic(2, 0), &target).is_err());
    }

    #[test]
    fn test_filter_is_silent() {
        let results = on_grid(4, 2, |grid| {
            let (m, n) = (5, 7);
            let source = Descriptor::replicated();
            let target = desc(Dist::Mc, Dist::Mr).aligned(1, 0);
            let before = grid.world().stats();
            let out = Transfer::new(grid, m, n, source, target)
                .filter(&block_of(grid, &source, m, n))
                .unwrap();
            let expected = block_of(grid, &target, m, n);
            (out.to_vec() == expected.to_vec(), grid.world().stats().since(&before).is_silent())
        });
        assert!(results.iter().all(|&(ok, silent)| ok && silent));
    }

    #[test]
    fn test_exchange_square_transpose() {
        let results = on_grid(4, 2, |grid| {
            let (m, n) = (5, 6);
            let source = desc(Dist::Mc, Dist::Mr);
            let target = desc(Dist::Mr, Dist::Mc);
            let transfer = Transfer::new(grid, m, n, source, target);
            let out = transfer.exchange(&block_of(grid, &source, m, n)).unwrap();
            out.to_vec() == block_of(grid, &target, m, n).to_vec()
        });
        assert_eq!(results, vec![true; 4]);
    }

    #[test]
    fn test_exchange_vector_orders() {
        let results = on_grid(6, 2, |grid| {
            let (m, n) = (13, 2);
            let source = desc(Dist::Vc, Dist::Star).aligned(1, 0);
            let target = desc(Dist::Vr, Dist::Star).aligned(4, 0);
            let out = Transfer::new(grid, m, n, source, target)
                .exchange(&block_of(grid, &source, m, n))
                .unwrap();
            out.to_vec() == block_of(grid, &target, m, n).to_vec()
        });
        assert_eq!(results, vec![true; 6]);
    }

    #[test]
    fn test_all_to_all_within_row() {
        let results = on_grid(6, 2, |grid| {
            let (m, n) = (7, 9);
            let source = desc(Dist::Mc, Dist::Mr);
            let target = desc(Dist::Mc, Dist::Star);
            let out = Transfer::new(grid, m, n, source, target)
                .all_to_all_promote(CommScope::GridRow, &block_of(grid, &source, m, n))
                .unwrap();
            out.to_vec() == block_of(grid, &target, m, n).to_vec()
        });
        assert_eq!(results, vec![true; 6]);
    }

    #[test]
    fn test_all_to_all_to_vector_layout() {
        // Members of a grid row want different rows, so this is a true all-to-all.
        let results = on_grid(6, 2, |grid| {
            let (m, n) = (11, 4);
            let source = desc(Dist::Mc, Dist::Mr).aligned(1, 2);
            let target = desc(Dist::Vc, Dist::Star).aligned(1, 0);
            let out = Transfer::new(grid, m, n, source, target)
                .all_to_all_promote(CommScope::GridRow, &block_of(grid, &source, m, n))
                .unwrap();
            out.to_vec() == block_of(grid, &target, m, n).to_vec()
        });
        assert_eq!(results, vec![true; 6]);
    }

    #[test]
    fn test_all_to_all_detects_incomplete_group() {
        // [MC,MR] -> [*,*] cannot be assembled within a grid row.
        let results = on_grid(4, 2, |grid| {
            let source = desc(Dist::Mc, Dist::Mr);
            let transfer = Transfer::new(grid, 4, 4, source, Descriptor::replicated());
            transfer.all_to_all_promote(CommScope::GridRow, &block_of(grid, &source, 4, 4))
        });
        for result in results {
            assert!(matches!(result, Err(Error::CorruptTransfer { .. })));
        }
    }

    #[test]
    fn test_gather_and_scatter() {
        let results = on_grid(6, 3, |grid| {
            let (m, n) = (4, 5);
            let source = desc(Dist::Vr, Dist::Star).aligned(2, 0);
            let root = Descriptor::single_owner(4);
            let gathered = Transfer::new(grid, m, n, source, root)
                .gather(&block_of(grid, &source, m, n))
                .unwrap();
            let target = desc(Dist::Star, Dist::Mc);
            let scattered = Transfer::new(grid, m, n, root, target).scatter(&gathered).unwrap();
            (
                gathered.to_vec() == block_of(grid, &root, m, n).to_vec(),
                scattered.to_vec() == block_of(grid, &target, m, n).to_vec(),
            )
        });
        assert_eq!(results, vec![(true, true); 6]);
    }

    #[test]
    fn test_scatter_to_replicated() {
        let results = on_grid(4, 2, |grid| {
            let (m, n) = (3, 4);
            let root = Descriptor::single_owner(1);
            let target = Descriptor::replicated();
            let out = Transfer::new(grid, m, n, root, target)
                .scatter(&block_of(grid, &root, m, n))
                .unwrap();
            (out.height(), out.width(), out.to_vec() == block_of(grid, &target, m, n).to_vec())
        });
        assert_eq!(results, vec![(3, 4, true); 4]);
    }

    #[test]
    fn test_sum_scatter() {
        let results = on_grid(4, 2, |grid| {
            let (m, n) = (3, 5);
            let source = desc(Dist::Mc, Dist::Star);
            let target = desc(Dist::Mc, Dist::Mr);
            // Each grid column holds a copy of the matrix scaled by (col + 1).
            let scale = grid.col() as i64 + 1;
            let partial = block_of(grid, &source, m, n);
            let partial = LocalBlock::from_fn(partial.height(), partial.width(), |i, j| {
                partial.get(i, j).unwrap() * scale
            });
            let transfer = Transfer::new(grid, m, n, source, target);
            assert_eq!(transfer.replication_scope(), Some(CommScope::GridRow));
            let out = transfer.sum_scatter(&partial).unwrap();
            // Scales 1 + 2 = 3.
            let expected: Vec<i64> = block_of(grid, &target, m, n).to_vec().iter().map(|v| v * 3).collect();
            out.to_vec() == expected
        });
        assert_eq!(results, vec![true; 4]);
    }

    #[test]
    fn test_wrong_source_block_is_rejected() {
        let results = on_grid(1, 1, |grid| {
            let transfer = Transfer::new(grid, 2, 2, Descriptor::cyclic(), Descriptor::replicated());
            transfer.filter(&LocalBlock::<f32>::zeros(1, 2))
        });
        assert!(matches!(results[0], Err(Error::CorruptTransfer { .. })));
    }
}
