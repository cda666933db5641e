//! `DistMatrix` - Distributed Dense Matrix Handle
//!
//! A [`DistMatrix`] is one process's handle on an `height x width` matrix laid
//! out over a process grid by a [`Descriptor`]. It owns the local block the
//! index mapping assigns to this process and a shared pointer to the grid.
//!
//! Element access comes in two flavours: local accessors address the block
//! directly, global accessors translate through the index mapping and report
//! `None`/`false` for elements held elsewhere. Redistribution, assignment and
//! global collection are collective: every process of the grid must call them
//! in the same order.
//!
//! # Example
//! ```rust
//! use gridmat_dist::prelude::*;
//! use std::sync::Arc;
//!
//! let totals = LocalBackend::run_world(4, |backend| {
//!     let grid = Arc::new(ProcessGrid::square(backend).unwrap());
//!     let a = DistMatrix::from_fn(grid, 4, 4, Descriptor::cyclic(), |i, j| (i + 4 * j) as i64).unwrap();
//!     a.to_global_vec().unwrap().iter().sum::<i64>()
//! });
//! assert_eq!(totals, vec![120; 4]);
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use core::ops::Range;
use std::sync::Arc;

use gridmat_core::{Error, LocalBlock, Numeric, Result, Scalar};

use crate::dist::{Descriptor, Dist};
use crate::grid::ProcessGrid;
use crate::index::DimMap;
use crate::redist::Redistributor;

// =============================================================================
// DistMatrix
// =============================================================================

/// One process's share of a distributed matrix.
#[derive(Debug)]
pub struct DistMatrix<T: Scalar> {
    grid: Arc<ProcessGrid>,
    desc: Descriptor,
    height: usize,
    width: usize,
    col_map: DimMap,
    row_map: DimMap,
    block: LocalBlock<T>,
}

impl<T: Scalar> DistMatrix<T> {
    /// Creates a 0x0 matrix with the given layout.
    pub fn new(grid: Arc<ProcessGrid>, desc: Descriptor) -> Result<Self> {
        Self::zeros(grid, 0, 0, desc)
    }

    /// Creates a zero-filled `height x width` matrix.
    pub fn zeros(grid: Arc<ProcessGrid>, height: usize, width: usize, desc: Descriptor) -> Result<Self> {
        let desc = desc.normalize(grid.shape())?;
        let (col_map, row_map) = desc.dim_maps(grid.shape(), grid.row(), grid.col());
        let block = LocalBlock::zeros(col_map.length(height), row_map.length(width));
        Ok(Self {
            grid,
            desc,
            height,
            width,
            col_map,
            row_map,
            block,
        })
    }

    /// Creates a matrix whose global element (i, j) is `f(i, j)`.
    ///
    /// `f` is only evaluated for the elements this process holds.
    pub fn from_fn(
        grid: Arc<ProcessGrid>,
        height: usize,
        width: usize,
        desc: Descriptor,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Result<Self> {
        let mut matrix = Self::zeros(grid, height, width, desc)?;
        let rows = matrix.col_map.indices(height);
        let cols = matrix.row_map.indices(width);
        matrix.block = LocalBlock::from_fn(rows.len(), cols.len(), |li, lj| f(rows[li], cols[lj]));
        Ok(matrix)
    }

    /// Wraps a block produced by a transfer, checking its dimensions.
    pub(crate) fn from_parts(
        grid: Arc<ProcessGrid>,
        height: usize,
        width: usize,
        desc: Descriptor,
        block: LocalBlock<T>,
    ) -> Result<Self> {
        let (col_map, row_map) = desc.dim_maps(grid.shape(), grid.row(), grid.col());
        let expected = (col_map.length(height), row_map.length(width));
        if (block.height(), block.width()) != expected {
            return Err(Error::corrupt_transfer(
                format!("assembling {desc}"),
                expected.0 * expected.1,
                block.len(),
            ));
        }
        Ok(Self {
            grid,
            desc,
            height,
            width,
            col_map,
            row_map,
            block,
        })
    }

    /// Reallocates as a zero-filled `height x width` matrix with the same layout.
    pub fn resize(&mut self, height: usize, width: usize) -> Result<()> {
        if self.block.is_view() {
            return Err(Error::invalid_operation("cannot resize a view"));
        }
        self.block = LocalBlock::zeros(self.col_map.length(height), self.row_map.length(width));
        self.height = height;
        self.width = width;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The grid the matrix lives on.
    #[must_use]
    pub fn grid(&self) -> &Arc<ProcessGrid> {
        &self.grid
    }

    /// The (normalized) layout.
    #[must_use]
    pub const fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    /// Distribution of the rows.
    #[must_use]
    pub const fn col_dist(&self) -> Dist {
        self.desc.col_dist
    }

    /// Distribution of the columns.
    #[must_use]
    pub const fn row_dist(&self) -> Dist {
        self.desc.row_dist
    }

    /// Global number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Global number of columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows held by this process.
    #[must_use]
    pub const fn local_height(&self) -> usize {
        self.block.height()
    }

    /// Columns held by this process.
    #[must_use]
    pub const fn local_width(&self) -> usize {
        self.block.width()
    }

    /// The local block.
    #[must_use]
    pub const fn block(&self) -> &LocalBlock<T> {
        &self.block
    }

    /// Index map of the rows.
    #[must_use]
    pub const fn col_map(&self) -> &DimMap {
        &self.col_map
    }

    /// Index map of the columns.
    #[must_use]
    pub const fn row_map(&self) -> &DimMap {
        &self.row_map
    }

    /// True if this handle is a view into another matrix.
    #[must_use]
    pub const fn is_view(&self) -> bool {
        self.block.is_view()
    }

    /// True if writes through this handle are allowed.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.block.is_writable()
    }

    /// Global row of local row `li`.
    #[must_use]
    pub fn global_row(&self, li: usize) -> Option<usize> {
        (li < self.local_height())
            .then(|| self.col_map.local_to_global(li))
            .flatten()
    }

    /// Global column of local column `lj`.
    #[must_use]
    pub fn global_col(&self, lj: usize) -> Option<usize> {
        (lj < self.local_width())
            .then(|| self.row_map.local_to_global(lj))
            .flatten()
    }

    /// Local row of global row `i`, if held here.
    #[must_use]
    pub fn local_row(&self, i: usize) -> Option<usize> {
        (i < self.height).then(|| self.col_map.global_to_local(i)).flatten()
    }

    /// Local column of global column `j`, if held here.
    #[must_use]
    pub fn local_col(&self, j: usize) -> Option<usize> {
        (j < self.width).then(|| self.row_map.global_to_local(j)).flatten()
    }

    /// True if element (i, j) is held by this process.
    #[must_use]
    pub fn is_local(&self, i: usize, j: usize) -> bool {
        self.local_row(i).is_some() && self.local_col(j).is_some()
    }

    fn check_global(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: i,
                size: self.height,
            });
        }
        if j >= self.width {
            return Err(Error::IndexOutOfBounds {
                index: j,
                size: self.width,
            });
        }
        Ok(())
    }

    /// Returns global element (i, j) if this process holds it.
    pub fn get(&self, i: usize, j: usize) -> Result<Option<T>> {
        self.check_global(i, j)?;
        match (self.local_row(i), self.local_col(j)) {
            (Some(li), Some(lj)) => self.block.get(li, lj).map(Some),
            _ => Ok(None),
        }
    }

    /// Sets global element (i, j) if this process holds it; returns whether it did.
    pub fn set(&self, i: usize, j: usize, value: T) -> Result<bool> {
        self.check_global(i, j)?;
        match (self.local_row(i), self.local_col(j)) {
            (Some(li), Some(lj)) => self.block.set(li, lj, value).map(|()| true),
            _ => Ok(false),
        }
    }

    /// Returns local element (li, lj).
    pub fn get_local(&self, li: usize, lj: usize) -> Result<T> {
        self.block.get(li, lj)
    }

    /// Sets local element (li, lj).
    pub fn set_local(&self, li: usize, lj: usize, value: T) -> Result<()> {
        self.block.set(li, lj, value)
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    fn sub_matrix(&self, rows: &Range<usize>, cols: &Range<usize>) -> Result<(Descriptor, Range<usize>, Range<usize>)> {
        if rows.start > rows.end || rows.end > self.height {
            return Err(Error::IndexOutOfBounds {
                index: rows.end,
                size: self.height,
            });
        }
        if cols.start > cols.end || cols.end > self.width {
            return Err(Error::IndexOutOfBounds {
                index: cols.end,
                size: self.width,
            });
        }

        let shape = self.grid.shape();
        let shift_align = |dist: Dist, align: usize, offset: usize| match dist {
            Dist::Star | Dist::Circ => 0,
            _ => (align + offset) % dist.stride(shape),
        };
        let desc = Descriptor {
            col_align: shift_align(self.desc.col_dist, self.desc.col_align, rows.start),
            row_align: shift_align(self.desc.row_dist, self.desc.row_align, cols.start),
            ..self.desc
        };

        let local_rows = self.col_map.length(rows.start)..self.col_map.length(rows.end);
        let local_cols = self.row_map.length(cols.start)..self.row_map.length(cols.end);
        Ok((desc, local_rows, local_cols))
    }

    fn wrap_view(&self, desc: Descriptor, rows: &Range<usize>, cols: &Range<usize>, block: LocalBlock<T>) -> Result<Self> {
        Self::from_parts(
            Arc::clone(&self.grid),
            rows.end - rows.start,
            cols.end - cols.start,
            desc,
            block,
        )
    }

    /// Read-only view of global rows `rows` and columns `cols`.
    ///
    /// The view shares storage with this matrix and is itself a distributed
    /// matrix whose alignments are shifted by the view offset.
    pub fn view(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        let (desc, local_rows, local_cols) = self.sub_matrix(&rows, &cols)?;
        let block = self.block.view(local_rows, local_cols)?;
        self.wrap_view(desc, &rows, &cols, block)
    }

    /// Read-write view of global rows `rows` and columns `cols`.
    pub fn view_mut(&mut self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        let (desc, local_rows, local_cols) = self.sub_matrix(&rows, &cols)?;
        let block = self.block.view_mut(local_rows, local_cols)?;
        self.wrap_view(desc, &rows, &cols, block)
    }

    // -------------------------------------------------------------------------
    // Collective Operations
    // -------------------------------------------------------------------------

    /// Returns this matrix redistributed to `target` (default configuration).
    pub fn redistribute(&self, target: &Descriptor) -> Result<Self> {
        Redistributor::default().redistribute(self, target)
    }

    /// Overwrites this matrix with `source`'s values, keeping this matrix's layout.
    ///
    /// A view keeps its dimensions and must match `source`'s; any other
    /// handle takes on `source`'s dimensions.
    pub fn assign(&mut self, source: &Self) -> Result<()> {
        if !Arc::ptr_eq(&self.grid, &source.grid) && !self.grid.same_topology(&source.grid) {
            return Err(Error::distribution_mismatch(format!(
                "source lives on a {} grid, target on a {} grid",
                source.grid.shape(),
                self.grid.shape()
            )));
        }
        if self.is_view() && (self.height, self.width) != (source.height, source.width) {
            return Err(Error::distribution_mismatch(format!(
                "cannot assign a {}x{} matrix to a {}x{} view",
                source.height, source.width, self.height, self.width
            )));
        }
        if !self.is_writable() {
            return Err(Error::ReadOnlyView);
        }

        let result = source.redistribute(&self.desc)?;
        if self.is_view() {
            self.block.copy_from(&result.block)
        } else {
            self.height = result.height;
            self.width = result.width;
            self.block = result.block;
            Ok(())
        }
    }

    /// Collects the whole matrix, column-major, on every process.
    pub fn to_global_vec(&self) -> Result<Vec<T>> {
        let full = self.redistribute(&Descriptor::replicated())?;
        Ok(full.block.to_vec())
    }
}

impl<T: Numeric> DistMatrix<T> {
    /// Sums replicated partial values into `target` (default configuration).
    pub fn contract(&self, target: &Descriptor) -> Result<Self> {
        Redistributor::default().contract(self, target)
    }
}

impl<T: Scalar> Clone for DistMatrix<T> {
    /// Deep copy: the clone owns a compact, writable block.
    fn clone(&self) -> Self {
        Self {
            grid: Arc::clone(&self.grid),
            desc: self.desc,
            height: self.height,
            width: self.width,
            col_map: self.col_map,
            row_map: self.row_map,
            block: self.block.deep_copy(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;

    fn single_grid() -> Arc<ProcessGrid> {
        Arc::new(ProcessGrid::new(Arc::new(LocalBackend::single()), 1).unwrap())
    }

    #[test]
    fn test_matrix_new_is_empty() {
        let a = DistMatrix::<f64>::new(single_grid(), Descriptor::cyclic()).unwrap();
        assert_eq!((a.height(), a.width()), (0, 0));
        assert_eq!((a.local_height(), a.local_width()), (0, 0));
    }

    #[test]
    fn test_matrix_resize_clears() {
        let mut a = DistMatrix::from_fn(single_grid(), 2, 2, Descriptor::cyclic(), |_, _| 1.0_f32).unwrap();
        a.resize(3, 1).unwrap();
        assert_eq!((a.local_height(), a.local_width()), (3, 1));
        assert_eq!(a.get(2, 0).unwrap(), Some(0.0));
    }

    #[test]
    fn test_matrix_global_access_bounds() {
        let a = DistMatrix::<i32>::zeros(single_grid(), 2, 3, Descriptor::replicated()).unwrap();
        assert!(a.set(1, 2, 9).unwrap());
        assert_eq!(a.get(1, 2).unwrap(), Some(9));
        assert_eq!(a.get_local(1, 2).unwrap(), 9);
        assert_eq!(
            a.get(2, 0).unwrap_err(),
            Error::IndexOutOfBounds { index: 2, size: 2 }
        );
        assert!(a.set_local(0, 3, 1).is_err());
    }

    #[test]
    fn test_matrix_local_global_translation() {
        let results = LocalBackend::run_world(4, |backend| {
            let grid = Arc::new(ProcessGrid::new(backend, 2).unwrap());
            let a = DistMatrix::<u32>::zeros(grid, 5, 4, Descriptor::cyclic().aligned(1, 0)).unwrap();
            (
                a.grid().rank(),
                a.local_height(),
                a.global_row(0),
                a.local_row(3),
                a.is_local(0, 2),
            )
        });
        // Rank 1 is grid row 1: with alignment 1 it owns rows 0, 2, 4.
        assert_eq!(results[1], (1, 3, Some(0), None, true));
        // Rank 0 is grid row 0: owns rows 1, 3.
        assert_eq!(results[0], (0, 2, Some(1), Some(1), false));
    }

    #[test]
    fn test_matrix_view_alignment() {
        let results = LocalBackend::run_world(4, |backend| {
            let grid = Arc::new(ProcessGrid::new(backend, 2).unwrap());
            let a = DistMatrix::from_fn(grid, 6, 6, Descriptor::cyclic(), |i, j| (i * 10 + j) as i64).unwrap();
            let v = a.view(1..5, 2..6).unwrap();
            let values: Vec<(usize, usize, i64)> = (0..4)
                .flat_map(|i| (0..4).map(move |j| (i, j)))
                .filter_map(|(i, j)| v.get(i, j).unwrap().map(|x| (i, j, x)))
                .collect();
            (v.descriptor().col_align, v.descriptor().row_align, v.is_writable(), values)
        });

        let mut held = 0;
        for (col_align, row_align, writable, values) in results {
            assert_eq!((col_align, row_align), (1, 0));
            assert!(!writable);
            for (i, j, x) in values {
                assert_eq!(x, ((i + 1) * 10 + j + 2) as i64);
                held += 1;
            }
        }
        assert_eq!(held, 16);
    }

    #[test]
    fn test_matrix_clone_is_deep() {
        let a = DistMatrix::from_fn(single_grid(), 2, 2, Descriptor::cyclic(), |i, j| (i + j) as u64).unwrap();
        let b = a.clone();
        b.set(0, 0, 7).unwrap();
        assert_eq!(a.get(0, 0).unwrap(), Some(0));
        assert_eq!(b.get(0, 0).unwrap(), Some(7));
    }

    #[test]
    fn test_matrix_view_resize_rejected() {
        let mut a = DistMatrix::<f64>::zeros(single_grid(), 3, 3, Descriptor::cyclic()).unwrap();
        let mut v = a.view_mut(0..2, 0..2).unwrap();
        assert!(v.resize(1, 1).is_err());
        assert!(a.view(0..4, 0..1).is_err());
    }
}
