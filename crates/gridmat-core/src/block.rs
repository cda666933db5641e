//! Local Block - Column-Major Process-Local Matrix Storage
//!
//! A [`LocalBlock`] is the contiguous buffer a single process owns for its
//! share of a distributed matrix. Elements are stored column-major with a
//! leading dimension, so a view into a block is just an offset into the same
//! storage with the parent's leading dimension.
//!
//! # Key Features
//! - Bounds-checked element access
//! - Read-only and read-write views sharing the parent's storage
//! - Packing/unpacking of arbitrary row/column index sets for transfers
//! - Strided filtering, the local half of every refinement
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use core::ops::Range;

use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::storage::Storage;

// =============================================================================
// LocalBlock Struct
// =============================================================================

/// Column-major block of elements owned by one process.
#[derive(Debug)]
pub struct LocalBlock<T: Scalar> {
    /// Storage starting at element (0, 0) of this block.
    storage: Storage<T>,
    height: usize,
    width: usize,
    /// Distance between the starts of consecutive columns.
    ldim: usize,
    writable: bool,
    view: bool,
}

impl<T: Scalar> LocalBlock<T> {
    /// Creates a zero-filled block.
    #[must_use]
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            storage: Storage::zeros(height * width),
            height,
            width,
            ldim: height.max(1),
            writable: true,
            view: false,
        }
    }

    /// Creates an empty 0x0 block.
    #[must_use]
    pub fn empty() -> Self {
        Self::zeros(0, 0)
    }

    /// Creates a block from packed column-major data.
    pub fn from_col_major(height: usize, width: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != height * width {
            return Err(Error::SizeMismatch {
                expected: height * width,
                actual: data.len(),
            });
        }
        Ok(Self {
            storage: Storage::from_vec(data),
            height,
            width,
            ldim: height.max(1),
            writable: true,
            view: false,
        })
    }

    /// Creates a block whose element (i, j) is `f(i, j)`.
    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for j in 0..width {
            for i in 0..height {
                data.push(f(i, j));
            }
        }
        Self {
            storage: Storage::from_vec(data),
            height,
            width,
            ldim: height.max(1),
            writable: true,
            view: false,
        }
    }

    /// Returns the number of local rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of local columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns the leading dimension.
    #[must_use]
    pub const fn ldim(&self) -> usize {
        self.ldim
    }

    /// Returns the number of elements in the block.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.height * self.width
    }

    /// Returns true if the block holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// Returns true if this block is a view into another block's storage.
    #[must_use]
    pub const fn is_view(&self) -> bool {
        self.view
    }

    /// Returns true if writes through this block are allowed.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    /// Returns true if both blocks share the same underlying buffer.
    #[must_use]
    pub fn shares_storage(&self, other: &Self) -> bool {
        self.storage.shares_buffer(&other.storage)
    }

    fn check_bounds(&self, i: usize, j: usize) -> Result<()> {
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

    fn check_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::ReadOnlyView)
        }
    }

    /// Returns element (i, j).
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        self.check_bounds(i, j)?;
        Ok(self.storage.as_slice()[i + j * self.ldim])
    }

    /// Sets element (i, j).
    pub fn set(&self, i: usize, j: usize, value: T) -> Result<()> {
        self.check_bounds(i, j)?;
        self.check_writable()?;
        self.storage.as_slice_mut()[i + j * self.ldim] = value;
        Ok(())
    }

    /// Returns the block as packed column-major data.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        // A 0 x n block keeps ldim 1 over empty storage.
        if self.is_empty() {
            return Vec::new();
        }
        let data = self.storage.as_slice();
        let mut out = Vec::with_capacity(self.len());
        for j in 0..self.width {
            let start = j * self.ldim;
            out.extend_from_slice(&data[start..start + self.height]);
        }
        out
    }

    /// Packs the elements at `rows` x `cols`, column-major.
    pub fn pack(&self, rows: &[usize], cols: &[usize]) -> Result<Vec<T>> {
        if let Some(&i) = rows.iter().find(|&&i| i >= self.height) {
            return Err(Error::IndexOutOfBounds {
                index: i,
                size: self.height,
            });
        }
        if let Some(&j) = cols.iter().find(|&&j| j >= self.width) {
            return Err(Error::IndexOutOfBounds {
                index: j,
                size: self.width,
            });
        }

        let data = self.storage.as_slice();
        let mut out = Vec::with_capacity(rows.len() * cols.len());
        for &j in cols {
            let start = j * self.ldim;
            out.extend(rows.iter().map(|&i| data[start + i]));
        }
        Ok(out)
    }

    /// Writes packed column-major `values` to the elements at `rows` x `cols`.
    pub fn unpack(&self, rows: &[usize], cols: &[usize], values: &[T]) -> Result<()> {
        self.check_writable()?;
        if values.len() != rows.len() * cols.len() {
            return Err(Error::SizeMismatch {
                expected: rows.len() * cols.len(),
                actual: values.len(),
            });
        }
        if let Some(&i) = rows.iter().find(|&&i| i >= self.height) {
            return Err(Error::IndexOutOfBounds {
                index: i,
                size: self.height,
            });
        }
        if let Some(&j) = cols.iter().find(|&&j| j >= self.width) {
            return Err(Error::IndexOutOfBounds {
                index: j,
                size: self.width,
            });
        }

        let mut data = self.storage.as_slice_mut();
        let mut next = values.iter();
        for &j in cols {
            let start = j * self.ldim;
            for (&i, &value) in rows.iter().zip(next.by_ref()) {
                data[start + i] = value;
            }
        }
        Ok(())
    }

    /// Copies the strided sub-block starting at (`row_offset`, `col_offset`)
    /// taking every `row_stride`-th row and `col_stride`-th column.
    ///
    /// A zero stride is a programmer error.
    pub fn filter(
        &self,
        row_offset: usize,
        row_stride: usize,
        height: usize,
        col_offset: usize,
        col_stride: usize,
        width: usize,
    ) -> Result<Self> {
        assert!(row_stride > 0 && col_stride > 0, "filter strides must be positive");
        let rows: Vec<usize> = (0..height).map(|k| row_offset + k * row_stride).collect();
        let cols: Vec<usize> = (0..width).map(|k| col_offset + k * col_stride).collect();
        let data = self.pack(&rows, &cols)?;
        Self::from_col_major(height, width, data)
    }

    fn sub_block(&self, rows: Range<usize>, cols: Range<usize>, writable: bool) -> Result<Self> {
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

        let height = rows.end - rows.start;
        let width = cols.end - cols.start;
        let storage = if height == 0 || width == 0 {
            self.storage.slice(0, 0)?
        } else {
            let offset = rows.start + cols.start * self.ldim;
            self.storage.slice(offset, (width - 1) * self.ldim + height)?
        };

        Ok(Self {
            storage,
            height,
            width,
            ldim: self.ldim,
            writable,
            view: true,
        })
    }

    /// Returns a read-only view of the given local row and column ranges.
    pub fn view(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        self.sub_block(rows, cols, false)
    }

    /// Returns a read-write view of the given local row and column ranges.
    pub fn view_mut(&mut self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        self.check_writable()?;
        self.sub_block(rows, cols, true)
    }

    /// Reallocates the block as zero-filled `height` x `width`.
    pub fn resize(&mut self, height: usize, width: usize) -> Result<()> {
        if self.view {
            return Err(Error::invalid_operation("cannot resize a view"));
        }
        *self = Self::zeros(height, width);
        Ok(())
    }

    /// Copies every element of `other` into this block.
    pub fn copy_from(&self, other: &Self) -> Result<()> {
        if self.height != other.height || self.width != other.width {
            return Err(Error::SizeMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        let rows: Vec<usize> = (0..self.height).collect();
        let cols: Vec<usize> = (0..self.width).collect();
        self.unpack(&rows, &cols, &other.to_vec())
    }

    /// Makes an independent, writable, compact copy of this block.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            storage: Storage::from_vec(self.to_vec()),
            height: self.height,
            width: self.width,
            ldim: self.height.max(1),
            writable: true,
            view: false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential(height: usize, width: usize) -> LocalBlock<i32> {
        LocalBlock::from_fn(height, width, |i, j| (i + j * height) as i32)
    }

    #[test]
    fn test_block_zeros() {
        let block = LocalBlock::<f64>::zeros(3, 4);
        assert_eq!(block.height(), 3);
        assert_eq!(block.width(), 4);
        assert_eq!(block.ldim(), 3);
        assert_eq!(block.len(), 12);
        assert!(block.to_vec().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_block_empty_has_unit_ldim() {
        let block = LocalBlock::<f64>::empty();
        assert!(block.is_empty());
        assert_eq!(block.ldim(), 1);
        assert!(block.to_vec().is_empty());
    }

    #[test]
    fn test_block_from_col_major_size_mismatch() {
        let result = LocalBlock::from_col_major(2, 2, vec![1, 2, 3]);
        assert_eq!(
            result.unwrap_err(),
            Error::SizeMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_block_get_set() {
        let block = LocalBlock::<i64>::zeros(2, 3);
        block.set(1, 2, 7).unwrap();
        assert_eq!(block.get(1, 2).unwrap(), 7);
        assert!(block.get(2, 0).is_err());
        assert!(block.set(0, 3, 1).is_err());
    }

    #[test]
    fn test_block_pack_unpack() {
        let block = sequential(4, 3);
        let packed = block.pack(&[1, 3], &[0, 2]).unwrap();
        assert_eq!(packed, vec![1, 3, 9, 11]);

        let target = LocalBlock::<i32>::zeros(4, 3);
        target.unpack(&[1, 3], &[0, 2], &packed).unwrap();
        assert_eq!(target.get(3, 2).unwrap(), 11);
        assert_eq!(target.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_block_unpack_wrong_length() {
        let block = LocalBlock::<i32>::zeros(2, 2);
        let err = block.unpack(&[0, 1], &[0], &[1]).unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_block_filter() {
        let block = sequential(6, 4);
        let filtered = block.filter(1, 2, 3, 0, 3, 2).unwrap();
        assert_eq!(filtered.height(), 3);
        assert_eq!(filtered.width(), 2);
        assert_eq!(filtered.to_vec(), vec![1, 3, 5, 19, 21, 23]);
    }

    #[test]
    #[should_panic(expected = "filter strides must be positive")]
    fn test_block_filter_zero_stride() {
        let block = sequential(2, 2);
        let _ = block.filter(0, 0, 1, 0, 1, 1);
    }

    #[test]
    fn test_block_view_shares_storage() {
        let mut block = sequential(4, 4);
        let view = block.view_mut(1..3, 2..4).unwrap();
        assert!(view.is_view());
        assert!(view.shares_storage(&block));
        assert_eq!(view.ldim(), 4);
        assert_eq!(view.to_vec(), vec![9, 10, 13, 14]);

        view.set(0, 0, -1).unwrap();
        assert_eq!(block.get(1, 2).unwrap(), -1);
    }

    #[test]
    fn test_block_read_only_view() {
        let block = sequential(3, 3);
        let view = block.view(0..2, 0..2).unwrap();
        assert!(!view.is_writable());
        assert_eq!(view.set(0, 0, 5), Err(Error::ReadOnlyView));
        assert_eq!(view.get(1, 1).unwrap(), 4);
    }

    #[test]
    fn test_block_empty_view() {
        let block = sequential(3, 3);
        let view = block.view(3..3, 1..3).unwrap();
        assert!(view.is_empty());
        assert!(view.to_vec().is_empty());
        assert!(block.view(0..4, 0..1).is_err());
    }

    #[test]
    fn test_block_zero_height_wide() {
        let block = LocalBlock::<u32>::zeros(0, 5);
        assert_eq!(block.ldim(), 1);
        assert!(block.to_vec().is_empty());

        let copy = block.deep_copy();
        assert_eq!((copy.height(), copy.width()), (0, 5));
        assert!(copy.pack(&[], &[0, 4]).unwrap().is_empty());

        let target = LocalBlock::<u32>::zeros(0, 5);
        target.copy_from(&block).unwrap();
        assert!(LocalBlock::<u32>::from_col_major(0, 3, Vec::new()).unwrap().to_vec().is_empty());
    }

    #[test]
    fn test_block_resize_rejects_view() {
        let mut block = sequential(3, 3);
        let mut view = block.view_mut(0..1, 0..1).unwrap();
        assert!(view.resize(2, 2).is_err());
        block.resize(1, 5).unwrap();
        assert_eq!((block.height(), block.width()), (1, 5));
    }

    #[test]
    fn test_block_deep_copy_compacts() {
        let block = sequential(4, 4);
        let view = block.view(1..3, 1..3).unwrap();
        let copy = view.deep_copy();
        assert!(!copy.is_view());
        assert!(copy.is_writable());
        assert_eq!(copy.ldim(), 2);
        assert_eq!(copy.to_vec(), view.to_vec());
        assert!(!copy.shares_storage(&block));
    }
}
