//! Storage - Shared Element Buffers
//!
//! The buffer behind every local block. A view of a block slices the same
//! buffer through an offset and a length, so views never copy and writes
//! through a read-write view are visible in the parent block.
//!
//! # Example
//! ```rust
//! use gridmat_core::Storage;
//!
//! let storage = Storage::from_vec(vec![1_i32, 2, 3, 4]);
//! let tail = storage.slice(2, 2).unwrap();
//! tail.as_slice_mut()[0] = 30;
//! assert_eq!(&*storage.as_slice(), &[1, 2, 30, 4]);
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use core::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dtype::Scalar;
use crate::error::{Error, Result};

// =============================================================================
// Storage
// =============================================================================

/// A window `[offset, offset + len)` onto a reference-counted element buffer.
///
/// `Clone` shares the buffer.
#[derive(Debug)]
pub struct Storage<T: Scalar> {
    buffer: Arc<RwLock<Vec<T>>>,
    offset: usize,
    len: usize,
}

impl<T: Scalar> Storage<T> {
    /// Allocates `len` zeroed elements.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::zeroed(); len])
    }

    /// Takes ownership of `data`.
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            buffer: Arc::new(RwLock::new(data)),
            offset: 0,
            len,
        }
    }

    /// Number of elements in the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the window holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A narrower window starting `offset` elements into this one.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        if offset + len > self.len {
            return Err(Error::IndexOutOfBounds {
                index: offset + len,
                size: self.len,
            });
        }
        Ok(Self {
            buffer: Arc::clone(&self.buffer),
            offset: self.offset + offset,
            len,
        })
    }

    /// True if both windows look into the same buffer.
    #[must_use]
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    fn window(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Locks the buffer for reading.
    #[must_use]
    pub fn as_slice(&self) -> StorageReadGuard<'_, T> {
        StorageReadGuard {
            guard: self.buffer.read(),
            window: self.window(),
        }
    }

    /// Locks the buffer for writing.
    #[must_use]
    pub fn as_slice_mut(&self) -> StorageWriteGuard<'_, T> {
        StorageWriteGuard {
            guard: self.buffer.write(),
            window: self.window(),
        }
    }
}

impl<T: Scalar> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            offset: self.offset,
            len: self.len,
        }
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Shared lock on a storage window.
pub struct StorageReadGuard<'a, T: Scalar> {
    guard: RwLockReadGuard<'a, Vec<T>>,
    window: Range<usize>,
}

impl<T: Scalar> Deref for StorageReadGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.guard[self.window.clone()]
    }
}

/// Exclusive lock on a storage window.
pub struct StorageWriteGuard<'a, T: Scalar> {
    guard: RwLockWriteGuard<'a, Vec<T>>,
    window: Range<usize>,
}

impl<T: Scalar> Deref for StorageWriteGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.guard[self.window.clone()]
    }
}

impl<T: Scalar> DerefMut for StorageWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.guard[self.window.clone()]
    }
}

// =============================================================================
// Tests
// =============================================================================
