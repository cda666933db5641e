//! Gridmat Core - Foundation Layer for Distributed Dense Matrices
//!
//! This crate provides the process-local building blocks that the
//! redistribution engine in `gridmat-dist` is assembled from: element types
//! that can travel over a byte transport, the error taxonomy shared by every
//! layer, reference-counted storage, and the column-major local block a
//! single process owns for its share of a distributed matrix.
//!
//! # Key Features
//! - Plain-old-data element types (integers, f32, f64 and their complex forms)
//! - Unified error type covering distribution, transfer and topology failures
//! - Reference-counted storage so views never copy
//! - Column-major local blocks with a leading dimension and strided filters
//!
//! # Example
//! ```rust
//! use gridmat_core::LocalBlock;
//!
//! let block = LocalBlock::<f64>::zeros(3, 2);
//! block.set(1, 1, 4.0).unwrap();
//! assert_eq!(block.get(1, 1).unwrap(), 4.0);
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Index-arithmetic allowances
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_range_loop)]

// =============================================================================
// Modules
// =============================================================================

pub mod block;
pub mod dtype;
pub mod error;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use block::LocalBlock;
pub use dtype::{DType, Numeric, Scalar};
pub use error::{Error, Result};
pub use storage::Storage;

pub use num_complex::Complex;

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::block::LocalBlock;
    pub use crate::dtype::{DType, Numeric, Scalar};
    pub use crate::error::{Error, Result};
    pub use crate::storage::Storage;
    pub use num_complex::Complex;
}
