//! Gridmat Distributed - Dense Matrix Redistribution over a 2D Process Grid
//!
//! Every process of a job holds a rectangular share of each distributed
//! matrix, chosen by a distribution descriptor such as `[MC,MR]` (2D
//! element-cyclic), `[VC,*]` (rows dealt over all processes), `[*,*]` (full
//! replication) or `[o,o]` (one owner). This crate converts matrices between
//! such layouts with collective communication.
//!
//! # Features
//!
//! ## Layout
//! - **Process Grid** - `height x width` arrangement with column, row and diagonal subgroups
//! - **Descriptors** - Fourteen valid distribution pairs with alignments and a root
//! - **Index Mapping** - Closed-form owner, shift and local length computations
//!
//! ## Redistribution
//! - **Planner** - Constant-time direct-step dispatch plus a bounded route search
//! - **Primitives** - Filter, exchange, all-to-all promotion, gather, scatter, sum-scatter
//! - **Views** - Sub-matrix views that are themselves distributed matrices
//!
//! ## Transport
//! - **Backend** trait for point-to-point byte messages
//! - In-process `LocalBackend` with one thread per rank for tests and single-node runs
//! - Process groups with all-to-all, all-gather, broadcast and reduce-scatter
//!
//! # Example
//!
//! ```rust
//! use gridmat_dist::prelude::*;
//! use std::sync::Arc;
//!
//! let sums = LocalBackend::run_world(4, |backend| {
//!     let grid = Arc::new(ProcessGrid::new(backend, 2).unwrap());
//!     let a = DistMatrix::from_fn(Arc::clone(&grid), 4, 4, Descriptor::cyclic(), |i, j| (i * 4 + j) as f64).unwrap();
//!     let b = a.redistribute(&Descriptor::replicated()).unwrap();
//!     b.block().to_vec().iter().sum::<f64>()
//! });
//! assert_eq!(sums, vec![120.0; 4]);
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
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::manual_let_else)]

pub mod backend;
pub mod comm;
pub mod config;
pub mod dist;
pub mod grid;
pub mod index;
pub mod matrix;
pub mod process_group;
pub mod redist;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{Backend, CommStats, LocalBackend, Tag};
pub use comm::Transfer;
pub use config::RedistConfig;
pub use dist::{is_valid_pair, Category, Descriptor, Dist, Scheme};
pub use grid::{CommScope, GridShape, ProcessGrid};
pub use index::DimMap;
pub use matrix::DistMatrix;
pub use process_group::{ProcessGroup, ReduceOp};
pub use redist::{direct_step, plan, redistribute, Hop, Plan, Redistributor, StepKind};

pub use gridmat_core::{Complex, Error, LocalBlock, Numeric, Result, Scalar};

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for distributed matrix work.
pub mod prelude {
    pub use crate::{
        // Redistribution
        plan,
        redistribute,
        // Transport
        Backend,
        CommScope,
        // Layout
        Descriptor,
        Dist,
        DistMatrix,
        Error,
        GridShape,
        LocalBackend,
        Plan,
        ProcessGrid,
        ProcessGroup,
        RedistConfig,
        Redistributor,
        Result,
        StepKind,
    };
}

// =============================================================================
// Tests
// =============================================================================
