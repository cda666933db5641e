//! Error Types - Gridmat Error Handling
//!
//! Provides the error taxonomy shared by every layer of the distributed
//! matrix stack: caller errors (incompatible grids or dimensions, invalid
//! distribution pairs, out-of-range indices) and protocol errors (messages
//! whose size disagrees with the index mapping, assembled blocks that do not
//! add up). None of these are recoverable at the redistribution layer.
//!
//! # Key Features
//! - Unified error type for distribution, transfer and topology failures
//! - Detailed expected/actual context for transfer errors
//! - Integration with `std::error::Error`
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// The main error type for gridmat operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Source and target disagree on the process grid or the global dimensions.
    #[error("Distribution mismatch: {reason}")]
    DistributionMismatch {
        /// What did not match.
        reason: String,
    },

    /// A received message disagrees with the size predicted by the index mapping.
    #[error("Size mismatch: expected {expected} elements, received {actual}")]
    SizeMismatch {
        /// Number of elements predicted locally.
        expected: usize,
        /// Number of elements actually received.
        actual: usize,
    },

    /// The assembled local block does not match the global dimensions.
    #[error("Corrupt transfer during {stage}: expected {expected} local elements, assembled {actual}")]
    CorruptTransfer {
        /// The primitive or hop that produced the block.
        stage: String,
        /// Number of elements predicted by the index mapping.
        expected: usize,
        /// Number of elements actually assembled.
        actual: usize,
    },

    /// The process grid cannot support the requested layout.
    #[error("Grid topology error: {message}")]
    GridTopologyError {
        /// Description of the inconsistency.
        message: String,
    },

    /// The column/row distribution pair is not a valid combination.
    #[error("Invalid distribution [{col},{row}]")]
    InvalidDistribution {
        /// Column distribution name.
        col: String,
        /// Row distribution name.
        row: String,
    },

    /// Index out of bounds.
    #[error("Index out of bounds: index {index} for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index.
        index: usize,
        /// The size of the dimension.
        size: usize,
    },

    /// Write attempted through a read-only view.
    #[error("Cannot write through a read-only view")]
    ReadOnlyView,

    /// Invalid operation for the given block or matrix.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The underlying transport failed or the job was aborted.
    #[error("Transport failure: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },
}

// =============================================================================
// Result Type
// =============================================================================

/// A specialized Result type for gridmat operations.
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Helper Functions
// =============================================================================

impl Error {
    /// Creates a new distribution mismatch error.
    #[must_use]
    pub fn distribution_mismatch(reason: impl Into<String>) -> Self {
        Self::DistributionMismatch {
            reason: reason.into(),
        }
    }

    /// Creates a new corrupt transfer error.
    #[must_use]
    pub fn corrupt_transfer(stage: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::CorruptTransfer {
            stage: stage.into(),
            expected,
            actual,
        }
    }

    /// Creates a new grid topology error.
    #[must_use]
    pub fn grid_topology(message: impl Into<String>) -> Self {
        Self::GridTopologyError {
            message: message.into(),
        }
    }

    /// Creates a new invalid operation error.
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate a protocol bug rather than a caller error.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::SizeMismatch { .. } | Self::CorruptTransfer { .. } | Self::Transport { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
