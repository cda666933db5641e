//! Configuration - Redistribution Engine Settings
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use serde::{Deserialize, Serialize};

// =============================================================================
// RedistConfig
// =============================================================================

/// Settings shared by every redistribution a [`crate::Redistributor`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedistConfig {
    /// Emit `tracing` events for plans and hops.
    pub trace: bool,
    /// Check that every assembled block holds exactly the predicted element count.
    pub verify: bool,
    /// Abort the whole job when a transfer fails.
    pub abort_on_error: bool,
    /// Longest route the planner may choose.
    pub max_hops: usize,
}

impl Default for RedistConfig {
    fn default() -> Self {
        Self {
            trace: false,
            verify: true,
            abort_on_error: true,
            max_hops: 3,
        }
    }
}

impl RedistConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables tracing.
    #[must_use]
    pub const fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Enables or disables element-count verification.
    #[must_use]
    pub const fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Sets whether transfer failures abort the job.
    #[must_use]
    pub const fn abort_on_error(mut self, abort: bool) -> Self {
        self.abort_on_error = abort;
        self
    }

    /// Sets the longest allowed route.
    #[must_use]
    pub const fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
