//! `ProcessGroup` - Process Group Abstraction
//!
//! Provides the communicator handle the redistribution primitives talk
//! through. A group is an ordered subset of the world's ranks; typed
//! point-to-point transfers and the collectives (all-to-all, all-gather,
//! broadcast, reduce-scatter) are layered here on top of the byte
//! transport exposed by [`Backend`].
//!
//! Collectives must be entered by every member of the group in the same
//! order. Messages between a pair of ranks are delivered in order, so
//! consecutive collectives on overlapping groups never cross.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::sync::Arc;

use bytemuck::Zeroable;
use gridmat_core::{Error, Numeric, Result, Scalar};

use crate::backend::{Backend, CommStats, LocalBackend, Tag};

// =============================================================================
// Message Tags
// =============================================================================

/// Tags used by the collectives and primitives of this crate.
pub mod tags {
    use crate::backend::Tag;

    /// Pairwise rounds of an all-to-all.
    pub const ALL_TO_ALL: Tag = 10;
    /// All-gather rounds.
    pub const ALL_GATHER: Tag = 11;
    /// Broadcast from a root.
    pub const BROADCAST: Tag = 12;
    /// Reduce-scatter contributions.
    pub const REDUCE_SCATTER: Tag = 14;
    /// Whole-block exchange between partners.
    pub const EXCHANGE: Tag = 20;
    /// Blocks travelling to a single owner.
    pub const GATHER: Tag = 21;
    /// Blocks travelling from a single owner.
    pub const SCATTER: Tag = 22;
}

// =============================================================================
// Reduce Operations
// =============================================================================

/// Reduction operation for collective communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum all values.
    Sum,
    /// Compute product of all values.
    Product,
}

impl ReduceOp {
    /// Applies the reduction operation to two values.
    #[must_use]
    pub fn apply<T: Numeric>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Product => a * b,
        }
    }

    /// Identity element of the reduction.
    #[must_use]
    pub fn identity<T: Numeric>(self) -> T {
        match self {
            ReduceOp::Sum => T::ZERO,
            ReduceOp::Product => T::ONE,
        }
    }

    /// Reduces equally sized slices elementwise, in slice order.
    pub fn reduce_slices<T: Numeric>(self, slices: &[Vec<T>]) -> Result<Vec<T>> {
        let Some(first) = slices.first() else {
            return Ok(Vec::new());
        };

        let mut result = vec![self.identity::<T>(); first.len()];
        for slice in slices {
            if slice.len() != result.len() {
                return Err(Error::SizeMismatch {
                    expected: result.len(),
                    actual: slice.len(),
                });
            }
            for (acc, &val) in result.iter_mut().zip(slice) {
                *acc = self.apply(*acc, val);
            }
        }
        Ok(result)
    }
}

// =============================================================================
// Byte Conversion
// =============================================================================

fn values_from_bytes<T: Scalar>(bytes: &[u8]) -> Result<Vec<T>> {
    let size = core::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(Error::transport(format!(
            "received {} bytes, not a whole number of {} elements",
            bytes.len(),
            T::DTYPE
        )));
    }
    let mut out = vec![T::zeroed(); bytes.len() / size];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
    Ok(out)
}

// =============================================================================
// ProcessGroup
// =============================================================================

/// A group of processes that can communicate with each other.
pub struct ProcessGroup {
    backend: Arc<dyn Backend>,
    ranks: Vec<usize>,
}

impl ProcessGroup {
    /// Creates a new process group with all ranks.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let world_size = backend.world_size();
        Self {
            backend,
            ranks: (0..world_size).collect(),
        }
    }

    /// Creates a process group over specific world ranks, in the given order.
    pub fn with_ranks(backend: Arc<dyn Backend>, ranks: Vec<usize>) -> Result<Self> {
        if ranks.is_empty() {
            return Err(Error::grid_topology("a process group needs at least one rank"));
        }
        let world_size = backend.world_size();
        for (i, &rank) in ranks.iter().enumerate() {
            if rank >= world_size {
                return Err(Error::grid_topology(format!(
                    "rank {rank} is outside a world of size {world_size}"
                )));
            }
            if ranks[..i].contains(&rank) {
                return Err(Error::grid_topology(format!("rank {rank} listed twice")));
            }
        }
        Ok(Self { backend, ranks })
    }

    /// Creates a single-process group for testing.
    #[must_use]
    pub fn single() -> Self {
        Self::new(Arc::new(LocalBackend::single()))
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Returns a shared handle to the backend.
    #[must_use]
    pub fn backend_arc(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// Returns the world rank of this process.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.backend.rank()
    }

    /// Returns the world size.
    #[must_use]
    pub fn world_size(&self) -> usize {
        self.backend.world_size()
    }

    /// Returns the number of processes in this group.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ranks.len()
    }

    /// Returns the world ranks in this group, in group order.
    #[must_use]
    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    /// Checks if a world rank is part of the group.
    #[must_use]
    pub fn contains(&self, rank: usize) -> bool {
        self.ranks.contains(&rank)
    }

    /// Returns the position of this process within the group.
    #[must_use]
    pub fn group_rank(&self) -> Option<usize> {
        let me = self.rank();
        self.ranks.iter().position(|&r| r == me)
    }

    /// Returns the world rank at a group position.
    #[must_use]
    pub fn world_rank_of(&self, group_rank: usize) -> Option<usize> {
        self.ranks.get(group_rank).copied()
    }

    /// Returns the traffic counters of the underlying backend.
    #[must_use]
    pub fn stats(&self) -> CommStats {
        self.backend.stats()
    }

    /// Aborts the whole job.
    pub fn abort(&self, reason: &str) {
        self.backend.abort(reason);
    }

    fn my_group_rank(&self) -> Result<usize> {
        self.group_rank().ok_or_else(|| {
            Error::invalid_operation(format!(
                "rank {} is not a member of the group {:?}",
                self.rank(),
                self.ranks
            ))
        })
    }

    fn member(&self, group_rank: usize) -> usize {
        self.ranks[group_rank]
    }

    // -------------------------------------------------------------------------
    // Point-to-point
    // -------------------------------------------------------------------------

    /// Sends typed values to a world rank.
    pub fn send<T: Scalar>(&self, data: &[T], dst: usize, tag: Tag) -> Result<()> {
        self.backend.send(bytemuck::cast_slice(data), dst, tag)
    }

    /// Receives typed values from a world rank.
    pub fn recv<T: Scalar>(&self, src: usize, tag: Tag) -> Result<Vec<T>> {
        let bytes = self.backend.recv(src, tag)?;
        values_from_bytes(&bytes)
    }

    // -------------------------------------------------------------------------
    // Collectives
    // -------------------------------------------------------------------------

    /// Sends `sends[k]` to the k-th member and returns what every member sent here.
    ///
    /// Runs `size - 1` pairwise rounds; in round `s` a member sends to the
    /// member `s` ahead of it and receives from the member `s` behind it.
    pub fn all_to_all<T: Scalar>(&self, sends: &[Vec<T>]) -> Result<Vec<Vec<T>>> {
        let n = self.size();
        if sends.len() != n {
            return Err(Error::invalid_operation(format!(
                "all-to-all over {n} members given {} buffers",
                sends.len()
            )));
        }
        let me = self.my_group_rank()?;

        let mut recvs: Vec<Vec<T>> = vec![Vec::new(); n];
        recvs[me].clone_from(&sends[me]);

        for step in 1..n {
            let send_to = (me + step) % n;
            let recv_from = (me + n - step) % n;
            self.send(&sends[send_to], self.member(send_to), tags::ALL_TO_ALL)?;
            recvs[recv_from] = self.recv(self.member(recv_from), tags::ALL_TO_ALL)?;
        }
        Ok(recvs)
    }

    /// Returns every member's `data`, in group order.
    pub fn all_gather<T: Scalar>(&self, data: &[T]) -> Result<Vec<Vec<T>>> {
        let n = self.size();
        let me = self.my_group_rank()?;

        let mut recvs: Vec<Vec<T>> = vec![Vec::new(); n];
        recvs[me] = data.to_vec();

        for step in 1..n {
            let send_to = (me + step) % n;
            let recv_from = (me + n - step) % n;
            self.send(data, self.member(send_to), tags::ALL_GATHER)?;
            recvs[recv_from] = self.recv(self.member(recv_from), tags::ALL_GATHER)?;
        }
        Ok(recvs)
    }

    /// Broadcasts `data` from the member at group position `root`.
    ///
    /// Non-root members' `data` is ignored.
    pub fn broadcast<T: Scalar>(&self, data: &[T], root: usize) -> Result<Vec<T>> {
        let n = self.size();
        if root >= n {
            return Err(Error::IndexOutOfBounds { index: root, size: n });
        }
        let me = self.my_group_rank()?;

        if me == root {
            for k in (0..n).filter(|&k| k != root) {
                self.send(data, self.member(k), tags::BROADCAST)?;
            }
            Ok(data.to_vec())
        } else {
            self.recv(self.member(root), tags::BROADCAST)
        }
    }

    /// Reduces `contributions[k]` from every member onto the k-th member.
    ///
    /// Contributions are combined in group order, so floating-point results
    /// depend on the group size but not on message timing.
    pub fn reduce_scatter<T: Numeric>(&self, contributions: &[Vec<T>], op: ReduceOp) -> Result<Vec<T>> {
        let n = self.size();
        if contributions.len() != n {
            return Err(Error::invalid_operation(format!(
                "reduce-scatter over {n} members given {} contributions",
                contributions.len()
            )));
        }
        let me = self.my_group_rank()?;

        let mut parts: Vec<Vec<T>> = vec![Vec::new(); n];
        parts[me].clone_from(&contributions[me]);
        for step in 1..n {
            let send_to = (me + step) % n;
            let recv_from = (me + n - step) % n;
            self.send(&contributions[send_to], self.member(send_to), tags::REDUCE_SCATTER)?;
            parts[recv_from] = self.recv(self.member(recv_from), tags::REDUCE_SCATTER)?;
        }
        op.reduce_slices(&parts)
    }
}

impl Clone for ProcessGroup {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            ranks: self.ranks.clone(),
        }
    }
}

impl core::fmt::Debug for ProcessGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessGroup")
            .field("backend", &self.backend.name())
            .field("rank", &self.rank())
            .field("ranks", &self.ranks)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
