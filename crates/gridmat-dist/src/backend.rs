//! Backend - Message-Passing Transport Abstractions
//!
//! Provides the transport trait the redistribution engine rides on, and an
//! in-process implementation where every rank is a thread and messages travel
//! through shared, blocking mailboxes. The trait covers point-to-point byte
//! messages and a job-wide abort; collectives are layered on top in
//! [`crate::process_group`].
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use gridmat_core::{Error, Result};
use parking_lot::{Condvar, Mutex};

/// Message tag; messages only match a receive with the same tag.
pub type Tag = u32;

// =============================================================================
// Communication Statistics
// =============================================================================

/// Per-rank message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommStats {
    /// Messages sent by this rank.
    pub messages_sent: usize,
    /// Payload bytes sent by this rank.
    pub bytes_sent: usize,
    /// Messages received by this rank.
    pub messages_received: usize,
    /// Payload bytes received by this rank.
    pub bytes_received: usize,
}

impl CommStats {
    /// Returns the traffic recorded after `earlier` was taken.
    #[must_use]
    pub fn since(&self, earlier: &CommStats) -> CommStats {
        CommStats {
            messages_sent: self.messages_sent.saturating_sub(earlier.messages_sent),
            bytes_sent: self.bytes_sent.saturating_sub(earlier.bytes_sent),
            messages_received: self.messages_received.saturating_sub(earlier.messages_received),
            bytes_received: self.bytes_received.saturating_sub(earlier.bytes_received),
        }
    }

    /// Returns true if no message was sent or received.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.messages_sent == 0 && self.messages_received == 0
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// Trait for distributed communication backends.
///
/// Sends are buffered: `send` returns once the payload is handed to the
/// transport, so a rank may send to a peer before that peer posts the
/// matching receive. Messages between a pair of ranks with the same tag are
/// delivered in order.
pub trait Backend: Send + Sync {
    /// Returns the name of the backend.
    fn name(&self) -> &str;

    /// Returns the rank of this process.
    fn rank(&self) -> usize;

    /// Returns the total world size.
    fn world_size(&self) -> usize;

    /// Sends bytes to a specific rank.
    fn send(&self, data: &[u8], dst: usize, tag: Tag) -> Result<()>;

    /// Receives the next message from a specific rank, blocking until it arrives.
    fn recv(&self, src: usize, tag: Tag) -> Result<Vec<u8>>;

    /// Terminates the whole job. Blocked and future transfers on every rank fail.
    fn abort(&self, reason: &str);

    /// Returns the traffic counters of this rank.
    fn stats(&self) -> CommStats;
}

// =============================================================================
// SharedState for Local Backend
// =============================================================================

/// Mailboxes shared by every rank of a local world.
#[derive(Debug, Default)]
struct Mailbox {
    /// (src, dst, tag) -> queued payloads.
    queues: HashMap<(usize, usize, Tag), VecDeque<Vec<u8>>>,
    /// Set once any rank aborts the job.
    aborted: Option<String>,
}

#[derive(Debug, Default)]
struct SharedState {
    mailbox: Mutex<Mailbox>,
    delivered: Condvar,
}

// =============================================================================
// Local Backend
// =============================================================================

/// An in-process backend where each rank runs on its own thread.
///
/// Receives block on a condition variable until the matching message has
/// been delivered or the job is aborted.
#[derive(Debug)]
pub struct LocalBackend {
    rank: usize,
    world_size: usize,
    state: Arc<SharedState>,
    messages_sent: AtomicUsize,
    bytes_sent: AtomicUsize,
    messages_received: AtomicUsize,
    bytes_received: AtomicUsize,
}

impl LocalBackend {
    fn with_state(rank: usize, world_size: usize, state: Arc<SharedState>) -> Self {
        Self {
            rank,
            world_size,
            state,
            messages_sent: AtomicUsize::new(0),
            bytes_sent: AtomicUsize::new(0),
            messages_received: AtomicUsize::new(0),
            bytes_received: AtomicUsize::new(0),
        }
    }

    /// Creates one connected backend per rank.
    #[must_use]
    pub fn create_world(world_size: usize) -> Vec<Self> {
        let state = Arc::new(SharedState::default());
        (0..world_size)
            .map(|rank| Self::with_state(rank, world_size, Arc::clone(&state)))
            .collect()
    }

    /// Creates a single backend (rank 0, world size 1).
    #[must_use]
    pub fn single() -> Self {
        Self::with_state(0, 1, Arc::new(SharedState::default()))
    }

    /// Runs `f` once per rank, each on its own thread, and returns the results in rank order.
    ///
    /// A panic on any rank aborts the world so that peers blocked on that
    /// rank fail instead of hanging; the first panic is then re-raised.
    pub fn run_world<R, F>(world_size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Arc<LocalBackend>) -> R + Sync,
    {
        let backends: Vec<Arc<LocalBackend>> = Self::create_world(world_size)
            .into_iter()
            .map(Arc::new)
            .collect();
        let f = &f;

        let outcomes: Vec<thread::Result<R>> = thread::scope(|scope| {
            let handles: Vec<_> = backends
                .iter()
                .map(|backend| {
                    let backend = Arc::clone(backend);
                    scope.spawn(move || {
                        let watchdog = Arc::clone(&backend);
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(backend)));
                        if outcome.is_err() {
                            watchdog.abort("rank panicked");
                        }
                        outcome
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(Err))
                .collect()
        });

        outcomes
            .into_iter()
            .map(|outcome| outcome.unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    }

    fn check_peer(&self, peer: usize) -> Result<()> {
        if peer < self.world_size {
            Ok(())
        } else {
            Err(Error::transport(format!(
                "rank {peer} is outside a world of size {}",
                self.world_size
            )))
        }
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn send(&self, data: &[u8], dst: usize, tag: Tag) -> Result<()> {
        self.check_peer(dst)?;
        {
            let mut mailbox = self.state.mailbox.lock();
            if let Some(reason) = &mailbox.aborted {
                return Err(Error::transport(format!("job aborted: {reason}")));
            }
            mailbox
                .queues
                .entry((self.rank, dst, tag))
                .or_default()
                .push_back(data.to_vec());
        }
        self.state.delivered.notify_all();

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(data.len(), Ordering::Relaxed);
        Ok(())
    }

    fn recv(&self, src: usize, tag: Tag) -> Result<Vec<u8>> {
        self.check_peer(src)?;
        let key = (src, self.rank, tag);
        let mut mailbox = self.state.mailbox.lock();
        loop {
            if let Some(reason) = &mailbox.aborted {
                return Err(Error::transport(format!("job aborted: {reason}")));
            }
            if let Some(message) = mailbox.queues.get_mut(&key).and_then(VecDeque::pop_front) {
                drop(mailbox);
                self.messages_received.fetch_add(1, Ordering::Relaxed);
                self.bytes_received.fetch_add(message.len(), Ordering::Relaxed);
                return Ok(message);
            }
            self.state.delivered.wait(&mut mailbox);
        }
    }

    fn abort(&self, reason: &str) {
        {
            let mut mailbox = self.state.mailbox.lock();
            if mailbox.aborted.is_none() {
                tracing::error!(rank = self.rank, reason, "aborting distributed job");
                mailbox.aborted = Some(format!("rank {}: {reason}", self.rank));
            }
        }
        self.state.delivered.notify_all();
    }

    fn stats(&self) -> CommStats {
        CommStats {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
