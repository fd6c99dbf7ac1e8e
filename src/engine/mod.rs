//! Candidate enumeration: the odometer, node partitioning and checkpoints.

pub mod checkpoint;
pub mod odometer;
pub mod partition;

pub use checkpoint::{CheckpointRecord, LengthState, PatternId};
pub use odometer::Odometer;
pub use partition::{node_share, seed_cursors, NodeShare, NodeSpec, WorkerSlot};

/// Receives every candidate. The slice is only valid for the duration of the
/// call; the engine rewrites it in place for the next candidate.
///
/// Returning `true` requests a stop. The candidate that requested it is
/// counted as not yet processed and is emitted again after a resume.
pub trait Consumer {
    fn process(&mut self, candidate: &[u8]) -> bool;
}

impl<F> Consumer for F
where
    F: FnMut(&[u8]) -> bool,
{
    fn process(&mut self, candidate: &[u8]) -> bool {
        self(candidate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every candidate was produced.
    Exhausted,
    /// The consumer asked to stop.
    Stopped,
    /// This node's share is used up; the rest belongs to other nodes.
    QuotaReached,
    /// The caller's window ran out between two candidates (checkpoint signal).
    Paused,
}

/// Size of the current enumeration and how much of it is left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateBudget {
    pub total: u64,
    pub remaining: u64,
    pub node_start_offset: u64,
    /// When set, `remaining` is a hard quota instead of a progress counter.
    pub enforce_quota: bool,
}

impl CandidateBudget {
    pub fn unpartitioned(total: u64) -> Self {
        Self {
            total,
            remaining: total,
            node_start_offset: 0,
            enforce_quota: false,
        }
    }

    pub fn for_share(share: NodeShare) -> Self {
        Self {
            total: share.count,
            remaining: share.count,
            node_start_offset: share.offset,
            enforce_quota: true,
        }
    }

    pub fn done(&self) -> u64 {
        self.total.saturating_sub(self.remaining)
    }
}
