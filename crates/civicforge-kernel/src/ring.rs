//! Snapshot ring - bounded rollback history
//!
//! Every envelope pushes a snapshot before execution. A snapshot pairs
//! the state value with the ledger length at capture time: the ledger is
//! append-only, so truncating to that length restores it exactly.

use chrono::{DateTime, Utc};
use civicforge_state::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One rollback point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSnapshot {
    pub taken_at: DateTime<Utc>,
    pub ledger_len: usize,
    pub state: StateSnapshot,
}

/// Bounded ring of rollback points; the oldest is evicted past `depth`
#[derive(Debug, Clone)]
pub struct SnapshotRing {
    depth: usize,
    snapshots: VecDeque<KernelSnapshot>,
}

impl SnapshotRing {
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            snapshots: VecDeque::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn push(&mut self, snapshot: KernelSnapshot) {
        if self.snapshots.len() == self.depth {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn pop(&mut self) -> Option<KernelSnapshot> {
        self.snapshots.pop_back()
    }

    /// The snapshot `steps` back (1 = most recent), discarding newer ones
    pub fn take_back(&mut self, steps: usize) -> Option<KernelSnapshot> {
        if steps == 0 || steps > self.snapshots.len() {
            return None;
        }
        self.snapshots.truncate(self.snapshots.len() - steps + 1);
        self.snapshots.pop_back()
    }

    /// Snapshots oldest-first, for checkpoint round-trips
    pub fn export(&self) -> Vec<KernelSnapshot> {
        self.snapshots.iter().cloned().collect()
    }

    /// Replace the ring contents from a checkpoint
    pub fn restore(&mut self, snapshots: Vec<KernelSnapshot>) {
        self.snapshots = snapshots.into_iter().collect();
        while self.snapshots.len() > self.depth {
            self.snapshots.pop_front();
        }
    }
}
