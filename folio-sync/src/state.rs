//! The re-entrancy guard shared by both sync directions.
//!
//! [`SyncContext`] is a small state machine with no I/O: it only says
//! whether a transaction may start and remembers work that arrived while
//! another transaction was running.

use std::collections::VecDeque;

use folio_core::Operation;

use crate::delta::RemoteDelta;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncState {
    #[default]
    Idle,
    ApplyingRemote,
    CommittingLocal,
}

/// Work waiting for the context to become idle.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWork {
    Remote(Vec<RemoteDelta>),
    Local(Vec<Operation>),
}

impl PendingWork {
    /// State the context enters while processing this work.
    pub fn state(&self) -> SyncState {
        match self {
            PendingWork::Remote(_) => SyncState::ApplyingRemote,
            PendingWork::Local(_) => SyncState::CommittingLocal,
        }
    }
}

/// Per-session synchronization context.
#[derive(Debug, Default)]
pub struct SyncContext {
    state: SyncState,
    pending: VecDeque<PendingWork>,
    /// Completed transactions.
    completed: u64,
}

impl SyncContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SyncState::Idle
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Enter `next`. Fails with [`SyncError::Busy`] unless idle.
    pub fn begin(&mut self, next: SyncState) -> Result<(), SyncError> {
        if !self.is_idle() {
            return Err(SyncError::Busy(self.state));
        }
        self.state = next;
        Ok(())
    }

    /// Return to `Idle`.
    pub fn finish(&mut self) {
        if !self.is_idle() {
            self.completed += 1;
        }
        self.state = SyncState::Idle;
    }

    pub fn enqueue(&mut self, work: PendingWork) {
        self.pending.push_back(work);
    }

    /// Oldest queued work, only once idle.
    pub fn next_pending(&mut self) -> Option<PendingWork> {
        if self.is_idle() {
            self.pending.pop_front()
        } else {
            None
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
