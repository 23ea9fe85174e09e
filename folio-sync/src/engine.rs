//! The Sync Engine: remote deltas in, local edit ticks out.
//!
//! Both directions run as transactions on one [`SyncContext`], so a remote
//! batch and a local commit never interleave. Work that arrives while a
//! transaction is running is queued and drained in arrival order.

use folio_core::{Editor, Operation, Origin};

use crate::delta::{translate_batch, RemoteDelta};
use crate::error::SyncError;
use crate::presence::{PresenceBridge, PresenceChannel};
use crate::reconcile::{NaiveReconciler, Reconcile};
use crate::remote::RemoteList;
use crate::state::{PendingWork, SyncContext, SyncState};

/// How a local edit tick reaches the remote list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPath {
    Empty,
    /// Only selection changes: presence, no remote write.
    SelectionOnly,
    /// A single top-level move: one `Move` write, no diffing.
    Move { from: usize, to: usize },
    /// Full reconciliation by id.
    Reconcile,
}

pub fn classify(ops: &[Operation]) -> CommitPath {
    match ops {
        [] => CommitPath::Empty,
        [op @ Operation::MoveNode { path, new_path }] if op.is_top_level() && new_path.len() == 1 => {
            CommitPath::Move {
                from: path[0],
                to: new_path[0],
            }
        }
        _ if ops.iter().all(Operation::is_selection) => CommitPath::SelectionOnly,
        _ => CommitPath::Reconcile,
    }
}

/// What the engine drives. It borrows these for one call and owns none.
pub struct SyncTargets<'a> {
    pub editor: &'a mut Editor,
    pub remote: &'a mut dyn RemoteList,
    pub presence: &'a mut dyn PresenceChannel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub remote_batches: u64,
    /// Batches that were already reflected locally and changed nothing.
    pub remote_batches_reflected: u64,
    pub remote_deltas_applied: u64,
    pub remote_deltas_skipped: u64,
    pub remote_deltas_stale: u64,
    pub commits_empty: u64,
    pub commits_selection_only: u64,
    pub commits_move: u64,
    pub commits_reconcile: u64,
    pub remote_writes: u64,
    pub presence_updates: u64,
}

pub struct SyncEngine {
    context: SyncContext,
    reconciler: Box<dyn Reconcile>,
    bridge: PresenceBridge,
    stats: SyncStats,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::with_reconciler(NaiveReconciler)
    }

    pub fn with_reconciler(reconciler: impl Reconcile + 'static) -> Self {
        Self {
            context: SyncContext::new(),
            reconciler: Box::new(reconciler),
            bridge: PresenceBridge::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.context.state()
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn bridge(&self) -> &PresenceBridge {
        &self.bridge
    }

    /// Apply one remote batch as a single non-normalizing transaction,
    /// normalized once at the end.
    pub fn apply_remote_deltas(
        &mut self,
        deltas: Vec<RemoteDelta>,
        targets: &mut SyncTargets<'_>,
    ) -> Result<(), SyncError> {
        self.submit(PendingWork::Remote(deltas), targets)
    }

    /// Commit one local edit tick. `ops` must already exclude
    /// remote-origin operations.
    pub fn commit_local_operations(
        &mut self,
        ops: Vec<Operation>,
        targets: &mut SyncTargets<'_>,
    ) -> Result<(), SyncError> {
        self.submit(PendingWork::Local(ops), targets)
    }

    /// Queue `work` and drain the queue if idle. `&mut self` means nothing
    /// re-enters while a transaction runs, so the busy branch only matters
    /// when a context is left non-idle by its owner.
    fn submit(&mut self, work: PendingWork, targets: &mut SyncTargets<'_>) -> Result<(), SyncError> {
        self.context.enqueue(work);
        if !self.context.is_idle() {
            log::debug!(
                "sync busy ({:?}), {} queued",
                self.context.state(),
                self.context.pending_len()
            );
            return Ok(());
        }

        while let Some(work) = self.context.next_pending() {
            self.context.begin(work.state())?;
            let result = match work {
                PendingWork::Remote(deltas) => self.apply_batch(deltas, targets.editor),
                PendingWork::Local(ops) => self.commit(ops, targets),
            };
            self.context.finish();
            result?;
        }
        Ok(())
    }

    fn apply_batch(&mut self, deltas: Vec<RemoteDelta>, editor: &mut Editor) -> Result<(), SyncError> {
        self.stats.remote_batches += 1;
        let batch = translate_batch(&deltas, editor.children());

        for delta in &batch.stale {
            log::warn!(
                "dropping stale remote {} delta for {} local blocks: {delta:?}",
                delta.name(),
                editor.children().len()
            );
        }
        self.stats.remote_deltas_stale += batch.stale.len() as u64;
        self.stats.remote_deltas_skipped += batch.skipped as u64;

        if batch.result.as_slice() == editor.children() {
            self.stats.remote_batches_reflected += 1;
            self.stats.remote_deltas_skipped += batch.applied as u64;
            log::debug!("remote batch of {} already reflected", deltas.len());
            return Ok(());
        }

        editor.apply_all(batch.operations, Origin::Remote)?;
        self.stats.remote_deltas_applied += batch.applied as u64;
        log::debug!(
            "applied remote batch: {} applied, {} skipped, {} stale",
            batch.applied,
            batch.skipped,
            batch.stale.len()
        );
        Ok(())
    }

    fn commit(&mut self, ops: Vec<Operation>, targets: &mut SyncTargets<'_>) -> Result<(), SyncError> {
        let path = classify(&ops);
        match path {
            CommitPath::Empty => {
                self.stats.commits_empty += 1;
                return Ok(());
            }
            CommitPath::SelectionOnly => {
                self.stats.commits_selection_only += 1;
                if let Some(op) = ops.last() {
                    let sent = self.bridge.on_selection(
                        op,
                        targets.editor.children(),
                        &mut *targets.presence,
                    );
                    if sent {
                        self.stats.presence_updates += 1;
                    }
                }
                return Ok(());
            }
            CommitPath::Move { from, to } => match targets.remote.move_item(from, to) {
                Ok(()) => self.stats.commits_move += 1,
                Err(e) => {
                    log::warn!("move {from} -> {to} rejected ({e}), reconciling instead");
                    self.reconcile(targets)?;
                }
            },
            CommitPath::Reconcile => self.reconcile(targets)?,
        }

        let written = targets.remote.commit()?;
        self.stats.remote_writes += written as u64;
        log::debug!("committed {} local ops via {path:?}: {written} remote writes", ops.len());
        Ok(())
    }

    fn reconcile(&mut self, targets: &mut SyncTargets<'_>) -> Result<(), SyncError> {
        let report = self
            .reconciler
            .reconcile(targets.editor.children(), &mut *targets.remote)?;
        self.stats.commits_reconcile += 1;
        log::debug!("reconciled: {report:?}");
        Ok(())
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}
