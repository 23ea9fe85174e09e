//! # folio-sync: Keeps a Folio editor in step with a replicated block list
//!
//! The editor holds a tree; collaborators share a flat list of top-level
//! blocks. This crate translates in both directions and routes selection
//! changes to presence.
//!
//! ## Architecture
//!
//! ```text
//!   remote peers                                   local user
//!        │                                              │
//!        ▼ delta batch                                  ▼ edit tick
//! ┌──────────────┐  RemoteDelta   ┌────────────┐  Operation  ┌────────────┐
//! │ RemoteList   │ ─────────────► │ SyncEngine │ ◄────────── │ Editor     │
//! │ (MemoryList, │ ◄───────────── │ SyncContext│ ──────────► │ (folio-    │
//! │  YrsList)    │ move / diff    └─────┬──────┘  Origin::   │  core)     │
//! └──────────────┘                      │         Remote     └────────────┘
//!                                       ▼ selection only
//!                               ┌────────────────┐
//!                               │ PresenceBridge │──► PresenceChannel
//!                               └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`delta`] - Remote list deltas and their translation to operations
//! - [`state`] - The three-state sync guard and its work queue
//! - [`remote`] - The replicated list abstraction: in-memory room and `yrs`
//! - [`reconcile`] - Naive id-based reconciliation of local blocks
//! - [`presence`] - Selected-block presence and peer tracking
//! - [`engine`] - Both sync directions under one state
//! - [`session`] - One open document wired to a remote list

pub mod delta;
pub mod engine;
pub mod error;
pub mod presence;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod state;

// Re-exports for convenience
pub use delta::{translate, translate_batch, RemoteDelta, TranslatedBatch, Translation};
pub use engine::{classify, CommitPath, SyncEngine, SyncStats, SyncTargets};
pub use error::{RemoteError, SyncError};
pub use presence::{
    BlockPresence, PeerPresence, PresenceBridge, PresenceChannel, PresenceMessage, PresenceRoom,
};
pub use reconcile::{NaiveReconciler, Reconcile, ReconcileReport};
pub use remote::{DeltaBatch, DeltaStream, MemoryList, MemoryRoom, RemoteList, RoomStats, YrsList};
pub use session::{DocumentSession, SessionConfig};
pub use state::{PendingWork, SyncContext, SyncState};
