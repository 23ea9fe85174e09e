use folio_core::ApplyError;
use thiserror::Error;

use crate::state::SyncState;

/// Failures of a Remote Storage Adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("index {index} out of bounds for remote list of length {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid update: {0}")]
    Update(String),
    #[error("remote room lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("sync context busy ({0:?})")]
    Busy(SyncState),
}
