//! Remote Storage Adapter: the replicated, ordered list of top-level nodes.
//!
//! Writes are grouped until [`RemoteList::commit`], which publishes them to
//! the other subscribers as one delta batch. An adapter never delivers a
//! client's own writes back to that client.

mod memory;
mod yrs_list;

pub use memory::{MemoryList, MemoryRoom, RoomStats};
pub use yrs_list::YrsList;

use folio_core::Node;
use tokio::sync::mpsc;

use crate::delta::RemoteDelta;
use crate::error::RemoteError;

pub type DeltaBatch = Vec<RemoteDelta>;
pub type DeltaSender = mpsc::UnboundedSender<DeltaBatch>;

pub trait RemoteList {
    fn len(&self) -> Result<usize, RemoteError>;

    fn is_empty(&self) -> Result<bool, RemoteError> {
        Ok(self.len()? == 0)
    }

    fn get(&self, index: usize) -> Result<Option<Node>, RemoteError>;

    fn insert(&mut self, index: usize, item: Node) -> Result<(), RemoteError>;

    fn delete(&mut self, index: usize) -> Result<(), RemoteError>;

    /// Move so that the item ends up at `to`.
    fn move_item(&mut self, from: usize, to: usize) -> Result<(), RemoteError>;

    /// Replace the whole item at `index`.
    fn set(&mut self, index: usize, item: Node) -> Result<(), RemoteError>;

    fn to_vec(&self) -> Result<Vec<Node>, RemoteError>;

    fn find_index(&self, predicate: &dyn Fn(&Node) -> bool) -> Result<Option<usize>, RemoteError> {
        Ok(self.to_vec()?.iter().position(predicate))
    }

    /// Subscribe to batches written by other clients.
    fn subscribe(&mut self) -> DeltaStream;

    /// Publish writes made since the last commit. Returns the number of
    /// writes in the batch.
    fn commit(&mut self) -> Result<usize, RemoteError>;
}

/// Receiving end of a subscription. Batches arrive in publication order.
#[derive(Debug)]
pub struct DeltaStream {
    rx: mpsc::UnboundedReceiver<DeltaBatch>,
}

impl DeltaStream {
    pub fn channel() -> (DeltaSender, DeltaStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, DeltaStream { rx })
    }

    /// Next pending batch, without blocking.
    pub fn try_next(&mut self) -> Option<DeltaBatch> {
        self.rx.try_recv().ok()
    }

    pub fn drain(&mut self) -> Vec<DeltaBatch> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

fn check_index(index: usize, len: usize) -> Result<(), RemoteError> {
    if index < len {
        Ok(())
    } else {
        Err(RemoteError::OutOfBounds { index, len })
    }
}

fn check_insert_index(index: usize, len: usize) -> Result<(), RemoteError> {
    if index <= len {
        Ok(())
    } else {
        Err(RemoteError::OutOfBounds { index, len })
    }
}
