//! In-process replicated list shared by several clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use folio_core::Node;
use uuid::Uuid;

use super::{check_index, check_insert_index, DeltaBatch, DeltaSender, DeltaStream, RemoteList};
use crate::delta::RemoteDelta;
use crate::error::RemoteError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub batches_published: u64,
    pub deltas_published: u64,
    pub clients: usize,
}

#[derive(Default)]
struct RoomState {
    items: Vec<Node>,
    subscribers: HashMap<Uuid, Vec<DeltaSender>>,
}

/// Publication counters, updated without the room lock.
#[derive(Default)]
struct AtomicRoomStats {
    batches_published: AtomicU64,
    deltas_published: AtomicU64,
}

/// A shared list that fans each committed batch out to every client
/// except the writer.
#[derive(Clone, Default)]
pub struct MemoryRoom {
    state: Arc<RwLock<RoomState>>,
    stats: Arc<AtomicRoomStats>,
}

impl MemoryRoom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Node>) -> Self {
        let room = Self::new();
        if let Ok(mut state) = room.state.write() {
            state.items = items;
        }
        room
    }

    /// A list handle for `client_id`.
    pub fn join(&self, client_id: Uuid) -> MemoryList {
        if let Ok(mut state) = self.state.write() {
            state.subscribers.entry(client_id).or_default();
        }
        log::debug!("client {client_id} joined room");
        MemoryList {
            room: self.clone(),
            client_id,
            outgoing: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Result<Vec<Node>, RemoteError> {
        Ok(self.read()?.items.clone())
    }

    pub fn stats(&self) -> Result<RoomStats, RemoteError> {
        Ok(RoomStats {
            batches_published: self.stats.batches_published.load(Ordering::Relaxed),
            deltas_published: self.stats.deltas_published.load(Ordering::Relaxed),
            clients: self.read()?.subscribers.len(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RoomState>, RemoteError> {
        self.state.read().map_err(|_| RemoteError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RoomState>, RemoteError> {
        self.state.write().map_err(|_| RemoteError::Poisoned)
    }

    fn publish(&self, from: Uuid, batch: DeltaBatch) -> Result<(), RemoteError> {
        let mut state = self.write()?;
        for (client, senders) in state.subscribers.iter_mut() {
            if *client == from {
                continue;
            }
            senders.retain(|tx| tx.send(batch.clone()).is_ok());
        }
        self.stats.batches_published.fetch_add(1, Ordering::Relaxed);
        self.stats
            .deltas_published
            .fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// One client's handle on a [`MemoryRoom`]. Writes land in the shared list
/// immediately and are broadcast on commit.
pub struct MemoryList {
    room: MemoryRoom,
    client_id: Uuid,
    outgoing: DeltaBatch,
}

impl MemoryList {
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn room(&self) -> &MemoryRoom {
        &self.room
    }

    /// Writes not yet committed.
    pub fn uncommitted(&self) -> &[RemoteDelta] {
        &self.outgoing
    }
}

impl RemoteList for MemoryList {
    fn len(&self) -> Result<usize, RemoteError> {
        Ok(self.room.read()?.items.len())
    }

    fn get(&self, index: usize) -> Result<Option<Node>, RemoteError> {
        Ok(self.room.read()?.items.get(index).cloned())
    }

    fn insert(&mut self, index: usize, item: Node) -> Result<(), RemoteError> {
        let mut state = self.room.write()?;
        check_insert_index(index, state.items.len())?;
        state.items.insert(index, item.clone());
        self.outgoing.push(RemoteDelta::Insert { index, item });
        Ok(())
    }

    fn delete(&mut self, index: usize) -> Result<(), RemoteError> {
        let mut state = self.room.write()?;
        check_index(index, state.items.len())?;
        state.items.remove(index);
        self.outgoing.push(RemoteDelta::Delete { index });
        Ok(())
    }

    fn move_item(&mut self, from: usize, to: usize) -> Result<(), RemoteError> {
        let mut state = self.room.write()?;
        let len = state.items.len();
        check_index(from, len)?;
        check_index(to, len)?;
        let item = state.items.remove(from);
        state.items.insert(to, item);
        self.outgoing.push(RemoteDelta::Move {
            from_index: from,
            to_index: to,
        });
        Ok(())
    }

    fn set(&mut self, index: usize, item: Node) -> Result<(), RemoteError> {
        let mut state = self.room.write()?;
        let len = state.items.len();
        let slot = state
            .items
            .get_mut(index)
            .ok_or(RemoteError::OutOfBounds { index, len })?;
        *slot = item.clone();
        self.outgoing.push(RemoteDelta::Set { index, item });
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<Node>, RemoteError> {
        self.room.snapshot()
    }

    fn subscribe(&mut self) -> DeltaStream {
        let (tx, stream) = DeltaStream::channel();
        if let Ok(mut state) = self.room.state.write() {
            state.subscribers.entry(self.client_id).or_default().push(tx);
        }
        stream
    }

    fn commit(&mut self) -> Result<usize, RemoteError> {
        if self.outgoing.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(&mut self.outgoing);
        let count = batch.len();
        self.room.publish(self.client_id, batch)?;
        log::debug!("client {} published {count} deltas", self.client_id);
        Ok(count)
    }
}

impl Drop for MemoryList {
    fn drop(&mut self) {
        if let Ok(mut state) = self.room.state.write() {
            state.subscribers.remove(&self.client_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str) -> Node {
        Node::paragraph(id).with_id(id)
    }

    #[test]
    fn test_commit_fans_out_to_others_only() {
        let room = MemoryRoom::new();
        let mut alice = room.join(Uuid::new_v4());
        let mut bob = room.join(Uuid::new_v4());
        let mut alice_rx = alice.subscribe();
        let mut bob_rx = bob.subscribe();

        alice.insert(0, block("a1")).unwrap();
        alice.insert(1, block("b1")).unwrap();
        assert_eq!(alice.commit().unwrap(), 2);

        assert!(alice_rx.try_next().is_none());
        let batch = bob_rx.try_next().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(bob.to_vec().unwrap(), vec![block("a1"), block("b1")]);
    }

    #[test]
    fn test_empty_commit_publishes_nothing() {
        let room = MemoryRoom::new();
        let mut alice = room.join(Uuid::new_v4());
        let mut bob = room.join(Uuid::new_v4());
        let mut bob_rx = bob.subscribe();

        assert_eq!(alice.commit().unwrap(), 0);
        assert!(bob_rx.try_next().is_none());
        assert_eq!(room.stats().unwrap().batches_published, 0);
    }

    #[test]
    fn test_move_uses_final_index() {
        let room = MemoryRoom::with_items(vec![block("a1"), block("b1"), block("c1")]);
        let mut list = room.join(Uuid::new_v4());
        list.move_item(0, 2).unwrap();
        let ids: Vec<_> = list
            .to_vec()
            .unwrap()
            .into_iter()
            .map(|n| n.id.unwrap().to_string())
            .collect();
        assert_eq!(ids, ["b1", "c1", "a1"]);
    }

    #[test]
    fn test_out_of_bounds_writes_rejected() {
        let room = MemoryRoom::with_items(vec![block("a1")]);
        let mut list = room.join(Uuid::new_v4());
        assert_eq!(
            list.insert(3, block("x")),
            Err(RemoteError::OutOfBounds { index: 3, len: 1 })
        );
        assert!(list.delete(1).is_err());
        assert!(list.set(1, block("x")).is_err());
        assert!(list.move_item(0, 1).is_err());
        assert!(list.uncommitted().is_empty());
    }

    #[test]
    fn test_find_index() {
        let room = MemoryRoom::with_items(vec![block("a1"), block("b1")]);
        let list = room.join(Uuid::new_v4());
        let found = list
            .find_index(&|n: &Node| n.id.as_ref().map(|id| id.as_str()) == Some("b1"))
            .unwrap();
        assert_eq!(found, Some(1));
    }

    #[test]
    fn test_drop_leaves_room() {
        let room = MemoryRoom::new();
        let alice = room.join(Uuid::new_v4());
        let _bob = room.join(Uuid::new_v4());
        assert_eq!(room.stats().unwrap().clients, 2);
        drop(alice);
        assert_eq!(room.stats().unwrap().clients, 1);
    }
}
