//! Remote list backed by a `yrs` array.
//!
//! Each block is stored as one JSON string. Local writes run in
//! transactions tagged with this client's origin; the array observer skips
//! those and turns every other transaction (a merged peer update) into one
//! delta batch.

use std::sync::{Arc, Mutex};

use folio_core::Node;
use uuid::Uuid;
use yrs::types::Change;
use yrs::updates::decoder::Decode;
use yrs::{
    Any, Array, ArrayRef, Doc, Observable, Origin, Out, ReadTxn, StateVector, Subscription,
    Transact, Update,
};

use super::{check_index, check_insert_index, DeltaBatch, DeltaSender, DeltaStream, RemoteList};
use crate::delta::RemoteDelta;
use crate::error::RemoteError;

const ARRAY_NAME: &str = "blocks";

pub struct YrsList {
    doc: Doc,
    array: ArrayRef,
    origin: Origin,
    subscribers: Arc<Mutex<Vec<DeltaSender>>>,
    /// State vector at the last `take_update`.
    shipped: StateVector,
    uncommitted: usize,
    _subscription: Subscription,
}

impl YrsList {
    pub fn new(client_id: Uuid) -> Self {
        Self::with_doc(Doc::new(), client_id)
    }

    pub fn with_doc(doc: Doc, client_id: Uuid) -> Self {
        let array = doc.get_or_insert_array(ARRAY_NAME);
        let origin = Origin::from(client_id.to_string().as_str());
        let subscribers: Arc<Mutex<Vec<DeltaSender>>> = Arc::default();

        let own = origin.clone();
        let sinks = Arc::clone(&subscribers);
        let subscription = array.observe(move |txn, event| {
            if txn.origin() == Some(&own) {
                return;
            }
            let batch = changes_to_deltas(event.delta(txn));
            if batch.is_empty() {
                return;
            }
            if let Ok(mut sinks) = sinks.lock() {
                sinks.retain(|tx| tx.send(batch.clone()).is_ok());
            }
        });

        Self {
            doc,
            array,
            origin,
            subscribers,
            shipped: StateVector::default(),
            uncommitted: 0,
            _subscription: subscription,
        }
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    /// Encoded changes since the previous call, for shipping to peers.
    pub fn take_update(&mut self) -> Vec<u8> {
        let txn = self.doc.transact();
        let update = txn.encode_diff_v1(&self.shipped);
        self.shipped = txn.state_vector();
        update
    }

    /// Merge a peer's update. Subscribers receive the resulting batch.
    pub fn apply_update(&mut self, bytes: &[u8]) -> Result<(), RemoteError> {
        let update = Update::decode_v1(bytes).map_err(|e| RemoteError::Update(e.to_string()))?;
        let mut txn = self.doc.transact_mut();
        txn.apply_update(update)
            .map_err(|e| RemoteError::Update(e.to_string()))
    }

    fn write<T>(
        &mut self,
        f: impl FnOnce(&ArrayRef, &mut yrs::TransactionMut<'_>) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let value = f(&self.array, &mut txn)?;
        self.uncommitted += 1;
        Ok(value)
    }
}

impl RemoteList for YrsList {
    fn len(&self) -> Result<usize, RemoteError> {
        let txn = self.doc.transact();
        Ok(self.array.len(&txn) as usize)
    }

    fn get(&self, index: usize) -> Result<Option<Node>, RemoteError> {
        let txn = self.doc.transact();
        self.array
            .get(&txn, index as u32)
            .map(|value| decode_node(&value))
            .transpose()
    }

    fn insert(&mut self, index: usize, item: Node) -> Result<(), RemoteError> {
        let json = encode_node(&item)?;
        self.write(|array, txn| {
            check_insert_index(index, array.len(&*txn) as usize)?;
            array.insert(txn, index as u32, Any::from(json));
            Ok(())
        })
    }

    fn delete(&mut self, index: usize) -> Result<(), RemoteError> {
        self.write(|array, txn| {
            check_index(index, array.len(&*txn) as usize)?;
            array.remove(txn, index as u32);
            Ok(())
        })
    }

    /// Expressed as delete + insert within one transaction.
    fn move_item(&mut self, from: usize, to: usize) -> Result<(), RemoteError> {
        self.write(|array, txn| {
            let len = array.len(&*txn) as usize;
            check_index(from, len)?;
            check_index(to, len)?;
            let value = array
                .get(&*txn, from as u32)
                .ok_or(RemoteError::OutOfBounds { index: from, len })?;
            let json = match value {
                Out::Any(any) => any,
                other => return Err(RemoteError::Decode(format!("unexpected value {other:?}"))),
            };
            array.remove(txn, from as u32);
            array.insert(txn, to as u32, json);
            Ok(())
        })
    }

    fn set(&mut self, index: usize, item: Node) -> Result<(), RemoteError> {
        let json = encode_node(&item)?;
        self.write(|array, txn| {
            check_index(index, array.len(&*txn) as usize)?;
            array.remove(txn, index as u32);
            array.insert(txn, index as u32, Any::from(json));
            Ok(())
        })
    }

    fn to_vec(&self) -> Result<Vec<Node>, RemoteError> {
        let txn = self.doc.transact();
        self.array.iter(&txn).map(|value| decode_node(&value)).collect()
    }

    fn subscribe(&mut self) -> DeltaStream {
        let (tx, stream) = DeltaStream::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        stream
    }

    fn commit(&mut self) -> Result<usize, RemoteError> {
        Ok(std::mem::take(&mut self.uncommitted))
    }
}

fn encode_node(node: &Node) -> Result<String, RemoteError> {
    serde_json::to_string(node).map_err(|e| RemoteError::Encode(e.to_string()))
}

fn decode_node(value: &Out) -> Result<Node, RemoteError> {
    match value {
        Out::Any(Any::String(json)) => {
            serde_json::from_str(json).map_err(|e| RemoteError::Decode(e.to_string()))
        }
        other => Err(RemoteError::Decode(format!("unexpected value {other:?}"))),
    }
}

/// Walk a `yrs` change list with a cursor into the post-change array.
fn changes_to_deltas(changes: &[Change]) -> DeltaBatch {
    let mut batch = Vec::new();
    let mut cursor = 0usize;
    for change in changes {
        match change {
            Change::Retain(n) => cursor += *n as usize,
            Change::Removed(n) => {
                batch.extend((0..*n).map(|_| RemoteDelta::Delete { index: cursor }));
            }
            Change::Added(values) => {
                for value in values {
                    match decode_node(value) {
                        Ok(item) => batch.push(RemoteDelta::Insert {
                            index: cursor,
                            item,
                        }),
                        Err(e) => log::warn!("dropping undecodable block at {cursor}: {e}"),
                    }
                    cursor += 1;
                }
            }
        }
    }
    batch
}
