//! Presence: which block each collaborator is on.
//!
//! ## Architecture
//!
//! ```text
//! SetSelection (local, selection-only tick)
//!       │
//!       ▼
//! PresenceBridge::on_selection()   (only when the value changes)
//!       │  BlockPresence { selected_block_id }
//!       ▼
//! PresenceChannel::update_my_presence()
//!       │
//!       ▼   PresenceRoom: PresenceMessage::Selection (bincode)
//! Remote PresenceRoom::handle_message()
//!       │
//!       ▼
//! users_on_block(id)
//! ```

use std::collections::HashMap;

use folio_core::{BlockId, Node, Operation, Selection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RemoteError;

// ───────────────────────────────────────────────────────────────────
// Local presence
// ───────────────────────────────────────────────────────────────────

/// Ephemeral per-user state shared with collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPresence {
    pub selected_block_id: Option<BlockId>,
}

impl BlockPresence {
    pub fn on(id: impl Into<BlockId>) -> Self {
        Self {
            selected_block_id: Some(id.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Sink for the local user's presence.
pub trait PresenceChannel {
    fn update_my_presence(&mut self, presence: BlockPresence);
}

/// Records every update. Useful when nothing is listening.
impl PresenceChannel for Vec<BlockPresence> {
    fn update_my_presence(&mut self, presence: BlockPresence) {
        self.push(presence);
    }
}

/// Derives [`BlockPresence`] from selection changes and forwards it.
#[derive(Debug, Clone, Default)]
pub struct PresenceBridge {
    last_sent: Option<BlockPresence>,
}

impl PresenceBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// The block under the selection anchor, if any.
    pub fn presence_for(selection: Option<&Selection>, children: &[Node]) -> BlockPresence {
        let selected_block_id = selection
            .and_then(|s| s.anchor.block_index())
            .and_then(|index| children.get(index))
            .and_then(|node| node.id.clone());
        BlockPresence { selected_block_id }
    }

    /// Forward the presence for a `SetSelection`. Other operations are
    /// ignored. Returns whether anything was sent.
    pub fn on_selection(
        &mut self,
        op: &Operation,
        children: &[Node],
        channel: &mut dyn PresenceChannel,
    ) -> bool {
        let Operation::SetSelection { selection } = op else {
            return false;
        };
        let presence = Self::presence_for(selection.as_ref(), children);
        if self.last_sent.as_ref() == Some(&presence) {
            return false;
        }
        channel.update_my_presence(presence.clone());
        self.last_sent = Some(presence);
        true
    }

    pub fn last_sent(&self) -> Option<&BlockPresence> {
        self.last_sent.as_ref()
    }
}

// ───────────────────────────────────────────────────────────────────
// Wire messages
// ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresenceMessage {
    Join { user_id: Uuid, user_name: String },
    Leave { user_id: Uuid },
    Selection { user_id: Uuid, presence: BlockPresence },
}

impl PresenceMessage {
    /// Encode to binary (bincode).
    pub fn encode(&self) -> Result<Vec<u8>, RemoteError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| RemoteError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RemoteError> {
        let (msg, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(msg)
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            PresenceMessage::Join { user_id, .. }
            | PresenceMessage::Leave { user_id }
            | PresenceMessage::Selection { user_id, .. } => *user_id,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Presence room
// ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPresence {
    pub user_name: String,
    pub presence: BlockPresence,
}

/// Tracks remote peers' presence and queues the local user's outgoing
/// messages.
pub struct PresenceRoom {
    local_user_id: Uuid,
    peers: HashMap<Uuid, PeerPresence>,
    outbox: Vec<Vec<u8>>,
}

impl PresenceRoom {
    pub fn new(local_user_id: Uuid) -> Self {
        Self {
            local_user_id,
            peers: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn local_user_id(&self) -> Uuid {
        self.local_user_id
    }

    pub fn handle_message(&mut self, msg: &PresenceMessage) {
        // Ignore our own messages
        if msg.user_id() == self.local_user_id {
            return;
        }

        match msg {
            PresenceMessage::Join { user_id, user_name } => {
                self.peers.insert(
                    *user_id,
                    PeerPresence {
                        user_name: user_name.clone(),
                        presence: BlockPresence::none(),
                    },
                );
            }
            PresenceMessage::Leave { user_id } => {
                self.peers.remove(user_id);
            }
            PresenceMessage::Selection { user_id, presence } => {
                // A selection from a peer we never saw join still counts.
                let peer = self.peers.entry(*user_id).or_insert_with(|| PeerPresence {
                    user_name: format!("Peer-{}", &user_id.to_string()[..8]),
                    presence: BlockPresence::none(),
                });
                peer.presence = presence.clone();
            }
        }
    }

    /// Decode and handle raw bytes from the network.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Result<(), RemoteError> {
        let msg = PresenceMessage::decode(bytes)?;
        self.handle_message(&msg);
        Ok(())
    }

    pub fn create_join_message(&self, user_name: impl Into<String>) -> PresenceMessage {
        PresenceMessage::Join {
            user_id: self.local_user_id,
            user_name: user_name.into(),
        }
    }

    pub fn create_leave_message(&self) -> PresenceMessage {
        PresenceMessage::Leave {
            user_id: self.local_user_id,
        }
    }

    /// Users whose selection is on `block`, sorted.
    pub fn users_on_block(&self, block: &BlockId) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.presence.selected_block_id.as_ref() == Some(block))
            .map(|(id, _)| *id)
            .collect();
        users.sort();
        users
    }

    pub fn peer(&self, user_id: &Uuid) -> Option<&PeerPresence> {
        self.peers.get(user_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Encoded messages waiting to be broadcast.
    pub fn take_outgoing(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outbox)
    }

    pub fn queue(&mut self, msg: &PresenceMessage) {
        match msg.encode() {
            Ok(bytes) => self.outbox.push(bytes),
            Err(e) => log::warn!("presence message not queued: {e}"),
        }
    }
}

impl PresenceChannel for PresenceRoom {
    fn update_my_presence(&mut self, presence: BlockPresence) {
        let msg = PresenceMessage::Selection {
            user_id: self.local_user_id,
            presence,
        };
        self.queue(&msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Point;

    fn children() -> Vec<Node> {
        vec![
            Node::title("Doc").with_id("t1"),
            Node::paragraph("body").with_id("p1"),
        ]
    }

    fn select(block: usize) -> Operation {
        Operation::SetSelection {
            selection: Some(Selection::collapsed(Point::new(vec![block, 0], 0))),
        }
    }

    #[test]
    fn test_bridge_resolves_anchor_block() {
        let mut bridge = PresenceBridge::new();
        let mut sent: Vec<BlockPresence> = Vec::new();

        assert!(bridge.on_selection(&select(1), &children(), &mut sent));
        assert_eq!(sent, vec![BlockPresence::on("p1")]);
    }

    #[test]
    fn test_bridge_sends_null_when_unresolved() {
        let mut bridge = PresenceBridge::new();
        let mut sent: Vec<BlockPresence> = Vec::new();

        bridge.on_selection(&select(5), &children(), &mut sent);
        bridge.on_selection(&select(1), &children(), &mut sent);
        bridge.on_selection(
            &Operation::SetSelection { selection: None },
            &children(),
            &mut sent,
        );
        assert_eq!(
            sent,
            vec![
                BlockPresence::none(),
                BlockPresence::on("p1"),
                BlockPresence::none()
            ]
        );
    }

    #[test]
    fn test_bridge_skips_unchanged() {
        let mut bridge = PresenceBridge::new();
        let mut sent: Vec<BlockPresence> = Vec::new();

        assert!(bridge.on_selection(&select(0), &children(), &mut sent));
        assert!(!bridge.on_selection(&select(0), &children(), &mut sent));
        assert_eq!(sent.len(), 1);
        assert_eq!(bridge.last_sent(), Some(&BlockPresence::on("t1")));
    }

    #[test]
    fn test_bridge_ignores_structural_ops() {
        let mut bridge = PresenceBridge::new();
        let mut sent: Vec<BlockPresence> = Vec::new();
        let op = Operation::MoveNode {
            path: vec![1],
            new_path: vec![0],
        };
        assert!(!bridge.on_selection(&op, &children(), &mut sent));
        assert!(sent.is_empty());
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = PresenceMessage::Selection {
            user_id: Uuid::new_v4(),
            presence: BlockPresence::on("p1"),
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(PresenceMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            PresenceMessage::decode(&[0xff; 3]),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn test_room_tracks_peers() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let mut room = PresenceRoom::new(me);

        room.handle_message(&PresenceMessage::Join {
            user_id: peer,
            user_name: "Bob".into(),
        });
        room.handle_message(&PresenceMessage::Selection {
            user_id: peer,
            presence: BlockPresence::on("p1"),
        });
        room.handle_message(&PresenceMessage::Selection {
            user_id: me,
            presence: BlockPresence::on("p1"),
        });

        assert_eq!(room.users_on_block(&BlockId::from("p1")), vec![peer]);
        assert_eq!(room.peer(&peer).map(|p| p.user_name.as_str()), Some("Bob"));

        room.handle_message(&PresenceMessage::Leave { user_id: peer });
        assert_eq!(room.peer_count(), 0);
    }

    #[test]
    fn test_room_as_channel_queues_selection() {
        let me = Uuid::new_v4();
        let mut room = PresenceRoom::new(me);
        room.update_my_presence(BlockPresence::on("t1"));

        let outgoing = room.take_outgoing();
        assert_eq!(outgoing.len(), 1);
        let msg = PresenceMessage::decode(&outgoing[0]).unwrap();
        assert_eq!(
            msg,
            PresenceMessage::Selection {
                user_id: me,
                presence: BlockPresence::on("t1")
            }
        );
    }
}
