//! Two collaborators on one in-process room.
//!
//! Each side owns a [`DocumentSession`] whose presence channel is a
//! [`PresenceRoom`]. [`DemoState::sync`] plays the part of the network:
//! it pumps remote deltas and hands encoded presence messages across.

use folio_core::{ApplyError, Editor, Node};
use folio_sync::{
    DocumentSession, MemoryList, MemoryRoom, PresenceRoom, SessionConfig, SyncError,
};

type Session = DocumentSession<MemoryList, PresenceRoom>;

pub struct DemoState {
    pub room: MemoryRoom,
    pub alice: Session,
    pub bob: Session,
}

impl DemoState {
    pub fn new() -> Result<Self, SyncError> {
        let room = MemoryRoom::new();
        let mut alice = join(&room, "alice")?;
        let mut bob = join(&room, "bob")?;

        let hello = alice.presence().create_join_message("alice");
        bob.presence_mut().handle_message(&hello);
        let hello = bob.presence().create_join_message("bob");
        alice.presence_mut().handle_message(&hello);

        Ok(Self { room, alice, bob })
    }

    pub fn edit_alice<T>(
        &mut self,
        f: impl FnOnce(&mut Editor) -> Result<T, ApplyError>,
    ) -> Result<T, SyncError> {
        let value = self.alice.edit(f)?;
        self.sync()?;
        Ok(value)
    }

    pub fn edit_bob<T>(
        &mut self,
        f: impl FnOnce(&mut Editor) -> Result<T, ApplyError>,
    ) -> Result<T, SyncError> {
        let value = self.bob.edit(f)?;
        self.sync()?;
        Ok(value)
    }

    /// Deliver pending deltas and presence both ways until quiet.
    pub fn sync(&mut self) -> Result<(), SyncError> {
        loop {
            let batches = self.alice.pump_remote()? + self.bob.pump_remote()?;
            let messages =
                relay(&mut self.alice, &mut self.bob)? + relay(&mut self.bob, &mut self.alice)?;
            if batches == 0 && messages == 0 {
                return Ok(());
            }
        }
    }

    pub fn converged(&self) -> bool {
        let shared = self.room.snapshot().unwrap_or_default();
        self.alice.document().children == self.bob.document().children
            && self.alice.document().children == shared
    }

    pub fn outline(session: &Session) -> Vec<String> {
        session
            .document()
            .children
            .iter()
            .map(|node: &Node| {
                let id = node.id.as_ref().map(|id| id.as_str()).unwrap_or("?");
                format!("{:?} [{id}] {:?}", node.kind, node.plain_text())
            })
            .collect()
    }
}

fn join(room: &MemoryRoom, name: &str) -> Result<Session, SyncError> {
    let config = SessionConfig {
        user_name: name.into(),
        ..SessionConfig::default()
    };
    let remote = room.join(config.client_id);
    let presence = PresenceRoom::new(config.client_id);
    DocumentSession::open(config, remote, presence)
}

fn relay(from: &mut Session, to: &mut Session) -> Result<usize, SyncError> {
    let outgoing = from.presence_mut().take_outgoing();
    let count = outgoing.len();
    for bytes in outgoing {
        to.presence_mut().handle_bytes(&bytes)?;
    }
    Ok(count)
}
