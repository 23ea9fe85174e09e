//! One open document: an editor, its remote list, and the engine between them.

use folio_core::{local_only, ApplyError, Document, Editor, EditorConfig, Operation, Origin};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{SyncEngine, SyncStats, SyncTargets};
use crate::error::SyncError;
use crate::presence::{BlockPresence, PresenceChannel};
use crate::remote::{DeltaStream, RemoteList};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub editor: EditorConfig,
    /// Identifies this client in the room and tags its remote writes.
    pub client_id: Uuid,
    pub user_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let client_id = Uuid::new_v4();
        Self {
            editor: EditorConfig::default(),
            client_id,
            user_name: format!("User-{}", &client_id.to_string()[..8]),
        }
    }
}

/// Drives a [`SyncEngine`] for one editor.
///
/// Callers edit through [`DocumentSession::edit`] (or edit the editor
/// directly and call [`DocumentSession::tick`]) and feed remote changes in
/// with [`DocumentSession::pump_remote`].
pub struct DocumentSession<R: RemoteList, P: PresenceChannel = Vec<BlockPresence>> {
    config: SessionConfig,
    editor: Editor,
    remote: R,
    presence: P,
    engine: SyncEngine,
    deltas: DeltaStream,
}

impl<R: RemoteList, P: PresenceChannel> DocumentSession<R, P> {
    pub fn open(config: SessionConfig, remote: R, presence: P) -> Result<Self, SyncError> {
        let editor = Editor::new(config.editor.clone());
        Self::open_with_editor(config, editor, remote, presence)
    }

    /// Open with a preconfigured editor. Its current blocks are replaced by
    /// the remote list's contents.
    pub fn open_with_editor(
        config: SessionConfig,
        mut editor: Editor,
        mut remote: R,
        presence: P,
    ) -> Result<Self, SyncError> {
        let deltas = remote.subscribe();
        let items = remote.to_vec()?;
        let loaded = items.len();

        let clear = editor
            .children()
            .iter()
            .enumerate()
            .rev()
            .map(|(index, node)| Operation::RemoveNode {
                path: vec![index],
                node: node.clone(),
            })
            .collect::<Vec<_>>();
        let load = items
            .into_iter()
            .enumerate()
            .map(|(index, node)| Operation::InsertNode {
                path: vec![index],
                node,
            });
        editor.apply_all(clear.into_iter().chain(load), Origin::Remote)?;

        log::info!(
            "session {} ({}) opened with {loaded} remote blocks",
            config.client_id,
            config.user_name
        );

        let mut session = Self {
            config,
            editor,
            remote,
            presence,
            engine: SyncEngine::new(),
            deltas,
        };
        // An empty or invalid remote list is fixed locally, then written back.
        session.tick()?;
        Ok(session)
    }

    pub fn with_engine(mut self, engine: SyncEngine) -> Self {
        self.engine = engine;
        self
    }

    /// End of an edit tick: commit everything recorded since the last one.
    pub fn tick(&mut self) -> Result<(), SyncError> {
        let ops = local_only(self.editor.take_operations());
        let mut targets = SyncTargets {
            editor: &mut self.editor,
            remote: &mut self.remote,
            presence: &mut self.presence,
        };
        self.engine.commit_local_operations(ops, &mut targets)
    }

    /// Apply every delta batch that has arrived, then commit whatever
    /// normalization they caused. Returns the number of batches.
    pub fn pump_remote(&mut self) -> Result<usize, SyncError> {
        let mut batches = 0;
        while let Some(batch) = self.deltas.try_next() {
            let mut targets = SyncTargets {
                editor: &mut self.editor,
                remote: &mut self.remote,
                presence: &mut self.presence,
            };
            self.engine.apply_remote_deltas(batch, &mut targets)?;
            batches += 1;
        }
        if batches > 0 {
            self.tick()?;
        }
        Ok(batches)
    }

    /// Run one edit tick.
    pub fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut Editor) -> Result<T, ApplyError>,
    ) -> Result<T, SyncError> {
        let value = f(&mut self.editor)?;
        self.tick()?;
        Ok(value)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client_id(&self) -> Uuid {
        self.config.client_id
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn document(&self) -> &Document {
        self.editor.document()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    pub fn presence(&self) -> &P {
        &self.presence
    }

    pub fn presence_mut(&mut self) -> &mut P {
        &mut self.presence
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn stats(&self) -> &SyncStats {
        self.engine.stats()
    }

    /// Close the session and hand back the final document. Dropping the
    /// remote unsubscribes from it.
    pub fn close(self) -> Document {
        log::info!(
            "session {} closed after {} transactions",
            self.config.client_id,
            self.engine.context().completed()
        );
        self.editor.document().clone()
    }
}
