//! The Local Document Tree.
//!
//! [`Editor::apply`] is the one mutation entry point. Every operation, from
//! the user or replayed from a remote delta, passes the stage pipeline,
//! lands in the tree, and is recorded with its origin in the tick buffer
//! that the sync layer drains with [`Editor::take_operations`].

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::ApplyError;
use crate::identity::IdGenerator;
use crate::node::{BlockId, Node, NodeProperties};
use crate::operation::{Operation, Origin, TaggedOperation};
use crate::selection::{Path, Point, Selection};
use crate::stages::StagePipeline;

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Text of the title synthesized for an empty document.
    pub default_title: String,
    /// Upper bound on normalization passes per settle.
    pub max_normalize_passes: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_title: "Untitled".to_string(),
            max_normalize_passes: 100,
        }
    }
}

pub struct Editor {
    document: Document,
    pipeline: StagePipeline,
    ids: IdGenerator,
    config: EditorConfig,
    /// Operations applied since the last `take_operations`.
    pending: Vec<TaggedOperation>,
    suspend_depth: usize,
}

impl Editor {
    /// An empty editor with the standard pipeline. Nothing is normalized
    /// until the first operation or an explicit [`Editor::normalize`].
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(document: Document, config: EditorConfig) -> Self {
        Self {
            document,
            pipeline: StagePipeline::standard(&config),
            ids: IdGenerator::default(),
            config,
            pending: Vec::new(),
            suspend_depth: 0,
        }
    }

    pub fn with_pipeline(mut self, pipeline: StagePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn children(&self) -> &[Node] {
        &self.document.children
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.document.selection.as_ref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &StagePipeline {
        &self.pipeline
    }

    pub fn block_ids(&self) -> Vec<Option<BlockId>> {
        self.document.children.iter().map(|n| n.id.clone()).collect()
    }

    pub fn is_normalizing_suspended(&self) -> bool {
        self.suspend_depth > 0
    }

    // ─── Application ─────────────────────────────────────────────

    pub fn apply(&mut self, op: Operation, origin: Origin) -> Result<(), ApplyError> {
        let op = self.pipeline.on_apply(op, &self.document, &mut self.ids);
        self.document.apply(&op)?;
        self.pending.push(TaggedOperation { op, origin });

        if self.suspend_depth == 0 {
            self.normalize()?;
        }
        Ok(())
    }

    /// Run `f` with normalization suspended, then normalize once when the
    /// outermost suspension ends. Normalization runs even if `f` fails.
    pub fn without_normalizing<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ApplyError>,
    ) -> Result<T, ApplyError> {
        self.suspend_depth += 1;
        let result = f(self);
        self.suspend_depth -= 1;

        if self.suspend_depth == 0 {
            self.normalize()?;
        }
        result
    }

    /// Apply stage fixes until a pass produces none. Fixes are tagged
    /// `Local`. Returns the number of operations applied.
    pub fn normalize(&mut self) -> Result<usize, ApplyError> {
        let mut applied = 0;
        for _ in 0..self.config.max_normalize_passes {
            let fixes = self.pipeline.normalize_pass(&self.document, &mut self.ids);
            if fixes.is_empty() {
                return Ok(applied);
            }
            for op in fixes {
                let op = self.pipeline.on_apply(op, &self.document, &mut self.ids);
                self.document.apply(&op)?;
                self.pending.push(TaggedOperation::local(op));
                applied += 1;
            }
        }
        log::warn!(
            "normalization did not settle after {} passes",
            self.config.max_normalize_passes
        );
        Ok(applied)
    }

    /// Drain the operations recorded since the last call: one edit tick.
    pub fn take_operations(&mut self) -> Vec<TaggedOperation> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending_operations(&self) -> bool {
        !self.pending.is_empty()
    }

    // ─── Commands ────────────────────────────────────────────────

    pub fn select(&mut self, selection: Option<Selection>) -> Result<(), ApplyError> {
        self.apply(Operation::SetSelection { selection }, Origin::Local)
    }

    pub fn set_caret(&mut self, path: Path, offset: usize) -> Result<(), ApplyError> {
        self.select(Some(Selection::collapsed(Point::new(path, offset))))
    }

    /// Return key at the caret. Does nothing without a selection.
    pub fn insert_break(&mut self) -> Result<(), ApplyError> {
        let Some(at) = self.selection().map(|s| s.focus.clone()) else {
            return Ok(());
        };
        let ops = self.pipeline.insert_break(&self.document, &at);
        self.apply_all(ops, Origin::Local)
    }

    /// Replace the text of the leaf at `path`, keeping the caret on it.
    pub fn set_text(&mut self, path: &[usize], text: impl Into<String>) -> Result<(), ApplyError> {
        let old = self
            .document
            .node(path)
            .filter(|node| node.is_leaf())
            .cloned()
            .ok_or_else(|| ApplyError::InvalidPath(path.to_vec()))?;
        let mut new = old.clone();
        new.text = Some(text.into());
        let len = new.plain_text().chars().count();
        let previous = self.document.selection.clone();

        self.without_normalizing(|editor| {
            editor.apply(
                Operation::RemoveNode {
                    path: path.to_vec(),
                    node: old,
                },
                Origin::Local,
            )?;
            editor.apply(
                Operation::InsertNode {
                    path: path.to_vec(),
                    node: new,
                },
                Origin::Local,
            )?;
            if let (Some(selection), None) = (previous, &editor.document.selection) {
                let clamp = |point: Point| Point {
                    offset: point.offset.min(len),
                    ..point
                };
                editor.select(Some(Selection::new(
                    clamp(selection.anchor),
                    clamp(selection.focus),
                )))?;
            }
            Ok(())
        })
    }

    pub fn insert_block(&mut self, index: usize, node: Node) -> Result<(), ApplyError> {
        self.apply(
            Operation::InsertNode {
                path: vec![index],
                node,
            },
            Origin::Local,
        )
    }

    pub fn remove_block(&mut self, index: usize) -> Result<(), ApplyError> {
        let node = self
            .document
            .children
            .get(index)
            .cloned()
            .ok_or_else(|| ApplyError::OutOfRange {
                parent: Vec::new(),
                index,
                len: self.document.len(),
            })?;
        self.apply(
            Operation::RemoveNode {
                path: vec![index],
                node,
            },
            Origin::Local,
        )
    }

    /// Move a block so it ends up at index `to`.
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<(), ApplyError> {
        self.apply(
            Operation::MoveNode {
                path: vec![from],
                new_path: vec![to],
            },
            Origin::Local,
        )
    }

    pub fn set_block(&mut self, index: usize, properties: NodeProperties) -> Result<(), ApplyError> {
        self.apply(
            Operation::SetNode {
                path: vec![index],
                properties,
            },
            Origin::Local,
        )
    }

    /// Apply a group of operations as one normalization unit.
    pub fn apply_all(
        &mut self,
        ops: impl IntoIterator<Item = Operation>,
        origin: Origin,
    ) -> Result<(), ApplyError> {
        self.without_normalizing(|editor| {
            ops.into_iter()
                .try_for_each(|op| editor.apply(op, origin))
        })
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
