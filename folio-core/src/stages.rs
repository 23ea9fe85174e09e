//! Editor behaviour as an ordered list of named transform stages.
//!
//! A [`StagePipeline`] is the single dispatcher: every hook is invoked on
//! the stages in declared order, so composition is data rather than a
//! chain of wrappers.

use crate::document::Document;
use crate::editor::EditorConfig;
use crate::identity::{assign_split_id, identity_fixes, IdGenerator};
use crate::node::{Node, NodeKind, NodeProperties};
use crate::operation::Operation;
use crate::selection::{Point, Selection};

pub trait TransformStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite an operation before it touches `doc`.
    fn on_apply(&self, op: Operation, _doc: &Document, _ids: &mut IdGenerator) -> Operation {
        op
    }

    /// Operations that fix an invariant this stage owns, or nothing when
    /// the document is already valid.
    fn on_normalize(&self, _doc: &Document, _ids: &mut IdGenerator) -> Vec<Operation> {
        Vec::new()
    }

    /// Take over a return key press at `at`. `None` defers to later stages.
    fn on_insert_break(&self, _doc: &Document, _at: &Point) -> Option<Vec<Operation>> {
        None
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StagePipeline {
    stages: Vec<Box<dyn TransformStage>>,
}

impl StagePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// `identity`, `layout`, `block_break`.
    pub fn standard(config: &EditorConfig) -> Self {
        Self::new()
            .with_stage(IdentityStage)
            .with_stage(LayoutStage::new(config.default_title.clone()))
            .with_stage(BlockBreakStage)
    }

    pub fn with_stage(mut self, stage: impl TransformStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn on_apply(&self, op: Operation, doc: &Document, ids: &mut IdGenerator) -> Operation {
        self.stages
            .iter()
            .fold(op, |op, stage| stage.on_apply(op, doc, ids))
    }

    /// One normalization pass: the fixes of the first stage that has any.
    pub fn normalize_pass(&self, doc: &Document, ids: &mut IdGenerator) -> Vec<Operation> {
        for stage in &self.stages {
            let fixes = stage.on_normalize(doc, ids);
            if !fixes.is_empty() {
                log::debug!("stage {}: {} normalization ops", stage.name(), fixes.len());
                return fixes;
            }
        }
        Vec::new()
    }

    pub fn insert_break(&self, doc: &Document, at: &Point) -> Vec<Operation> {
        self.stages
            .iter()
            .find_map(|stage| stage.on_insert_break(doc, at))
            .unwrap_or_else(|| split_block(doc, at, NodeProperties::default()))
    }
}

// ─── Stages ──────────────────────────────────────────────────────────

/// Unique top-level ids, and a fresh id for every split-off block.
pub struct IdentityStage;

impl TransformStage for IdentityStage {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn on_apply(&self, op: Operation, doc: &Document, ids: &mut IdGenerator) -> Operation {
        assign_split_id(op, &doc.children, ids)
    }

    fn on_normalize(&self, doc: &Document, ids: &mut IdGenerator) -> Vec<Operation> {
        identity_fixes(&doc.children, ids)
    }
}

/// Exactly one title, at index 0.
pub struct LayoutStage {
    default_title: String,
}

impl LayoutStage {
    pub fn new(default_title: impl Into<String>) -> Self {
        Self {
            default_title: default_title.into(),
        }
    }
}

impl TransformStage for LayoutStage {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn on_normalize(&self, doc: &Document, ids: &mut IdGenerator) -> Vec<Operation> {
        if doc.is_empty() {
            return vec![Operation::InsertNode {
                path: vec![0],
                node: Node::title(self.default_title.clone()).with_id(ids.next_id()),
            }];
        }

        let mut titles = doc
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == NodeKind::Title)
            .map(|(index, _)| index);

        match titles.next() {
            Some(first) if first > 0 => vec![Operation::MoveNode {
                path: vec![first],
                new_path: vec![0],
            }],
            Some(_) => titles
                .map(|index| Operation::SetNode {
                    path: vec![index],
                    properties: NodeProperties::default().with_kind(NodeKind::Paragraph),
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Return-key behaviour per block kind.
pub struct BlockBreakStage;

impl TransformStage for BlockBreakStage {
    fn name(&self) -> &'static str {
        "block_break"
    }

    fn on_insert_break(&self, doc: &Document, at: &Point) -> Option<Vec<Operation>> {
        let (index, block) = doc.block_at(at)?;

        if block.kind.is_void() {
            let caret = Point::new(vec![index + 1, 0], 0);
            return Some(vec![
                Operation::InsertNode {
                    path: vec![index + 1],
                    node: Node::paragraph(""),
                },
                Operation::SetSelection {
                    selection: Some(Selection::collapsed(caret)),
                },
            ]);
        }

        let properties = match block.kind {
            kind if kind.is_heading_like() => {
                NodeProperties::default().with_kind(NodeKind::Paragraph)
            }
            NodeKind::ToDo => NodeProperties::default().with_attribute("checked", false),
            _ => return None,
        };
        Some(split_block(doc, at, properties))
    }
}

/// Split the block containing `at` from the text leaf upwards and put the
/// caret at the start of the new block. Only the top-level split carries
/// `properties`.
pub fn split_block(doc: &Document, at: &Point, properties: NodeProperties) -> Vec<Operation> {
    let path = &at.path;
    if path.len() < 2 || doc.node(path).is_none() {
        return Vec::new();
    }

    let mut ops = vec![Operation::SplitNode {
        path: path.clone(),
        position: at.offset,
        properties: NodeProperties::default(),
    }];
    for depth in (0..path.len() - 1).rev() {
        ops.push(Operation::SplitNode {
            path: path[..=depth].to_vec(),
            position: path[depth + 1] + 1,
            properties: if depth == 0 {
                properties.clone()
            } else {
                NodeProperties::default()
            },
        });
    }

    let mut caret = vec![0; path.len()];
    caret[0] = path[0] + 1;
    ops.push(Operation::SetSelection {
        selection: Some(Selection::collapsed(Point::new(caret, 0))),
    });
    ops
}
