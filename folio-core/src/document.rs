//! The local document tree and the low-level application of operations.
//!
//! [`Document::apply`] is pure tree surgery. Stage hooks, normalization and
//! origin tracking live one level up in [`crate::editor::Editor`].

use serde::{Deserialize, Serialize};

use crate::error::ApplyError;
use crate::node::{BlockId, Node};
use crate::operation::Operation;
use crate::selection::{is_ancestor, Point, Selection};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Top-level blocks.
    pub children: Vec<Node>,
    pub selection: Option<Selection>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(children: Vec<Node>) -> Self {
        Self {
            children,
            selection: None,
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children.as_ref()?.get(*index)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = node.children.as_mut()?.get_mut(*index)?;
        }
        Some(node)
    }

    /// Sibling list under `parent`; `[]` is the root.
    fn siblings_mut(&mut self, parent: &[usize]) -> Result<&mut Vec<Node>, ApplyError> {
        if parent.is_empty() {
            return Ok(&mut self.children);
        }
        self.node_mut(parent)
            .and_then(|node| node.children.as_mut())
            .ok_or_else(|| ApplyError::InvalidPath(parent.to_vec()))
    }

    /// Position of the block carrying `id`.
    pub fn position_of(&self, id: &BlockId) -> Option<usize> {
        self.children
            .iter()
            .position(|node| node.id.as_ref() == Some(id))
    }

    /// Top-level block containing `point`.
    pub fn block_at(&self, point: &Point) -> Option<(usize, &Node)> {
        let index = point.block_index()?;
        self.children.get(index).map(|node| (index, node))
    }

    pub fn apply(&mut self, op: &Operation) -> Result<(), ApplyError> {
        match op {
            Operation::InsertNode { path, node } => {
                let (index, parent) = split_path(path)?;
                let siblings = self.siblings_mut(parent)?;
                if index > siblings.len() {
                    return Err(out_of_range(parent, index, siblings.len()));
                }
                siblings.insert(index, node.clone());
            }
            Operation::RemoveNode { path, .. } => {
                self.take(path)?;
            }
            Operation::MoveNode { path, new_path } => {
                if path == new_path {
                    return Ok(());
                }
                if is_ancestor(path, new_path) {
                    return Err(ApplyError::MoveIntoSelf {
                        from: path.clone(),
                        to: new_path.clone(),
                    });
                }
                let node = self.take(path)?;
                if let Err(err) = self.put(new_path, node.clone()) {
                    self.put(path, node)?;
                    return Err(err);
                }
            }
            Operation::SplitNode {
                path,
                position,
                properties,
            } => {
                let (index, parent) = split_path(path)?;
                let node = self
                    .node_mut(path)
                    .ok_or_else(|| ApplyError::InvalidPath(path.clone()))?;
                let mut right = node.clone();
                if let Some(text) = node.text.as_mut() {
                    let byte = char_to_byte(text, *position)
                        .ok_or_else(|| ApplyError::Unsplittable(path.clone(), *position))?;
                    right.text = Some(text.split_off(byte));
                } else if let Some(children) = node.children.as_mut() {
                    if *position > children.len() {
                        return Err(ApplyError::Unsplittable(path.clone(), *position));
                    }
                    right.children = Some(children.split_off(*position));
                } else {
                    return Err(ApplyError::Unsplittable(path.clone(), *position));
                }
                right.apply_properties(properties);
                self.siblings_mut(parent)?.insert(index + 1, right);
            }
            Operation::SetNode { path, properties } => {
                self.node_mut(path)
                    .ok_or_else(|| ApplyError::InvalidPath(path.clone()))?
                    .apply_properties(properties);
            }
            Operation::SetSelection { selection } => {
                self.selection = selection.clone();
                return Ok(());
            }
        }

        self.selection = self.selection.take().and_then(|s| s.transform(op));
        Ok(())
    }

    fn take(&mut self, path: &[usize]) -> Result<Node, ApplyError> {
        let (index, parent) = split_path(path)?;
        let siblings = self.siblings_mut(parent)?;
        if index >= siblings.len() {
            return Err(out_of_range(parent, index, siblings.len()));
        }
        Ok(siblings.remove(index))
    }

    fn put(&mut self, path: &[usize], node: Node) -> Result<(), ApplyError> {
        let (index, parent) = split_path(path)?;
        let siblings = self.siblings_mut(parent)?;
        if index > siblings.len() {
            return Err(out_of_range(parent, index, siblings.len()));
        }
        siblings.insert(index, node);
        Ok(())
    }
}

fn split_path(path: &[usize]) -> Result<(usize, &[usize]), ApplyError> {
    path.split_last()
        .map(|(index, parent)| (*index, parent))
        .ok_or_else(|| ApplyError::InvalidPath(Vec::new()))
}

fn out_of_range(parent: &[usize], index: usize, len: usize) -> ApplyError {
    ApplyError::OutOfRange {
        parent: parent.to_vec(),
        index,
        len,
    }
}

/// Byte index of the `chars`-th character, or `None` past the end.
fn char_to_byte(text: &str, chars: usize) -> Option<usize> {
    if chars == 0 {
        return Some(0);
    }
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, NodeProperties};

    fn doc() -> Document {
        Document::with_children(vec![
            Node::paragraph("Hello World").with_id("a1"),
            Node::paragraph("second").with_id("b1"),
            Node::paragraph("third").with_id("c1"),
        ])
    }

    fn ids(doc: &Document) -> Vec<String> {
        doc.children
            .iter()
            .map(|n| n.id.as_ref().map(|id| id.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_insert_and_remove_top_level() {
        let mut d = doc();
        d.apply(&Operation::InsertNode {
            path: vec![1],
            node: Node::paragraph("new").with_id("d1"),
        })
        .unwrap();
        assert_eq!(ids(&d), ["a1", "d1", "b1", "c1"]);

        d.apply(&Operation::RemoveNode {
            path: vec![0],
            node: Node::paragraph(""),
        })
        .unwrap();
        assert_eq!(ids(&d), ["d1", "b1", "c1"]);
    }

    #[test]
    fn test_insert_past_end_is_rejected() {
        let mut d = doc();
        let err = d
            .apply(&Operation::InsertNode {
                path: vec![5],
                node: Node::paragraph(""),
            })
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::OutOfRange {
                parent: vec![],
                index: 5,
                len: 3
            }
        );
        assert_eq!(d, doc());
    }

    #[test]
    fn test_move_uses_final_index() {
        let mut d = doc();
        d.apply(&Operation::MoveNode {
            path: vec![1],
            new_path: vec![0],
        })
        .unwrap();
        assert_eq!(ids(&d), ["b1", "a1", "c1"]);

        d.apply(&Operation::MoveNode {
            path: vec![0],
            new_path: vec![2],
        })
        .unwrap();
        assert_eq!(ids(&d), ["a1", "c1", "b1"]);
    }

    #[test]
    fn test_failed_move_restores_node() {
        let mut d = doc();
        let result = d.apply(&Operation::MoveNode {
            path: vec![0],
            new_path: vec![7],
        });
        assert!(result.is_err());
        assert_eq!(d, doc());
    }

    #[test]
    fn test_split_text_then_block() {
        let mut d = doc();
        d.apply(&Operation::SplitNode {
            path: vec![0, 0],
            position: 5,
            properties: NodeProperties::default(),
        })
        .unwrap();
        d.apply(&Operation::SplitNode {
            path: vec![0],
            position: 1,
            properties: NodeProperties::default().with_id("n1"),
        })
        .unwrap();

        assert_eq!(ids(&d), ["a1", "n1", "b1", "c1"]);
        assert_eq!(d.children[0].plain_text(), "Hello");
        assert_eq!(d.children[1].plain_text(), " World");
        assert_eq!(d.children[1].kind, NodeKind::Paragraph);
    }

    #[test]
    fn test_split_counts_characters() {
        let mut d = Document::with_children(vec![Node::paragraph("héllo").with_id("a1")]);
        d.apply(&Operation::SplitNode {
            path: vec![0, 0],
            position: 2,
            properties: NodeProperties::default(),
        })
        .unwrap();
        let block = &d.children[0];
        let runs: Vec<String> = block
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(Node::plain_text)
            .collect();
        assert_eq!(runs, ["hé", "llo"]);
    }

    #[test]
    fn test_split_past_end_is_rejected() {
        let mut d = doc();
        let err = d
            .apply(&Operation::SplitNode {
                path: vec![1, 0],
                position: 99,
                properties: NodeProperties::default(),
            })
            .unwrap_err();
        assert_eq!(err, ApplyError::Unsplittable(vec![1, 0], 99));
    }

    #[test]
    fn test_selection_tracks_structure() {
        let mut d = doc();
        d.apply(&Operation::SetSelection {
            selection: Some(Selection::collapsed(Point::new(vec![2, 0], 1))),
        })
        .unwrap();
        d.apply(&Operation::RemoveNode {
            path: vec![0],
            node: Node::paragraph(""),
        })
        .unwrap();
        let caret = d.selection.as_ref().unwrap().focus.clone();
        assert_eq!(caret, Point::new(vec![1, 0], 1));
        assert_eq!(d.block_at(&caret).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_position_of() {
        let d = doc();
        assert_eq!(d.position_of(&BlockId::from("c1")), Some(2));
        assert_eq!(d.position_of(&BlockId::from("zz")), None);
    }
}
