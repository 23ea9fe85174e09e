//! Local editing operations and their origin tags.

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeProperties};
use crate::selection::{Path, Selection};

/// A single structural or selection change to the local tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    InsertNode {
        path: Path,
        node: Node,
    },
    /// `node` is the removed value, kept so the operation can be inspected
    /// or inverted after the fact.
    RemoveNode {
        path: Path,
        node: Node,
    },
    /// Remove at `path`, then insert at `new_path` in the resulting tree.
    MoveNode {
        path: Path,
        new_path: Path,
    },
    /// Split the node at `path`: characters for text runs, children for
    /// elements. The right half lands at the next sibling path and takes
    /// `properties` on top of the original's.
    SplitNode {
        path: Path,
        position: usize,
        properties: NodeProperties,
    },
    SetNode {
        path: Path,
        properties: NodeProperties,
    },
    SetSelection {
        selection: Option<Selection>,
    },
}

impl Operation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::MoveNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::SetNode { path, .. } => Some(path),
            Operation::SetSelection { .. } => None,
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, Operation::SetSelection { .. })
    }

    /// Addresses a direct child of the document root.
    pub fn is_top_level(&self) -> bool {
        self.path().is_some_and(|path| path.len() == 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::InsertNode { .. } => "insert_node",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::MoveNode { .. } => "move_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::SetNode { .. } => "set_node",
            Operation::SetSelection { .. } => "set_selection",
        }
    }
}

/// Where an operation came from. Only `Local` operations may be written
/// to the replicated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedOperation {
    pub op: Operation,
    pub origin: Origin,
}

impl TaggedOperation {
    pub fn local(op: Operation) -> Self {
        Self {
            op,
            origin: Origin::Local,
        }
    }

    pub fn remote(op: Operation) -> Self {
        Self {
            op,
            origin: Origin::Remote,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// Drop everything that was replayed from remote deltas.
pub fn local_only(ops: impl IntoIterator<Item = TaggedOperation>) -> Vec<Operation> {
    ops.into_iter()
        .filter(TaggedOperation::is_local)
        .map(|tagged| tagged.op)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_only_filters_remote() {
        let ops = vec![
            TaggedOperation::remote(Operation::RemoveNode {
                path: vec![0],
                node: Node::paragraph("gone"),
            }),
            TaggedOperation::local(Operation::SetSelection { selection: None }),
        ];
        let local = local_only(ops);
        assert_eq!(local.len(), 1);
        assert!(local[0].is_selection());
    }

    #[test]
    fn test_top_level_detection() {
        let top = Operation::MoveNode {
            path: vec![1],
            new_path: vec![0],
        };
        let nested = Operation::SetNode {
            path: vec![1, 0],
            properties: NodeProperties::default(),
        };
        assert!(top.is_top_level());
        assert!(!nested.is_top_level());
        assert!(!Operation::SetSelection { selection: None }.is_top_level());
    }

    #[test]
    fn test_tagged_json() {
        let op = Operation::MoveNode {
            path: vec![1],
            new_path: vec![0],
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "move_node");
        assert_eq!(json["new_path"][0], 0);
    }
}
