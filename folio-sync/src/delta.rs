//! Remote deltas and their translation into local operations.
//!
//! Translation runs against a mirror of the local top-level children that
//! is updated delta by delta, so every index in a batch is interpreted in
//! the state left by the deltas before it.

use folio_core::{Node, Operation};
use serde::{Deserialize, Serialize};

/// A change record emitted by the replicated list. Indices are top-level
/// list positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteDelta {
    Insert { index: usize, item: Node },
    Delete { index: usize },
    Set { index: usize, item: Node },
    /// `to_index` is the final position of the moved item.
    Move { from_index: usize, to_index: usize },
}

impl RemoteDelta {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteDelta::Insert { .. } => "insert",
            RemoteDelta::Delete { .. } => "delete",
            RemoteDelta::Set { .. } => "set",
            RemoteDelta::Move { .. } => "move",
        }
    }
}

/// Outcome of translating one delta.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Apply(Vec<Operation>),
    /// Already reflected locally.
    Skip,
    /// Addresses an index outside the local tree.
    Stale,
}

/// Translate `delta` into local operations and advance `mirror` past it.
pub fn translate(delta: &RemoteDelta, mirror: &mut Vec<Node>) -> Translation {
    let len = mirror.len();
    match delta {
        RemoteDelta::Insert { index, item } => {
            if *index > len {
                return Translation::Stale;
            }
            if mirror.get(*index) == Some(item) {
                return Translation::Skip;
            }
            mirror.insert(*index, item.clone());
            Translation::Apply(vec![Operation::InsertNode {
                path: vec![*index],
                node: item.clone(),
            }])
        }
        RemoteDelta::Delete { index } => {
            if *index >= len {
                return Translation::Stale;
            }
            let node = mirror.remove(*index);
            Translation::Apply(vec![Operation::RemoveNode {
                path: vec![*index],
                node,
            }])
        }
        RemoteDelta::Set { index, item } => {
            let Some(current) = mirror.get_mut(*index) else {
                return Translation::Stale;
            };
            if current == item {
                return Translation::Skip;
            }
            let old = std::mem::replace(current, item.clone());
            Translation::Apply(vec![
                Operation::RemoveNode {
                    path: vec![*index],
                    node: old,
                },
                Operation::InsertNode {
                    path: vec![*index],
                    node: item.clone(),
                },
            ])
        }
        RemoteDelta::Move {
            from_index,
            to_index,
        } => {
            if *from_index >= len || *to_index >= len {
                return Translation::Stale;
            }
            if from_index == to_index {
                return Translation::Skip;
            }
            let node = mirror.remove(*from_index);
            mirror.insert(*to_index, node);
            Translation::Apply(vec![Operation::MoveNode {
                path: vec![*from_index],
                new_path: vec![*to_index],
            }])
        }
    }
}

/// Result of translating a whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedBatch {
    pub operations: Vec<Operation>,
    /// Local children after the batch.
    pub result: Vec<Node>,
    pub applied: usize,
    pub skipped: usize,
    pub stale: Vec<RemoteDelta>,
}

pub fn translate_batch(deltas: &[RemoteDelta], children: &[Node]) -> TranslatedBatch {
    let mut batch = TranslatedBatch {
        result: children.to_vec(),
        ..Default::default()
    };
    for delta in deltas {
        match translate(delta, &mut batch.result) {
            Translation::Apply(ops) => {
                batch.applied += 1;
                batch.operations.extend(ops);
            }
            Translation::Skip => batch.skipped += 1,
            Translation::Stale => batch.stale.push(delta.clone()),
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str) -> Node {
        Node::paragraph(id).with_id(id)
    }

    #[test]
    fn test_set_is_remove_then_insert() {
        let mut mirror = vec![block("a1"), block("b1")];
        let new = Node::paragraph("changed").with_id("b1");
        let translation = translate(
            &RemoteDelta::Set {
                index: 1,
                item: new.clone(),
            },
            &mut mirror,
        );
        assert_eq!(
            translation,
            Translation::Apply(vec![
                Operation::RemoveNode {
                    path: vec![1],
                    node: block("b1")
                },
                Operation::InsertNode {
                    path: vec![1],
                    node: new.clone()
                },
            ])
        );
        assert_eq!(mirror[1], new);
    }

    #[test]
    fn test_delete_carries_current_node() {
        let mut mirror = vec![block("a1"), block("b1")];
        match translate(&RemoteDelta::Delete { index: 0 }, &mut mirror) {
            Translation::Apply(ops) => assert_eq!(
                ops,
                vec![Operation::RemoveNode {
                    path: vec![0],
                    node: block("a1")
                }]
            ),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mirror, vec![block("b1")]);
    }

    #[test]
    fn test_stale_indices() {
        let mut mirror = vec![block("a1")];
        let stale = [
            RemoteDelta::Insert {
                index: 2,
                item: block("x"),
            },
            RemoteDelta::Delete { index: 1 },
            RemoteDelta::Set {
                index: 1,
                item: block("x"),
            },
            RemoteDelta::Move {
                from_index: 0,
                to_index: 1,
            },
        ];
        for delta in &stale {
            assert_eq!(translate(delta, &mut mirror), Translation::Stale, "{delta:?}");
        }
        assert_eq!(mirror, vec![block("a1")]);
    }

    #[test]
    fn test_reflected_insert_set_and_noop_move_skip() {
        let mut mirror = vec![block("a1"), block("b1")];
        assert_eq!(
            translate(
                &RemoteDelta::Insert {
                    index: 1,
                    item: block("b1")
                },
                &mut mirror
            ),
            Translation::Skip
        );
        assert_eq!(
            translate(
                &RemoteDelta::Set {
                    index: 0,
                    item: block("a1")
                },
                &mut mirror
            ),
            Translation::Skip
        );
        assert_eq!(
            translate(
                &RemoteDelta::Move {
                    from_index: 1,
                    to_index: 1
                },
                &mut mirror
            ),
            Translation::Skip
        );
    }

    #[test]
    fn test_batch_indices_follow_earlier_deltas() {
        let children = vec![block("a1"), block("b1")];
        let batch = translate_batch(
            &[
                RemoteDelta::Insert {
                    index: 1,
                    item: block("d1"),
                },
                RemoteDelta::Delete { index: 0 },
            ],
            &children,
        );
        assert_eq!(batch.result, vec![block("d1"), block("b1")]);
        assert_eq!(batch.applied, 2);
        assert_eq!(batch.operations.len(), 2);
        assert!(batch.stale.is_empty());
    }

    #[test]
    fn test_batch_keeps_going_after_stale() {
        let children = vec![block("a1")];
        let batch = translate_batch(
            &[
                RemoteDelta::Delete { index: 4 },
                RemoteDelta::Insert {
                    index: 1,
                    item: block("b1"),
                },
            ],
            &children,
        );
        assert_eq!(batch.stale.len(), 1);
        assert_eq!(batch.result, vec![block("a1"), block("b1")]);
    }

    #[test]
    fn test_json_tag() {
        let json = serde_json::to_value(RemoteDelta::Move {
            from_index: 1,
            to_index: 0,
        })
        .unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["from_index"], 1);
    }
}
