//! Node identity normalization.
//!
//! Every top-level block must carry a non-empty id that no earlier sibling
//! already uses. [`identity_fixes`] reports the `SetNode` operations that
//! restore this; the editor applies them as local operations so they reach
//! the replicated list like any user edit.

use std::collections::HashSet;

use crate::node::{BlockId, Node, NodeProperties};
use crate::operation::Operation;

/// Source of fresh block ids.
#[derive(Debug, Clone, Default)]
pub enum IdGenerator {
    /// Random UUID v4 ids.
    #[default]
    Uuid,
    /// `prefix0`, `prefix1`, ... Deterministic, for tests and demos.
    Sequential { prefix: String, next: u64 },
}

impl IdGenerator {
    pub fn sequential(prefix: impl Into<String>) -> Self {
        IdGenerator::Sequential {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> BlockId {
        match self {
            IdGenerator::Uuid => BlockId::generate(),
            IdGenerator::Sequential { prefix, next } => {
                let id = BlockId::new(format!("{prefix}{next}"));
                *next += 1;
                id
            }
        }
    }

    /// A fresh id guaranteed not to be in `taken`.
    pub fn next_unused(&mut self, taken: &HashSet<BlockId>) -> BlockId {
        loop {
            let id = self.next_id();
            if !taken.contains(&id) {
                return id;
            }
        }
    }
}

/// `SetNode` operations that give every top-level block a unique,
/// non-empty id.
///
/// The first occurrence of an id keeps it; later duplicates and blocks
/// without an id get a fresh one. Fresh ids avoid every id present in
/// `children` as well as each other, so applying the result reaches the
/// fixpoint in one pass.
pub fn identity_fixes(children: &[Node], ids: &mut IdGenerator) -> Vec<Operation> {
    let mut taken: HashSet<BlockId> = children
        .iter()
        .filter_map(|node| node.id.clone())
        .filter(|id| !id.is_empty())
        .collect();
    let mut seen = HashSet::new();
    let mut fixes = Vec::new();

    for (index, node) in children.iter().enumerate() {
        let valid = match &node.id {
            Some(id) if !id.is_empty() => seen.insert(id.clone()),
            _ => false,
        };
        if valid {
            continue;
        }

        let fresh = ids.next_unused(&taken);
        log::debug!(
            "identity: block {index} id {:?} -> {fresh}",
            node.id.as_ref().map(BlockId::as_str)
        );
        taken.insert(fresh.clone());
        seen.insert(fresh.clone());
        fixes.push(Operation::SetNode {
            path: vec![index],
            properties: NodeProperties::default().with_id(fresh),
        });
    }

    fixes
}

/// Every top-level block has a distinct, non-empty id.
pub fn has_unique_ids(children: &[Node]) -> bool {
    let mut seen = HashSet::new();
    children.iter().all(|node| match &node.id {
        Some(id) if !id.is_empty() => seen.insert(id),
        _ => false,
    })
}

/// Give the right-hand half of a top-level split its own id.
///
/// The left half keeps the original id; anything the caller put in
/// `properties.id` is replaced by an id no block in `children` uses.
pub fn assign_split_id(op: Operation, children: &[Node], ids: &mut IdGenerator) -> Operation {
    match op {
        Operation::SplitNode {
            path,
            position,
            mut properties,
        } if path.len() == 1 => {
            let taken: HashSet<BlockId> = children.iter().filter_map(|n| n.id.clone()).collect();
            properties.id = Some(ids.next_unused(&taken));
            Operation::SplitNode {
                path,
                position,
                properties,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn apply_all(doc: &mut Document, ops: &[Operation]) {
        for op in ops {
            doc.apply(op).unwrap();
        }
    }

    #[test]
    fn test_sequential_generator() {
        let mut ids = IdGenerator::sequential("n");
        assert_eq!(ids.next_id().as_str(), "n0");
        assert_eq!(ids.next_id().as_str(), "n1");
    }

    #[test]
    fn test_next_unused_skips_taken() {
        let mut ids = IdGenerator::sequential("n");
        let taken: HashSet<BlockId> = ["n0", "n1"].into_iter().map(BlockId::from).collect();
        assert_eq!(ids.next_unused(&taken).as_str(), "n2");
    }

    #[test]
    fn test_missing_and_duplicate_ids_fixed() {
        let mut doc = Document::with_children(vec![
            Node::paragraph("a").with_id("a1"),
            Node::paragraph("b"),
            Node::paragraph("c").with_id("a1"),
            Node::paragraph("d").with_id(""),
        ]);
        let mut ids = IdGenerator::sequential("n");

        let fixes = identity_fixes(&doc.children, &mut ids);
        assert_eq!(fixes.len(), 3);
        apply_all(&mut doc, &fixes);

        assert!(has_unique_ids(&doc.children));
        assert_eq!(doc.children[0].id, Some(BlockId::from("a1")));
        assert!(identity_fixes(&doc.children, &mut ids).is_empty());
    }

    #[test]
    fn test_fresh_ids_avoid_later_siblings() {
        // The generator would hand out "n0" first, which a later block owns.
        let mut doc = Document::with_children(vec![
            Node::paragraph("a"),
            Node::paragraph("b").with_id("n0"),
        ]);
        let mut ids = IdGenerator::sequential("n");

        let fixes = identity_fixes(&doc.children, &mut ids);
        apply_all(&mut doc, &fixes);

        assert_eq!(doc.children[0].id, Some(BlockId::from("n1")));
        assert!(has_unique_ids(&doc.children));
    }

    #[test]
    fn test_split_id_only_for_top_level() {
        let mut ids = IdGenerator::sequential("s");
        let top = assign_split_id(
            Operation::SplitNode {
                path: vec![0],
                position: 1,
                properties: NodeProperties::default().with_id("a1"),
            },
            &[],
            &mut ids,
        );
        match top {
            Operation::SplitNode { properties, .. } => {
                assert_eq!(properties.id, Some(BlockId::from("s0")));
            }
            other => panic!("unexpected {other:?}"),
        }

        let leaf = Operation::SplitNode {
            path: vec![0, 0],
            position: 3,
            properties: NodeProperties::default(),
        };
        assert_eq!(assign_split_id(leaf.clone(), &[], &mut ids), leaf);
    }

    #[test]
    fn test_split_id_skips_existing_ids() {
        let children = vec![
            Node::paragraph("HelloWorld").with_id("a1"),
            Node::paragraph("other").with_id("n0"),
        ];
        let mut ids = IdGenerator::sequential("n");
        let op = assign_split_id(
            Operation::SplitNode {
                path: vec![0],
                position: 1,
                properties: NodeProperties::default(),
            },
            &children,
            &mut ids,
        );
        match op {
            Operation::SplitNode { properties, .. } => {
                assert_eq!(properties.id, Some(BlockId::from("n1")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_document_is_valid() {
        assert!(has_unique_ids(&[]));
        assert!(identity_fixes(&[], &mut IdGenerator::default()).is_empty());
    }
}
