//! Paths, points and selections, and how they move through operations.

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// Index path from the document root. `[i]` is the i-th top-level block.
pub type Path = Vec<usize>;

/// `ancestor` is a strict prefix of `path`.
pub fn is_ancestor(ancestor: &[usize], path: &[usize]) -> bool {
    ancestor.len() < path.len() && path.starts_with(ancestor)
}

/// `path` is an earlier sibling of `other` or of one of its ancestors.
pub fn ends_before(path: &[usize], other: &[usize]) -> bool {
    let Some((&last, parent)) = path.split_last() else {
        return false;
    };
    let depth = parent.len();
    other.len() > depth && &other[..depth] == parent && last < other[depth]
}

/// Rewrite `path` so it keeps pointing at the same node after `op`.
///
/// Returns `None` when the node was removed.
pub fn transform_path(path: &[usize], op: &Operation) -> Option<Path> {
    let mut p = path.to_vec();
    match op {
        Operation::InsertNode { path: at, .. } => {
            if !at.is_empty()
                && (at.as_slice() == path || ends_before(at, path) || is_ancestor(at, path))
            {
                p[at.len() - 1] += 1;
            }
        }
        Operation::RemoveNode { path: at, .. } => {
            if at.is_empty() {
                return Some(p);
            }
            if at.as_slice() == path || is_ancestor(at, path) {
                return None;
            }
            if ends_before(at, path) {
                p[at.len() - 1] -= 1;
            }
        }
        Operation::SplitNode { path: at, position, .. } => {
            if at.is_empty() || at.as_slice() == path {
                return Some(p);
            }
            if ends_before(at, path) {
                p[at.len() - 1] += 1;
            } else if is_ancestor(at, path) && path[at.len()] >= *position {
                p[at.len() - 1] += 1;
                p[at.len()] -= *position;
            }
        }
        Operation::MoveNode { path: from, new_path: to } => {
            if from.is_empty() || to.is_empty() {
                return Some(p);
            }
            if from.as_slice() == path || is_ancestor(from, path) {
                let mut moved = to.clone();
                moved.extend_from_slice(&path[from.len()..]);
                return Some(moved);
            }
            if ends_before(from, path) {
                p[from.len() - 1] -= 1;
            }
            if to.as_slice() == p.as_slice() || ends_before(to, &p) || is_ancestor(to, &p) {
                p[to.len() - 1] += 1;
            }
        }
        Operation::SetNode { .. } | Operation::SetSelection { .. } => {}
    }
    Some(p)
}

/// A caret position: a path to a text run plus a character offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Index of the top-level block containing this point.
    pub fn block_index(&self) -> Option<usize> {
        self.path.first().copied()
    }

    pub fn transform(&self, op: &Operation) -> Option<Point> {
        if let Operation::SplitNode { path, position, .. } = op {
            if *path == self.path {
                if self.offset < *position {
                    return Some(self.clone());
                }
                let mut next = path.clone();
                if let Some(last) = next.last_mut() {
                    *last += 1;
                }
                return Some(Point::new(next, self.offset - position));
            }
        }
        transform_path(&self.path, op).map(|path| Point::new(path, self.offset))
    }
}

/// Anchor/focus pair. A collapsed selection is a caret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Move both ends through `op`; `None` if either end's node was removed.
    pub fn transform(&self, op: &Operation) -> Option<Selection> {
        Some(Selection {
            anchor: self.anchor.transform(op)?,
            focus: self.focus.transform(op)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeProperties};

    fn insert(path: Path) -> Operation {
        Operation::InsertNode {
            path,
            node: Node::paragraph(""),
        }
    }

    fn remove(path: Path) -> Operation {
        Operation::RemoveNode {
            path,
            node: Node::paragraph(""),
        }
    }

    #[test]
    fn test_path_relations() {
        assert!(is_ancestor(&[1], &[1, 0]));
        assert!(!is_ancestor(&[1], &[1]));
        assert!(ends_before(&[0], &[1, 3]));
        assert!(ends_before(&[1, 0], &[1, 2]));
        assert!(!ends_before(&[2], &[1, 0]));
        assert!(!ends_before(&[1, 0], &[1]));
    }

    #[test]
    fn test_insert_shifts_later_siblings() {
        assert_eq!(transform_path(&[2, 0], &insert(vec![1])), Some(vec![3, 0]));
        assert_eq!(transform_path(&[2, 0], &insert(vec![2])), Some(vec![3, 0]));
        assert_eq!(transform_path(&[2, 0], &insert(vec![3])), Some(vec![2, 0]));
    }

    #[test]
    fn test_remove_drops_descendants() {
        assert_eq!(transform_path(&[2, 0], &remove(vec![2])), None);
        assert_eq!(transform_path(&[2, 0], &remove(vec![0])), Some(vec![1, 0]));
        assert_eq!(transform_path(&[0, 0], &remove(vec![1])), Some(vec![0, 0]));
    }

    #[test]
    fn test_move_carries_descendants() {
        let op = Operation::MoveNode {
            path: vec![2],
            new_path: vec![0],
        };
        assert_eq!(transform_path(&[2, 0], &op), Some(vec![0, 0]));
        assert_eq!(transform_path(&[0, 0], &op), Some(vec![1, 0]));
        assert_eq!(transform_path(&[3], &op), Some(vec![3]));
    }

    #[test]
    fn test_move_down_shifts_between() {
        let op = Operation::MoveNode {
            path: vec![0],
            new_path: vec![2],
        };
        // [a, b, c, d] -> [b, c, a, d]
        assert_eq!(transform_path(&[1], &op), Some(vec![0]));
        assert_eq!(transform_path(&[2], &op), Some(vec![1]));
        assert_eq!(transform_path(&[3], &op), Some(vec![3]));
    }

    #[test]
    fn test_point_follows_text_split() {
        let split = Operation::SplitNode {
            path: vec![0, 0],
            position: 5,
            properties: NodeProperties::default(),
        };
        let caret = Point::new(vec![0, 0], 7);
        assert_eq!(caret.transform(&split), Some(Point::new(vec![0, 1], 2)));

        let before = Point::new(vec![0, 0], 3);
        assert_eq!(before.transform(&split), Some(before.clone()));
    }

    #[test]
    fn test_point_follows_block_split() {
        let split = Operation::SplitNode {
            path: vec![0],
            position: 1,
            properties: NodeProperties::default(),
        };
        let caret = Point::new(vec![0, 1], 0);
        assert_eq!(caret.transform(&split), Some(Point::new(vec![1, 0], 0)));
    }

    #[test]
    fn test_selection_cleared_with_its_block() {
        let selection = Selection::collapsed(Point::new(vec![1, 0], 2));
        assert!(selection.transform(&remove(vec![1])).is_none());
        assert!(selection.is_collapsed());
    }
}
