use thiserror::Error;

use crate::selection::Path;

/// Failure to apply an operation to the local tree. The tree is left
/// unchanged when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("no node at path {0:?}")]
    InvalidPath(Path),
    #[error("index {index} out of range for {len} siblings under {parent:?}")]
    OutOfRange {
        parent: Path,
        index: usize,
        len: usize,
    },
    #[error("node at {0:?} cannot be split at {1}")]
    Unsplittable(Path, usize),
    #[error("cannot move {from:?} into its own subtree at {to:?}")]
    MoveIntoSelf { from: Path, to: Path },
}
