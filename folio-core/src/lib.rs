//! # folio-core: Document model for the Folio block editor
//!
//! The local side of collaborative editing: a tree of typed blocks, the
//! six operations that mutate it, and the editor that applies them.
//!
//! ## Flow
//!
//! ```text
//! user input / remote replay
//!          │  Operation + Origin
//!          ▼
//! ┌──────────────────┐  on_apply   ┌────────────────┐
//! │ Editor::apply    │ ──────────► │ StagePipeline  │
//! │ (single entry)   │ ◄────────── │ identity       │
//! └────────┬─────────┘ on_normalize│ layout         │
//!          │                       │ block_break    │
//!          ▼                       └────────────────┘
//! ┌──────────────────┐
//! │ Document         │──► tick buffer (TaggedOperation)
//! └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`node`] - Blocks, text runs and stable block ids
//! - [`selection`] - Paths, points, selections and their transforms
//! - [`operation`] - The six local operations and origin tags
//! - [`document`] - Tree surgery for a single operation
//! - [`identity`] - Unique top-level id normalization
//! - [`stages`] - Ordered transform stages and their dispatcher
//! - [`editor`] - The Local Document Tree

pub mod document;
pub mod editor;
pub mod error;
pub mod identity;
pub mod node;
pub mod operation;
pub mod selection;
pub mod stages;

// Re-exports for convenience
pub use document::Document;
pub use editor::{Editor, EditorConfig};
pub use error::ApplyError;
pub use identity::{has_unique_ids, identity_fixes, IdGenerator};
pub use node::{Attributes, BlockId, Node, NodeKind, NodeProperties};
pub use operation::{local_only, Operation, Origin, TaggedOperation};
pub use selection::{Path, Point, Selection};
pub use stages::{
    split_block, BlockBreakStage, IdentityStage, LayoutStage, StagePipeline, TransformStage,
};
