//! Block and inline node model.
//!
//! A document is a list of top-level blocks. Every block is an element
//! node with a [`BlockId`]; blocks own inline children (text runs), which
//! carry no id.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Free-form node attributes (e.g. `checked` on a to-do, `url` on an image).
pub type Attributes = BTreeMap<String, Value>;

/// Stable identifier of a top-level block.
///
/// The id is the correlation key between the local tree and the replicated
/// list, so it must survive edits, moves and splits of the left-hand half.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Title,
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedList,
    ToDo,
    Image,
    Video,
    Embed,
    /// Inline text run.
    Text,
}

impl NodeKind {
    /// Void blocks hold no editable text (media and embeds).
    pub fn is_void(self) -> bool {
        matches!(self, NodeKind::Image | NodeKind::Video | NodeKind::Embed)
    }

    /// Title and headings; pressing return inside them starts a paragraph.
    pub fn is_heading_like(self) -> bool {
        matches!(
            self,
            NodeKind::Title | NodeKind::Heading1 | NodeKind::Heading2 | NodeKind::Heading3
        )
    }
}

/// A node in the document tree.
///
/// Text runs carry `text`; elements carry `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Node {
    /// An inline text run.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: NodeKind::Text,
            children: None,
            text: Some(text.into()),
            attributes: Attributes::new(),
        }
    }

    /// A block element holding a single text run. The id is left unset;
    /// normalization assigns one.
    pub fn block(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            children: Some(vec![Node::text(text)]),
            text: None,
            attributes: Attributes::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::block(NodeKind::Paragraph, text)
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::block(NodeKind::Title, text)
    }

    /// A void block (image, video, embed) with an empty text child.
    pub fn void(kind: NodeKind) -> Self {
        Self::block(kind, "")
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Concatenated text of this node and its descendants.
    pub fn plain_text(&self) -> String {
        match (&self.text, &self.children) {
            (Some(text), _) => text.clone(),
            (None, Some(children)) => children.iter().map(Node::plain_text).collect(),
            (None, None) => String::new(),
        }
    }

    /// Merge a partial property set into this node. A `null` attribute
    /// value removes the attribute.
    pub fn apply_properties(&mut self, properties: &NodeProperties) {
        if let Some(id) = &properties.id {
            self.id = Some(id.clone());
        }
        if let Some(kind) = properties.kind {
            self.kind = kind;
        }
        for (key, value) in &properties.attributes {
            if value.is_null() {
                self.attributes.remove(key);
            } else {
                self.attributes.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Partial node used by `SetNode` and `SplitNode`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl NodeProperties {
    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.kind.is_none() && self.attributes.is_empty()
    }
}
