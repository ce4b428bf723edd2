//! Core data models shared by the engine and its collaborators.
//!
//! Input side: [`Piece`] values as produced by the upstream scraper, keyed by
//! [`SourceKey`]. Output side: the [`ContentNode`] tree wrapped in a
//! [`Document`], and the [`ImportRecord`] handed to a
//! [`Store`](crate::store::Store).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A key provided by the upstream scrape.
///
/// Only meaningful as a lookup key into an
/// [`IdAllocator`](crate::allocator::IdAllocator). Integer `1` and string
/// `"1"` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceKey {
    Int(i64),
    Text(String),
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKey::Int(n) => write!(f, "{}", n),
            SourceKey::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for SourceKey {
    fn from(n: i64) -> Self {
        SourceKey::Int(n)
    }
}

impl From<&str> for SourceKey {
    fn from(s: &str) -> Self {
        SourceKey::Text(s.to_string())
    }
}

/// One flat input unit, discriminated by the `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Piece {
    Block(BlockPiece),
    Inline(InlinePiece),
}

/// A container piece. May own children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPiece {
    pub id: SourceKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SourceKey>,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// A terminal piece carrying text and source attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePiece {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SourceKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SourceKey>,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Piece {
    pub fn block(id: impl Into<SourceKey>, parent_id: Option<SourceKey>, content_type: &str) -> Self {
        Piece::Block(BlockPiece {
            id: id.into(),
            parent_id,
            content_type: content_type.to_string(),
        })
    }

    /// Inline piece with text only, the common case in tests and fixtures.
    pub fn inline(parent_id: Option<SourceKey>, content_type: &str, text: &str) -> Self {
        Piece::Inline(InlinePiece {
            id: None,
            parent_id,
            content_type: content_type.to_string(),
            source_title: None,
            source_url: None,
            text: Some(text.to_string()),
        })
    }

    /// The piece's own source key. Inline pieces may have none.
    pub fn key(&self) -> Option<&SourceKey> {
        match self {
            Piece::Block(b) => Some(&b.id),
            Piece::Inline(i) => i.id.as_ref(),
        }
    }

    pub fn parent_id(&self) -> Option<&SourceKey> {
        match self {
            Piece::Block(b) => b.parent_id.as_ref(),
            Piece::Inline(i) => i.parent_id.as_ref(),
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Piece::Block(b) => &b.content_type,
            Piece::Inline(i) => &i.content_type,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Piece::Block(_))
    }
}

/// Kind-dependent part of a [`ContentNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeBody {
    Block,
    Inline {
        source_title: Option<String>,
        source_url: Option<String>,
        text: Option<String>,
    },
}

/// One reconstructed tree node.
///
/// `parent` is a navigational back-reference by identifier. Ownership runs
/// strictly top-down through `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub content_type: String,
    pub order: usize,
    pub parent: Option<Uuid>,
    #[serde(flatten)]
    pub body: NodeBody,
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn is_inline(&self) -> bool {
        matches!(self.body, NodeBody::Inline { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            NodeBody::Inline { text, .. } => text.as_deref(),
            NodeBody::Block => None,
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ContentNode::subtree_len).sum::<usize>()
    }
}

/// Top-level reconstructed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub author: String,
    pub last_updated_on: Option<DateTime<Utc>>,
    pub nodes: Vec<ContentNode>,
}

impl Document {
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(ContentNode::subtree_len).sum()
    }

    /// Depth-first, pre-order traversal yielding `(depth, node)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.nodes.iter().rev().map(|n| (0, n)).collect(),
        }
    }

    pub fn find(&self, id: Uuid) -> Option<&ContentNode> {
        self.walk().map(|(_, n)| n).find(|n| n.id == id)
    }
}

/// Iterator returned by [`Document::walk`].
pub struct Walk<'a> {
    stack: Vec<(usize, &'a ContentNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a ContentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        Some((depth, node))
    }
}

/// A person label, unique by lowercased text within a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Everything one scraper result contributes, as handed to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub slug: String,
    pub old_slug: String,
    pub name: String,
    pub labels: Vec<Label>,
    pub summary: Option<String>,
    pub added_on: Option<DateTime<Utc>>,
    /// Image path relative to the images directory.
    #[serde(default)]
    pub photo_id: Option<String>,
    /// SHA-256 of the source content, used to detect unchanged re-imports.
    pub content_hash: String,
    pub editorial_summary: Option<Document>,
}
