//! Error taxonomy for content tree reconstruction.

use thiserror::Error;

use crate::models::SourceKey;

/// A piece that could not be placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceRef {
    /// Position in the flat input list.
    pub index: usize,
    pub key: Option<SourceKey>,
    pub parent: Option<SourceKey>,
}

impl std::fmt::Display for PieceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)?;
        if let Some(key) = &self.key {
            write!(f, " (id {})", key)?;
        }
        match &self.parent {
            Some(parent) => write!(f, " -> {}", parent),
            None => write!(f, " without a parent"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconstructError {
    /// The caller's input lacks a field it needed before reconstruction.
    #[error("missing expected data: {0}")]
    MissingExpectedData(String),

    /// Pieces whose parent is missing from the document, or inline pieces
    /// with no parent at all.
    #[error("{} piece(s) could not be attached to the document: {}", .pieces.len(), join(.pieces))]
    DanglingReference { pieces: Vec<PieceRef> },

    #[error("block id {key} is used by pieces #{first} and #{second}")]
    DuplicateKey {
        key: SourceKey,
        first: usize,
        second: usize,
    },

    #[error("parent chain loops through block id {key}")]
    Cycle { key: SourceKey },

    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),
}

fn join(pieces: &[PieceRef]) -> String {
    pieces
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ReconstructError>;
