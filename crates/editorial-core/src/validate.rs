//! Structural checks on both sides of reconstruction.
//!
//! [`scan_defects`] inspects a flat piece list before anything is built and
//! reports every problem it can see. [`verify_tree`] checks a finished tree
//! against the invariants reconstruction promises.

use std::collections::{HashMap, HashSet};
use std::fmt;

use uuid::Uuid;

use crate::error::{ReconstructError, Result};
use crate::models::{ContentNode, Piece, SourceKey};

/// A structural problem in a flat piece list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Defect {
    /// Two block pieces share a source id.
    DuplicateKey {
        key: SourceKey,
        first: usize,
        second: usize,
    },
    /// `parent` is not the id of any block piece.
    DanglingParent {
        index: usize,
        key: Option<SourceKey>,
        parent: SourceKey,
    },
    /// An inline piece with no parent can be neither a root nor a child.
    InlineWithoutParent { index: usize },
    /// Block ids whose parent chain loops, in chain order.
    Cycle { keys: Vec<SourceKey> },
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defect::DuplicateKey { key, first, second } => {
                write!(f, "duplicate block id {} (pieces #{} and #{})", key, first, second)
            }
            Defect::DanglingParent { index, key, parent } => {
                write!(f, "piece #{}", index)?;
                if let Some(key) = key {
                    write!(f, " (id {})", key)?;
                }
                write!(f, " has unknown parent {}", parent)
            }
            Defect::InlineWithoutParent { index } => {
                write!(f, "inline piece #{} has no parent", index)
            }
            Defect::Cycle { keys } => {
                let chain: Vec<String> = keys.iter().map(ToString::to_string).collect();
                write!(f, "parent cycle {} -> {}", chain.join(" -> "), chain[0])
            }
        }
    }
}

/// Every defect in `pieces`, in list order (cycles last).
pub fn scan_defects(pieces: &[Piece]) -> Vec<Defect> {
    let mut defects = Vec::new();
    let mut first_seen: HashMap<&SourceKey, usize> = HashMap::new();

    for (index, piece) in pieces.iter().enumerate() {
        if let Piece::Block(block) = piece {
            if let Some(&first) = first_seen.get(&block.id) {
                defects.push(Defect::DuplicateKey {
                    key: block.id.clone(),
                    first,
                    second: index,
                });
            } else {
                first_seen.insert(&block.id, index);
            }
        }
    }

    for (index, piece) in pieces.iter().enumerate() {
        match piece.parent_id() {
            Some(parent) if !first_seen.contains_key(parent) => {
                defects.push(Defect::DanglingParent {
                    index,
                    key: piece.key().cloned(),
                    parent: parent.clone(),
                });
            }
            None if !piece.is_block() => defects.push(Defect::InlineWithoutParent { index }),
            _ => {}
        }
    }

    defects.extend(
        find_cycles(pieces)
            .into_iter()
            .map(|keys| Defect::Cycle { keys }),
    );
    defects
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnPath,
    Done,
}

/// Parent chains among block pieces that loop back on themselves.
///
/// Each cycle is reported once, starting from the block that appears first
/// in the walk. When a block id is duplicated the first piece wins.
pub fn find_cycles(pieces: &[Piece]) -> Vec<Vec<SourceKey>> {
    let mut parent_of: HashMap<&SourceKey, Option<&SourceKey>> = HashMap::new();
    for piece in pieces {
        if let Piece::Block(block) = piece {
            parent_of
                .entry(&block.id)
                .or_insert(block.parent_id.as_ref());
        }
    }

    let mut state: HashMap<&SourceKey, Visit> = HashMap::new();
    let mut cycles = Vec::new();

    for piece in pieces {
        let Piece::Block(block) = piece else {
            continue;
        };
        let mut path: Vec<&SourceKey> = Vec::new();
        let mut current = Some(&block.id);

        while let Some(key) = current {
            match state.get(key) {
                Some(Visit::Done) => break,
                Some(Visit::OnPath) => {
                    if let Some(start) = path.iter().position(|k| *k == key) {
                        cycles.push(path[start..].iter().map(|k| (*k).clone()).collect());
                    }
                    break;
                }
                None => {}
            }
            let Some(parent) = parent_of.get(key) else {
                break;
            };
            state.insert(key, Visit::OnPath);
            path.push(key);
            current = *parent;
        }

        for key in path {
            state.insert(key, Visit::Done);
        }
    }

    cycles
}

/// Check the invariants every reconstructed tree must satisfy.
///
/// - sibling `order` values are `0..n` in sequence
/// - inline nodes have no children
/// - identifiers are unique across the tree
/// - `parent` names the owning node, and is `None` for roots
pub fn verify_tree(roots: &[ContentNode]) -> Result<()> {
    let mut seen = HashSet::new();
    verify_siblings(roots, None, &mut seen)
}

fn verify_siblings(
    siblings: &[ContentNode],
    parent: Option<Uuid>,
    seen: &mut HashSet<Uuid>,
) -> Result<()> {
    for (position, node) in siblings.iter().enumerate() {
        if node.order != position {
            return Err(violation(format!(
                "node {} has order {} at position {}",
                node.id, node.order, position
            )));
        }
        if node.parent != parent {
            return Err(violation(format!(
                "node {} points at parent {:?}, owned by {:?}",
                node.id, node.parent, parent
            )));
        }
        if !seen.insert(node.id) {
            return Err(violation(format!("identifier {} appears twice", node.id)));
        }
        if node.is_inline() && !node.children.is_empty() {
            return Err(violation(format!("inline node {} has children", node.id)));
        }
        verify_siblings(&node.children, Some(node.id), seen)?;
    }
    Ok(())
}

fn violation(message: String) -> ReconstructError {
    ReconstructError::InvariantViolation(message)
}
