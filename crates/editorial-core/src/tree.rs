//! Content tree reconstruction.
//!
//! Turns a flat, ordered list of [`Piece`]s into an ordered tree of
//! [`ContentNode`]s.
//!
//! # Algorithm
//!
//! 1. Reject duplicate block ids and parent cycles up front.
//! 2. Group pieces by parent key once, keeping list order inside each group.
//! 3. Roots are the block pieces without a parent, in list order.
//! 4. Expanding a block resolves its id through the [`IdAllocator`] and takes
//!    the group filed under its key as children. Inline children get a fresh
//!    identifier and are never expanded; block children recurse.
//! 5. `order` is the position inside the parent's group, so siblings keep the
//!    order in which they first appear in the list.
//! 6. Pieces never reached are reported as [`Omission`]s and handled
//!    according to the [`DanglingPolicy`].
//!
//! Grouping by key is equivalent to matching every piece's resolved parent
//! identifier against the node's identifier, because the allocator maps
//! distinct keys to distinct identifiers.
//!
//! # Example
//!
//! ```rust
//! use editorial_core::allocator::IdAllocator;
//! use editorial_core::models::{Piece, SourceKey};
//! use editorial_core::tree::build;
//!
//! let pieces = vec![
//!     Piece::block(1, None, "paragraph"),
//!     Piece::inline(Some(SourceKey::Int(1)), "text", "a"),
//!     Piece::inline(Some(SourceKey::Int(1)), "text", "b"),
//! ];
//! let roots = build(&pieces, IdAllocator::new()).unwrap();
//! assert_eq!(roots.len(), 1);
//! assert_eq!(roots[0].children[1].text(), Some("b"));
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocator::IdAllocator;
use crate::error::{PieceRef, ReconstructError, Result};
use crate::models::{BlockPiece, ContentNode, Document, InlinePiece, NodeBody, Piece, SourceKey};
use crate::validate::find_cycles;

/// What to do with pieces that cannot be placed in the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    /// Leave them out silently.
    Drop,
    /// Leave them out and log a warning.
    #[default]
    Warn,
    /// Fail with [`ReconstructError::DanglingReference`].
    Reject,
}

impl std::str::FromStr for DanglingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "drop" => Ok(DanglingPolicy::Drop),
            "warn" => Ok(DanglingPolicy::Warn),
            "reject" => Ok(DanglingPolicy::Reject),
            other => Err(format!(
                "unknown dangling policy '{}': expected drop, warn, or reject",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmissionReason {
    /// The parent key does not resolve to any node built in this run.
    DanglingParent,
    /// Inline pieces are only ever placed as children.
    InlineWithoutParent,
}

/// A piece left out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Omission {
    pub piece: PieceRef,
    pub reason: OmissionReason,
}

/// Output of [`reconstruct`].
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub nodes: Vec<ContentNode>,
    pub omitted: Vec<Omission>,
}

/// Build the root nodes for `pieces`, silently dropping unplaceable pieces.
///
/// Only placement problems are dropped. Duplicate block ids and parent
/// cycles still fail the whole call, even when no root reaches them.
pub fn build(pieces: &[Piece], ids: IdAllocator) -> Result<Vec<ContentNode>> {
    reconstruct(pieces, ids, DanglingPolicy::Drop).map(|r| r.nodes)
}

/// Build the root nodes for `pieces` and account for every piece left out.
///
/// `policy` governs omitted pieces only. Duplicate block ids and parent
/// cycles are errors under every policy, reachable or not.
pub fn reconstruct(
    pieces: &[Piece],
    ids: IdAllocator,
    policy: DanglingPolicy,
) -> Result<Reconstruction> {
    let mut builder = Builder::new(pieces, ids)?;
    let nodes = builder.build_roots()?;
    let omitted = builder.omissions();

    if !omitted.is_empty() {
        match policy {
            DanglingPolicy::Drop => {}
            DanglingPolicy::Warn => {
                for omission in &omitted {
                    log::warn!("dropping piece {}: {:?}", omission.piece, omission.reason);
                }
            }
            DanglingPolicy::Reject => {
                return Err(ReconstructError::DanglingReference {
                    pieces: omitted.into_iter().map(|o| o.piece).collect(),
                });
            }
        }
    }

    Ok(Reconstruction { nodes, omitted })
}

impl Document {
    /// Reconstruct a whole document from its pieces and metadata.
    pub fn reconstruct(
        author: impl Into<String>,
        last_updated_on: Option<DateTime<Utc>>,
        pieces: &[Piece],
        ids: IdAllocator,
        policy: DanglingPolicy,
    ) -> Result<(Document, Vec<Omission>)> {
        let Reconstruction { nodes, omitted } = reconstruct(pieces, ids, policy)?;
        let document = Document {
            author: author.into(),
            last_updated_on,
            nodes,
        };
        Ok((document, omitted))
    }
}

struct Builder<'a> {
    pieces: &'a [Piece],
    children: HashMap<&'a SourceKey, Vec<usize>>,
    placed: Vec<bool>,
    ids: IdAllocator,
}

impl<'a> Builder<'a> {
    fn new(pieces: &'a [Piece], ids: IdAllocator) -> Result<Self> {
        let mut block_at: HashMap<&SourceKey, usize> = HashMap::new();
        let mut children: HashMap<&SourceKey, Vec<usize>> = HashMap::new();

        for (index, piece) in pieces.iter().enumerate() {
            if let Piece::Block(block) = piece {
                if let Some(&first) = block_at.get(&block.id) {
                    return Err(ReconstructError::DuplicateKey {
                        key: block.id.clone(),
                        first,
                        second: index,
                    });
                }
                block_at.insert(&block.id, index);
            }
            if let Some(parent) = piece.parent_id() {
                children.entry(parent).or_default().push(index);
            }
        }

        if let Some(cycle) = find_cycles(pieces).into_iter().next() {
            return Err(ReconstructError::Cycle {
                key: cycle[0].clone(),
            });
        }

        Ok(Self {
            pieces,
            children,
            placed: vec![false; pieces.len()],
            ids,
        })
    }

    fn build_roots(&mut self) -> Result<Vec<ContentNode>> {
        let pieces = self.pieces;
        let roots: Vec<(usize, &BlockPiece)> = pieces
            .iter()
            .enumerate()
            .filter_map(|(index, piece)| match piece {
                Piece::Block(block) if block.parent_id.is_none() => Some((index, block)),
                _ => None,
            })
            .collect();

        roots
            .into_iter()
            .enumerate()
            .map(|(order, (index, block))| self.block_node(index, block, order, None))
            .collect()
    }

    fn block_node(
        &mut self,
        index: usize,
        block: &'a BlockPiece,
        order: usize,
        parent: Option<Uuid>,
    ) -> Result<ContentNode> {
        let id = self.ids.resolve(&block.id);
        self.placed[index] = true;
        let children = self.children_of(&block.id, id)?;

        Ok(ContentNode {
            id,
            content_type: block.content_type.clone(),
            order,
            parent,
            body: NodeBody::Block,
            children,
        })
    }

    fn inline_node(
        &mut self,
        index: usize,
        inline: &InlinePiece,
        order: usize,
        parent: Uuid,
    ) -> ContentNode {
        self.placed[index] = true;

        ContentNode {
            id: self.ids.fresh(),
            content_type: inline.content_type.clone(),
            order,
            parent: Some(parent),
            body: NodeBody::Inline {
                source_title: non_empty(inline.source_title.as_deref()),
                source_url: non_empty(inline.source_url.as_deref())
                    .map(|url| url.trim_end().to_string()),
                text: non_empty(inline.text.as_deref()),
            },
            children: Vec::new(),
        }
    }

    fn children_of(&mut self, key: &SourceKey, parent: Uuid) -> Result<Vec<ContentNode>> {
        // Block keys are unique, so each group is expanded at most once.
        let Some(members) = self.children.remove(key) else {
            return Ok(Vec::new());
        };
        let pieces = self.pieces;

        members
            .into_iter()
            .enumerate()
            .map(|(order, index)| match &pieces[index] {
                Piece::Inline(inline) => Ok(self.inline_node(index, inline, order, parent)),
                Piece::Block(block) => self.block_node(index, block, order, Some(parent)),
            })
            .collect()
    }

    fn omissions(&self) -> Vec<Omission> {
        self.pieces
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.placed[*index])
            .map(|(index, piece)| Omission {
                piece: PieceRef {
                    index,
                    key: piece.key().cloned(),
                    parent: piece.parent_id().cloned(),
                },
                reason: if piece.parent_id().is_none() {
                    OmissionReason::InlineWithoutParent
                } else {
                    OmissionReason::DanglingParent
                },
            })
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::validate::verify_tree;

    fn k(n: i64) -> Option<SourceKey> {
        Some(SourceKey::Int(n))
    }

    fn texts(node: &ContentNode) -> Vec<&str> {
        node.children.iter().filter_map(|c| c.text()).collect()
    }

    #[test]
    fn paragraph_with_two_inline_children() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::inline(k(1), "text", "a"),
            Piece::inline(k(1), "text", "b"),
        ];
        let mut ids = IdAllocator::sequential();
        let expected_root = ids.resolve(&SourceKey::Int(1));
        let roots = build(&pieces, IdAllocator::sequential()).unwrap();

        assert_eq!(roots.len(), 1);
        let root = &roots[0];
        assert_eq!(root.id, expected_root);
        assert_eq!(root.content_type, "para");
        assert_eq!(root.order, 0);
        assert_eq!(root.parent, None);
        assert_eq!(texts(root), vec!["a", "b"]);
        assert_eq!(root.children[0].order, 0);
        assert_eq!(root.children[1].order, 1);
        assert!(root.children.iter().all(|c| c.parent == Some(root.id)));
        verify_tree(&roots).unwrap();
    }

    #[test]
    fn children_need_not_be_contiguous_with_parent() {
        let pieces = vec![
            Piece::inline(k(2), "text", "second-1"),
            Piece::block(1, None, "para"),
            Piece::inline(k(1), "text", "first-1"),
            Piece::block(2, None, "para"),
            Piece::inline(k(1), "text", "first-2"),
            Piece::inline(k(2), "text", "second-2"),
        ];
        let roots = build(&pieces, IdAllocator::new()).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(texts(&roots[0]), vec!["first-1", "first-2"]);
        assert_eq!(texts(&roots[1]), vec!["second-1", "second-2"]);
        assert_eq!(roots[1].order, 1);
        verify_tree(&roots).unwrap();
    }

    #[test]
    fn nested_blocks_recurse_and_order_per_parent() {
        let pieces = vec![
            Piece::block("list", None, "list"),
            Piece::block("item-a", Some("list".into()), "item"),
            Piece::inline(Some("item-b".into()), "text", "b1"),
            Piece::block("item-b", Some("list".into()), "item"),
            Piece::inline(Some("item-a".into()), "text", "a1"),
            Piece::inline(Some("list".into()), "text", "tail"),
            Piece::inline(Some("item-a".into()), "text", "a2"),
        ];
        let roots = build(&pieces, IdAllocator::new()).unwrap();
        let list = &roots[0];
        let kinds: Vec<(&str, usize)> = list
            .children
            .iter()
            .map(|c| (c.content_type.as_str(), c.order))
            .collect();
        assert_eq!(kinds, vec![("item", 0), ("item", 1), ("text", 2)]);
        assert_eq!(texts(&list.children[0]), vec!["a1", "a2"]);
        assert_eq!(texts(&list.children[1]), vec!["b1"]);
        assert_eq!(list.children[0].parent, Some(list.id));
        assert_eq!(list.children[0].children[0].parent, Some(list.children[0].id));
        verify_tree(&roots).unwrap();
    }

    #[test]
    fn empty_block_is_a_leaf() {
        let pieces = vec![Piece::block(1, None, "hr")];
        let roots = build(&pieces, IdAllocator::new()).unwrap();
        assert_eq!(roots.len(), 1);
        assert!(roots[0].children.is_empty());
        assert!(!roots[0].is_inline());
    }

    #[test]
    fn empty_input_builds_nothing() {
        let result = reconstruct(&[], IdAllocator::new(), DanglingPolicy::Reject).unwrap();
        assert!(result.nodes.is_empty());
        assert!(result.omitted.is_empty());
    }

    #[test]
    fn inline_fields_are_copied_and_url_trimmed() {
        let pieces = vec![
            Piece::block(1, None, "quote"),
            Piece::Inline(InlinePiece {
                id: k(40),
                parent_id: k(1),
                content_type: "citation".into(),
                source_title: Some("The Paper".into()),
                source_url: Some("https://example.com/a \t\n".into()),
                text: Some("  spaced  ".into()),
            }),
            Piece::Inline(InlinePiece {
                id: None,
                parent_id: k(1),
                content_type: "text".into(),
                source_title: Some(String::new()),
                source_url: Some(String::new()),
                text: None,
            }),
        ];
        let roots = build(&pieces, IdAllocator::new()).unwrap();
        let cited = &roots[0].children[0];
        assert_eq!(cited.content_type, "citation");
        assert_eq!(
            cited.body,
            NodeBody::Inline {
                source_title: Some("The Paper".into()),
                source_url: Some("https://example.com/a".into()),
                text: Some("  spaced  ".into()),
            }
        );
        assert_eq!(
            roots[0].children[1].body,
            NodeBody::Inline {
                source_title: None,
                source_url: None,
                text: None,
            }
        );
    }

    #[test]
    fn inline_ids_are_fresh_even_with_source_keys() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::Inline(InlinePiece {
                id: k(1),
                parent_id: k(1),
                content_type: "text".into(),
                source_title: None,
                source_url: None,
                text: Some("same key as parent".into()),
            }),
        ];
        let roots = build(&pieces, IdAllocator::new()).unwrap();
        assert_ne!(roots[0].children[0].id, roots[0].id);
        verify_tree(&roots).unwrap();
    }

    #[test]
    fn root_key_and_parent_reference_resolve_to_one_node() {
        // Source id 1 is used as a root's id and, separately, as the parent
        // of pieces before and after it.
        let pieces = vec![
            Piece::inline(k(1), "text", "before"),
            Piece::block(1, None, "para"),
            Piece::block(2, k(1), "quote"),
            Piece::inline(k(2), "text", "quoted"),
        ];
        let roots = build(&pieces, IdAllocator::new()).unwrap();
        assert_eq!(roots.len(), 1);
        let root = &roots[0];
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].text(), Some("before"));
        assert_eq!(root.children[1].parent, Some(root.id));
        assert_eq!(texts(&root.children[1]), vec!["quoted"]);
    }

    #[test]
    fn dangling_pieces_are_dropped_by_default() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::inline(k(1), "text", "kept"),
            Piece::inline(k(404), "text", "lost"),
            Piece::block(7, k(404), "quote"),
            Piece::inline(k(7), "text", "lost with its parent"),
        ];
        let result = reconstruct(&pieces, IdAllocator::new(), DanglingPolicy::Drop).unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(texts(&result.nodes[0]), vec!["kept"]);
        let indices: Vec<usize> = result.omitted.iter().map(|o| o.piece.index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
        assert!(result
            .omitted
            .iter()
            .all(|o| o.reason == OmissionReason::DanglingParent));
    }

    #[test]
    fn warn_policy_still_builds() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::inline(None, "text", "floating"),
        ];
        let result = reconstruct(&pieces, IdAllocator::new(), DanglingPolicy::Warn).unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.omitted.len(), 1);
        assert_eq!(result.omitted[0].reason, OmissionReason::InlineWithoutParent);
    }

    #[test]
    fn reject_policy_lists_offenders() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::inline(k(99), "text", "lost"),
        ];
        let err = reconstruct(&pieces, IdAllocator::new(), DanglingPolicy::Reject).unwrap_err();
        match err {
            ReconstructError::DanglingReference { pieces } => {
                assert_eq!(
                    pieces,
                    vec![PieceRef {
                        index: 1,
                        key: None,
                        parent: k(99),
                    }]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reject_names_parentless_inline() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::inline(None, "text", "floating"),
        ];
        let err = reconstruct(&pieces, IdAllocator::new(), DanglingPolicy::Reject).unwrap_err();
        assert!(matches!(err, ReconstructError::DanglingReference { .. }));
        let message = err.to_string();
        assert!(message.contains("#1 without a parent"), "{message}");
        assert!(!message.contains("->"), "{message}");
    }

    #[test]
    fn duplicate_block_keys_are_rejected() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::block(1, k(1), "quote"),
        ];
        let err = build(&pieces, IdAllocator::new()).unwrap_err();
        assert!(matches!(
            err,
            ReconstructError::DuplicateKey {
                first: 0,
                second: 1,
                ..
            }
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::block(2, k(3), "quote"),
            Piece::block(3, k(2), "quote"),
        ];
        let err = build(&pieces, IdAllocator::new()).unwrap_err();
        assert!(matches!(err, ReconstructError::Cycle { .. }));
    }

    #[test]
    fn unreachable_defects_fail_under_every_policy() {
        let cycle = vec![
            Piece::block(1, None, "para"),
            Piece::inline(k(1), "text", "kept"),
            Piece::block(7, k(8), "quote"),
            Piece::block(8, k(7), "quote"),
        ];
        let duplicate = vec![
            Piece::block(1, None, "para"),
            Piece::block(5, k(40), "quote"),
            Piece::block(5, k(41), "quote"),
        ];
        for policy in [DanglingPolicy::Drop, DanglingPolicy::Warn, DanglingPolicy::Reject] {
            let err = reconstruct(&cycle, IdAllocator::new(), policy).unwrap_err();
            assert!(matches!(err, ReconstructError::Cycle { .. }), "{policy:?}");
            let err = reconstruct(&duplicate, IdAllocator::new(), policy).unwrap_err();
            assert!(
                matches!(err, ReconstructError::DuplicateKey { .. }),
                "{policy:?}"
            );
        }
    }

    #[test]
    fn every_piece_used_at_most_once_and_roots_complete() {
        let pieces = vec![
            Piece::block(1, None, "para"),
            Piece::block(2, None, "para"),
            Piece::block(3, k(1), "list"),
            Piece::block(4, k(3), "item"),
            Piece::inline(k(4), "text", "deep"),
            Piece::inline(k(2), "text", "shallow"),
            Piece::inline(k(3), "text", "mid"),
        ];
        let result = reconstruct(&pieces, IdAllocator::new(), DanglingPolicy::Reject).unwrap();
        let document = Document {
            author: "a".into(),
            last_updated_on: None,
            nodes: result.nodes,
        };
        assert_eq!(document.node_count(), pieces.len());
        let ids: HashSet<Uuid> = document.walk().map(|(_, n)| n.id).collect();
        assert_eq!(ids.len(), pieces.len());
        assert_eq!(document.nodes.len(), 2);
        let depths: Vec<usize> = document.walk().map(|(d, _)| d).collect();
        assert_eq!(depths, vec![0, 1, 2, 3, 2, 0, 1]);
        verify_tree(&document.nodes).unwrap();
    }

    #[test]
    fn document_carries_metadata() {
        let when = DateTime::parse_from_rfc3339("2018-04-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let pieces = vec![Piece::block(1, None, "heading")];
        let (document, omitted) = Document::reconstruct(
            "Editorial Team",
            Some(when),
            &pieces,
            IdAllocator::new(),
            DanglingPolicy::Warn,
        )
        .unwrap();
        assert_eq!(document.author, "Editorial Team");
        assert_eq!(document.last_updated_on, Some(when));
        assert_eq!(document.nodes.len(), 1);
        assert!(omitted.is_empty());
    }

    #[test]
    fn separate_runs_use_separate_identifiers() {
        let pieces = vec![Piece::block(1, None, "para")];
        let a = build(&pieces, IdAllocator::new()).unwrap();
        let b = build(&pieces, IdAllocator::new()).unwrap();
        assert_ne!(a[0].id, b[0].id);
    }

    #[test]
    fn policy_parses_from_str() {
        assert_eq!("reject".parse::<DanglingPolicy>(), Ok(DanglingPolicy::Reject));
        assert!("explode".parse::<DanglingPolicy>().is_err());
        assert_eq!(DanglingPolicy::default(), DanglingPolicy::Warn);
    }
}
