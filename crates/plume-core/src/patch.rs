// SPDX-License-Identifier: Apache-2.0
//! Undo patches: replayable, reversible structural diff records.
//!
//! Every committed command produces at most one [`UndoPatch`] — an ordered
//! list of [`PatchOp`]s, each carrying enough before/after data to invert
//! exactly. Undo applies the inverted ops in reverse order; redo reapplies
//! the forward ops. This is an explicit reversible-operation log, not
//! generic object diffing: the inverse of every op is another op, so the
//! round-trip law is checkable per op.
//!
//! Ephemeral fields (alerts, the multicursor selection) never appear in ops,
//! so undoing can never resurrect them.

use blake3::Hasher;

use crate::ident::{Hash, ThoughtId};
use crate::path::Path;
use crate::state::AppState;
use crate::store::StoreError;
use crate::thought::{Rank, Timestamp};

/// One reversible structural operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatchOp {
    /// Create a thought with a known id and full record.
    CreateThought {
        /// Id of the created thought.
        id: ThoughtId,
        /// Structural parent.
        parent: ThoughtId,
        /// Display value.
        value: String,
        /// Sibling rank.
        rank: Rank,
        /// `last_updated` stamp of the created record.
        updated: Timestamp,
        /// Archived marker of the created record.
        archived: bool,
    },
    /// Delete a childless thought. Recursive deletes emit one op per
    /// thought, children first.
    DeleteThought {
        /// Id of the deleted thought.
        id: ThoughtId,
        /// Structural parent at deletion time.
        parent: ThoughtId,
        /// Display value at deletion time.
        value: String,
        /// Sibling rank at deletion time.
        rank: Rank,
        /// `last_updated` stamp at deletion time.
        updated: Timestamp,
        /// Archived marker at deletion time.
        archived: bool,
    },
    /// Replace a thought's value.
    SetValue {
        /// Target thought.
        id: ThoughtId,
        /// Value before the edit.
        before: String,
        /// Value after the edit.
        after: String,
        /// `last_updated` before the edit.
        updated_before: Timestamp,
        /// `last_updated` after the edit.
        updated_after: Timestamp,
    },
    /// Replace a thought's sibling rank.
    SetRank {
        /// Target thought.
        id: ThoughtId,
        /// Rank before.
        before: Rank,
        /// Rank after.
        after: Rank,
        /// `last_updated` before.
        updated_before: Timestamp,
        /// `last_updated` after.
        updated_after: Timestamp,
    },
    /// Reparent a thought (a move; carries both placements).
    SetParent {
        /// Target thought.
        id: ThoughtId,
        /// Parent before the move.
        parent_before: ThoughtId,
        /// Rank before the move.
        rank_before: Rank,
        /// Parent after the move.
        parent_after: ThoughtId,
        /// Rank after the move.
        rank_after: Rank,
        /// `last_updated` before.
        updated_before: Timestamp,
        /// `last_updated` after.
        updated_after: Timestamp,
    },
    /// Flip a thought's archived marker.
    SetArchived {
        /// Target thought.
        id: ThoughtId,
        /// Marker before.
        before: bool,
        /// Marker after.
        after: bool,
        /// `last_updated` before.
        updated_before: Timestamp,
        /// `last_updated` after.
        updated_after: Timestamp,
    },
    /// Move the cursor.
    SetCursor {
        /// Cursor before.
        before: Option<Path>,
        /// Cursor after.
        after: Option<Path>,
    },
    /// Toggle a thought's context view flag (self-inverse).
    ToggleContextView {
        /// Toggled thought.
        id: ThoughtId,
    },
}

impl PatchOp {
    /// The exact inverse of this op.
    #[must_use]
    pub fn inverted(&self) -> Self {
        match self.clone() {
            Self::CreateThought {
                id,
                parent,
                value,
                rank,
                updated,
                archived,
            } => Self::DeleteThought {
                id,
                parent,
                value,
                rank,
                updated,
                archived,
            },
            Self::DeleteThought {
                id,
                parent,
                value,
                rank,
                updated,
                archived,
            } => Self::CreateThought {
                id,
                parent,
                value,
                rank,
                updated,
                archived,
            },
            Self::SetValue {
                id,
                before,
                after,
                updated_before,
                updated_after,
            } => Self::SetValue {
                id,
                before: after,
                after: before,
                updated_before: updated_after,
                updated_after: updated_before,
            },
            Self::SetRank {
                id,
                before,
                after,
                updated_before,
                updated_after,
            } => Self::SetRank {
                id,
                before: after,
                after: before,
                updated_before: updated_after,
                updated_after: updated_before,
            },
            Self::SetParent {
                id,
                parent_before,
                rank_before,
                parent_after,
                rank_after,
                updated_before,
                updated_after,
            } => Self::SetParent {
                id,
                parent_before: parent_after,
                rank_before: rank_after,
                parent_after: parent_before,
                rank_after: rank_before,
                updated_before: updated_after,
                updated_after: updated_before,
            },
            Self::SetArchived {
                id,
                before,
                after,
                updated_before,
                updated_after,
            } => Self::SetArchived {
                id,
                before: after,
                after: before,
                updated_before: updated_after,
                updated_after: updated_before,
            },
            Self::SetCursor { before, after } => Self::SetCursor {
                before: after,
                after: before,
            },
            Self::ToggleContextView { id } => Self::ToggleContextView { id },
        }
    }

    fn hash_into(&self, hasher: &mut Hasher) {
        fn hash_path(hasher: &mut Hasher, path: Option<&Path>) {
            match path {
                None => {
                    hasher.update(&[0]);
                }
                Some(p) => {
                    hasher.update(&[1]);
                    hasher.update(&(p.depth() as u64).to_le_bytes());
                    for id in p.ids() {
                        hasher.update(&id.0);
                    }
                }
            }
        }
        match self {
            Self::CreateThought {
                id,
                parent,
                value,
                rank,
                updated,
                archived,
            }
            | Self::DeleteThought {
                id,
                parent,
                value,
                rank,
                updated,
                archived,
            } => {
                hasher.update(&[if matches!(self, Self::CreateThought { .. }) {
                    1
                } else {
                    2
                }]);
                hasher.update(&id.0);
                hasher.update(&parent.0);
                hasher.update(&(value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
                hasher.update(&rank.value().to_le_bytes());
                hasher.update(&updated.value().to_le_bytes());
                hasher.update(&[u8::from(*archived)]);
            }
            Self::SetValue {
                id,
                before,
                after,
                updated_before,
                updated_after,
            } => {
                hasher.update(&[3]);
                hasher.update(&id.0);
                hasher.update(&(before.len() as u64).to_le_bytes());
                hasher.update(before.as_bytes());
                hasher.update(&(after.len() as u64).to_le_bytes());
                hasher.update(after.as_bytes());
                hasher.update(&updated_before.value().to_le_bytes());
                hasher.update(&updated_after.value().to_le_bytes());
            }
            Self::SetRank {
                id,
                before,
                after,
                updated_before,
                updated_after,
            } => {
                hasher.update(&[4]);
                hasher.update(&id.0);
                hasher.update(&before.value().to_le_bytes());
                hasher.update(&after.value().to_le_bytes());
                hasher.update(&updated_before.value().to_le_bytes());
                hasher.update(&updated_after.value().to_le_bytes());
            }
            Self::SetParent {
                id,
                parent_before,
                rank_before,
                parent_after,
                rank_after,
                updated_before,
                updated_after,
            } => {
                hasher.update(&[5]);
                hasher.update(&id.0);
                hasher.update(&parent_before.0);
                hasher.update(&rank_before.value().to_le_bytes());
                hasher.update(&parent_after.0);
                hasher.update(&rank_after.value().to_le_bytes());
                hasher.update(&updated_before.value().to_le_bytes());
                hasher.update(&updated_after.value().to_le_bytes());
            }
            Self::SetArchived {
                id,
                before,
                after,
                updated_before,
                updated_after,
            } => {
                hasher.update(&[6]);
                hasher.update(&id.0);
                hasher.update(&[u8::from(*before), u8::from(*after)]);
                hasher.update(&updated_before.value().to_le_bytes());
                hasher.update(&updated_after.value().to_le_bytes());
            }
            Self::SetCursor { before, after } => {
                hasher.update(&[7]);
                hash_path(hasher, before.as_ref());
                hash_path(hasher, after.as_ref());
            }
            Self::ToggleContextView { id } => {
                hasher.update(&[8]);
                hasher.update(&id.0);
            }
        }
    }
}

/// One committed, groupable user-visible step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UndoPatch {
    name: String,
    ops: Vec<PatchOp>,
    undoable: bool,
    navigation: bool,
    digest: Hash,
}

impl UndoPatch {
    /// Constructs a patch and computes its canonical digest.
    #[must_use]
    pub fn new(name: impl Into<String>, ops: Vec<PatchOp>, undoable: bool, navigation: bool) -> Self {
        let name = name.into();
        let digest = compute_patch_digest(&name, &ops, undoable, navigation);
        Self {
            name,
            ops,
            undoable,
            navigation,
            digest,
        }
    }

    /// Name of the producing command.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The recorded ops in forward order.
    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Whether this patch participates in undo.
    #[must_use]
    pub fn undoable(&self) -> bool {
        self.undoable
    }

    /// Whether this patch records only navigation (no structural change).
    #[must_use]
    pub fn navigation(&self) -> bool {
        self.navigation
    }

    /// Canonical digest of the patch contents.
    #[must_use]
    pub fn digest(&self) -> Hash {
        self.digest
    }

    /// Target thought of a pure value edit: every structural op is a
    /// `SetValue` on the same thought (cursor ops ride along). Used by
    /// contiguous-edit grouping — grouping only ever merges adjacent
    /// same-field edits, so any other structural op disqualifies the patch.
    #[must_use]
    pub fn edit_target(&self) -> Option<ThoughtId> {
        let mut target = None;
        for op in &self.ops {
            match op {
                PatchOp::SetCursor { .. } => {}
                PatchOp::SetValue { id, .. } => {
                    if target.is_some_and(|t| t != *id) {
                        return None;
                    }
                    target = Some(*id);
                }
                _ => return None,
            }
        }
        target
    }

    /// Merges a grouped patch into this one, coalescing adjacent same-field
    /// ops so grouped steps stay minimal.
    ///
    /// Coalescing only merges *adjacent same-target* edits: a `SetValue` on
    /// the same thought folds into the previous `SetValue`, a cursor move
    /// folds into the previous cursor move. Everything else appends.
    pub(crate) fn absorb(&mut self, other: UndoPatch) {
        for op in other.ops {
            let merged = match self.ops.last_mut() {
                Some(PatchOp::SetValue {
                    id: prev_id,
                    after,
                    updated_after,
                    ..
                }) => {
                    if let PatchOp::SetValue {
                        id,
                        after: ref next_after,
                        updated_after: next_updated,
                        ..
                    } = op
                    {
                        if *prev_id == id {
                            after.clone_from(next_after);
                            *updated_after = next_updated;
                            true
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                }
                Some(PatchOp::SetCursor { after, .. }) => {
                    if let PatchOp::SetCursor {
                        after: ref next_after,
                        ..
                    } = op
                    {
                        after.clone_from(next_after);
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            };
            if !merged {
                self.ops.push(op);
            }
        }
        self.navigation = self.navigation && other.navigation;
        self.digest = compute_patch_digest(&self.name, &self.ops, self.undoable, self.navigation);
    }
}

fn compute_patch_digest(name: &str, ops: &[PatchOp], undoable: bool, navigation: bool) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"PLUME_PATCH_V1\0");
    hasher.update(&(name.len() as u64).to_le_bytes());
    hasher.update(name.as_bytes());
    hasher.update(&[u8::from(undoable), u8::from(navigation)]);
    hasher.update(&(ops.len() as u64).to_le_bytes());
    for op in ops {
        op.hash_into(&mut hasher);
    }
    *hasher.finalize().as_bytes()
}

/// Applies one op to the state.
pub(crate) fn apply_op(state: &mut AppState, op: &PatchOp) -> Result<(), StoreError> {
    match op {
        PatchOp::CreateThought {
            id,
            parent,
            value,
            rank,
            updated,
            archived,
        } => state
            .store_mut()
            .create_with_id(*id, parent, value, *rank, *updated, *archived),
        PatchOp::DeleteThought { id, .. } => state.store_mut().remove_leaf(id).map(|_| ()),
        PatchOp::SetValue {
            id,
            after,
            updated_after,
            ..
        } => state
            .store_mut()
            .update_value(id, after, *updated_after)
            .map(|_| ()),
        PatchOp::SetRank {
            id,
            after,
            updated_after,
            ..
        } => state
            .store_mut()
            .update_rank(id, *after, *updated_after)
            .map(|_| ()),
        PatchOp::SetParent {
            id,
            parent_after,
            rank_after,
            updated_after,
            ..
        } => state
            .store_mut()
            .move_thought(id, parent_after, *rank_after, *updated_after),
        PatchOp::SetArchived {
            id,
            after,
            updated_after,
            ..
        } => state
            .store_mut()
            .set_archived(id, *after, *updated_after)
            .map(|_| ()),
        PatchOp::SetCursor { after, .. } => {
            state.set_cursor_raw(after.clone());
            Ok(())
        }
        PatchOp::ToggleContextView { id } => {
            state.toggle_context_view_raw(*id);
            Ok(())
        }
    }
}

/// Applies `ops` in order; on failure, rolls back the applied prefix.
///
/// Failure here means a builder bug (builders validate against the same
/// state they build from), so the rollback is a containment measure, not a
/// control path.
pub(crate) fn apply_ops(state: &mut AppState, ops: &[PatchOp]) -> Result<(), StoreError> {
    for (i, op) in ops.iter().enumerate() {
        if let Err(e) = apply_op(state, op) {
            debug_assert!(false, "op application failed mid-patch: {e}");
            for done in ops[..i].iter().rev() {
                let _ = apply_op(state, &done.inverted());
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Replays a patch forward (redo).
pub(crate) fn apply_forward(state: &mut AppState, patch: &UndoPatch) -> Result<(), StoreError> {
    apply_ops(state, patch.ops())
}

/// Replays a patch backward (undo): inverted ops in reverse order.
pub(crate) fn apply_reverse(state: &mut AppState, patch: &UndoPatch) -> Result<(), StoreError> {
    let inverted: Vec<PatchOp> = patch.ops().iter().rev().map(PatchOp::inverted).collect();
    apply_ops(state, &inverted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::make_thought_id;

    #[test]
    fn inversion_is_an_involution() {
        let ops = vec![
            PatchOp::CreateThought {
                id: make_thought_id("a"),
                parent: crate::ident::root_thought_id(),
                value: "a".into(),
                rank: Rank::nth(0),
                updated: Timestamp::from_raw(1),
                archived: false,
            },
            PatchOp::SetValue {
                id: make_thought_id("a"),
                before: "a".into(),
                after: "aa".into(),
                updated_before: Timestamp::from_raw(1),
                updated_after: Timestamp::from_raw(2),
            },
            PatchOp::SetCursor {
                before: None,
                after: Some(Path::from_id(make_thought_id("a"))),
            },
            PatchOp::ToggleContextView {
                id: make_thought_id("a"),
            },
        ];
        for op in ops {
            assert_eq!(op.inverted().inverted(), op);
        }
    }

    #[test]
    fn digest_commits_to_ops_and_name() {
        let op = PatchOp::ToggleContextView {
            id: make_thought_id("a"),
        };
        let p1 = UndoPatch::new("toggle", vec![op.clone()], true, true);
        let p2 = UndoPatch::new("toggle", vec![op.clone(), op.clone()], true, true);
        let p3 = UndoPatch::new("other", vec![op], true, true);
        assert_ne!(p1.digest(), p2.digest());
        assert_ne!(p1.digest(), p3.digest());
    }

    #[test]
    fn absorb_coalesces_adjacent_value_edits() {
        let id = make_thought_id("a");
        let edit = |before: &str, after: &str, t0: u64, t1: u64| PatchOp::SetValue {
            id,
            before: before.into(),
            after: after.into(),
            updated_before: Timestamp::from_raw(t0),
            updated_after: Timestamp::from_raw(t1),
        };
        let mut patch = UndoPatch::new("edit", vec![edit("a", "aa", 1, 2)], true, false);
        patch.absorb(UndoPatch::new("edit", vec![edit("aa", "aaa", 2, 3)], true, false));
        assert_eq!(patch.ops().len(), 1);
        assert_eq!(
            patch.ops()[0],
            edit("a", "aaa", 1, 3)
        );
    }
}
