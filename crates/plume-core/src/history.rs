// SPDX-License-Identifier: Apache-2.0
//! Undo/redo stacks, commit-time grouping, and the jump-to-edit history.
//!
//! Grouping happens once, when a patch is committed, so the stacks only ever
//! hold coherent user-visible steps:
//! - non-undoable patches are never pushed;
//! - dispensable patches (a cursor refresh that changes nothing observable)
//!   merge into the previous step instead of stacking;
//! - navigation-only patches merge into the preceding step, so a single undo
//!   reverses an edit together with any looking-around that followed it;
//! - contiguous value edits to the same thought coalesce into one step.
//!
//! Undo and redo replay recorded ops only; they never re-run commands.
//! Undoing with an empty stack is a no-op, not an error.

use crate::patch::{apply_forward, apply_reverse, UndoPatch};
use crate::path::Path;
use crate::state::AppState;

/// Bounded history of recently edited locations.
///
/// Editing an ancestor or descendant of the most recent entry replaces that
/// entry rather than appending, so drilling around one subtree is a single
/// jump point. Unrelated edits append. The oldest entries fall off past
/// capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JumpHistory {
    entries: Vec<Path>,
    /// Index of the entry the next backward jump lands on.
    pos: usize,
    capacity: usize,
}

impl JumpHistory {
    /// Creates an empty history with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            pos: 0,
            capacity: capacity.max(1),
        }
    }

    /// Entries from oldest to newest.
    #[must_use]
    pub fn entries(&self) -> &[Path] {
        &self.entries
    }

    /// Records an edit location.
    pub fn push_edit(&mut self, path: Path) {
        let related = self
            .entries
            .last()
            .is_some_and(|last| last.starts_with(&path) || path.starts_with(last));
        if related {
            if let Some(last) = self.entries.last_mut() {
                *last = path;
            }
        } else {
            self.entries.push(path);
            if self.entries.len() > self.capacity {
                self.entries.remove(0);
            }
        }
        self.pos = self.entries.len().saturating_sub(1);
    }

    /// Steps backward through edit points.
    pub fn back(&mut self) -> Option<Path> {
        if self.entries.is_empty() {
            return None;
        }
        let target = self.entries.get(self.pos).cloned();
        self.pos = self.pos.saturating_sub(1);
        target
    }

    /// Steps forward through edit points.
    pub fn forward(&mut self) -> Option<Path> {
        if self.entries.is_empty() {
            return None;
        }
        self.pos = (self.pos + 1).min(self.entries.len() - 1);
        self.entries.get(self.pos).cloned()
    }
}

/// Undo and redo stacks plus the jump history.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct History {
    undo: Vec<UndoPatch>,
    redo: Vec<UndoPatch>,
    jump: JumpHistory,
}

impl History {
    /// Creates empty stacks with the given jump capacity.
    #[must_use]
    pub fn new(jump_capacity: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            jump: JumpHistory::new(jump_capacity),
        }
    }

    /// Number of undoable steps.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redoable steps.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Most recently committed step, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&UndoPatch> {
        self.undo.last()
    }

    /// Most recently undone step, if any.
    #[must_use]
    pub fn latest_redo(&self) -> Option<&UndoPatch> {
        self.redo.last()
    }

    /// Undoable steps, oldest first.
    #[must_use]
    pub fn undo_stack(&self) -> &[UndoPatch] {
        &self.undo
    }

    /// Redoable steps, oldest first.
    #[must_use]
    pub fn redo_stack(&self) -> &[UndoPatch] {
        &self.redo
    }

    /// Rebuilds stacks from persisted parts.
    #[cfg(feature = "serde")]
    pub(crate) fn from_parts(
        undo: Vec<UndoPatch>,
        redo: Vec<UndoPatch>,
        jump_capacity: usize,
    ) -> Self {
        Self {
            undo,
            redo,
            jump: JumpHistory::new(jump_capacity),
        }
    }

    /// The jump-to-edit history.
    #[must_use]
    pub fn jump(&self) -> &JumpHistory {
        &self.jump
    }

    /// The jump-to-edit history, mutable (for jump commands).
    pub(crate) fn jump_mut(&mut self) -> &mut JumpHistory {
        &mut self.jump
    }

    /// Applies the grouping policy and pushes (or merges) a committed patch.
    pub(crate) fn commit(&mut self, patch: UndoPatch, dispensable: bool, edit_point: Option<Path>) {
        if !patch.undoable() {
            return;
        }
        if dispensable {
            // Merge, never stack; with nothing to merge into, drop.
            if let Some(top) = self.undo.last_mut() {
                top.absorb(patch);
            }
            return;
        }
        if patch.navigation() {
            match self.undo.last_mut() {
                Some(top) => top.absorb(patch),
                None => {
                    self.undo.push(patch);
                    self.redo.clear();
                }
            }
            return;
        }
        // Structural commit: coalesce contiguous edits to the same thought.
        let coalesced = match (self.undo.last_mut(), patch.edit_target()) {
            (Some(top), Some(target))
                if top.name() == patch.name() && top.edit_target() == Some(target) =>
            {
                top.absorb(patch.clone());
                true
            }
            _ => false,
        };
        if !coalesced {
            self.undo.push(patch);
        }
        self.redo.clear();
        if let Some(point) = edit_point {
            self.jump.push_edit(point);
        }
    }
}

/// Reverses the most recent step; no-op on an empty stack.
///
/// Returns `true` when a step was undone.
pub fn undo(state: &mut AppState) -> bool {
    let Some(patch) = state.history_mut().pop_undo() else {
        return false;
    };
    if let Err(e) = apply_reverse(state, &patch) {
        debug_assert!(false, "undo replay failed: {e}");
        state.history_mut().undo.push(patch);
        return false;
    }
    state.history_mut().redo.push(patch);
    true
}

/// Reapplies the most recently undone step; no-op on an empty stack.
///
/// Returns `true` when a step was redone.
pub fn redo(state: &mut AppState) -> bool {
    let Some(patch) = state.history_mut().pop_redo() else {
        return false;
    };
    if let Err(e) = apply_forward(state, &patch) {
        debug_assert!(false, "redo replay failed: {e}");
        state.history_mut().redo.push(patch);
        return false;
    }
    state.history_mut().undo.push(patch);
    true
}

impl History {
    fn pop_undo(&mut self) -> Option<UndoPatch> {
        self.undo.pop()
    }

    fn pop_redo(&mut self) -> Option<UndoPatch> {
        self.redo.pop()
    }
}
