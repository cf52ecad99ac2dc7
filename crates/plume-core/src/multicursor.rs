// SPDX-License-Identifier: Apache-2.0
//! Multicursor batch engine: one command, many selected paths, one patch.
//!
//! A batch is a transaction boundary: every per-path application is compiled
//! and applied in turn (so later applications see earlier effects), the
//! accumulated ops commit as a single undo step, and the selection is
//! cleared afterwards. Per-path failures raise an alert and skip that path;
//! a batch where nothing applied pushes no patch at all.
//!
//! Ordering keeps rank-shifting commands correct: paths are processed in
//! on-screen document order, reversed for commands that push content
//! downward (move-down, new-sibling) so an earlier application cannot
//! invalidate a not-yet-processed path.

use crate::alert::AlertKind;
use crate::command::{
    build_archive, build_delete, build_indent, build_move_vertical, build_new_sibling,
    build_outdent, Built, CommandError, Outcome, PatchSummary,
};
use crate::patch::{apply_ops, PatchOp, UndoPatch};
use crate::path::Path;
use crate::state::AppState;
use crate::thought::Timestamp;
use crate::view::visible_children_of;

/// A command applicable once per selected path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BatchCommand {
    /// Swap each selection with its previous visible sibling.
    MoveThoughtUp,
    /// Swap each selection with its next visible sibling.
    MoveThoughtDown,
    /// Indent each selection under its previous sibling.
    Indent,
    /// Outdent each selection next to its parent.
    Outdent,
    /// Recursively delete each selection.
    Delete,
    /// Archive each selection.
    Archive,
    /// Insert a new sibling after each selection.
    NewSibling {
        /// Initial value of every created thought.
        value: String,
    },
}

impl BatchCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::MoveThoughtUp => "batch/move_up",
            Self::MoveThoughtDown => "batch/move_down",
            Self::Indent => "batch/indent",
            Self::Outdent => "batch/outdent",
            Self::Delete => "batch/delete",
            Self::Archive => "batch/archive",
            Self::NewSibling { .. } => "batch/new_sibling",
        }
    }

    /// Commands whose side effects shift content downward process bottom-up
    /// so earlier applications cannot invalidate later paths.
    fn processes_in_reverse(&self) -> bool {
        matches!(self, Self::MoveThoughtDown | Self::NewSibling { .. })
    }
}

/// Position key of a path in the flattened visible document.
///
/// Lexicographic comparison of per-level sibling indexes gives document
/// (preorder) order; an ancestor sorts before its descendants. Unresolvable
/// levels sort last.
fn document_order_key(state: &AppState, path: &Path) -> Vec<usize> {
    let mut key = Vec::with_capacity(path.depth());
    let mut prefix: Option<Path> = None;
    for id in path.ids() {
        let siblings = visible_children_of(state, prefix.as_ref());
        let pos = siblings
            .iter()
            .position(|s| s.last() == *id)
            .unwrap_or(usize::MAX);
        key.push(pos);
        prefix = Some(match prefix {
            None => Path::from_id(*id),
            Some(p) => p.child(*id),
        });
    }
    key
}

fn build_item(
    state: &mut AppState,
    command: &BatchCommand,
    path: &Path,
    now: Timestamp,
) -> Result<Built, CommandError> {
    match command {
        BatchCommand::MoveThoughtUp => build_move_vertical(state, path, -1, now),
        BatchCommand::MoveThoughtDown => build_move_vertical(state, path, 1, now),
        BatchCommand::Indent => build_indent(state, path, now),
        BatchCommand::Outdent => build_outdent(state, path, now),
        BatchCommand::Delete => build_delete(state, path, now),
        BatchCommand::Archive => build_archive(state, path, now),
        BatchCommand::NewSibling { value } => build_new_sibling(state, path, value, now),
    }
}

/// Applies `command` across the multicursor selection as one atomic step.
pub(crate) fn apply_batch(
    state: &mut AppState,
    command: &BatchCommand,
) -> Result<Outcome, CommandError> {
    let selected: Vec<Path> = state.multicursors().values().cloned().collect();
    if selected.is_empty() {
        return Ok(Outcome::NoOp);
    }
    let mut keyed: Vec<(Vec<usize>, Path)> = selected
        .into_iter()
        .map(|p| (document_order_key(state, &p), p))
        .collect();
    keyed.sort();
    let mut ordered: Vec<Path> = keyed.into_iter().map(|(_, p)| p).collect();
    if command.processes_in_reverse() {
        ordered.reverse();
    }

    let now = state.tick().next();
    let cursor_before = state.cursor().cloned();
    let mut ops_all: Vec<PatchOp> = Vec::new();
    let mut cursor_after: Option<Option<Path>> = None;
    let mut edit_point: Option<Path> = None;
    let mut applied = 0usize;

    for path in &ordered {
        let built = match build_item(state, command, path, now) {
            Ok(built) => built,
            Err(e) => {
                state
                    .alerts_mut()
                    .push(AlertKind::BatchPathSkipped, format!("selection skipped: {e}"), now);
                continue;
            }
        };
        if built.ops.is_empty() {
            // Boundary no-op (e.g. move-down on the last sibling).
            continue;
        }
        if let Err(e) = apply_ops(state, &built.ops) {
            state
                .alerts_mut()
                .push(AlertKind::BatchPathSkipped, format!("selection skipped: {e}"), now);
            continue;
        }
        ops_all.extend(built.ops);
        if built.cursor_after.is_some() {
            cursor_after = built.cursor_after;
        }
        if built.edit_point.is_some() {
            edit_point = built.edit_point;
        }
        applied += 1;
    }

    state.clear_multicursors_raw();
    if applied == 0 {
        state.alerts_mut().push(
            AlertKind::BatchEmpty,
            "no selection could be applied",
            now,
        );
        return Ok(Outcome::NoOp);
    }

    if let Some(after) = cursor_after {
        if after != cursor_before {
            let op = PatchOp::SetCursor {
                before: cursor_before,
                after,
            };
            apply_ops(state, core::slice::from_ref(&op))?;
            ops_all.push(op);
        }
    }

    let tick = state.advance_tick();
    let patch = UndoPatch::new(command.name(), ops_all, true, false);
    let summary = PatchSummary {
        name: patch.name().to_owned(),
        digest: patch.digest(),
        tick,
    };
    state.history_mut().commit(patch, false, edit_point);
    Ok(Outcome::Committed(summary))
}
