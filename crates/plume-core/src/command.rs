// SPDX-License-Identifier: Apache-2.0
//! The command boundary: a closed sum type of operations and the single
//! `apply` entry point.
//!
//! Commands validate against the state they will mutate *before* any op is
//! applied, so a rejected command leaves the state untouched (all-or-nothing
//! per single-path command). Accepted commands compile into reversible op
//! lists, apply forward, and commit through the grouping policy in
//! [`crate::history`].
//!
//! Unresolvable targets are a deliberate split: structural commands reject
//! with [`CommandError::NotFound`], while pure navigation (`SetCursor`,
//! `ToggleContextView` on a gone thought) degrades to a no-op — the UI may
//! race with asynchronous loads and a stale click must not crash anything.

use thiserror::Error;

use crate::history;
use crate::ident::{Hash, ThoughtId};
use crate::multicursor::{self, BatchCommand};
use crate::patch::{apply_ops, PatchOp, UndoPatch};
use crate::path::{simplify_path, structural_path, thought_at, Path};
use crate::state::AppState;
use crate::store::{StoreError, ThoughtStore};
use crate::thought::{
    is_attribute_value, Rank, Timestamp, ATTR_ARCHIVE, ATTR_READONLY, ATTR_SORT, RANK_GAP,
};
use crate::view::{sort_preference, visible_child_ids, SortDirection, SortPreference};

/// Direction of a jump through the edit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JumpDirection {
    /// Toward older edit points.
    Back,
    /// Toward newer edit points.
    Forward,
}

/// A tagged engine operation with explicit payload fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Append a new thought under a parent (`None` = root).
    NewThought {
        /// Parent location, or `None` for the root level.
        parent: Option<Path>,
        /// Initial value.
        value: String,
    },
    /// Insert a new thought as the next sibling of `after`.
    NewSibling {
        /// The sibling to insert after.
        after: Path,
        /// Initial value.
        value: String,
    },
    /// Replace a thought's value.
    Edit {
        /// Target location.
        path: Path,
        /// New value.
        value: String,
    },
    /// Move a thought to the end of another parent (`None` = root).
    Move {
        /// Target location.
        path: Path,
        /// Destination parent, or `None` for the root level.
        new_parent: Option<Path>,
    },
    /// Swap a thought with its previous visible sibling.
    MoveThoughtUp {
        /// Target location.
        path: Path,
    },
    /// Swap a thought with its next visible sibling.
    MoveThoughtDown {
        /// Target location.
        path: Path,
    },
    /// Make a thought the last child of its previous sibling.
    Indent {
        /// Target location.
        path: Path,
    },
    /// Move a thought to be the next sibling of its parent.
    Outdent {
        /// Target location.
        path: Path,
    },
    /// Recursively delete a thought.
    Delete {
        /// Target location.
        path: Path,
    },
    /// Reparent a thought under its parent's `=archive` container.
    Archive {
        /// Target location.
        path: Path,
    },
    /// Set the child sort preference of a thought (`None` = root).
    SetSort {
        /// Target location, or `None` for the root level.
        path: Option<Path>,
        /// Desired ordering.
        preference: SortPreference,
    },
    /// Toggle the context view at a location.
    ToggleContextView {
        /// Target location.
        path: Path,
    },
    /// Focus a location, or blur with `None`.
    SetCursor {
        /// New cursor, or `None` for no focus.
        path: Option<Path>,
    },
    /// Add a location to the multicursor selection.
    AddMulticursor {
        /// Selected location.
        path: Path,
    },
    /// Drop the whole multicursor selection.
    ClearMulticursors,
    /// Apply a batch command across the multicursor selection.
    Batch {
        /// The per-path command.
        command: BatchCommand,
    },
    /// Reverse the most recent undoable step.
    Undo,
    /// Reapply the most recently undone step.
    Redo,
    /// Move the cursor through the edit history.
    Jump {
        /// Direction of travel.
        direction: JumpDirection,
    },
}

/// Error returned by the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A referenced path or id does not resolve.
    #[error("target not found")]
    NotFound,
    /// The move would place a thought inside its own subtree.
    #[error("move would create a structural cycle")]
    CyclicMove,
    /// The root (or another reserved thought) cannot be mutated this way.
    #[error("thought is protected")]
    ProtectedThought,
    /// The target carries a `=readonly` policy flag.
    #[error("thought is flagged read-only")]
    Uneditable,
    /// The target is a metadata attribute; mutate it through its own command.
    #[error("attribute thoughts are read-only here")]
    ReadOnly,
    /// Malformed payload.
    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),
}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::CyclicMove => Self::CyclicMove,
            StoreError::ProtectedThought => Self::ProtectedThought,
            StoreError::DuplicateId | StoreError::HasChildren => {
                Self::InvalidCommand("store rejected the operation")
            }
        }
    }
}

/// Summary of a committed patch, for observers and callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSummary {
    /// Command name recorded in the patch.
    pub name: String,
    /// Canonical digest of the patch as committed (pre-grouping).
    pub digest: Hash,
    /// Tick the commit happened at.
    pub tick: Timestamp,
}

/// Result of applying a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A patch was committed (possibly grouped into the previous step).
    Committed(PatchSummary),
    /// A step was undone.
    Undone,
    /// A step was redone.
    Redone,
    /// Nothing changed.
    NoOp,
}

/// A validated command compiled to reversible ops, before commit.
pub(crate) struct Built {
    pub(crate) name: &'static str,
    pub(crate) ops: Vec<PatchOp>,
    /// `Some(c)` moves the cursor to `c` as part of the patch.
    pub(crate) cursor_after: Option<Option<Path>>,
    pub(crate) edit_point: Option<Path>,
    pub(crate) navigation: bool,
    pub(crate) dispensable: bool,
}

impl Built {
    fn structural(name: &'static str, ops: Vec<PatchOp>) -> Self {
        Self {
            name,
            ops,
            cursor_after: None,
            edit_point: None,
            navigation: false,
            dispensable: false,
        }
    }

    fn noop(name: &'static str) -> Self {
        Self {
            name,
            ops: Vec::new(),
            cursor_after: None,
            edit_point: None,
            navigation: false,
            dispensable: true,
        }
    }
}

/// Applies one command to the state.
///
/// Validation failures reject before any mutation; accepted commands commit
/// exactly one (possibly grouped) patch.
pub fn apply(state: &mut AppState, command: Command) -> Result<Outcome, CommandError> {
    match command {
        Command::Undo => {
            let undone = history::undo(state);
            #[cfg(feature = "telemetry")]
            if undone {
                if let Some(patch) = state.history().latest_redo() {
                    crate::telemetry::undone(state.tick(), patch.name(), &patch.digest());
                }
            }
            Ok(if undone { Outcome::Undone } else { Outcome::NoOp })
        }
        Command::Redo => {
            let redone = history::redo(state);
            #[cfg(feature = "telemetry")]
            if redone {
                if let Some(patch) = state.history().latest() {
                    crate::telemetry::redone(state.tick(), patch.name(), &patch.digest());
                }
            }
            Ok(if redone { Outcome::Redone } else { Outcome::NoOp })
        }
        Command::AddMulticursor { path } => {
            if thought_at(state.store(), state.context_views(), &path).is_none() {
                return Ok(Outcome::NoOp);
            }
            state.add_multicursor_raw(path);
            Ok(Outcome::NoOp)
        }
        Command::ClearMulticursors => {
            state.clear_multicursors_raw();
            Ok(Outcome::NoOp)
        }
        Command::Batch { command } => multicursor::apply_batch(state, &command),
        Command::Jump { direction } => {
            let target = match direction {
                JumpDirection::Back => state.history_mut().jump_mut().back(),
                JumpDirection::Forward => state.history_mut().jump_mut().forward(),
            };
            let Some(target) = target else {
                return Ok(Outcome::NoOp);
            };
            let built = Built {
                name: "jump",
                ops: Vec::new(),
                cursor_after: Some(Some(target)),
                edit_point: None,
                navigation: true,
                dispensable: false,
            };
            commit_built(state, built)
        }
        other => {
            let now = state.tick().next();
            let built = build(state, &other, now)?;
            commit_built(state, built)
        }
    }
}

/// Applies a compiled command and commits its patch.
pub(crate) fn commit_built(state: &mut AppState, built: Built) -> Result<Outcome, CommandError> {
    let Built {
        name,
        mut ops,
        cursor_after,
        edit_point,
        navigation,
        dispensable,
    } = built;
    if let Some(after) = cursor_after {
        let before = state.cursor().cloned();
        if after != before {
            ops.push(PatchOp::SetCursor { before, after });
        }
    }
    if ops.is_empty() {
        return Ok(Outcome::NoOp);
    }
    apply_ops(state, &ops)?;
    let tick = state.advance_tick();
    let patch = UndoPatch::new(name, ops, true, navigation);
    let summary = PatchSummary {
        name: patch.name().to_owned(),
        digest: patch.digest(),
        tick,
    };
    state.history_mut().commit(patch, dispensable, edit_point);
    #[cfg(feature = "telemetry")]
    crate::telemetry::committed(tick, &summary.name, &summary.digest);
    Ok(Outcome::Committed(summary))
}

fn build(state: &mut AppState, command: &Command, now: Timestamp) -> Result<Built, CommandError> {
    match command {
        Command::NewThought { parent, value } => build_new_thought(state, parent.as_ref(), value, now),
        Command::NewSibling { after, value } => build_new_sibling(state, after, value, now),
        Command::Edit { path, value } => build_edit(state, path, value, now),
        Command::Move { path, new_parent } => build_move(state, path, new_parent.as_ref(), now),
        Command::MoveThoughtUp { path } => build_move_vertical(state, path, -1, now),
        Command::MoveThoughtDown { path } => build_move_vertical(state, path, 1, now),
        Command::Indent { path } => build_indent(state, path, now),
        Command::Outdent { path } => build_outdent(state, path, now),
        Command::Delete { path } => build_delete(state, path, now),
        Command::Archive { path } => build_archive(state, path, now),
        Command::SetSort { path, preference } => build_set_sort(state, path.as_ref(), *preference, now),
        Command::ToggleContextView { path } => build_toggle_context_view(state, path),
        Command::SetCursor { path } => build_set_cursor(state, path.as_ref()),
        Command::Undo
        | Command::Redo
        | Command::AddMulticursor { .. }
        | Command::ClearMulticursors
        | Command::Batch { .. }
        | Command::Jump { .. } => Err(CommandError::InvalidCommand("command has no builder")),
    }
}

fn resolve_thought(state: &AppState, path: &Path) -> Result<ThoughtId, CommandError> {
    thought_at(state.store(), state.context_views(), path).ok_or(CommandError::NotFound)
}

/// Rejects targeting attributes and `=readonly`-flagged thoughts.
fn guard_editable(store: &ThoughtStore, id: &ThoughtId) -> Result<(), CommandError> {
    let t = store.thought(id).ok_or(CommandError::NotFound)?;
    if is_attribute_value(&t.value) {
        return Err(CommandError::ReadOnly);
    }
    if store.child_by_value(id, ATTR_READONLY).is_some() {
        return Err(CommandError::Uneditable);
    }
    Ok(())
}

/// Guard for a destination parent (creation or move target).
fn guard_parent(store: &ThoughtStore, id: &ThoughtId) -> Result<(), CommandError> {
    if *id == store.root() {
        return Ok(());
    }
    guard_editable(store, id)
}

fn single_line(value: &str) -> Result<(), CommandError> {
    if value.contains('\n') {
        return Err(CommandError::InvalidCommand("value must be a single line"));
    }
    Ok(())
}

fn set_rank_op(store: &ThoughtStore, id: ThoughtId, after: Rank, now: Timestamp) -> PatchOp {
    let (before, updated_before) = store
        .thought(&id)
        .map_or((Rank::default(), Timestamp::default()), |t| {
            (t.rank, t.last_updated)
        });
    PatchOp::SetRank {
        id,
        before,
        after,
        updated_before,
        updated_after: now,
    }
}

/// Rank for inserting directly after `after` among `parent`'s children
/// (or at the end with `after = None`), plus the rebalance ops needed when
/// the midpoint between neighbors is exhausted.
fn rank_for_insert(
    store: &ThoughtStore,
    parent: &ThoughtId,
    after: Option<ThoughtId>,
    now: Timestamp,
) -> Result<(Vec<PatchOp>, Rank), CommandError> {
    let Some(after) = after else {
        return Ok((Vec::new(), store.append_rank(parent)));
    };
    let siblings = store.children(parent).to_vec();
    let pos = siblings
        .iter()
        .position(|s| *s == after)
        .ok_or(CommandError::NotFound)?;
    let rank_of = |id: &ThoughtId| store.thought(id).map_or_else(Rank::default, |t| t.rank);
    let prev_rank = rank_of(&after);
    match siblings.get(pos + 1) {
        None => Ok((
            Vec::new(),
            Rank::from_raw(prev_rank.value().saturating_add(RANK_GAP)),
        )),
        Some(next) => {
            let next_rank = rank_of(next);
            if let Some(mid) = prev_rank.midpoint(next_rank) {
                return Ok((Vec::new(), mid));
            }
            // Midpoint exhausted: renumber the whole run, then split the
            // fresh gap after `pos`. The rebalance rides in the same patch,
            // so the step stays atomic and undoable.
            let mut ops = Vec::with_capacity(siblings.len());
            for (i, sib) in siblings.iter().enumerate() {
                let n = i64::try_from(i).unwrap_or(i64::MAX);
                ops.push(set_rank_op(store, *sib, Rank::nth(n), now));
            }
            let n = i64::try_from(pos).unwrap_or(i64::MAX);
            let rank = Rank::from_raw(Rank::nth(n).value().saturating_add(RANK_GAP / 2));
            Ok((ops, rank))
        }
    }
}

fn create_op(
    id: ThoughtId,
    parent: ThoughtId,
    value: &str,
    rank: Rank,
    now: Timestamp,
) -> PatchOp {
    PatchOp::CreateThought {
        id,
        parent,
        value: value.to_owned(),
        rank,
        updated: now,
        archived: false,
    }
}

fn delete_subtree_ops(store: &ThoughtStore, id: &ThoughtId) -> Vec<PatchOp> {
    store
        .subtree_postorder(id)
        .into_iter()
        .filter_map(|tid| {
            store.thought(&tid).map(|t| PatchOp::DeleteThought {
                id: tid,
                parent: t.parent,
                value: t.value.clone(),
                rank: t.rank,
                updated: t.last_updated,
                archived: t.archived,
            })
        })
        .collect()
}

/// Cursor landing spot after removing `id` from under its parent: the next
/// visible sibling, else the previous, else the parent, else nothing.
fn landing_after_removal(state: &AppState, id: &ThoughtId) -> Option<Path> {
    let store = state.store();
    let sp = structural_path(store, id)?;
    let parent_path = sp.as_path().parent();
    let parent_id = store.thought(id).map(|t| t.parent)?;
    let siblings = visible_child_ids(store, &parent_id);
    let idx = siblings.iter().position(|s| s == id)?;
    let neighbor = siblings.get(idx + 1).or_else(|| idx.checked_sub(1).and_then(|i| siblings.get(i)));
    match neighbor {
        Some(n) => Some(parent_path.map_or_else(|| Path::from_id(*n), |p| p.child(*n))),
        None => parent_path,
    }
}

fn build_new_thought(
    state: &mut AppState,
    parent: Option<&Path>,
    value: &str,
    now: Timestamp,
) -> Result<Built, CommandError> {
    single_line(value)?;
    let parent_id = match parent {
        None => state.store().root(),
        Some(p) => {
            let id = resolve_thought(state, p)?;
            guard_parent(state.store(), &id)?;
            id
        }
    };
    let rank = state.store().append_rank(&parent_id);
    let id = state.store_mut().mint_id();
    let cursor = parent.map_or_else(|| Path::from_id(id), |p| p.child(id));
    Ok(Built {
        name: "thought/new",
        ops: vec![create_op(id, parent_id, value, rank, now)],
        cursor_after: Some(Some(cursor.clone())),
        edit_point: Some(cursor),
        navigation: false,
        dispensable: false,
    })
}

pub(crate) fn build_new_sibling(
    state: &mut AppState,
    after: &Path,
    value: &str,
    now: Timestamp,
) -> Result<Built, CommandError> {
    single_line(value)?;
    let store = state.store();
    let sp = simplify_path(store, state.context_views(), after).ok_or(CommandError::NotFound)?;
    let anchor = sp.as_path().last();
    let parent_id = store
        .thought(&anchor)
        .map(|t| t.parent)
        .ok_or(CommandError::NotFound)?;
    guard_parent(store, &parent_id)?;
    let (mut ops, rank) = rank_for_insert(store, &parent_id, Some(anchor), now)?;
    let id = state.store_mut().mint_id();
    ops.push(create_op(id, parent_id, value, rank, now));
    let cursor = sp
        .as_path()
        .parent()
        .map_or_else(|| Path::from_id(id), |p| p.child(id));
    Ok(Built {
        name: "thought/new_sibling",
        ops,
        cursor_after: Some(Some(cursor.clone())),
        edit_point: Some(cursor),
        navigation: false,
        dispensable: false,
    })
}

fn build_edit(
    state: &AppState,
    path: &Path,
    value: &str,
    now: Timestamp,
) -> Result<Built, CommandError> {
    single_line(value)?;
    let id = resolve_thought(state, path)?;
    guard_editable(state.store(), &id)?;
    let t = state.store().thought(&id).ok_or(CommandError::NotFound)?;
    if t.value == value {
        return Ok(Built::noop("thought/edit"));
    }
    Ok(Built {
        name: "thought/edit",
        ops: vec![PatchOp::SetValue {
            id,
            before: t.value.clone(),
            after: value.to_owned(),
            updated_before: t.last_updated,
            updated_after: now,
        }],
        cursor_after: Some(Some(path.clone())),
        edit_point: Some(path.clone()),
        navigation: false,
        dispensable: false,
    })
}

fn build_move(
    state: &AppState,
    path: &Path,
    new_parent: Option<&Path>,
    now: Timestamp,
) -> Result<Built, CommandError> {
    let id = resolve_thought(state, path)?;
    guard_editable(state.store(), &id)?;
    let np = match new_parent {
        None => state.store().root(),
        Some(p) => {
            let np = resolve_thought(state, p)?;
            guard_parent(state.store(), &np)?;
            np
        }
    };
    if np == id || state.store().is_descendant(&np, &id) {
        return Err(CommandError::CyclicMove);
    }
    let t = state.store().thought(&id).ok_or(CommandError::NotFound)?;
    let rank = state.store().append_rank(&np);
    let cursor = new_parent.map_or_else(|| Path::from_id(id), |p| p.child(id));
    Ok(Built {
        name: "thought/move",
        ops: vec![PatchOp::SetParent {
            id,
            parent_before: t.parent,
            rank_before: t.rank,
            parent_after: np,
            rank_after: rank,
            updated_before: t.last_updated,
            updated_after: now,
        }],
        cursor_after: Some(Some(cursor.clone())),
        edit_point: Some(cursor),
        navigation: false,
        dispensable: false,
    })
}

pub(crate) fn build_move_vertical(
    state: &mut AppState,
    path: &Path,
    delta: isize,
    now: Timestamp,
) -> Result<Built, CommandError> {
    let store = state.store();
    let sp = simplify_path(store, state.context_views(), path).ok_or(CommandError::NotFound)?;
    let id = sp.as_path().last();
    guard_editable(store, &id)?;
    let parent_id = store
        .thought(&id)
        .map(|t| t.parent)
        .ok_or(CommandError::NotFound)?;
    if sort_preference(store, &parent_id) != SortPreference::Manual {
        return Err(CommandError::InvalidCommand(
            "cannot reorder inside a sorted context",
        ));
    }
    let siblings = visible_child_ids(store, &parent_id);
    let idx = siblings
        .iter()
        .position(|s| *s == id)
        .ok_or(CommandError::NotFound)?;
    let neighbor_idx = idx.checked_add_signed(delta);
    let Some(neighbor) = neighbor_idx.and_then(|i| siblings.get(i)).copied() else {
        // Already at the edge of its sibling run.
        return Ok(Built::noop(if delta < 0 {
            "thought/move_up"
        } else {
            "thought/move_down"
        }));
    };
    let rank_of = |tid: &ThoughtId| store.thought(tid).map_or_else(Rank::default, |t| t.rank);
    let (ra, rb) = (rank_of(&id), rank_of(&neighbor));
    let ops = vec![
        set_rank_op(store, id, rb, now),
        set_rank_op(store, neighbor, ra, now),
    ];
    Ok(Built {
        name: if delta < 0 {
            "thought/move_up"
        } else {
            "thought/move_down"
        },
        ops,
        cursor_after: Some(Some(path.clone())),
        edit_point: Some(path.clone()),
        navigation: false,
        dispensable: false,
    })
}

pub(crate) fn build_indent(
    state: &mut AppState,
    path: &Path,
    now: Timestamp,
) -> Result<Built, CommandError> {
    let store = state.store();
    let sp = simplify_path(store, state.context_views(), path).ok_or(CommandError::NotFound)?;
    let id = sp.as_path().last();
    guard_editable(store, &id)?;
    let t = store.thought(&id).ok_or(CommandError::NotFound)?;
    let siblings = visible_child_ids(store, &t.parent);
    let idx = siblings
        .iter()
        .position(|s| *s == id)
        .ok_or(CommandError::NotFound)?;
    let Some(prev) = idx.checked_sub(1).and_then(|i| siblings.get(i)).copied() else {
        return Err(CommandError::InvalidCommand(
            "cannot indent the first sibling",
        ));
    };
    guard_parent(store, &prev)?;
    let rank = store.append_rank(&prev);
    let ops = vec![PatchOp::SetParent {
        id,
        parent_before: t.parent,
        rank_before: t.rank,
        parent_after: prev,
        rank_after: rank,
        updated_before: t.last_updated,
        updated_after: now,
    }];
    let cursor = sp
        .as_path()
        .parent()
        .map_or_else(|| Path::from_id(prev), |p| p.child(prev))
        .child(id);
    Ok(Built {
        name: "thought/indent",
        ops,
        cursor_after: Some(Some(cursor.clone())),
        edit_point: Some(cursor),
        navigation: false,
        dispensable: false,
    })
}

pub(crate) fn build_outdent(
    state: &mut AppState,
    path: &Path,
    now: Timestamp,
) -> Result<Built, CommandError> {
    let store = state.store();
    let sp = simplify_path(store, state.context_views(), path).ok_or(CommandError::NotFound)?;
    if sp.as_path().depth() < 2 {
        return Err(CommandError::InvalidCommand(
            "cannot outdent a root-level thought",
        ));
    }
    let id = sp.as_path().last();
    guard_editable(store, &id)?;
    let t = store.thought(&id).ok_or(CommandError::NotFound)?;
    let parent_id = t.parent;
    let grandparent = store
        .thought(&parent_id)
        .map(|p| p.parent)
        .ok_or(CommandError::NotFound)?;
    let (mut ops, rank) = rank_for_insert(store, &grandparent, Some(parent_id), now)?;
    ops.push(PatchOp::SetParent {
        id,
        parent_before: parent_id,
        rank_before: t.rank,
        parent_after: grandparent,
        rank_after: rank,
        updated_before: t.last_updated,
        updated_after: now,
    });
    let cursor = sp
        .as_path()
        .parent()
        .and_then(|p| p.parent())
        .map_or_else(|| Path::from_id(id), |gp| gp.child(id));
    Ok(Built {
        name: "thought/outdent",
        ops,
        cursor_after: Some(Some(cursor.clone())),
        edit_point: Some(cursor),
        navigation: false,
        dispensable: false,
    })
}

pub(crate) fn build_delete(
    state: &mut AppState,
    path: &Path,
    _now: Timestamp,
) -> Result<Built, CommandError> {
    let id = resolve_thought(state, path)?;
    guard_editable(state.store(), &id)?;
    let landing = landing_after_removal(state, &id);
    let ops = delete_subtree_ops(state.store(), &id);
    let edit_point = structural_path(state.store(), &id).and_then(|sp| sp.as_path().parent());
    Ok(Built {
        name: "thought/delete",
        ops,
        cursor_after: Some(landing),
        edit_point,
        navigation: false,
        dispensable: false,
    })
}

pub(crate) fn build_archive(
    state: &mut AppState,
    path: &Path,
    now: Timestamp,
) -> Result<Built, CommandError> {
    let id = resolve_thought(state, path)?;
    guard_editable(state.store(), &id)?;
    let t = state
        .store()
        .thought(&id)
        .cloned()
        .ok_or(CommandError::NotFound)?;
    let landing = landing_after_removal(state, &id);
    let mut ops = Vec::new();
    let (container, container_rank_base) =
        match state.store().child_by_value(&t.parent, ATTR_ARCHIVE) {
            Some(c) => (c, state.store().append_rank(&c)),
            None => {
                let rank = state.store().append_rank(&t.parent);
                let c = state.store_mut().mint_id();
                ops.push(create_op(c, t.parent, ATTR_ARCHIVE, rank, now));
                (c, Rank::nth(0))
            }
        };
    ops.push(PatchOp::SetParent {
        id,
        parent_before: t.parent,
        rank_before: t.rank,
        parent_after: container,
        rank_after: container_rank_base,
        updated_before: t.last_updated,
        updated_after: now,
    });
    ops.push(PatchOp::SetArchived {
        id,
        before: t.archived,
        after: true,
        updated_before: now,
        updated_after: now,
    });
    let edit_point = structural_path(state.store(), &id).and_then(|sp| sp.as_path().parent());
    Ok(Built {
        name: "thought/archive",
        ops,
        cursor_after: Some(landing),
        edit_point,
        navigation: false,
        dispensable: false,
    })
}

fn build_set_sort(
    state: &mut AppState,
    path: Option<&Path>,
    preference: SortPreference,
    now: Timestamp,
) -> Result<Built, CommandError> {
    let target = match path {
        None => state.store().root(),
        Some(p) => {
            let id = resolve_thought(state, p)?;
            guard_editable(state.store(), &id)?;
            id
        }
    };
    if sort_preference(state.store(), &target) == preference {
        return Ok(Built::noop("thought/set_sort"));
    }
    let mut ops = Vec::new();
    if let Some(existing) = state.store().child_by_value(&target, ATTR_SORT) {
        ops.extend(delete_subtree_ops(state.store(), &existing));
    }
    if let SortPreference::Alphabetical(dir) = preference {
        let rank = state.store().append_rank(&target);
        let attr = state.store_mut().mint_id();
        let kind = state.store_mut().mint_id();
        ops.push(create_op(attr, target, ATTR_SORT, rank, now));
        ops.push(create_op(kind, attr, "Alphabetical", Rank::nth(0), now));
        if dir == SortDirection::Desc {
            let d = state.store_mut().mint_id();
            ops.push(create_op(d, kind, "Desc", Rank::nth(0), now));
        }
    }
    Ok(Built {
        edit_point: path.cloned(),
        ..Built::structural("thought/set_sort", ops)
    })
}

fn build_toggle_context_view(state: &AppState, path: &Path) -> Result<Built, CommandError> {
    if thought_at(state.store(), state.context_views(), path).is_none() {
        // A stale toggle is a no-op, never an error.
        return Ok(Built::noop("view/toggle_context"));
    }
    // Not a pure navigation command: the view flag is observable state, so
    // the toggle stands as its own undo step instead of merging into the
    // previous one.
    Ok(Built {
        name: "view/toggle_context",
        ops: vec![PatchOp::ToggleContextView { id: path.last() }],
        cursor_after: Some(Some(path.clone())),
        edit_point: None,
        navigation: false,
        dispensable: false,
    })
}

fn build_set_cursor(state: &AppState, path: Option<&Path>) -> Result<Built, CommandError> {
    if let Some(p) = path {
        if thought_at(state.store(), state.context_views(), p).is_none() {
            // The UI may race an async load; a stale focus is a no-op.
            return Ok(Built::noop("view/set_cursor"));
        }
    }
    Ok(Built {
        name: "view/set_cursor",
        ops: Vec::new(),
        cursor_after: Some(path.cloned()),
        edit_point: None,
        navigation: true,
        dispensable: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(state: &mut AppState, parent: &ThoughtId, value: &str, rank: i64) -> ThoughtId {
        match state.store_mut().create_thought(
            parent,
            value,
            Rank::from_raw(rank),
            Timestamp::from_raw(1),
        ) {
            Ok(id) => id,
            Err(e) => panic!("seed failed: {e}"),
        }
    }

    #[test]
    fn insertion_rebalances_when_the_midpoint_is_exhausted() {
        let mut state = AppState::new();
        let root = state.store().root();
        // Adjacent raw ranks leave no midpoint.
        let a = seed(&mut state, &root, "a", 0);
        let _b = seed(&mut state, &root, "b", 1);
        let now = Timestamp::from_raw(2);
        match rank_for_insert(state.store(), &root, Some(a), now) {
            Ok((ops, rank)) => {
                assert_eq!(ops.len(), 2, "both siblings renumber");
                assert!(Rank::nth(0) < rank && rank < Rank::nth(1));
            }
            Err(e) => panic!("rank insertion failed: {e}"),
        }
    }

    #[test]
    fn insertion_between_spaced_siblings_needs_no_rebalance() {
        let mut state = AppState::new();
        let root = state.store().root();
        let a = seed(&mut state, &root, "a", Rank::nth(0).value());
        let _b = seed(&mut state, &root, "b", Rank::nth(1).value());
        match rank_for_insert(state.store(), &root, Some(a), Timestamp::from_raw(2)) {
            Ok((ops, rank)) => {
                assert!(ops.is_empty());
                assert!(Rank::nth(0) < rank && rank < Rank::nth(1));
            }
            Err(e) => panic!("rank insertion failed: {e}"),
        }
    }
}
