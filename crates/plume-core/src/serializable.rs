// SPDX-License-Identifier: Apache-2.0
//! Persisted state shape (`serde` feature).
//!
//! The shape is conceptual, not bit-exact: pair it with a deterministic
//! encoder (plume-doc's CBOR codec) for stable on-disk bytes. The lexeme
//! index is derived data and is deliberately not persisted; it is rebuilt
//! exactly while replaying thought records on restore.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::History;
use crate::ident::{PathHash, ThoughtId};
use crate::patch::UndoPatch;
use crate::path::Path;
use crate::state::{AppState, EngineOptions};
use crate::store::StoreError;
use crate::thought::{Thought, Timestamp};

/// Error returned when a persisted state cannot be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RestoreError {
    /// Some thought's parent chain never reaches the root.
    #[error("persisted thought graph does not link up")]
    BrokenTopology,
    /// A record was rejected by the store while replaying.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Flat, serializable capture of the engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableState {
    /// Every thought record, the root included, keyed by id.
    pub thoughts: Vec<(ThoughtId, Thought)>,
    /// Focused path, if any.
    pub cursor: Option<Path>,
    /// Thoughts toggled into context view.
    pub context_views: Vec<ThoughtId>,
    /// Undo stack, oldest first.
    pub undo_patches: Vec<UndoPatch>,
    /// Redo stack, oldest first.
    pub redo_patches: Vec<UndoPatch>,
    /// Multicursor selection.
    pub multicursors: Vec<(PathHash, Path)>,
    /// Logical tick at capture time.
    pub tick: Timestamp,
    /// Mint sequence, so a restored store keeps minting fresh ids.
    pub mint_seq: u64,
}

impl From<&AppState> for SerializableState {
    fn from(state: &AppState) -> Self {
        Self {
            thoughts: state
                .store()
                .iter_thoughts()
                .map(|(id, t)| (*id, t.clone()))
                .collect(),
            cursor: state.cursor().cloned(),
            context_views: state.context_views().iter().copied().collect(),
            undo_patches: state.history().undo_stack().to_vec(),
            redo_patches: state.history().redo_stack().to_vec(),
            multicursors: state
                .multicursors()
                .iter()
                .map(|(h, p)| (*h, p.clone()))
                .collect(),
            tick: state.tick(),
            mint_seq: state.store().mint_seq(),
        }
    }
}

impl SerializableState {
    /// Rebuilds a live state, replaying thought records parents-first so the
    /// lexeme index and child buckets come out exactly consistent.
    pub fn restore(self, options: EngineOptions) -> Result<AppState, RestoreError> {
        let mut state = AppState::with_options(options);
        let root = state.store().root();
        let mut pending: Vec<(ThoughtId, Thought)> = self
            .thoughts
            .into_iter()
            .filter(|(id, _)| *id != root)
            .collect();
        while !pending.is_empty() {
            let mut next = Vec::with_capacity(pending.len());
            let mut progressed = false;
            for (id, t) in pending {
                if state.store().contains(&t.parent) {
                    state.store_mut().create_with_id(
                        id,
                        &t.parent,
                        &t.value,
                        t.rank,
                        t.last_updated,
                        t.archived,
                    )?;
                    progressed = true;
                } else {
                    next.push((id, t));
                }
            }
            if !progressed {
                return Err(RestoreError::BrokenTopology);
            }
            pending = next;
        }
        state.set_cursor_raw(self.cursor);
        let views: BTreeSet<ThoughtId> = self.context_views.into_iter().collect();
        for id in views {
            state.toggle_context_view_raw(id);
        }
        state.set_history_raw(History::from_parts(
            self.undo_patches,
            self.redo_patches,
            state.options().jump_capacity,
        ));
        for (_, path) in self.multicursors {
            state.add_multicursor_raw(path);
        }
        state.store_mut().set_mint_seq(self.mint_seq);
        state.set_tick_raw(self.tick);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{apply, Command};

    #[test]
    fn capture_restore_round_trips_the_observable_state() {
        let mut state = AppState::new();
        for value in ["a", "b"] {
            let outcome = apply(
                &mut state,
                Command::NewThought {
                    parent: None,
                    value: value.into(),
                },
            );
            assert!(outcome.is_ok());
        }
        let captured = SerializableState::from(&state);
        let restored = match captured.restore(state.options()) {
            Ok(s) => s,
            Err(e) => panic!("restore failed: {e}"),
        };
        assert_eq!(restored.observable_hash(), state.observable_hash());
        assert_eq!(restored.store().mint_seq(), state.store().mint_seq());
        assert_eq!(
            restored.history().undo_depth(),
            state.history().undo_depth()
        );
        assert!(restored.store().validate().is_ok());
    }
}
