// SPDX-License-Identifier: Apache-2.0
//! The application state aggregate and engine options.
//!
//! There is no hidden singleton: the whole document engine is this one
//! value, threaded explicitly through commands. Everything a command
//! mutates lives here, and the store/lexeme pair is only ever written
//! through the store's own operations.

use std::collections::{BTreeMap, BTreeSet};

use blake3::Hasher;

use crate::alert::AlertQueue;
use crate::history::History;
use crate::ident::{Hash, PathHash, ThoughtId};
use crate::path::Path;
use crate::store::ThoughtStore;
use crate::thought::Timestamp;

/// Tunable engine limits.
///
/// A plain value with workable defaults; loading these from disk (or
/// anywhere else) is the caller's concern, never the core's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineOptions {
    /// Maximum number of jump-to-edit entries.
    pub jump_capacity: usize,
    /// Maximum number of queued alerts.
    pub alert_capacity: usize,
    /// Alert time-to-live, in ticks.
    pub alert_ttl: u64,
    /// Alert dedupe window, in ticks.
    pub alert_dedupe_window: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            jump_capacity: 64,
            alert_capacity: 8,
            alert_ttl: 32,
            alert_dedupe_window: 4,
        }
    }
}

/// The complete engine state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppState {
    store: ThoughtStore,
    cursor: Option<Path>,
    context_views: BTreeSet<ThoughtId>,
    history: History,
    multicursors: BTreeMap<PathHash, Path>,
    alerts: AlertQueue,
    tick: Timestamp,
    options: EngineOptions,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates a state holding only the root thought.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Creates a state with explicit options.
    #[must_use]
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            store: ThoughtStore::new(),
            cursor: None,
            context_views: BTreeSet::new(),
            history: History::new(options.jump_capacity),
            multicursors: BTreeMap::new(),
            alerts: AlertQueue::new(
                options.alert_capacity,
                options.alert_ttl,
                options.alert_dedupe_window,
            ),
            tick: Timestamp::default(),
            options,
        }
    }

    /// The thought graph store.
    #[must_use]
    pub fn store(&self) -> &ThoughtStore {
        &self.store
    }

    /// The currently focused path, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&Path> {
        self.cursor.as_ref()
    }

    /// The set of thoughts toggled into context view.
    #[must_use]
    pub fn context_views(&self) -> &BTreeSet<ThoughtId> {
        &self.context_views
    }

    /// The undo/redo/jump history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The multicursor selection, keyed by path hash.
    #[must_use]
    pub fn multicursors(&self) -> &BTreeMap<PathHash, Path> {
        &self.multicursors
    }

    /// The alert queue.
    #[must_use]
    pub fn alerts(&self) -> &AlertQueue {
        &self.alerts
    }

    /// The current logical tick.
    #[must_use]
    pub fn tick(&self) -> Timestamp {
        self.tick
    }

    /// The engine options this state was built with.
    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Canonical hash over the observable state: store contents, cursor, and
    /// context views. Ephemeral fields (alerts, selection, history) are
    /// excluded by design.
    #[must_use]
    pub fn observable_hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(b"PLUME_OBSERVABLE_V1\0");
        hasher.update(&self.store.canonical_state_hash());
        match &self.cursor {
            None => {
                hasher.update(&[0]);
            }
            Some(path) => {
                hasher.update(&[1]);
                hasher.update(&(path.depth() as u64).to_le_bytes());
                for id in path.ids() {
                    hasher.update(&id.0);
                }
            }
        }
        hasher.update(&(self.context_views.len() as u64).to_le_bytes());
        for id in &self.context_views {
            hasher.update(&id.0);
        }
        *hasher.finalize().as_bytes()
    }

    pub(crate) fn store_mut(&mut self) -> &mut ThoughtStore {
        &mut self.store
    }

    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub(crate) fn alerts_mut(&mut self) -> &mut AlertQueue {
        &mut self.alerts
    }

    pub(crate) fn set_cursor_raw(&mut self, cursor: Option<Path>) {
        self.cursor = cursor;
    }

    pub(crate) fn toggle_context_view_raw(&mut self, id: ThoughtId) {
        if !self.context_views.remove(&id) {
            self.context_views.insert(id);
        }
    }

    pub(crate) fn add_multicursor_raw(&mut self, path: Path) {
        self.multicursors.insert(path.path_hash(), path);
    }

    pub(crate) fn clear_multicursors_raw(&mut self) {
        self.multicursors.clear();
    }

    pub(crate) fn advance_tick(&mut self) -> Timestamp {
        self.tick = self.tick.next();
        self.tick
    }

    #[cfg(feature = "serde")]
    pub(crate) fn set_tick_raw(&mut self, tick: Timestamp) {
        self.tick = tick;
    }

    #[cfg(feature = "serde")]
    pub(crate) fn set_history_raw(&mut self, history: History) {
        self.history = history;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::make_thought_id;

    #[test]
    fn observable_hash_ignores_alerts() {
        let mut a = AppState::new();
        let b = a.clone();
        a.alerts_mut().push(
            crate::alert::AlertKind::BatchEmpty,
            "nothing to do",
            Timestamp::from_raw(1),
        );
        assert_eq!(a.observable_hash(), b.observable_hash());
    }

    #[test]
    fn observable_hash_sees_cursor_and_views() {
        let mut a = AppState::new();
        let b = a.clone();
        a.toggle_context_view_raw(make_thought_id("x"));
        assert_ne!(a.observable_hash(), b.observable_hash());

        let mut c = b.clone();
        c.set_cursor_raw(Some(Path::from_id(make_thought_id("x"))));
        assert_ne!(c.observable_hash(), b.observable_hash());
    }

    #[test]
    fn toggling_twice_restores_the_view_set() {
        let mut state = AppState::new();
        let id = make_thought_id("x");
        state.toggle_context_view_raw(id);
        assert!(state.context_views().contains(&id));
        state.toggle_context_view_raw(id);
        assert!(!state.context_views().contains(&id));
    }
}
