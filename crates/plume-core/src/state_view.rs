// SPDX-License-Identifier: Apache-2.0
//! Read-only selector facade over [`AppState`].
//!
//! [`StateView`] exposes only query methods, enforcing read-only access at
//! compile time. External consumers (renderers, exporters, input handlers)
//! observe through this type and mutate only through the command boundary.
//!
//! Do **not** add any of the following to this type: `Deref` to `AppState`,
//! `into_inner()`/`as_inner()`, anything returning `&AppState` or
//! `&mut AppState`, or interior mutability. The view is the read-only
//! capability; commands are the write capability.

use std::collections::BTreeMap;

use crate::context_view::{context_entries, is_context_view_active, ContextEntry};
use crate::ident::{PathHash, ThoughtId};
use crate::lexeme::Lexeme;
use crate::path::{
    self, simplify_path, thought_at, Context, Path, SimplePath,
};
use crate::state::AppState;
use crate::thought::{Thought, Timestamp};
use crate::view::{sort_preference, visible_child_ids, visible_children_of, SortPreference};

/// Read-only view over the whole engine state.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a AppState,
}

impl<'a> StateView<'a> {
    /// Creates a new read-only view.
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// The distinguished root id.
    #[must_use]
    pub fn root(&self) -> ThoughtId {
        self.state.store().root()
    }

    /// Looks up a thought by id.
    #[must_use]
    pub fn thought(&self, id: &ThoughtId) -> Option<&'a Thought> {
        self.state.store().thought(id)
    }

    /// Structural children of a thought in `(rank, id)` order.
    #[must_use]
    pub fn children(&self, id: &ThoughtId) -> &'a [ThoughtId] {
        self.state.store().children(id)
    }

    /// Visible (attribute-filtered, sorted) children of a thought.
    #[must_use]
    pub fn visible_children(&self, id: &ThoughtId) -> Vec<ThoughtId> {
        visible_child_ids(self.state.store(), id)
    }

    /// Lexeme entry for a display value.
    #[must_use]
    pub fn lexeme(&self, value: &str) -> Option<&'a Lexeme> {
        self.state.store().lexeme(value)
    }

    /// The currently focused path, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&'a Path> {
        self.state.cursor()
    }

    /// The multicursor selection.
    #[must_use]
    pub fn multicursors(&self) -> &'a BTreeMap<PathHash, Path> {
        self.state.multicursors()
    }

    /// The current logical tick.
    #[must_use]
    pub fn tick(&self) -> Timestamp {
        self.state.tick()
    }

    /// The thought a path points at, across context-view boundaries.
    #[must_use]
    pub fn thought_at(&self, p: &Path) -> Option<ThoughtId> {
        thought_at(self.state.store(), self.state.context_views(), p)
    }

    /// Maps a path to its value chain.
    #[must_use]
    pub fn path_to_context(&self, p: &Path) -> Option<Context> {
        path::path_to_context(self.state.store(), p)
    }

    /// Resolves a value chain to a structural path, first match wins.
    #[must_use]
    pub fn context_to_path(&self, context: &Context) -> Option<SimplePath> {
        path::context_to_path(self.state.store(), context)
    }

    /// Simplifies a path to the structural path of its target.
    #[must_use]
    pub fn simplify(&self, p: &Path) -> Option<SimplePath> {
        simplify_path(self.state.store(), self.state.context_views(), p)
    }

    /// Whether the context view is active (toggled and not suppressed) at a
    /// location.
    #[must_use]
    pub fn is_context_view_active(&self, p: &Path) -> bool {
        is_context_view_active(self.state.store(), self.state.context_views(), p)
    }

    /// Context entries for the thought at a location.
    #[must_use]
    pub fn context_entries(&self, p: &Path) -> Vec<ContextEntry> {
        context_entries(self.state.store(), self.state.context_views(), p)
    }

    /// Visible children of a location (`None` = root level) as paths,
    /// context views flattened.
    #[must_use]
    pub fn visible_children_at(&self, base: Option<&Path>) -> Vec<Path> {
        visible_children_of(self.state, base)
    }

    /// Effective child ordering of a thought.
    #[must_use]
    pub fn sort_preference(&self, id: &ThoughtId) -> SortPreference {
        sort_preference(self.state.store(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: `StateView` must be exactly one pointer wide.
    ///
    /// This keeps it a cheap pass-by-value type (`Copy`). If someone adds
    /// extra fields, this test will fail.
    #[test]
    fn state_view_is_pointer_sized() {
        use core::mem::size_of;
        assert_eq!(size_of::<StateView<'_>>(), size_of::<*const ()>());
    }

    /// Invariant: `StateView` must be `Sync` (renderers share it).
    #[test]
    fn state_view_is_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<StateView<'_>>();
    }

    /// Invariant: `StateView` must be `Send`.
    #[test]
    fn state_view_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<StateView<'_>>();
    }

    #[test]
    fn state_view_provides_read_only_access() {
        let state = AppState::new();
        let view = StateView::new(&state);
        assert_eq!(view.root(), state.store().root());
        assert!(view.thought(&view.root()).is_some());
        assert!(view.cursor().is_none());
        assert!(view.lexeme("missing").is_none());
    }
}
