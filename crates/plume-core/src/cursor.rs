// SPDX-License-Identifier: Apache-2.0
//! Cursor navigation over document order.
//!
//! Document order is the in-order flattening of the visible tree, context
//! views flattened as ordinary children. Both directions are pure reads:
//! they return the next cursor path and never mutate state (the caller
//! commits the move through the `SetCursor` command).
//!
//! Under the cursor-follows-expansion model only the cursor chain is
//! expanded, so the next visible thought is either the cursor's first child,
//! its next sibling, or the next sibling of the nearest ancestor — crossing
//! context-view levels before structural ones, because context entries *are*
//! the siblings at a context-view level.

use crate::path::Path;
use crate::state::AppState;
use crate::view::visible_children_of;

/// Position of `path` among the visible children of its parent.
fn sibling_index(state: &AppState, path: &Path) -> (Vec<Path>, Option<usize>) {
    let base = path.parent();
    let siblings = visible_children_of(state, base.as_ref());
    let idx = siblings.iter().position(|s| s.last() == path.last());
    (siblings, idx)
}

/// Next thought in document order, or the first root thought when nothing is
/// focused.
///
/// Returns `None` only for an empty document. At the last visible thought
/// the cursor is unchanged (boundary idempotence).
#[must_use]
pub fn cursor_down(state: &AppState) -> Option<Path> {
    let Some(cursor) = state.cursor() else {
        return visible_children_of(state, None).into_iter().next();
    };
    if let Some(first) = visible_children_of(state, Some(cursor)).into_iter().next() {
        return Some(first);
    }
    let mut probe = cursor.clone();
    loop {
        let (siblings, idx) = sibling_index(state, &probe);
        if let Some(next) = idx.and_then(|i| siblings.get(i + 1)) {
            return Some(next.clone());
        }
        match probe.parent() {
            Some(up) => probe = up,
            None => return Some(cursor.clone()),
        }
    }
}

/// Previous thought in document order, or the last root thought when nothing
/// is focused.
///
/// Returns `None` only for an empty document. At the first visible thought
/// the cursor is unchanged (boundary idempotence). The previous sibling is
/// collapsed under the cursor-follows-expansion model, so its deepest
/// visible descendant is itself.
#[must_use]
pub fn cursor_up(state: &AppState) -> Option<Path> {
    let Some(cursor) = state.cursor() else {
        return visible_children_of(state, None).into_iter().next_back();
    };
    let (siblings, idx) = sibling_index(state, cursor);
    match idx {
        Some(i) if i > 0 => siblings.get(i - 1).cloned(),
        _ => match cursor.parent() {
            Some(up) => Some(up),
            None => Some(cursor.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::ThoughtId;
    use crate::store::ThoughtStore;
    use crate::thought::{Rank, Timestamp};

    fn mk(store: &mut ThoughtStore, parent: &ThoughtId, value: &str, n: i64) -> ThoughtId {
        store
            .create_thought(parent, value, Rank::nth(n), Timestamp::from_raw(1))
            .unwrap_or_else(|e| panic!("create failed: {e}"))
    }

    #[test]
    fn down_moves_between_root_siblings() {
        let mut state = AppState::new();
        let root = state.store().root();
        let a = mk(state.store_mut(), &root, "a", 0);
        let b = mk(state.store_mut(), &root, "b", 1);

        assert_eq!(cursor_down(&state), Some(Path::from_id(a)));
        state.set_cursor_raw(Some(Path::from_id(a)));
        assert_eq!(cursor_down(&state), Some(Path::from_id(b)));
        state.set_cursor_raw(Some(Path::from_id(b)));
        // Boundary: unchanged.
        assert_eq!(cursor_down(&state), Some(Path::from_id(b)));
    }

    #[test]
    fn up_mirrors_down_at_boundaries() {
        let mut state = AppState::new();
        let root = state.store().root();
        let a = mk(state.store_mut(), &root, "a", 0);
        let b = mk(state.store_mut(), &root, "b", 1);

        assert_eq!(cursor_up(&state), Some(Path::from_id(b)));
        state.set_cursor_raw(Some(Path::from_id(b)));
        assert_eq!(cursor_up(&state), Some(Path::from_id(a)));
        state.set_cursor_raw(Some(Path::from_id(a)));
        assert_eq!(cursor_up(&state), Some(Path::from_id(a)));
    }

    #[test]
    fn down_descends_into_the_cursor_subtree() {
        let mut state = AppState::new();
        let root = state.store().root();
        let a = mk(state.store_mut(), &root, "a", 0);
        let x = mk(state.store_mut(), &a, "x", 0);
        let b = mk(state.store_mut(), &root, "b", 1);

        state.set_cursor_raw(Some(Path::from_id(a)));
        let ax = Path::from_id(a).child(x);
        assert_eq!(cursor_down(&state), Some(ax.clone()));
        state.set_cursor_raw(Some(ax));
        // Leaf: bubble to the next root sibling.
        assert_eq!(cursor_down(&state), Some(Path::from_id(b)));
    }

    #[test]
    fn up_from_first_child_goes_to_parent() {
        let mut state = AppState::new();
        let root = state.store().root();
        let a = mk(state.store_mut(), &root, "a", 0);
        let x = mk(state.store_mut(), &a, "x", 0);

        state.set_cursor_raw(Some(Path::from_id(a).child(x)));
        assert_eq!(cursor_up(&state), Some(Path::from_id(a)));
    }
}
