// SPDX-License-Identifier: Apache-2.0
//! Document view resolution: sort preferences, attribute filtering, and the
//! visible-children listing that cursor navigation and export flatten.

use core::cmp::Ordering;

use crate::context_view::{context_entries, is_context_view_active};
use crate::ident::ThoughtId;
use crate::lexeme::normalize;
use crate::path::{thought_at, Path};
use crate::state::AppState;
use crate::store::ThoughtStore;
use crate::thought::{is_attribute_value, Rank, ATTR_SORT};

/// Direction of an alphabetical sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    /// Ascending (the default when `=sort` names no direction).
    Asc,
    /// Descending.
    Desc,
}

/// Effective child ordering of a thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortPreference {
    /// Manual `(rank, id)` order.
    Manual,
    /// Case-sensitive lexicographic order on value; rank breaks ties between
    /// equal values.
    Alphabetical(SortDirection),
}

/// Reads the sort preference from a thought's `=sort` attribute child.
#[must_use]
pub fn sort_preference(store: &ThoughtStore, id: &ThoughtId) -> SortPreference {
    let Some(attr) = store.child_by_value(id, ATTR_SORT) else {
        return SortPreference::Manual;
    };
    let Some(kind) = store.children(&attr).first().copied() else {
        return SortPreference::Manual;
    };
    let is_alpha = store
        .thought(&kind)
        .is_some_and(|t| normalize(&t.value) == "alphabetical");
    if !is_alpha {
        return SortPreference::Manual;
    }
    let desc = store
        .children(&kind)
        .first()
        .and_then(|d| store.thought(d))
        .is_some_and(|t| normalize(&t.value) == "desc");
    SortPreference::Alphabetical(if desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    })
}

fn alphabetical_cmp(
    store: &ThoughtStore,
    dir: SortDirection,
    x: &ThoughtId,
    y: &ThoughtId,
) -> Ordering {
    let key = |id: &ThoughtId| {
        store
            .thought(id)
            .map_or(("", Rank::default()), |t| (t.value.as_str(), t.rank))
    };
    let (vx, rx) = key(x);
    let (vy, ry) = key(y);
    let by_value = match dir {
        SortDirection::Asc => vx.cmp(vy),
        SortDirection::Desc => vy.cmp(vx),
    };
    by_value.then(rx.cmp(&ry)).then(x.cmp(y))
}

/// Visible structural children of a thought: attribute children hidden, the
/// effective sort preference applied.
#[must_use]
pub fn visible_child_ids(store: &ThoughtStore, id: &ThoughtId) -> Vec<ThoughtId> {
    let mut out: Vec<ThoughtId> = store
        .children(id)
        .iter()
        .filter(|c| {
            store
                .thought(c)
                .is_some_and(|t| !is_attribute_value(&t.value))
        })
        .copied()
        .collect();
    if let SortPreference::Alphabetical(dir) = sort_preference(store, id) {
        out.sort_by(|x, y| alphabetical_cmp(store, dir, x, y));
    }
    out
}

/// Visible children of a location as full paths.
///
/// `None` is the synthetic root. When the context view is active at the
/// location, the children are its context entries (each appending the
/// context parent as the next segment); otherwise they are the resolved
/// thought's visible structural children.
#[must_use]
pub fn visible_children_of(state: &AppState, base: Option<&Path>) -> Vec<Path> {
    let store = state.store();
    let views = state.context_views();
    match base {
        None => visible_child_ids(store, &store.root())
            .into_iter()
            .map(Path::from_id)
            .collect(),
        Some(path) => {
            if is_context_view_active(store, views, path) {
                context_entries(store, views, path)
                    .into_iter()
                    .map(|e| path.child(e.context))
                    .collect()
            } else {
                thought_at(store, views, path).map_or_else(Vec::new, |id| {
                    visible_child_ids(store, &id)
                        .into_iter()
                        .map(|c| path.child(c))
                        .collect()
                })
            }
        }
    }
}

/// Returns `true` when a location's children are on screen.
///
/// Expansion follows the cursor: a location is expanded exactly when it lies
/// on the cursor path (the cursor itself included).
#[must_use]
pub fn is_expanded(state: &AppState, path: &Path) -> bool {
    state.cursor().is_some_and(|c| c.starts_with(path))
}
