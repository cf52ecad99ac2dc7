// SPDX-License-Identifier: Apache-2.0
//! Context view engine: the virtual "every context containing this value"
//! view.
//!
//! A context view is a pure per-thought flag, never a graph mutation. While
//! active, the toggled thought's children are replaced by one entry per
//! occurrence of its value anywhere in the graph — each entry rendered as
//! the occurrence's structural parent, with the occurrence's own children
//! underneath.
//!
//! Recurrence is classified with an explicit visited-value set derived from
//! the originating path (never shared mutable recursion state): an entry is
//! *cyclic* when its display value already occurs on the path (descending
//! revisits the same lexeme), *tangential* when the occurrence shares no
//! non-root ancestor with the path. Both remain navigable; cyclic hops
//! simply grow the path. Only unbounded eager expansion has to guard against
//! cycles, and that guard lives with the exporter, not here.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use crate::ident::ThoughtId;
use crate::lexeme::normalize;
use crate::path::{resolve_chain, Path};
use crate::store::ThoughtStore;
use crate::thought::is_attribute_value;

/// How a context entry relates to the path it is viewed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContextRecurrence {
    /// Ordinary context: shares ancestry with the path, no value revisit.
    Direct,
    /// Descending revisits a value already on the path.
    Cyclic,
    /// Shares no non-root ancestor with the originating path.
    Tangential,
}

/// One entry of an active context view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextEntry {
    /// Structural parent of the occurrence; the entry renders this thought's
    /// value and becomes the next path segment on descent.
    pub context: ThoughtId,
    /// The occurrence itself; its structural children are the entry's
    /// children.
    pub target: ThoughtId,
    /// Recurrence classification relative to the originating path.
    pub recurrence: ContextRecurrence,
}

/// Lists the context entries for the thought at `path`.
///
/// Every lexeme reference of the value yields an entry — the reference at
/// `path` itself included; its entry is the cyclic self context. Entries are
/// ordered by `(parent value, parent id)` and deduplicated by parent.
/// Returns an empty list when the path does not resolve.
#[must_use]
pub fn context_entries(
    store: &ThoughtStore,
    views: &BTreeSet<ThoughtId>,
    path: &Path,
) -> Vec<ContextEntry> {
    let Some(chain) = resolve_chain(store, views, path) else {
        return Vec::new();
    };
    let target = chain[chain.len() - 1];
    let Some(value) = store.thought(&target).map(|t| t.value.clone()) else {
        return Vec::new();
    };
    let visited: FxHashSet<String> = path
        .ids()
        .iter()
        .filter_map(|id| store.thought(id).map(|t| normalize(&t.value)))
        .collect();
    let on_path: FxHashSet<ThoughtId> = chain.iter().copied().collect();

    let Some(lexeme) = store.lexeme(&value) else {
        return Vec::new();
    };
    let mut entries: Vec<(String, ContextEntry)> = Vec::with_capacity(lexeme.len());
    for r in lexeme.refs() {
        let Some(occurrence) = store.thought(r) else {
            debug_assert!(false, "lexeme ref missing from store: {r:?}");
            continue;
        };
        // Occurrences inside attribute subtrees (=archive and friends) are
        // not navigable contexts.
        if store
            .ancestors(r)
            .iter()
            .any(|a| store.thought(a).is_some_and(|t| is_attribute_value(&t.value)))
        {
            continue;
        }
        let parent = occurrence.parent;
        let Some(parent_value) = store.thought(&parent).map(|t| t.value.clone()) else {
            continue;
        };
        let recurrence = if visited.contains(&normalize(&parent_value)) {
            ContextRecurrence::Cyclic
        } else if store
            .ancestors(r)
            .iter()
            .all(|a| *a == store.root() || !on_path.contains(a))
        {
            ContextRecurrence::Tangential
        } else {
            ContextRecurrence::Direct
        };
        entries.push((
            parent_value,
            ContextEntry {
                context: parent,
                target: *r,
                recurrence,
            },
        ));
    }
    entries.sort_by(|a, b| (a.0.as_str(), a.1.context).cmp(&(b.0.as_str(), b.1.context)));
    let mut seen: FxHashSet<ThoughtId> = FxHashSet::default();
    entries
        .into_iter()
        .filter_map(|(_, e)| seen.insert(e.context).then_some(e))
        .collect()
}

/// Returns `true` when the context view is active at `path`.
///
/// Active means: the path's last segment is toggled *and* the view has more
/// than one context. A view with exactly one context (only the occurrence
/// itself) is suppressed and renders as if inactive.
#[must_use]
pub fn is_context_view_active(
    store: &ThoughtStore,
    views: &BTreeSet<ThoughtId>,
    path: &Path,
) -> bool {
    views.contains(&path.last()) && context_entries(store, views, path).len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thought::{Rank, Timestamp};

    /// `a/m`, `b/m`, `c/x/m`: three occurrences of "m".
    fn seeded() -> (ThoughtStore, Vec<ThoughtId>) {
        let mut store = ThoughtStore::new();
        let root = store.root();
        let now = Timestamp::from_raw(1);
        let mut ids = Vec::new();
        let mut mk = |store: &mut ThoughtStore, parent: &ThoughtId, value: &str, n: i64| {
            store
                .create_thought(parent, value, Rank::nth(n), now)
                .unwrap_or_else(|e| panic!("create failed: {e}"))
        };
        let a = mk(&mut store, &root, "a", 0);
        let b = mk(&mut store, &root, "b", 1);
        let c = mk(&mut store, &root, "c", 2);
        let m1 = mk(&mut store, &a, "m", 0);
        let m2 = mk(&mut store, &b, "m", 0);
        let x = mk(&mut store, &c, "x", 0);
        let m3 = mk(&mut store, &x, "m", 0);
        ids.extend([a, b, c, m1, m2, x, m3]);
        (store, ids)
    }

    #[test]
    fn entries_cover_every_occurrence_in_parent_order() {
        let (store, ids) = seeded();
        let (a, b, _c, m1, m2, x, m3) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5], ids[6]);
        let mut views = BTreeSet::new();
        views.insert(m1);
        let path = Path::from_id(a).child(m1);

        let entries = context_entries(&store, &views, &path);
        let parents: Vec<ThoughtId> = entries.iter().map(|e| e.context).collect();
        assert_eq!(parents, vec![a, b, x]);
        let targets: Vec<ThoughtId> = entries.iter().map(|e| e.target).collect();
        assert_eq!(targets, vec![m1, m2, m3]);
    }

    #[test]
    fn self_context_is_cyclic_and_others_tangential() {
        let (store, ids) = seeded();
        let (a, m1) = (ids[0], ids[3]);
        let mut views = BTreeSet::new();
        views.insert(m1);
        let path = Path::from_id(a).child(m1);

        let entries = context_entries(&store, &views, &path);
        assert_eq!(entries[0].recurrence, ContextRecurrence::Cyclic);
        assert_eq!(entries[1].recurrence, ContextRecurrence::Tangential);
        assert_eq!(entries[2].recurrence, ContextRecurrence::Tangential);
    }

    #[test]
    fn single_context_views_are_suppressed() {
        let (store, ids) = seeded();
        let (a, x) = (ids[0], ids[5]);
        let mut views = BTreeSet::new();
        views.insert(a);
        views.insert(x);
        // "a" occurs once: toggled but suppressed.
        assert!(!is_context_view_active(&store, &views, &Path::from_id(a)));
        // "x" occurs once as well.
        let c = ids[2];
        assert!(!is_context_view_active(
            &store,
            &views,
            &Path::from_id(c).child(x)
        ));
    }

    #[test]
    fn untoggled_paths_are_inactive() {
        let (store, ids) = seeded();
        let (a, m1) = (ids[0], ids[3]);
        let views = BTreeSet::new();
        assert!(!is_context_view_active(
            &store,
            &views,
            &Path::from_id(a).child(m1)
        ));
    }
}
