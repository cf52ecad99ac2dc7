// SPDX-License-Identifier: Apache-2.0
//! Paths, simple paths, and contexts: the three addressing schemes of the
//! document, and the conversions between them.
//!
//! A [`Path`] is the stable id chain from a root-adjacent thought down to a
//! target. Consecutive segments normally satisfy the structural parent
//! relation; across a context-view boundary the next segment instead names a
//! *context parent* — the structural parent of another occurrence of the
//! toggled value. [`resolve_chain`] reconciles both cases into the chain of
//! actual thoughts the path passes through.
//!
//! A [`Context`] is the corresponding value chain. Values are not unique, so
//! context resolution is inherently ambiguous; [`context_to_path`] picks the
//! first structural match in sibling order. This is a documented
//! approximation, not a defect.

use std::collections::BTreeSet;

use crate::ident::{path_hash, PathHash, ThoughtId};
use crate::store::ThoughtStore;

/// Ordered, non-empty id chain from a root-adjacent thought to a target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path(Vec<ThoughtId>);

impl Path {
    /// Builds a path from an id chain; `None` when the chain is empty.
    #[must_use]
    pub fn new(ids: Vec<ThoughtId>) -> Option<Self> {
        (!ids.is_empty()).then_some(Self(ids))
    }

    /// Single-segment path for a root-adjacent thought.
    #[must_use]
    pub fn from_id(id: ThoughtId) -> Self {
        Self(vec![id])
    }

    /// Segment ids in order.
    #[must_use]
    pub fn ids(&self) -> &[ThoughtId] {
        &self.0
    }

    /// Number of segments (always at least 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// First segment.
    #[must_use]
    pub fn head(&self) -> ThoughtId {
        self.0[0]
    }

    /// Last segment.
    #[must_use]
    pub fn last(&self) -> ThoughtId {
        self.0[self.0.len() - 1]
    }

    /// Path with `id` appended.
    #[must_use]
    pub fn child(&self, id: ThoughtId) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    /// Path with the last segment dropped; `None` for a root-adjacent path
    /// (the parent is then the synthetic root).
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Returns `true` when `prefix` is a (non-strict) prefix of this path.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Canonical hash of the segment chain (the multicursor key).
    #[must_use]
    pub fn path_hash(&self) -> PathHash {
        path_hash(&self.0)
    }
}

/// Drops the last segment of `path`; `None` is the synthetic root path.
#[must_use]
pub fn rooted_parent_of(path: &Path) -> Option<Path> {
    path.parent()
}

/// A path verified to follow only structural parent/child edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplePath(Path);

impl SimplePath {
    /// Verifies `path` against the store's structural parent relation.
    #[must_use]
    pub fn verified(store: &ThoughtStore, path: Path) -> Option<Self> {
        let ids = path.ids();
        let first = store.thought(&ids[0])?;
        if first.parent != store.root() {
            return None;
        }
        for pair in ids.windows(2) {
            if store.thought(&pair[1]).is_none_or(|t| t.parent != pair[0]) {
                return None;
            }
        }
        Some(Self(path))
    }

    /// The underlying path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_path(self) -> Path {
        self.0
    }
}

/// Ordered value chain corresponding to a path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Context(Vec<String>);

impl Context {
    /// Builds a context from a value chain.
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// Values in order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl From<&[&str]> for Context {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| (*v).to_owned()).collect())
    }
}

/// Resolves each path segment to the actual thought it passes through.
///
/// Structural segments resolve to themselves. A segment that is not a
/// structural child is treated as a context-view boundary when the thought
/// reached so far is toggled: the segment names a context parent, and the
/// resolved thought is the occurrence of the toggled value under that
/// parent. Returns `None` when any segment resolves nowhere.
#[must_use]
pub fn resolve_chain(
    store: &ThoughtStore,
    views: &BTreeSet<ThoughtId>,
    path: &Path,
) -> Option<Vec<ThoughtId>> {
    let ids = path.ids();
    if store.thought(&ids[0])?.parent != store.root() {
        return None;
    }
    let mut chain = Vec::with_capacity(ids.len());
    chain.push(ids[0]);
    for seg in &ids[1..] {
        let cur = chain[chain.len() - 1];
        if store.thought(seg).is_some_and(|t| t.parent == cur) {
            chain.push(*seg);
            continue;
        }
        if views.contains(&cur) {
            let value = store.thought(&cur)?.value.clone();
            chain.push(store.context_ref(&value, seg)?);
            continue;
        }
        return None;
    }
    Some(chain)
}

/// The thought a path points at, across context-view boundaries.
#[must_use]
pub fn thought_at(
    store: &ThoughtStore,
    views: &BTreeSet<ThoughtId>,
    path: &Path,
) -> Option<ThoughtId> {
    resolve_chain(store, views, path).map(|chain| chain[chain.len() - 1])
}

/// Structural path of a thought: the parent chain from a root-adjacent
/// ancestor down to `id`. `None` for the root or an unknown id.
#[must_use]
pub fn structural_path(store: &ThoughtStore, id: &ThoughtId) -> Option<SimplePath> {
    if *id == store.root() || !store.contains(id) {
        return None;
    }
    let mut ids: Vec<ThoughtId> = store
        .ancestors(id)
        .into_iter()
        .filter(|a| *a != store.root())
        .collect();
    ids.reverse();
    ids.push(*id);
    SimplePath::verified(store, Path::new(ids)?)
}

/// Simplifies a path to the structural path of the thought it points at,
/// collapsing any context-view boundary segments.
#[must_use]
pub fn simplify_path(
    store: &ThoughtStore,
    views: &BTreeSet<ThoughtId>,
    path: &Path,
) -> Option<SimplePath> {
    let id = thought_at(store, views, path)?;
    structural_path(store, &id)
}

/// Maps each path segment to its thought's display value.
///
/// Context-view boundary segments name the context parent, so the produced
/// context reads the way the path renders on screen.
#[must_use]
pub fn path_to_context(store: &ThoughtStore, path: &Path) -> Option<Context> {
    let mut values = Vec::with_capacity(path.depth());
    for id in path.ids() {
        values.push(store.thought(id)?.value.clone());
    }
    Some(Context::new(values))
}

/// Resolves a value chain to a structural path, first match wins.
///
/// Each segment matches the first child (in sibling order) whose value
/// normalizes equal to the segment value. Fails when any segment has no
/// match. Ambiguity is resolved deterministically but silently.
#[must_use]
pub fn context_to_path(store: &ThoughtStore, context: &Context) -> Option<SimplePath> {
    let values = context.values();
    if values.is_empty() {
        return None;
    }
    let mut cur = store.root();
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        cur = store.child_by_value(&cur, value)?;
        ids.push(cur);
    }
    SimplePath::verified(store, Path::new(ids)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thought::{Rank, Timestamp};

    fn seeded() -> (ThoughtStore, ThoughtId, ThoughtId) {
        let mut store = ThoughtStore::new();
        let root = store.root();
        let now = Timestamp::from_raw(1);
        let a = store
            .create_thought(&root, "a", Rank::nth(0), now)
            .unwrap_or_else(|e| panic!("create failed: {e}"));
        let b = store
            .create_thought(&a, "b", Rank::nth(0), now)
            .unwrap_or_else(|e| panic!("create failed: {e}"));
        (store, a, b)
    }

    #[test]
    fn context_round_trips_through_first_match() {
        let (store, a, b) = seeded();
        let ctx = Context::from(&["a", "b"][..]);
        let path = context_to_path(&store, &ctx);
        assert_eq!(
            path.as_ref().map(|p| p.as_path().ids().to_vec()),
            Some(vec![a, b])
        );
        let back = path.and_then(|p| path_to_context(&store, p.as_path()));
        assert_eq!(back, Some(Context::from(&["a", "b"][..])));
    }

    #[test]
    fn verified_rejects_non_structural_chains() {
        let (store, a, b) = seeded();
        assert!(SimplePath::verified(&store, Path::from_id(b)).is_none());
        let backwards = Path::new(vec![b, a]);
        assert!(backwards.and_then(|p| SimplePath::verified(&store, p)).is_none());
    }

    #[test]
    fn rooted_parent_of_drops_to_synthetic_root() {
        let (_, a, b) = seeded();
        let path = Path::from_id(a).child(b);
        assert_eq!(rooted_parent_of(&path), Some(Path::from_id(a)));
        assert_eq!(rooted_parent_of(&Path::from_id(a)), None);
    }

    #[test]
    fn structural_path_reaches_nested_thoughts() {
        let (store, a, b) = seeded();
        let sp = structural_path(&store, &b);
        assert_eq!(sp.map(|p| p.as_path().ids().to_vec()), Some(vec![a, b]));
        assert!(structural_path(&store, &store.root()).is_none());
    }
}
