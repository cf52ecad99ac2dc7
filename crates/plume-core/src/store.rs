// SPDX-License-Identifier: Apache-2.0
//! In-memory thought graph store: the canonical thought table, the
//! rank-ordered child adjacency, and the lexeme index, mutated as a single
//! unit.
//!
//! Every mutating operation leaves three invariants intact:
//! - every non-root thought's `parent` exists in the store and lists the
//!   thought in its child bucket exactly once;
//! - sibling order is a strict total order on `(rank, id)`;
//! - the lexeme index contains exactly the ids of thoughts holding each
//!   normalized value.
//!
//! Path resolution, context views, and cursor navigation are pure readers of
//! this structure; they never write to it.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ident::{mint_thought_id, root_thought_id, Hash, ThoughtId};
use crate::lexeme::{normalize, Lexeme, LexemeIndex};
use crate::thought::{Rank, Thought, Timestamp, ATTR_ARCHIVE, RANK_GAP};

/// Error returned by store mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced thought does not exist in the store.
    #[error("thought not found")]
    NotFound,
    /// The move would place a thought inside its own subtree.
    #[error("move would create a structural cycle")]
    CyclicMove,
    /// The root (or another reserved thought) cannot be mutated this way.
    #[error("thought is protected")]
    ProtectedThought,
    /// A thought with this id already exists.
    #[error("thought id already exists")]
    DuplicateId,
    /// The thought still has children; remove them first.
    #[error("thought has children")]
    HasChildren,
}

/// Invariant violation reported by [`ThoughtStore::validate`].
///
/// Produced only by the test-facing sweep; regular operations maintain the
/// invariants and rely on `debug_assert!` for index drift.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A non-root thought's parent is missing from the store.
    #[error("missing parent for thought {0:?}")]
    MissingParent(ThoughtId),
    /// A thought is absent from (or duplicated in) its parent's child bucket.
    #[error("broken child link for thought {0:?}")]
    ChildLinkBroken(ThoughtId),
    /// A child bucket is not strictly ordered by `(rank, id)`.
    #[error("unsorted sibling bucket under {0:?}")]
    UnsortedSiblings(ThoughtId),
    /// A parent chain does not reach the root.
    #[error("parent chain cycle at thought {0:?}")]
    ParentCycle(ThoughtId),
    /// The lexeme index disagrees with the thought table.
    #[error("lexeme index drift for value {0:?}")]
    LexemeDrift(String),
}

/// In-memory thought graph storage.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThoughtStore {
    root: ThoughtId,
    thoughts: BTreeMap<ThoughtId, Thought>,
    /// Child buckets, each kept sorted by `(rank, id)`.
    children: BTreeMap<ThoughtId, Vec<ThoughtId>>,
    lexemes: LexemeIndex,
    /// Monotonic sequence for minted ids.
    seq: u64,
}

impl Default for ThoughtStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThoughtStore {
    /// Creates a store holding only the distinguished root.
    #[must_use]
    pub fn new() -> Self {
        let root = root_thought_id();
        let mut thoughts = BTreeMap::new();
        thoughts.insert(
            root,
            Thought {
                value: String::new(),
                rank: Rank::default(),
                parent: root,
                last_updated: Timestamp::default(),
                archived: false,
            },
        );
        Self {
            root,
            thoughts,
            children: BTreeMap::new(),
            lexemes: LexemeIndex::default(),
            seq: 0,
        }
    }

    /// Identifier of the distinguished root thought.
    #[must_use]
    pub fn root(&self) -> ThoughtId {
        self.root
    }

    /// Number of thoughts in the store, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.thoughts.len()
    }

    /// Returns `true` when the store holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thoughts.len() == 1
    }

    /// Returns a shared reference to a thought when it exists.
    pub fn thought(&self, id: &ThoughtId) -> Option<&Thought> {
        self.thoughts.get(id)
    }

    /// Returns `true` when `id` exists in the store.
    #[must_use]
    pub fn contains(&self, id: &ThoughtId) -> bool {
        self.thoughts.contains_key(id)
    }

    /// Iterate over all `(id, thought)` pairs in deterministic id order.
    pub fn iter_thoughts(&self) -> impl Iterator<Item = (&ThoughtId, &Thought)> {
        self.thoughts.iter()
    }

    /// Structural children of `id` in `(rank, id)` order.
    #[must_use]
    pub fn children(&self, id: &ThoughtId) -> &[ThoughtId] {
        self.children.get(id).map_or(&[], Vec::as_slice)
    }

    /// First structural child of `parent` whose value normalizes equal to
    /// `value`, in sibling order.
    #[must_use]
    pub fn child_by_value(&self, parent: &ThoughtId, value: &str) -> Option<ThoughtId> {
        let key = normalize(value);
        self.children(parent)
            .iter()
            .find(|c| {
                self.thoughts
                    .get(c)
                    .is_some_and(|t| normalize(&t.value) == key)
            })
            .copied()
    }

    /// Lexeme entry for a display value, if any thought holds it.
    #[must_use]
    pub fn lexeme(&self, value: &str) -> Option<&Lexeme> {
        self.lexemes.get(&normalize(value))
    }

    /// The lexeme reference holding `value` whose structural parent is
    /// `parent`.
    ///
    /// This resolves a context-view boundary segment: the segment names the
    /// context parent, this returns the occurrence living under it.
    #[must_use]
    pub fn context_ref(&self, value: &str, parent: &ThoughtId) -> Option<ThoughtId> {
        self.lexeme(value)?
            .refs()
            .find(|r| self.thoughts.get(r).is_some_and(|t| t.parent == *parent))
            .copied()
    }

    /// Returns `true` when `id` is a strict descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant(&self, id: &ThoughtId, ancestor: &ThoughtId) -> bool {
        if *id == self.root {
            return false;
        }
        if *ancestor == self.root {
            return self.thoughts.contains_key(id);
        }
        let mut cur = *id;
        let mut hops = 0usize;
        while let Some(t) = self.thoughts.get(&cur) {
            if cur == self.root {
                return false;
            }
            if t.parent == *ancestor {
                return true;
            }
            cur = t.parent;
            hops += 1;
            if hops > self.thoughts.len() {
                debug_assert!(false, "parent chain cycle at thought: {cur:?}");
                return false;
            }
        }
        false
    }

    /// Parent chain of `id` from its parent up to (and including) the root.
    #[must_use]
    pub fn ancestors(&self, id: &ThoughtId) -> Vec<ThoughtId> {
        let mut out = Vec::new();
        let mut cur = *id;
        while cur != self.root {
            let Some(t) = self.thoughts.get(&cur) else {
                return out;
            };
            out.push(t.parent);
            cur = t.parent;
            if out.len() > self.thoughts.len() {
                debug_assert!(false, "parent chain cycle at thought: {cur:?}");
                return out;
            }
        }
        out
    }

    /// Rank that appends after the current last child of `parent`.
    #[must_use]
    pub fn append_rank(&self, parent: &ThoughtId) -> Rank {
        self.children(parent)
            .last()
            .and_then(|c| self.thoughts.get(c))
            .map_or_else(
                || Rank::nth(0),
                |t| Rank::from_raw(t.rank.value().saturating_add(RANK_GAP)),
            )
    }

    /// Mints a fresh sequence-derived id.
    pub fn mint_id(&mut self) -> ThoughtId {
        let id = mint_thought_id(self.seq);
        self.seq = self.seq.wrapping_add(1);
        id
    }

    /// Current mint sequence (persisted so reloaded stores keep minting
    /// fresh ids).
    #[must_use]
    pub fn mint_seq(&self) -> u64 {
        self.seq
    }

    #[cfg(feature = "serde")]
    pub(crate) fn set_mint_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Creates a thought with a minted id under `parent`.
    pub fn create_thought(
        &mut self,
        parent: &ThoughtId,
        value: &str,
        rank: Rank,
        now: Timestamp,
    ) -> Result<ThoughtId, StoreError> {
        let id = self.mint_id();
        self.create_with_id(id, parent, value, rank, now, false)?;
        Ok(id)
    }

    /// Creates a thought under an explicit id (patch replay, fixtures).
    pub fn create_with_id(
        &mut self,
        id: ThoughtId,
        parent: &ThoughtId,
        value: &str,
        rank: Rank,
        now: Timestamp,
        archived: bool,
    ) -> Result<(), StoreError> {
        if !self.thoughts.contains_key(parent) {
            return Err(StoreError::NotFound);
        }
        if self.thoughts.contains_key(&id) {
            return Err(StoreError::DuplicateId);
        }
        self.thoughts.insert(
            id,
            Thought {
                value: value.to_owned(),
                rank,
                parent: *parent,
                last_updated: now,
                archived,
            },
        );
        self.lexemes.add_ref(value, id);
        self.children.entry(*parent).or_default().push(id);
        self.resort_children(parent);
        Ok(())
    }

    /// Replaces a thought's value, keeping the lexeme index consistent.
    ///
    /// Returns the previous value.
    pub fn update_value(
        &mut self,
        id: &ThoughtId,
        value: &str,
        now: Timestamp,
    ) -> Result<String, StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        let old = {
            let t = self.thoughts.get_mut(id).ok_or(StoreError::NotFound)?;
            let old = core::mem::replace(&mut t.value, value.to_owned());
            t.last_updated = now;
            old
        };
        self.lexemes.remove_ref(&old, id);
        self.lexemes.add_ref(value, *id);
        Ok(old)
    }

    /// Replaces a thought's rank and re-sorts its sibling bucket.
    ///
    /// Returns the previous rank.
    pub fn update_rank(
        &mut self,
        id: &ThoughtId,
        rank: Rank,
        now: Timestamp,
    ) -> Result<Rank, StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        let (old, parent) = {
            let t = self.thoughts.get_mut(id).ok_or(StoreError::NotFound)?;
            let old = core::mem::replace(&mut t.rank, rank);
            t.last_updated = now;
            (old, t.parent)
        };
        self.resort_children(&parent);
        Ok(old)
    }

    /// Moves a thought under a new parent at the given rank.
    ///
    /// Rejects moving the root and moves that would place the thought inside
    /// its own subtree.
    pub fn move_thought(
        &mut self,
        id: &ThoughtId,
        new_parent: &ThoughtId,
        rank: Rank,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        if !self.thoughts.contains_key(id) || !self.thoughts.contains_key(new_parent) {
            return Err(StoreError::NotFound);
        }
        if new_parent == id || self.is_descendant(new_parent, id) {
            return Err(StoreError::CyclicMove);
        }
        let old_parent = {
            let t = self.thoughts.get_mut(id).ok_or(StoreError::NotFound)?;
            let old_parent = core::mem::replace(&mut t.parent, *new_parent);
            t.rank = rank;
            t.last_updated = now;
            old_parent
        };
        self.unlink_child(&old_parent, id);
        self.children.entry(*new_parent).or_default().push(*id);
        self.resort_children(new_parent);
        Ok(())
    }

    /// Removes a childless thought and its lexeme reference.
    ///
    /// Returns the removed record.
    pub fn remove_leaf(&mut self, id: &ThoughtId) -> Result<Thought, StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        if self.children.get(id).is_some_and(|c| !c.is_empty()) {
            return Err(StoreError::HasChildren);
        }
        let t = self.thoughts.remove(id).ok_or(StoreError::NotFound)?;
        self.lexemes.remove_ref(&t.value, id);
        self.unlink_child(&t.parent, id);
        self.children.remove(id);
        Ok(t)
    }

    /// Subtree of `id` in post-order (children before parents, `id` last).
    ///
    /// This is the safe removal order for [`Self::remove_leaf`].
    #[must_use]
    pub fn subtree_postorder(&self, id: &ThoughtId) -> Vec<ThoughtId> {
        let mut out = Vec::new();
        self.postorder_into(id, &mut out);
        out
    }

    fn postorder_into(&self, id: &ThoughtId, out: &mut Vec<ThoughtId>) {
        if out.len() > self.thoughts.len() {
            debug_assert!(false, "subtree walk exceeded store size at: {id:?}");
            return;
        }
        for child in self.children(id).to_vec() {
            self.postorder_into(&child, out);
        }
        out.push(*id);
    }

    /// Recursively deletes a thought and its descendants, pruning lexeme
    /// references.
    ///
    /// Returns the removed `(id, record)` pairs in removal (post-) order.
    pub fn delete_thought(
        &mut self,
        id: &ThoughtId,
    ) -> Result<Vec<(ThoughtId, Thought)>, StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        if !self.thoughts.contains_key(id) {
            return Err(StoreError::NotFound);
        }
        let order = self.subtree_postorder(id);
        let mut removed = Vec::with_capacity(order.len());
        for tid in order {
            let t = self.remove_leaf(&tid)?;
            removed.push((tid, t));
        }
        Ok(removed)
    }

    /// Reparents a thought under the `=archive` container of its current
    /// parent, creating the container on demand and preserving descendants.
    ///
    /// Returns the archive container id.
    pub fn archive_thought(
        &mut self,
        id: &ThoughtId,
        now: Timestamp,
    ) -> Result<ThoughtId, StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        let parent = self.thoughts.get(id).ok_or(StoreError::NotFound)?.parent;
        let container = match self.child_by_value(&parent, ATTR_ARCHIVE) {
            Some(c) => c,
            None => {
                let rank = self.append_rank(&parent);
                self.create_thought(&parent, ATTR_ARCHIVE, rank, now)?
            }
        };
        let rank = self.append_rank(&container);
        self.move_thought(id, &container, rank, now)?;
        if let Some(t) = self.thoughts.get_mut(id) {
            t.archived = true;
        }
        Ok(container)
    }

    /// Sets the archived marker on a thought.
    ///
    /// Returns the previous marker.
    pub fn set_archived(
        &mut self,
        id: &ThoughtId,
        archived: bool,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        if *id == self.root {
            return Err(StoreError::ProtectedThought);
        }
        let t = self.thoughts.get_mut(id).ok_or(StoreError::NotFound)?;
        let old = core::mem::replace(&mut t.archived, archived);
        t.last_updated = now;
        Ok(old)
    }

    fn unlink_child(&mut self, parent: &ThoughtId, id: &ThoughtId) {
        let remove_bucket = self.children.get_mut(parent).map_or_else(
            || {
                debug_assert!(false, "missing child bucket for parent: {parent:?}");
                false
            },
            |bucket| {
                let before = bucket.len();
                bucket.retain(|c| c != id);
                debug_assert!(
                    bucket.len() < before,
                    "child missing from parent bucket: {id:?}"
                );
                bucket.is_empty()
            },
        );
        if remove_bucket {
            self.children.remove(parent);
        }
    }

    fn resort_children(&mut self, parent: &ThoughtId) {
        let Some(bucket) = self.children.get(parent) else {
            return;
        };
        let mut keyed: Vec<(Rank, ThoughtId)> = bucket
            .iter()
            .map(|c| {
                (
                    self.thoughts.get(c).map_or_else(Rank::default, |t| t.rank),
                    *c,
                )
            })
            .collect();
        keyed.sort_unstable();
        self.children
            .insert(*parent, keyed.into_iter().map(|(_, c)| c).collect());
    }

    /// Computes a canonical hash of the entire store.
    ///
    /// The traversal is strictly deterministic: a version header, the thought
    /// count, then each record sorted by id with length-prefixed value bytes.
    /// The lexeme index is derivable from the thought table and is therefore
    /// not hashed separately.
    #[must_use]
    pub fn canonical_state_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"PLUME_STATE_HASH_V1\0");
        hasher.update(&(self.thoughts.len() as u64).to_le_bytes());
        for (id, t) in &self.thoughts {
            hasher.update(b"T\0");
            hasher.update(&id.0);
            hasher.update(&t.parent.0);
            hasher.update(&t.rank.value().to_le_bytes());
            hasher.update(&t.last_updated.value().to_le_bytes());
            hasher.update(&[u8::from(t.archived)]);
            hasher.update(&(t.value.len() as u64).to_le_bytes());
            hasher.update(t.value.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }

    /// Full invariant sweep: parent linkage, sibling order, acyclicity, and
    /// exact lexeme consistency.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for (id, t) in &self.thoughts {
            if *id == self.root {
                continue;
            }
            if !self.thoughts.contains_key(&t.parent) {
                return Err(InvariantViolation::MissingParent(*id));
            }
            let linked = self
                .children
                .get(&t.parent)
                .map_or(0, |b| b.iter().filter(|c| *c == id).count());
            if linked != 1 {
                return Err(InvariantViolation::ChildLinkBroken(*id));
            }
            let mut cur = *id;
            let mut hops = 0usize;
            while cur != self.root {
                let Some(rec) = self.thoughts.get(&cur) else {
                    return Err(InvariantViolation::MissingParent(cur));
                };
                cur = rec.parent;
                hops += 1;
                if hops > self.thoughts.len() {
                    return Err(InvariantViolation::ParentCycle(*id));
                }
            }
        }
        for (parent, bucket) in &self.children {
            let keys: Vec<(Rank, ThoughtId)> = bucket
                .iter()
                .map(|c| {
                    (
                        self.thoughts.get(c).map_or_else(Rank::default, |t| t.rank),
                        *c,
                    )
                })
                .collect();
            if keys.windows(2).any(|w| w[0] >= w[1]) {
                return Err(InvariantViolation::UnsortedSiblings(*parent));
            }
        }
        // Lexeme consistency, both directions.
        let mut expected: BTreeMap<String, Vec<ThoughtId>> = BTreeMap::new();
        for (id, t) in &self.thoughts {
            if *id == self.root {
                continue;
            }
            expected.entry(normalize(&t.value)).or_default().push(*id);
        }
        for (key, ids) in &expected {
            let Some(lexeme) = self.lexemes.get(key) else {
                return Err(InvariantViolation::LexemeDrift(key.clone()));
            };
            if lexeme.len() != ids.len() || !ids.iter().all(|id| lexeme.contains(id)) {
                return Err(InvariantViolation::LexemeDrift(key.clone()));
            }
        }
        for (key, lexeme) in self.lexemes.iter() {
            if lexeme.is_empty() || !expected.contains_key(key) {
                return Err(InvariantViolation::LexemeDrift(key.clone()));
            }
        }
        Ok(())
    }
}
