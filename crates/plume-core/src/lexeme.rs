// SPDX-License-Identifier: Apache-2.0
//! Secondary value index: normalized value -> set of thought references.
//!
//! The lexeme table is what makes "all contexts containing this value"
//! queries proportional to the number of occurrences instead of a full
//! store scan. It is maintained by the store as part of the same mutable
//! unit as the thought table; no other component writes to it.

use std::collections::{BTreeMap, BTreeSet};

use crate::ident::ThoughtId;

/// Normalizes a display value into its lexeme key.
///
/// Normalization trims, collapses internal whitespace runs to a single
/// space, and lowercases. Two thoughts whose values normalize equally share
/// a lexeme and therefore appear in each other's context views.
#[must_use]
pub fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for segment in value.split_whitespace() {
        if pending_space {
            out.push(' ');
        }
        for ch in segment.chars() {
            out.extend(ch.to_lowercase());
        }
        pending_space = true;
    }
    out
}

/// One lexeme entry: every thought whose value normalizes to the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lexeme {
    refs: BTreeSet<ThoughtId>,
}

impl Lexeme {
    /// Iterates the referencing thought ids in deterministic id order.
    pub fn refs(&self) -> impl Iterator<Item = &ThoughtId> {
        self.refs.iter()
    }

    /// Number of referencing thoughts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns `true` when no thought references this lexeme.
    ///
    /// Empty entries never survive in the index; this exists for the
    /// invariant sweep.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Returns `true` when `id` references this lexeme.
    #[must_use]
    pub fn contains(&self, id: &ThoughtId) -> bool {
        self.refs.contains(id)
    }
}

/// The full value index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct LexemeIndex {
    entries: BTreeMap<String, Lexeme>,
}

impl LexemeIndex {
    /// Looks up the lexeme for an already-normalized key.
    pub(crate) fn get(&self, key: &str) -> Option<&Lexeme> {
        self.entries.get(key)
    }

    /// Iterates all `(key, lexeme)` entries in deterministic key order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Lexeme)> {
        self.entries.iter()
    }

    /// Adds a reference, creating the entry on first use.
    pub(crate) fn add_ref(&mut self, value: &str, id: ThoughtId) {
        let inserted = self
            .entries
            .entry(normalize(value))
            .or_default()
            .refs
            .insert(id);
        debug_assert!(inserted, "lexeme ref inserted twice for id: {id:?}");
    }

    /// Removes a reference; the entry is pruned with its last reference.
    pub(crate) fn remove_ref(&mut self, value: &str, id: &ThoughtId) {
        let key = normalize(value);
        let remove_entry = self.entries.get_mut(&key).map_or_else(
            || {
                debug_assert!(false, "lexeme entry missing for value: {key:?}");
                false
            },
            |lexeme| {
                let removed = lexeme.refs.remove(id);
                debug_assert!(removed, "lexeme ref missing for id: {id:?}");
                lexeme.refs.is_empty()
            },
        );
        if remove_entry {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::make_thought_id;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Foo   Bar "), "foo bar");
        assert_eq!(normalize("foo bar"), normalize("FOO\tBAR"));
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn last_ref_removal_prunes_the_entry() {
        let mut index = LexemeIndex::default();
        let a = make_thought_id("a");
        let b = make_thought_id("b");
        index.add_ref("m", a);
        index.add_ref("M", b);
        assert_eq!(index.get("m").map(Lexeme::len), Some(2));

        index.remove_ref("m", &a);
        assert_eq!(index.get("m").map(Lexeme::len), Some(1));
        index.remove_ref("M", &b);
        assert!(index.get("m").is_none());
    }
}
