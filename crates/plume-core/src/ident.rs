// SPDX-License-Identifier: Apache-2.0
//! Identifier and hashing utilities.
use blake3::Hasher;

/// Canonical 256-bit hash used throughout the engine for addressing thoughts,
/// paths, patches, and state snapshots.
pub type Hash = [u8; 32];

/// Strongly typed identifier for a thought in the document graph.
///
/// `ThoughtId` is an opaque 32-byte identifier (`Hash`). Fixture and test
/// thoughts use stable, label-derived ids via [`make_thought_id`]
/// (`blake3("thought:" || label)`); thoughts minted at runtime are derived
/// from the store's monotonic sequence instead.
///
/// Tooling must not assume that every `ThoughtId` corresponds to a
/// human-readable label, or that ids are reversible back into strings.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThoughtId(pub Hash);

impl ThoughtId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Canonical hash of a [`Path`](crate::path::Path)'s id chain.
///
/// Used as the multicursor selection key: two paths select the same location
/// iff their hashes are equal.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathHash(pub Hash);

impl PathHash {
    /// Returns the canonical byte representation of this hash.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Label of the distinguished root thought.
///
/// The root is never rendered, never indexed in the lexeme table, and is
/// protected from every mutating command.
pub const ROOT_LABEL: &str = "__ROOT__";

/// Produces a stable, domain-separated thought identifier (prefix
/// `b"thought:"`) using BLAKE3.
pub fn make_thought_id(label: &str) -> ThoughtId {
    let mut hasher = Hasher::new();
    hasher.update(b"thought:");
    hasher.update(label.as_bytes());
    ThoughtId(hasher.finalize().into())
}

/// Identifier of the distinguished root thought.
#[must_use]
pub fn root_thought_id() -> ThoughtId {
    make_thought_id(ROOT_LABEL)
}

/// Produces a sequence-derived thought identifier (prefix `b"thought#"`).
///
/// The sequence domain is disjoint from the label domain of
/// [`make_thought_id`], so minted ids can never collide with label-derived
/// fixture ids.
pub(crate) fn mint_thought_id(seq: u64) -> ThoughtId {
    let mut hasher = Hasher::new();
    hasher.update(b"thought#");
    hasher.update(&seq.to_le_bytes());
    ThoughtId(hasher.finalize().into())
}

/// Produces the canonical, domain-separated hash of an id chain
/// (prefix `b"path:"`, each id appended in order).
#[must_use]
pub fn path_hash(ids: &[ThoughtId]) -> PathHash {
    let mut hasher = Hasher::new();
    hasher.update(b"path:");
    hasher.update(&(ids.len() as u64).to_le_bytes());
    for id in ids {
        hasher.update(&id.0);
    }
    PathHash(hasher.finalize().into())
}
