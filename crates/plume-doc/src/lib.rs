// SPDX-License-Identifier: Apache-2.0
//! Canonical exportable outline representation shared across Plume tools.
//! Pure data (a nested value tree) with deterministic hashing/serialization.
//!
//! The tree is produced by a value-ordered walk of the visible document:
//! attribute children are hidden, sort preferences are applied, and active
//! context views are flattened as ordinary children. Formatting the tree
//! (text, HTML, anything else) is a consumer concern; this crate only fixes
//! the walk and the canonical bytes.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

use ciborium::de::from_reader;
use ciborium::ser::into_writer;
use serde::{Deserialize, Serialize};

use plume_core::{Path, StateView};

/// Blake3 digest bytes (32 bytes).
pub type Hash32 = [u8; 32];

/// One exported outline node: a value and its exported children, in display
/// order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OutlineNode {
    /// Display value.
    pub value: String,
    /// Children in display order.
    pub children: Vec<OutlineNode>,
}

/// Depth cap for eager walks.
///
/// Cursor navigation may descend cyclic context views forever, one hop at a
/// time; an eager export must not. Past the cap, children are cut off.
pub const MAX_EXPORT_DEPTH: usize = 64;

/// Exports the subtree at `path` as a value tree.
///
/// Returns `None` when the path does not resolve. Children follow the
/// visible document order: attributes hidden, sort preferences applied,
/// active context views flattened (each context entry carries the context
/// parent's value, with the occurrence's children underneath).
#[must_use]
pub fn subtree(view: &StateView<'_>, path: &Path, max_depth: usize) -> Option<OutlineNode> {
    let id = path.last();
    let value = view.thought(&id)?.value.clone();
    Some(walk(view, path, value, max_depth))
}

/// Exports the whole document (every root-level thought) as one tree rooted
/// at an empty value.
#[must_use]
pub fn document(view: &StateView<'_>, max_depth: usize) -> OutlineNode {
    let children = view
        .visible_children_at(None)
        .into_iter()
        .filter_map(|p| subtree(view, &p, max_depth.saturating_sub(1)))
        .collect();
    OutlineNode {
        value: String::new(),
        children,
    }
}

fn walk(view: &StateView<'_>, path: &Path, value: String, depth: usize) -> OutlineNode {
    if depth == 0 {
        return OutlineNode {
            value,
            children: Vec::new(),
        };
    }
    let children = view
        .visible_children_at(Some(path))
        .into_iter()
        .filter_map(|child| {
            let child_value = view.thought(&child.last())?.value.clone();
            Some(walk(view, &child, child_value, depth - 1))
        })
        .collect();
    OutlineNode { value, children }
}

/// Encodes a tree as canonical CBOR bytes.
pub fn encode(node: &OutlineNode) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    into_writer(node, &mut bytes)?;
    Ok(bytes)
}

/// Decodes a tree from CBOR bytes.
pub fn decode(bytes: &[u8]) -> anyhow::Result<OutlineNode> {
    Ok(from_reader(bytes)?)
}

/// Canonical digest of a tree (blake3 over its canonical CBOR bytes).
pub fn digest(node: &OutlineNode) -> anyhow::Result<Hash32> {
    Ok(*blake3::hash(&encode(node)?).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::{apply, AppState, Command, Outcome};

    fn outline(value: &str, children: Vec<OutlineNode>) -> OutlineNode {
        OutlineNode {
            value: value.into(),
            children,
        }
    }

    fn seed(state: &mut AppState, parent: Option<&Path>, value: &str) -> Path {
        let outcome = apply(
            state,
            Command::NewThought {
                parent: parent.cloned(),
                value: value.into(),
            },
        );
        assert!(matches!(outcome, Ok(Outcome::Committed(_))));
        state
            .cursor()
            .cloned()
            .unwrap_or_else(|| panic!("creation did not move the cursor"))
    }

    #[test]
    fn document_walk_follows_display_order() {
        let mut state = AppState::new();
        let a = seed(&mut state, None, "a");
        seed(&mut state, Some(&a), "x");
        seed(&mut state, None, "b");

        let view = StateView::new(&state);
        let doc = document(&view, MAX_EXPORT_DEPTH);
        assert_eq!(
            doc,
            outline(
                "",
                vec![outline("a", vec![outline("x", vec![])]), outline("b", vec![])]
            )
        );
    }

    #[test]
    fn depth_cap_bounds_the_walk() {
        let mut state = AppState::new();
        let a = seed(&mut state, None, "a");
        let x = seed(&mut state, Some(&a), "x");
        seed(&mut state, Some(&x), "y");

        let view = StateView::new(&state);
        let doc = document(&view, 2);
        assert_eq!(
            doc,
            outline("", vec![outline("a", vec![outline("x", vec![])])])
        );
    }

    #[test]
    fn codec_round_trips_and_digest_is_stable() {
        let tree = outline("a", vec![outline("b", vec![]), outline("c", vec![])]);
        let bytes = match encode(&tree) {
            Ok(b) => b,
            Err(e) => panic!("encode failed: {e}"),
        };
        let back = match decode(&bytes) {
            Ok(t) => t,
            Err(e) => panic!("decode failed: {e}"),
        };
        assert_eq!(back, tree);
        let d1 = digest(&tree);
        let d2 = digest(&back);
        assert!(matches!((d1, d2), (Ok(a), Ok(b)) if a == b));
    }
}
