// SPDX-License-Identifier: Apache-2.0
//! plume-core: deterministic outline document engine.
//!
//! Thoughts form a hierarchy in which one value may occur under many parents
//! at once. The engine owns the content-addressed thought graph and its
//! value index, resolves logical paths against the graph's many-parents
//! reality (context views included), computes cursor movement over the
//! flattened visible document, and records every committed command as a
//! reversible patch grouped into coherent undo steps.
//!
//! The whole engine is a single explicit state value threaded through
//! `apply(state, command)`; there are no hidden singletons and no I/O.
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
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod alert;
mod command;
mod context_view;
mod cursor;
mod history;
mod ident;
mod lexeme;
mod multicursor;
mod observer;
mod patch;
mod path;
#[cfg(feature = "serde")]
mod serializable;
mod state;
mod state_view;
mod store;
mod telemetry;
mod thought;
mod view;

// Re-exports for stable public API
/// Ephemeral alerts (never recorded in undo patches).
pub use alert::{Alert, AlertKind, AlertQueue};
/// The command boundary: tagged operations, `apply`, and its error taxonomy.
pub use command::{apply, Command, CommandError, JumpDirection, Outcome, PatchSummary};
/// Context view engine: entries, recurrence classification, activity.
pub use context_view::{
    context_entries, is_context_view_active, ContextEntry, ContextRecurrence,
};
/// Cursor navigation over document order.
pub use cursor::{cursor_down, cursor_up};
/// Undo/redo stacks, grouping, and the jump-to-edit history.
pub use history::{redo, undo, History, JumpHistory};
/// Canonical ids and domain-separated hashing helpers.
pub use ident::{
    make_thought_id, path_hash, root_thought_id, Hash, PathHash, ThoughtId, ROOT_LABEL,
};
/// The secondary value index.
pub use lexeme::{normalize, Lexeme};
/// Multicursor batch commands.
pub use multicursor::BatchCommand;
/// Fire-and-forget patch observation.
pub use observer::{apply_observed, ObserverSet, PatchObserver};
/// Reversible patch records.
pub use patch::{PatchOp, UndoPatch};
/// Paths, simple paths, contexts, and the conversions between them.
pub use path::{
    context_to_path, path_to_context, resolve_chain, rooted_parent_of, simplify_path,
    structural_path, thought_at, Context, Path, SimplePath,
};
#[cfg(feature = "serde")]
/// Persisted state shape (`serde` feature).
pub use serializable::{RestoreError, SerializableState};
/// The state aggregate and engine options.
pub use state::{AppState, EngineOptions};
/// Read-only selector facade.
pub use state_view::StateView;
/// The thought graph store and its invariants.
pub use store::{InvariantViolation, StoreError, ThoughtStore};
/// Thought records, ranks, timestamps, and attribute conventions.
pub use thought::{
    is_attribute_value, Rank, Thought, Timestamp, ATTR_ARCHIVE, ATTR_READONLY, ATTR_SORT,
    RANK_GAP,
};
/// Document view resolution: sorting, attribute filtering, visibility.
pub use view::{
    is_expanded, sort_preference, visible_child_ids, visible_children_of, SortDirection,
    SortPreference,
};
