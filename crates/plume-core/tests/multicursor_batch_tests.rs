// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
mod common;

use common::{child_values, fixture, path_of, root_values};
use plume_core::{apply, AppState, BatchCommand, Command, Outcome};

fn select(state: &mut AppState, values: &[&str]) {
    let path = path_of(state, values);
    let outcome = apply(state, Command::AddMulticursor { path });
    assert!(outcome.is_ok());
}

fn run_batch(state: &mut AppState, command: BatchCommand) -> Outcome {
    match apply(state, Command::Batch { command }) {
        Ok(outcome) => outcome,
        Err(e) => panic!("batch failed: {e}"),
    }
}

#[test]
fn batch_move_down_shifts_the_selection_past_the_next_sibling() {
    let mut state = fixture("a\nb\nc\nd");
    let before = state.observable_hash();
    select(&mut state, &["b"]);
    select(&mut state, &["c"]);

    let outcome = run_batch(&mut state, BatchCommand::MoveThoughtDown);
    assert!(matches!(outcome, Outcome::Committed(_)));
    assert_eq!(root_values(&state), ["a", "d", "b", "c"]);
    assert!(state.multicursors().is_empty(), "selection clears after a batch");
    assert!(state.store().validate().is_ok());

    // The whole batch is one undo step.
    assert!(matches!(apply(&mut state, Command::Undo), Ok(Outcome::Undone)));
    assert_eq!(root_values(&state), ["a", "b", "c", "d"]);
    assert_eq!(state.observable_hash(), before);
}

#[test]
fn batch_move_up_is_bounded_at_the_top() {
    let mut state = fixture("a\nb\nc");
    select(&mut state, &["a"]);
    select(&mut state, &["b"]);

    let outcome = run_batch(&mut state, BatchCommand::MoveThoughtUp);
    // "a" is already first (boundary no-op); "b" swaps with it.
    assert!(matches!(outcome, Outcome::Committed(_)));
    assert_eq!(root_values(&state), ["b", "a", "c"]);
}

#[test]
fn batch_indent_nests_the_selection_under_the_previous_sibling() {
    let mut state = fixture("a\nb\nc");
    select(&mut state, &["b"]);
    select(&mut state, &["c"]);

    let outcome = run_batch(&mut state, BatchCommand::Indent);
    assert!(matches!(outcome, Outcome::Committed(_)));
    assert_eq!(root_values(&state), ["a"]);
    assert_eq!(child_values(&state, &["a"]), ["b", "c"]);

    assert!(matches!(apply(&mut state, Command::Undo), Ok(Outcome::Undone)));
    assert_eq!(root_values(&state), ["a", "b", "c"]);
}

#[test]
fn batch_delete_removes_every_selected_path() {
    let mut state = fixture("a\nb\nc\nd");
    select(&mut state, &["a"]);
    select(&mut state, &["c"]);

    let outcome = run_batch(&mut state, BatchCommand::Delete);
    assert!(matches!(outcome, Outcome::Committed(_)));
    assert_eq!(root_values(&state), ["b", "d"]);

    assert!(matches!(apply(&mut state, Command::Undo), Ok(Outcome::Undone)));
    assert_eq!(root_values(&state), ["a", "b", "c", "d"]);
}

#[test]
fn batch_new_sibling_inserts_after_each_selection() {
    let mut state = fixture("a\nb");
    select(&mut state, &["a"]);
    select(&mut state, &["b"]);

    let outcome = run_batch(
        &mut state,
        BatchCommand::NewSibling {
            value: "n".into(),
        },
    );
    assert!(matches!(outcome, Outcome::Committed(_)));
    assert_eq!(root_values(&state), ["a", "n", "b", "n"]);

    assert!(matches!(apply(&mut state, Command::Undo), Ok(Outcome::Undone)));
    assert_eq!(root_values(&state), ["a", "b"]);
}

#[test]
fn failed_paths_are_skipped_and_alerted_while_the_rest_apply() {
    let mut state = fixture("a\nb");
    select(&mut state, &["a"]);
    select(&mut state, &["b"]);
    // Invalidate one selection behind the multicursor's back.
    let delete_path = path_of(&state, &["b"]);
    let outcome = apply(
        &mut state,
        Command::Delete {
            path: delete_path,
        },
    );
    assert!(outcome.is_ok());

    let outcome = run_batch(&mut state, BatchCommand::Archive);
    assert!(matches!(outcome, Outcome::Committed(_)));
    assert!(!state.alerts().is_empty(), "the skipped path raises an alert");
    assert_eq!(root_values(&state), Vec::<String>::new());
    assert!(state.store().validate().is_ok());
}

#[test]
fn a_batch_with_no_applicable_path_pushes_no_patch() {
    let mut state = fixture("a");
    select(&mut state, &["a"]);
    let delete_path = path_of(&state, &["a"]);
    let outcome = apply(
        &mut state,
        Command::Delete {
            path: delete_path,
        },
    );
    assert!(outcome.is_ok());
    let depth = state.history().undo_depth();

    let outcome = run_batch(&mut state, BatchCommand::Delete);
    assert!(matches!(outcome, Outcome::NoOp));
    assert_eq!(state.history().undo_depth(), depth);
    assert!(!state.alerts().is_empty());
}

#[test]
fn an_empty_selection_is_a_noop() {
    let mut state = fixture("a");
    let outcome = run_batch(&mut state, BatchCommand::MoveThoughtDown);
    assert!(matches!(outcome, Outcome::NoOp));
}
