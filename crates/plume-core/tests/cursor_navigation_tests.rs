// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
mod common;

use common::{cursor_values, fixture, focus, path_of};
use plume_core::{
    apply, cursor_down, cursor_up, is_expanded, Command, Outcome, SortDirection, SortPreference,
};

fn step_down(state: &mut plume_core::AppState) {
    let next = cursor_down(state);
    let outcome = apply(state, Command::SetCursor { path: next });
    assert!(outcome.is_ok());
}

fn step_up(state: &mut plume_core::AppState) {
    let next = cursor_up(state);
    let outcome = apply(state, Command::SetCursor { path: next });
    assert!(outcome.is_ok());
}

#[test]
fn down_moves_from_a_to_b_at_the_root() {
    let mut state = fixture("a\nb");
    focus(&mut state, &["a"]);
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["b"]);
}

#[test]
fn down_with_no_cursor_selects_the_first_root_thought() {
    let mut state = fixture("a\nb");
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a"]);
}

#[test]
fn down_is_idempotent_on_the_last_visible_thought() {
    let mut state = fixture("a\nb");
    focus(&mut state, &["b"]);
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["b"]);
}

#[test]
fn up_is_idempotent_on_the_first_visible_thought() {
    let mut state = fixture("a\nb");
    focus(&mut state, &["a"]);
    step_up(&mut state);
    assert_eq!(cursor_values(&state), ["a"]);
}

#[test]
fn down_descends_into_an_active_context_view() {
    let mut state = fixture("a\n  m\n    x\nb\n  m\n    y");
    focus(&mut state, &["a", "m"]);
    let am = path_of(&state, &["a", "m"]);
    let outcome = apply(&mut state, Command::ToggleContextView { path: am });
    assert!(matches!(outcome, Ok(Outcome::Committed(_))));

    // First context of "m" is its own parent "a" (the cyclic self context).
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a", "m", "a"]);

    // Descending the cyclic entry lands on the occurrence's own children.
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a", "m", "a", "x"]);
}

#[test]
fn leaving_a_context_exhausts_contexts_before_structure() {
    let mut state = fixture("a\n  m\n    x\nb\n  m\n    y");
    focus(&mut state, &["a", "m"]);
    let am = path_of(&state, &["a", "m"]);
    let outcome = apply(&mut state, Command::ToggleContextView { path: am });
    assert!(outcome.is_ok());

    for _ in 0..2 {
        step_down(&mut state);
    }
    assert_eq!(cursor_values(&state), ["a", "m", "a", "x"]);

    // Next stop is the *next context* "b", not the structural parent.
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a", "m", "b"]);

    // Past the last context, navigation bubbles out of the view entirely.
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a", "m", "b", "y"]);
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["b"]);
}

#[test]
fn suppressed_single_context_view_descends_structurally() {
    let mut state = fixture("a\n  m\n    x");
    focus(&mut state, &["a", "m"]);
    let am = path_of(&state, &["a", "m"]);
    let outcome = apply(&mut state, Command::ToggleContextView { path: am });
    assert!(outcome.is_ok());

    // "m" occurs once, so the view renders as inactive.
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a", "m", "x"]);
}

#[test]
fn alphabetical_sort_governs_root_navigation() {
    let mut state = fixture("c\na\nb");
    let outcome = apply(
        &mut state,
        Command::SetSort {
            path: None,
            preference: SortPreference::Alphabetical(SortDirection::Asc),
        },
    );
    assert!(matches!(outcome, Ok(Outcome::Committed(_))));

    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["a"]);
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["b"]);
    step_down(&mut state);
    assert_eq!(cursor_values(&state), ["c"]);
}

#[test]
fn expansion_follows_the_cursor_chain() {
    let mut state = fixture("a\n  x\nb");
    focus(&mut state, &["a", "x"]);
    let a = path_of(&state, &["a"]);
    let b = path_of(&state, &["b"]);
    assert!(is_expanded(&state, &a));
    assert!(!is_expanded(&state, &b));
}

#[test]
fn up_enters_parent_from_first_child() {
    let mut state = fixture("a\n  x\nb");
    focus(&mut state, &["a", "x"]);
    step_up(&mut state);
    assert_eq!(cursor_values(&state), ["a"]);
}
