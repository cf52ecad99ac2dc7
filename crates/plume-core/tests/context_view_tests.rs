// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
mod common;

use common::{child_values, fixture, path_of};
use plume_core::{
    apply, Command, ContextRecurrence, Outcome, StateView,
};

fn toggle(state: &mut plume_core::AppState, values: &[&str]) {
    let path = path_of(state, values);
    let outcome = apply(state, Command::ToggleContextView { path });
    assert!(matches!(outcome, Ok(Outcome::Committed(_))));
}

#[test]
fn entries_classify_cyclic_direct_and_tangential_contexts() {
    // "m" occurs under a (self), under a/b (shares ancestor a), and under c
    // (no shared ancestor).
    let mut state = fixture("a\n  m\n  b\n    m\nc\n  m");
    toggle(&mut state, &["a", "m"]);

    let view = StateView::new(&state);
    let am = path_of(&state, &["a", "m"]);
    let entries = view.context_entries(&am);
    assert_eq!(entries.len(), 3);

    let values: Vec<String> = entries
        .iter()
        .filter_map(|e| view.thought(&e.context).map(|t| t.value.clone()))
        .collect();
    assert_eq!(values, ["a", "b", "c"]);
    assert_eq!(entries[0].recurrence, ContextRecurrence::Cyclic);
    assert_eq!(entries[1].recurrence, ContextRecurrence::Direct);
    assert_eq!(entries[2].recurrence, ContextRecurrence::Tangential);
}

#[test]
fn context_view_children_render_context_parents() {
    let mut state = fixture("a\n  m\n    x\nb\n  m\n    y");
    toggle(&mut state, &["a", "m"]);
    assert_eq!(child_values(&state, &["a", "m"]), ["a", "b"]);
}

#[test]
fn editing_through_a_context_entry_edits_the_occurrence() {
    let mut state = fixture("a\n  m\n    x\nb\n  m\n    y");
    toggle(&mut state, &["a", "m"]);

    // Path a/m/b resolves to the "m" that lives under b.
    let entry_b = {
        let view = StateView::new(&state);
        let am = path_of(&state, &["a", "m"]);
        view.visible_children_at(Some(&am))
            .into_iter()
            .nth(1)
            .unwrap_or_else(|| panic!("expected a second context entry"))
    };

    let outcome = apply(
        &mut state,
        Command::Edit {
            path: entry_b,
            value: "renamed".into(),
        },
    );
    assert!(matches!(outcome, Ok(Outcome::Committed(_))));
    assert_eq!(child_values(&state, &["b"]), ["renamed"]);
    assert_eq!(child_values(&state, &["a"]), ["m"]);
}

#[test]
fn toggling_twice_restores_the_structural_children() {
    let mut state = fixture("a\n  m\n    x\nb\n  m");
    toggle(&mut state, &["a", "m"]);
    assert_eq!(child_values(&state, &["a", "m"]), ["a", "b"]);
    toggle(&mut state, &["a", "m"]);
    assert_eq!(child_values(&state, &["a", "m"]), ["x"]);
}

#[test]
fn archived_occurrences_do_not_surface_as_contexts() {
    let mut state = fixture("a\n  m\nb\n  m\nc\n  m");
    let archive_path = path_of(&state, &["c", "m"]);
    let outcome = apply(
        &mut state,
        Command::Archive {
            path: archive_path,
        },
    );
    assert!(matches!(outcome, Ok(Outcome::Committed(_))));

    toggle(&mut state, &["a", "m"]);
    assert_eq!(child_values(&state, &["a", "m"]), ["a", "b"]);
}
