// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code)]

use plume_core::{
    apply, AppState, Command, Context, Outcome, Path, StateView,
};

/// Imports a two-space-indented outline through the command boundary.
///
/// Each line becomes one thought; indentation depth selects the parent.
pub fn import_outline(state: &mut AppState, outline: &str) {
    let mut stack: Vec<Path> = Vec::new();
    for line in outline.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let depth = (line.len() - line.trim_start().len()) / 2;
        let value = line.trim().to_owned();
        stack.truncate(depth);
        let parent = stack.last().cloned();
        let outcome = apply(state, Command::NewThought { parent, value });
        assert!(
            matches!(outcome, Ok(Outcome::Committed(_))),
            "import failed on line {line:?}: {outcome:?}"
        );
        let created = state.cursor().cloned().expect("creation moves the cursor");
        stack.push(created);
    }
}

/// Fresh state seeded from an outline, cursor cleared afterwards.
pub fn fixture(outline: &str) -> AppState {
    let mut state = AppState::new();
    import_outline(&mut state, outline);
    let outcome = apply(&mut state, Command::SetCursor { path: None });
    assert!(outcome.is_ok());
    state
}

/// Structural path for a value chain; panics when it does not resolve.
pub fn path_of(state: &AppState, values: &[&str]) -> Path {
    let view = StateView::new(state);
    view.context_to_path(&Context::from(values))
        .unwrap_or_else(|| panic!("no path for context {values:?}"))
        .into_path()
}

/// Focuses a value chain through the command boundary.
pub fn focus(state: &mut AppState, values: &[&str]) {
    let path = path_of(state, values);
    let outcome = apply(state, Command::SetCursor { path: Some(path) });
    assert!(outcome.is_ok());
}

/// Value chain of the current cursor, for readable assertions.
pub fn cursor_values(state: &AppState) -> Vec<String> {
    let view = StateView::new(state);
    state
        .cursor()
        .and_then(|p| view.path_to_context(p))
        .map(|c| c.values().to_vec())
        .unwrap_or_default()
}

/// Values of the visible root-level thoughts in display order.
pub fn root_values(state: &AppState) -> Vec<String> {
    let view = StateView::new(state);
    view.visible_children_at(None)
        .iter()
        .filter_map(|p| view.thought(&p.last()).map(|t| t.value.clone()))
        .collect()
}

/// Values of the visible children of a value chain, in display order.
pub fn child_values(state: &AppState, values: &[&str]) -> Vec<String> {
    let view = StateView::new(state);
    let path = path_of(state, values);
    view.visible_children_at(Some(&path))
        .iter()
        .filter_map(|p| view.thought(&p.last()).map(|t| t.value.clone()))
        .collect()
}
