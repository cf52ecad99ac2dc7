// SPDX-License-Identifier: Apache-2.0
//! Fire-and-forget observer port for committed patches.
//!
//! Asynchronous boundaries (persistence writes, sync transports) observe
//! committed patches; the core never waits on them. Observers receive the
//! patch as it sits on the undo stack — after grouping — so what they see is
//! exactly what one undo will reverse.

use crate::command::{self, Command, CommandError, Outcome};
use crate::patch::UndoPatch;
use crate::state::AppState;

/// A consumer of committed patches.
pub trait PatchObserver {
    /// Called after a patch (possibly grouped into the previous step) has
    /// been committed. Must not assume it can influence the commit.
    fn patch_committed(&mut self, patch: &UndoPatch);
}

/// An ordered set of registered observers.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn PatchObserver>>,
}

impl core::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}

impl ObserverSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer; notification order is registration order.
    pub fn register(&mut self, observer: Box<dyn PatchObserver>) {
        self.observers.push(observer);
    }

    /// Notifies every observer of a committed patch.
    pub fn notify(&mut self, patch: &UndoPatch) {
        for obs in &mut self.observers {
            obs.patch_committed(patch);
        }
    }
}

/// Applies a command and notifies observers of the resulting commit.
///
/// Equivalent to [`command::apply`] followed by a notification with the top
/// of the undo stack (the grouped step the commit landed in).
pub fn apply_observed(
    state: &mut AppState,
    command: Command,
    observers: &mut ObserverSet,
) -> Result<Outcome, CommandError> {
    let outcome = command::apply(state, command)?;
    if matches!(outcome, Outcome::Committed(_)) {
        if let Some(patch) = state.history().latest() {
            observers.notify(patch);
        }
    }
    Ok(outcome)
}
