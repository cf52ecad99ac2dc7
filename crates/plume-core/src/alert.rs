// SPDX-License-Identifier: Apache-2.0
//! Ephemeral user-facing alerts with TTL and dedupe.
//!
//! Alerts are transient by contract: they never enter undo patches, so
//! undoing can never resurrect a stale message. The queue is keyed on the
//! engine's logical tick rather than wall-clock time, keeping the core
//! deterministic.

use std::collections::VecDeque;

use crate::thought::Timestamp;

/// Alert classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertKind {
    /// A multicursor batch skipped one selected path.
    BatchPathSkipped,
    /// A multicursor batch applied to no path at all.
    BatchEmpty,
}

/// One queued alert.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alert {
    /// Classification.
    pub kind: AlertKind,
    /// Short human-facing message.
    pub message: String,
    /// Tick the alert was raised at.
    pub created: Timestamp,
}

/// Bounded alert queue with tick-based TTL and a dedupe window.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertQueue {
    queue: VecDeque<Alert>,
    capacity: usize,
    ttl: u64,
    dedupe_window: u64,
}

impl AlertQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new(capacity: usize, ttl: u64, dedupe_window: u64) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
            dedupe_window,
        }
    }

    /// Pushes an alert, refreshing an identical recent entry (same kind and
    /// message within the dedupe window) instead of duplicating it.
    pub fn push(&mut self, kind: AlertKind, message: impl Into<String>, now: Timestamp) {
        let message = message.into();
        if let Some(existing) = self.queue.iter_mut().find(|a| {
            a.kind == kind
                && a.message == message
                && now.value().saturating_sub(a.created.value()) <= self.dedupe_window
        }) {
            existing.created = now;
            return;
        }
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(Alert {
            kind,
            message,
            created: now,
        });
    }

    /// Drops expired alerts.
    pub fn expire(&mut self, now: Timestamp) {
        let ttl = self.ttl;
        self.queue
            .retain(|a| now.value().saturating_sub(a.created.value()) < ttl);
    }

    /// Alerts still alive at `now`, oldest first.
    pub fn visible(&self, now: Timestamp) -> impl Iterator<Item = &Alert> {
        self.queue
            .iter()
            .filter(move |a| now.value().saturating_sub(a.created.value()) < self.ttl)
    }

    /// Returns `true` when no alert is queued (expired or not).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
