// SPDX-License-Identifier: Apache-2.0

// Telemetry helpers for JSONL logging when the `telemetry` feature is enabled.
// Manually formats JSON to avoid a non-deterministic serde_json dependency.

use crate::ident::Hash;
use crate::thought::Timestamp;

#[inline]
fn short_digest(h: &Hash) -> String {
    #[cfg(feature = "telemetry")]
    {
        let mut short = [0u8; 8];
        short.copy_from_slice(&h[0..8]);
        return hex::encode(short);
    }
    #[allow(unreachable_code)]
    String::new()
}

#[cfg(feature = "telemetry")]
fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

#[cfg(feature = "telemetry")]
fn emit(kind: &str, tick: Timestamp, name: &str, digest: &Hash) {
    use std::io::Write as _;
    // Manually format JSON to avoid serde_json dependency
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"tick":{},"event":"{}","command":"{}","patch_digest_short":"{}"}}"#,
        ts_micros(),
        tick.value(),
        kind,
        name,
        short_digest(digest)
    );
    let _ = out.write_all(b"\n");
}

/// Emits a commit telemetry event for a committed patch.
///
/// Logs the tick, command name, and patch digest (shortened) as a JSON line
/// to stdout when the `telemetry` feature is enabled. Best-effort: I/O
/// errors are ignored and timestamps fall back to 0 on clock errors.
#[cfg(feature = "telemetry")]
pub fn committed(tick: Timestamp, name: &str, digest: &Hash) {
    emit("committed", tick, name, digest);
}

/// Emits an undo telemetry event.
///
/// Best-effort, see [`committed`].
#[cfg(feature = "telemetry")]
pub fn undone(tick: Timestamp, name: &str, digest: &Hash) {
    emit("undone", tick, name, digest);
}

/// Emits a redo telemetry event.
///
/// Best-effort, see [`committed`].
#[cfg(feature = "telemetry")]
pub fn redone(tick: Timestamp, name: &str, digest: &Hash) {
    emit("redone", tick, name, digest);
}

