//! Human-readable diagnostics log produced while composing contributions.
//!
//! Entries are plain strings so they can be shipped to operators as-is.
//! Every entry is mirrored to `tracing` at a matching level.

use tracing::{debug, error, warn};

/// Prefix an error message the same way the diagnostics log does.
pub fn error_message(msg: impl AsRef<str>) -> String {
    format!("Error: {}", msg.as_ref())
}

/// Prefix a warning message the same way the diagnostics log does.
pub fn warning_message(msg: impl AsRef<str>) -> String {
    format!("Warning: {}", msg.as_ref())
}

/// Ordered, append-only diagnostics log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Informational entry (successful step).
    pub fn note(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(target: "wizard_composer::diagnostics", "{}", msg);
        self.entries.push(msg);
    }

    /// Non-fatal problem; composition continues.
    pub fn warning(&mut self, msg: impl AsRef<str>) {
        let msg = warning_message(msg);
        warn!(target: "wizard_composer::diagnostics", "{}", msg);
        self.entries.push(msg);
    }

    /// Fatal problem recorded right before the operation aborts.
    pub fn error(&mut self, msg: impl AsRef<str>) {
        let msg = error_message(msg);
        error!(target: "wizard_composer::diagnostics", "{}", msg);
        self.entries.push(msg);
    }

    /// Append pre-rendered entries (e.g. loader warnings) without re-prefixing.
    pub fn extend_raw<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.entries.extend(entries);
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}
