//! Diagnostic message log.
//!
//! The client reports a human-readable trace of every operation to a
//! [`DiagnosticLog`]. [`MessageLog`] is the bundled in-memory sink, suitable
//! for showing recent activity to a user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An append-only sink for operation traces.
pub trait DiagnosticLog: Send + Sync {
    fn log(&self, source: &str, message: &str);
}

/// One recorded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.source, self.message)
        }
    }
}

/// In-memory message log, unbounded unless given a limit.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Mutex<VecDeque<LogEntry>>,
    limit: Option<usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the most recent `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Mutex::default(),
            limit: Some(limit),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, source: &str, message: String) {
        let mut entries = self.lock();
        entries.push_back(LogEntry {
            timestamp: Utc::now(),
            source: source.to_string(),
            message,
        });
        if let Some(limit) = self.limit {
            while entries.len() > limit {
                entries.pop_front();
            }
        }
    }

    /// Appends a message without a source.
    pub fn add(&self, message: impl Into<String>) {
        self.push("", message.into());
    }

    /// Appends `item`, verbatim if it is a string and as JSON otherwise, and
    /// hands it back.
    pub fn log_item<T: Serialize>(&self, item: T, source: &str) -> T {
        let message = match serde_json::to_value(&item) {
            Ok(serde_json::Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(e) => format!("<unserializable: {}>", e),
        };
        self.push(source, message);
        item
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Entries rendered as `source: message`.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl DiagnosticLog for MessageLog {
    fn log(&self, source: &str, message: &str) {
        self.push(source, message.to_string());
    }
}
