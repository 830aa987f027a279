//! The per-instance diagnostics log.
//!
//! Every expected failure and notable internal event lands here as a
//! [`Diagnostic`], mirrored to `tracing`, so CLI and batch callers can
//! inspect what went wrong after the fact instead of handling errors
//! per call.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// One logged event: when, which operation, and what happened.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub timestamp: DateTime<Utc>,
    pub caller: &'static str,
    pub status: String,
}

/// Append-only log behind a mutex so the owning handle stays
/// `&self`-operable.
#[derive(Default)]
pub struct DiagnosticLog {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticLog {
    pub fn record(&self, caller: &'static str, status: impl Into<String>) {
        let status = status.into();
        warn!(caller, %status, "diagnostic");
        self.entries
            .lock()
            .expect("lock poisoned")
            .push(Diagnostic {
                timestamp: Utc::now(),
                caller,
                status,
            });
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().expect("lock poisoned").clone()
    }
}
