// ─── Status Reporting ───
// User-visible status lines ("Up to date", "Upgrading to ...") are routed
// through an explicit handle rather than printed ad hoc, so each component
// receives the sink it reports to.

use std::sync::{Arc, Mutex};

pub trait StatusReporter: Send + Sync {
    fn status(&self, message: &str);
}

/// Shared handle passed to every component that reports status.
pub type StatusHandle = Arc<dyn StatusReporter>;

/// Keeps every status line in memory. Used by tests and by callers that
/// want to render the lines themselves.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<String>>,
}

impl MemoryReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl StatusReporter for MemoryReporter {
    fn status(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}
