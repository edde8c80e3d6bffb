//! Best-effort desktop notifications
//!
//! Notification failure must never affect the pipeline outcome, so every
//! path here degrades to a debug log entry.

use std::process::{Command, Stdio};

/// Sends desktop notifications through `notify-send`
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    /// Create a notifier; a disabled one swallows every event
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Emit a notification, ignoring all failures
    pub fn notify(&self, summary: &str, body: &str) {
        if !self.enabled {
            return;
        }

        let result = Command::new("notify-send")
            .arg("--app-name=comfywall")
            .arg(summary)
            .arg(body)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::debug!(%status, "notify-send exited non-zero"),
            Err(e) => tracing::debug!(error = %e, "notify-send unavailable"),
        }
    }
}
