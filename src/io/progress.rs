//! Terminal progress display for the generation wait

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;
use std::time::Duration;

static POLL_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:30.cyan/blue}] {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Progress bar tracking elapsed wait against the generation timeout
///
/// Quiet runs simply never construct one; every driver entry point takes an
/// `Option<&PollProgress>`.
pub struct PollProgress {
    bar: ProgressBar,
}

impl PollProgress {
    /// Create a progress bar for one monitor's generation
    pub fn new(monitor: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(POLL_STYLE.clone());
        bar.set_prefix(monitor.to_string());
        Self { bar }
    }

    /// Report elapsed wait, total budget, and the current driver state
    pub fn observe(&self, elapsed: Duration, timeout: Duration, state: &str) {
        self.bar.set_length(timeout.as_secs());
        self.bar.set_position(elapsed.as_secs().min(timeout.as_secs()));
        self.bar
            .set_message(format!("{state} {}s/{}s", elapsed.as_secs(), timeout.as_secs()));
    }

    /// Clear the bar with a final state message
    pub fn finish(&self, state: &str) {
        self.bar.finish_with_message(state.to_string());
    }
}
