/// Command-line interface and command dispatch
pub mod cli;
/// Runtime configuration and pipeline constants
pub mod configuration;
/// Error types and exit-code mapping
pub mod error;
/// Best-effort desktop notifications
pub mod notify;
/// Wallpaper output writing and the history sink
pub mod output;
/// Terminal progress display
pub mod progress;
