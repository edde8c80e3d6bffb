//! Connected display outputs and how wallpapers reach them

/// Compositor subprocess probing for connected outputs
pub mod detect;
/// Persisted rotation cursor over configured monitors
pub mod rotation;
/// External wallpaper setter invocation
pub mod setter;

use serde::Serialize;

/// A connected display output as reported by the compositor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Monitor {
    /// Compositor output name (e.g., `DP-1`); the monitor's identity
    pub name: String,
    /// Active mode as a `WxH` string
    pub resolution: String,
}
