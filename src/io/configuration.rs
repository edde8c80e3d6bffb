//! Runtime configuration loading, validation, and pipeline constants

use crate::io::error::{config_invalid, fs_error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// Seeding and substitution
/// Default width of a wallpaper time slot in minutes
pub const DEFAULT_TIME_SLOT_MINUTES: u32 = 30;
/// Maximum substitution passes over a section before resolution halts
pub const SUBSTITUTION_PASS_LIMIT: usize = 32;

// Generation driver timing
/// Default total generation wait in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Default history poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Ceiling for the adaptively lengthened poll interval
pub const POLL_INTERVAL_CEILING_SECS: u64 = 30;
/// Retry attempts for transient transport failures
pub const RETRY_ATTEMPTS: usize = 3;
/// Backoff delays between retry attempts, in seconds
pub const RETRY_BACKOFF_SECS: [u64; 3] = [2, 4, 8];
/// Idle connections retained per host by the HTTP session
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 20;
/// User agent sent with every service request
pub const USER_AGENT: &str = concat!("comfywall/", env!("CARGO_PKG_VERSION"));

// Scheduling
/// Default blend radius around solar boundaries in minutes
pub const DEFAULT_BLEND_MINUTES: i64 = 30;
/// Theme used when configuration or scheduling yields nothing usable
pub const DEFAULT_THEME: &str = "default";

// Content layout
/// File extension of prompt templates
pub const TEMPLATE_EXTENSION: &str = "prompt";
/// File extension of atom files
pub const ATOM_EXTENSION: &str = "txt";

/// Image service connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Base URL of the ComfyUI instance
    pub base_url: String,
    /// Total generation wait in seconds (1..=3600)
    pub timeout: u64,
    /// History poll interval in seconds (1..=60)
    pub poll_interval: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8188".to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// User-declared binding of one monitor name to its output and setter
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorBinding {
    /// Compositor output name (e.g., `DP-1`)
    pub name: String,
    /// Resolution as a `WxH` string, used to select the workflow file
    pub resolution: String,
    /// Path the finished wallpaper is written to
    pub output: Option<String>,
    /// Setter command identifier overriding the global default
    pub command: Option<String>,
    /// Optional allowlist of template filenames for this monitor
    pub templates: Option<Vec<String>>,
}

impl MonitorBinding {
    /// Output path for this monitor, defaulting under the pictures directory
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => expand_tilde(path),
            None => dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("wallpapers")
                .join(format!("{}.png", self.name)),
        }
    }
}

/// A named content bundle of atoms and prompt templates
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Short tag joined with a monitor resolution to name a workflow file
    pub workflow_prefix: Option<String>,
    /// Template used when no seeded selection applies
    pub default_template: Option<String>,
}

impl ThemeConfig {
    /// Workflow prefix, falling back to the theme's own name
    pub fn prefix_or<'a>(&'a self, theme_name: &'a str) -> &'a str {
        self.workflow_prefix.as_deref().unwrap_or(theme_name)
    }

    /// Default template filename
    pub fn default_template(&self) -> &str {
        self.default_template.as_deref().unwrap_or("default.prompt")
    }
}

/// Optional per-workflow restriction of eligible templates
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowBinding {
    /// Allowlist of template filenames; absent means any template
    pub prompts: Option<Vec<String>>,
}

/// A theme name paired with a relative selection weight
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedTheme {
    /// Theme name
    pub name: String,
    /// Relative probability weight (>= 0)
    #[serde(default = "default_weight")]
    pub weight: f64,
}

const fn default_weight() -> f64 {
    1.0
}

/// Declarative day/night schedule with optional solar parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Latitude in degrees for solar computation
    pub latitude: Option<f64>,
    /// Longitude in degrees for solar computation
    pub longitude: Option<f64>,
    /// IANA timezone name; system local zone when absent
    pub timezone: Option<String>,
    /// Manual sunrise override, `HH:MM` in the local zone
    pub sunrise_time: Option<String>,
    /// Manual sunset override, `HH:MM` in the local zone
    pub sunset_time: Option<String>,
    /// Weighted themes active during the day window
    pub day_themes: Vec<WeightedTheme>,
    /// Weighted themes active during the night window
    pub night_themes: Vec<WeightedTheme>,
    /// Blend radius around each solar boundary in minutes
    pub blend_duration_minutes: Option<i64>,
}

impl ScheduleConfig {
    /// Blend radius in minutes, defaulting to [`DEFAULT_BLEND_MINUTES`]
    pub fn blend_minutes(&self) -> i64 {
        self.blend_duration_minutes.unwrap_or(DEFAULT_BLEND_MINUTES)
    }

    /// True when latitude and longitude are both configured
    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Prompt seeding settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptConfig {
    /// Width of a wallpaper time slot in minutes (1..=1440)
    pub time_slot_minutes: u32,
    /// Include the monitor name in the seed discriminator
    pub use_monitor_seed: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            time_slot_minutes: DEFAULT_TIME_SLOT_MINUTES,
            use_monitor_seed: true,
        }
    }
}

/// Wallpaper history sink settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Whether generated wallpapers are copied into the history directory
    pub enabled: bool,
    /// History directory override
    pub dir: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Desktop notification settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    /// Whether best-effort desktop notifications are emitted
    pub enabled: bool,
}

/// Fully validated runtime configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Image service connection settings
    pub service: ServiceConfig,
    /// Monitor bindings in configuration order
    pub monitors: Vec<MonitorBinding>,
    /// Theme bundles keyed by name
    pub themes: BTreeMap<String, ThemeConfig>,
    /// Per-workflow template restrictions keyed by workflow id
    pub workflows: BTreeMap<String, WorkflowBinding>,
    /// Day/night schedule
    pub schedule: ScheduleConfig,
    /// Prompt seeding settings
    pub prompt: PromptConfig,
    /// Wallpaper history sink settings
    pub history: HistoryConfig,
    /// Desktop notification settings
    pub notifications: NotificationConfig,
    /// Root directory the configuration was loaded from
    #[serde(skip)]
    config_dir: PathBuf,
}

impl Config {
    /// Load and validate configuration
    ///
    /// With no explicit path, reads `config.toml` under the default
    /// configuration directory; a missing file yields defaults so that
    /// preview commands work before `init` has run.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` on unreadable files, syntax errors, deprecated
    /// keys, or range violations.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => default_config_dir().join("config.toml"),
        };

        if !path.exists() {
            tracing::warn!(path = %path.display(), "configuration file not found, using defaults");
            let mut config = Self::default();
            config.config_dir = path.parent().map_or_else(default_config_dir, Path::to_path_buf);
            return Ok(config);
        }

        let text = std::fs::read_to_string(&path).map_err(|e| fs_error(&path, "read", e))?;
        let mut config = Self::from_toml(&text)?;
        config.config_dir = path.parent().map_or_else(default_config_dir, Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from TOML text and validate it
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` on syntax errors, deprecated keys, or range
    /// violations.
    pub fn from_toml(text: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(text)
            .map_err(|e| config_invalid("<root>", format!("TOML syntax error: {e}")))?;

        reject_deprecated(&value)?;

        let config: Self = value
            .try_into()
            .map_err(|e| config_invalid("<root>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every range and format constraint of the loaded values
    fn validate(&self) -> Result<()> {
        let timeout = self.service.timeout;
        if !(1..=3600).contains(&timeout) {
            return Err(config_invalid(
                "service.timeout",
                format!("must be between 1 and 3600 seconds, got {timeout}"),
            ));
        }

        let poll = self.service.poll_interval;
        if !(1..=60).contains(&poll) {
            return Err(config_invalid(
                "service.poll_interval",
                format!("must be between 1 and 60 seconds, got {poll}"),
            ));
        }

        let slot = self.prompt.time_slot_minutes;
        if !(1..=1440).contains(&slot) {
            return Err(config_invalid(
                "prompt.time_slot_minutes",
                format!("must be between 1 and 1440 minutes, got {slot}"),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for binding in &self.monitors {
            if !seen.insert(binding.name.as_str()) {
                return Err(config_invalid(
                    "monitors",
                    format!("monitor '{}' is declared more than once", binding.name),
                ));
            }
            if parse_resolution(&binding.resolution).is_none() {
                return Err(config_invalid(
                    &format!("monitors.{}.resolution", binding.name),
                    format!("expected WxH (e.g., 2560x1440), got '{}'", binding.resolution),
                ));
            }
        }

        self.validate_schedule()
    }

    fn validate_schedule(&self) -> Result<()> {
        let schedule = &self.schedule;

        if let Some(lat) = schedule.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(config_invalid(
                    "schedule.latitude",
                    format!("must be between -90 and 90 degrees, got {lat}"),
                ));
            }
        }
        if let Some(lon) = schedule.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(config_invalid(
                    "schedule.longitude",
                    format!("must be between -180 and 180 degrees, got {lon}"),
                ));
            }
        }
        if schedule.latitude.is_some() != schedule.longitude.is_some() {
            return Err(config_invalid(
                "schedule",
                "latitude and longitude must be configured together",
            ));
        }
        if let Some(tz) = &schedule.timezone {
            if tz.parse::<chrono_tz::Tz>().is_err() {
                return Err(config_invalid(
                    "schedule.timezone",
                    format!("unknown IANA timezone '{tz}'"),
                ));
            }
        }
        for (key, value) in [
            ("schedule.sunrise_time", &schedule.sunrise_time),
            ("schedule.sunset_time", &schedule.sunset_time),
        ] {
            if let Some(text) = value {
                if parse_clock(text).is_none() {
                    return Err(config_invalid(
                        key,
                        format!("expected HH:MM, got '{text}'"),
                    ));
                }
            }
        }
        let blend = schedule.blend_minutes();
        if !(0..=720).contains(&blend) {
            return Err(config_invalid(
                "schedule.blend_duration_minutes",
                format!("must be between 0 and 720 minutes, got {blend}"),
            ));
        }
        for (key, list) in [
            ("schedule.day_themes", &schedule.day_themes),
            ("schedule.night_themes", &schedule.night_themes),
        ] {
            for entry in list {
                if !entry.weight.is_finite() || entry.weight < 0.0 {
                    return Err(config_invalid(
                        key,
                        format!("weight for '{}' must be a finite number >= 0", entry.name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Root directory the configuration was loaded from
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Override the configuration root (used by tests and `--config`)
    pub fn set_config_dir(&mut self, dir: PathBuf) {
        self.config_dir = dir;
    }

    /// Directory holding workflow JSON files
    pub fn workflows_dir(&self) -> PathBuf {
        self.config_dir.join("workflows")
    }

    /// Root of a theme's atoms tree
    pub fn theme_atoms_dir(&self, theme: &str) -> PathBuf {
        self.config_dir.join("themes").join(theme).join("atoms")
    }

    /// Root of a theme's prompt template tree
    pub fn theme_prompts_dir(&self, theme: &str) -> PathBuf {
        self.config_dir.join("themes").join(theme).join("prompts")
    }

    /// Look up a theme by name
    pub fn theme(&self, name: &str) -> Option<&ThemeConfig> {
        self.themes.get(name)
    }

    /// Look up a monitor binding by name
    pub fn monitor(&self, name: &str) -> Option<&MonitorBinding> {
        self.monitors.iter().find(|m| m.name == name)
    }

    /// Configured monitor names in configuration order
    pub fn monitor_names(&self) -> Vec<String> {
        self.monitors.iter().map(|m| m.name.clone()).collect()
    }

    /// Path of the persisted rotation state file
    pub fn state_file(&self) -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| self.config_dir.clone())
            .join("comfywall")
            .join("rotation.json")
    }

    /// History directory, defaulting under the pictures directory
    pub fn history_dir(&self) -> PathBuf {
        match &self.history.dir {
            Some(dir) => expand_tilde(dir),
            None => dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("wallpapers")
                .join("history"),
        }
    }
}

/// Default configuration directory (`~/.config/comfywall`)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("comfywall")
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a `WxH` resolution string into width and height
pub fn parse_resolution(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.split_once('x')?;
    let width = w.parse::<u32>().ok()?;
    let height = h.parse::<u32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// Parse an `HH:MM` clock string into (hour, minute)
pub fn parse_clock(text: &str) -> Option<(u32, u32)> {
    let (h, m) = text.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour = h.parse::<u32>().ok()?;
    let minute = m.parse::<u32>().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

// Keys from retired configuration formats, each with a migration hint
const DEPRECATED_KEYS: &[(&str, &str)] = &[
    (
        "monitor_count",
        "declare one [[monitors]] entry per output instead of a count",
    ),
    (
        "workflow_path",
        "workflows are resolved per theme and resolution under workflows/",
    ),
    (
        "workflow_paths",
        "workflows are resolved per theme and resolution under workflows/",
    ),
    (
        "template_paths",
        "templates live under themes/<name>/prompts/",
    ),
];

/// Reject keys from retired configuration formats with actionable messages
fn reject_deprecated(value: &toml::Value) -> Result<()> {
    let Some(table) = value.as_table() else {
        return Ok(());
    };

    for (key, hint) in DEPRECATED_KEYS {
        if table.contains_key(*key) {
            return Err(config_invalid(key, format!("deprecated key: {hint}")));
        }
    }

    // Array-style workflows/templates predate per-id tables
    for key in ["workflows", "templates"] {
        if table.get(key).is_some_and(toml::Value::is_array) {
            return Err(config_invalid(
                key,
                format!("array-style {key} are no longer supported; use [{key}.\"<id>\"] tables"),
            ));
        }
    }

    if let Some(monitors) = table.get("monitors") {
        if monitors.is_integer() {
            return Err(config_invalid(
                "monitors",
                "a bare monitor count is no longer supported; declare one [[monitors]] entry per output",
            ));
        }
    }

    Ok(())
}
