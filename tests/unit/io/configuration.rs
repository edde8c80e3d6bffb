//! Validates configuration parsing, defaults, ranges, and deprecations

use comfywall::io::configuration::{parse_clock, parse_resolution, Config};
use comfywall::PipelineError;

const FULL: &str = r#"
[service]
base_url = "http://comfy.local:8188"
timeout = 600
poll_interval = 10

[[monitors]]
name = "DP-1"
resolution = "2560x1440"
output = "~/Pictures/wallpapers/DP-1.png"
command = "swww"
templates = ["default.prompt"]

[[monitors]]
name = "HDMI-A-1"
resolution = "1920x1080"

[themes.dark]
workflow_prefix = "z-image"
default_template = "moody.prompt"

[workflows."z-image-2560x1440"]
prompts = ["default.prompt", "moody.prompt"]

[schedule]
latitude = 52.52
longitude = 13.405
timezone = "Europe/Berlin"
day_themes = [{ name = "default", weight = 1.0 }]
night_themes = [{ name = "nsfw", weight = 1.0 }]
blend_duration_minutes = 45

[prompt]
time_slot_minutes = 15
use_monitor_seed = true
"#;

#[test]
fn test_full_config_parses() {
    let config = Config::from_toml(FULL).expect("parse");
    assert_eq!(config.service.timeout, 600);
    assert_eq!(config.monitor_names(), ["DP-1", "HDMI-A-1"]);
    assert_eq!(config.themes["dark"].workflow_prefix.as_deref(), Some("z-image"));
    assert_eq!(config.schedule.blend_minutes(), 45);
    assert_eq!(config.prompt.time_slot_minutes, 15);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_toml("").expect("parse");
    assert_eq!(config.service.timeout, 300);
    assert_eq!(config.service.poll_interval, 5);
    assert_eq!(config.prompt.time_slot_minutes, 30);
    assert!(config.prompt.use_monitor_seed);
    assert_eq!(config.schedule.blend_minutes(), 30);
    assert!(config.monitors.is_empty());
}

#[test]
fn test_monitor_order_preserved() {
    let text = r#"
[[monitors]]
name = "C"
resolution = "1x1"
[[monitors]]
name = "A"
resolution = "1x1"
[[monitors]]
name = "B"
resolution = "1x1"
"#;
    let config = Config::from_toml(text).expect("parse");
    assert_eq!(config.monitor_names(), ["C", "A", "B"]);
}

fn assert_invalid(text: &str, key_fragment: &str) {
    match Config::from_toml(text) {
        Err(PipelineError::ConfigInvalid { key, .. }) => {
            assert!(
                key.contains(key_fragment),
                "expected key containing '{key_fragment}', got '{key}'"
            );
        }
        Err(other) => panic!("expected ConfigInvalid, got {other:?}"),
        Ok(_) => panic!("expected failure for: {text}"),
    }
}

#[test]
fn test_timeout_range_enforced() {
    assert_invalid("[service]\ntimeout = 0\n", "service.timeout");
    assert_invalid("[service]\ntimeout = 3601\n", "service.timeout");
}

#[test]
fn test_poll_interval_range_enforced() {
    assert_invalid("[service]\npoll_interval = 0\n", "service.poll_interval");
    assert_invalid("[service]\npoll_interval = 61\n", "service.poll_interval");
}

#[test]
fn test_slot_width_range_enforced() {
    assert_invalid("[prompt]\ntime_slot_minutes = 0\n", "prompt.time_slot_minutes");
    assert_invalid("[prompt]\ntime_slot_minutes = 2000\n", "prompt.time_slot_minutes");
}

#[test]
fn test_malformed_resolution_rejected() {
    assert_invalid(
        "[[monitors]]\nname = \"DP-1\"\nresolution = \"wide\"\n",
        "monitors.DP-1.resolution",
    );
    assert_invalid(
        "[[monitors]]\nname = \"DP-1\"\nresolution = \"0x1080\"\n",
        "monitors.DP-1.resolution",
    );
}

#[test]
fn test_duplicate_monitor_names_rejected() {
    let text = r#"
[[monitors]]
name = "DP-1"
resolution = "1x1"
[[monitors]]
name = "DP-1"
resolution = "2x2"
"#;
    assert_invalid(text, "monitors");
}

#[test]
fn test_latitude_longitude_validated() {
    assert_invalid("[schedule]\nlatitude = 91.0\nlongitude = 0.0\n", "schedule.latitude");
    assert_invalid("[schedule]\nlatitude = 0.0\nlongitude = 181.0\n", "schedule.longitude");
    assert_invalid("[schedule]\nlatitude = 10.0\n", "schedule");
}

#[test]
fn test_unknown_timezone_rejected() {
    assert_invalid(
        "[schedule]\ntimezone = \"Mars/Olympus_Mons\"\n",
        "schedule.timezone",
    );
}

#[test]
fn test_malformed_manual_times_rejected() {
    assert_invalid("[schedule]\nsunrise_time = \"7am\"\n", "schedule.sunrise_time");
    assert_invalid("[schedule]\nsunset_time = \"25:00\"\n", "schedule.sunset_time");
}

#[test]
fn test_negative_theme_weight_rejected() {
    assert_invalid(
        "[schedule]\nday_themes = [{ name = \"x\", weight = -1.0 }]\n",
        "schedule.day_themes",
    );
}

#[test]
fn test_deprecated_monitor_count_rejected() {
    assert_invalid("monitor_count = 2\n", "monitor_count");
    assert_invalid("monitors = 2\n", "monitors");
}

#[test]
fn test_deprecated_array_workflows_rejected() {
    assert_invalid("workflows = [\"a.json\"]\n", "workflows");
    assert_invalid("templates = [\"a.prompt\"]\n", "templates");
    assert_invalid("workflow_path = \"flow.json\"\n", "workflow_path");
}

#[test]
fn test_unknown_keys_rejected() {
    assert!(Config::from_toml("[service]\nbase = \"x\"\n").is_err());
}

#[test]
fn test_parse_resolution() {
    assert_eq!(parse_resolution("2560x1440"), Some((2560, 1440)));
    assert_eq!(parse_resolution("1920X1080"), None);
    assert_eq!(parse_resolution("x"), None);
    assert_eq!(parse_resolution("0x10"), None);
}

#[test]
fn test_parse_clock() {
    assert_eq!(parse_clock("06:30"), Some((6, 30)));
    assert_eq!(parse_clock("23:59"), Some((23, 59)));
    assert_eq!(parse_clock("24:00"), None);
    assert_eq!(parse_clock("6:5"), None);
    assert_eq!(parse_clock("noon"), None);
}

#[test]
fn test_theme_accessors() {
    let config = Config::from_toml(FULL).expect("parse");
    let dark = config.theme("dark").expect("theme");
    assert_eq!(dark.prefix_or("dark"), "z-image");
    assert_eq!(dark.default_template(), "moody.prompt");

    let missing = comfywall::io::configuration::ThemeConfig::default();
    assert_eq!(missing.prefix_or("plain"), "plain");
    assert_eq!(missing.default_template(), "default.prompt");
}

#[test]
fn test_monitor_lookup() {
    let config = Config::from_toml(FULL).expect("parse");
    let binding = config.monitor("DP-1").expect("binding");
    assert_eq!(binding.resolution, "2560x1440");
    assert_eq!(binding.command.as_deref(), Some("swww"));
    assert!(config.monitor("DP-9").is_none());
}
