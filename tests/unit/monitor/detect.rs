//! Validates compositor output parsing

use comfywall::monitor::detect::{parse_hyprland, parse_niri, parse_sway};
use comfywall::monitor::Monitor;
use serde_json::Value;

fn monitor(name: &str, resolution: &str) -> Monitor {
    Monitor {
        name: name.to_string(),
        resolution: resolution.to_string(),
    }
}

#[test]
fn test_parse_niri_uses_current_mode_index() {
    let value: Value = serde_json::from_str(
        r#"{
            "DP-1": {
                "modes": [
                    {"width": 1920, "height": 1080},
                    {"width": 2560, "height": 1440}
                ],
                "current_mode": 1
            }
        }"#,
    )
    .expect("valid JSON");

    assert_eq!(parse_niri(&value), vec![monitor("DP-1", "2560x1440")]);
}

#[test]
fn test_parse_niri_skips_outputs_without_mode() {
    let value: Value = serde_json::from_str(
        r#"{
            "DP-1": {"modes": [], "current_mode": 0},
            "DP-2": {"modes": [{"width": 1920, "height": 1080}], "current_mode": 0}
        }"#,
    )
    .expect("valid JSON");

    assert_eq!(parse_niri(&value), vec![monitor("DP-2", "1920x1080")]);
}

#[test]
fn test_parse_sway_skips_inactive_outputs() {
    let value: Value = serde_json::from_str(
        r#"[
            {"name": "DP-1", "active": true, "current_mode": {"width": 2560, "height": 1440}},
            {"name": "HDMI-A-1", "active": false, "current_mode": {"width": 1920, "height": 1080}}
        ]"#,
    )
    .expect("valid JSON");

    assert_eq!(parse_sway(&value), vec![monitor("DP-1", "2560x1440")]);
}

#[test]
fn test_parse_sway_tolerates_missing_active_flag() {
    let value: Value = serde_json::from_str(
        r#"[{"name": "eDP-1", "current_mode": {"width": 2880, "height": 1800}}]"#,
    )
    .expect("valid JSON");

    assert_eq!(parse_sway(&value), vec![monitor("eDP-1", "2880x1800")]);
}

#[test]
fn test_parse_hyprland_reads_top_level_dimensions() {
    let value: Value = serde_json::from_str(
        r#"[
            {"name": "DP-1", "width": 3440, "height": 1440},
            {"name": "HDMI-A-1", "width": 1920, "height": 1080}
        ]"#,
    )
    .expect("valid JSON");

    assert_eq!(
        parse_hyprland(&value),
        vec![monitor("DP-1", "3440x1440"), monitor("HDMI-A-1", "1920x1080")]
    );
}

#[test]
fn test_parsers_tolerate_wrong_shapes() {
    let wrong: Value = serde_json::from_str("42").expect("valid JSON");
    assert!(parse_niri(&wrong).is_empty());
    assert!(parse_sway(&wrong).is_empty());
    assert!(parse_hyprland(&wrong).is_empty());
}
