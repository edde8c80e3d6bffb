//! Validates setter resolution and command composition

use comfywall::monitor::setter::Setter;
use comfywall::PipelineError;
use std::path::PathBuf;

fn wallpaper() -> PathBuf {
    PathBuf::from("/tmp/wall.png")
}

#[test]
fn test_known_setters_resolve() {
    for id in ["swaybg", "swww", "feh", "nitrogen", "hyprpaper"] {
        let setter = Setter::from_id(id).expect("known setter");
        assert_eq!(setter.id(), id);
    }
}

#[test]
fn test_unknown_setter_is_config_error() {
    let error = Setter::from_id("xwallpaper").expect_err("must fail");
    assert!(matches!(error, PipelineError::ConfigInvalid { .. }));
}

#[test]
fn test_swaybg_command_targets_the_monitor() {
    let line = Setter::Swaybg.command_line(&wallpaper(), "DP-1");
    assert_eq!(
        line,
        vec!["swaybg", "--output", "DP-1", "--mode", "fill", "--image", "/tmp/wall.png"]
    );
}

#[test]
fn test_swww_command_targets_the_monitor() {
    let line = Setter::Swww.command_line(&wallpaper(), "HDMI-A-1");
    assert_eq!(
        line,
        vec!["swww", "img", "/tmp/wall.png", "--outputs", "HDMI-A-1", "--resize", "crop"]
    );
}

#[test]
fn test_feh_ignores_monitor_name() {
    let line = Setter::Feh.command_line(&wallpaper(), "DP-1");
    assert_eq!(line, vec!["feh", "--bg-fill", "/tmp/wall.png"]);
}

#[test]
fn test_hyprpaper_pairs_monitor_and_path() {
    let line = Setter::Hyprpaper.command_line(&wallpaper(), "DP-1");
    assert_eq!(
        line,
        vec!["hyprctl", "hyprpaper", "wallpaper", "DP-1,/tmp/wall.png"]
    );
}

#[test]
fn test_custom_template_substitutes_both_placeholders() {
    let setter = Setter::from_id("custom:my-setter --on {monitor} --file {path}").expect("valid");
    let line = setter.command_line(&wallpaper(), "DP-2");
    assert_eq!(
        line,
        vec!["my-setter", "--on", "DP-2", "--file", "/tmp/wall.png"]
    );
}

#[test]
fn test_custom_id_round_trips() {
    let setter = Setter::from_id("custom:cmd {path}").expect("valid");
    assert_eq!(setter.id(), "custom:cmd {path}");
}

#[test]
fn test_apply_missing_program_is_setter_failure() {
    let setter = Setter::from_id("custom:definitely-not-a-real-binary-cw {path}").expect("valid");
    let error = setter
        .apply(&wallpaper(), "DP-1")
        .expect_err("program does not exist");
    assert!(matches!(error, PipelineError::SetterFailed { .. }));
    assert_eq!(error.exit_code(), 5);
}
