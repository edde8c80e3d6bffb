//! Validates monitor reconciliation and dry-run planning

use super::{fixture_config, write_theme, write_workflow};
use chrono::NaiveDate;
use comfywall::monitor::Monitor;
use comfywall::pipeline::context::RunContext;
use comfywall::pipeline::executor::{reconcile_monitors, PipelineExecutor, RunOptions};
use comfywall::PipelineError;

const CONFIG: &str = r#"
[[monitors]]
name = "DP-1"
resolution = "2560x1440"
command = "swww"

[themes.dark]
workflow_prefix = "z-image"
default_template = "default.prompt"

[schedule]
day_themes = [{ name = "dark", weight = 1.0 }]
"#;

fn monitor(name: &str, resolution: &str) -> Monitor {
    Monitor {
        name: name.to_string(),
        resolution: resolution.to_string(),
    }
}

fn at_ten_fifteen() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 15)
        .expect("valid date")
        .and_hms_opt(10, 15, 0)
        .expect("valid time")
}

fn executor_for(dir: &std::path::Path) -> PipelineExecutor {
    let config = fixture_config(dir, CONFIG);
    let ctx = RunContext::new(config).expect("context");
    PipelineExecutor::with_instant(ctx, RunOptions::default(), at_ten_fifteen())
}

#[test]
fn test_reconcile_keeps_configuration_order() {
    let configured = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let connected = vec![monitor("C", "1x1"), monitor("A", "1x1")];
    assert_eq!(reconcile_monitors(&configured, &connected), ["A", "C"]);
}

#[test]
fn test_reconcile_tolerates_unconfigured_connected() {
    let configured = vec!["A".to_string()];
    let connected = vec![monitor("A", "1x1"), monitor("X", "1x1")];
    assert_eq!(reconcile_monitors(&configured, &connected), ["A"]);
}

#[test]
fn test_reconcile_empty_intersection() {
    let configured = vec!["A".to_string()];
    let connected = vec![monitor("B", "1x1")];
    assert!(reconcile_monitors(&configured, &connected).is_empty());
}

#[test]
fn test_plan_is_deterministic() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(
        dir.path(),
        "dark",
        "default.prompt",
        "a __color__ scene, {calm|wild}\n$$negative$$\nblurry\n",
    );
    write_workflow(
        dir.path(),
        "z-image-2560x1440",
        r#"{"3": {"inputs": {"text": "$$positive$$"}}, "4": {"inputs": {"text": "$$positive:negative$$"}}}"#,
    );

    let plan_a = executor_for(dir.path()).plan_for("DP-1").expect("plan");
    let plan_b = executor_for(dir.path()).plan_for("DP-1").expect("plan");

    // MD5("2025-01-15-10-0-DP-1") front word
    assert_eq!(plan_a.seed, 3_675_670_325);
    assert_eq!(plan_a.theme, "dark");
    assert_eq!(plan_a.template, "default.prompt");
    assert_eq!(plan_a.workflow_id, "z-image-2560x1440");
    assert_eq!(plan_a.prompts.prompts, plan_b.prompts.prompts);
    assert_eq!(plan_a.prompts.negatives, plan_b.prompts.negatives);
    assert!(plan_a.prompts.prompts["positive"].contains("crimson"));
    assert_eq!(plan_a.prompts.negatives["positive"], "blurry");
    assert_eq!(plan_a.setter, "swww");
}

#[test]
fn test_missing_workflow_error_names_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "dark", "default.prompt", "plain\n");
    // No workflows/ directory at all

    let error = executor_for(dir.path())
        .plan_for("DP-1")
        .expect_err("must fail");
    match &error {
        PipelineError::WorkflowMissing { id, path } => {
            assert_eq!(id, "z-image-2560x1440");
            assert!(path.ends_with("workflows/z-image-2560x1440.json"));
        }
        other => panic!("expected WorkflowMissing, got {other:?}"),
    }
    let expected_path = dir
        .path()
        .join("workflows/z-image-2560x1440.json")
        .display()
        .to_string();
    assert!(error.to_string().contains(&expected_path));
}

#[test]
fn test_theme_override_bypasses_scheduler() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "alt", "default.prompt", "alternate\n");
    write_workflow(
        dir.path(),
        "alt-2560x1440",
        r#"{"3": {"inputs": {"text": "$$positive$$"}}}"#,
    );

    let config = fixture_config(dir.path(), CONFIG);
    let ctx = RunContext::new(config).expect("context");
    let options = RunOptions {
        theme_override: Some("alt".to_string()),
        ..RunOptions::default()
    };
    let mut executor = PipelineExecutor::with_instant(ctx, options, at_ten_fifteen());

    let plan = executor.plan_for("DP-1").expect("plan");
    assert_eq!(plan.theme, "alt");
    assert_eq!(plan.workflow_id, "alt-2560x1440");
    assert_eq!(plan.prompts.prompts["positive"], "alternate");
}

#[test]
fn test_template_override_bypasses_selection() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "dark", "default.prompt", "default body\n");
    std::fs::write(
        dir.path().join("themes/dark/prompts/special.prompt"),
        "special body\n",
    )
    .expect("write template");
    write_workflow(
        dir.path(),
        "z-image-2560x1440",
        r#"{"3": {"inputs": {"text": "$$positive$$"}}}"#,
    );

    let config = fixture_config(dir.path(), CONFIG);
    let ctx = RunContext::new(config).expect("context");
    let options = RunOptions {
        template_override: Some("special.prompt".to_string()),
        ..RunOptions::default()
    };
    let mut executor = PipelineExecutor::with_instant(ctx, options, at_ten_fifteen());

    let plan = executor.plan_for("DP-1").expect("plan");
    assert_eq!(plan.template, "special.prompt");
    assert_eq!(plan.prompts.prompts["positive"], "special body");
}

#[test]
fn test_unconfigured_monitor_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "dark", "default.prompt", "plain\n");

    let error = executor_for(dir.path())
        .plan_for("DP-9")
        .expect_err("must fail");
    assert!(matches!(error, PipelineError::ConfigInvalid { .. }));
}

#[test]
fn test_plan_display_mentions_every_decision() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "dark", "default.prompt", "scene\n");
    write_workflow(
        dir.path(),
        "z-image-2560x1440",
        r#"{"3": {"inputs": {"text": "$$positive$$"}}}"#,
    );

    let plan = executor_for(dir.path()).plan_for("DP-1").expect("plan");
    let text = plan.to_string();
    for needle in [
        "DP-1",
        "dark",
        "default.prompt",
        "z-image-2560x1440",
        "3675670325",
        "swww",
    ] {
        assert!(text.contains(needle), "plan display missing '{needle}': {text}");
    }
}
