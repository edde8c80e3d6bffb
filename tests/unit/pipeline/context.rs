//! Validates theme fallback and default materialization

use super::{fixture_config, write_theme};
use comfywall::pipeline::context::RunContext;

#[test]
fn test_existing_theme_resolves_to_itself() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "dark", "default.prompt", "__color__\n");

    let config = fixture_config(dir.path(), "");
    let mut ctx = RunContext::new(config).expect("context");
    assert_eq!(ctx.resolve_theme("dark").expect("resolve"), "dark");
}

#[test]
fn test_missing_theme_falls_back_to_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "default", "default.prompt", "plain\n");

    let config = fixture_config(dir.path(), "");
    let mut ctx = RunContext::new(config).expect("context");
    assert_eq!(ctx.resolve_theme("missing").expect("resolve"), "default");
}

#[test]
fn test_missing_default_is_materialized() {
    let dir = tempfile::tempdir().expect("tempdir");

    let config = fixture_config(dir.path(), "");
    let mut ctx = RunContext::new(config).expect("context");
    assert_eq!(ctx.resolve_theme("missing").expect("resolve"), "default");

    let atoms = dir.path().join("themes/default/atoms");
    let template = dir.path().join("themes/default/prompts/default.prompt");
    assert!(atoms.is_dir());
    assert!(template.is_file());
    let body = std::fs::read_to_string(template).expect("read template");
    assert!(body.contains("$$negative$$"));
}

#[test]
fn test_atom_store_cached_per_theme() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_theme(dir.path(), "dark", "default.prompt", "__color__\n");

    let config = fixture_config(dir.path(), "");
    let mut ctx = RunContext::new(config).expect("context");

    let atoms = ctx.atoms_mut("dark");
    assert_eq!(atoms.lookup("color").expect("atoms"), ["crimson"]);

    // Same store instance on re-entry: cached contents survive edits
    std::fs::write(
        dir.path().join("themes/dark/atoms/color.txt"),
        "teal\n",
    )
    .expect("rewrite");
    assert_eq!(ctx.atoms_mut("dark").lookup("color").expect("atoms"), ["crimson"]);
}

#[test]
fn test_context_exposes_validated_seed_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = fixture_config(dir.path(), "[prompt]\ntime_slot_minutes = 15\n");
    let ctx = RunContext::new(config).expect("context");
    assert_eq!(ctx.seed_source().slot_minutes(), 15);
    assert!(ctx.seed_source().uses_monitor_seed());
}
