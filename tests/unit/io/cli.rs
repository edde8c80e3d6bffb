//! Validates command-line parsing

use clap::CommandFactory;
use clap::Parser;
use comfywall::io::cli::Cli;

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_generate_flags_parse() {
    let cli = Cli::parse_from([
        "comfywall",
        "generate",
        "--monitor",
        "DP-1",
        "--dry-run",
        "--theme",
        "dark",
    ]);
    assert!(!cli.quiet);
    assert!(cli.config.is_none());
}

#[test]
fn test_global_flags_parse_after_subcommand() {
    let cli = Cli::parse_from([
        "comfywall",
        "status",
        "--config",
        "/tmp/config.toml",
        "--quiet",
    ]);
    assert!(cli.quiet);
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/tmp/config.toml"))
    );
}

#[test]
fn test_monitor_conflicts_with_all() {
    let result = Cli::try_parse_from(["comfywall", "generate", "--monitor", "DP-1", "--all"]);
    assert!(result.is_err());
}

#[test]
fn test_log_filter_precedence() {
    let explicit = Cli::parse_from(["comfywall", "--log-level", "debug", "status"]);
    assert_eq!(explicit.log_filter(), "debug");

    let quiet = Cli::parse_from(["comfywall", "--quiet", "status"]);
    assert_eq!(quiet.log_filter(), "warn");

    let default = Cli::parse_from(["comfywall", "status"]);
    assert_eq!(default.log_filter(), "info");
}

#[test]
fn test_subcommand_required() {
    assert!(Cli::try_parse_from(["comfywall"]).is_err());
}
