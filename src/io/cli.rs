//! Command-line interface for single-shot wallpaper generation

use crate::io::configuration::Config;
use crate::io::error::{config_invalid, Result};
use crate::math::probability::RandomSelector;
use crate::monitor::detect;
use crate::monitor::rotation::RotationState;
use crate::pipeline::context::RunContext;
use crate::pipeline::executor::{PipelineExecutor, RunOptions};
use crate::prompt::resolve::TemplateResolver;
use crate::prompt::template::Template;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "comfywall")]
#[command(
    author,
    version,
    about = "Deterministic AI wallpapers for multi-monitor Wayland desktops"
)]
/// Top-level command-line arguments
pub struct Cli {
    /// Configuration file (default: ~/.config/comfywall/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log filter (overrides RUST_LOG, e.g., "debug" or "comfywall=trace")
    #[arg(long, value_name = "FILTER", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and install a wallpaper
    Generate {
        /// Target one monitor by name (rotation cursor untouched)
        #[arg(short, long, conflicts_with = "all")]
        monitor: Option<String>,

        /// Generate for every configured monitor
        #[arg(short, long)]
        all: bool,

        /// Print the plan without network calls or file writes
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Override the scheduler-selected theme
        #[arg(short, long)]
        theme: Option<String>,

        /// Override the seeded template selection
        #[arg(short = 'T', long)]
        template: Option<String>,
    },

    /// Resolve and print prompts without generating
    Prompt {
        /// Theme to resolve against (default: scheduler selection)
        #[arg(short, long)]
        theme: Option<String>,

        /// Template filename (default: the theme's default template)
        #[arg(short = 'T', long)]
        template: Option<String>,

        /// Fixed seed (default: the current time slot)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Monitor name used as the seed discriminator
        #[arg(short, long)]
        monitor: Option<String>,

        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show service health, monitors, and the theme schedule
    Status {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or reset the rotation state
    Rotate {
        /// Discard the persisted cursor
        #[arg(long)]
        reset: bool,
    },
}

impl Cli {
    /// Effective log filter directive
    pub fn log_filter(&self) -> String {
        match (&self.log_level, self.quiet) {
            (Some(filter), _) => filter.clone(),
            (None, true) => "warn".to_string(),
            (None, false) => "info".to_string(),
        }
    }
}

/// Executes the parsed command against a loaded configuration
pub struct CommandProcessor {
    cli: Cli,
}

impl CommandProcessor {
    /// Create a processor for parsed arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the selected command
    ///
    /// # Errors
    ///
    /// Propagates pipeline failures for exit-code mapping in `main`.
    pub fn process(&self) -> Result<()> {
        let config = Config::load(self.cli.config.as_deref())?;

        match &self.cli.command {
            Command::Generate {
                monitor,
                all,
                dry_run,
                theme,
                template,
            } => {
                let ctx = RunContext::new(config)?;
                let options = RunOptions {
                    dry_run: *dry_run,
                    quiet: self.cli.quiet,
                    theme_override: theme.clone(),
                    template_override: template.clone(),
                };
                let mut executor = PipelineExecutor::new(ctx, options);
                match (monitor, all) {
                    (Some(name), _) => executor.run_monitor(name),
                    (None, true) => executor.run_all(),
                    (None, false) => executor.run_next(),
                }
            }
            Command::Prompt {
                theme,
                template,
                seed,
                monitor,
                json,
            } => self.print_prompt(config, theme.as_deref(), template.as_deref(), *seed, monitor.as_deref(), *json),
            Command::Status { json } => self.print_status(&config, *json),
            Command::Rotate { reset } => self.rotate(&config, *reset),
        }
    }

    /// `prompt`: resolve a template and print the sections
    fn print_prompt(
        &self,
        config: Config,
        theme: Option<&str>,
        template: Option<&str>,
        seed: Option<u64>,
        monitor: Option<&str>,
        json: bool,
    ) -> Result<()> {
        let mut ctx = RunContext::new(config)?;
        let now = chrono::Local::now().naive_local();

        let seed = match seed {
            Some(seed) => seed,
            None => ctx.seed_source().slot_seed(now, monitor),
        };

        let theme_name = match theme {
            Some(name) => ctx.resolve_theme(name)?,
            None => {
                let mut rng = RandomSelector::new(seed);
                let choice = ctx.scheduler().sample_theme(now, &mut rng)?;
                ctx.resolve_theme(&choice.theme)?
            }
        };
        let theme_config = ctx.config().theme(&theme_name).cloned().unwrap_or_default();
        let template_name = template.unwrap_or_else(|| theme_config.default_template());

        let template_path = ctx.config().theme_prompts_dir(&theme_name).join(template_name);
        let text = std::fs::read_to_string(&template_path).map_err(|_| {
            config_invalid(
                &format!("themes.{theme_name}"),
                format!("template '{}' not found", template_path.display()),
            )
        })?;
        let parsed = Template::parse(template_name, &text)?;
        let result = TemplateResolver::new(ctx.atoms_mut(&theme_name)).resolve(&parsed, seed)?;

        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result)
                    .map_err(|e| config_invalid("<json>", e.to_string()))?
            );
            return Ok(());
        }

        for (name, text) in &result.prompts {
            println!("[{name}]");
            println!("{text}");
            println!();
        }
        for (name, text) in &result.negatives {
            println!("[{name}:negative]");
            println!("{text}");
            println!();
        }
        println!("theme: {theme_name} | template: {template_name} | seed: {seed}");
        Ok(())
    }

    /// `status`: service health, monitors, schedule phase and table
    fn print_status(&self, config: &Config, json: bool) -> Result<()> {
        let ctx = RunContext::new(config.clone())?;
        let now = chrono::Local::now().naive_local();

        let transport = crate::comfy::transport::Transport::new(&config.service)?;
        let health = transport.health();

        let monitors = detect::list_connected().unwrap_or_default();
        let (phase, mix) = ctx.scheduler().mixture_at(now)?;
        let table = ctx.scheduler().schedule_table(now.date(), 60)?;

        if json {
            let summary = serde_json::json!({
                "service": {
                    "base_url": config.service.base_url,
                    "reachable": health.is_ok(),
                },
                "monitors": monitors,
                "phase": phase,
                "mix": mix,
                "schedule": table,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .map_err(|e| config_invalid("<json>", e.to_string()))?
            );
            return Ok(());
        }

        match health {
            Ok(_) => println!("service: {} (reachable)", config.service.base_url),
            Err(e) => println!("service: {} (unreachable: {e})", config.service.base_url),
        }

        if monitors.is_empty() {
            println!("monitors: none detected");
        } else {
            println!("monitors:");
            for monitor in &monitors {
                let configured = config.monitor(&monitor.name).is_some();
                let marker = if configured { "" } else { " (unconfigured)" };
                println!("  {} {}{marker}", monitor.name, monitor.resolution);
            }
        }

        println!("phase: {phase:?}");
        for entry in mix.entries() {
            println!("  {} {:.0}%", entry.name, entry.probability * 100.0);
        }
        println!();
        println!(
            "{}",
            crate::schedule::ThemeScheduler::render_table(&table)
        );
        Ok(())
    }

    /// `rotate`: show or reset the persisted cursor
    fn rotate(&self, config: &Config, reset: bool) -> Result<()> {
        let mut state = RotationState::load(config.state_file());

        if reset {
            state.reset()?;
            println!("rotation state reset");
            return Ok(());
        }

        match state.cursor() {
            Some(cursor) => println!("next monitor: {cursor}"),
            None => println!("next monitor: (first configured)"),
        }
        for name in config.monitor_names() {
            match state.last_served(&name) {
                Some(instant) => println!("  {name}: last served {instant}"),
                None => println!("  {name}: never served"),
            }
        }
        Ok(())
    }
}
