//! Run-scoped context owning every cache the pipeline touches
//!
//! There is no process-wide mutable state: the atom caches, the loaded
//! workflow registry, and the seed source all live here and die with the
//! run. Components receive references into the context.

use crate::io::configuration::{Config, DEFAULT_THEME};
use crate::io::error::{fs_error, Result};
use crate::prompt::atoms::AtomStore;
use crate::prompt::seed::SeedSource;
use crate::schedule::ThemeScheduler;
use crate::workflow::registry::WorkflowRegistry;
use std::collections::HashMap;

/// Seed template written when the default theme has to be materialized
const STARTER_TEMPLATE: &str = "a minimal abstract wallpaper, soft gradients, muted colors\n\
$$negative$$\ntext, watermark, signature, low quality\n";

/// Owns configuration, caches, and component factories for one run
pub struct RunContext {
    config: Config,
    seed_source: SeedSource,
    scheduler: ThemeScheduler,
    registry: WorkflowRegistry,
    atoms: HashMap<String, AtomStore>,
}

impl RunContext {
    /// Build a context from validated configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when derived settings (slot width) fail
    /// validation.
    pub fn new(config: Config) -> Result<Self> {
        let seed_source = SeedSource::new(
            config.prompt.time_slot_minutes,
            config.prompt.use_monitor_seed,
        )?;
        let scheduler = ThemeScheduler::new(config.schedule.clone());
        let registry = WorkflowRegistry::new(config.workflows_dir(), config.workflows.clone());

        Ok(Self {
            config,
            seed_source,
            scheduler,
            registry,
            atoms: HashMap::new(),
        })
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The run's seed source
    pub fn seed_source(&self) -> &SeedSource {
        &self.seed_source
    }

    /// The run's theme scheduler
    pub fn scheduler(&self) -> &ThemeScheduler {
        &self.scheduler
    }

    /// Mutable access to the workflow registry cache
    pub fn registry_mut(&mut self) -> &mut WorkflowRegistry {
        &mut self.registry
    }

    /// Atom store for a theme, created on first use
    pub fn atoms_mut(&mut self, theme: &str) -> &mut AtomStore {
        let root = self.config.theme_atoms_dir(theme);
        self.atoms
            .entry(theme.to_string())
            .or_insert_with(|| AtomStore::new(root))
    }

    /// Resolve a requested theme to one whose atoms tree exists on disk
    ///
    /// A missing theme falls back to `default` with a warning. A missing
    /// `default` is materialized as an empty starter theme and a diagnostic
    /// surfaced.
    ///
    /// # Errors
    ///
    /// Returns `FileSystem` when materialization itself fails.
    pub fn resolve_theme(&mut self, requested: &str) -> Result<String> {
        if self.config.theme_atoms_dir(requested).is_dir() {
            return Ok(requested.to_string());
        }

        if requested != DEFAULT_THEME {
            tracing::warn!(
                theme = requested,
                fallback = DEFAULT_THEME,
                "theme has no atoms tree, falling back"
            );
        }

        if !self.config.theme_atoms_dir(DEFAULT_THEME).is_dir() {
            self.materialize_default_theme()?;
        }
        Ok(DEFAULT_THEME.to_string())
    }

    fn materialize_default_theme(&self) -> Result<()> {
        let atoms = self.config.theme_atoms_dir(DEFAULT_THEME);
        let prompts = self.config.theme_prompts_dir(DEFAULT_THEME);

        std::fs::create_dir_all(&atoms).map_err(|e| fs_error(&atoms, "create directory", e))?;
        std::fs::create_dir_all(&prompts)
            .map_err(|e| fs_error(&prompts, "create directory", e))?;

        let template = prompts.join("default.prompt");
        if !template.exists() {
            std::fs::write(&template, STARTER_TEMPLATE)
                .map_err(|e| fs_error(&template, "write", e))?;
        }

        tracing::warn!(
            path = %atoms.display(),
            "no usable theme found, materialized an empty default theme; populate its atoms/ tree"
        );
        Ok(())
    }
}
