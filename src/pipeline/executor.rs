use crate::comfy::client::GenerationDriver;
use crate::comfy::transport::Transport;
use crate::io::configuration::MonitorBinding;
use crate::io::error::{config_invalid, fs_error, PipelineError, Result};
use crate::io::notify::Notifier;
use crate::io::output::{save_image, GenerationRecord, HistorySink};
use crate::io::progress::PollProgress;
use crate::math::probability::RandomSelector;
use crate::monitor::detect;
use crate::monitor::rotation::RotationState;
use crate::monitor::setter::Setter;
use crate::monitor::Monitor;
use crate::pipeline::context::RunContext;
use crate::prompt::resolve::{PromptResult, TemplateResolver};
use crate::prompt::template::Template;
use crate::schedule::DayPhase;
use crate::workflow::inject::{inject_prompts, inject_seed};
use crate::workflow::registry::WorkflowRegistry;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Caller-selected behavior for one invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Emit the structured plan instead of generating
    pub dry_run: bool,
    /// Suppress progress display
    pub quiet: bool,
    /// Bypass the scheduler with a fixed theme
    pub theme_override: Option<String>,
    /// Bypass seeded template selection with a fixed template filename
    pub template_override: Option<String>,
}

/// Everything a run decided before touching the network
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    /// Target monitor name
    pub monitor: String,
    /// Resolution used for workflow selection
    pub resolution: String,
    /// Active theme after scheduling and fallback
    pub theme: String,
    /// Schedule phase the run fell in
    pub phase: DayPhase,
    /// Selected template filename
    pub template: String,
    /// Workflow identifier
    pub workflow_id: String,
    /// Workflow file path
    pub workflow_path: PathBuf,
    /// Seed driving every random choice
    pub seed: u64,
    /// Resolved prompt sections
    pub prompts: PromptResult,
    /// Intended output path
    pub output_path: PathBuf,
    /// Intended setter command identifier
    pub setter: String,
}

impl fmt::Display for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plan for monitor {} ({})", self.monitor, self.resolution)?;
        writeln!(f, "  theme:    {}", self.theme)?;
        writeln!(f, "  template: {}", self.template)?;
        writeln!(
            f,
            "  workflow: {} ({})",
            self.workflow_id,
            self.workflow_path.display()
        )?;
        writeln!(f, "  seed:     {}", self.seed)?;
        for (name, text) in &self.prompts.prompts {
            writeln!(f, "  {name}: {text}")?;
        }
        for (name, text) in &self.prompts.negatives {
            writeln!(f, "  {name}:negative: {text}")?;
        }
        writeln!(f, "  output:   {}", self.output_path.display())?;
        write!(f, "  setter:   {}", self.setter)
    }
}

/// A plan plus the injected workflow ready for submission
struct PreparedRun {
    plan: RunPlan,
    workflow: Value,
}

/// Orchestrates one single-shot invocation
pub struct PipelineExecutor {
    ctx: RunContext,
    options: RunOptions,
    now: NaiveDateTime,
}

impl PipelineExecutor {
    /// Create an executor pinned to the current local instant
    pub fn new(ctx: RunContext, options: RunOptions) -> Self {
        Self::with_instant(ctx, options, chrono::Local::now().naive_local())
    }

    /// Create an executor pinned to an explicit instant
    pub fn with_instant(ctx: RunContext, options: RunOptions, now: NaiveDateTime) -> Self {
        Self { ctx, options, now }
    }

    /// Generate for the next monitor in rotation
    ///
    /// # Errors
    ///
    /// Propagates the first pipeline failure; setter and state persistence
    /// failures are deferred so they only decide the outcome when nothing
    /// else failed.
    pub fn run_next(&mut self) -> Result<()> {
        let active = self.active_monitor_names()?;
        let mut state = RotationState::load(self.ctx.config().state_file());
        let target = state
            .next(&active)
            .ok_or_else(|| config_invalid("monitors", "no monitors configured"))?;

        let deferred = self.run_one(&target)?;

        if !self.options.dry_run {
            if let Err(e) = state.record(&target, chrono::Utc::now(), &active) {
                tracing::warn!(error = %e, "rotation state not persisted");
                return Err(deferred.unwrap_or(e));
            }
        }
        deferred.map_or(Ok(()), Err)
    }

    /// Generate for one explicitly named monitor; the cursor is untouched
    ///
    /// # Errors
    ///
    /// As [`run_next`](Self::run_next).
    pub fn run_monitor(&mut self, name: &str) -> Result<()> {
        let active = self.active_monitor_names()?;
        if !active.iter().any(|m| m == name) {
            return Err(config_invalid(
                "monitors",
                format!("monitor '{name}' is not configured and connected"),
            ));
        }
        self.run_one(name)?.map_or(Ok(()), Err)
    }

    /// Generate for every configured monitor in configuration order
    ///
    /// A failure on one monitor is logged and the iteration continues; the
    /// first failure is returned once every monitor has been attempted. The
    /// rotation cursor is not advanced.
    ///
    /// # Errors
    ///
    /// Returns the first per-monitor failure, when any.
    pub fn run_all(&mut self) -> Result<()> {
        let active = self.active_monitor_names()?;
        let mut first_failure: Option<PipelineError> = None;
        let mut completed = 0usize;

        for name in &active {
            tracing::info!(monitor = %name, "--- generating ---");
            match self.run_one(name) {
                Ok(None) => completed += 1,
                Ok(Some(deferred)) => {
                    tracing::error!(monitor = %name, error = %deferred, "monitor finished with a deferred failure");
                    first_failure.get_or_insert(deferred);
                }
                Err(e) => {
                    tracing::error!(monitor = %name, error = %e, "monitor failed");
                    first_failure.get_or_insert(e);
                }
            }
        }

        tracing::info!(completed, total = active.len(), "all-monitor run finished");
        first_failure.map_or(Ok(()), Err)
    }

    /// Configured monitors that are currently connected, in config order
    ///
    /// # Errors
    ///
    /// Propagates detection failures and rejects an empty configuration.
    fn active_monitor_names(&self) -> Result<Vec<String>> {
        let configured = self.ctx.config().monitor_names();
        if configured.is_empty() {
            return Err(config_invalid("monitors", "no monitors configured"));
        }
        let connected = detect::list_connected()?;
        Ok(reconcile_monitors(&configured, &connected))
    }

    /// Run steps 4..=10 for one monitor
    ///
    /// Returns a deferred setter failure instead of erroring so the caller
    /// can weigh it against state persistence.
    fn run_one(&mut self, name: &str) -> Result<Option<PipelineError>> {
        let binding = self
            .ctx
            .config()
            .monitor(name)
            .cloned()
            .ok_or_else(|| config_invalid("monitors", format!("monitor '{name}' is not configured")))?;

        let prepared = self.prepare(&binding)?;

        if self.options.dry_run {
            println!("{}", prepared.plan);
            return Ok(None);
        }

        self.execute(&binding, prepared)
    }

    /// Steps 4..=8: seed, theme, workflow, template, resolution, injection
    fn prepare(&mut self, binding: &MonitorBinding) -> Result<PreparedRun> {
        let seed = self
            .ctx
            .seed_source()
            .slot_seed(self.now, Some(&binding.name));

        // Theme sampling draws from its own selector so template choice
        // stays stable when the schedule changes
        let mut theme_rng = RandomSelector::new(seed);
        let choice = self.ctx.scheduler().sample_theme(self.now, &mut theme_rng)?;
        let requested = self
            .options
            .theme_override
            .clone()
            .unwrap_or(choice.theme);
        let theme_name = self.ctx.resolve_theme(&requested)?;
        let theme = self.ctx.config().theme(&theme_name).cloned().unwrap_or_default();

        let workflow_id =
            WorkflowRegistry::workflow_id(theme.prefix_or(&theme_name), &binding.resolution);
        let prompts_dir = self.ctx.config().theme_prompts_dir(&theme_name);

        let template_name = match &self.options.template_override {
            Some(name) => name.clone(),
            None => {
                let eligible = self.ctx.registry_mut().eligible_templates(
                    &workflow_id,
                    &prompts_dir,
                    binding.templates.as_deref(),
                );
                if eligible.is_empty() {
                    tracing::warn!(
                        workflow = %workflow_id,
                        fallback = %theme.default_template(),
                        "no eligible templates, using the theme default"
                    );
                    theme.default_template().to_string()
                } else {
                    // Template choice uses the bare seed, distinct from the
                    // section-resolution PRNGs, so atom edits cannot shift it
                    let mut template_rng = RandomSelector::new(seed);
                    let index = template_rng.uniform_choice(eligible.len());
                    eligible[index].clone()
                }
            }
        };

        let template_path = prompts_dir.join(&template_name);
        let text = std::fs::read_to_string(&template_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                config_invalid(
                    &format!("themes.{theme_name}"),
                    format!("template '{}' not found", template_path.display()),
                )
            } else {
                fs_error(&template_path, "read", e)
            }
        })?;
        let template = Template::parse(&template_name, &text)?;

        let prompts =
            TemplateResolver::new(self.ctx.atoms_mut(&theme_name)).resolve(&template, seed)?;

        let loaded = self.ctx.registry_mut().load(&workflow_id)?;
        let workflow_path = loaded.path.clone();
        let (mut workflow, _report) = inject_prompts(&loaded.document, &prompts)?;
        inject_seed(&mut workflow, seed);

        let setter_id = binding.command.clone().unwrap_or_else(|| "swaybg".to_string());
        Setter::from_id(&setter_id)?;

        Ok(PreparedRun {
            plan: RunPlan {
                monitor: binding.name.clone(),
                resolution: binding.resolution.clone(),
                theme: theme_name,
                phase: choice.phase,
                template: template_name,
                workflow_id,
                workflow_path,
                seed,
                prompts,
                output_path: binding.output_path(),
                setter: setter_id,
            },
            workflow,
        })
    }

    /// Steps 9..=10: drive generation, install, archive, notify
    fn execute(
        &mut self,
        binding: &MonitorBinding,
        prepared: PreparedRun,
    ) -> Result<Option<PipelineError>> {
        let config = self.ctx.config();
        let plan = &prepared.plan;
        let notifier = Notifier::new(config.notifications.enabled);

        let transport = Transport::new(&config.service)?;
        transport.health().map_err(|e| {
            notifier.notify("Wallpaper generation failed", &format!("{e}"));
            e
        })?;

        let progress = (!self.options.quiet).then(|| PollProgress::new(&binding.name));
        let driver = GenerationDriver::new(&transport, &config.service);
        let image = match driver.run(&prepared.workflow, progress.as_ref()) {
            Ok(image) => image,
            Err(e) => {
                notifier.notify("Wallpaper generation failed", &format!("{e}"));
                return Err(e);
            }
        };

        save_image(&image.bytes, &plan.output_path)?;

        let mut deferred: Option<PipelineError> = None;
        let setter = Setter::from_id(&plan.setter)?;
        if let Err(e) = setter.apply(&plan.output_path, &binding.name) {
            // Image stays on disk; the failure decides the exit code only
            // if nothing else goes wrong
            tracing::error!(error = %e, "wallpaper saved but not applied");
            deferred = Some(e);
        }

        let record = GenerationRecord {
            monitor: binding.name.clone(),
            theme: plan.theme.clone(),
            template: plan.template.clone(),
            seed: plan.seed,
            prompts: plan.prompts.prompts.clone(),
            negatives: plan.prompts.negatives.clone(),
            workflow_id: plan.workflow_id.clone(),
            generated_at: chrono::Utc::now(),
        };
        let history = HistorySink::new(config.history_dir(), config.history.enabled);
        if let Err(e) = history.record(&image.bytes, &record) {
            tracing::warn!(error = %e, "history record not written");
        }

        notifier.notify(
            "Wallpaper updated",
            &format!("{} · {} · seed {}", binding.name, plan.theme, plan.seed),
        );
        tracing::info!(
            monitor = %binding.name,
            prompt_id = %image.prompt_id,
            output = %plan.output_path.display(),
            "generation complete"
        );

        Ok(deferred)
    }

    /// Build the structured plan for one monitor without side effects
    ///
    /// # Errors
    ///
    /// As the preparation steps of a real run.
    pub fn plan_for(&mut self, name: &str) -> Result<RunPlan> {
        let binding = self
            .ctx
            .config()
            .monitor(name)
            .cloned()
            .ok_or_else(|| config_invalid("monitors", format!("monitor '{name}' is not configured")))?;
        Ok(self.prepare(&binding)?.plan)
    }
}

/// Intersect configured and connected monitors, warning on each mismatch
///
/// Bindings for disconnected monitors are retained in configuration but
/// skipped for the run; connected monitors without a binding are ignored.
pub fn reconcile_monitors(configured: &[String], connected: &[Monitor]) -> Vec<String> {
    let mut active = Vec::new();

    for name in configured {
        if connected.iter().any(|m| &m.name == name) {
            active.push(name.clone());
        } else {
            tracing::warn!(monitor = %name, "configured monitor is not connected, skipping");
        }
    }
    for monitor in connected {
        if !configured.contains(&monitor.name) {
            tracing::warn!(
                monitor = %monitor.name,
                resolution = %monitor.resolution,
                "connected monitor has no configuration entry"
            );
        }
    }

    active
}
