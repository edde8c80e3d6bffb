//! External wallpaper setter invocation
//!
//! The core hands `(path, monitor_name)` to a setter variant resolved from
//! the configuration. Setter failure never loses the image: callers log the
//! failure and keep the saved file.

use crate::io::error::{PipelineError, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Supported wallpaper setter programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setter {
    /// `swaybg --output <name> --mode fill --image <path>` (persistent daemon)
    Swaybg,
    /// `swww img <path> --outputs <name>`
    Swww,
    /// `feh --bg-fill <path>` (all outputs at once)
    Feh,
    /// `nitrogen --set-zoom-fill <path>`
    Nitrogen,
    /// `hyprctl hyprpaper` preload + per-monitor wallpaper
    Hyprpaper,
    /// Custom command template with `{path}` and `{monitor}` placeholders
    Custom(String),
}

impl Setter {
    /// Resolve a setter from its configuration identifier
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown identifiers.
    pub fn from_id(id: &str) -> Result<Self> {
        if let Some(template) = id.strip_prefix("custom:") {
            return Ok(Self::Custom(template.to_string()));
        }
        match id {
            "swaybg" => Ok(Self::Swaybg),
            "swww" => Ok(Self::Swww),
            "feh" => Ok(Self::Feh),
            "nitrogen" => Ok(Self::Nitrogen),
            "hyprpaper" => Ok(Self::Hyprpaper),
            _ => Err(crate::io::error::config_invalid(
                "monitors.command",
                format!(
                    "unknown setter '{id}' (expected swaybg, swww, feh, nitrogen, hyprpaper, or custom:<template>)"
                ),
            )),
        }
    }

    /// Identifier used in logs and the dry-run plan
    pub fn id(&self) -> String {
        match self {
            Self::Swaybg => "swaybg".to_string(),
            Self::Swww => "swww".to_string(),
            Self::Feh => "feh".to_string(),
            Self::Nitrogen => "nitrogen".to_string(),
            Self::Hyprpaper => "hyprpaper".to_string(),
            Self::Custom(template) => format!("custom:{template}"),
        }
    }

    /// Command line this setter would run for a path and monitor
    pub fn command_line(&self, path: &Path, monitor: &str) -> Vec<String> {
        let path = path.display().to_string();
        match self {
            Self::Swaybg => vec![
                "swaybg".into(),
                "--output".into(),
                monitor.into(),
                "--mode".into(),
                "fill".into(),
                "--image".into(),
                path,
            ],
            Self::Swww => vec![
                "swww".into(),
                "img".into(),
                path,
                "--outputs".into(),
                monitor.into(),
                "--resize".into(),
                "crop".into(),
            ],
            Self::Feh => vec!["feh".into(), "--bg-fill".into(), path],
            Self::Nitrogen => vec!["nitrogen".into(), "--set-zoom-fill".into(), path],
            Self::Hyprpaper => vec![
                "hyprctl".into(),
                "hyprpaper".into(),
                "wallpaper".into(),
                format!("{monitor},{path}"),
            ],
            Self::Custom(template) => template
                .split_whitespace()
                .map(|word| word.replace("{path}", &path).replace("{monitor}", monitor))
                .collect(),
        }
    }

    /// Apply a wallpaper to one monitor
    ///
    /// # Errors
    ///
    /// Returns `SetterFailed` when the program is missing or exits non-zero.
    pub fn apply(&self, path: &Path, monitor: &str) -> Result<()> {
        match self {
            Self::Swaybg => self.apply_swaybg(path, monitor),
            Self::Hyprpaper => {
                self.run(&[
                    "hyprctl".to_string(),
                    "hyprpaper".to_string(),
                    "preload".to_string(),
                    path.display().to_string(),
                ])?;
                self.run(&self.command_line(path, monitor))
            }
            _ => self.run(&self.command_line(path, monitor)),
        }
    }

    /// swaybg is a persistent daemon: replace any instance bound to the
    /// monitor, then detach a fresh one
    fn apply_swaybg(&self, path: &Path, monitor: &str) -> Result<()> {
        let _ = Command::new("pkill")
            .args(["-f", &format!("swaybg --output {monitor}")])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        let argv = self.command_line(path, monitor);
        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.failure(format!("cannot spawn: {e}")))?;

        tracing::info!(monitor, pid = child.id(), "swaybg daemon started");
        Ok(())
    }

    fn run(&self, argv: &[String]) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Err(self.failure("empty command line".to_string()));
        };

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| self.failure(format!("cannot run '{program}': {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!(
                "'{}' exited with {}: {}",
                argv.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(command = %argv.join(" "), "wallpaper set");
        Ok(())
    }

    fn failure(&self, reason: String) -> PipelineError {
        PipelineError::SetterFailed {
            command: self.id(),
            reason,
        }
    }
}
