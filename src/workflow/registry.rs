//! Workflow file resolution by theme prefix and monitor resolution

use crate::io::configuration::{WorkflowBinding, TEMPLATE_EXTENSION};
use crate::io::error::{config_invalid, PipelineError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// A workflow document loaded from disk
#[derive(Debug, Clone)]
pub struct LoadedWorkflow {
    /// Workflow identifier (filename stem)
    pub id: String,
    /// Path the document was loaded from
    pub path: PathBuf,
    /// Parsed JSON object; never mutated, injection clones it
    pub document: Value,
}

/// Resolves `(theme, resolution)` pairs to workflow documents
///
/// Documents are read once per process and cached. Structural validity
/// beyond "is a JSON object" is left to the remote service, which is the
/// authoritative validator.
pub struct WorkflowRegistry {
    workflows_dir: PathBuf,
    bindings: BTreeMap<String, WorkflowBinding>,
    cache: HashMap<String, LoadedWorkflow>,
}

impl WorkflowRegistry {
    /// Create a registry over the workflows directory and per-id bindings
    pub fn new(workflows_dir: PathBuf, bindings: BTreeMap<String, WorkflowBinding>) -> Self {
        Self {
            workflows_dir,
            bindings,
            cache: HashMap::new(),
        }
    }

    /// Compose the workflow identifier for a theme prefix and resolution
    pub fn workflow_id(prefix: &str, resolution: &str) -> String {
        format!("{prefix}-{resolution}")
    }

    /// Load a workflow document by identifier, caching the result
    ///
    /// # Errors
    ///
    /// Returns `WorkflowMissing` naming the exact path attempted, or
    /// `ConfigInvalid` when the file is not a JSON object.
    pub fn load(&mut self, id: &str) -> Result<&LoadedWorkflow> {
        if !self.cache.contains_key(id) {
            let loaded = self.read_workflow(id)?;
            self.cache.insert(id.to_string(), loaded);
        }
        self.cache
            .get(id)
            .ok_or_else(|| config_invalid(&format!("workflows.{id}"), "workflow cache poisoned"))
    }

    fn read_workflow(&self, id: &str) -> Result<LoadedWorkflow> {
        let path = self.workflows_dir.join(format!("{id}.json"));
        let text = std::fs::read_to_string(&path).map_err(|_| PipelineError::WorkflowMissing {
            id: id.to_string(),
            path: path.clone(),
        })?;

        let document: Value = serde_json::from_str(&text).map_err(|e| {
            config_invalid(
                &format!("workflows.{id}"),
                format!("invalid JSON in '{}': {e}", path.display()),
            )
        })?;
        if !document.is_object() {
            return Err(config_invalid(
                &format!("workflows.{id}"),
                format!("'{}' must contain a JSON object", path.display()),
            ));
        }

        tracing::debug!(id, path = %path.display(), "loaded workflow");
        Ok(LoadedWorkflow {
            id: id.to_string(),
            path,
            document,
        })
    }

    /// Template filenames eligible for a workflow
    ///
    /// Lists the theme's `prompts/*.prompt` inventory in sorted order, then
    /// applies the workflow's allowlist and the monitor's allowlist when
    /// present. An empty result means the caller should fall back to the
    /// theme's default template.
    pub fn eligible_templates(
        &self,
        id: &str,
        prompts_dir: &Path,
        monitor_allowlist: Option<&[String]>,
    ) -> Vec<String> {
        let mut templates = list_templates(prompts_dir);

        if let Some(binding) = self.bindings.get(id) {
            if let Some(allowed) = &binding.prompts {
                templates.retain(|name| allowed.iter().any(|a| a == name));
            }
        }
        if let Some(allowed) = monitor_allowlist {
            templates.retain(|name| allowed.iter().any(|a| a == name));
        }

        templates
    }
}

/// Sorted `*.prompt` filenames under a theme's prompts directory
fn list_templates(prompts_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(prompts_dir) else {
        tracing::warn!(path = %prompts_dir.display(), "prompts directory not readable");
        return Vec::new();
    };

    let mut templates: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION)
        })
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    templates.sort();
    templates
}
