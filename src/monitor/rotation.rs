//! Persisted monitor rotation cursor
//!
//! The cursor names the next monitor to serve. The state file is a hint, not
//! an authoritative counter: corrupt or missing contents never block
//! startup, and concurrent writers resolve by last-writer-wins through the
//! atomic rename.

use crate::io::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persisted form of the rotation state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateDocument {
    /// Next monitor to serve, or null after a reset
    cursor: Option<String>,
    /// Last time each monitor was served
    #[serde(default)]
    last_served: BTreeMap<String, DateTime<Utc>>,
}

/// Named-monitor rotation cursor with atomic persistence
pub struct RotationState {
    path: PathBuf,
    document: StateDocument,
}

impl RotationState {
    /// Load rotation state from a file
    ///
    /// Missing or corrupt contents are logged and treated as a fresh state.
    pub fn load(path: PathBuf) -> Self {
        let document = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<StateDocument>(&text) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupt rotation state, starting fresh"
                    );
                    StateDocument::default()
                }
            },
            Err(_) => StateDocument::default(),
        };

        Self { path, document }
    }

    /// Path of the backing state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current cursor value
    pub fn cursor(&self) -> Option<&str> {
        self.document.cursor.as_deref()
    }

    /// Last time a monitor was served, when known
    pub fn last_served(&self, name: &str) -> Option<DateTime<Utc>> {
        self.document.last_served.get(name).copied()
    }

    /// The next monitor to serve
    ///
    /// Returns the cursor when it names a configured monitor, otherwise the
    /// first monitor in configuration order. `None` only when nothing is
    /// configured.
    pub fn next(&self, configured: &[String]) -> Option<String> {
        let first = configured.first()?;
        match &self.document.cursor {
            Some(cursor) if configured.contains(cursor) => Some(cursor.clone()),
            _ => Some(first.clone()),
        }
    }

    /// Record a serve and advance the cursor past `name`
    ///
    /// The cursor lands on the monitor after `name` in configuration order,
    /// wrapping at the end, so it always names a configured monitor.
    ///
    /// # Errors
    ///
    /// Returns `StatePersist` when the state file cannot be written; the
    /// caller treats this as non-fatal.
    pub fn record(&mut self, name: &str, now: DateTime<Utc>, configured: &[String]) -> Result<()> {
        let successor = configured
            .iter()
            .position(|m| m == name)
            .and_then(|idx| configured.get((idx + 1) % configured.len()))
            .cloned();

        self.document.cursor = successor;
        self.document.last_served.insert(name.to_string(), now);

        // Drop entries for monitors no longer configured
        self.document
            .last_served
            .retain(|monitor, _| configured.contains(monitor));

        self.persist()
    }

    /// Discard persisted state
    ///
    /// # Errors
    ///
    /// Returns `StatePersist` when the state file exists but cannot be
    /// removed.
    pub fn reset(&mut self) -> Result<()> {
        self.document = StateDocument::default();
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|source| PipelineError::StatePersist {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Write the state atomically: temp file, fsync, rename
    fn persist(&self) -> Result<()> {
        let persist_err = |source: std::io::Error| PipelineError::StatePersist {
            path: self.path.clone(),
            source,
        };

        let parent = self
            .path
            .parent()
            .ok_or_else(|| persist_err(std::io::Error::other("state path has no parent")))?;
        std::fs::create_dir_all(parent).map_err(persist_err)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(persist_err)?;
        let text = serde_json::to_string_pretty(&self.document)
            .map_err(|e| persist_err(std::io::Error::other(e)))?;
        temp.write_all(text.as_bytes()).map_err(persist_err)?;
        temp.as_file().sync_all().map_err(persist_err)?;
        temp.persist(&self.path)
            .map_err(|e| persist_err(e.error))?;

        tracing::debug!(path = %self.path.display(), cursor = ?self.document.cursor, "rotation state persisted");
        Ok(())
    }
}
