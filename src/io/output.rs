//! Wallpaper output writing and the history sink

use crate::io::error::{fs_error, PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Metadata recorded alongside every archived wallpaper
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRecord {
    /// Monitor the wallpaper was generated for
    pub monitor: String,
    /// Active theme name
    pub theme: String,
    /// Template filename the prompts came from
    pub template: String,
    /// Seed that drove all random choices
    pub seed: u64,
    /// Resolved positive sections
    pub prompts: BTreeMap<String, String>,
    /// Resolved negative sections
    pub negatives: BTreeMap<String, String>,
    /// Workflow identifier
    pub workflow_id: String,
    /// Generation instant
    pub generated_at: DateTime<Utc>,
}

/// Validate image bytes and write them atomically
///
/// Parent directories are created; the write goes through a temp file in
/// the target directory followed by a rename, so a concurrent reader never
/// observes a torn image.
///
/// # Errors
///
/// Returns `ImageFetchFailed` when the bytes are not a recognizable image
/// and `FileSystem` on write failures.
pub fn save_image(bytes: &[u8], path: &Path) -> Result<()> {
    if image::guess_format(bytes).is_err() {
        return Err(PipelineError::ImageFetchFailed {
            filename: path.display().to_string(),
            reason: "service returned bytes that are not a recognizable image".to_string(),
        });
    }

    let parent = path
        .parent()
        .ok_or_else(|| fs_error(path, "resolve parent", std::io::Error::other("no parent directory")))?;
    std::fs::create_dir_all(parent).map_err(|e| fs_error(parent, "create directory", e))?;

    let mut temp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| fs_error(parent, "create temp file", e))?;
    temp.write_all(bytes)
        .map_err(|e| fs_error(path, "write", e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| fs_error(path, "sync", e))?;
    temp.persist(path)
        .map_err(|e| fs_error(path, "rename", e.error))?;

    tracing::info!(path = %path.display(), size = bytes.len(), "wallpaper saved");
    Ok(())
}

/// Copies generated wallpapers into a history directory with JSON sidecars
pub struct HistorySink {
    dir: PathBuf,
    enabled: bool,
}

impl HistorySink {
    /// Create a sink writing below `dir`
    pub fn new(dir: PathBuf, enabled: bool) -> Self {
        Self { dir, enabled }
    }

    /// Archive one generated wallpaper with its metadata
    ///
    /// Disabled sinks do nothing. Failures are surfaced so the caller can
    /// log them, but history never gates pipeline success.
    ///
    /// # Errors
    ///
    /// Returns `FileSystem` on write failures.
    pub fn record(&self, bytes: &[u8], record: &GenerationRecord) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| fs_error(&self.dir, "create directory", e))?;

        let stem = format!(
            "{}-{}-{}",
            record.generated_at.format("%Y%m%d-%H%M%S"),
            record.monitor,
            record.seed
        );
        let image_path = self.dir.join(format!("{stem}.png"));
        let sidecar_path = self.dir.join(format!("{stem}.json"));

        save_image(bytes, &image_path)?;

        let metadata = serde_json::to_string_pretty(record)
            .map_err(|e| fs_error(&sidecar_path, "serialize metadata", std::io::Error::other(e)))?;
        std::fs::write(&sidecar_path, metadata).map_err(|e| fs_error(&sidecar_path, "write", e))?;

        tracing::debug!(path = %image_path.display(), "wallpaper archived to history");
        Ok(Some(image_path))
    }
}
