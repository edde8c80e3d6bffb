//! Generation driver: submit, poll with bounded wait, fetch
//!
//! A generation moves `Submitted -> Queued -> Running -> Succeeded ->
//! Fetched`, or terminates in `Failed`/`TimedOut`. Transitions out of
//! `Running` are driven entirely by history poll responses; there is no
//! event channel and no parallelism.

use crate::comfy::transport::{ImageRef, Transport};
use crate::io::configuration::{ServiceConfig, POLL_INTERVAL_CEILING_SECS};
use crate::io::error::{PipelineError, Result};
use crate::io::progress::PollProgress;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Observable states of one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// Accepted by the service
    Submitted,
    /// Waiting in the service queue at a reported position
    Queued(u64),
    /// Executing on the service
    Running,
    /// History record reports completed outputs
    Succeeded,
    /// Image bytes retrieved
    Fetched,
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Queued(position) => write!(f, "queued #{position}"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Fetched => write!(f, "fetched"),
        }
    }
}

/// A completed generation with its retrieved image
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Service-assigned prompt identifier
    pub prompt_id: String,
    /// Filename reported by the history record
    pub filename: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// Drives one workflow through the remote queue
pub struct GenerationDriver<'a> {
    transport: &'a Transport,
    timeout: Duration,
    base_interval: Duration,
}

impl<'a> GenerationDriver<'a> {
    /// Create a driver over an existing transport session
    pub fn new(transport: &'a Transport, service: &ServiceConfig) -> Self {
        Self {
            transport,
            timeout: Duration::from_secs(service.timeout),
            base_interval: Duration::from_secs(service.poll_interval),
        }
    }

    /// Run a workflow to completion and return the image bytes
    ///
    /// # Errors
    ///
    /// Returns the driver failure taxonomy: `NetworkUnreachable`,
    /// `SubmissionRejected`, `GenerationFailed`, `GenerationTimeout`, or
    /// `ImageFetchFailed`.
    pub fn run(&self, workflow: &Value, progress: Option<&PollProgress>) -> Result<GeneratedImage> {
        let ack = self.transport.submit(workflow)?;
        let mut state = match ack.queue_position {
            Some(position) => {
                tracing::info!(prompt_id = %ack.prompt_id, position, "workflow queued");
                GenerationState::Queued(position)
            }
            None => GenerationState::Submitted,
        };

        let started = Instant::now();
        let mut interval = self.base_interval;

        let record = loop {
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Err(self.timed_out(elapsed));
            }

            let nap = interval.min(self.timeout.saturating_sub(elapsed));
            std::thread::sleep(nap);
            if started.elapsed() >= self.timeout {
                return Err(self.timed_out(started.elapsed()));
            }

            if let Some(progress) = progress {
                progress.observe(started.elapsed(), self.timeout, &state.to_string());
            }

            match self.transport.history(&ack.prompt_id)? {
                None => {
                    // Empty response: generation not started or still early;
                    // stretch the interval toward the ceiling
                    interval = lengthen(interval);
                }
                Some(record) => {
                    if let Some(node_errors) = extract_node_errors(&record) {
                        return Err(PipelineError::GenerationFailed { node_errors });
                    }
                    if is_complete(&record) {
                        break record;
                    }
                    // Progress observed but not finished: resume tight polling
                    state = GenerationState::Running;
                    interval = self.base_interval;
                }
            }
        };

        tracing::debug!(
            prompt_id = %ack.prompt_id,
            elapsed_secs = started.elapsed().as_secs(),
            "generation complete"
        );

        let image_ref = select_output_image(&record).ok_or_else(|| {
            PipelineError::GenerationFailed {
                node_errors: vec!["completion record carries no image outputs".to_string()],
            }
        })?;

        let bytes = self.transport.fetch_image(&image_ref)?;
        if let Some(progress) = progress {
            progress.finish(&GenerationState::Fetched.to_string());
        }

        Ok(GeneratedImage {
            prompt_id: ack.prompt_id,
            filename: image_ref.filename,
            bytes,
        })
    }

    fn timed_out(&self, elapsed: Duration) -> PipelineError {
        PipelineError::GenerationTimeout {
            elapsed_secs: elapsed.as_secs(),
        }
    }
}

/// Stretch the poll interval by half, bounded by the ceiling
fn lengthen(interval: Duration) -> Duration {
    let stretched = interval + interval / 2;
    stretched.min(Duration::from_secs(POLL_INTERVAL_CEILING_SECS))
}

/// Per-node execution errors from a history record, when any
fn extract_node_errors(record: &Value) -> Option<Vec<String>> {
    let status = record.get("status")?;
    let mut errors = Vec::new();

    if let Some(messages) = status.get("messages").and_then(Value::as_array) {
        for message in messages {
            let Some(parts) = message.as_array() else {
                continue;
            };
            if parts.first().and_then(Value::as_str) != Some("execution_error") {
                continue;
            }
            let detail = parts.get(1).cloned().unwrap_or(Value::Null);
            let node_id = detail
                .get("node_id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let node_type = detail
                .get("node_type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let reason = detail
                .get("exception_message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            errors.push(format!("node {node_id} ({node_type}): {reason}"));
        }
    }

    if errors.is_empty() {
        let errored = status.get("status_str").and_then(Value::as_str) == Some("error");
        if errored {
            errors.push("service reported an execution error without details".to_string());
        }
    }

    (!errors.is_empty()).then_some(errors)
}

/// Whether a history record represents a finished generation
fn is_complete(record: &Value) -> bool {
    let completed = record
        .get("status")
        .and_then(|s| s.get("completed"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let has_outputs = record
        .get("outputs")
        .and_then(Value::as_object)
        .is_some_and(|outputs| !outputs.is_empty());
    completed || has_outputs
}

/// Pick the image to fetch from a completion record
///
/// Final `output` images are preferred over `temp` previews; among
/// candidates the last one wins, which is typically the terminal save node.
fn select_output_image(record: &Value) -> Option<ImageRef> {
    let outputs = record.get("outputs")?.as_object()?;

    let mut finals = Vec::new();
    let mut temps = Vec::new();

    for node_output in outputs.values() {
        let Some(images) = node_output.get("images").and_then(Value::as_array) else {
            continue;
        };
        for image in images {
            let Some(filename) = image.get("filename").and_then(Value::as_str) else {
                continue;
            };
            let subfolder = image
                .get("subfolder")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let kind = image
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("output")
                .to_string();
            let candidate = ImageRef {
                filename: filename.to_string(),
                subfolder,
                kind,
            };
            if candidate.kind == "output" {
                finals.push(candidate);
            } else {
                temps.push(candidate);
            }
        }
    }

    finals.pop().or_else(|| temps.pop())
}
