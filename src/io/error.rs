//! Error types and exit-code mapping for pipeline operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all pipeline operations
#[derive(Debug)]
pub enum PipelineError {
    /// Configuration value failed structural or range validation
    ConfigInvalid {
        /// Dotted key of the offending value (e.g., `prompt.time_slot_minutes`)
        key: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Referenced atom file does not exist under the theme's atoms tree
    AtomMissing {
        /// Atom name as referenced from the template (e.g., `subjects/nature`)
        name: String,
        /// Path that was probed
        path: PathBuf,
    },

    /// Atom file yields zero candidates after comment and blank stripping
    AtomEmpty {
        /// Atom name as referenced from the template
        name: String,
    },

    /// Template could not be parsed or resolved
    TemplateSyntax {
        /// Template filename or a synthetic label for inline text
        template: String,
        /// Description of the syntax violation
        reason: String,
    },

    /// Workflow file not found for the computed identifier
    WorkflowMissing {
        /// Workflow identifier (`{prefix}-{WxH}`)
        id: String,
        /// Full path that was attempted
        path: PathBuf,
    },

    /// Workflow demands a positive section the template did not produce
    PromptSectionMissing {
        /// Section name requested by the workflow placeholder
        section: String,
    },

    /// Repeated failure to reach the service base URL after retries
    NetworkUnreachable {
        /// Base URL of the image service
        url: String,
        /// Last transport error observed
        reason: String,
    },

    /// Service rejected the submitted workflow
    SubmissionRejected {
        /// Rejection detail reported by the service
        reason: String,
    },

    /// Service reported per-node execution errors in the history record
    GenerationFailed {
        /// One entry per failing node
        node_errors: Vec<String>,
    },

    /// Bounded wait for generation exhausted
    GenerationTimeout {
        /// Seconds elapsed when the deadline was hit
        elapsed_secs: u64,
    },

    /// Completion record present but the referenced image cannot be retrieved
    ImageFetchFailed {
        /// Filename reported by the history record
        filename: String,
        /// Description of the retrieval failure
        reason: String,
    },

    /// Solar computation failed or manual schedule times are malformed
    Schedule {
        /// Description of the scheduling failure
        reason: String,
    },

    /// Rotation state could not be written
    StatePersist {
        /// State file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Compositor absent, unreachable, or returned no usable outputs
    MonitorDetection {
        /// Description of the detection failure
        reason: String,
    },

    /// External wallpaper setter invocation failed
    SetterFailed {
        /// Setter command identifier
        command: String,
        /// Description of the failure
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigInvalid { key, reason } => {
                write!(f, "Invalid configuration '{key}': {reason}")
            }
            Self::AtomMissing { name, path } => {
                write!(f, "Atom file for '{name}' not found at '{}'", path.display())
            }
            Self::AtomEmpty { name } => {
                write!(f, "Atom file '{name}' has no selectable lines")
            }
            Self::TemplateSyntax { template, reason } => {
                write!(f, "Template '{template}': {reason}")
            }
            Self::WorkflowMissing { id, path } => {
                write!(f, "Workflow '{id}' not found at '{}'", path.display())
            }
            Self::PromptSectionMissing { section } => {
                write!(
                    f,
                    "Workflow requests $${section}$$ but the template has no '{section}' section"
                )
            }
            Self::NetworkUnreachable { url, reason } => {
                write!(f, "Cannot reach image service at {url}: {reason}")
            }
            Self::SubmissionRejected { reason } => {
                write!(f, "Service rejected workflow: {reason}")
            }
            Self::GenerationFailed { node_errors } => {
                write!(f, "Generation failed: {}", node_errors.join("; "))
            }
            Self::GenerationTimeout { elapsed_secs } => {
                write!(f, "Generation timed out after {elapsed_secs}s")
            }
            Self::ImageFetchFailed { filename, reason } => {
                write!(f, "Failed to fetch image '{filename}': {reason}")
            }
            Self::Schedule { reason } => {
                write!(f, "Schedule error: {reason}")
            }
            Self::StatePersist { path, source } => {
                write!(
                    f,
                    "Failed to persist rotation state to '{}': {source}",
                    path.display()
                )
            }
            Self::MonitorDetection { reason } => {
                write!(f, "Monitor detection failed: {reason}")
            }
            Self::SetterFailed { command, reason } => {
                write!(f, "Wallpaper setter '{command}' failed: {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StatePersist { source, .. } | Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl PipelineError {
    /// Map this error to the process exit code contract
    ///
    /// `0` success, `1` configuration, `2` network unreachable, `3` generation,
    /// `4` generation timeout, `5` filesystem/setter.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigInvalid { .. }
            | Self::AtomMissing { .. }
            | Self::AtomEmpty { .. }
            | Self::TemplateSyntax { .. }
            | Self::WorkflowMissing { .. }
            | Self::PromptSectionMissing { .. }
            | Self::Schedule { .. }
            | Self::MonitorDetection { .. } => 1,
            Self::NetworkUnreachable { .. } => 2,
            Self::SubmissionRejected { .. }
            | Self::GenerationFailed { .. }
            | Self::ImageFetchFailed { .. } => 3,
            Self::GenerationTimeout { .. } => 4,
            Self::StatePersist { .. } | Self::SetterFailed { .. } | Self::FileSystem { .. } => 5,
        }
    }
}

/// Convenience type alias for pipeline results
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create a configuration error for a specific key
pub fn config_invalid(key: &str, reason: impl ToString) -> PipelineError {
    PipelineError::ConfigInvalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a schedule error
pub fn schedule_error(reason: impl ToString) -> PipelineError {
    PipelineError::Schedule {
        reason: reason.to_string(),
    }
}

/// Create a file system error bound to a concrete path and operation
pub fn fs_error(path: &std::path::Path, operation: &'static str, source: std::io::Error) -> PipelineError {
    PipelineError::FileSystem {
        path: path.to_path_buf(),
        operation,
        source,
    }
}
