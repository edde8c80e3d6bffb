//! Blocking HTTP transport for the ComfyUI API
//!
//! One pooled session per run. Connection errors, read timeouts, and 5xx
//! responses are retried with exponential backoff; everything else surfaces
//! immediately.

use crate::io::configuration::{
    ServiceConfig, HTTP_POOL_MAX_IDLE_PER_HOST, RETRY_ATTEMPTS, RETRY_BACKOFF_SECS, USER_AGENT,
};
use crate::io::error::{PipelineError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Acknowledgement returned by workflow submission
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAck {
    /// Opaque identifier for the queued prompt
    pub prompt_id: String,
    /// Position in the execution queue, when reported
    #[serde(rename = "number")]
    pub queue_position: Option<u64>,
}

/// Location of a generated image on the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Image filename
    pub filename: String,
    /// Subfolder below the service output directory
    pub subfolder: String,
    /// Service image type (`output` or `temp`)
    pub kind: String,
}

/// Outcome of one transport attempt
enum Attempt<T> {
    Done(T),
    Retry(String),
    Fatal(PipelineError),
}

/// Pooled blocking HTTP session bound to one service base URL
pub struct Transport {
    client: reqwest::blocking::Client,
    base_url: String,
    client_id: String,
}

impl Transport {
    /// Build a session for the configured service
    ///
    /// # Errors
    ///
    /// Returns `NetworkUnreachable` when the HTTP client cannot be built.
    pub fn new(service: &ServiceConfig) -> Result<Self> {
        let base_url = service.base_url.trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE_PER_HOST)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PipelineError::NetworkUnreachable {
                url: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            client_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Service base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stable client identifier sent with every submission
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Probe service health via `GET /system_stats`
    ///
    /// # Errors
    ///
    /// Returns `NetworkUnreachable` after retries are exhausted.
    pub fn health(&self) -> Result<Value> {
        self.with_retries("health check", || {
            let response = match self
                .client
                .get(format!("{}/system_stats", self.base_url))
                .timeout(Duration::from_secs(10))
                .send()
            {
                Ok(response) => response,
                Err(e) => return transport_attempt(e),
            };
            let status = response.status();
            if status.is_server_error() {
                return Attempt::Retry(format!("HTTP {status}"));
            }
            if !status.is_success() {
                return Attempt::Fatal(PipelineError::NetworkUnreachable {
                    url: self.base_url.clone(),
                    reason: format!("health check returned HTTP {status}"),
                });
            }
            match response.json::<Value>() {
                Ok(value) => Attempt::Done(value),
                Err(e) => Attempt::Retry(format!("invalid health response: {e}")),
            }
        })
    }

    /// Submit a workflow via `POST /prompt`
    ///
    /// # Errors
    ///
    /// Returns `SubmissionRejected` on 4xx responses and
    /// `NetworkUnreachable` after transport retries are exhausted.
    pub fn submit(&self, workflow: &Value) -> Result<SubmitAck> {
        let payload = serde_json::json!({
            "prompt": workflow,
            "client_id": self.client_id,
        });

        self.with_retries("workflow submission", || {
            let response = match self
                .client
                .post(format!("{}/prompt", self.base_url))
                .timeout(Duration::from_secs(30))
                .json(&payload)
                .send()
            {
                Ok(response) => response,
                Err(e) => return transport_attempt(e),
            };

            let status = response.status();
            if status.is_server_error() {
                return Attempt::Retry(format!("HTTP {status}"));
            }
            if status.is_client_error() {
                let body = response.text().unwrap_or_else(|_| "<unreadable body>".to_string());
                return Attempt::Fatal(PipelineError::SubmissionRejected {
                    reason: format!("HTTP {status}: {body}"),
                });
            }
            match response.json::<SubmitAck>() {
                Ok(ack) => Attempt::Done(ack),
                Err(e) => Attempt::Fatal(PipelineError::SubmissionRejected {
                    reason: format!("unparseable submission response: {e}"),
                }),
            }
        })
    }

    /// Poll the history record via `GET /history/{prompt_id}`
    ///
    /// Returns `None` while the prompt is still pending.
    ///
    /// # Errors
    ///
    /// Returns `NetworkUnreachable` after retries are exhausted.
    pub fn history(&self, prompt_id: &str) -> Result<Option<Value>> {
        self.with_retries("history poll", || {
            let response = match self
                .client
                .get(format!("{}/history/{prompt_id}", self.base_url))
                .timeout(Duration::from_secs(10))
                .send()
            {
                Ok(response) => response,
                Err(e) => return transport_attempt(e),
            };

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Attempt::Done(None);
            }
            if status.is_server_error() {
                return Attempt::Retry(format!("HTTP {status}"));
            }
            if !status.is_success() {
                return Attempt::Fatal(PipelineError::NetworkUnreachable {
                    url: self.base_url.clone(),
                    reason: format!("history poll returned HTTP {status}"),
                });
            }
            match response.json::<Value>() {
                Ok(value) => Attempt::Done(value.get(prompt_id).cloned()),
                Err(e) => Attempt::Retry(format!("invalid history response: {e}")),
            }
        })
    }

    /// Download image bytes via `GET /view`
    ///
    /// # Errors
    ///
    /// Returns `ImageFetchFailed` when the referenced image cannot be
    /// retrieved or decodes to an empty body.
    pub fn fetch_image(&self, image: &ImageRef) -> Result<Vec<u8>> {
        let fetch_failed = |reason: String| PipelineError::ImageFetchFailed {
            filename: image.filename.clone(),
            reason,
        };

        self.with_retries("image fetch", || {
            let response = match self
                .client
                .get(format!("{}/view", self.base_url))
                .query(&[
                    ("filename", image.filename.as_str()),
                    ("subfolder", image.subfolder.as_str()),
                    ("type", image.kind.as_str()),
                ])
                .timeout(Duration::from_secs(60))
                .send()
            {
                Ok(response) => response,
                Err(e) => return transport_attempt(e),
            };

            let status = response.status();
            if status.is_server_error() {
                return Attempt::Retry(format!("HTTP {status}"));
            }
            if !status.is_success() {
                return Attempt::Fatal(fetch_failed(format!("HTTP {status}")));
            }
            let bytes = match response.bytes() {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => return Attempt::Retry(format!("body read failed: {e}")),
            };
            if bytes.is_empty() {
                return Attempt::Fatal(fetch_failed("empty response body".to_string()));
            }
            Attempt::Done(bytes)
        })
    }

    /// Run an operation with bounded retries and exponential backoff
    fn with_retries<T>(&self, what: &str, mut op: impl FnMut() -> Attempt<T>) -> Result<T> {
        let mut last_reason = String::new();

        for attempt in 0..RETRY_ATTEMPTS {
            match op() {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fatal(error) => return Err(error),
                Attempt::Retry(reason) => {
                    last_reason = reason;
                    if attempt + 1 < RETRY_ATTEMPTS {
                        let delay = RETRY_BACKOFF_SECS
                            .get(attempt)
                            .copied()
                            .unwrap_or_else(|| RETRY_BACKOFF_SECS[RETRY_BACKOFF_SECS.len() - 1]);
                        tracing::warn!(
                            what,
                            attempt = attempt + 1,
                            delay_secs = delay,
                            reason = %last_reason,
                            "transient transport failure, backing off"
                        );
                        std::thread::sleep(Duration::from_secs(delay));
                    }
                }
            }
        }

        Err(PipelineError::NetworkUnreachable {
            url: self.base_url.clone(),
            reason: format!("{what} failed after {RETRY_ATTEMPTS} attempts: {last_reason}"),
        })
    }
}

/// Classify a reqwest error as retryable or fatal
fn transport_attempt<T>(error: reqwest::Error) -> Attempt<T> {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        Attempt::Retry(error.to_string())
    } else {
        Attempt::Retry(format!("unexpected transport error: {error}"))
    }
}
