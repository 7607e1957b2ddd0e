//! Upload of the finished log file to a collection server.
//!
//! The log is sent as a `multipart/form-data` POST with a single `file` field
//! carrying the log's base name.

use crate::core::error::{Error, Result};
use crate::utils::hash::HashCalculator;
use crate::utils::retry::{retry_async, RetryConfig, Retryable};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Multipart field name carrying the log file.
pub const FORM_FIELD: &str = "file";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// What the server answered to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub status: u16,
    pub body: String,
}

/// Failure of a single upload attempt.
#[derive(Debug)]
enum AttemptError {
    Transport(reqwest::Error),
    Status(StatusCode, String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "{}", e),
            AttemptError::Status(status, body) if body.is_empty() => {
                write!(f, "server returned {}", status)
            }
            AttemptError::Status(status, body) => {
                write!(f, "server returned {}: {}", status, body.trim())
            }
        }
    }
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transport(e) => e.is_retryable(),
            AttemptError::Status(status, _) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

/// Sends log files to an upload URL.
pub struct LogUploader {
    client: reqwest::Client,
    url: String,
    retry: RetryConfig,
}

impl LogUploader {
    /// Create an uploader for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("jarsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: url.into(),
            retry: RetryConfig::upload(),
        }
    }

    /// Use a different retry schedule.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Upload the file at `path`.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Upload(format!("can't read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Upload(format!("{} has no file name", path.display())))?;

        log::debug!(
            "Uploading {} ({} bytes, sha256 {}) to {}",
            file_name,
            contents.len(),
            HashCalculator::sha256_bytes(&contents),
            self.url
        );

        retry_async("log upload", &self.retry, || {
            let part = Part::bytes(contents.clone())
                .file_name(file_name.clone())
                .mime_str("text/plain");
            let request = self.client.post(&self.url);
            async move {
                let form = Form::new().part(FORM_FIELD, part.map_err(AttemptError::Transport)?);
                let response = request
                    .multipart(form)
                    .send()
                    .await
                    .map_err(AttemptError::Transport)?;

                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if !status.is_success() {
                    return Err(AttemptError::Status(status, body));
                }
                Ok(UploadReceipt {
                    status: status.as_u16(),
                    body,
                })
            }
        })
        .await
    }
}
