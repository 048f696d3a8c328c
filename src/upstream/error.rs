//! Error type for calls to the upstream catalog API.

use thiserror::Error;

/// Failure of a single upstream request.
///
/// [`UpstreamError::is_transient`] decides whether the retry policy tries again.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Invalid identifier: '{input}': {reason}")]
    InvalidId { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },

    /// Body was not JSON at all (truncated transfer, HTML error page).
    #[error("Response from {url} is not valid JSON: {reason}")]
    InvalidJson { url: String, reason: String },

    /// Body was JSON but lacks the fields the endpoint promises.
    #[error("Unexpected payload from {url}: {reason}")]
    MalformedPayload { url: String, reason: String },

    #[error("Failed to build HTTP client: {source}")]
    ClientBuild { source: reqwest::Error },
}

impl UpstreamError {
    /// Transport failures, 5xx, 429, and unreadable bodies are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Network { .. }
            | UpstreamError::Timeout { .. }
            | UpstreamError::BodyRead { .. }
            | UpstreamError::InvalidJson { .. } => true,
            UpstreamError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            UpstreamError::InvalidId { .. }
            | UpstreamError::MalformedPayload { .. }
            | UpstreamError::ClientBuild { .. } => false,
        }
    }

    /// Map a reqwest send error, keeping timeouts distinct.
    pub(crate) fn from_send(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
            }
        } else {
            UpstreamError::Network {
                url: url.to_string(),
                source: e,
            }
        }
    }
}
