//! Upstream catalog API: HTTP client, retry policy, wire types, and catalog lookups.

mod client;
mod error;

pub mod catalog;
pub mod retry;
pub mod wire;

pub use client::{ApiClient, ApiClientBuilder, DEFAULT_BASE_URL};
pub use error::UpstreamError;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

/// Check a manga or chapter identifier before it is spliced into a URL path.
pub fn validate_id(input: &str) -> Result<(), UpstreamError> {
    let reason = if input.trim().is_empty() {
        Some("identifier is empty")
    } else if input
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace() || c.is_control())
    {
        Some("identifier contains URL-reserved or whitespace characters")
    } else if input == "." || input == ".." {
        Some("identifier is a path segment")
    } else {
        None
    };
    match reason {
        Some(r) => Err(UpstreamError::InvalidId {
            input: input.to_string(),
            reason: r.to_string(),
        }),
        None => Ok(()),
    }
}
