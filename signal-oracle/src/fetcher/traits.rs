//! Core traits for page fetchers.
//!
//! This module defines the `PageFetcher` trait - one execution of the
//! non-deterministic fetch step that the consensus layer reconciles.

use async_trait::async_trait;

/// Error types for signal verification.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// Fetch did not complete in time
    #[error("Timed out fetching {0}")]
    Timeout(String),

    /// Fetcher is switched off
    #[error("Fetcher unavailable: {0}")]
    Unavailable(String),

    /// Executions reached different answers
    #[error("Executions disagree: {matched} matched, {unmatched} did not")]
    Disagreement { matched: usize, unmatched: usize },

    /// Too few executions configured
    #[error("Need at least {required} executions, have {configured}")]
    NoExecutions { required: usize, configured: usize },

    /// Client could not be built
    #[error("Invalid fetcher configuration: {0}")]
    Configuration(String),
}

/// One independent execution of the fetch step.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Fetch the textual content of a page.
    async fn fetch_text(&self, url: &str) -> Result<String, OracleError>;
}
