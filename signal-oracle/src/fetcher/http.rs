//! Live HTTP page fetcher.
//!
//! Issues a plain GET and returns the body as text. Any transport error or
//! non-success status is a hard failure; it is never read as "no match".

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::traits::*;
use crate::config::ConsensusConfig;

/// HTTP-backed fetcher.
pub struct HttpPageFetcher {
    id: String,
    client: Client,
}

impl HttpPageFetcher {
    /// Create a fetcher with default configuration.
    pub fn new(id: impl Into<String>) -> Result<Self, OracleError> {
        Self::with_config(id, &ConsensusConfig::default())
    }

    /// Create a fetcher using the timeout and user agent from `config`.
    pub fn with_config(id: impl Into<String>, config: &ConsensusConfig) -> Result<Self, OracleError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("text/html, text/plain, */*"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| OracleError::Configuration(e.to_string()))?;

        Ok(Self {
            id: id.into(),
            client,
        })
    }
}

fn map_transport_error(url: &str, err: reqwest::Error) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout(url.to_string())
    } else {
        OracleError::Network(err.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_text(&self, url: &str) -> Result<String, OracleError> {
        debug!(fetcher = %self.id, url = %url, "Fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| map_transport_error(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetches_page_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("All systems DEGRADED"))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new("http-1").unwrap();
        let body = fetcher
            .fetch_text(&format!("{}/status", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, "All systems DEGRADED");
        assert_eq!(fetcher.id(), "http-1");
    }

    #[tokio::test]
    async fn test_error_status_is_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new("http-1").unwrap();
        let result = fetcher.fetch_text(&format!("{}/missing", server.uri())).await;

        assert!(matches!(result, Err(OracleError::HttpStatus { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = HttpPageFetcher::new("http-1").unwrap();
        let result = fetcher.fetch_text("http://127.0.0.1:1/status").await;

        assert!(matches!(
            result,
            Err(OracleError::Network(_)) | Err(OracleError::Timeout(_))
        ));
    }
}
