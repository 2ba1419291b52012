//! Consensus component - reconciles independent fetch executions.
//!
//! Every configured execution fetches the page and evaluates the match on its
//! own. The verdict is accepted only on unanimous agreement; a single failing
//! execution fails the whole call.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ConsensusConfig;
use crate::fetcher::traits::{OracleError, PageFetcher};

/// The capability the coverage engine consumes.
#[async_trait]
pub trait SignalOracle: Send + Sync {
    /// Whether the page at `url` contains `must_contain`, reconciled to one answer.
    async fn verify(&self, url: &str, must_contain: &str) -> Result<bool, OracleError>;
}

/// Case-insensitive containment check applied by each execution.
pub fn content_matches(page: &str, must_contain: &str) -> bool {
    page.to_lowercase().contains(&must_contain.to_lowercase())
}

/// Oracle requiring strict agreement between all executions.
pub struct StrictConsensusOracle {
    config: ConsensusConfig,
    executions: Vec<Arc<dyn PageFetcher>>,
}

impl StrictConsensusOracle {
    /// Create with default configuration.
    pub fn new(executions: Vec<Arc<dyn PageFetcher>>) -> Self {
        Self::with_config(ConsensusConfig::default(), executions)
    }

    /// Create with custom configuration.
    pub fn with_config(config: ConsensusConfig, executions: Vec<Arc<dyn PageFetcher>>) -> Self {
        Self { config, executions }
    }

    /// Number of configured executions.
    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }
}

#[async_trait]
impl SignalOracle for StrictConsensusOracle {
    async fn verify(&self, url: &str, must_contain: &str) -> Result<bool, OracleError> {
        let required = self.config.min_executions.max(1);
        if self.executions.len() < required {
            return Err(OracleError::NoExecutions {
                required,
                configured: self.executions.len(),
            });
        }

        let outcomes = join_all(self.executions.iter().map(|fetcher| fetcher.fetch_text(url))).await;

        let mut matched = 0;
        let mut unmatched = 0;
        for (fetcher, outcome) in self.executions.iter().zip(outcomes) {
            match outcome {
                Ok(page) => {
                    let hit = content_matches(&page, must_contain);
                    debug!(fetcher = %fetcher.id(), url = %url, matched = hit, "Execution finished");
                    if hit {
                        matched += 1;
                    } else {
                        unmatched += 1;
                    }
                }
                Err(err) => {
                    warn!(fetcher = %fetcher.id(), url = %url, error = %err, "Execution failed");
                    return Err(err);
                }
            }
        }

        if matched > 0 && unmatched > 0 {
            warn!(url = %url, matched, unmatched, "Executions disagree; refusing verdict");
            return Err(OracleError::Disagreement { matched, unmatched });
        }

        let verdict = matched > 0;
        info!(url = %url, executions = matched + unmatched, verdict, "Signal consensus reached");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StaticPageFetcher;

    const URL: &str = "https://status.example/incidents";

    fn fixtures(bodies: &[&str]) -> Vec<Arc<dyn PageFetcher>> {
        bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                Arc::new(StaticPageFetcher::new(format!("exec-{}", i)).with_page(URL, *body))
                    as Arc<dyn PageFetcher>
            })
            .collect()
    }

    #[test]
    fn test_content_matches_ignores_case() {
        assert!(content_matches("Major OUTAGE in progress", "outage"));
        assert!(content_matches("anything", ""));
        assert!(!content_matches("All systems operational", "outage"));
    }

    #[tokio::test]
    async fn test_unanimous_match() {
        let oracle = StrictConsensusOracle::new(fixtures(&["Outage", "OUTAGE", "outage!"]));
        assert!(oracle.verify(URL, "outage").await.unwrap());
    }

    #[tokio::test]
    async fn test_unanimous_miss() {
        let oracle = StrictConsensusOracle::new(fixtures(&["ok", "ok", "ok"]));
        assert!(!oracle.verify(URL, "outage").await.unwrap());
    }

    #[tokio::test]
    async fn test_disagreement_fails_closed() {
        let oracle = StrictConsensusOracle::new(fixtures(&["outage", "ok", "outage"]));
        let result = oracle.verify(URL, "outage").await;
        assert!(matches!(
            result,
            Err(OracleError::Disagreement { matched: 2, unmatched: 1 })
        ));
    }

    #[tokio::test]
    async fn test_failed_execution_is_hard_failure() {
        let mut executions = fixtures(&["outage", "outage"]);
        executions.push(Arc::new(
            StaticPageFetcher::new("exec-down")
                .with_page(URL, "outage")
                .with_available(false),
        ));
        let oracle = StrictConsensusOracle::new(executions);

        assert!(matches!(
            oracle.verify(URL, "outage").await,
            Err(OracleError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_too_few_executions() {
        let oracle = StrictConsensusOracle::new(fixtures(&["outage"]));
        assert_eq!(oracle.execution_count(), 1);
        assert!(matches!(
            oracle.verify(URL, "outage").await,
            Err(OracleError::NoExecutions { required: 3, configured: 1 })
        ));

        let config = ConsensusConfig {
            min_executions: 1,
            ..Default::default()
        };
        let oracle = StrictConsensusOracle::with_config(config, fixtures(&["outage"]));
        assert!(oracle.verify(URL, "outage").await.unwrap());
    }
}
