//! Static page fetcher for tests and offline replays.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::traits::*;

/// Serves pre-recorded page bodies.
///
/// Unknown URLs answer 404, and the fetcher can be switched off to simulate an
/// execution that fails outright.
pub struct StaticPageFetcher {
    id: String,
    pages: DashMap<String, String>,
    available: AtomicBool,
    call_count: AtomicU32,
}

impl StaticPageFetcher {
    /// Create an empty fixture fetcher.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pages: DashMap::new(),
            available: AtomicBool::new(true),
            call_count: AtomicU32::new(0),
        }
    }

    /// Serve `body` for `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Replace the body served for `url`.
    pub fn set_page(&self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.insert(url.into(), body.into());
    }

    /// Number of fetches attempted.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for StaticPageFetcher {
    fn default() -> Self {
        Self::new("static-fetcher")
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_text(&self, url: &str) -> Result<String, OracleError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable(self.id.clone()));
        }

        self.pages
            .get(url)
            .map(|page| page.value().clone())
            .ok_or_else(|| OracleError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}
