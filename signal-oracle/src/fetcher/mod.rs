//! Page fetcher abstraction layer.
//!
//! Each fetcher is one independent execution of the fetch step:
//! - Live HTTP (reqwest)
//! - Static fixtures for tests and offline replays

pub mod http;
pub mod fixture;
pub mod traits;

pub use fixture::StaticPageFetcher;
pub use http::HttpPageFetcher;
pub use traits::{OracleError, PageFetcher};
