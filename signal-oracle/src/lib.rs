//! Signal Oracle - consensus-checked web signal verification
//!
//! Answers a single question for the coverage engine: does the page at `url`
//! contain `must_contain` (case-insensitively)? The answer is only accepted when
//! every independent execution agrees.
//!
//! - Trait-based page fetchers (live HTTP, static fixtures)
//! - Strict-agreement reconciliation across executions
//! - Hard failures propagate; disagreement fails closed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         StrictConsensusOracle           │
//! │      (implements SignalOracle)          │
//! └────────────────┬────────────────────────┘
//!                  │ join_all
//!      ┌───────────┼───────────┐
//!      ▼           ▼           ▼
//! ┌─────────┐ ┌─────────┐ ┌─────────┐
//! │ Fetcher │ │ Fetcher │ │ Fetcher │
//! │ (HTTP / │ │         │ │         │
//! │ static) │ │         │ │         │
//! └─────────┘ └─────────┘ └─────────┘
//! ```

pub mod config;
pub mod consensus;
pub mod fetcher;

pub use config::ConsensusConfig;
pub use consensus::{content_matches, SignalOracle, StrictConsensusOracle};
pub use fetcher::traits::{OracleError, PageFetcher};
pub use fetcher::{HttpPageFetcher, StaticPageFetcher};
