//! CertLayer coverage engine.
//!
//! Tracks coverage incidents against registered protocols and settles
//! compensation out of per-protocol insurance pools:
//!
//! - **Incident lifecycle**: decision, external signal, challenge window, finality
//! - **Batched payouts**: contiguous, all-or-nothing queue settlement
//! - **Disputes**: per-wallet exclusion from payouts
//! - **Recovery**: pro-rata redistribution of recovered funds
//! - **Compliance**: remediation commitments cascading into protocol status
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CoverageEngine                          │
//! │                                                              │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │ Incident │──►│   Queue   │──►│  Payout  │──►│  Ledger  │  │
//! │  └────┬─────┘   └─────┬─────┘   └────▲─────┘   └────▲─────┘  │
//! │       │               │              │              │        │
//! │       │               └──► Recovery ─┼──────────────┘        │
//! │       │                              │                       │
//! │       │                       ┌──────┴─────┐                 │
//! │       │                       │  Disputes  │                 │
//! │       │                       └────────────┘                 │
//! │  ┌────▼─────────┐   ┌────────────┐   ┌──────────────────┐    │
//! │  │ SignalOracle │   │ Commitment │──►│ ProtocolRegistry │    │
//! │  └──────────────┘   └────────────┘   └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write takes `&mut self` and either completes or fails with no state
//! change. Share an engine between tasks through [`SharedEngine`].

pub mod codec;
pub mod commitment;
pub mod config;
pub mod dispute;
pub mod engine;
pub mod incident;
pub mod journal;
pub mod ledger;
pub mod payout;
pub mod queue;
pub mod recovery;
pub mod registry;
pub mod reputation;
pub mod store;
pub mod types;

// Re-export main types
pub use commitment::{Commitment, ComplianceOutcome, NewCommitment};
pub use config::EngineConfig;
pub use dispute::{Dispute, DisputeKey};
pub use engine::{CoverageEngine, SharedEngine};
pub use incident::{Incident, ResponseScores, SecurityProfile};
pub use journal::{Journal, JournalEntry, Operation};
pub use payout::PayoutReceipt;
pub use queue::{AffectedQueue, QueueEntry};
pub use recovery::{pro_rata_share, RecoveryReceipt};
pub use registry::{InMemoryProtocolRegistry, ProtocolRecord, ProtocolRegistry};
pub use reputation::{Grade, Reputation, ScoreComponents};
pub use store::KeyedStore;
pub use types::*;
