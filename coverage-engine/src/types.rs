//! Core types for the coverage engine.
//!
//! Lifecycle enums carry their wire literal (`as_str`) and parse back from it,
//! so callers handing in text get an `InvalidArgument` for unknown literals.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs for the dashboard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Token amount. Every ledger operation on it is checked.
pub type Amount = u128;

/// Caller-supplied unix timestamp (seconds).
pub type Timestamp = i64;

/// Trim and case-fold a wallet identifier.
pub fn canonical_wallet(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A wallet identifier in canonical lowercase form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(String);

impl WalletId {
    /// Canonicalize `raw`, rejecting identifiers that are empty after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let wallet = canonical_wallet(raw);
        if wallet.is_empty() {
            return Err(CoverageError::InvalidArgument("invalid wallet".to_string()));
        }
        Ok(Self(wallet))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! literal_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $lit:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "typescript", derive(TS))]
        #[cfg_attr(feature = "typescript", ts(export))]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Wire literal.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $lit ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoverageError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $lit => Ok(Self::$variant), )+
                    other => Err(CoverageError::InvalidArgument(format!(
                        "invalid {} '{}'",
                        $what, other
                    ))),
                }
            }
        }
    };
}

literal_enum! {
    /// Incident typing.
    IncidentKind, "incident kind" {
        /// Downtime / degraded service
        Availability => "availability",
        /// Exploit or hack
        Security => "security",
    }
}

impl Default for IncidentKind {
    fn default() -> Self {
        Self::Availability
    }
}

literal_enum! {
    /// Incident lifecycle status.
    IncidentStatus, "incident status" {
        Candidate => "candidate",
        Decided => "decided",
        SignalVerified => "signal_verified",
        ChallengeOpen => "challenge_open",
        Finalized => "finalized",
        /// Reached only by a payout batch covering the end of the queue
        Paid => "paid",
    }
}

literal_enum! {
    /// Breach decision on an incident.
    IncidentDecision, "decision" {
        Pending => "pending",
        BreachConfirmed => "breach_confirmed",
        BreachRejected => "breach_rejected",
    }
}

impl Default for IncidentDecision {
    fn default() -> Self {
        Self::Pending
    }
}

literal_enum! {
    /// Decision on a disputed queue entry.
    DisputeDecision, "dispute decision" {
        Pending => "pending",
        /// Recorded only; payouts special-case `Rejected` alone
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// Remediation commitment category.
///
/// The dashboard offers the named categories; any other label is kept as
/// given, and a blank label reads as `other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum CommitmentKind {
    Uptime,
    Governance,
    Roadmap,
    Financial,
    Security,
    Communication,
    Custom(String),
}

impl CommitmentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uptime => "uptime",
            Self::Governance => "governance",
            Self::Roadmap => "roadmap",
            Self::Financial => "financial",
            Self::Security => "security",
            Self::Communication => "communication",
            Self::Custom(kind) => kind,
        }
    }
}

impl fmt::Display for CommitmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CommitmentKind {
    fn from(kind: &str) -> Self {
        match kind.trim() {
            "uptime" => Self::Uptime,
            "governance" => Self::Governance,
            "roadmap" => Self::Roadmap,
            "financial" => Self::Financial,
            "security" => Self::Security,
            "communication" => Self::Communication,
            "" => Self::Custom("other".to_string()),
            other => Self::Custom(other.to_string()),
        }
    }
}

literal_enum! {
    /// Commitment compliance status.
    CommitmentStatus, "commitment status" {
        Registered => "registered",
        Fulfilled => "fulfilled",
        Partial => "partial",
        MissedGrace => "missed_grace",
        FulfilledGrace => "fulfilled_grace",
        MissedFinal => "missed_final",
    }
}

literal_enum! {
    /// Outcome submitted when evaluating a commitment.
    EvaluationResult, "evaluation result" {
        Fulfilled => "fulfilled",
        Partial => "partial",
        Missed => "missed",
    }
}

/// Protocol status as exposed by the registry.
///
/// The three named states are the ones compliance cascading writes; anything
/// else a registry operator sets is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStatus {
    Active,
    Probationary,
    CoverageSuspended,
    Custom(String),
}

impl ProtocolStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Probationary => "probationary",
            Self::CoverageSuspended => "coverage_suspended",
            Self::Custom(status) => status,
        }
    }
}

impl Default for ProtocolStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for ProtocolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ProtocolStatus {
    fn from(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "probationary" => Self::Probationary,
            "coverage_suspended" => Self::CoverageSuspended,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Error types for the coverage engine.
///
/// Every failing operation leaves the engine state untouched.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    /// Unknown incident, protocol, commitment or dispute
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate identifier on create
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Wrong lifecycle state, open window, mismatched protocol
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Pool cannot cover a batch
    #[error("Insufficient pool balance for {protocol_id}: available {available}, required {required}")]
    InsufficientFunds {
        protocol_id: String,
        available: Amount,
        required: Amount,
    },

    /// Result would not fit in an `Amount`
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// The signal oracle failed outright
    #[error("Signal verification failed: {0}")]
    Signal(#[from] signal_oracle::OracleError),
}

pub type Result<T> = std::result::Result<T, CoverageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_canonical_form() {
        let wallet = WalletId::parse("  0xAbCd ").unwrap();
        assert_eq!(wallet.as_str(), "0xabcd");
        assert_eq!(wallet, WalletId::parse("0XABCD").unwrap());
        assert!(WalletId::parse("   ").is_err());
    }

    #[test]
    fn test_literals_round_trip() {
        assert_eq!(
            "breach_confirmed".parse::<IncidentDecision>().unwrap(),
            IncidentDecision::BreachConfirmed
        );
        assert_eq!(IncidentStatus::SignalVerified.as_str(), "signal_verified");
        assert_eq!(CommitmentStatus::MissedGrace.to_string(), "missed_grace");

        let err = "maybe".parse::<DisputeDecision>().unwrap_err();
        assert!(matches!(err, CoverageError::InvalidArgument(_)));
    }

    #[test]
    fn test_serde_uses_literals() {
        let json = serde_json::to_string(&IncidentStatus::ChallengeOpen).unwrap();
        assert_eq!(json, "\"challenge_open\"");
    }

    #[test]
    fn test_protocol_status_from_text() {
        assert_eq!(ProtocolStatus::from("coverage_suspended"), ProtocolStatus::CoverageSuspended);
        assert_eq!(ProtocolStatus::from("paused").as_str(), "paused");
        assert_eq!(ProtocolStatus::default(), ProtocolStatus::Active);
    }

    #[test]
    fn test_commitment_kind_keeps_unlisted_labels() {
        assert_eq!(CommitmentKind::from("uptime"), CommitmentKind::Uptime);
        assert_eq!(CommitmentKind::from("audit").as_str(), "audit");
        assert_eq!(CommitmentKind::from("  ").as_str(), "other");
    }
}
