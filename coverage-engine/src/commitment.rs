//! Commitment compliance.
//!
//! ```text
//!                 ┌────────────┐
//!                 │ registered │
//!                 └─────┬──────┘
//!        ┌──────────────┼───────────────┐
//!        ▼              ▼               ▼
//!  ┌───────────┐  ┌─────────┐   ┌──────────────┐  evidence  ┌─────────────────┐
//!  │ fulfilled │  │ partial │   │ missed_grace │───────────►│ fulfilled_grace │
//!  └───────────┘  └─────────┘   └──────┬───────┘            └─────────────────┘
//!                                      │ grace elapsed
//!                                      ▼
//!                               ┌──────────────┐
//!                               │ missed_final │──► protocol miss counter +1
//!                               └──────────────┘
//! ```
//!
//! The miss counter never decreases. Reaching the probation threshold marks
//! the protocol `probationary`; reaching the suspension threshold marks it
//! `coverage_suspended`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::types::{
    Amount, CommitmentKind, CommitmentStatus, CoverageError, EvaluationResult, ProtocolStatus,
    Result, Timestamp,
};

/// Asset recorded when a commitment names none.
pub const DEFAULT_COMMITMENT_ASSET: &str = "USDC";

/// Registration request for a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommitment {
    pub id: String,
    pub protocol_id: String,
    /// Category label, e.g. `uptime`; blank reads as `other`
    pub kind: String,
    pub source_url: String,
    pub text_hash: String,
    pub deadline_ts: Timestamp,
    /// Opaque rule the evaluator applies
    pub verification_rule: String,
    /// Amount pledged, 0 when the commitment is not financial
    pub amount: Amount,
    /// Blank reads as `USDC`
    pub asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    pub protocol_id: String,
    pub kind: CommitmentKind,
    pub source_url: String,
    pub text_hash: String,
    pub deadline_ts: Timestamp,
    pub verification_rule: String,
    pub amount: Amount,
    pub asset: String,
    pub status: CommitmentStatus,
    pub evidence_hash: String,
    /// 0 when no grace period is running
    pub grace_ends_ts: Timestamp,
}

/// Result of a terminal miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceOutcome {
    pub protocol_id: String,
    pub missed_commitments: u32,
    /// Status written to the registry, if the miss crossed a threshold
    pub protocol_status: Option<ProtocolStatus>,
}

impl CoverageEngine {
    pub fn register_commitment(&mut self, request: NewCommitment) -> Result<()> {
        if request.id.trim().is_empty() {
            return Err(CoverageError::InvalidArgument(
                "commitment id must not be empty".to_string(),
            ));
        }
        if self.commitments.contains(request.id.as_str()) {
            return Err(CoverageError::AlreadyExists(format!("commitment {}", request.id)));
        }
        self.ensure_protocol(&request.protocol_id)?;
        let kind = CommitmentKind::from(request.kind.as_str());
        if request.deadline_ts <= 0 {
            return Err(CoverageError::InvalidArgument(
                "deadline must be positive".to_string(),
            ));
        }

        let asset = match request.asset.trim() {
            "" => DEFAULT_COMMITMENT_ASSET.to_string(),
            asset => asset.to_string(),
        };

        let commitment = Commitment {
            id: request.id,
            protocol_id: request.protocol_id,
            kind,
            source_url: request.source_url,
            text_hash: request.text_hash,
            deadline_ts: request.deadline_ts,
            verification_rule: request.verification_rule,
            amount: request.amount,
            asset,
            status: CommitmentStatus::Registered,
            evidence_hash: String::new(),
            grace_ends_ts: 0,
        };

        info!(
            commitment_id = %commitment.id,
            protocol_id = %commitment.protocol_id,
            kind = %commitment.kind,
            deadline_ts = commitment.deadline_ts,
            "Commitment registered"
        );
        self.journal.record(
            Operation::CommitmentRegistered,
            &commitment.id,
            serde_json::json!({
                "protocol_id": commitment.protocol_id,
                "kind": commitment.kind.as_str(),
                "deadline_ts": commitment.deadline_ts,
                "amount": commitment.amount.to_string(),
                "asset": commitment.asset,
            }),
        );
        self.commitments.insert(commitment.id.clone(), commitment);
        Ok(())
    }

    /// Record the evaluation of a registered commitment.
    ///
    /// A miss opens the grace period, ending `grace_period_secs` after `now`.
    pub fn evaluate_commitment(
        &mut self,
        commitment_id: &str,
        result: &str,
        evidence_hash: &str,
        now: Timestamp,
    ) -> Result<CommitmentStatus> {
        let result: EvaluationResult = result.parse()?;
        let grace_period = self.config.grace_period_secs;
        let commitment = self.commitment_mut(commitment_id)?;
        if commitment.status != CommitmentStatus::Registered {
            return Err(CoverageError::PreconditionFailed(format!(
                "commitment {} already evaluated ({})",
                commitment_id, commitment.status
            )));
        }

        let (status, grace_ends_ts) = match result {
            EvaluationResult::Fulfilled => (CommitmentStatus::Fulfilled, 0),
            EvaluationResult::Partial => (CommitmentStatus::Partial, 0),
            EvaluationResult::Missed => {
                let ends = now
                    .checked_add(grace_period)
                    .ok_or_else(|| CoverageError::Overflow("grace period end".to_string()))?;
                (CommitmentStatus::MissedGrace, ends)
            }
        };
        commitment.status = status;
        commitment.grace_ends_ts = grace_ends_ts;
        commitment.evidence_hash = evidence_hash.to_string();

        info!(commitment_id = %commitment_id, status = %status, grace_ends_ts, "Commitment evaluated");
        self.journal.record(
            Operation::CommitmentEvaluated,
            commitment_id,
            serde_json::json!({ "result": result.as_str(), "grace_ends_ts": grace_ends_ts }),
        );
        Ok(status)
    }

    /// Cure a missed commitment during its grace period.
    pub fn submit_fulfillment_evidence(&mut self, commitment_id: &str, evidence_hash: &str) -> Result<()> {
        let commitment = self.commitment_mut(commitment_id)?;
        if commitment.status != CommitmentStatus::MissedGrace {
            return Err(CoverageError::PreconditionFailed(format!(
                "commitment {} is {}, not missed_grace",
                commitment_id, commitment.status
            )));
        }
        commitment.status = CommitmentStatus::FulfilledGrace;
        commitment.evidence_hash = evidence_hash.to_string();
        commitment.grace_ends_ts = 0;

        info!(commitment_id = %commitment_id, "Commitment fulfilled within grace");
        self.journal.record(
            Operation::FulfillmentEvidence,
            commitment_id,
            serde_json::json!({ "evidence_hash": evidence_hash }),
        );
        Ok(())
    }

    /// Make a miss final once the grace period has elapsed.
    pub fn finalize_commitment(&mut self, commitment_id: &str, now: Timestamp) -> Result<ComplianceOutcome> {
        let commitment = self
            .commitments
            .get(commitment_id)
            .ok_or_else(|| CoverageError::NotFound(format!("commitment {}", commitment_id)))?;
        if commitment.status != CommitmentStatus::MissedGrace {
            return Err(CoverageError::PreconditionFailed(format!(
                "commitment {} is {}, not missed_grace",
                commitment_id, commitment.status
            )));
        }
        if now < commitment.grace_ends_ts {
            return Err(CoverageError::PreconditionFailed(format!(
                "grace period for {} runs until {}",
                commitment_id, commitment.grace_ends_ts
            )));
        }

        let protocol_id = commitment.protocol_id.clone();
        let missed = self.missed_commitments.read(protocol_id.as_str()).saturating_add(1);
        let protocol_status = self.cascade_status(missed);

        // registry write first: if it fails nothing here has moved
        if let Some(status) = &protocol_status {
            self.registry.set_status(&protocol_id, status.clone())?;
            warn!(
                protocol_id = %protocol_id,
                missed_commitments = missed,
                status = %status,
                "Protocol compliance downgraded"
            );
        }

        if let Some(commitment) = self.commitments.get_mut(commitment_id) {
            commitment.status = CommitmentStatus::MissedFinal;
        }
        self.missed_commitments.insert(protocol_id.clone(), missed);

        info!(commitment_id = %commitment_id, protocol_id = %protocol_id, missed, "Commitment missed");
        self.journal.record(
            Operation::CommitmentFinalized,
            commitment_id,
            serde_json::json!({
                "protocol_id": protocol_id,
                "missed_commitments": missed,
                "protocol_status": protocol_status.as_ref().map(|s| s.to_string()),
            }),
        );

        Ok(ComplianceOutcome {
            protocol_id,
            missed_commitments: missed,
            protocol_status,
        })
    }

    fn cascade_status(&self, missed: u32) -> Option<ProtocolStatus> {
        if missed >= self.config.suspension_threshold {
            Some(ProtocolStatus::CoverageSuspended)
        } else if missed == self.config.probation_threshold {
            Some(ProtocolStatus::Probationary)
        } else {
            None
        }
    }

    fn commitment_mut(&mut self, commitment_id: &str) -> Result<&mut Commitment> {
        self.commitments
            .get_mut(commitment_id)
            .ok_or_else(|| CoverageError::NotFound(format!("commitment {}", commitment_id)))
    }

    pub fn commitment(&self, commitment_id: &str) -> Option<&Commitment> {
        self.commitments.get(commitment_id)
    }

    pub fn commitment_status(&self, commitment_id: &str) -> Option<CommitmentStatus> {
        self.commitments.get(commitment_id).map(|c| c.status)
    }

    pub fn missed_commitments_count(&self, protocol_id: &str) -> u32 {
        self.missed_commitments.read(protocol_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;
    use crate::registry::ProtocolRegistry;

    const NOW: Timestamp = 1_700_000_000;
    const WEEK: Timestamp = 604_800;

    fn request(id: &str) -> NewCommitment {
        NewCommitment {
            id: id.to_string(),
            protocol_id: PROTOCOL.to_string(),
            kind: "uptime".to_string(),
            source_url: "https://forum.example/post/1".to_string(),
            text_hash: "0xtext".to_string(),
            deadline_ts: NOW,
            verification_rule: "uptime >= 99.9".to_string(),
            amount: 0,
            asset: String::new(),
        }
    }

    fn miss(engine: &mut CoverageEngine, id: &str) -> ComplianceOutcome {
        engine.register_commitment(request(id)).unwrap();
        engine.evaluate_commitment(id, "missed", "0xev", NOW).unwrap();
        engine.finalize_commitment(id, NOW + WEEK).unwrap()
    }

    #[test]
    fn test_register_validation() {
        let mut engine = engine();
        engine.register_commitment(request("c-1")).unwrap();
        assert_eq!(engine.commitment_status("c-1"), Some(CommitmentStatus::Registered));
        assert_eq!(engine.commitment("c-1").unwrap().kind, CommitmentKind::Uptime);

        assert!(matches!(
            engine.register_commitment(request("c-1")),
            Err(CoverageError::AlreadyExists(_))
        ));
        assert!(matches!(
            engine.register_commitment(NewCommitment {
                protocol_id: "unknown".into(),
                ..request("c-2")
            }),
            Err(CoverageError::NotFound(_))
        ));
        assert!(engine
            .register_commitment(NewCommitment {
                deadline_ts: 0,
                ..request("c-2")
            })
            .is_err());
    }

    #[test]
    fn test_register_keeps_unlisted_kind_and_asset() {
        let mut engine = engine();
        engine
            .register_commitment(NewCommitment {
                kind: "other".into(),
                ..request("c-1")
            })
            .unwrap();
        engine
            .register_commitment(NewCommitment {
                kind: "treasury-diversification".into(),
                amount: 250_000,
                asset: "DAI".into(),
                ..request("c-2")
            })
            .unwrap();

        let first = engine.commitment("c-1").unwrap();
        assert_eq!(first.kind.as_str(), "other");
        assert_eq!(first.amount, 0);
        assert_eq!(first.asset, DEFAULT_COMMITMENT_ASSET);

        let second = engine.commitment("c-2").unwrap();
        assert_eq!(second.kind, CommitmentKind::Custom("treasury-diversification".into()));
        assert_eq!(second.amount, 250_000);
        assert_eq!(second.asset, "DAI");
    }

    #[test]
    fn test_evaluate_outcomes() {
        let mut engine = engine();
        for id in ["c-1", "c-2", "c-3"] {
            engine.register_commitment(request(id)).unwrap();
        }

        assert_eq!(
            engine.evaluate_commitment("c-1", "fulfilled", "0x1", NOW).unwrap(),
            CommitmentStatus::Fulfilled
        );
        assert_eq!(
            engine.evaluate_commitment("c-2", "partial", "0x2", NOW).unwrap(),
            CommitmentStatus::Partial
        );
        assert_eq!(
            engine.evaluate_commitment("c-3", "missed", "0x3", NOW).unwrap(),
            CommitmentStatus::MissedGrace
        );
        assert_eq!(engine.commitment("c-3").unwrap().grace_ends_ts, NOW + WEEK);

        assert!(matches!(
            engine.evaluate_commitment("c-1", "missed", "0x1", NOW),
            Err(CoverageError::PreconditionFailed(_))
        ));
        assert!(engine.evaluate_commitment("c-2", "late", "0x", NOW).is_err());
    }

    #[test]
    fn test_fulfillment_during_grace() {
        let mut engine = engine();
        engine.register_commitment(request("c-1")).unwrap();
        assert!(engine.submit_fulfillment_evidence("c-1", "0xfix").is_err());

        engine.evaluate_commitment("c-1", "missed", "0xev", NOW).unwrap();
        engine.submit_fulfillment_evidence("c-1", "0xfix").unwrap();

        let commitment = engine.commitment("c-1").unwrap();
        assert_eq!(commitment.status, CommitmentStatus::FulfilledGrace);
        assert_eq!(commitment.grace_ends_ts, 0);
        assert!(engine.finalize_commitment("c-1", NOW + WEEK).is_err());
    }

    #[test]
    fn test_finalize_waits_for_grace() {
        let mut engine = engine();
        engine.register_commitment(request("c-1")).unwrap();
        engine.evaluate_commitment("c-1", "missed", "0xev", NOW).unwrap();

        assert!(matches!(
            engine.finalize_commitment("c-1", NOW + WEEK - 1),
            Err(CoverageError::PreconditionFailed(_))
        ));
        assert_eq!(engine.missed_commitments_count(PROTOCOL), 0);

        let outcome = engine.finalize_commitment("c-1", NOW + WEEK).unwrap();
        assert_eq!(outcome.missed_commitments, 1);
        assert_eq!(outcome.protocol_status, None);
        assert_eq!(engine.commitment_status("c-1"), Some(CommitmentStatus::MissedFinal));

        assert!(engine.finalize_commitment("c-1", NOW + WEEK).is_err());
        assert_eq!(engine.missed_commitments_count(PROTOCOL), 1);
    }

    #[test]
    fn test_cascade_thresholds() {
        let (mut engine, registry) = engine_with_page("");

        miss(&mut engine, "c-1");
        assert_eq!(registry.status(PROTOCOL), Some(ProtocolStatus::Active));

        let second = miss(&mut engine, "c-2");
        assert_eq!(second.protocol_status, Some(ProtocolStatus::Probationary));
        assert_eq!(registry.status(PROTOCOL), Some(ProtocolStatus::Probationary));

        miss(&mut engine, "c-3");
        assert_eq!(registry.status(PROTOCOL), Some(ProtocolStatus::CoverageSuspended));

        // an operator reset does not reset the counter
        registry.set_protocol_status(PROTOCOL, "active").unwrap();
        let fourth = miss(&mut engine, "c-4");
        assert_eq!(fourth.missed_commitments, 4);
        assert_eq!(registry.status(PROTOCOL), Some(ProtocolStatus::CoverageSuspended));
    }

    #[test]
    fn test_custom_grace_period() {
        let (_, registry) = engine_with_page("");
        let config = crate::config::EngineConfig::default().with_grace_period_secs(60);
        let mut engine = CoverageEngine::with_config(config, registry, oracle_with_page(""));
        engine.register_commitment(request("c-1")).unwrap();
        engine.evaluate_commitment("c-1", "missed", "0xev", NOW).unwrap();
        engine.finalize_commitment("c-1", NOW + 60).unwrap();
    }
}
