//! Incident lifecycle.
//!
//! ```text
//!              ┌──────────┐
//!              │candidate │
//!              └────┬─────┘
//!        decision   │   oracle match
//!     ┌─────────────┼──────────────┐
//!     ▼                            ▼
//! ┌─────────┐                ┌───────────────┐
//! │ decided │◄──────────────►│signal_verified│
//! └────┬────┘                └───────┬───────┘
//!      └──────────┬──────────────────┘
//!                 ▼
//!         ┌──────────────┐   now ≥ ends_ts   ┌───────────┐  last batch  ┌──────┐
//!         │challenge_open│──────────────────►│ finalized │─────────────►│ paid │
//!         └──────────────┘                   └───────────┘              └──────┘
//! ```
//!
//! Opening the challenge window only requires the incident to exist; the
//! decision and signal steps may be skipped or taken in either order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::codec::decode_tags;
use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::queue::AffectedQueue;
use crate::types::{
    Amount, CoverageError, IncidentDecision, IncidentKind, IncidentStatus, Result, Timestamp,
};

/// Upper bound of every response sub-score.
pub const MAX_SUB_SCORE: u8 = 100;

/// Post-incident response sub-scores, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseScores {
    pub response_speed: u8,
    pub communication_quality: u8,
    pub pool_adequacy: u8,
    pub post_mortem_quality: u8,
    pub recovery_effort: u8,
}

impl ResponseScores {
    fn as_array(&self) -> [u8; 5] {
        [
            self.response_speed,
            self.communication_quality,
            self.pool_adequacy,
            self.post_mortem_quality,
            self.recovery_effort,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if self.as_array().iter().any(|s| *s > MAX_SUB_SCORE) {
            return Err(CoverageError::InvalidArgument(format!(
                "response sub-scores must be at most {}",
                MAX_SUB_SCORE
            )));
        }
        Ok(())
    }

    /// Floored mean of the five sub-scores.
    pub fn mean(&self) -> u8 {
        let sum: u16 = self.as_array().iter().map(|s| u16::from(*s)).sum();
        (sum / 5) as u8
    }
}

/// Extra context carried by security incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityProfile {
    /// Last block known to be unaffected
    pub last_clean_block: u64,
    /// Monitoring sources that fired
    pub trigger_sources: BTreeSet<String>,
    pub scores: ResponseScores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub protocol_id: String,
    pub kind: IncidentKind,
    pub status: IncidentStatus,
    pub start_ts: Timestamp,
    pub evidence_hash: String,
    pub decision: IncidentDecision,
    /// Free-text note; decision reasons are appended
    pub payload: String,
    pub signal_verified: bool,
    /// URL of the last signal check
    pub signal_note: String,
    /// 0 until a challenge window is opened
    pub challenge_ends_ts: Timestamp,
    pub queue: AffectedQueue,
    /// Queue entries settled so far
    pub paid_count: usize,
    pub enforced: bool,
    pub recovery_pool: Amount,
    pub recovery_distributed: Amount,
    pub security: Option<SecurityProfile>,
}

impl Incident {
    fn new(id: &str, protocol_id: &str, start_ts: Timestamp, evidence_hash: &str) -> Self {
        Self {
            id: id.to_string(),
            protocol_id: protocol_id.to_string(),
            kind: IncidentKind::Availability,
            status: IncidentStatus::Candidate,
            start_ts,
            evidence_hash: evidence_hash.to_string(),
            decision: IncidentDecision::Pending,
            payload: "{}".to_string(),
            signal_verified: false,
            signal_note: String::new(),
            challenge_ends_ts: 0,
            queue: AffectedQueue::default(),
            paid_count: 0,
            enforced: false,
            recovery_pool: 0,
            recovery_distributed: 0,
            security: None,
        }
    }

    pub fn total_amount(&self) -> Amount {
        self.queue.total()
    }

    pub fn recovery_remaining(&self) -> Amount {
        self.recovery_pool.saturating_sub(self.recovery_distributed)
    }

    /// Response score, 0 for availability incidents.
    pub fn response_score(&self) -> u8 {
        self.security.as_ref().map(|s| s.scores.mean()).unwrap_or(0)
    }
}

impl CoverageEngine {
    /// Record a new availability incident against a registered protocol.
    pub fn create_incident(
        &mut self,
        incident_id: &str,
        protocol_id: &str,
        start_ts: Timestamp,
        evidence_hash: &str,
    ) -> Result<()> {
        let incident = self.new_incident(incident_id, protocol_id, start_ts, evidence_hash)?;
        self.store_incident(incident);
        Ok(())
    }

    /// Record a new security incident.
    pub fn create_security_incident(
        &mut self,
        incident_id: &str,
        protocol_id: &str,
        start_ts: Timestamp,
        evidence_hash: &str,
        last_clean_block: u64,
        trigger_sources: &str,
    ) -> Result<()> {
        let mut incident = self.new_incident(incident_id, protocol_id, start_ts, evidence_hash)?;
        incident.kind = IncidentKind::Security;
        incident.security = Some(SecurityProfile {
            last_clean_block,
            trigger_sources: decode_tags(trigger_sources),
            scores: ResponseScores::default(),
        });
        self.store_incident(incident);
        Ok(())
    }

    fn new_incident(
        &self,
        incident_id: &str,
        protocol_id: &str,
        start_ts: Timestamp,
        evidence_hash: &str,
    ) -> Result<Incident> {
        if incident_id.trim().is_empty() {
            return Err(CoverageError::InvalidArgument(
                "incident id must not be empty".to_string(),
            ));
        }
        if self.incidents.contains(incident_id) {
            return Err(CoverageError::AlreadyExists(format!("incident {}", incident_id)));
        }
        self.ensure_protocol(protocol_id)?;
        if start_ts <= 0 {
            return Err(CoverageError::InvalidArgument(
                "start timestamp must be positive".to_string(),
            ));
        }
        Ok(Incident::new(incident_id, protocol_id, start_ts, evidence_hash))
    }

    fn store_incident(&mut self, incident: Incident) {
        info!(
            incident_id = %incident.id,
            protocol_id = %incident.protocol_id,
            kind = %incident.kind,
            "Incident created"
        );
        self.journal.record(
            Operation::IncidentCreated,
            &incident.id,
            serde_json::json!({
                "protocol_id": incident.protocol_id,
                "kind": incident.kind.as_str(),
                "start_ts": incident.start_ts,
            }),
        );
        self.incidents.insert(incident.id.clone(), incident);
    }

    /// Record a breach decision (`breach_confirmed` or `breach_rejected`).
    pub fn set_decision(&mut self, incident_id: &str, decision: &str, reason: &str) -> Result<()> {
        let decision: IncidentDecision = decision.parse()?;
        if decision == IncidentDecision::Pending {
            return Err(CoverageError::InvalidArgument(
                "decision must be breach_confirmed or breach_rejected".to_string(),
            ));
        }

        let incident = self.incident_mut(incident_id)?;
        incident.decision = decision;
        incident.status = IncidentStatus::Decided;
        incident.payload.push_str(&format!(" | reason={}", reason));

        info!(incident_id = %incident_id, decision = %decision, "Incident decided");
        self.journal.record(
            Operation::DecisionRecorded,
            incident_id,
            serde_json::json!({ "decision": decision.as_str(), "reason": reason }),
        );
        Ok(())
    }

    /// Check an external status page through the signal oracle.
    ///
    /// Oracle failures propagate as errors and leave the incident untouched.
    pub async fn verify_external_signal(
        &mut self,
        incident_id: &str,
        url: &str,
        must_contain: &str,
    ) -> Result<bool> {
        if url.trim().is_empty() {
            return Err(CoverageError::InvalidArgument("url must not be empty".to_string()));
        }
        self.incident_ref(incident_id)?;

        let oracle = self.oracle.clone();
        let verified = match oracle.verify(url, must_contain).await {
            Ok(verified) => verified,
            Err(err) => {
                warn!(incident_id = %incident_id, url = %url, error = %err, "Signal check failed");
                return Err(err.into());
            }
        };

        let incident = self.incident_mut(incident_id)?;
        incident.signal_verified = verified;
        incident.signal_note = url.to_string();
        if verified {
            incident.status = IncidentStatus::SignalVerified;
        }

        info!(incident_id = %incident_id, url = %url, verified, "External signal checked");
        self.journal.record(
            Operation::SignalChecked,
            incident_id,
            serde_json::json!({ "url": url, "verified": verified }),
        );
        Ok(verified)
    }

    /// Open the dispute window, ending at `ends_ts`.
    pub fn open_challenge_window(&mut self, incident_id: &str, ends_ts: Timestamp) -> Result<()> {
        if ends_ts <= 0 {
            return Err(CoverageError::InvalidArgument(
                "challenge end must be positive".to_string(),
            ));
        }

        let incident = self.incident_mut(incident_id)?;
        incident.challenge_ends_ts = ends_ts;
        incident.status = IncidentStatus::ChallengeOpen;

        info!(incident_id = %incident_id, ends_ts, "Challenge window opened");
        self.journal.record(
            Operation::ChallengeOpened,
            incident_id,
            serde_json::json!({ "ends_ts": ends_ts }),
        );
        Ok(())
    }

    /// Close review once the challenge window has elapsed.
    pub fn finalize_incident(&mut self, incident_id: &str, now: Timestamp) -> Result<()> {
        let incident = self.incident_mut(incident_id)?;
        if incident.challenge_ends_ts == 0 {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} has no challenge window",
                incident_id
            )));
        }
        if now < incident.challenge_ends_ts {
            return Err(CoverageError::PreconditionFailed(format!(
                "challenge window for {} open until {}",
                incident_id, incident.challenge_ends_ts
            )));
        }
        incident.status = IncidentStatus::Finalized;

        info!(incident_id = %incident_id, now, "Incident finalized");
        self.journal.record(
            Operation::IncidentFinalized,
            incident_id,
            serde_json::json!({ "now": now }),
        );
        Ok(())
    }

    /// Score the protocol's response to a security incident.
    pub fn set_response_scores(&mut self, incident_id: &str, scores: ResponseScores) -> Result<u8> {
        scores.validate()?;
        let incident = self.incident_mut(incident_id)?;
        let profile = incident.security.as_mut().ok_or_else(|| {
            CoverageError::PreconditionFailed(format!(
                "incident {} is not a security incident",
                incident_id
            ))
        })?;
        profile.scores = scores;
        let score = scores.mean();

        info!(incident_id = %incident_id, score, "Response scored");
        self.journal.record(
            Operation::ResponseScored,
            incident_id,
            serde_json::json!({ "score": score }),
        );
        Ok(score)
    }

    pub fn incident(&self, incident_id: &str) -> Option<&Incident> {
        self.incidents.get(incident_id)
    }

    pub fn incident_status(&self, incident_id: &str) -> Option<IncidentStatus> {
        self.incidents.get(incident_id).map(|i| i.status)
    }

    pub fn incident_decision(&self, incident_id: &str) -> IncidentDecision {
        self.incidents
            .get(incident_id)
            .map(|i| i.decision)
            .unwrap_or_default()
    }

    pub fn incident_payload(&self, incident_id: &str) -> String {
        self.incidents
            .get(incident_id)
            .map(|i| i.payload.clone())
            .unwrap_or_default()
    }

    pub fn incident_signal_verified(&self, incident_id: &str) -> bool {
        self.incidents
            .get(incident_id)
            .map(|i| i.signal_verified)
            .unwrap_or(false)
    }

    pub fn incident_signal_note(&self, incident_id: &str) -> String {
        self.incidents
            .get(incident_id)
            .map(|i| i.signal_note.clone())
            .unwrap_or_default()
    }

    pub fn incident_protocol_id(&self, incident_id: &str) -> String {
        self.incidents
            .get(incident_id)
            .map(|i| i.protocol_id.clone())
            .unwrap_or_default()
    }

    pub fn incident_challenge_ends_ts(&self, incident_id: &str) -> Timestamp {
        self.incidents
            .get(incident_id)
            .map(|i| i.challenge_ends_ts)
            .unwrap_or(0)
    }

    pub fn incident_total_amount(&self, incident_id: &str) -> Amount {
        self.incidents
            .get(incident_id)
            .map(Incident::total_amount)
            .unwrap_or(0)
    }

    pub fn incident_paid_count(&self, incident_id: &str) -> usize {
        self.incidents
            .get(incident_id)
            .map(|i| i.paid_count)
            .unwrap_or(0)
    }

    pub fn incident_queue_len(&self, incident_id: &str) -> usize {
        self.incidents
            .get(incident_id)
            .map(|i| i.queue.len())
            .unwrap_or(0)
    }

    pub fn is_incident_enforced(&self, incident_id: &str) -> bool {
        self.incidents
            .get(incident_id)
            .map(|i| i.enforced)
            .unwrap_or(false)
    }

    pub fn incident_response_score(&self, incident_id: &str) -> u8 {
        self.incidents
            .get(incident_id)
            .map(Incident::response_score)
            .unwrap_or(0)
    }
}
