//! Disputes against individual queue entries.
//!
//! A dispute is keyed by incident and wallet. Only a `rejected` decision has
//! any effect: it removes that wallet's entries from every payout batch of the
//! incident.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::store::KeyedStore;
use crate::types::{CoverageError, DisputeDecision, Result, WalletId};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisputeKey {
    pub incident_id: String,
    pub wallet: WalletId,
}

impl DisputeKey {
    pub fn new(incident_id: &str, wallet: WalletId) -> Self {
        Self {
            incident_id: incident_id.to_string(),
            wallet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub decision: DisputeDecision,
    pub evidence_hash: String,
}

#[derive(Debug, Default)]
pub struct DisputeBook {
    records: KeyedStore<DisputeKey, Dispute>,
}

impl DisputeBook {
    /// Open or reopen a dispute as `pending`.
    pub fn raise(&mut self, key: DisputeKey, evidence_hash: &str) {
        self.records.insert(
            key,
            Dispute {
                decision: DisputeDecision::Pending,
                evidence_hash: evidence_hash.to_string(),
            },
        );
    }

    pub fn resolve(&mut self, key: &DisputeKey, decision: DisputeDecision) -> Result<()> {
        let dispute = self.records.get_mut(key).ok_or_else(|| {
            CoverageError::NotFound(format!("dispute {}|{}", key.incident_id, key.wallet))
        })?;
        dispute.decision = decision;
        Ok(())
    }

    pub fn get(&self, key: &DisputeKey) -> Option<&Dispute> {
        self.records.get(key)
    }

    /// Whether `wallet` is excluded from payouts of `incident_id`.
    pub fn is_rejected(&self, incident_id: &str, wallet: &WalletId) -> bool {
        self.records
            .get(&DisputeKey::new(incident_id, wallet.clone()))
            .map(|d| d.decision == DisputeDecision::Rejected)
            .unwrap_or(false)
    }
}

impl CoverageEngine {
    /// Dispute a wallet's entry; a repeat overwrites the record back to `pending`.
    pub fn raise_dispute(&mut self, incident_id: &str, wallet: &str, evidence_hash: &str) -> Result<()> {
        self.incident_ref(incident_id)?;
        let wallet = WalletId::parse(wallet)?;

        info!(incident_id = %incident_id, wallet = %wallet, "Dispute raised");
        self.journal.record(
            Operation::DisputeRaised,
            incident_id,
            serde_json::json!({ "wallet": wallet.as_str(), "evidence_hash": evidence_hash }),
        );
        self.disputes
            .raise(DisputeKey::new(incident_id, wallet), evidence_hash);
        Ok(())
    }

    /// Resolve a dispute as `approved` or `rejected`.
    pub fn resolve_dispute(&mut self, incident_id: &str, wallet: &str, decision: &str) -> Result<()> {
        let decision: DisputeDecision = decision.parse()?;
        if decision == DisputeDecision::Pending {
            return Err(CoverageError::InvalidArgument(
                "dispute decision must be approved or rejected".to_string(),
            ));
        }
        let wallet = WalletId::parse(wallet)?;
        let key = DisputeKey::new(incident_id, wallet);
        self.disputes.resolve(&key, decision)?;

        info!(
            incident_id = %incident_id,
            wallet = %key.wallet,
            decision = %decision,
            "Dispute resolved"
        );
        self.journal.record(
            Operation::DisputeResolved,
            incident_id,
            serde_json::json!({ "wallet": key.wallet.as_str(), "decision": decision.as_str() }),
        );
        Ok(())
    }

    /// Decision on a dispute, `None` when no dispute was raised.
    pub fn dispute_decision(&self, incident_id: &str, wallet: &str) -> Option<DisputeDecision> {
        let wallet = WalletId::parse(wallet).ok()?;
        self.disputes
            .get(&DisputeKey::new(incident_id, wallet))
            .map(|d| d.decision)
    }
}
