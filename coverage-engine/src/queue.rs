//! Affected-party queue.
//!
//! The ordered `(wallet, amount)` list an incident pays out from. It doubles
//! as the loss basis for recovery distribution.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::Range;
use tracing::info;

use crate::codec::{decode_amounts, decode_wallets};
use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::types::{Amount, CoverageError, Result, WalletId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub wallet: WalletId,
    pub amount: Amount,
}

/// A validated queue with its exact total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedQueue {
    entries: Vec<QueueEntry>,
    total: Amount,
    /// SHA-256 over the canonical `wallet:amount` lines
    digest: String,
}

impl AffectedQueue {
    /// Decode parallel comma-delimited wallet and amount lists.
    pub fn from_delimited(wallets: &str, amounts: &str) -> Result<Self> {
        let wallets = decode_wallets(wallets)?;
        let amounts = decode_amounts(amounts)?;

        if wallets.is_empty() {
            return Err(CoverageError::InvalidArgument(
                "queue must not be empty".to_string(),
            ));
        }
        if wallets.len() != amounts.len() {
            return Err(CoverageError::InvalidArgument(format!(
                "length mismatch: {} wallets, {} amounts",
                wallets.len(),
                amounts.len()
            )));
        }

        let entries = wallets
            .into_iter()
            .zip(amounts)
            .map(|(wallet, amount)| QueueEntry { wallet, amount })
            .collect();
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<QueueEntry>) -> Result<Self> {
        let mut total: Amount = 0;
        let mut hasher = Sha256::new();
        for entry in &entries {
            total = total
                .checked_add(entry.amount)
                .ok_or_else(|| CoverageError::Overflow("queue total".to_string()))?;
            hasher.update(format!("{}:{}\n", entry.wallet, entry.amount).as_bytes());
        }

        Ok(Self {
            entries,
            total,
            digest: hex::encode(hasher.finalize()),
        })
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Index range `[start, min(start + limit, len))`, empty when `start` is past the end.
    pub fn window(&self, start: usize, limit: usize) -> Range<usize> {
        let end = start.saturating_add(limit).min(self.entries.len());
        start.min(end)..end
    }
}

impl CoverageEngine {
    /// Replace an incident's queue with the given wallets and amounts.
    ///
    /// Returns the new total. Fails once settlement has begun.
    pub fn attach_affected_users(
        &mut self,
        incident_id: &str,
        wallets: &str,
        amounts: &str,
    ) -> Result<Amount> {
        let incident = self.incident_ref(incident_id)?;
        if incident.enforced || incident.paid_count > 0 {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} settlement already started",
                incident_id
            )));
        }

        let queue = AffectedQueue::from_delimited(wallets, amounts)?;
        let total = queue.total();
        let detail = serde_json::json!({
            "entries": queue.len(),
            "total": total.to_string(),
            "digest": queue.digest(),
        });

        info!(
            incident_id = %incident_id,
            entries = queue.len(),
            total = %total,
            digest = %queue.digest(),
            "Affected-party queue attached"
        );
        self.incident_mut(incident_id)?.queue = queue;
        self.journal.record(Operation::QueueAttached, incident_id, detail);
        Ok(total)
    }

    /// Attach the per-wallet loss snapshot of a security incident.
    pub fn attach_loss_snapshot(
        &mut self,
        incident_id: &str,
        wallets: &str,
        losses: &str,
    ) -> Result<Amount> {
        self.attach_affected_users(incident_id, wallets, losses)
    }

    /// Queue digest, `""` when unknown.
    pub fn incident_queue_digest(&self, incident_id: &str) -> String {
        self.incidents
            .get(incident_id)
            .map(|i| i.queue.digest().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;

    #[test]
    fn test_total_is_exact_sum() {
        let queue = AffectedQueue::from_delimited("0xA,0xB,0xC", "300,200,1").unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.total(), 501);
        assert_eq!(queue.entries()[0].wallet.as_str(), "0xa");
        assert_eq!(queue.digest().len(), 64);
    }

    #[test]
    fn test_rejects_bad_lists() {
        assert!(AffectedQueue::from_delimited("", "").is_err());
        assert!(AffectedQueue::from_delimited("0xa,0xb", "1").is_err());
        assert!(AffectedQueue::from_delimited("0xa", "0").is_err());
        assert!(AffectedQueue::from_delimited("0xa", "abc").is_err());
    }

    #[test]
    fn test_total_overflow() {
        let max = Amount::MAX.to_string();
        let result = AffectedQueue::from_delimited("0xa,0xb", &format!("{},1", max));
        assert!(matches!(result, Err(CoverageError::Overflow(_))));
    }

    #[test]
    fn test_digest_follows_canonical_form() {
        let a = AffectedQueue::from_delimited("0xAA, 0xbb", "1,2").unwrap();
        let b = AffectedQueue::from_delimited("0xaa,0xBB", "1,2").unwrap();
        let c = AffectedQueue::from_delimited("0xbb,0xaa", "2,1").unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn test_window_clamps() {
        let queue = AffectedQueue::from_delimited("0xa,0xb,0xc", "1,1,1").unwrap();
        assert_eq!(queue.window(0, 2), 0..2);
        assert_eq!(queue.window(2, 10), 2..3);
        assert_eq!(queue.window(3, 1), 3..3);
        assert!(queue.window(7, usize::MAX).is_empty());
    }

    #[test]
    fn test_reattach_overwrites() {
        let mut engine = engine();
        engine.create_incident("inc-1", PROTOCOL, 1_700_000_000, "0xev").unwrap();

        assert_eq!(engine.attach_affected_users("inc-1", "0xa,0xb", "300,200").unwrap(), 500);
        assert_eq!(engine.attach_loss_snapshot("inc-1", "0xc", "7").unwrap(), 7);
        assert_eq!(engine.incident_queue_len("inc-1"), 1);
        assert_eq!(engine.incident_total_amount("inc-1"), 7);
        assert_eq!(engine.incident_queue_digest("inc-1").len(), 64);
    }

    #[test]
    fn test_failed_attach_keeps_previous_queue() {
        let mut engine = engine();
        engine.create_incident("inc-1", PROTOCOL, 1_700_000_000, "0xev").unwrap();
        engine.attach_affected_users("inc-1", "0xa", "10").unwrap();

        assert!(engine.attach_affected_users("inc-1", "0xa,0xb", "10").is_err());
        assert_eq!(engine.incident_total_amount("inc-1"), 10);
        assert!(matches!(
            engine.attach_affected_users("missing", "0xa", "10"),
            Err(CoverageError::NotFound(_))
        ));
    }
}
