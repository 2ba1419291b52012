//! Batched payout settlement.
//!
//! A batch settles the queue range `[start_index, start_index + limit)` of a
//! finalized incident. Batches must be contiguous: each one starts where the
//! previous one stopped. The whole batch is planned before any balance moves,
//! so an underfunded pool or an overflowing wallet rejects it in full.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::types::{Amount, CoverageError, IncidentStatus, Result, Timestamp, WalletId};

/// Outcome of one payout batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub incident_id: String,
    pub start_index: usize,
    pub end_index: usize,
    /// Amount debited from the pool
    pub batch_total: Amount,
    /// Entries credited
    pub credited: usize,
    /// Entries skipped because the wallet's dispute was rejected
    pub skipped: usize,
    /// Whether this batch completed the queue
    pub settled: bool,
}

impl CoverageEngine {
    /// Pay out one range of an incident's queue from the protocol pool.
    pub fn execute_payout_batch(
        &mut self,
        incident_id: &str,
        protocol_id: &str,
        start_index: usize,
        limit: usize,
        now: Timestamp,
    ) -> Result<PayoutReceipt> {
        let incident = self
            .incidents
            .get(incident_id)
            .ok_or_else(|| CoverageError::NotFound(format!("incident {}", incident_id)))?;

        if incident.enforced {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} already enforced",
                incident_id
            )));
        }
        if incident.status != IncidentStatus::Finalized {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} is {}, not finalized",
                incident_id, incident.status
            )));
        }
        if incident.protocol_id != protocol_id {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} belongs to {}, not {}",
                incident_id, incident.protocol_id, protocol_id
            )));
        }
        if now < incident.challenge_ends_ts {
            return Err(CoverageError::PreconditionFailed(format!(
                "challenge window for {} open until {}",
                incident_id, incident.challenge_ends_ts
            )));
        }
        if limit == 0 {
            return Err(CoverageError::InvalidArgument(
                "batch limit must be positive".to_string(),
            ));
        }
        if start_index != incident.paid_count {
            return Err(CoverageError::PreconditionFailed(format!(
                "batch for {} must start at {}, got {}",
                incident_id, incident.paid_count, start_index
            )));
        }

        let window = incident.queue.window(start_index, limit);
        let queue_len = incident.queue.len();

        let mut batch_total: Amount = 0;
        let mut credits: BTreeMap<WalletId, Amount> = BTreeMap::new();
        let mut credited = 0;
        let mut skipped = 0;
        for entry in &incident.queue.entries()[window.clone()] {
            if self.disputes.is_rejected(incident_id, &entry.wallet) {
                debug!(incident_id = %incident_id, wallet = %entry.wallet, "Skipping rejected entry");
                skipped += 1;
                continue;
            }
            batch_total = batch_total
                .checked_add(entry.amount)
                .ok_or_else(|| CoverageError::Overflow("batch total".to_string()))?;
            let credit = credits.entry(entry.wallet.clone()).or_insert(0);
            *credit = credit
                .checked_add(entry.amount)
                .ok_or_else(|| CoverageError::Overflow(format!("credit to {}", entry.wallet)))?;
            credited += 1;
        }

        let pool_after = match self.ledger.settle_batch(protocol_id, batch_total, &credits) {
            Ok(balance) => balance,
            Err(err) => {
                warn!(incident_id = %incident_id, batch_total = %batch_total, error = %err, "Payout batch rejected");
                return Err(err);
            }
        };

        let settled = window.end >= queue_len;
        let incident = self.incident_mut(incident_id)?;
        incident.paid_count = window.end;
        if settled {
            incident.enforced = true;
            incident.status = IncidentStatus::Paid;
        }

        let receipt = PayoutReceipt {
            incident_id: incident_id.to_string(),
            start_index: window.start,
            end_index: window.end,
            batch_total,
            credited,
            skipped,
            settled,
        };

        info!(
            incident_id = %incident_id,
            start = receipt.start_index,
            end = receipt.end_index,
            batch_total = %batch_total,
            pool_after = %pool_after,
            settled,
            "Payout batch executed"
        );
        self.journal.record(
            Operation::PayoutBatch,
            incident_id,
            serde_json::json!({
                "start": receipt.start_index,
                "end": receipt.end_index,
                "batch_total": batch_total.to_string(),
                "skipped": skipped,
                "settled": settled,
            }),
        );
        Ok(receipt)
    }
}
