//! Pro-rata recovery distribution.
//!
//! Funds recovered after an incident are shared over the queue in proportion
//! to each entry's loss: `share = floor(remaining * loss / total)`, computed
//! through a 256-bit intermediate. Disputes are not consulted here and the
//! flooring dust stays in the recovery pool.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::types::{Amount, CoverageError, Result, WalletId};

/// `floor(remaining * loss / total)` without intermediate truncation.
pub fn pro_rata_share(remaining: Amount, loss: Amount, total: Amount) -> Result<Amount> {
    if total == 0 {
        return Err(CoverageError::InvalidArgument(
            "loss total must be positive".to_string(),
        ));
    }
    let product = U256::from(remaining)
        .checked_mul(U256::from(loss))
        .ok_or_else(|| CoverageError::Overflow("pro-rata product".to_string()))?;
    let share = product / U256::from(total);
    if share > U256::from(Amount::MAX) {
        return Err(CoverageError::Overflow("pro-rata share".to_string()));
    }
    Ok(share.low_u128())
}

/// Outcome of one recovery batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReceipt {
    pub incident_id: String,
    pub start_index: usize,
    pub end_index: usize,
    /// Undistributed recovery funds before this batch
    pub remaining_before: Amount,
    /// Amount added to `recovery_distributed`
    pub batch_amount: Amount,
    /// Entries whose share was non-zero
    pub credited: usize,
}

impl CoverageEngine {
    /// Add recovered funds to an incident's recovery pool.
    pub fn record_recovery(&mut self, incident_id: &str, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(CoverageError::InvalidArgument(
                "recovery amount must be positive".to_string(),
            ));
        }
        let incident = self.incident_mut(incident_id)?;
        let pool = incident
            .recovery_pool
            .checked_add(amount)
            .ok_or_else(|| CoverageError::Overflow("recovery pool".to_string()))?;
        incident.recovery_pool = pool;

        info!(incident_id = %incident_id, amount = %amount, recovery_pool = %pool, "Recovery recorded");
        self.journal.record(
            Operation::RecoveryRecorded,
            incident_id,
            serde_json::json!({ "amount": amount.to_string(), "recovery_pool": pool.to_string() }),
        );
        Ok(pool)
    }

    /// Distribute the undistributed recovery over one range of the loss queue.
    pub fn distribute_recovery_batch(
        &mut self,
        incident_id: &str,
        start_index: usize,
        limit: usize,
    ) -> Result<RecoveryReceipt> {
        let incident = self.incident_ref(incident_id)?;
        if limit == 0 {
            return Err(CoverageError::InvalidArgument(
                "batch limit must be positive".to_string(),
            ));
        }
        let total = incident.total_amount();
        if total == 0 {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} has no loss basis",
                incident_id
            )));
        }
        let remaining = incident.recovery_remaining();
        if remaining == 0 {
            return Err(CoverageError::PreconditionFailed(format!(
                "incident {} has no undistributed recovery",
                incident_id
            )));
        }

        let window = incident.queue.window(start_index, limit);
        let mut batch_amount: Amount = 0;
        let mut credits: BTreeMap<WalletId, Amount> = BTreeMap::new();
        let mut credited = 0;
        for entry in &incident.queue.entries()[window.clone()] {
            let share = pro_rata_share(remaining, entry.amount, total)?;
            if share == 0 {
                continue;
            }
            batch_amount = batch_amount
                .checked_add(share)
                .ok_or_else(|| CoverageError::Overflow("recovery batch".to_string()))?;
            let credit = credits.entry(entry.wallet.clone()).or_insert(0);
            *credit = credit
                .checked_add(share)
                .ok_or_else(|| CoverageError::Overflow(format!("credit to {}", entry.wallet)))?;
            credited += 1;
        }
        let batch_amount = batch_amount.min(remaining);

        self.ledger.credit_wallets(&credits)?;
        let incident = self.incident_mut(incident_id)?;
        incident.recovery_distributed += batch_amount;

        debug!(incident_id = %incident_id, wallets = credits.len(), "Recovery credits applied");
        info!(
            incident_id = %incident_id,
            start = window.start,
            end = window.end,
            batch_amount = %batch_amount,
            remaining_before = %remaining,
            "Recovery batch distributed"
        );
        self.journal.record(
            Operation::RecoveryBatch,
            incident_id,
            serde_json::json!({
                "start": window.start,
                "end": window.end,
                "batch_amount": batch_amount.to_string(),
            }),
        );

        Ok(RecoveryReceipt {
            incident_id: incident_id.to_string(),
            start_index: window.start,
            end_index: window.end,
            remaining_before: remaining,
            batch_amount,
            credited,
        })
    }

    pub fn recovery_pool(&self, incident_id: &str) -> Amount {
        self.incidents
            .get(incident_id)
            .map(|i| i.recovery_pool)
            .unwrap_or(0)
    }

    pub fn recovery_distributed(&self, incident_id: &str) -> Amount {
        self.incidents
            .get(incident_id)
            .map(|i| i.recovery_distributed)
            .unwrap_or(0)
    }

    pub fn recovery_remaining(&self, incident_id: &str) -> Amount {
        self.incidents
            .get(incident_id)
            .map(|i| i.recovery_remaining())
            .unwrap_or(0)
    }
}
