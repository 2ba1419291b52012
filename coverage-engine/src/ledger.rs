//! Balance ledger: per-protocol pools and per-wallet compensation balances.
//!
//! Multi-entry updates are validated in full before the first balance moves,
//! so a rejected batch leaves every balance as it was.

use std::collections::BTreeMap;

use crate::store::KeyedStore;
use crate::types::{Amount, CoverageError, Result, WalletId};

/// Per-wallet credits planned by one batch.
pub type WalletCredits = BTreeMap<WalletId, Amount>;

#[derive(Debug, Default)]
pub struct BalanceLedger {
    pools: KeyedStore<String, Amount>,
    wallets: KeyedStore<WalletId, Amount>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_balance(&self, protocol_id: &str) -> Amount {
        self.pools.read(protocol_id)
    }

    pub fn wallet_balance(&self, wallet: &WalletId) -> Amount {
        self.wallets.read(wallet)
    }

    /// Add `amount` to the protocol pool, returning the new balance.
    pub fn deposit(&mut self, protocol_id: &str, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(CoverageError::InvalidArgument(
                "deposit must be positive".to_string(),
            ));
        }
        let balance = self
            .pool_balance(protocol_id)
            .checked_add(amount)
            .ok_or_else(|| CoverageError::Overflow(format!("pool {} balance", protocol_id)))?;
        self.pools.insert(protocol_id.to_string(), balance);
        Ok(balance)
    }

    /// Debit `total` from the pool and credit every wallet in `credits`.
    pub fn settle_batch(
        &mut self,
        protocol_id: &str,
        total: Amount,
        credits: &WalletCredits,
    ) -> Result<Amount> {
        let available = self.pool_balance(protocol_id);
        if available < total {
            return Err(CoverageError::InsufficientFunds {
                protocol_id: protocol_id.to_string(),
                available,
                required: total,
            });
        }
        let updated = self.planned_wallet_balances(credits)?;

        self.pools.insert(protocol_id.to_string(), available - total);
        self.commit_wallet_balances(updated);
        Ok(available - total)
    }

    /// Credit every wallet in `credits` without touching any pool.
    pub fn credit_wallets(&mut self, credits: &WalletCredits) -> Result<()> {
        let updated = self.planned_wallet_balances(credits)?;
        self.commit_wallet_balances(updated);
        Ok(())
    }

    fn planned_wallet_balances(&self, credits: &WalletCredits) -> Result<Vec<(WalletId, Amount)>> {
        credits
            .iter()
            .map(|(wallet, credit)| {
                self.wallet_balance(wallet)
                    .checked_add(*credit)
                    .map(|balance| (wallet.clone(), balance))
                    .ok_or_else(|| CoverageError::Overflow(format!("wallet {} balance", wallet)))
            })
            .collect()
    }

    fn commit_wallet_balances(&mut self, updated: Vec<(WalletId, Amount)>) {
        for (wallet, balance) in updated {
            self.wallets.insert(wallet, balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(raw: &str) -> WalletId {
        WalletId::parse(raw).unwrap()
    }

    #[test]
    fn test_deposit_accumulates() {
        let mut ledger = BalanceLedger::new();
        assert_eq!(ledger.deposit("p1", 100).unwrap(), 100);
        assert_eq!(ledger.deposit("p1", 50).unwrap(), 150);
        assert_eq!(ledger.pool_balance("p2"), 0);
        assert!(ledger.deposit("p1", 0).is_err());
    }

    #[test]
    fn test_deposit_overflow() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit("p1", Amount::MAX).unwrap();
        assert!(matches!(ledger.deposit("p1", 1), Err(CoverageError::Overflow(_))));
        assert_eq!(ledger.pool_balance("p1"), Amount::MAX);
    }

    #[test]
    fn test_settle_batch_moves_funds() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit("p1", 1_000).unwrap();

        let mut credits = WalletCredits::new();
        credits.insert(wallet("0xa"), 300);
        credits.insert(wallet("0xb"), 200);

        assert_eq!(ledger.settle_batch("p1", 500, &credits).unwrap(), 500);
        assert_eq!(ledger.wallet_balance(&wallet("0xa")), 300);
        assert_eq!(ledger.wallet_balance(&wallet("0xb")), 200);
    }

    #[test]
    fn test_insufficient_pool_changes_nothing() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit("p1", 100).unwrap();

        let mut credits = WalletCredits::new();
        credits.insert(wallet("0xa"), 150);

        let err = ledger.settle_batch("p1", 150, &credits).unwrap_err();
        assert!(matches!(
            err,
            CoverageError::InsufficientFunds { available: 100, required: 150, .. }
        ));
        assert_eq!(ledger.pool_balance("p1"), 100);
        assert_eq!(ledger.wallet_balance(&wallet("0xa")), 0);
    }

    #[test]
    fn test_wallet_overflow_is_atomic() {
        let mut ledger = BalanceLedger::new();
        let mut seed = WalletCredits::new();
        seed.insert(wallet("0xb"), Amount::MAX);
        ledger.credit_wallets(&seed).unwrap();

        let mut credits = WalletCredits::new();
        credits.insert(wallet("0xa"), 5);
        credits.insert(wallet("0xb"), 1);

        assert!(matches!(ledger.credit_wallets(&credits), Err(CoverageError::Overflow(_))));
        assert_eq!(ledger.wallet_balance(&wallet("0xa")), 0);
    }
}
