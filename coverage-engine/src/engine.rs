//! The coverage engine.
//!
//! Owns every record and balance. Operations live next to the records they
//! touch (`incident`, `queue`, `dispute`, `payout`, `recovery`, `commitment`,
//! `reputation`); this module holds the shared state, construction, and the
//! pool and wallet views.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use signal_oracle::SignalOracle;

use crate::commitment::Commitment;
use crate::config::EngineConfig;
use crate::dispute::DisputeBook;
use crate::incident::Incident;
use crate::journal::{Journal, Operation};
use crate::ledger::BalanceLedger;
use crate::registry::ProtocolRegistry;
use crate::reputation::ReputationBook;
use crate::store::KeyedStore;
use crate::types::{Amount, CoverageError, Result, WalletId};

/// Engine behind a single lock; every write is serialized through it.
pub type SharedEngine = Arc<Mutex<CoverageEngine>>;

pub struct CoverageEngine {
    pub(crate) config: EngineConfig,
    pub(crate) registry: Arc<dyn ProtocolRegistry>,
    pub(crate) oracle: Arc<dyn SignalOracle>,
    pub(crate) ledger: BalanceLedger,
    pub(crate) incidents: KeyedStore<String, Incident>,
    pub(crate) disputes: DisputeBook,
    pub(crate) commitments: KeyedStore<String, Commitment>,
    /// Missed-final commitments per protocol
    pub(crate) missed_commitments: KeyedStore<String, u32>,
    pub(crate) reputation: ReputationBook,
    pub(crate) journal: Journal,
}

impl CoverageEngine {
    /// Create with default configuration.
    pub fn new(registry: Arc<dyn ProtocolRegistry>, oracle: Arc<dyn SignalOracle>) -> Self {
        Self::with_config(EngineConfig::default(), registry, oracle)
    }

    /// Create with custom configuration.
    pub fn with_config(
        config: EngineConfig,
        registry: Arc<dyn ProtocolRegistry>,
        oracle: Arc<dyn SignalOracle>,
    ) -> Self {
        let journal = Journal::with_max_entries(config.journal_capacity);
        Self {
            config,
            registry,
            oracle,
            ledger: BalanceLedger::new(),
            incidents: KeyedStore::new(),
            disputes: DisputeBook::default(),
            commitments: KeyedStore::new(),
            missed_commitments: KeyedStore::new(),
            reputation: ReputationBook::default(),
            journal,
        }
    }

    /// Wrap in a mutex for sharing between tasks.
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn ProtocolRegistry> {
        &self.registry
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Add funds to a protocol's insurance pool.
    pub fn deposit(&mut self, protocol_id: &str, amount: Amount) -> Result<Amount> {
        self.ensure_protocol(protocol_id)?;
        let balance = self.ledger.deposit(protocol_id, amount)?;

        info!(protocol_id = %protocol_id, amount = %amount, balance = %balance, "Pool deposit");
        self.journal.record(
            Operation::Deposit,
            protocol_id,
            serde_json::json!({ "amount": amount.to_string(), "balance": balance.to_string() }),
        );
        Ok(balance)
    }

    /// Pool balance, 0 when unknown.
    pub fn pool_balance(&self, protocol_id: &str) -> Amount {
        self.ledger.pool_balance(protocol_id)
    }

    /// Compensation credited to a wallet, 0 when unknown.
    pub fn wallet_compensation_balance(&self, wallet: &str) -> Amount {
        match WalletId::parse(wallet) {
            Ok(wallet) => self.ledger.wallet_balance(&wallet),
            Err(_) => 0,
        }
    }

    pub(crate) fn ensure_protocol(&self, protocol_id: &str) -> Result<()> {
        if self.registry.contains(protocol_id) {
            Ok(())
        } else {
            Err(CoverageError::NotFound(format!("protocol {}", protocol_id)))
        }
    }

    pub(crate) fn incident_ref(&self, incident_id: &str) -> Result<&Incident> {
        self.incidents
            .get(incident_id)
            .ok_or_else(|| CoverageError::NotFound(format!("incident {}", incident_id)))
    }

    pub(crate) fn incident_mut(&mut self, incident_id: &str) -> Result<&mut Incident> {
        self.incidents
            .get_mut(incident_id)
            .ok_or_else(|| CoverageError::NotFound(format!("incident {}", incident_id)))
    }
}

/// Debug output skips the trait objects.
impl std::fmt::Debug for CoverageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageEngine")
            .field("config", &self.config)
            .field("incidents", &self.incidents.len())
            .field("commitments", &self.commitments.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_deposit_requires_registered_protocol() {
        let mut engine = engine();
        assert_eq!(engine.deposit(PROTOCOL, 500).unwrap(), 500);
        assert_eq!(engine.pool_balance(PROTOCOL), 500);

        assert!(matches!(
            engine.deposit("unknown", 10),
            Err(CoverageError::NotFound(_))
        ));
        assert!(matches!(
            engine.deposit(PROTOCOL, 0),
            Err(CoverageError::InvalidArgument(_))
        ));
        assert_eq!(engine.journal().count(Operation::Deposit), 1);
    }

    #[test]
    fn test_unknown_views_default() {
        let engine = engine();
        assert_eq!(engine.pool_balance("nobody"), 0);
        assert_eq!(engine.wallet_compensation_balance("0xNOBODY"), 0);
        assert_eq!(engine.wallet_compensation_balance(""), 0);
    }

    #[tokio::test]
    async fn test_shared_engine() {
        let shared = engine().into_shared();
        shared.lock().await.deposit(PROTOCOL, 10).unwrap();
        assert_eq!(shared.lock().await.pool_balance(PROTOCOL), 10);
    }
}
