//! Protocol registry.
//!
//! The engine only needs to ask whether a protocol exists and to write its
//! status when compliance cascades. `InMemoryProtocolRegistry` is the default
//! implementation and also carries registration metadata.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{canonical_wallet, CoverageError, ProtocolStatus, Result};

/// Registry capability consumed by the engine.
pub trait ProtocolRegistry: Send + Sync {
    /// Whether `protocol_id` is registered.
    fn contains(&self, protocol_id: &str) -> bool;

    /// Current status, if registered.
    fn status(&self, protocol_id: &str) -> Option<ProtocolStatus>;

    /// Overwrite the status of a registered protocol.
    fn set_status(&self, protocol_id: &str, status: ProtocolStatus) -> Result<()>;
}

/// A registered protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolRecord {
    pub protocol_id: String,
    /// Opaque metadata document
    pub metadata_json: String,
    /// Owner wallet, case-folded
    pub owner_wallet: String,
    pub status: ProtocolStatus,
    pub registered_at: DateTime<Utc>,
}

/// DashMap-backed registry.
#[derive(Debug, Default)]
pub struct InMemoryProtocolRegistry {
    protocols: DashMap<String, ProtocolRecord>,
}

impl InMemoryProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol with status `active`.
    pub fn register_protocol(
        &self,
        protocol_id: &str,
        metadata_json: &str,
        owner_wallet: &str,
    ) -> Result<()> {
        if protocol_id.trim().is_empty() {
            return Err(CoverageError::InvalidArgument(
                "protocol id must not be empty".to_string(),
            ));
        }

        match self.protocols.entry(protocol_id.to_string()) {
            Entry::Occupied(_) => Err(CoverageError::AlreadyExists(format!(
                "protocol {}",
                protocol_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ProtocolRecord {
                    protocol_id: protocol_id.to_string(),
                    metadata_json: metadata_json.to_string(),
                    owner_wallet: canonical_wallet(owner_wallet),
                    status: ProtocolStatus::Active,
                    registered_at: Utc::now(),
                });
                info!(protocol_id = %protocol_id, "Protocol registered");
                Ok(())
            }
        }
    }

    /// Operator override of the status, taking the textual form.
    pub fn set_protocol_status(&self, protocol_id: &str, status: &str) -> Result<()> {
        self.set_status(protocol_id, ProtocolStatus::from(status))
    }

    pub fn record(&self, protocol_id: &str) -> Option<ProtocolRecord> {
        self.protocols.get(protocol_id).map(|r| r.value().clone())
    }

    /// Metadata, or `""` when unknown.
    pub fn metadata(&self, protocol_id: &str) -> String {
        self.protocols
            .get(protocol_id)
            .map(|r| r.metadata_json.clone())
            .unwrap_or_default()
    }

    /// Owner wallet, or `""` when unknown.
    pub fn owner_wallet(&self, protocol_id: &str) -> String {
        self.protocols
            .get(protocol_id)
            .map(|r| r.owner_wallet.clone())
            .unwrap_or_default()
    }

    /// Status literal, or `"unknown"` when not registered.
    pub fn status_label(&self, protocol_id: &str) -> String {
        self.protocols
            .get(protocol_id)
            .map(|r| r.status.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn protocol_count(&self) -> usize {
        self.protocols.len()
    }
}

impl ProtocolRegistry for InMemoryProtocolRegistry {
    fn contains(&self, protocol_id: &str) -> bool {
        self.protocols.contains_key(protocol_id)
    }

    fn status(&self, protocol_id: &str) -> Option<ProtocolStatus> {
        self.protocols.get(protocol_id).map(|r| r.status.clone())
    }

    fn set_status(&self, protocol_id: &str, status: ProtocolStatus) -> Result<()> {
        let mut record = self
            .protocols
            .get_mut(protocol_id)
            .ok_or_else(|| CoverageError::NotFound(format!("protocol {}", protocol_id)))?;
        info!(
            protocol_id = %protocol_id,
            from = %record.status,
            to = %status,
            "Protocol status changed"
        );
        record.status = status;
        Ok(())
    }
}
