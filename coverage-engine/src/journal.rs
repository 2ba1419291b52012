//! Operation journal.
//!
//! Every successful write appends one entry, newest first. The journal is
//! bounded; once full, the oldest entries are pruned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default maximum entries before pruning.
const MAX_JOURNAL_ENTRIES: usize = 10_000;

/// Write operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deposit,
    IncidentCreated,
    DecisionRecorded,
    SignalChecked,
    ChallengeOpened,
    IncidentFinalized,
    QueueAttached,
    ResponseScored,
    DisputeRaised,
    DisputeResolved,
    PayoutBatch,
    RecoveryRecorded,
    RecoveryBatch,
    CommitmentRegistered,
    CommitmentEvaluated,
    FulfillmentEvidence,
    CommitmentFinalized,
    ReputationRecomputed,
}

/// An entry in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry ID
    pub entry_id: String,
    /// Operation performed
    pub operation: Operation,
    /// Incident, protocol or commitment the operation touched
    pub subject_id: String,
    /// Operation-specific detail
    pub detail: serde_json::Value,
    /// When the entry was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Bounded journal of engine writes.
#[derive(Debug)]
pub struct Journal {
    /// Entries (newest first)
    entries: VecDeque<JournalEntry>,
    /// Maximum entries to retain
    max_entries: usize,
}

impl Journal {
    pub fn new() -> Self {
        Self::with_max_entries(MAX_JOURNAL_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Append an entry, returning its ID.
    pub fn record(
        &mut self,
        operation: Operation,
        subject_id: &str,
        detail: serde_json::Value,
    ) -> String {
        let entry = JournalEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            operation,
            subject_id: subject_id.to_string(),
            detail,
            recorded_at: Utc::now(),
        };
        let entry_id = entry.entry_id.clone();

        self.entries.push_front(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_back();
        }

        entry_id
    }

    /// Get recent entries.
    pub fn recent(&self, limit: usize) -> Vec<JournalEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Get entries touching a subject.
    pub fn for_subject(&self, subject_id: &str, limit: usize) -> Vec<JournalEntry> {
        self.entries
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Count entries of one operation kind.
    pub fn count(&self, operation: Operation) -> usize {
        self.entries.iter().filter(|e| e.operation == operation).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_newest_first() {
        let mut journal = Journal::new();
        journal.record(Operation::Deposit, "p1", json!({ "amount": "10" }));
        journal.record(Operation::IncidentCreated, "inc-1", json!({}));

        let recent = journal.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].operation, Operation::IncidentCreated);
        assert_eq!(journal.for_subject("p1", 10).len(), 1);
        assert_eq!(journal.count(Operation::Deposit), 1);
    }

    #[test]
    fn test_prunes_oldest() {
        let mut journal = Journal::with_max_entries(2);
        for i in 0..5 {
            journal.record(Operation::Deposit, &format!("p{}", i), json!({}));
        }

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.recent(1)[0].subject_id, "p4");
        assert!(journal.for_subject("p0", 10).is_empty());
    }
}
