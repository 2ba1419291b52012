//! Reputation scoring.
//!
//! A protocol's score is the integer mean of four component scores on a
//! 0-10000 scale; the grade is a fixed banding of that score.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::engine::CoverageEngine;
use crate::journal::Operation;
use crate::store::KeyedStore;
use crate::types::Result;

/// Letter grade derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "AAA")]
    Aaa,
    #[serde(rename = "AA")]
    Aa,
    A,
    B,
    C,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 9000 => Self::Aaa,
            s if s >= 8000 => Self::Aa,
            s if s >= 7000 => Self::A,
            s if s >= 6000 => Self::B,
            _ => Self::C,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aaa => "AAA",
            Self::Aa => "AA",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to a score recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub uptime: u32,
    pub incident_history: u32,
    pub response: u32,
    pub pool_health: u32,
}

impl ScoreComponents {
    pub fn score(&self) -> u32 {
        let sum = u64::from(self.uptime)
            + u64::from(self.incident_history)
            + u64::from(self.response)
            + u64::from(self.pool_health);
        // mean of four u32 values always fits
        (sum / 4) as u32
    }
}

/// A protocol's latest score and grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    pub score: u32,
    pub grade: Grade,
    pub components: ScoreComponents,
}

impl Reputation {
    pub fn from_components(components: ScoreComponents) -> Self {
        let score = components.score();
        Self {
            score,
            grade: Grade::from_score(score),
            components,
        }
    }
}

#[derive(Debug, Default)]
pub struct ReputationBook {
    scores: KeyedStore<String, Reputation>,
}

impl ReputationBook {
    pub fn get(&self, protocol_id: &str) -> Option<&Reputation> {
        self.scores.get(protocol_id)
    }

    pub fn record(&mut self, protocol_id: &str, reputation: Reputation) {
        self.scores.insert(protocol_id.to_string(), reputation);
    }
}

impl CoverageEngine {
    /// Recompute and store the reputation of a registered protocol.
    pub fn recompute_score(
        &mut self,
        protocol_id: &str,
        components: ScoreComponents,
    ) -> Result<Reputation> {
        self.ensure_protocol(protocol_id)?;

        let reputation = Reputation::from_components(components);
        self.reputation.record(protocol_id, reputation);

        info!(
            protocol_id = %protocol_id,
            score = reputation.score,
            grade = %reputation.grade,
            "Reputation recomputed"
        );
        self.journal.record(
            Operation::ReputationRecomputed,
            protocol_id,
            serde_json::json!({ "score": reputation.score, "grade": reputation.grade.as_str() }),
        );
        Ok(reputation)
    }

    /// Score, or 0 when never computed.
    pub fn protocol_score(&self, protocol_id: &str) -> u32 {
        self.reputation.get(protocol_id).map(|r| r.score).unwrap_or(0)
    }

    /// Grade literal, or `"N/A"` when never computed.
    pub fn protocol_grade(&self, protocol_id: &str) -> String {
        self.reputation
            .get(protocol_id)
            .map(|r| r.grade.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_score(10_000), Grade::Aaa);
        assert_eq!(Grade::from_score(9_000), Grade::Aaa);
        assert_eq!(Grade::from_score(8_999), Grade::Aa);
        assert_eq!(Grade::from_score(7_000), Grade::A);
        assert_eq!(Grade::from_score(6_500), Grade::B);
        assert_eq!(Grade::from_score(0), Grade::C);
    }

    #[test]
    fn test_score_is_floored_mean() {
        let components = ScoreComponents {
            uptime: 9_000,
            incident_history: 8_000,
            response: 7_001,
            pool_health: 6_000,
        };
        assert_eq!(components.score(), 7_500);

        let extreme = ScoreComponents {
            uptime: u32::MAX,
            incident_history: u32::MAX,
            response: u32::MAX,
            pool_health: u32::MAX,
        };
        assert_eq!(extreme.score(), u32::MAX);
    }

    #[test]
    fn test_grade_serializes_as_letters() {
        assert_eq!(serde_json::to_string(&Grade::Aaa).unwrap(), "\"AAA\"");
        assert_eq!(Grade::B.to_string(), "B");
    }
}
