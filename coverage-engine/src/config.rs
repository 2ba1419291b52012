//! Configuration for the coverage engine.

use serde::{Deserialize, Serialize};

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grace period granted after a missed commitment (seconds)
    pub grace_period_secs: i64,
    /// Missed commitments that move a protocol to probationary
    pub probation_threshold: u32,
    /// Missed commitments that suspend coverage
    pub suspension_threshold: u32,
    /// Maximum journal entries kept in memory
    pub journal_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 604_800, // 7 days
            probation_threshold: 2,
            suspension_threshold: 3,
            journal_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Set the grace period.
    pub fn with_grace_period_secs(mut self, secs: i64) -> Self {
        self.grace_period_secs = secs;
        self
    }

    /// Set the cascade thresholds.
    pub fn with_thresholds(mut self, probation: u32, suspension: u32) -> Self {
        self.probation_threshold = probation;
        self.suspension_threshold = suspension;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.grace_period_secs, 7 * 24 * 3600);
        assert_eq!(config.probation_threshold, 2);
        assert_eq!(config.suspension_threshold, 3);
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = EngineConfig::from_yaml("grace_period_secs: 60\n").unwrap();
        assert_eq!(config.grace_period_secs, 60);
        assert_eq!(config.suspension_threshold, 3);

        let yaml = config.to_yaml().unwrap();
        assert_eq!(EngineConfig::from_yaml(&yaml).unwrap(), config);
    }
}
