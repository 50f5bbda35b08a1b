// crates/accord-node/src/config.rs
//
// Runtime configuration for an Accord node.
// Loaded from a TOML file or populated with defaults.

use std::fs;

use serde::Deserialize;

use accord_governance::GovernancePolicy;
use accord_reputation::DecayFunction;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Agent this node acts for.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    /// Directory for local data storage (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub governance: GovernancePolicy,

    #[serde(default)]
    pub reputation: ReputationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReputationConfig {
    /// Days for a claim's weight to halve in the weighted satisfaction score.
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,
}

fn default_agent_id() -> String {
    "did:accord:local".to_string()
}

fn default_data_dir() -> String {
    "~/.accord/data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_half_life_days() -> f64 {
    90.0
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_half_life_days(),
        }
    }
}

impl ReputationConfig {
    pub fn decay(&self) -> DecayFunction {
        DecayFunction::Exponential {
            half_life_days: self.half_life_days,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            governance: GovernancePolicy::default(),
            reputation: ReputationConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// governance policy is inconsistent.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: NodeConfig = toml::from_str(contents)?;
        config.governance.validate()?;
        let half_life = config.reputation.half_life_days;
        if !half_life.is_finite() || half_life <= 0.0 {
            return Err(format!(
                "reputation.half_life_days must be positive, got {}",
                half_life
            )
            .into());
        }
        Ok(config)
    }

    /// Path of the RocksDB directory under `data_dir`.
    pub fn db_path(&self) -> String {
        format!("{}/rocksdb", expand_tilde(&self.data_dir))
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use accord_core::identity::CapabilityLevel;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = NodeConfig::parse("").unwrap();
        assert_eq!(config.agent_id, "did:accord:local");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.governance, GovernancePolicy::default());
        assert_eq!(config.governance.challenge_window_days, 10);
        assert_eq!(config.reputation.half_life_days, 90.0);
    }

    #[test]
    fn test_partial_tables() {
        let config = NodeConfig::parse(
            r#"
            agent_id = "did:accord:alice"

            [governance]
            challenge_window_days = 14
            min_validator_capability = "primary_accountable"

            [reputation]
            half_life_days = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.agent_id, "did:accord:alice");
        assert_eq!(config.governance.challenge_window_days, 14);
        assert_eq!(config.governance.min_end_of_life_validators, 2);
        assert_eq!(
            config.governance.min_validator_capability,
            CapabilityLevel::PrimaryAccountable
        );
        assert_eq!(
            config.reputation.decay(),
            DecayFunction::Exponential { half_life_days: 30.0 }
        );
    }

    #[test]
    fn test_out_of_range_policy_rejected() {
        assert!(NodeConfig::parse("[governance]\nchallenge_window_days = 3").is_err());
        assert!(NodeConfig::parse("[governance]\nmin_end_of_life_validators = 1").is_err());
        assert!(NodeConfig::parse("[reputation]\nhalf_life_days = 0").is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        assert_eq!(expand_tilde("/var/lib/accord"), "/var/lib/accord");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde("~/.accord/data"),
                format!("{}/.accord/data", home.display())
            );
        }
    }
}
