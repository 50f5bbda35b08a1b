// crates/accord-governance/src/policy.rs
//
// Governance policy parameters. The engine enforces these values; choosing
// them is left to the community operating the network.
//
// Defaults:
//   - Resource creation: at least 1 validator
//   - End of life: at least 2 validators
//   - At most 15 validators per round
//   - Challenge window: 10 days (allowed range 7 to 14)
//   - Validators must be at least `accountable`

use chrono::Duration;
use serde::{Deserialize, Serialize};

use accord_core::error::AccordError;
use accord_core::identity::CapabilityLevel;
use accord_core::validation::RoundPurpose;

/// Shortest allowed challenge window, in days.
pub const MIN_CHALLENGE_WINDOW_DAYS: i64 = 7;

/// Longest allowed challenge window, in days.
pub const MAX_CHALLENGE_WINDOW_DAYS: i64 = 14;

/// Floor for end-of-life validator pools; policy may raise but never lower it.
pub const END_OF_LIFE_VALIDATOR_FLOOR: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernancePolicy {
    #[serde(default = "default_min_creation_validators")]
    pub min_creation_validators: usize,

    #[serde(default = "default_min_end_of_life_validators")]
    pub min_end_of_life_validators: usize,

    #[serde(default = "default_max_validators")]
    pub max_validators: usize,

    #[serde(default = "default_challenge_window_days")]
    pub challenge_window_days: i64,

    #[serde(default = "default_min_validator_capability")]
    pub min_validator_capability: CapabilityLevel,
}

fn default_min_creation_validators() -> usize {
    1
}

fn default_min_end_of_life_validators() -> usize {
    END_OF_LIFE_VALIDATOR_FLOOR
}

fn default_max_validators() -> usize {
    15
}

fn default_challenge_window_days() -> i64 {
    10
}

fn default_min_validator_capability() -> CapabilityLevel {
    CapabilityLevel::Accountable
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self {
            min_creation_validators: default_min_creation_validators(),
            min_end_of_life_validators: default_min_end_of_life_validators(),
            max_validators: default_max_validators(),
            challenge_window_days: default_challenge_window_days(),
            min_validator_capability: default_min_validator_capability(),
        }
    }
}

impl GovernancePolicy {
    /// Check that the configured values are internally consistent.
    ///
    /// # Errors
    /// Returns `AccordError::Config` naming the offending field.
    pub fn validate(&self) -> Result<(), AccordError> {
        if !(MIN_CHALLENGE_WINDOW_DAYS..=MAX_CHALLENGE_WINDOW_DAYS)
            .contains(&self.challenge_window_days)
        {
            return Err(AccordError::Config(format!(
                "challenge_window_days must be between {} and {}, got {}",
                MIN_CHALLENGE_WINDOW_DAYS, MAX_CHALLENGE_WINDOW_DAYS, self.challenge_window_days
            )));
        }
        if self.min_end_of_life_validators < END_OF_LIFE_VALIDATOR_FLOOR {
            return Err(AccordError::Config(format!(
                "min_end_of_life_validators must be at least {}, got {}",
                END_OF_LIFE_VALIDATOR_FLOOR, self.min_end_of_life_validators
            )));
        }
        if self.min_creation_validators == 0 {
            return Err(AccordError::Config(
                "min_creation_validators must be at least 1".to_string(),
            ));
        }
        let largest_minimum = self
            .min_end_of_life_validators
            .max(self.min_creation_validators);
        if self.max_validators < largest_minimum {
            return Err(AccordError::Config(format!(
                "max_validators ({}) is below a configured minimum ({})",
                self.max_validators, largest_minimum
            )));
        }
        Ok(())
    }

    pub fn challenge_window(&self) -> Duration {
        Duration::days(self.challenge_window_days)
    }

    /// Minimum eligible pool size for a round with this purpose.
    pub fn min_validators_for(&self, purpose: &RoundPurpose) -> usize {
        match purpose {
            RoundPurpose::ResourceCreation { .. } => self.min_creation_validators,
            RoundPurpose::EndOfLife { .. } => self.min_end_of_life_validators,
        }
    }
}
