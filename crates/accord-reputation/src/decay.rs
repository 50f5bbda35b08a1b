// crates/accord-reputation/src/decay.rs
//
// Time-decay of claim weight by age in days.

use serde::{Deserialize, Serialize};

/// Decay function applied to a claim's weight as it ages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayFunction {
    /// value * 0.5^(age / half_life_days).
    Exponential { half_life_days: f64 },
    /// max(0, value - decay_per_day * age).
    Linear { decay_per_day: f64 },
}

impl Default for DecayFunction {
    fn default() -> Self {
        DecayFunction::Exponential {
            half_life_days: 90.0,
        }
    }
}

/// Apply `function` to `value` after `days_elapsed` days.
///
/// Negative ages (claims dated after the evaluation time) are treated as zero.
/// The result is always >= 0.0.
pub fn apply_decay(value: f64, days_elapsed: f64, function: &DecayFunction) -> f64 {
    let days = days_elapsed.max(0.0);
    match function {
        DecayFunction::Exponential { half_life_days } => {
            if *half_life_days <= 0.0 {
                return 0.0;
            }
            value * 0.5_f64.powf(days / half_life_days)
        }
        DecayFunction::Linear { decay_per_day } => (value - decay_per_day * days).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_decay_half_life() {
        let func = DecayFunction::Exponential { half_life_days: 10.0 };
        assert!((apply_decay(1.0, 10.0, &func) - 0.5).abs() < 1e-10);
        assert!((apply_decay(1.0, 20.0, &func) - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_exponential_decay_zero() {
        let func = DecayFunction::Exponential { half_life_days: 10.0 };
        assert!((apply_decay(1.0, 0.0, &func) - 1.0).abs() < 1e-10);
        assert!((apply_decay(1.0, -3.0, &func) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_linear_decay_floors_at_zero() {
        let func = DecayFunction::Linear { decay_per_day: 0.1 };
        assert!((apply_decay(1.0, 5.0, &func) - 0.5).abs() < 1e-10);
        assert_eq!(apply_decay(1.0, 20.0, &func), 0.0);
    }

    #[test]
    fn test_exponential_decay_zero_half_life() {
        let func = DecayFunction::Exponential { half_life_days: 0.0 };
        assert_eq!(apply_decay(1.0, 5.0, &func), 0.0);
    }
}
