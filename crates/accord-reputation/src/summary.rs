// crates/accord-reputation/src/summary.rs
//
// Summary types. Only aggregates appear here: no claim ids, counterparties,
// resource references or notes.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use accord_core::claim::ClaimGroup;
use accord_core::error::AccordError;
use accord_core::identity::AgentId;

/// Half-open time window `[from, until)`. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Period {
    pub fn all_time() -> Self {
        Self::default()
    }

    /// The `days` days up to and including `now`: `[now - days, now]`.
    ///
    /// # Errors
    /// `Validation` if `days` is negative or reaches past the representable
    /// date range.
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Result<Self, AccordError> {
        let from = Duration::try_days(days)
            .filter(|_| days >= 0)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                AccordError::Validation(format!("days: {} is outside the supported range", days))
            })?;
        Ok(Self {
            from: Some(from),
            until: now.checked_add_signed(Duration::nanoseconds(1)),
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.until.map_or(true, |until| at < until)
    }
}

/// Mean of each performance metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAverages {
    pub timeliness: f64,
    pub quality: f64,
    pub reliability: f64,
    pub communication: f64,
    pub overall_satisfaction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationSummary {
    pub agent: AgentId,
    pub period: Period,
    pub total_claims: usize,
    /// Every group is present, zero when the agent has no claims in it.
    pub by_group: BTreeMap<ClaimGroup, usize>,
    /// `None` when `total_claims` is zero.
    pub average_metrics: Option<MetricAverages>,
    pub average_satisfaction: Option<f64>,
    /// Satisfaction weighted by claim age; `None` when every weight is zero.
    pub weighted_satisfaction: Option<f64>,
    pub derived_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_is_half_open() {
        let now = Utc::now();
        let period = Period {
            from: Some(now - Duration::days(7)),
            until: Some(now),
        };
        assert!(period.contains(now - Duration::days(7)));
        assert!(period.contains(now - Duration::seconds(1)));
        assert!(!period.contains(now));
        assert!(Period::all_time().contains(now));
    }

    #[test]
    fn test_last_days_includes_now() {
        let now = Utc::now();
        let period = Period::last_days(7, now).unwrap();
        assert!(period.contains(now - Duration::days(7)));
        assert!(period.contains(now));
        assert!(!period.contains(now + Duration::seconds(1)));
        assert!(!period.contains(now - Duration::days(8)));
    }

    #[test]
    fn test_last_days_out_of_range_is_error() {
        let now = Utc::now();
        for days in [-1, 300_000_000, i64::MAX] {
            assert!(
                matches!(Period::last_days(days, now), Err(AccordError::Validation(_))),
                "{}",
                days
            );
        }
        assert!(Period::last_days(0, now).unwrap().contains(now));
    }
}
