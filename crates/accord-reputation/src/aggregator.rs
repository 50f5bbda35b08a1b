// crates/accord-reputation/src/aggregator.rs
//
// ReputationAggregator: folds an agent's own claim log into a summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use accord_core::claim::{ClaimGroup, ParticipationClaim};
use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::traits::ClaimStore;

use crate::decay::{apply_decay, DecayFunction};
use crate::summary::{MetricAverages, Period, ReputationSummary};

const ALL_GROUPS: [ClaimGroup; 5] = [
    ClaimGroup::Creation,
    ClaimGroup::Custody,
    ClaimGroup::Service,
    ClaimGroup::Governance,
    ClaimGroup::EndOfLife,
];

const SECONDS_PER_DAY: f64 = 86_400.0;

pub struct ReputationAggregator {
    store: Arc<dyn ClaimStore>,
    decay: DecayFunction,
}

impl ReputationAggregator {
    pub fn new(store: Arc<dyn ClaimStore>, decay: DecayFunction) -> Self {
        Self { store, decay }
    }

    /// Summarize `agent`'s own claims inside `period`.
    ///
    /// An agent with no claims in the period gets a zero summary, not an error.
    pub async fn derive_summary(
        &self,
        agent: &AgentId,
        period: &Period,
        now: DateTime<Utc>,
    ) -> Result<ReputationSummary, AccordError> {
        let claims = self.store.list_claims(agent).await?;
        let summary = summarize(agent, &claims, period, &self.decay, now);
        tracing::debug!(
            "Derived reputation summary for {}: {} claims in period",
            agent,
            summary.total_claims
        );
        Ok(summary)
    }
}

/// Pure aggregation over an already loaded log. Claims not owned by `agent`
/// are skipped.
pub fn summarize(
    agent: &AgentId,
    claims: &[ParticipationClaim],
    period: &Period,
    decay: &DecayFunction,
    now: DateTime<Utc>,
) -> ReputationSummary {
    let mut by_group: BTreeMap<ClaimGroup, usize> = ALL_GROUPS.iter().map(|g| (*g, 0)).collect();
    let mut sums = [0.0_f64; 5];
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut total = 0usize;

    for claim in claims
        .iter()
        .filter(|c| c.recipient() == agent && period.contains(c.content.claimed_at))
    {
        total += 1;
        *by_group.entry(claim.claim_type().group()).or_insert(0) += 1;

        let metrics = &claim.content.performance_metrics;
        for (sum, (_, score)) in sums.iter_mut().zip(metrics.scores()) {
            *sum += score;
        }

        let age_days = (now - claim.content.claimed_at).num_seconds() as f64 / SECONDS_PER_DAY;
        let weight = apply_decay(1.0, age_days, decay);
        weighted += weight * metrics.overall_satisfaction;
        total_weight += weight;
    }

    let average_metrics = (total > 0).then(|| {
        let n = total as f64;
        MetricAverages {
            timeliness: sums[0] / n,
            quality: sums[1] / n,
            reliability: sums[2] / n,
            communication: sums[3] / n,
            overall_satisfaction: sums[4] / n,
        }
    });

    ReputationSummary {
        agent: agent.clone(),
        period: *period,
        total_claims: total,
        by_group,
        average_satisfaction: average_metrics.map(|m| m.overall_satisfaction),
        average_metrics,
        weighted_satisfaction: (total_weight > 0.0).then(|| weighted / total_weight),
        derived_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use accord_core::claim::{BilateralSignature, ClaimContent, ClaimType, PerformanceMetrics};
    use accord_store::MemoryClaimStore;
    use chrono::Duration;
    use uuid::Uuid;

    fn agent(name: &str) -> AgentId {
        AgentId::new(format!("did:accord:{}", name))
    }

    fn claim(
        owner: &AgentId,
        claim_type: ClaimType,
        satisfaction: f64,
        at: DateTime<Utc>,
    ) -> ParticipationClaim {
        let mut metrics = PerformanceMetrics::uniform(0.5);
        metrics.overall_satisfaction = satisfaction;
        let content = ClaimContent {
            id: Uuid::now_v7(),
            recipient: owner.clone(),
            counterparty: agent("someone"),
            claim_type,
            fulfills: Uuid::now_v7(),
            fulfilled_by: Uuid::now_v7(),
            claimed_at: at,
            performance_metrics: metrics,
            resource_ref: None,
            notes: Some("private".to_string()),
        };
        ParticipationClaim {
            bilateral_signature: BilateralSignature {
                recipient_signature: vec![0; 64],
                counterparty_signature: vec![0; 64],
                signed_data_hash: content.signed_data_hash(),
                signed_at: at,
            },
            content,
        }
    }

    #[tokio::test]
    async fn test_empty_log_is_zero_not_error() {
        let store = Arc::new(MemoryClaimStore::new());
        let aggregator = ReputationAggregator::new(store, DecayFunction::default());
        let now = Utc::now();

        let summary = aggregator
            .derive_summary(&agent("alice"), &Period::last_days(30, now).unwrap(), now)
            .await
            .unwrap();
        assert_eq!(summary.total_claims, 0);
        assert!(summary.average_metrics.is_none());
        assert!(summary.average_satisfaction.is_none());
        assert!(summary.weighted_satisfaction.is_none());
        assert_eq!(summary.by_group.len(), 5);
        assert!(summary.by_group.values().all(|c| *c == 0));
    }

    #[tokio::test]
    async fn test_groups_and_means_within_period() {
        let store = Arc::new(MemoryClaimStore::new());
        let alice = agent("alice");
        let now = Utc::now();
        for (claim_type, satisfaction, days_ago) in [
            (ClaimType::ResourceCreation, 1.0, 1),
            (ClaimType::CustodyTransfer, 0.5, 2),
            (ClaimType::CustodyAcceptance, 0.0, 3),
            (ClaimType::EndOfLifeDeclaration, 0.2, 60),
        ] {
            store
                .append_claim(&alice, &claim(&alice, claim_type, satisfaction, now - Duration::days(days_ago)))
                .await
                .unwrap();
        }
        store
            .append_claim(&agent("bob"), &claim(&agent("bob"), ClaimType::RuleCompliance, 1.0, now))
            .await
            .unwrap();

        let aggregator = ReputationAggregator::new(store, DecayFunction::default());
        let summary = aggregator
            .derive_summary(&alice, &Period::last_days(30, now).unwrap(), now)
            .await
            .unwrap();

        assert_eq!(summary.total_claims, 3);
        assert_eq!(summary.by_group[&ClaimGroup::Creation], 1);
        assert_eq!(summary.by_group[&ClaimGroup::Custody], 2);
        assert_eq!(summary.by_group[&ClaimGroup::Governance], 0);
        assert_eq!(summary.by_group[&ClaimGroup::EndOfLife], 0);
        let metrics = summary.average_metrics.unwrap();
        assert!((metrics.overall_satisfaction - 0.5).abs() < 1e-10);
        assert!((metrics.quality - 0.5).abs() < 1e-10);
        assert_eq!(summary.average_satisfaction, Some(metrics.overall_satisfaction));
    }

    #[test]
    fn test_recent_claims_weigh_more() {
        let alice = agent("alice");
        let now = Utc::now();
        let claims = vec![
            claim(&alice, ClaimType::ValidationActivity, 1.0, now),
            claim(&alice, ClaimType::ValidationActivity, 0.0, now - Duration::days(90)),
        ];

        let summary = summarize(
            &alice,
            &claims,
            &Period::all_time(),
            &DecayFunction::Exponential { half_life_days: 90.0 },
            now,
        );
        assert_eq!(summary.average_satisfaction, Some(0.5));
        // Weights 1.0 and 0.5.
        let weighted = summary.weighted_satisfaction.unwrap();
        assert!((weighted - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fully_decayed_weights_give_no_weighted_score() {
        let alice = agent("alice");
        let now = Utc::now();
        let claims = vec![claim(&alice, ClaimType::RuleCompliance, 0.8, now - Duration::days(100))];
        let summary = summarize(
            &alice,
            &claims,
            &Period::all_time(),
            &DecayFunction::Linear { decay_per_day: 0.1 },
            now,
        );
        assert_eq!(summary.total_claims, 1);
        assert!(summary.weighted_satisfaction.is_none());
    }

    #[test]
    fn test_summary_json_has_no_raw_claim_fields() {
        let alice = agent("alice");
        let now = Utc::now();
        let claims = vec![claim(&alice, ClaimType::GoodFaithTransfer, 0.9, now)];
        let summary = summarize(&alice, &claims, &Period::all_time(), &DecayFunction::default(), now);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("someone"));
        assert!(!json.contains("private"));
        assert!(!json.contains(&claims[0].id().to_string()));
    }
}
