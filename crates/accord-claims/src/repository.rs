// crates/accord-claims/src/repository.rs
//
// ClaimRepository: an agent's view of its own private claim log.
//
// A repository is bound to one owner at construction. It only ever writes
// claims whose recipient is that owner, and only ever reads that owner's log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use accord_core::claim::{ClaimGroup, ClaimType, ParticipationClaim};
use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::traits::{ClaimStore, IdentityProvider};

use crate::signing::validate_signature;

/// Filter for `get_my_claims`. Every set field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimFilter {
    pub claim_type: Option<ClaimType>,
    pub group: Option<ClaimGroup>,
    pub counterparty: Option<AgentId>,
    pub resource_ref: Option<Uuid>,
    /// Inclusive lower bound on `claimed_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `claimed_at`.
    pub until: Option<DateTime<Utc>>,
}

impl ClaimFilter {
    pub fn matches(&self, claim: &ParticipationClaim) -> bool {
        let content = &claim.content;
        self.claim_type.map_or(true, |t| t == content.claim_type)
            && self.group.map_or(true, |g| g == content.claim_type.group())
            && self
                .counterparty
                .as_ref()
                .map_or(true, |c| c == &content.counterparty)
            && self
                .resource_ref
                .map_or(true, |r| Some(r) == content.resource_ref)
            && self.from.map_or(true, |from| content.claimed_at >= from)
            && self.until.map_or(true, |until| content.claimed_at < until)
    }
}

pub struct ClaimRepository {
    owner: AgentId,
    store: Arc<dyn ClaimStore>,
    identities: Arc<dyn IdentityProvider>,
}

impl ClaimRepository {
    pub fn new(
        owner: AgentId,
        store: Arc<dyn ClaimStore>,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            owner,
            store,
            identities,
        }
    }

    pub fn owner(&self) -> &AgentId {
        &self.owner
    }

    /// Append a fully signed claim to the owner's log.
    ///
    /// # Errors
    /// - `Authorization` if the claim belongs to another agent.
    /// - `Integrity` if the bilateral signature does not verify.
    /// - `State` if the claim is already recorded.
    pub async fn record(&self, claim: &ParticipationClaim) -> Result<(), AccordError> {
        if claim.recipient() != &self.owner {
            return Err(AccordError::Authorization(format!(
                "claim {} belongs to {}; only {} may be written to this log",
                claim.id(),
                claim.recipient(),
                self.owner
            )));
        }
        validate_signature(self.identities.as_ref(), claim).await?;
        self.store.append_claim(&self.owner, claim).await?;

        tracing::info!(
            "Recorded {} claim {} for {} (counterparty {})",
            claim.claim_type(),
            claim.id(),
            self.owner,
            claim.counterparty()
        );
        Ok(())
    }

    /// The owner's claims matching `filter`, oldest first.
    pub async fn get_my_claims(
        &self,
        filter: &ClaimFilter,
    ) -> Result<Vec<ParticipationClaim>, AccordError> {
        Ok(self
            .store
            .list_claims(&self.owner)
            .await?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use accord_core::claim::{ClaimContent, PerformanceMetrics};
    use accord_core::crypto::AgentKeypair;
    use accord_core::identity::{AgentIdentity, CapabilityLevel};
    use accord_store::{MemoryClaimStore, MemoryIdentityRegistry};
    use chrono::Duration;

    use crate::signing::SignatureCoordinator;

    async fn signed_claim(
        coordinator: &SignatureCoordinator,
        recipient: (&AgentId, &AgentKeypair),
        counterparty: (&AgentId, &AgentKeypair),
        claim_type: ClaimType,
        claimed_at: DateTime<Utc>,
    ) -> ParticipationClaim {
        let content = ClaimContent {
            id: Uuid::now_v7(),
            recipient: recipient.0.clone(),
            counterparty: counterparty.0.clone(),
            claim_type,
            fulfills: Uuid::now_v7(),
            fulfilled_by: Uuid::now_v7(),
            claimed_at,
            performance_metrics: PerformanceMetrics::uniform(0.8),
            resource_ref: None,
            notes: None,
        };
        let id = content.id;
        let hash = coordinator.propose(content).await.unwrap();
        for (agent, keys) in [recipient, counterparty] {
            coordinator.sign(id, agent, keys.sign(&hash), claimed_at).await.unwrap();
        }
        coordinator.take_signed_claim(id, recipient.0).await.unwrap()
    }

    #[tokio::test]
    async fn test_record_and_filter_own_claims() {
        let registry = Arc::new(MemoryIdentityRegistry::new());
        let alice = AgentId::new("did:accord:alice");
        let bob = AgentId::new("did:accord:bob");
        let alice_keys = AgentKeypair::generate();
        let bob_keys = AgentKeypair::generate();
        for (id, keys) in [(&alice, &alice_keys), (&bob, &bob_keys)] {
            registry
                .register(AgentIdentity {
                    id: id.clone(),
                    public_key: keys.public_key_bytes(),
                    capability: CapabilityLevel::Member,
                })
                .await;
        }
        let coordinator = SignatureCoordinator::new(registry.clone());
        let store = Arc::new(MemoryClaimStore::new());
        let repo = ClaimRepository::new(alice.clone(), store.clone(), registry.clone());

        let now = Utc::now();
        let old = signed_claim(
            &coordinator,
            (&alice, &alice_keys),
            (&bob, &bob_keys),
            ClaimType::CustodyTransfer,
            now - Duration::days(30),
        )
        .await;
        let recent = signed_claim(
            &coordinator,
            (&alice, &alice_keys),
            (&bob, &bob_keys),
            ClaimType::ServiceCommitmentAccepted,
            now,
        )
        .await;
        let bobs = signed_claim(
            &coordinator,
            (&bob, &bob_keys),
            (&alice, &alice_keys),
            ClaimType::CustodyAcceptance,
            now,
        )
        .await;

        repo.record(&old).await.unwrap();
        repo.record(&recent).await.unwrap();
        assert!(matches!(
            repo.record(&bobs).await,
            Err(AccordError::Authorization(_))
        ));

        let all = repo.get_my_claims(&ClaimFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let custody = repo
            .get_my_claims(&ClaimFilter {
                group: Some(ClaimGroup::Custody),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(custody, vec![old]);

        let last_week = repo
            .get_my_claims(&ClaimFilter {
                from: Some(now - Duration::days(7)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(last_week, vec![recent]);
    }

    #[tokio::test]
    async fn test_record_rejects_tampered_claim() {
        let registry = Arc::new(MemoryIdentityRegistry::new());
        let alice = AgentId::new("did:accord:alice");
        let bob = AgentId::new("did:accord:bob");
        let alice_keys = AgentKeypair::generate();
        let bob_keys = AgentKeypair::generate();
        for (id, keys) in [(&alice, &alice_keys), (&bob, &bob_keys)] {
            registry
                .register(AgentIdentity {
                    id: id.clone(),
                    public_key: keys.public_key_bytes(),
                    capability: CapabilityLevel::Member,
                })
                .await;
        }
        let coordinator = SignatureCoordinator::new(registry.clone());
        let store = Arc::new(MemoryClaimStore::new());
        let repo = ClaimRepository::new(alice.clone(), store.clone(), registry);

        let mut claim = signed_claim(
            &coordinator,
            (&alice, &alice_keys),
            (&bob, &bob_keys),
            ClaimType::CustodyTransfer,
            Utc::now(),
        )
        .await;
        claim.content.performance_metrics.overall_satisfaction = 1.0;
        claim.content.notes = Some("inflated".to_string());

        assert!(matches!(
            repo.record(&claim).await,
            Err(AccordError::Integrity(_))
        ));
        assert!(store.list_claims(&alice).await.unwrap().is_empty());
    }
}
