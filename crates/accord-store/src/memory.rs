// crates/accord-store/src/memory.rs
//
// In-memory backends implementing the accord-core storage traits.
//
// Each backend wraps its maps in `tokio::sync::RwLock` so that concurrent
// tasks (e.g. validators voting at the same time) can share one instance.
// Votes are keyed by (round, validator): two validators writing concurrently
// never touch the same entry.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use accord_core::claim::ParticipationClaim;
use accord_core::economic::{Commitment, EconomicEvent};
use accord_core::error::AccordError;
use accord_core::identity::{AgentId, AgentIdentity};
use accord_core::resource::{Resource, ResourceTransition};
use accord_core::traits::{ClaimStore, EventLedger, GovernanceLedger, IdentityProvider, ResourceStore};
use accord_core::validation::{ValidationRound, Vote};

/// Private claim logs, one append-only vector per owner.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    logs: RwLock<HashMap<AgentId, Vec<ParticipationClaim>>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn append_claim(
        &self,
        owner: &AgentId,
        claim: &ParticipationClaim,
    ) -> Result<(), AccordError> {
        let mut logs = self.logs.write().await;
        let log = logs.entry(owner.clone()).or_default();
        if log.iter().any(|c| c.id() == claim.id()) {
            return Err(AccordError::State(format!(
                "claim {} is already recorded in the log of {}",
                claim.id(),
                owner
            )));
        }
        log.push(claim.clone());
        tracing::debug!("Appended claim {} to log of {}", claim.id(), owner);
        Ok(())
    }

    async fn list_claims(&self, owner: &AgentId) -> Result<Vec<ParticipationClaim>, AccordError> {
        Ok(self
            .logs
            .read()
            .await
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }
}

/// Public ledger of resources, transitions, rounds, and votes.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    resources: RwLock<HashMap<Uuid, Resource>>,
    transitions: RwLock<HashMap<Uuid, Vec<ResourceTransition>>>,
    rounds: RwLock<HashMap<Uuid, ValidationRound>>,
    votes: RwLock<HashMap<Uuid, BTreeMap<AgentId, Vote>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryLedger {
    async fn get_resource(&self, id: &Uuid) -> Result<Option<Resource>, AccordError> {
        Ok(self.resources.read().await.get(id).cloned())
    }

    async fn save_resource(&self, resource: &Resource) -> Result<(), AccordError> {
        self.resources
            .write()
            .await
            .insert(resource.id, resource.clone());
        Ok(())
    }

    async fn record_transition(&self, transition: &ResourceTransition) -> Result<(), AccordError> {
        self.transitions
            .write()
            .await
            .entry(transition.resource_id)
            .or_default()
            .push(transition.clone());
        Ok(())
    }

    async fn list_transitions(
        &self,
        resource_id: &Uuid,
    ) -> Result<Vec<ResourceTransition>, AccordError> {
        Ok(self
            .transitions
            .read()
            .await
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl GovernanceLedger for MemoryLedger {
    async fn save_round(&self, round: &ValidationRound) -> Result<(), AccordError> {
        self.rounds.write().await.insert(round.id, round.clone());
        Ok(())
    }

    async fn get_round(&self, id: &Uuid) -> Result<Option<ValidationRound>, AccordError> {
        Ok(self.rounds.read().await.get(id).cloned())
    }

    async fn rounds_for_resource(
        &self,
        resource_id: &Uuid,
    ) -> Result<Vec<ValidationRound>, AccordError> {
        let mut rounds: Vec<ValidationRound> = self
            .rounds
            .read()
            .await
            .values()
            .filter(|r| r.resource_id == *resource_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| (r.created_at, r.id));
        Ok(rounds)
    }

    async fn put_vote(&self, vote: &Vote) -> Result<(), AccordError> {
        self.votes
            .write()
            .await
            .entry(vote.round_id)
            .or_default()
            .insert(vote.validator.clone(), vote.clone());
        Ok(())
    }

    async fn list_votes(&self, round_id: &Uuid) -> Result<Vec<Vote>, AccordError> {
        Ok(self
            .votes
            .read()
            .await
            .get(round_id)
            .map(|votes| votes.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Identity provider backed by a local registry.
#[derive(Debug, Default)]
pub struct MemoryIdentityRegistry {
    identities: RwLock<HashMap<AgentId, AgentIdentity>>,
}

impl MemoryIdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an identity.
    pub async fn register(&self, identity: AgentIdentity) {
        self.identities
            .write()
            .await
            .insert(identity.id.clone(), identity);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityRegistry {
    async fn resolve(&self, agent: &AgentId) -> Result<Option<AgentIdentity>, AccordError> {
        Ok(self.identities.read().await.get(agent).cloned())
    }
}

/// Commitment/event ledger backed by local maps.
#[derive(Debug, Default)]
pub struct MemoryEventLedger {
    commitments: RwLock<HashMap<Uuid, Commitment>>,
    events: RwLock<HashMap<Uuid, EconomicEvent>>,
}

impl MemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_commitment(&self, commitment: Commitment) {
        self.commitments
            .write()
            .await
            .insert(commitment.id, commitment);
    }

    pub async fn record_event(&self, event: EconomicEvent) {
        self.events.write().await.insert(event.id, event);
    }
}

#[async_trait]
impl EventLedger for MemoryEventLedger {
    async fn get_commitment(&self, id: &Uuid) -> Result<Option<Commitment>, AccordError> {
        Ok(self.commitments.read().await.get(id).cloned())
    }

    async fn get_event(&self, id: &Uuid) -> Result<Option<EconomicEvent>, AccordError> {
        Ok(self.events.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use accord_core::claim::{BilateralSignature, ClaimContent, ClaimType, PerformanceMetrics};
    use accord_core::validation::VoteDecision;
    use chrono::Utc;

    fn make_claim(recipient: &str) -> ParticipationClaim {
        let content = ClaimContent {
            id: Uuid::now_v7(),
            recipient: AgentId::new(recipient),
            counterparty: AgentId::new("did:accord:other"),
            claim_type: ClaimType::CustodyAcceptance,
            fulfills: Uuid::now_v7(),
            fulfilled_by: Uuid::now_v7(),
            claimed_at: Utc::now(),
            performance_metrics: PerformanceMetrics::uniform(0.9),
            resource_ref: None,
            notes: None,
        };
        ParticipationClaim {
            bilateral_signature: BilateralSignature {
                recipient_signature: vec![0; 64],
                counterparty_signature: vec![0; 64],
                signed_data_hash: content.signed_data_hash(),
                signed_at: Utc::now(),
            },
            content,
        }
    }

    #[tokio::test]
    async fn test_claim_logs_are_per_owner_and_append_only() {
        let store = MemoryClaimStore::new();
        let alice = AgentId::new("did:accord:alice");
        let claim = make_claim("did:accord:alice");

        store.append_claim(&alice, &claim).await.unwrap();
        assert!(matches!(
            store.append_claim(&alice, &claim).await,
            Err(AccordError::State(_))
        ));

        assert_eq!(store.list_claims(&alice).await.unwrap().len(), 1);
        assert!(store
            .list_claims(&AgentId::new("did:accord:bob"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_votes_are_all_kept() {
        let ledger = Arc::new(MemoryLedger::new());
        let round_id = Uuid::now_v7();

        let mut handles = Vec::new();
        for i in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let vote = Vote {
                    round_id,
                    validator: AgentId::new(format!("did:accord:v{}", i)),
                    decision: VoteDecision::Approve,
                    cast_at: Utc::now(),
                };
                ledger.put_vote(&vote).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ledger.list_votes(&round_id).await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_revote_replaces_previous_vote() {
        let ledger = MemoryLedger::new();
        let round_id = Uuid::now_v7();
        let validator = AgentId::new("did:accord:v1");

        for decision in [VoteDecision::Reject, VoteDecision::Approve] {
            ledger
                .put_vote(&Vote {
                    round_id,
                    validator: validator.clone(),
                    decision,
                    cast_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let votes = ledger.list_votes(&round_id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].decision, VoteDecision::Approve);
    }
}
