// crates/accord-store/src/rocks.rs
//
// RocksDB-backed persistent storage for Accord.
//
// Key format:
//   - Claims:      `claim:{owner}:{claimed_at_millis:020}:{claim_uuid}` -> JSON claim
//   - Rounds:      `round:{round_uuid}` -> JSON round
//   - Round index: `round_res:{resource_uuid}:{round_uuid}` -> empty value
//   - Votes:       `vote:{round_uuid}:{validator}` -> JSON vote
//   - Resources:   `resource:{resource_uuid}` -> JSON resource
//   - Transitions: `transition:{resource_uuid}:{at_millis:020}:{transition_uuid}` -> JSON
//   - Mirrors:     `identity:{agent}`, `commitment:{uuid}`, `event:{uuid}` -> JSON
//
// Claim and transition keys embed a zero-padded timestamp so that a prefix
// scan returns entries oldest first. Claim keys are never rewritten.

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use accord_core::claim::ParticipationClaim;
use accord_core::economic::{Commitment, EconomicEvent};
use accord_core::error::AccordError;
use accord_core::identity::{AgentId, AgentIdentity};
use accord_core::resource::{Resource, ResourceTransition};
use accord_core::traits::{ClaimStore, EventLedger, GovernanceLedger, IdentityProvider, ResourceStore};
use accord_core::validation::{ValidationRound, Vote};

/// RocksDB wrapper implementing every accord-core storage trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, AccordError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            AccordError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        Ok(Self { db })
    }

    fn claim_prefix(owner: &AgentId) -> String {
        format!("claim:{}:", owner)
    }

    fn claim_key(owner: &AgentId, claim: &ParticipationClaim) -> Vec<u8> {
        format!(
            "{}{:020}:{}",
            Self::claim_prefix(owner),
            claim.content.claimed_at.timestamp_millis().max(0),
            claim.id()
        )
        .into_bytes()
    }

    fn round_key(id: &Uuid) -> Vec<u8> {
        format!("round:{}", id).into_bytes()
    }

    fn round_index_key(resource_id: &Uuid, round_id: &Uuid) -> Vec<u8> {
        format!("round_res:{}:{}", resource_id, round_id).into_bytes()
    }

    fn vote_key(round_id: &Uuid, validator: &AgentId) -> Vec<u8> {
        format!("vote:{}:{}", round_id, validator).into_bytes()
    }

    fn resource_key(id: &Uuid) -> Vec<u8> {
        format!("resource:{}", id).into_bytes()
    }

    fn transition_key(transition: &ResourceTransition) -> Vec<u8> {
        format!(
            "transition:{}:{:020}:{}",
            transition.resource_id,
            transition.at.timestamp_millis().max(0),
            transition.id
        )
        .into_bytes()
    }

    /// Put raw bytes into RocksDB, mapping errors to AccordError::Storage.
    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), AccordError> {
        self.db
            .put(key, value)
            .map_err(|e| AccordError::Storage(format!("RocksDB put failed: {}", e)))
    }

    /// Get raw bytes from RocksDB, mapping errors to AccordError::Storage.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, AccordError> {
        self.db
            .get(key)
            .map_err(|e| AccordError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn put_json<T: Serialize>(&self, key: &[u8], value: &T) -> Result<(), AccordError> {
        let json = serde_json::to_vec(value)?;
        self.put_raw(key, &json)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, AccordError> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Collect every (key, value) pair whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, AccordError> {
        let prefix = prefix.as_bytes();
        let mut entries = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| AccordError::Storage(format!("RocksDB iteration error: {}", e)))?;
            // Stop when the prefix no longer matches.
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }

        Ok(entries)
    }

    /// Mirror an identity record locally so the store can act as identity provider.
    pub fn put_identity(&self, identity: &AgentIdentity) -> Result<(), AccordError> {
        self.put_json(format!("identity:{}", identity.id).as_bytes(), identity)
    }

    pub fn put_commitment(&self, commitment: &Commitment) -> Result<(), AccordError> {
        self.put_json(format!("commitment:{}", commitment.id).as_bytes(), commitment)
    }

    pub fn put_event(&self, event: &EconomicEvent) -> Result<(), AccordError> {
        self.put_json(format!("event:{}", event.id).as_bytes(), event)
    }
}

#[async_trait]
impl ClaimStore for RocksStore {
    async fn append_claim(
        &self,
        owner: &AgentId,
        claim: &ParticipationClaim,
    ) -> Result<(), AccordError> {
        let key = Self::claim_key(owner, claim);
        if self.get_raw(&key)?.is_some() {
            return Err(AccordError::State(format!(
                "claim {} is already recorded in the log of {}",
                claim.id(),
                owner
            )));
        }
        self.put_json(&key, claim)?;
        tracing::debug!("Persisted claim {} for {}", claim.id(), owner);
        Ok(())
    }

    async fn list_claims(&self, owner: &AgentId) -> Result<Vec<ParticipationClaim>, AccordError> {
        let mut claims = Vec::new();
        for (_, value) in self.scan_prefix(&Self::claim_prefix(owner))? {
            let claim: ParticipationClaim = serde_json::from_slice(&value)?;
            // An owner id that is a prefix of another (`a` vs `a:b`) shares a key prefix.
            if claim.recipient() == owner {
                claims.push(claim);
            }
        }
        Ok(claims)
    }
}

#[async_trait]
impl ResourceStore for RocksStore {
    async fn get_resource(&self, id: &Uuid) -> Result<Option<Resource>, AccordError> {
        self.get_json(&Self::resource_key(id))
    }

    async fn save_resource(&self, resource: &Resource) -> Result<(), AccordError> {
        self.put_json(&Self::resource_key(&resource.id), resource)
    }

    async fn record_transition(&self, transition: &ResourceTransition) -> Result<(), AccordError> {
        self.put_json(&Self::transition_key(transition), transition)
    }

    async fn list_transitions(
        &self,
        resource_id: &Uuid,
    ) -> Result<Vec<ResourceTransition>, AccordError> {
        self.scan_prefix(&format!("transition:{}:", resource_id))?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(AccordError::from))
            .collect()
    }
}

#[async_trait]
impl GovernanceLedger for RocksStore {
    async fn save_round(&self, round: &ValidationRound) -> Result<(), AccordError> {
        self.put_json(&Self::round_key(&round.id), round)?;
        // Write secondary resource index (empty value; existence is the signal).
        self.put_raw(&Self::round_index_key(&round.resource_id, &round.id), &[])
    }

    async fn get_round(&self, id: &Uuid) -> Result<Option<ValidationRound>, AccordError> {
        self.get_json(&Self::round_key(id))
    }

    async fn rounds_for_resource(
        &self,
        resource_id: &Uuid,
    ) -> Result<Vec<ValidationRound>, AccordError> {
        let prefix = format!("round_res:{}:", resource_id);
        let mut rounds = Vec::new();

        for (key, _) in self.scan_prefix(&prefix)? {
            // Keys are `round_res:{resource}:{round}`; the suffix is the round UUID.
            let suffix = std::str::from_utf8(&key[prefix.len()..]).unwrap_or("");
            if let Ok(round_id) = Uuid::parse_str(suffix) {
                if let Some(round) = self.get_json::<ValidationRound>(&Self::round_key(&round_id))? {
                    rounds.push(round);
                }
            }
        }

        rounds.sort_by_key(|r| (r.created_at, r.id));
        Ok(rounds)
    }

    async fn put_vote(&self, vote: &Vote) -> Result<(), AccordError> {
        self.put_json(&Self::vote_key(&vote.round_id, &vote.validator), vote)
    }

    async fn list_votes(&self, round_id: &Uuid) -> Result<Vec<Vote>, AccordError> {
        self.scan_prefix(&format!("vote:{}:", round_id))?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(AccordError::from))
            .collect()
    }
}

#[async_trait]
impl IdentityProvider for RocksStore {
    async fn resolve(&self, agent: &AgentId) -> Result<Option<AgentIdentity>, AccordError> {
        self.get_json(format!("identity:{}", agent).as_bytes())
    }
}

#[async_trait]
impl EventLedger for RocksStore {
    async fn get_commitment(&self, id: &Uuid) -> Result<Option<Commitment>, AccordError> {
        self.get_json(format!("commitment:{}", id).as_bytes())
    }

    async fn get_event(&self, id: &Uuid) -> Result<Option<EconomicEvent>, AccordError> {
        self.get_json(format!("event:{}", id).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use accord_core::claim::{BilateralSignature, ClaimContent, ClaimType, PerformanceMetrics};
    use accord_core::validation::{RoundPurpose, RoundStatus, ValidationScheme, VoteDecision};
    use chrono::{Duration, Utc};

    fn temp_db_path(label: &str) -> String {
        let path = std::env::temp_dir().join(format!("accord_store_{}_{}", label, Uuid::now_v7()));
        path.to_string_lossy().to_string()
    }

    fn make_claim(recipient: &AgentId, offset_secs: i64) -> ParticipationClaim {
        let content = ClaimContent {
            id: Uuid::now_v7(),
            recipient: recipient.clone(),
            counterparty: AgentId::new("did:accord:bob"),
            claim_type: ClaimType::CustodyTransfer,
            fulfills: Uuid::now_v7(),
            fulfilled_by: Uuid::now_v7(),
            claimed_at: Utc::now() + Duration::seconds(offset_secs),
            performance_metrics: PerformanceMetrics::uniform(0.7),
            resource_ref: None,
            notes: Some("handover at depot".to_string()),
        };
        ParticipationClaim {
            bilateral_signature: BilateralSignature {
                recipient_signature: vec![3; 64],
                counterparty_signature: vec![4; 64],
                signed_data_hash: content.signed_data_hash(),
                signed_at: Utc::now(),
            },
            content,
        }
    }

    #[tokio::test]
    async fn test_claims_listed_oldest_first_and_never_overwritten() {
        let store = RocksStore::open(&temp_db_path("claims")).unwrap();
        let alice = AgentId::new("did:accord:alice");

        let later = make_claim(&alice, 60);
        let earlier = make_claim(&alice, 0);
        store.append_claim(&alice, &later).await.unwrap();
        store.append_claim(&alice, &earlier).await.unwrap();
        assert!(store.append_claim(&alice, &later).await.is_err());

        let claims = store.list_claims(&alice).await.unwrap();
        assert_eq!(claims, vec![earlier, later]);
    }

    #[tokio::test]
    async fn test_owner_prefix_does_not_leak_claims() {
        let store = RocksStore::open(&temp_db_path("prefix")).unwrap();
        let short = AgentId::new("did:accord:a");
        let long = AgentId::new("did:accord:a:b");

        store.append_claim(&long, &make_claim(&long, 0)).await.unwrap();
        assert!(store.list_claims(&short).await.unwrap().is_empty());
        assert_eq!(store.list_claims(&long).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rounds_and_votes_roundtrip() {
        let store = RocksStore::open(&temp_db_path("rounds")).unwrap();
        let resource_id = Uuid::now_v7();
        let round = ValidationRound {
            id: Uuid::now_v7(),
            resource_id,
            purpose: RoundPurpose::EndOfLife {
                declarant: AgentId::new("did:accord:alice"),
                disposal_recipient: None,
            },
            scheme: ValidationScheme::KOfN { k: 2, n: 3 },
            eligible_validators: ["v1", "v2", "v3"].into_iter().map(AgentId::from).collect::<BTreeSet<_>>(),
            status: RoundStatus::Pending,
            created_at: Utc::now(),
            challenge_deadline: None,
            challenges: Vec::new(),
            closed_votes: None,
            closed_at: None,
        };
        store.save_round(&round).await.unwrap();

        assert_eq!(store.get_round(&round.id).await.unwrap(), Some(round.clone()));
        assert_eq!(store.rounds_for_resource(&resource_id).await.unwrap(), vec![round.clone()]);

        for (validator, decision) in [("v1", VoteDecision::Reject), ("v1", VoteDecision::Approve), ("v2", VoteDecision::Approve)] {
            store
                .put_vote(&Vote {
                    round_id: round.id,
                    validator: AgentId::new(validator),
                    decision,
                    cast_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let votes = store.list_votes(&round.id).await.unwrap();
        assert_eq!(votes.len(), 2);
        assert!(votes.iter().all(|v| v.decision == VoteDecision::Approve));
    }
}
