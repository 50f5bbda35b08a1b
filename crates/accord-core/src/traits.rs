// crates/accord-core/src/traits.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::claim::ParticipationClaim;
use crate::economic::{Commitment, EconomicEvent};
use crate::error::AccordError;
use crate::identity::{AgentId, AgentIdentity};
use crate::resource::{Resource, ResourceTransition};
use crate::validation::{ValidationRound, Vote};

/// Resolves agent identifiers to public keys and capability levels.
///
/// Provided by the external identity collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, agent: &AgentId) -> Result<Option<AgentIdentity>, AccordError>;
}

/// Read access to the commitment/event ledger.
#[async_trait]
pub trait EventLedger: Send + Sync {
    async fn get_commitment(&self, id: &Uuid) -> Result<Option<Commitment>, AccordError>;

    async fn get_event(&self, id: &Uuid) -> Result<Option<EconomicEvent>, AccordError>;
}

/// Private, append-only claim logs keyed by owner.
///
/// Implementations must refuse to overwrite an existing claim.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Append a claim to `owner`'s log.
    async fn append_claim(
        &self,
        owner: &AgentId,
        claim: &ParticipationClaim,
    ) -> Result<(), AccordError>;

    /// All claims in `owner`'s log, oldest first.
    async fn list_claims(&self, owner: &AgentId) -> Result<Vec<ParticipationClaim>, AccordError>;
}

/// Current resource state plus the append-only transition ledger.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_resource(&self, id: &Uuid) -> Result<Option<Resource>, AccordError>;

    /// Save a resource. Overwrites if the ID already exists.
    async fn save_resource(&self, resource: &Resource) -> Result<(), AccordError>;

    async fn record_transition(&self, transition: &ResourceTransition) -> Result<(), AccordError>;

    /// Transitions for a resource, oldest first.
    async fn list_transitions(&self, resource_id: &Uuid)
        -> Result<Vec<ResourceTransition>, AccordError>;
}

/// Public ledger of validation rounds and their votes.
#[async_trait]
pub trait GovernanceLedger: Send + Sync {
    /// Save a round. Overwrites if the ID already exists.
    async fn save_round(&self, round: &ValidationRound) -> Result<(), AccordError>;

    async fn get_round(&self, id: &Uuid) -> Result<Option<ValidationRound>, AccordError>;

    async fn rounds_for_resource(&self, resource_id: &Uuid)
        -> Result<Vec<ValidationRound>, AccordError>;

    /// Write a vote under its (round, validator) key, replacing any earlier
    /// vote by the same validator.
    async fn put_vote(&self, vote: &Vote) -> Result<(), AccordError>;

    /// Every vote currently recorded for a round.
    async fn list_votes(&self, round_id: &Uuid) -> Result<Vec<Vote>, AccordError>;
}
