// crates/accord-lifecycle/src/machine.rs
//
// ResourceLifecycle: applies state changes to stored resources.
//
// Every accepted state change is appended to the transition ledger with the
// requesting agent and, for retirement, the end-of-life round that allowed it.
// Custody transfers change the custodian but not the state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use accord_claims::validate_signature;
use accord_core::claim::{ClaimType, ParticipationClaim};
use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::resource::{Resource, ResourceState, ResourceTransition};
use accord_core::traits::{IdentityProvider, ResourceStore};
use accord_core::validation::{RoundStatus, VoteDecision};
use accord_governance::ValidationEngine;

use crate::transitions::{check_transition, TransitionGate};

/// The signed claim pair produced when a validator confirms a new resource.
#[derive(Debug, Clone)]
pub struct CreationEvidence {
    /// Held by the creator.
    pub creation: ParticipationClaim,
    /// Held by the validator.
    pub validation: ParticipationClaim,
}

impl CreationEvidence {
    /// Structural checks: categories, the shared interaction, mutual
    /// counterparty references and the resource the pair is about.
    fn check_shape(&self, resource: &Resource) -> Result<(), AccordError> {
        let creation = &self.creation.content;
        let validation = &self.validation.content;

        if creation.claim_type != ClaimType::ResourceCreation {
            return Err(AccordError::Validation(format!(
                "creation: expected {}, got {}",
                ClaimType::ResourceCreation,
                creation.claim_type
            )));
        }
        if validation.claim_type != ClaimType::ResourceValidation {
            return Err(AccordError::Validation(format!(
                "validation: expected {}, got {}",
                ClaimType::ResourceValidation,
                validation.claim_type
            )));
        }
        if creation.recipient != resource.creator {
            return Err(AccordError::Validation(format!(
                "creation: recipient {} is not the creator {} of resource {}",
                creation.recipient, resource.creator, resource.id
            )));
        }
        if creation.counterparty != validation.recipient
            || validation.counterparty != creation.recipient
        {
            return Err(AccordError::Validation(
                "creation/validation: claims do not reference each other".to_string(),
            ));
        }
        if creation.fulfills != validation.fulfills
            || creation.fulfilled_by != validation.fulfilled_by
        {
            return Err(AccordError::Validation(
                "creation/validation: claims belong to different interactions".to_string(),
            ));
        }
        for (role, claim) in [("creation", creation), ("validation", validation)] {
            if claim.resource_ref != Some(resource.id) {
                return Err(AccordError::Validation(format!(
                    "{}.resource_ref: does not reference resource {}",
                    role, resource.id
                )));
            }
        }
        Ok(())
    }
}

pub struct ResourceLifecycle {
    resources: Arc<dyn ResourceStore>,
    identities: Arc<dyn IdentityProvider>,
    governance: Arc<ValidationEngine>,
}

impl ResourceLifecycle {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        identities: Arc<dyn IdentityProvider>,
        governance: Arc<ValidationEngine>,
    ) -> Self {
        Self {
            resources,
            identities,
            governance,
        }
    }

    pub async fn get(&self, resource_id: &Uuid) -> Result<Resource, AccordError> {
        self.resources
            .get_resource(resource_id)
            .await?
            .ok_or_else(|| AccordError::NotFound(format!("resource {}", resource_id)))
    }

    pub async fn history(&self, resource_id: &Uuid) -> Result<Vec<ResourceTransition>, AccordError> {
        self.resources.list_transitions(resource_id).await
    }

    /// Create a resource in `PendingValidation` with `creator` as custodian.
    ///
    /// # Errors
    /// `State` if a resource with this id already exists.
    pub async fn register(
        &self,
        resource_id: Uuid,
        creator: AgentId,
        now: DateTime<Utc>,
    ) -> Result<Resource, AccordError> {
        if self.resources.get_resource(&resource_id).await?.is_some() {
            return Err(AccordError::State(format!(
                "resource {} is already registered",
                resource_id
            )));
        }
        let resource = Resource::new(resource_id, creator, now);
        self.resources.save_resource(&resource).await?;
        tracing::info!("Registered resource {} for {}", resource_id, resource.creator);
        Ok(resource)
    }

    /// `PendingValidation -> Active`, backed by the creation claim pair.
    ///
    /// # Errors
    /// - `InvalidStateTransition` if the resource is not pending, or a
    ///   creation round exists and has not approved it.
    /// - `Authorization` if `actor` is not the creator, the validating agent
    ///   lacks the policy's validator capability, or a creation round exists
    ///   and the validating agent is not among its approving voters.
    /// - `Validation` if the claims do not form a creation pair for this resource.
    /// - `Integrity` if either claim's signatures do not verify.
    pub async fn activate(
        &self,
        resource_id: Uuid,
        evidence: &CreationEvidence,
        actor: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<Resource, AccordError> {
        let mut resource = self.get(&resource_id).await?;
        check_transition(resource.state, ResourceState::Active)?;

        if actor != &resource.creator {
            return Err(AccordError::Authorization(format!(
                "only the creator {} may activate resource {}",
                resource.creator, resource_id
            )));
        }

        evidence.check_shape(&resource)?;
        validate_signature(self.identities.as_ref(), &evidence.creation).await?;
        validate_signature(self.identities.as_ref(), &evidence.validation).await?;

        let validator = &evidence.validation.content.recipient;
        let required = self.governance.policy().min_validator_capability;
        let capability = self
            .identities
            .resolve(validator)
            .await?
            .map(|identity| identity.capability);
        if capability.map_or(true, |c| c < required) {
            tracing::warn!(
                "Activation of {} refused: validator {} lacks {} capability",
                resource_id,
                validator,
                required
            );
            return Err(AccordError::Authorization(format!(
                "validator {} of resource {} must be at least {}",
                validator, resource_id, required
            )));
        }

        let mut round_id = None;
        if let Some(round) = self.governance.latest_creation_round(&resource_id, now).await? {
            if round.status != RoundStatus::Approved {
                tracing::warn!(
                    "Activation of {} refused: creation round {} is {}",
                    resource_id,
                    round.id,
                    round.status
                );
                return Err(AccordError::InvalidStateTransition {
                    current: resource.state,
                    requested: ResourceState::Active,
                });
            }
            let approved_by_validator = round
                .closed_votes
                .as_ref()
                .and_then(|votes| votes.get(validator))
                == Some(&VoteDecision::Approve);
            if !approved_by_validator {
                return Err(AccordError::Authorization(format!(
                    "validator {} did not approve creation round {}",
                    validator, round.id
                )));
            }
            round_id = Some(round.id);
        }

        self.apply(&mut resource, ResourceState::Active, actor, round_id, now)
            .await?;
        Ok(resource)
    }

    /// Custodian-requested moves between `Active` and `Maintenance` or `Reserved`.
    ///
    /// # Errors
    /// - `InvalidStateTransition` for any other pair.
    /// - `Authorization` if `actor` is not the current custodian.
    pub async fn transition(
        &self,
        resource_id: Uuid,
        requested: ResourceState,
        actor: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<Resource, AccordError> {
        let mut resource = self.get(&resource_id).await?;
        let gate = check_transition(resource.state, requested)?;
        if gate != TransitionGate::CustodianRequest {
            return Err(AccordError::InvalidStateTransition {
                current: resource.state,
                requested,
            });
        }
        self.require_custodian(&resource, actor)?;

        self.apply(&mut resource, requested, actor, None, now).await?;
        Ok(resource)
    }

    /// Hand the resource from its current custodian to `to`.
    ///
    /// # Errors
    /// - `State` unless the resource is `Active` or `Reserved`.
    /// - `Authorization` if `from` is not the current custodian.
    /// - `Validation` if `from` and `to` are the same agent.
    pub async fn transfer_custody(
        &self,
        resource_id: Uuid,
        from: &AgentId,
        to: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<Resource, AccordError> {
        let mut resource = self.get(&resource_id).await?;
        if !matches!(resource.state, ResourceState::Active | ResourceState::Reserved) {
            return Err(AccordError::State(format!(
                "resource {} is {}; custody moves only while Active or Reserved",
                resource_id, resource.state
            )));
        }
        self.require_custodian(&resource, from)?;
        if from == to {
            return Err(AccordError::Validation(format!(
                "to: {} already holds resource {}",
                to, resource_id
            )));
        }

        resource.custodian = to.clone();
        resource.custody_history.push(to.clone());
        resource.updated_at = now;
        self.resources.save_resource(&resource).await?;

        tracing::info!("Custody of {} moved {} -> {}", resource_id, from, to);
        Ok(resource)
    }

    /// `Active | Maintenance -> Retired`, backed by a finalized end-of-life round.
    ///
    /// Once the actor is authorized the round is resolved against `now`, so an
    /// approved round whose challenge window has just elapsed counts as
    /// finalized.
    ///
    /// # Errors
    /// - `InvalidStateTransition` if the state does not allow retirement or the
    ///   round is not a finalized end-of-life round for this resource.
    /// - `Authorization` if `actor` is neither the current custodian nor the
    ///   round's declarant.
    pub async fn retire(
        &self,
        resource_id: Uuid,
        round_id: Uuid,
        actor: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<Resource, AccordError> {
        let mut resource = self.get(&resource_id).await?;
        check_transition(resource.state, ResourceState::Retired)?;

        let round = self.governance.round(round_id).await?;
        if actor != &resource.custodian && actor != round.purpose.declarant() {
            return Err(AccordError::Authorization(format!(
                "{} is neither the custodian of resource {} nor the declarant of round {}",
                actor, resource_id, round_id
            )));
        }
        let status = self.governance.resolve(round_id, now).await?;
        if round.resource_id != resource_id
            || !round.purpose.is_end_of_life()
            || status != RoundStatus::Finalized
        {
            tracing::warn!(
                "Retirement of {} refused: round {} is {}",
                resource_id,
                round_id,
                status
            );
            return Err(AccordError::InvalidStateTransition {
                current: resource.state,
                requested: ResourceState::Retired,
            });
        }

        self.apply(
            &mut resource,
            ResourceState::Retired,
            actor,
            Some(round_id),
            now,
        )
        .await?;
        Ok(resource)
    }

    fn require_custodian(&self, resource: &Resource, actor: &AgentId) -> Result<(), AccordError> {
        if actor != &resource.custodian {
            return Err(AccordError::Authorization(format!(
                "{} is not the custodian of resource {}",
                actor, resource.id
            )));
        }
        Ok(())
    }

    async fn apply(
        &self,
        resource: &mut Resource,
        to: ResourceState,
        actor: &AgentId,
        round_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), AccordError> {
        let transition = ResourceTransition {
            id: Uuid::now_v7(),
            resource_id: resource.id,
            from: resource.state,
            to,
            actor: actor.clone(),
            round_id,
            at: now,
        };
        resource.state = to;
        resource.updated_at = now;

        self.resources.save_resource(resource).await?;
        self.resources.record_transition(&transition).await?;

        tracing::info!(
            "Resource {} transition: {} -> {}",
            resource.id,
            transition.from,
            transition.to
        );
        Ok(())
    }
}
