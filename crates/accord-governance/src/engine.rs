// crates/accord-governance/src/engine.rs
//
// ValidationEngine: starts rounds, accepts votes, resolves outcomes, and runs
// the end-of-life challenge window.
//
// Rounds live on the public governance ledger. Votes are written under their
// own (round, validator) key and `resolve` re-reads the full vote set, so
// concurrent voters never overwrite each other's work. When a round leaves
// Pending the effective vote set is frozen into the round record; later vote
// writes are refused and would be ignored anyway.
//
// Every read-modify-write of a round runs under that round's lock, and
// `start_round` runs under the resource's lock, so a challenge and a
// finalizing resolve can never both act on the same stored snapshot.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::resource::Resource;
use accord_core::traits::{GovernanceLedger, IdentityProvider, ResourceStore};
use accord_core::validation::{
    Challenge, RoundPurpose, RoundStatus, ValidationRound, ValidationScheme, Vote, VoteDecision,
};

use crate::policy::GovernancePolicy;
use crate::scheme::{self, Outcome};

/// Per-key async locks. Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.len()
    }
}

pub struct ValidationEngine {
    ledger: Arc<dyn GovernanceLedger>,
    resources: Arc<dyn ResourceStore>,
    identities: Arc<dyn IdentityProvider>,
    policy: GovernancePolicy,
    locks: KeyedLocks,
}

impl ValidationEngine {
    /// Create an engine enforcing `policy`.
    ///
    /// # Errors
    /// Returns `AccordError::Config` if the policy is inconsistent.
    pub fn new(
        ledger: Arc<dyn GovernanceLedger>,
        resources: Arc<dyn ResourceStore>,
        identities: Arc<dyn IdentityProvider>,
        policy: GovernancePolicy,
    ) -> Result<Self, AccordError> {
        policy.validate()?;
        Ok(Self {
            ledger,
            resources,
            identities,
            policy,
            locks: KeyedLocks::default(),
        })
    }

    pub fn policy(&self) -> &GovernancePolicy {
        &self.policy
    }

    async fn load_round(&self, round_id: Uuid) -> Result<ValidationRound, AccordError> {
        self.ledger
            .get_round(&round_id)
            .await?
            .ok_or_else(|| AccordError::NotFound(format!("validation round {}", round_id)))
    }

    async fn load_resource(&self, resource_id: &Uuid) -> Result<Resource, AccordError> {
        self.resources
            .get_resource(resource_id)
            .await?
            .ok_or_else(|| AccordError::NotFound(format!("resource {}", resource_id)))
    }

    /// Open a validation round over `eligible_validators`.
    ///
    /// # Errors
    /// - `Validation` if the pool is smaller than the scheme or policy
    ///   minimum, larger than the policy maximum, or the scheme is malformed.
    /// - `Authorization` if the declarant never held custody of the resource, or a
    ///   listed validator is conflicted or lacks the required capability.
    /// - `State` if the resource already has an open round for the same purpose.
    pub async fn start_round(
        &self,
        resource_id: Uuid,
        purpose: RoundPurpose,
        scheme: ValidationScheme,
        eligible_validators: BTreeSet<AgentId>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AccordError> {
        let pool_size = eligible_validators.len();
        scheme::check_scheme(&scheme, pool_size)?;

        let minimum = self.policy.min_validators_for(&purpose);
        if pool_size < minimum {
            return Err(AccordError::Validation(format!(
                "eligible_validators: at least {} required for this round, got {}",
                minimum, pool_size
            )));
        }
        if pool_size > self.policy.max_validators {
            return Err(AccordError::Validation(format!(
                "eligible_validators: at most {} allowed, got {}",
                self.policy.max_validators, pool_size
            )));
        }

        let _guard = self.locks.acquire(resource_id).await;
        let resource = self.load_resource(&resource_id).await?;
        match &purpose {
            RoundPurpose::ResourceCreation { creator } if creator != &resource.creator => {
                return Err(AccordError::Authorization(format!(
                    "{} did not create resource {}",
                    creator, resource_id
                )));
            }
            RoundPurpose::EndOfLife { declarant, .. } if !resource.was_custodian(declarant) => {
                return Err(AccordError::Authorization(format!(
                    "declarant {} never held custody of resource {}",
                    declarant, resource_id
                )));
            }
            _ => {}
        }

        for validator in &eligible_validators {
            if purpose.is_conflicted(validator) {
                return Err(AccordError::Authorization(format!(
                    "validator {} has a stake in the outcome (declarant or disposal recipient)",
                    validator
                )));
            }
            let identity = self.identities.resolve(validator).await?.ok_or_else(|| {
                AccordError::Authorization(format!("validator {} has no registered identity", validator))
            })?;
            if identity.capability < self.policy.min_validator_capability {
                return Err(AccordError::Authorization(format!(
                    "validator {} is {}, at least {} is required",
                    validator, identity.capability, self.policy.min_validator_capability
                )));
            }
        }

        let open = self
            .ledger
            .rounds_for_resource(&resource_id)
            .await?
            .into_iter()
            .any(|r| {
                r.purpose.is_end_of_life() == purpose.is_end_of_life()
                    && matches!(
                        r.status,
                        RoundStatus::Pending | RoundStatus::UnderReview
                    )
            });
        if open {
            return Err(AccordError::State(format!(
                "resource {} already has an open round for this purpose",
                resource_id
            )));
        }

        let round = ValidationRound {
            id: Uuid::now_v7(),
            resource_id,
            purpose,
            scheme,
            eligible_validators,
            status: RoundStatus::Pending,
            created_at: now,
            challenge_deadline: None,
            challenges: Vec::new(),
            closed_votes: None,
            closed_at: None,
        };
        self.ledger.save_round(&round).await?;

        tracing::info!(
            "Started {} round {} for resource {} with {} validators",
            round.scheme,
            round.id,
            resource_id,
            pool_size
        );
        Ok(round.id)
    }

    /// Record `validator`'s vote. A later vote by the same validator replaces
    /// the earlier one until the round closes.
    ///
    /// # Errors
    /// - `Authorization` if the validator is not eligible or is conflicted.
    /// - `State` if the round no longer accepts votes.
    pub async fn submit_vote(
        &self,
        round_id: Uuid,
        validator: &AgentId,
        decision: VoteDecision,
        now: DateTime<Utc>,
    ) -> Result<(), AccordError> {
        let _guard = self.locks.acquire(round_id).await;
        let round = self.load_round(round_id).await?;

        if round.purpose.is_conflicted(validator) {
            tracing::warn!("Refused self-interested vote by {} on round {}", validator, round_id);
            return Err(AccordError::Authorization(format!(
                "{} may not vote on round {}: declarant or disposal recipient",
                validator, round_id
            )));
        }
        if !round.eligible_validators.contains(validator) {
            return Err(AccordError::Authorization(format!(
                "{} is not an eligible validator for round {}",
                validator, round_id
            )));
        }
        if !round.accepts_votes() {
            return Err(AccordError::State(format!(
                "round {} is {} and no longer accepts votes",
                round_id, round.status
            )));
        }

        self.ledger
            .put_vote(&Vote {
                round_id,
                validator: validator.clone(),
                decision,
                cast_at: now,
            })
            .await?;

        tracing::debug!("Vote {:?} by {} on round {}", decision, validator, round_id);
        Ok(())
    }

    /// Recompute the round's status from the current vote set and the clock.
    ///
    /// Closed rounds return their status unchanged, except that an approved
    /// end-of-life round becomes `Finalized` once its challenge window has
    /// elapsed at `now` without a challenge.
    pub async fn resolve(
        &self,
        round_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RoundStatus, AccordError> {
        let _guard = self.locks.acquire(round_id).await;
        let mut round = self.load_round(round_id).await?;

        match round.status {
            RoundStatus::Pending => {
                let votes = self.ledger.list_votes(&round_id).await?;
                let tally = scheme::tally(&round.eligible_validators, &votes);
                let outcome = scheme::decide(&round.scheme, &tally);

                let status = match outcome {
                    Outcome::Pending => return Ok(RoundStatus::Pending),
                    Outcome::Approved => RoundStatus::Approved,
                    Outcome::Rejected => RoundStatus::Rejected,
                };

                round.status = status;
                round.closed_at = Some(now);
                round.closed_votes = Some(scheme::latest_votes(&round.eligible_validators, &votes));
                if status == RoundStatus::Approved && round.purpose.is_end_of_life() {
                    round.challenge_deadline = Some(now + self.policy.challenge_window());
                }
                self.ledger.save_round(&round).await?;

                tracing::info!(
                    "Round {} resolved {} ({} approve / {} reject / {} undecided)",
                    round_id,
                    status,
                    tally.approvals,
                    tally.rejections,
                    tally.undecided
                );
                Ok(status)
            }
            RoundStatus::Approved if round.purpose.is_end_of_life() => {
                match round.challenge_deadline {
                    Some(deadline) if now >= deadline && round.challenges.is_empty() => {
                        round.status = RoundStatus::Finalized;
                        self.ledger.save_round(&round).await?;
                        tracing::info!(
                            "Round {} finalized: challenge window closed at {}",
                            round_id,
                            deadline
                        );
                        Ok(RoundStatus::Finalized)
                    }
                    _ => Ok(RoundStatus::Approved),
                }
            }
            status => Ok(status),
        }
    }

    /// Dispute an approved end-of-life decision during its challenge window.
    ///
    /// # Errors
    /// - `Authorization` if `challenger` never held custody of the resource.
    /// - `State` if the round is not an approved end-of-life round or the
    ///   window has closed at `now`.
    pub async fn raise_challenge(
        &self,
        round_id: Uuid,
        challenger: &AgentId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RoundStatus, AccordError> {
        let _guard = self.locks.acquire(round_id).await;
        let mut round = self.load_round(round_id).await?;

        if !round.purpose.is_end_of_life() || round.status != RoundStatus::Approved {
            return Err(AccordError::State(format!(
                "round {} is {} and cannot be challenged",
                round_id, round.status
            )));
        }
        let deadline = round.challenge_deadline.ok_or_else(|| {
            AccordError::State(format!("round {} has no challenge window", round_id))
        })?;
        if now >= deadline {
            return Err(AccordError::State(format!(
                "challenge window for round {} closed at {}",
                round_id, deadline
            )));
        }

        let resource = self.load_resource(&round.resource_id).await?;
        if !resource.was_custodian(challenger) {
            return Err(AccordError::Authorization(format!(
                "{} is not in the custody history of resource {}",
                challenger, resource.id
            )));
        }

        round.challenges.push(Challenge {
            challenger: challenger.clone(),
            raised_at: now,
            reason,
        });
        round.status = RoundStatus::UnderReview;
        self.ledger.save_round(&round).await?;

        tracing::warn!("Round {} challenged by {}; now under review", round_id, challenger);
        Ok(RoundStatus::UnderReview)
    }

    /// Record the out-of-band outcome of a challenged round.
    ///
    /// `uphold = true` keeps the end-of-life decision (Finalized); `false`
    /// overturns it (Rejected).
    pub async fn conclude_review(
        &self,
        round_id: Uuid,
        uphold: bool,
        now: DateTime<Utc>,
    ) -> Result<RoundStatus, AccordError> {
        let _guard = self.locks.acquire(round_id).await;
        let mut round = self.load_round(round_id).await?;
        if round.status != RoundStatus::UnderReview {
            return Err(AccordError::State(format!(
                "round {} is {}, not under review",
                round_id, round.status
            )));
        }

        round.status = if uphold {
            RoundStatus::Finalized
        } else {
            RoundStatus::Rejected
        };
        round.closed_at = Some(now);
        self.ledger.save_round(&round).await?;

        tracing::info!("Review of round {} concluded: {}", round_id, round.status);
        Ok(round.status)
    }

    pub async fn round(&self, round_id: Uuid) -> Result<ValidationRound, AccordError> {
        self.load_round(round_id).await
    }

    /// The most recent creation round for a resource, resolved against `now`.
    pub async fn latest_creation_round(
        &self,
        resource_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ValidationRound>, AccordError> {
        let rounds = self.ledger.rounds_for_resource(resource_id).await?;
        match rounds.iter().rev().find(|r| !r.purpose.is_end_of_life()) {
            Some(round) => {
                self.resolve(round.id, now).await?;
                Ok(Some(self.load_round(round.id).await?))
            }
            None => Ok(None),
        }
    }
}
