// crates/accord-node/src/participant.rs
//
// Participant: one agent's handle on an AccordNode.
//
// Every operation acts as the session's agent and reads time from the
// injected clock. Claims travel through the shared signing coordinator:
//
//   issuer:        issue_pair  -> proposes both drafts, signs both
//   counterparty:  countersign -> signs both drafts
//   each side:     collect_claim(own draft id) -> verified, appended to own log

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use accord_claims::{ClaimFilter, ClaimPair, ClaimRepository, SigningEvent, SigningState};
use accord_core::claim::ParticipationClaim;
use accord_core::clock::Clock;
use accord_core::crypto::AgentKeypair;
use accord_core::economic::InteractionContext;
use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::resource::{Resource, ResourceState};
use accord_core::validation::{RoundPurpose, RoundStatus, ValidationScheme, VoteDecision};
use accord_lifecycle::CreationEvidence;
use accord_reputation::{Period, ReputationAggregator, ReputationSummary};

use crate::node::AccordNode;

/// The agent a participant acts as, with its signing key.
pub struct Session {
    agent: AgentId,
    keypair: AgentKeypair,
}

impl Session {
    pub fn new(agent: AgentId, keypair: AgentKeypair) -> Self {
        Self { agent, keypair }
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    fn sign(&self, signed_data_hash: &[u8; 32]) -> Vec<u8> {
        self.keypair.sign(signed_data_hash)
    }
}

pub struct Participant {
    session: Session,
    node: AccordNode,
    clock: Arc<dyn Clock>,
    repository: ClaimRepository,
    reputation: ReputationAggregator,
}

impl Participant {
    pub fn new(session: Session, node: AccordNode, clock: Arc<dyn Clock>) -> Self {
        let repository = ClaimRepository::new(
            session.agent.clone(),
            node.stores.claims.clone(),
            node.stores.identities.clone(),
        );
        let reputation = ReputationAggregator::new(node.stores.claims.clone(), node.decay.clone());
        Self {
            session,
            node,
            clock,
            repository,
            reputation,
        }
    }

    pub fn agent(&self) -> &AgentId {
        self.session.agent()
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Issue the claim pair for an interaction this agent initiated, open
    /// signing for both drafts and add this agent's signatures.
    ///
    /// # Errors
    /// Everything `ClaimIssuer::issue_pair` returns, plus `Authorization` if
    /// the session's agent is not the interaction's issuer.
    pub async fn issue_pair(&self, context: &InteractionContext) -> Result<ClaimPair, AccordError> {
        let pair = self.node.issuer.issue_pair(context, self.clock.now()).await?;
        if &pair.for_issuer.recipient != self.agent() {
            return Err(AccordError::Authorization(format!(
                "{} cannot issue claims for an interaction initiated by {}",
                self.agent(),
                pair.for_issuer.recipient
            )));
        }

        for draft in pair.drafts() {
            let hash = self.node.coordinator.propose(draft.clone()).await?;
            self.node
                .coordinator
                .sign(draft.id, self.agent(), self.session.sign(&hash), self.clock.now())
                .await?;
        }
        Ok(pair)
    }

    /// Sign both drafts of a pair issued by the other party. The hash is
    /// recomputed from the drafts as received, so a signature only verifies
    /// if the issuer proposed exactly this content.
    pub async fn countersign(&self, pair: &ClaimPair) -> Result<(), AccordError> {
        if &pair.for_counterparty.recipient != self.agent() {
            return Err(AccordError::Authorization(format!(
                "{} is not the counterparty of this claim pair",
                self.agent()
            )));
        }
        for draft in pair.drafts() {
            let hash = draft.signed_data_hash();
            self.node
                .coordinator
                .sign(draft.id, self.agent(), self.session.sign(&hash), self.clock.now())
                .await?;
        }
        Ok(())
    }

    /// Withdraw from an unfinished signing session.
    pub async fn cancel_signing(&self, claim_id: Uuid) -> Result<(), AccordError> {
        self.node.coordinator.cancel(claim_id, self.agent()).await
    }

    pub async fn signing_state(&self, claim_id: Uuid) -> Result<SigningState, AccordError> {
        self.node.coordinator.state(claim_id).await
    }

    pub fn signing_events(&self) -> broadcast::Receiver<SigningEvent> {
        self.node.coordinator.subscribe()
    }

    /// Take a fully signed claim out of the coordinator and append it to
    /// this agent's private log.
    ///
    /// # Errors
    /// - `Timeout` while signatures are outstanding (retryable).
    /// - `Authorization` if the claim belongs to another agent.
    pub async fn collect_claim(&self, claim_id: Uuid) -> Result<ParticipationClaim, AccordError> {
        let claim = self
            .node
            .coordinator
            .take_signed_claim(claim_id, self.agent())
            .await?;
        self.repository.record(&claim).await?;
        Ok(claim)
    }

    pub async fn get_my_claims(
        &self,
        filter: &ClaimFilter,
    ) -> Result<Vec<ParticipationClaim>, AccordError> {
        self.repository.get_my_claims(filter).await
    }

    pub async fn derive_reputation_summary(
        &self,
        period: &Period,
    ) -> Result<ReputationSummary, AccordError> {
        self.reputation
            .derive_summary(self.agent(), period, self.clock.now())
            .await
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    pub async fn start_round(
        &self,
        resource_id: Uuid,
        purpose: RoundPurpose,
        scheme: ValidationScheme,
        eligible_validators: BTreeSet<AgentId>,
    ) -> Result<Uuid, AccordError> {
        if purpose.declarant() != self.agent() {
            return Err(AccordError::Authorization(format!(
                "{} cannot open a round declared by {}",
                self.agent(),
                purpose.declarant()
            )));
        }
        self.node
            .governance
            .start_round(resource_id, purpose, scheme, eligible_validators, self.clock.now())
            .await
    }

    /// Open an end-of-life round declared by this agent.
    pub async fn declare_end_of_life(
        &self,
        resource_id: Uuid,
        disposal_recipient: Option<AgentId>,
        scheme: ValidationScheme,
        eligible_validators: BTreeSet<AgentId>,
    ) -> Result<Uuid, AccordError> {
        let purpose = RoundPurpose::EndOfLife {
            declarant: self.agent().clone(),
            disposal_recipient,
        };
        self.start_round(resource_id, purpose, scheme, eligible_validators)
            .await
    }

    pub async fn submit_vote(&self, round_id: Uuid, decision: VoteDecision) -> Result<(), AccordError> {
        self.node
            .governance
            .submit_vote(round_id, self.agent(), decision, self.clock.now())
            .await
    }

    pub async fn resolve(&self, round_id: Uuid) -> Result<RoundStatus, AccordError> {
        self.node.governance.resolve(round_id, self.clock.now()).await
    }

    pub async fn raise_challenge(
        &self,
        round_id: Uuid,
        reason: Option<String>,
    ) -> Result<RoundStatus, AccordError> {
        self.node
            .governance
            .raise_challenge(round_id, self.agent(), reason, self.clock.now())
            .await
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    pub async fn register_resource(&self, resource_id: Uuid) -> Result<Resource, AccordError> {
        self.node
            .lifecycle
            .register(resource_id, self.agent().clone(), self.clock.now())
            .await
    }

    pub async fn activate_resource(
        &self,
        resource_id: Uuid,
        evidence: &CreationEvidence,
    ) -> Result<Resource, AccordError> {
        self.node
            .lifecycle
            .activate(resource_id, evidence, self.agent(), self.clock.now())
            .await
    }

    pub async fn set_resource_state(
        &self,
        resource_id: Uuid,
        requested: ResourceState,
    ) -> Result<Resource, AccordError> {
        self.node
            .lifecycle
            .transition(resource_id, requested, self.agent(), self.clock.now())
            .await
    }

    pub async fn transfer_custody(&self, resource_id: Uuid, to: &AgentId) -> Result<Resource, AccordError> {
        self.node
            .lifecycle
            .transfer_custody(resource_id, self.agent(), to, self.clock.now())
            .await
    }

    pub async fn retire_resource(&self, resource_id: Uuid, round_id: Uuid) -> Result<Resource, AccordError> {
        self.node
            .lifecycle
            .retire(resource_id, round_id, self.agent(), self.clock.now())
            .await
    }
}
