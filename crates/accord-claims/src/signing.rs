// crates/accord-claims/src/signing.rs
//
// Bilateral signing protocol.
//
// Per claim:
//   Proposed --> PartiallySigned --> FullySigned
//       \              |
//        +-------------+--> Cancelled
//
// Each of the two expected signers (recipient and counterparty) signs the
// claim's `signed_data_hash`. Signatures are verified against the signer's
// public key as they arrive. There is no expiry: a partially signed claim
// stays that way until the missing party signs or someone cancels.
//
// A session's content is dropped once its recipient takes the finished
// claim or the session is cancelled. Only the final state is kept for the
// claim id, so late signatures and re-proposals are still refused.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use accord_core::claim::{BilateralSignature, ClaimContent, ParticipationClaim};
use accord_core::crypto;
use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::traits::IdentityProvider;

use crate::events::SigningEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    Proposed,
    PartiallySigned,
    FullySigned,
    Cancelled,
}

impl fmt::Display for SigningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningState::Proposed => write!(f, "Proposed"),
            SigningState::PartiallySigned => write!(f, "PartiallySigned"),
            SigningState::FullySigned => write!(f, "FullySigned"),
            SigningState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignerRole {
    Recipient,
    Counterparty,
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerRole::Recipient => write!(f, "recipient"),
            SignerRole::Counterparty => write!(f, "counterparty"),
        }
    }
}

#[derive(Debug, Clone)]
struct SigningSession {
    content: ClaimContent,
    signed_data_hash: [u8; 32],
    recipient_signature: Option<Vec<u8>>,
    counterparty_signature: Option<Vec<u8>>,
    state: SigningState,
    signed_at: Option<DateTime<Utc>>,
}

impl SigningSession {
    fn role_of(&self, signer: &AgentId) -> Option<SignerRole> {
        if signer == &self.content.recipient {
            Some(SignerRole::Recipient)
        } else if signer == &self.content.counterparty {
            Some(SignerRole::Counterparty)
        } else {
            None
        }
    }

    fn slot(&mut self, role: SignerRole) -> &mut Option<Vec<u8>> {
        match role {
            SignerRole::Recipient => &mut self.recipient_signature,
            SignerRole::Counterparty => &mut self.counterparty_signature,
        }
    }

    fn is_open(&self) -> bool {
        matches!(
            self.state,
            SigningState::Proposed | SigningState::PartiallySigned
        )
    }
}

#[derive(Default)]
struct Sessions {
    open: HashMap<Uuid, SigningSession>,
    /// Final state of sessions whose content has been released.
    closed: HashMap<Uuid, SigningState>,
}

impl Sessions {
    fn closed_error(claim_id: Uuid, state: SigningState, action: &str) -> AccordError {
        match state {
            SigningState::Cancelled => AccordError::State(format!(
                "claim {} was cancelled and {}",
                claim_id, action
            )),
            _ => AccordError::State(format!(
                "claim {} was already collected and {}",
                claim_id, action
            )),
        }
    }

    fn get_open(&self, claim_id: Uuid, action: &str) -> Result<&SigningSession, AccordError> {
        if let Some(session) = self.open.get(&claim_id) {
            return Ok(session);
        }
        match self.closed.get(&claim_id) {
            Some(state) => Err(Self::closed_error(claim_id, *state, action)),
            None => Err(not_found(claim_id)),
        }
    }

    fn get_open_mut(&mut self, claim_id: Uuid, action: &str) -> Result<&mut SigningSession, AccordError> {
        if let Some(state) = self.closed.get(&claim_id) {
            return Err(Self::closed_error(claim_id, *state, action));
        }
        self.open.get_mut(&claim_id).ok_or_else(|| not_found(claim_id))
    }

    fn release(&mut self, claim_id: Uuid, state: SigningState) -> Option<SigningSession> {
        self.closed.insert(claim_id, state);
        self.open.remove(&claim_id)
    }
}

fn not_found(claim_id: Uuid) -> AccordError {
    AccordError::NotFound(format!("signing session for claim {}", claim_id))
}

/// Coordinates signature collection for claim drafts.
///
/// Every call returns immediately with the current state. Completion is
/// observed by polling [`SignatureCoordinator::state`] or by subscribing to
/// [`SigningEvent`]s.
pub struct SignatureCoordinator {
    identities: Arc<dyn IdentityProvider>,
    sessions: RwLock<Sessions>,
    events: broadcast::Sender<SigningEvent>,
}

impl SignatureCoordinator {
    pub fn new(identities: Arc<dyn IdentityProvider>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            identities,
            sessions: RwLock::new(Sessions::default()),
            events,
        }
    }

    /// Subscribe to signing progress notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SigningEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SigningEvent) {
        // No subscribers is fine: polling remains available.
        let _ = self.events.send(event);
    }

    /// Register a claim draft for signing and return its `signed_data_hash`.
    ///
    /// # Errors
    /// - `Validation` if the draft is malformed (self-claim, bad metrics).
    /// - `State` if a draft with the same id was already proposed.
    pub async fn propose(&self, content: ClaimContent) -> Result<[u8; 32], AccordError> {
        if content.recipient == content.counterparty {
            return Err(AccordError::Validation(format!(
                "claim {}: recipient and counterparty are the same agent",
                content.id
            )));
        }
        content.performance_metrics.validate()?;

        let claim_id = content.id;
        let signed_data_hash = content.signed_data_hash();

        {
            let mut sessions = self.sessions.write().await;
            if sessions.open.contains_key(&claim_id) || sessions.closed.contains_key(&claim_id) {
                return Err(AccordError::State(format!(
                    "claim {} has already been proposed",
                    claim_id
                )));
            }
            sessions.open.insert(
                claim_id,
                SigningSession {
                    content,
                    signed_data_hash,
                    recipient_signature: None,
                    counterparty_signature: None,
                    state: SigningState::Proposed,
                    signed_at: None,
                },
            );
        }

        tracing::debug!("Proposed claim {} for signing", claim_id);
        self.publish(SigningEvent::Proposed {
            claim_id,
            signed_data_hash,
        });
        Ok(signed_data_hash)
    }

    /// Add a signature from one of the two expected signers.
    ///
    /// # Errors
    /// - `NotFound` if the claim was never proposed.
    /// - `Authorization` if `signer` is neither recipient nor counterparty, or
    ///   has no registered identity.
    /// - `Integrity` if the signature does not verify over `signed_data_hash`.
    /// - `State` if the signer already signed or signing is closed.
    pub async fn sign(
        &self,
        claim_id: Uuid,
        signer: &AgentId,
        signature: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<SigningState, AccordError> {
        // Look up what we need, then verify without holding the lock.
        let (role, signed_data_hash) = {
            let sessions = self.sessions.read().await;
            let session = sessions.get_open(claim_id, "accepts no further signatures")?;
            let role = session.role_of(signer).ok_or_else(|| {
                AccordError::Authorization(format!(
                    "{} is neither recipient nor counterparty of claim {}",
                    signer, claim_id
                ))
            })?;
            (role, session.signed_data_hash)
        };

        let identity = self.identities.resolve(signer).await?.ok_or_else(|| {
            AccordError::Authorization(format!("no identity registered for signer {}", signer))
        })?;
        if !crypto::verify_signature(&identity.public_key, &signed_data_hash, &signature)? {
            tracing::warn!("Rejected {} signature from {} on claim {}", role, signer, claim_id);
            return Err(AccordError::Integrity(format!(
                "{} signature from {} does not verify for claim {}",
                role, signer, claim_id
            )));
        }

        let state = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_open_mut(claim_id, "accepts no further signatures")?;
            if !session.is_open() {
                return Err(AccordError::State(format!(
                    "claim {} is {} and accepts no further signatures",
                    claim_id, session.state
                )));
            }
            let slot = session.slot(role);
            if slot.is_some() {
                return Err(AccordError::State(format!(
                    "{} {} has already signed claim {}",
                    role, signer, claim_id
                )));
            }
            *slot = Some(signature);

            session.state = if session.recipient_signature.is_some()
                && session.counterparty_signature.is_some()
            {
                session.signed_at = Some(now);
                SigningState::FullySigned
            } else {
                SigningState::PartiallySigned
            };
            session.state
        };

        self.publish(SigningEvent::SignatureAdded {
            claim_id,
            signer: signer.clone(),
        });
        if state == SigningState::FullySigned {
            tracing::info!("Claim {} fully signed", claim_id);
            self.publish(SigningEvent::FullySigned { claim_id });
        }
        Ok(state)
    }

    /// Abandon signing. Only the recipient or counterparty may cancel, and only
    /// while signatures are still outstanding.
    pub async fn cancel(&self, claim_id: Uuid, requester: &AgentId) -> Result<(), AccordError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_open_mut(claim_id, "can no longer be cancelled")?;
            if session.role_of(requester).is_none() {
                return Err(AccordError::Authorization(format!(
                    "{} may not cancel claim {}: not a party to it",
                    requester, claim_id
                )));
            }
            if !session.is_open() {
                return Err(AccordError::State(format!(
                    "claim {} is {} and can no longer be cancelled",
                    claim_id, session.state
                )));
            }
            sessions.release(claim_id, SigningState::Cancelled);
        }

        tracing::info!("Claim {} signing cancelled by {}", claim_id, requester);
        self.publish(SigningEvent::Cancelled {
            claim_id,
            by: requester.clone(),
        });
        Ok(())
    }

    /// Current signing state of a claim.
    pub async fn state(&self, claim_id: Uuid) -> Result<SigningState, AccordError> {
        let sessions = self.sessions.read().await;
        match sessions.open.get(&claim_id) {
            Some(session) => Ok(session.state),
            None => sessions
                .closed
                .get(&claim_id)
                .copied()
                .ok_or_else(|| not_found(claim_id)),
        }
    }

    /// Number of sessions still holding claim content.
    pub async fn open_sessions(&self) -> usize {
        self.sessions.read().await.open.len()
    }

    /// Hand the finished claim to its recipient and release the session.
    ///
    /// # Errors
    /// - `NotFound` if the claim was never proposed.
    /// - `Authorization` if `requester` is not the claim's recipient.
    /// - `Timeout` (retryable) while a signature is still outstanding.
    /// - `State` if signing was cancelled or the claim was already taken.
    pub async fn take_signed_claim(
        &self,
        claim_id: Uuid,
        requester: &AgentId,
    ) -> Result<ParticipationClaim, AccordError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_open(claim_id, "cannot be taken")?;
        if requester != &session.content.recipient {
            return Err(AccordError::Authorization(format!(
                "claim {} belongs to {}, not {}",
                claim_id, session.content.recipient, requester
            )));
        }

        let claim = match (
            session.state,
            &session.recipient_signature,
            &session.counterparty_signature,
            session.signed_at,
        ) {
            (SigningState::FullySigned, Some(recipient), Some(counterparty), Some(signed_at)) => {
                ParticipationClaim {
                    content: session.content.clone(),
                    bilateral_signature: BilateralSignature {
                        recipient_signature: recipient.clone(),
                        counterparty_signature: counterparty.clone(),
                        signed_data_hash: session.signed_data_hash,
                        signed_at,
                    },
                }
            }
            (state, recipient, counterparty, _) => {
                let missing = match (recipient.is_some(), counterparty.is_some()) {
                    (false, false) => "recipient and counterparty",
                    (false, true) => "recipient",
                    _ => "counterparty",
                };
                return Err(AccordError::Timeout(format!(
                    "claim {} is {}: awaiting {} signature",
                    claim_id, state, missing
                )));
            }
        };

        sessions.release(claim_id, SigningState::FullySigned);
        tracing::debug!("Claim {} taken by {}", claim_id, requester);
        Ok(claim)
    }

    /// Recompute the hash of a finished claim and verify both signatures.
    pub async fn validate_signature(&self, claim: &ParticipationClaim) -> Result<(), AccordError> {
        validate_signature(self.identities.as_ref(), claim).await
    }
}

/// Verify that a claim's hash matches its content and that both signatures
/// verify against the signers' registered public keys.
///
/// # Errors
/// `Integrity` on any mismatch, naming the failing part.
pub async fn validate_signature(
    identities: &dyn IdentityProvider,
    claim: &ParticipationClaim,
) -> Result<(), AccordError> {
    let signature = &claim.bilateral_signature;
    let recomputed = claim.content.signed_data_hash();
    if recomputed != signature.signed_data_hash {
        return Err(AccordError::Integrity(format!(
            "claim {}: signed_data_hash does not match claim content",
            claim.id()
        )));
    }

    let parties = [
        (
            SignerRole::Recipient,
            claim.recipient(),
            &signature.recipient_signature,
        ),
        (
            SignerRole::Counterparty,
            claim.counterparty(),
            &signature.counterparty_signature,
        ),
    ];
    for (role, agent, sig) in parties {
        let identity = identities.resolve(agent).await?.ok_or_else(|| {
            AccordError::Integrity(format!(
                "claim {}: no public key known for {} {}",
                claim.id(),
                role,
                agent
            ))
        })?;
        // Malformed signature bytes count as a mismatch, not a crypto fault.
        let valid = crypto::verify_signature(&identity.public_key, &recomputed, sig)
            .unwrap_or(false);
        if !valid {
            return Err(AccordError::Integrity(format!(
                "claim {}: {} signature of {} does not verify",
                claim.id(),
                role,
                agent
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use accord_core::claim::{ClaimType, PerformanceMetrics};
    use accord_core::crypto::AgentKeypair;
    use accord_core::identity::{AgentIdentity, CapabilityLevel};
    use accord_store::MemoryIdentityRegistry;

    struct Fixture {
        coordinator: SignatureCoordinator,
        alice: (AgentId, AgentKeypair),
        bob: (AgentId, AgentKeypair),
        mallory: (AgentId, AgentKeypair),
    }

    async fn fixture() -> Fixture {
        let registry = Arc::new(MemoryIdentityRegistry::new());
        let mut agents = Vec::new();
        for name in ["alice", "bob", "mallory"] {
            let id = AgentId::new(format!("did:accord:{}", name));
            let keys = AgentKeypair::generate();
            registry
                .register(AgentIdentity {
                    id: id.clone(),
                    public_key: keys.public_key_bytes(),
                    capability: CapabilityLevel::Accountable,
                })
                .await;
            agents.push((id, keys));
        }
        let mallory = agents.pop().unwrap();
        let bob = agents.pop().unwrap();
        let alice = agents.pop().unwrap();
        Fixture {
            coordinator: SignatureCoordinator::new(registry),
            alice,
            bob,
            mallory,
        }
    }

    fn draft(recipient: &AgentId, counterparty: &AgentId) -> ClaimContent {
        ClaimContent {
            id: Uuid::now_v7(),
            recipient: recipient.clone(),
            counterparty: counterparty.clone(),
            claim_type: ClaimType::CustodyAcceptance,
            fulfills: Uuid::now_v7(),
            fulfilled_by: Uuid::now_v7(),
            claimed_at: Utc::now(),
            performance_metrics: PerformanceMetrics::uniform(0.75),
            resource_ref: Some(Uuid::now_v7()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_full_signing_flow() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let mut events = f.coordinator.subscribe();

        let hash = f.coordinator.propose(content).await.unwrap();
        assert_eq!(f.coordinator.state(claim_id).await.unwrap(), SigningState::Proposed);

        let state = f
            .coordinator
            .sign(claim_id, &f.bob.0, f.bob.1.sign(&hash), Utc::now())
            .await
            .unwrap();
        assert_eq!(state, SigningState::PartiallySigned);
        assert!(matches!(
            f.coordinator.take_signed_claim(claim_id, &f.alice.0).await,
            Err(AccordError::Timeout(_))
        ));

        let state = f
            .coordinator
            .sign(claim_id, &f.alice.0, f.alice.1.sign(&hash), Utc::now())
            .await
            .unwrap();
        assert_eq!(state, SigningState::FullySigned);

        let claim = f.coordinator.take_signed_claim(claim_id, &f.alice.0).await.unwrap();
        f.coordinator.validate_signature(&claim).await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), SigningEvent::Proposed { .. }));
        assert!(matches!(events.recv().await.unwrap(), SigningEvent::SignatureAdded { .. }));
        assert!(matches!(events.recv().await.unwrap(), SigningEvent::SignatureAdded { .. }));
        assert_eq!(events.recv().await.unwrap(), SigningEvent::FullySigned { claim_id });
    }

    #[tokio::test]
    async fn test_unexpected_signer_is_unauthorized() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let hash = f.coordinator.propose(content).await.unwrap();

        let result = f
            .coordinator
            .sign(claim_id, &f.mallory.0, f.mallory.1.sign(&hash), Utc::now())
            .await;
        assert!(matches!(result, Err(AccordError::Authorization(_))));
        assert_eq!(f.coordinator.state(claim_id).await.unwrap(), SigningState::Proposed);
    }

    #[tokio::test]
    async fn test_forged_signature_is_integrity_error() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let hash = f.coordinator.propose(content).await.unwrap();

        // Mallory's key signing on Bob's behalf.
        let result = f
            .coordinator
            .sign(claim_id, &f.bob.0, f.mallory.1.sign(&hash), Utc::now())
            .await;
        assert!(matches!(result, Err(AccordError::Integrity(_))));
        assert_eq!(f.coordinator.state(claim_id).await.unwrap(), SigningState::Proposed);
    }

    #[tokio::test]
    async fn test_double_sign_and_duplicate_proposal_rejected() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let hash = f.coordinator.propose(content.clone()).await.unwrap();
        assert!(matches!(
            f.coordinator.propose(content).await,
            Err(AccordError::State(_))
        ));

        f.coordinator
            .sign(claim_id, &f.alice.0, f.alice.1.sign(&hash), Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            f.coordinator
                .sign(claim_id, &f.alice.0, f.alice.1.sign(&hash), Utc::now())
                .await,
            Err(AccordError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_blocks_further_signing() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let hash = f.coordinator.propose(content).await.unwrap();

        f.coordinator
            .sign(claim_id, &f.alice.0, f.alice.1.sign(&hash), Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            f.coordinator.cancel(claim_id, &f.mallory.0).await,
            Err(AccordError::Authorization(_))
        ));
        f.coordinator.cancel(claim_id, &f.bob.0).await.unwrap();
        assert_eq!(f.coordinator.state(claim_id).await.unwrap(), SigningState::Cancelled);

        assert!(matches!(
            f.coordinator
                .sign(claim_id, &f.bob.0, f.bob.1.sign(&hash), Utc::now())
                .await,
            Err(AccordError::State(_))
        ));
        assert!(matches!(
            f.coordinator.cancel(claim_id, &f.alice.0).await,
            Err(AccordError::State(_))
        ));
        assert!(matches!(
            f.coordinator.take_signed_claim(claim_id, &f.alice.0).await,
            Err(AccordError::State(_))
        ));
        assert_eq!(f.coordinator.open_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_tampered_claim_fails_validation() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let hash = f.coordinator.propose(content).await.unwrap();
        for (id, keys) in [&f.alice, &f.bob] {
            f.coordinator
                .sign(claim_id, id, keys.sign(&hash), Utc::now())
                .await
                .unwrap();
        }
        let claim = f.coordinator.take_signed_claim(claim_id, &f.alice.0).await.unwrap();

        let mut altered_hash = claim.clone();
        altered_hash.bilateral_signature.signed_data_hash[0] ^= 0xff;
        assert!(matches!(
            f.coordinator.validate_signature(&altered_hash).await,
            Err(AccordError::Integrity(_))
        ));

        let mut altered_content = claim.clone();
        altered_content.content.performance_metrics.quality = 1.0;
        assert!(matches!(
            f.coordinator.validate_signature(&altered_content).await,
            Err(AccordError::Integrity(_))
        ));

        let mut swapped = claim;
        let sig = &mut swapped.bilateral_signature;
        std::mem::swap(&mut sig.recipient_signature, &mut sig.counterparty_signature);
        assert!(matches!(
            f.coordinator.validate_signature(&swapped).await,
            Err(AccordError::Integrity(_))
        ));
    }

    #[tokio::test]
    async fn test_only_recipient_takes_claim_and_session_is_released() {
        let f = fixture().await;
        let content = draft(&f.alice.0, &f.bob.0);
        let claim_id = content.id;
        let hash = f.coordinator.propose(content.clone()).await.unwrap();
        for (id, keys) in [&f.alice, &f.bob] {
            f.coordinator
                .sign(claim_id, id, keys.sign(&hash), Utc::now())
                .await
                .unwrap();
        }
        assert_eq!(f.coordinator.open_sessions().await, 1);

        for outsider in [&f.bob.0, &f.mallory.0] {
            assert!(matches!(
                f.coordinator.take_signed_claim(claim_id, outsider).await,
                Err(AccordError::Authorization(_))
            ));
        }

        let claim = f.coordinator.take_signed_claim(claim_id, &f.alice.0).await.unwrap();
        assert_eq!(claim.id(), claim_id);
        assert_eq!(f.coordinator.open_sessions().await, 0);
        assert_eq!(f.coordinator.state(claim_id).await.unwrap(), SigningState::FullySigned);

        assert!(matches!(
            f.coordinator.take_signed_claim(claim_id, &f.alice.0).await,
            Err(AccordError::State(_))
        ));
        assert!(matches!(
            f.coordinator.propose(content).await,
            Err(AccordError::State(_))
        ));
        assert!(matches!(
            f.coordinator.cancel(claim_id, &f.bob.0).await,
            Err(AccordError::State(_))
        ));
        assert!(matches!(
            f.coordinator.take_signed_claim(Uuid::now_v7(), &f.alice.0).await,
            Err(AccordError::NotFound(_))
        ));
    }
}
