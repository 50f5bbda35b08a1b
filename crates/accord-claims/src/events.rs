// crates/accord-claims/src/events.rs
//
// Signing events broadcast by the SignatureCoordinator.
//
// Signing may wait indefinitely on a counterparty, so callers subscribe to
// these events instead of blocking on completion.

use uuid::Uuid;

use accord_core::identity::AgentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningEvent {
    /// A claim draft was registered and awaits signatures.
    Proposed { claim_id: Uuid, signed_data_hash: [u8; 32] },
    /// One of the two expected signers signed.
    SignatureAdded { claim_id: Uuid, signer: AgentId },
    /// Both signatures are present and verified.
    FullySigned { claim_id: Uuid },
    /// Signing was abandoned by one of the parties.
    Cancelled { claim_id: Uuid, by: AgentId },
}

impl SigningEvent {
    pub fn claim_id(&self) -> Uuid {
        match self {
            SigningEvent::Proposed { claim_id, .. }
            | SigningEvent::SignatureAdded { claim_id, .. }
            | SigningEvent::FullySigned { claim_id }
            | SigningEvent::Cancelled { claim_id, .. } => *claim_id,
        }
    }
}
