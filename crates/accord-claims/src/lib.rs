// crates/accord-claims/src/lib.rs
//
// accord-claims: Participation claim issuance and bilateral signing.
//
// An interaction produces a pair of claim drafts (issuer.rs), each draft is
// signed by both agents through the signing protocol (signing.rs), and the
// finished claim is appended to its recipient's private log (repository.rs).
// Signing progress is published on a broadcast channel (events.rs).

pub mod events;
pub mod issuer;
pub mod repository;
pub mod signing;

pub use events::SigningEvent;
pub use issuer::{ClaimIssuer, ClaimPair, InteractionKind};
pub use repository::{ClaimFilter, ClaimRepository};
pub use signing::{validate_signature, SignatureCoordinator, SigningState};
