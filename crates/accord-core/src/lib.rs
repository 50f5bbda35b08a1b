// crates/accord-core/src/lib.rs
//
// accord-core: Core types, traits, and crypto primitives for Accord.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines participation claims, validation round records, resources,
// the error taxonomy, signing helpers, and the storage/collaborator traits.

pub mod claim;
pub mod clock;
pub mod crypto;
pub mod economic;
pub mod error;
pub mod identity;
pub mod resource;
pub mod traits;
pub mod validation;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use accord_core::ParticipationClaim;`

// Claim types
pub use claim::{
    BilateralSignature, ClaimContent, ClaimGroup, ClaimType, ParticipationClaim,
    PerformanceMetrics,
};

// Ledger types
pub use economic::{ActionKind, Commitment, EconomicEvent, InteractionContext};

// Identity types
pub use identity::{AgentId, AgentIdentity, CapabilityLevel};

// Resource types
pub use resource::{Resource, ResourceState, ResourceTransition};

// Governance types
pub use validation::{
    Challenge, RoundPurpose, RoundStatus, ValidationRound, ValidationScheme, Vote, VoteDecision,
};

// Time
pub use clock::{Clock, ManualClock, SystemClock};

// Error type
pub use error::AccordError;

// Traits
pub use traits::{ClaimStore, EventLedger, GovernanceLedger, IdentityProvider, ResourceStore};
