// crates/accord-governance/src/lib.rs
//
// accord-governance: Validation Scheme Engine for Accord.
//
// Decisions that cannot rest on a single agent's word (approving a new
// resource, retiring one for good) go through a validation round: a fixed
// pool of eligible validators votes, the outcome is recomputed from the full
// vote set, and end-of-life approvals wait out a challenge window before they
// become executable.

pub mod engine;
pub mod policy;
pub mod scheme;

pub use engine::ValidationEngine;
pub use policy::GovernancePolicy;
pub use scheme::{decide, tally, Outcome, Tally};
