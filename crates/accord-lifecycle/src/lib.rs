// crates/accord-lifecycle/src/lib.rs
//
// accord-lifecycle: The resource state machine.
//
// transitions.rs holds the pure table of allowed state changes; machine.rs
// enforces it against stored resources, creation evidence, and finalized
// end-of-life rounds, and appends every accepted change to the public ledger.

pub mod machine;
pub mod transitions;

pub use machine::{CreationEvidence, ResourceLifecycle};
pub use transitions::{check_transition, TransitionGate};
