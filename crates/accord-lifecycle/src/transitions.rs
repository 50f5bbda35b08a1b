// crates/accord-lifecycle/src/transitions.rs
//
// Allowed resource state changes and what each one requires.
//
//   PendingValidation -> Active         creation claim pair
//   Active <-> Maintenance              custodian request
//   Active <-> Reserved                 custodian request
//   Active | Maintenance -> Retired     finalized end-of-life round

use accord_core::error::AccordError;
use accord_core::resource::ResourceState;

/// What a transition needs before it may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGate {
    CreationEvidence,
    CustodianRequest,
    FinalizedEndOfLife,
}

/// Look up the gate for `current -> requested`.
///
/// # Errors
/// `InvalidStateTransition` for any pair not in the table, including
/// self-transitions and anything leaving `Retired`.
pub fn check_transition(
    current: ResourceState,
    requested: ResourceState,
) -> Result<TransitionGate, AccordError> {
    use ResourceState::*;

    match (current, requested) {
        (PendingValidation, Active) => Ok(TransitionGate::CreationEvidence),
        (Active, Maintenance) | (Maintenance, Active) => Ok(TransitionGate::CustodianRequest),
        (Active, Reserved) | (Reserved, Active) => Ok(TransitionGate::CustodianRequest),
        (Active, Retired) | (Maintenance, Retired) => Ok(TransitionGate::FinalizedEndOfLife),
        _ => Err(AccordError::InvalidStateTransition { current, requested }),
    }
}
