// crates/accord-core/src/resource.rs
//
// Resources governed by the lifecycle state machine.
//
//   PendingValidation --> Active <--> Maintenance
//                           ^  \
//                           |   <--> Reserved
//                           v
//                        Retired (terminal, from Active or Maintenance)

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::AgentId;

/// Lifecycle state of a shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    /// Created, awaiting validation of the creation claim pair.
    PendingValidation,
    /// Available for use and custody transfer.
    Active,
    /// Under maintenance by its custodian.
    Maintenance,
    /// Reserved for a pending service or transfer.
    Reserved,
    /// Permanently retired after a finalized end-of-life round.
    Retired,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::PendingValidation => write!(f, "PendingValidation"),
            ResourceState::Active => write!(f, "Active"),
            ResourceState::Maintenance => write!(f, "Maintenance"),
            ResourceState::Reserved => write!(f, "Reserved"),
            ResourceState::Retired => write!(f, "Retired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub state: ResourceState,
    pub creator: AgentId,
    /// The agent currently responsible for the resource.
    pub custodian: AgentId,
    /// Every agent that has held custody, oldest first (includes the current one).
    pub custody_history: Vec<AgentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(id: Uuid, creator: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: ResourceState::PendingValidation,
            custodian: creator.clone(),
            custody_history: vec![creator.clone()],
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `agent` has ever held custody of this resource.
    pub fn was_custodian(&self, agent: &AgentId) -> bool {
        self.custody_history.iter().any(|a| a == agent)
    }
}

/// One entry of the public transition ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTransition {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub from: ResourceState,
    pub to: ResourceState,
    /// Agent that requested the transition.
    pub actor: AgentId,
    /// Validation round that authorized the transition, if any.
    pub round_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}
