// crates/accord-core/src/economic.rs
//
// Commitments, economic events, and the interaction context that the claim
// issuer turns into a pair of participation claims.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::PerformanceMetrics;
use crate::identity::AgentId;

/// Closed set of actions recorded on the commitment/event ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A new resource is brought into the network.
    Produce,
    /// Custody of a resource passes from one agent to another.
    TransferCustody,
    /// A service (maintenance, storage, transport) is promised.
    CommitService,
    /// A previously committed service is delivered.
    FulfillService,
    /// A resource is declared at end of life.
    DeclareEndOfLife,
    /// Participation in resolving a dispute.
    ResolveDispute,
    /// Participation in a validation round.
    ValidateActivity,
    /// Attestation of compliance with a governance rule.
    ComplyWithRule,
    /// Reference to a resource without using it. Ledger bookkeeping only.
    Cite,
    /// Acceptance of a resource into a process. Ledger bookkeeping only.
    Accept,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Produce => "produce",
            ActionKind::TransferCustody => "transfer_custody",
            ActionKind::CommitService => "commit_service",
            ActionKind::FulfillService => "fulfill_service",
            ActionKind::DeclareEndOfLife => "declare_end_of_life",
            ActionKind::ResolveDispute => "resolve_dispute",
            ActionKind::ValidateActivity => "validate_activity",
            ActionKind::ComplyWithRule => "comply_with_rule",
            ActionKind::Cite => "cite",
            ActionKind::Accept => "accept",
        };
        f.write_str(name)
    }
}

/// A recorded promise by `provider` to perform `action` for `receiver`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: Uuid,
    pub provider: AgentId,
    pub receiver: AgentId,
    pub action: ActionKind,
    pub resource_ref: Option<Uuid>,
    pub due: Option<DateTime<Utc>>,
    pub fulfilled: bool,
}

/// A recorded occurrence of an economic action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicEvent {
    pub id: Uuid,
    pub action: ActionKind,
    pub provider: AgentId,
    pub receiver: AgentId,
    pub resource_ref: Option<Uuid>,
    pub quantity: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Everything the claim issuer needs to produce a claim pair.
///
/// Agents are optional so that an incomplete context coming from an external
/// collaborator can be rejected with `MissingCounterparty` instead of panicking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionContext {
    pub action: ActionKind,
    /// The agent initiating the interaction (receives the issuer-side claim).
    pub issuer: Option<AgentId>,
    /// The other participating agent (receives the counterparty-side claim).
    pub counterparty: Option<AgentId>,
    /// Commitment being fulfilled.
    pub commitment: Uuid,
    /// Event that fulfilled it.
    pub event: Uuid,
    pub resource_ref: Option<Uuid>,
    /// Performance of the issuer in this interaction.
    pub issuer_performance: PerformanceMetrics,
    /// Performance of the counterparty in this interaction.
    pub counterparty_performance: PerformanceMetrics,
    pub notes: Option<String>,
}
