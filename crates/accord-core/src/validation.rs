// crates/accord-core/src/validation.rs
//
// Validation round records shared through the public governance ledger.
//
//   Pending --> Approved --(window elapsed)--> Finalized
//      |           |
//      v           v
//   Rejected   UnderReview --(manual)--> Finalized | Rejected
//
// Creation rounds stop at Approved; only end-of-life rounds open a
// challenge window.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::AgentId;

/// Consensus scheme for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationScheme {
    /// At least `k` approvals out of `n` validators.
    KOfN { k: usize, n: usize },
    /// Strict majority of the eligible set.
    SimpleMajority,
}

impl fmt::Display for ValidationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationScheme::KOfN { k, n } => write!(f, "{}_of_{}", k, n),
            ValidationScheme::SimpleMajority => write!(f, "simple_majority"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundStatus {
    Pending,
    Approved,
    Rejected,
    /// A challenge was raised during the challenge window.
    UnderReview,
    /// The challenge window elapsed without challenge; the decision is executable.
    Finalized,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Pending => write!(f, "Pending"),
            RoundStatus::Approved => write!(f, "Approved"),
            RoundStatus::Rejected => write!(f, "Rejected"),
            RoundStatus::UnderReview => write!(f, "UnderReview"),
            RoundStatus::Finalized => write!(f, "Finalized"),
        }
    }
}

/// What a round decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPurpose {
    /// Approval of a newly created resource.
    ResourceCreation { creator: AgentId },
    /// Permanent retirement of a resource.
    EndOfLife {
        declarant: AgentId,
        /// Agent slated to receive the disposed resource, if any.
        disposal_recipient: Option<AgentId>,
    },
}

impl RoundPurpose {
    /// The agent whose declaration the round decides on.
    pub fn declarant(&self) -> &AgentId {
        match self {
            RoundPurpose::ResourceCreation { creator } => creator,
            RoundPurpose::EndOfLife { declarant, .. } => declarant,
        }
    }

    /// Whether `agent` has a stake in the outcome and may not validate it.
    pub fn is_conflicted(&self, agent: &AgentId) -> bool {
        match self {
            RoundPurpose::ResourceCreation { creator } => creator == agent,
            RoundPurpose::EndOfLife {
                declarant,
                disposal_recipient,
            } => declarant == agent || disposal_recipient.as_ref() == Some(agent),
        }
    }

    pub fn is_end_of_life(&self) -> bool {
        matches!(self, RoundPurpose::EndOfLife { .. })
    }
}

/// A single validator's vote, stored under its own (round, validator) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub round_id: Uuid,
    pub validator: AgentId,
    pub decision: VoteDecision,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenger: AgentId,
    pub raised_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRound {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub purpose: RoundPurpose,
    pub scheme: ValidationScheme,
    pub eligible_validators: BTreeSet<AgentId>,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
    /// Set when an end-of-life round is approved.
    pub challenge_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    /// Vote set frozen at the moment the round left `Pending`.
    #[serde(default)]
    pub closed_votes: Option<BTreeMap<AgentId, VoteDecision>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl ValidationRound {
    /// Votes are accepted only while the round is pending.
    pub fn accepts_votes(&self) -> bool {
        self.status == RoundStatus::Pending
    }

    /// Finalized and Rejected rounds never change again.
    pub fn is_immutable(&self) -> bool {
        matches!(self.status, RoundStatus::Finalized | RoundStatus::Rejected)
    }
}
