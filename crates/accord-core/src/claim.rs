// crates/accord-core/src/claim.rs
//
// Participation claims: private, bilaterally signed records of an agent's
// participation and performance in a single interaction.
//
// A claim is created once as a `ClaimContent` draft, signed by both parties
// through the signing protocol, and then frozen as a `ParticipationClaim`.
// Claims are never updated or deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AccordError;
use crate::identity::AgentId;

/// Closed set of claim categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClaimType {
    // Creation
    ResourceCreation,
    ResourceValidation,
    // Custody
    CustodyTransfer,
    CustodyAcceptance,
    // Service
    ServiceCommitmentAccepted,
    GoodFaithTransfer,
    ServiceFulfillmentCompleted,
    ResourceClaimVerified,
    // Governance
    DisputeResolutionParticipation,
    ValidationActivity,
    RuleCompliance,
    // End of life
    EndOfLifeDeclaration,
    EndOfLifeValidation,
}

/// Coarse grouping used by reputation summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimGroup {
    Creation,
    Custody,
    Service,
    Governance,
    EndOfLife,
}

impl ClaimType {
    pub const ALL: [ClaimType; 13] = [
        ClaimType::ResourceCreation,
        ClaimType::ResourceValidation,
        ClaimType::CustodyTransfer,
        ClaimType::CustodyAcceptance,
        ClaimType::ServiceCommitmentAccepted,
        ClaimType::GoodFaithTransfer,
        ClaimType::ServiceFulfillmentCompleted,
        ClaimType::ResourceClaimVerified,
        ClaimType::DisputeResolutionParticipation,
        ClaimType::ValidationActivity,
        ClaimType::RuleCompliance,
        ClaimType::EndOfLifeDeclaration,
        ClaimType::EndOfLifeValidation,
    ];

    pub fn group(&self) -> ClaimGroup {
        match self {
            ClaimType::ResourceCreation | ClaimType::ResourceValidation => ClaimGroup::Creation,
            ClaimType::CustodyTransfer | ClaimType::CustodyAcceptance => ClaimGroup::Custody,
            ClaimType::ServiceCommitmentAccepted
            | ClaimType::GoodFaithTransfer
            | ClaimType::ServiceFulfillmentCompleted
            | ClaimType::ResourceClaimVerified => ClaimGroup::Service,
            ClaimType::DisputeResolutionParticipation
            | ClaimType::ValidationActivity
            | ClaimType::RuleCompliance => ClaimGroup::Governance,
            ClaimType::EndOfLifeDeclaration | ClaimType::EndOfLifeValidation => {
                ClaimGroup::EndOfLife
            }
        }
    }

    /// Only resource creation needs an explicit validator-side claim next to
    /// the creator-side claim before the resource can become active.
    pub fn requires_validator_claim(&self) -> bool {
        matches!(self, ClaimType::ResourceCreation)
    }

    /// Stable tag used in hashes and storage keys.
    pub fn tag(&self) -> &'static str {
        match self {
            ClaimType::ResourceCreation => "resource_creation",
            ClaimType::ResourceValidation => "resource_validation",
            ClaimType::CustodyTransfer => "custody_transfer",
            ClaimType::CustodyAcceptance => "custody_acceptance",
            ClaimType::ServiceCommitmentAccepted => "service_commitment_accepted",
            ClaimType::GoodFaithTransfer => "good_faith_transfer",
            ClaimType::ServiceFulfillmentCompleted => "service_fulfillment_completed",
            ClaimType::ResourceClaimVerified => "resource_claim_verified",
            ClaimType::DisputeResolutionParticipation => "dispute_resolution_participation",
            ClaimType::ValidationActivity => "validation_activity",
            ClaimType::RuleCompliance => "rule_compliance",
            ClaimType::EndOfLifeDeclaration => "end_of_life_declaration",
            ClaimType::EndOfLifeValidation => "end_of_life_validation",
        }
    }

    /// Parse a tag produced by [`ClaimType::tag`].
    pub fn from_tag(tag: &str) -> Option<ClaimType> {
        ClaimType::ALL.iter().copied().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Five performance scores in [0.0, 1.0] plus optional notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub timeliness: f64,
    pub quality: f64,
    pub reliability: f64,
    pub communication: f64,
    pub overall_satisfaction: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PerformanceMetrics {
    /// Metrics with every score set to `score`.
    pub fn uniform(score: f64) -> Self {
        Self {
            timeliness: score,
            quality: score,
            reliability: score,
            communication: score,
            overall_satisfaction: score,
            notes: None,
        }
    }

    /// Named scores in declaration order.
    pub fn scores(&self) -> [(&'static str, f64); 5] {
        [
            ("timeliness", self.timeliness),
            ("quality", self.quality),
            ("reliability", self.reliability),
            ("communication", self.communication),
            ("overall_satisfaction", self.overall_satisfaction),
        ]
    }

    /// Reject non-finite or out-of-range scores, naming the offending field.
    pub fn validate(&self) -> Result<(), AccordError> {
        for (name, value) in self.scores() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(AccordError::Validation(format!(
                    "performance_metrics.{} must be within [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Signatures of both parties over `signed_data_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilateralSignature {
    pub recipient_signature: Vec<u8>,
    pub counterparty_signature: Vec<u8>,
    pub signed_data_hash: [u8; 32],
    pub signed_at: DateTime<Utc>,
}

/// The signable content of a claim: every field except the signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimContent {
    /// Unique identifier (UUID v7 for time-ordering).
    pub id: Uuid,
    /// The agent whose private log holds this claim.
    pub recipient: AgentId,
    /// The other agent in the interaction.
    pub counterparty: AgentId,
    pub claim_type: ClaimType,
    /// Commitment reference.
    pub fulfills: Uuid,
    /// Event reference.
    pub fulfilled_by: Uuid,
    pub claimed_at: DateTime<Utc>,
    pub performance_metrics: PerformanceMetrics,
    pub resource_ref: Option<Uuid>,
    pub notes: Option<String>,
}

impl ClaimContent {
    /// SHA-256 over the content fields in a fixed order.
    ///
    /// Variable-length fields are length-prefixed so that adjacent fields
    /// cannot be shifted into each other.
    pub fn signed_data_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        update_str(&mut hasher, self.recipient.as_str());
        update_str(&mut hasher, self.counterparty.as_str());
        update_str(&mut hasher, self.claim_type.tag());
        hasher.update(self.fulfills.as_bytes());
        hasher.update(self.fulfilled_by.as_bytes());
        update_str(&mut hasher, &self.claimed_at.to_rfc3339());

        for (_, value) in self.performance_metrics.scores() {
            hasher.update(value.to_le_bytes());
        }
        update_opt_str(&mut hasher, self.performance_metrics.notes.as_deref());

        match &self.resource_ref {
            Some(id) => {
                hasher.update([1u8]);
                hasher.update(id.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        update_opt_str(&mut hasher, self.notes.as_deref());

        let mut output = [0u8; 32];
        output.copy_from_slice(&hasher.finalize());
        output
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_opt_str(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            update_str(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}

/// A fully signed, immutable participation claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationClaim {
    #[serde(flatten)]
    pub content: ClaimContent,
    pub bilateral_signature: BilateralSignature,
}

impl ParticipationClaim {
    pub fn id(&self) -> Uuid {
        self.content.id
    }

    pub fn recipient(&self) -> &AgentId {
        &self.content.recipient
    }

    pub fn counterparty(&self) -> &AgentId {
        &self.content.counterparty
    }

    pub fn claim_type(&self) -> ClaimType {
        self.content.claim_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_content() -> ClaimContent {
        ClaimContent {
            id: Uuid::now_v7(),
            recipient: AgentId::new("did:accord:alice"),
            counterparty: AgentId::new("did:accord:bob"),
            claim_type: ClaimType::CustodyTransfer,
            fulfills: Uuid::now_v7(),
            fulfilled_by: Uuid::now_v7(),
            claimed_at: Utc::now(),
            performance_metrics: PerformanceMetrics::uniform(0.8),
            resource_ref: Some(Uuid::now_v7()),
            notes: None,
        }
    }

    #[test]
    fn test_every_type_has_a_group_and_roundtrips_its_tag() {
        for claim_type in ClaimType::ALL {
            let _ = claim_type.group();
            assert_eq!(ClaimType::from_tag(claim_type.tag()), Some(claim_type));
        }
        assert_eq!(ClaimType::from_tag("nonsense"), None);
    }

    #[test]
    fn test_only_resource_creation_requires_validator_claim() {
        let requiring: Vec<_> = ClaimType::ALL
            .iter()
            .filter(|t| t.requires_validator_claim())
            .collect();
        assert_eq!(requiring, vec![&ClaimType::ResourceCreation]);
    }

    #[test]
    fn test_metrics_out_of_range_names_field() {
        let mut metrics = PerformanceMetrics::uniform(0.5);
        metrics.reliability = 1.5;
        let err = metrics.validate().unwrap_err();
        assert!(err.to_string().contains("reliability"));

        metrics.reliability = f64::NAN;
        assert!(metrics.validate().is_err());
        assert!(PerformanceMetrics::uniform(1.0).validate().is_ok());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let content = make_content();
        let original = content.signed_data_hash();
        assert_eq!(original, content.clone().signed_data_hash());

        let mut tampered = content.clone();
        tampered.performance_metrics.quality = 0.1;
        assert_ne!(original, tampered.signed_data_hash());

        let mut swapped = content;
        std::mem::swap(&mut swapped.recipient, &mut swapped.counterparty);
        assert_ne!(original, swapped.signed_data_hash());
    }

    #[test]
    fn test_claim_serializes_flat() {
        let content = make_content();
        let claim = ParticipationClaim {
            bilateral_signature: BilateralSignature {
                recipient_signature: vec![1; 64],
                counterparty_signature: vec![2; 64],
                signed_data_hash: content.signed_data_hash(),
                signed_at: Utc::now(),
            },
            content,
        };
        let value = serde_json::to_value(&claim).unwrap();
        assert!(value.get("claim_type").is_some());
        assert!(value.get("bilateral_signature").is_some());

        let back: ParticipationClaim = serde_json::from_value(value).unwrap();
        assert_eq!(back, claim);
    }
}
