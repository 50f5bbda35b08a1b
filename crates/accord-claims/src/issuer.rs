// crates/accord-claims/src/issuer.rs
//
// Claim issuer: turns one interaction into exactly two complementary claim
// drafts, one for each participating agent.
//
// Interaction -> (issuer-side claim, counterparty-side claim):
//   resource creation   -> (ResourceCreation, ResourceValidation)
//   custody transfer    -> (CustodyTransfer, CustodyAcceptance)
//   service commitment  -> (ServiceCommitmentAccepted, GoodFaithTransfer)
//   service fulfillment -> (ServiceFulfillmentCompleted, ResourceClaimVerified)
//   end of life         -> (EndOfLifeDeclaration, EndOfLifeValidation)
//   governance          -> same category on both sides

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use accord_core::claim::{ClaimContent, ClaimType};
use accord_core::economic::{ActionKind, InteractionContext};
use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::traits::EventLedger;

/// Interaction categories that produce participation claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    ResourceCreation,
    CustodyTransfer,
    ServiceCommitment,
    ServiceFulfillment,
    EndOfLife,
    /// Governance participation; carries the symmetric category.
    Governance(ClaimType),
}

impl InteractionKind {
    /// Map a ledger action to an interaction kind.
    ///
    /// # Errors
    /// `UnknownInteractionType` for bookkeeping actions that carry no claim.
    pub fn classify(action: ActionKind) -> Result<Self, AccordError> {
        match action {
            ActionKind::Produce => Ok(InteractionKind::ResourceCreation),
            ActionKind::TransferCustody => Ok(InteractionKind::CustodyTransfer),
            ActionKind::CommitService => Ok(InteractionKind::ServiceCommitment),
            ActionKind::FulfillService => Ok(InteractionKind::ServiceFulfillment),
            ActionKind::DeclareEndOfLife => Ok(InteractionKind::EndOfLife),
            ActionKind::ResolveDispute => Ok(InteractionKind::Governance(
                ClaimType::DisputeResolutionParticipation,
            )),
            ActionKind::ValidateActivity => {
                Ok(InteractionKind::Governance(ClaimType::ValidationActivity))
            }
            ActionKind::ComplyWithRule => Ok(InteractionKind::Governance(ClaimType::RuleCompliance)),
            ActionKind::Cite | ActionKind::Accept => Err(AccordError::UnknownInteractionType(
                format!("action '{}' has no participation claim mapping", action),
            )),
        }
    }

    /// (issuer-side, counterparty-side) claim categories.
    pub fn claim_types(&self) -> (ClaimType, ClaimType) {
        match self {
            InteractionKind::ResourceCreation => {
                (ClaimType::ResourceCreation, ClaimType::ResourceValidation)
            }
            InteractionKind::CustodyTransfer => {
                (ClaimType::CustodyTransfer, ClaimType::CustodyAcceptance)
            }
            InteractionKind::ServiceCommitment => {
                (ClaimType::ServiceCommitmentAccepted, ClaimType::GoodFaithTransfer)
            }
            InteractionKind::ServiceFulfillment => (
                ClaimType::ServiceFulfillmentCompleted,
                ClaimType::ResourceClaimVerified,
            ),
            InteractionKind::EndOfLife => {
                (ClaimType::EndOfLifeDeclaration, ClaimType::EndOfLifeValidation)
            }
            InteractionKind::Governance(claim_type) => (*claim_type, *claim_type),
        }
    }
}

/// The two unsigned drafts produced for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimPair {
    pub for_issuer: ClaimContent,
    pub for_counterparty: ClaimContent,
}

impl ClaimPair {
    pub fn drafts(&self) -> [&ClaimContent; 2] {
        [&self.for_issuer, &self.for_counterparty]
    }

    /// The draft whose recipient is `agent`, if any.
    pub fn draft_for(&self, agent: &AgentId) -> Option<&ClaimContent> {
        self.drafts().into_iter().find(|d| &d.recipient == agent)
    }
}

/// Produces claim pairs. Optionally cross-checks references against the
/// commitment/event ledger.
#[derive(Default)]
pub struct ClaimIssuer {
    ledger: Option<Arc<dyn EventLedger>>,
}

impl ClaimIssuer {
    pub fn new() -> Self {
        Self { ledger: None }
    }

    /// Require referenced commitments and events to exist on `ledger` and to
    /// involve exactly the two participating agents.
    pub fn with_event_ledger(mut self, ledger: Arc<dyn EventLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Issue the claim pair for an interaction.
    ///
    /// # Errors
    /// - `UnknownInteractionType` if the action kind has no mapping.
    /// - `MissingCounterparty` if either agent is absent.
    /// - `Validation` for self-interaction, out-of-range metrics, or ledger
    ///   references that do not match the interaction.
    pub async fn issue_pair(
        &self,
        context: &InteractionContext,
        now: DateTime<Utc>,
    ) -> Result<ClaimPair, AccordError> {
        let kind = InteractionKind::classify(context.action)?;

        let issuer = context.issuer.as_ref().ok_or_else(|| {
            AccordError::MissingCounterparty("interaction has no issuer agent".to_string())
        })?;
        let counterparty = context.counterparty.as_ref().ok_or_else(|| {
            AccordError::MissingCounterparty("interaction has no counterparty agent".to_string())
        })?;
        if issuer == counterparty {
            return Err(AccordError::Validation(format!(
                "issuer and counterparty are the same agent ({})",
                issuer
            )));
        }

        context.issuer_performance.validate()?;
        context.counterparty_performance.validate()?;

        if let Some(ledger) = &self.ledger {
            self.check_references(ledger.as_ref(), context, issuer, counterparty)
                .await?;
        }

        let (issuer_type, counterparty_type) = kind.claim_types();
        let draft = |recipient: &AgentId, other: &AgentId, claim_type, metrics| ClaimContent {
            id: Uuid::now_v7(),
            recipient: recipient.clone(),
            counterparty: other.clone(),
            claim_type,
            fulfills: context.commitment,
            fulfilled_by: context.event,
            claimed_at: now,
            performance_metrics: metrics,
            resource_ref: context.resource_ref,
            notes: context.notes.clone(),
        };

        let pair = ClaimPair {
            for_issuer: draft(
                issuer,
                counterparty,
                issuer_type,
                context.issuer_performance.clone(),
            ),
            for_counterparty: draft(
                counterparty,
                issuer,
                counterparty_type,
                context.counterparty_performance.clone(),
            ),
        };

        tracing::debug!(
            "Issued claim pair {} ({}) / {} ({}) for {} interaction",
            pair.for_issuer.id,
            issuer_type,
            pair.for_counterparty.id,
            counterparty_type,
            context.action
        );
        Ok(pair)
    }

    async fn check_references(
        &self,
        ledger: &dyn EventLedger,
        context: &InteractionContext,
        issuer: &AgentId,
        counterparty: &AgentId,
    ) -> Result<(), AccordError> {
        let same_parties = |a: &AgentId, b: &AgentId| {
            (a == issuer && b == counterparty) || (a == counterparty && b == issuer)
        };

        let commitment = ledger
            .get_commitment(&context.commitment)
            .await?
            .ok_or_else(|| {
                AccordError::Validation(format!(
                    "fulfills: commitment {} is not on the ledger",
                    context.commitment
                ))
            })?;
        if !same_parties(&commitment.provider, &commitment.receiver) {
            return Err(AccordError::Validation(format!(
                "fulfills: commitment {} is between {} and {}, not the interacting agents",
                commitment.id, commitment.provider, commitment.receiver
            )));
        }

        let event = ledger.get_event(&context.event).await?.ok_or_else(|| {
            AccordError::Validation(format!(
                "fulfilled_by: event {} is not on the ledger",
                context.event
            ))
        })?;
        if !same_parties(&event.provider, &event.receiver) {
            return Err(AccordError::Validation(format!(
                "fulfilled_by: event {} is between {} and {}, not the interacting agents",
                event.id, event.provider, event.receiver
            )));
        }
        if let (Some(expected), Some(actual)) = (context.resource_ref, event.resource_ref) {
            if expected != actual {
                return Err(AccordError::Validation(format!(
                    "resource_ref: event {} concerns resource {}, not {}",
                    event.id, actual, expected
                )));
            }
        }

        Ok(())
    }
}
