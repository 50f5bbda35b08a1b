// crates/accord-node/src/node.rs
//
// AccordNode: the services shared by every participant on a node.
//
// Constructed once from a set of stores, then handed to each `Participant`.
// All fields are cheap `Arc` clones.

use std::sync::Arc;

use accord_claims::{ClaimIssuer, SignatureCoordinator};
use accord_core::error::AccordError;
use accord_core::traits::{ClaimStore, EventLedger, GovernanceLedger, IdentityProvider, ResourceStore};
use accord_governance::{GovernancePolicy, ValidationEngine};
use accord_lifecycle::ResourceLifecycle;
use accord_reputation::DecayFunction;
use accord_store::RocksStore;

use crate::config::NodeConfig;

/// The storage backends a node runs on.
#[derive(Clone)]
pub struct NodeStores {
    pub claims: Arc<dyn ClaimStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub rounds: Arc<dyn GovernanceLedger>,
    pub identities: Arc<dyn IdentityProvider>,
    /// When present, claim issuance cross-checks commitments and events.
    pub events: Option<Arc<dyn EventLedger>>,
}

impl NodeStores {
    /// Every backend served by one RocksDB instance.
    pub fn rocks(store: Arc<RocksStore>) -> Self {
        Self {
            claims: store.clone(),
            resources: store.clone(),
            rounds: store.clone(),
            identities: store.clone(),
            events: Some(store),
        }
    }
}

#[derive(Clone)]
pub struct AccordNode {
    pub stores: NodeStores,
    pub issuer: Arc<ClaimIssuer>,
    pub coordinator: Arc<SignatureCoordinator>,
    pub governance: Arc<ValidationEngine>,
    pub lifecycle: Arc<ResourceLifecycle>,
    pub decay: DecayFunction,
}

impl AccordNode {
    pub fn new(
        stores: NodeStores,
        policy: GovernancePolicy,
        decay: DecayFunction,
    ) -> Result<Self, AccordError> {
        let issuer = match &stores.events {
            Some(events) => ClaimIssuer::new().with_event_ledger(events.clone()),
            None => ClaimIssuer::new(),
        };
        let coordinator = SignatureCoordinator::new(stores.identities.clone());
        let governance = Arc::new(ValidationEngine::new(
            stores.rounds.clone(),
            stores.resources.clone(),
            stores.identities.clone(),
            policy,
        )?);
        let lifecycle = ResourceLifecycle::new(
            stores.resources.clone(),
            stores.identities.clone(),
            governance.clone(),
        );

        tracing::info!(
            "Accord node ready (challenge window {} days, end-of-life minimum {} validators)",
            governance.policy().challenge_window_days,
            governance.policy().min_end_of_life_validators
        );

        Ok(Self {
            stores,
            issuer: Arc::new(issuer),
            coordinator: Arc::new(coordinator),
            governance,
            lifecycle: Arc::new(lifecycle),
            decay,
        })
    }

    /// Open the RocksDB store under the configured data directory.
    pub fn open(config: &NodeConfig) -> Result<Self, AccordError> {
        let path = config.db_path();
        std::fs::create_dir_all(&path)
            .map_err(|e| AccordError::Storage(format!("Failed to create {}: {}", path, e)))?;
        let store = Arc::new(RocksStore::open(&path)?);
        tracing::info!("RocksStore opened at {}", path);
        Self::new(
            NodeStores::rocks(store),
            config.governance.clone(),
            config.reputation.decay(),
        )
    }
}
