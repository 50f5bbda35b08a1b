// crates/accord-node/src/main.rs
//
// `accord`: inspect a node's local RocksDB store.
//
// Lists the configured agent's claims, derives its reputation summary, and
// shows validation rounds and resources from the public ledgers. All output
// is JSON on stdout. Showing a round resolves it against the wall clock
// first, so an approved end-of-life round past its window reads Finalized.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use uuid::Uuid;

use accord_claims::ClaimFilter;
use accord_core::claim::{ClaimGroup, ClaimType};
use accord_core::clock::{Clock, SystemClock};
use accord_core::crypto::AgentKeypair;
use accord_core::identity::AgentId;
use accord_core::traits::GovernanceLedger;
use accord_node::config::NodeConfig;
use accord_node::logging::init_tracing;
use accord_node::{AccordNode, Participant, Session};
use accord_reputation::Period;

/// Accord CLI: read claims, reputation, rounds and resources from a node's store.
#[derive(Parser, Debug)]
#[command(name = "accord", version = "0.1.0", about = "Accord participant node tools")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.accord/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the local agent's claims.
    Claims {
        /// Claim type tag (e.g. custody_transfer) or group (e.g. custody).
        #[arg(long)]
        category: Option<String>,
    },
    /// Reputation summary over a trailing window.
    Summary {
        #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(i64).range(0..=36_500))]
        days: i64,
    },
    /// Show a validation round and its votes.
    Round { id: Uuid },
    /// Show a resource and its transition history.
    Resource { id: Uuid },
}

fn category_filter(category: Option<&str>) -> Result<ClaimFilter, Box<dyn std::error::Error>> {
    let mut filter = ClaimFilter::default();
    let Some(tag) = category else {
        return Ok(filter);
    };
    if let Some(claim_type) = ClaimType::from_tag(tag) {
        filter.claim_type = Some(claim_type);
    } else {
        let group: ClaimGroup = serde_json::from_value(json!(tag))
            .map_err(|_| format!("unknown claim category '{}'", tag))?;
        filter.group = Some(group);
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Could not load config from {}: {}. Using defaults.", cli.config, e);
            NodeConfig::default()
        }
    };
    init_tracing(&config.log_level);

    let node = AccordNode::open(&config)?;
    let clock = Arc::new(SystemClock);
    // Read-only commands: nothing is signed with this key.
    let session = Session::new(AgentId::new(config.agent_id.clone()), AgentKeypair::generate());
    let participant = Participant::new(session, node.clone(), clock.clone());

    let output = match &cli.command {
        Commands::Claims { category } => {
            let filter = category_filter(category.as_deref())?;
            serde_json::to_value(participant.get_my_claims(&filter).await?)?
        }
        Commands::Summary { days } => {
            let period = Period::last_days(*days, clock.now())?;
            serde_json::to_value(participant.derive_reputation_summary(&period).await?)?
        }
        Commands::Round { id } => {
            participant.resolve(*id).await?;
            let round = node.governance.round(*id).await?;
            let votes = node.stores.rounds.list_votes(id).await?;
            json!({ "round": round, "votes": votes })
        }
        Commands::Resource { id } => {
            let resource = node.lifecycle.get(id).await?;
            let transitions = node.lifecycle.history(id).await?;
            json!({ "resource": resource, "transitions": transitions })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
