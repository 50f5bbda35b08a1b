// crates/accord-node/src/lib.rs
//
// accord-node: Wires the Accord crates into a runnable node.
//
// `AccordNode` holds the shared services (stores, signing coordinator,
// validation engine, lifecycle). A `Participant` is one agent's view of
// a node, bound to that agent's session and a clock.

pub mod config;
pub mod logging;
pub mod node;
pub mod participant;

pub use config::{NodeConfig, ReputationConfig};
pub use node::{AccordNode, NodeStores};
pub use participant::{Participant, Session};
