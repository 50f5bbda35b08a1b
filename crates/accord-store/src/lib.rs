// crates/accord-store/src/lib.rs
//
// accord-store: Storage layer for Accord.
//
// Provides a RocksDB-backed store for private claim logs, the public
// governance and resource ledgers, and the identity/event records it mirrors
// locally, plus in-memory backends for tests and embedded use.

pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::{MemoryClaimStore, MemoryEventLedger, MemoryIdentityRegistry, MemoryLedger};
pub use rocks::RocksStore;
