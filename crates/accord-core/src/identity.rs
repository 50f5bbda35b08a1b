// crates/accord-core/src/identity.rs
//
// Agent identifiers and the public identity record resolved through the
// external identity provider.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque agent identifier (e.g. "did:accord:alice").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Capability level of an agent in the network, lowest first.
///
/// Ordering matters: governance policy compares levels with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityLevel {
    /// Can browse and take part in simple interactions.
    Member,
    /// Has completed validated interactions; may review and validate.
    Accountable,
    /// Long-standing custodian trusted with governance duties.
    PrimaryAccountable,
}

impl fmt::Display for CapabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityLevel::Member => write!(f, "member"),
            CapabilityLevel::Accountable => write!(f, "accountable"),
            CapabilityLevel::PrimaryAccountable => write!(f, "primary_accountable"),
        }
    }
}

/// Public identity of an agent, as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub id: AgentId,
    /// Ed25519 public key.
    pub public_key: [u8; 32],
    pub capability: CapabilityLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_ordering() {
        assert!(CapabilityLevel::Member < CapabilityLevel::Accountable);
        assert!(CapabilityLevel::Accountable < CapabilityLevel::PrimaryAccountable);
    }

    #[test]
    fn test_agent_id_serializes_as_plain_string() {
        let id = AgentId::new("did:accord:alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"did:accord:alice\"");
    }
}
