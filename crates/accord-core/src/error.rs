// crates/accord-core/src/error.rs

use thiserror::Error;

use crate::resource::ResourceState;

/// Protocol-wide error types for Accord.
///
/// The first group mirrors the protocol taxonomy (validation, authorization,
/// state, timeout, integrity). The remaining variants cover infrastructure.
#[derive(Debug, Error)]
pub enum AccordError {
    /// Malformed claim, metrics out of range, or an insufficient validator pool.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ineligible or self-interested validator or signer.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Operation not allowed in the current state (e.g. vote on a closed round).
    #[error("State error: {0}")]
    State(String),

    /// A resource lifecycle transition that the state machine does not allow.
    #[error("Invalid state transition: {current} -> {requested}")]
    InvalidStateTransition {
        current: ResourceState,
        requested: ResourceState,
    },

    /// Non-fatal: the operation is waiting on another party and may be retried.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Signature or hash mismatch.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The interaction's action kind has no claim mapping.
    #[error("Unknown interaction type: {0}")]
    UnknownInteractionType(String),

    /// One of the two participating agents is absent from the interaction.
    #[error("Missing counterparty: {0}")]
    MissingCounterparty(String),

    /// Storage layer error (RocksDB, in-memory backends).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cryptographic error (malformed keys or signatures).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Referenced record not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration or policy value.
    #[error("Config error: {0}")]
    Config(String),
}

impl AccordError {
    /// Whether the caller may retry the same operation later.
    ///
    /// Only timeout-class conditions are recoverable; authorization and
    /// integrity failures must never be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccordError::Timeout(_))
    }
}

impl From<serde_json::Error> for AccordError {
    fn from(e: serde_json::Error) -> Self {
        AccordError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for AccordError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        AccordError::Crypto(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeout_is_retryable() {
        assert!(AccordError::Timeout("awaiting counterparty".into()).is_retryable());
        assert!(!AccordError::Integrity("hash mismatch".into()).is_retryable());
        assert!(!AccordError::Authorization("not eligible".into()).is_retryable());
    }

    #[test]
    fn test_transition_error_names_both_states() {
        let err = AccordError::InvalidStateTransition {
            current: ResourceState::Active,
            requested: ResourceState::Retired,
        };
        assert_eq!(err.to_string(), "Invalid state transition: Active -> Retired");
    }
}
