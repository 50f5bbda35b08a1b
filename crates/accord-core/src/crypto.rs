// crates/accord-core/src/crypto.rs
//
// Ed25519 signing and SHA-256 hashing used by the bilateral signing protocol.
// Keys are supplied by the caller; this module never persists them.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::AccordError;

/// An agent's ed25519 keypair.
pub struct AgentKeypair {
    signing_key: SigningKey,
}

impl AgentKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a keypair from 32 secret key bytes supplied by the key holder.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Public key bytes (32 bytes).
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message and return the 64 signature bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for AgentKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKeypair")
            .field("public_key", &self.public_key_bytes())
            .finish_non_exhaustive()
    }
}

/// Verify an ed25519 signature.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify, and an
/// error when the key or signature bytes are malformed.
pub fn verify_signature(
    public_key_bytes: &[u8; 32],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<bool, AccordError> {
    let verifying_key = VerifyingKey::from_bytes(public_key_bytes)
        .map_err(|e| AccordError::Crypto(format!("Invalid public key: {}", e)))?;

    let signature_array: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| AccordError::Crypto("Signature must be exactly 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&signature_array);

    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Compute the SHA-256 hash of the given bytes.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&digest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = AgentKeypair::generate();
        let message = b"custody transfer";

        let signature = keypair.sign(message);
        let pubkey = keypair.public_key_bytes();

        assert!(verify_signature(&pubkey, message, &signature).unwrap());
        assert!(!verify_signature(&pubkey, b"other message", &signature).unwrap());
    }

    #[test]
    fn test_keypair_roundtrip_from_secret() {
        let secret = [7u8; 32];
        let a = AgentKeypair::from_secret_bytes(&secret);
        let b = AgentKeypair::from_secret_bytes(&secret);
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn test_short_signature_is_crypto_error() {
        let keypair = AgentKeypair::generate();
        let result = verify_signature(&keypair.public_key_bytes(), b"m", &[0u8; 10]);
        assert!(matches!(result, Err(AccordError::Crypto(_))));
    }

    #[test]
    fn test_hash_bytes_deterministic() {
        assert_eq!(hash_bytes(b"claim"), hash_bytes(b"claim"));
        assert_ne!(hash_bytes(b"claim"), hash_bytes(b"claims"));
    }
}
