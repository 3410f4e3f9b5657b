//! Message Authentication Module
//!
//! Signs outgoing control-plane messages and verifies inbound ones using
//! the node's asymmetric identity keypair. A 64-byte ed25519 signature
//! travels on the wire split into its classical `r` and `s` halves.
//!
//! Signatures cover the serialized message envelope with the signature
//! field cleared, so the bytes that were signed are reproducible on the
//! receiving side.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Detached signature carried in the message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MsgSignature {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
}

/// The node's signing identity.
pub struct MessageAuthenticator {
    signing_key: SigningKey,
}

impl MessageAuthenticator {
    /// Generates a fresh identity keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuilds an identity from a stored 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Public identity bytes other parties verify against.
    pub fn public_id(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    /// Deterministic signature over the payload, split into `(r, s)`.
    pub fn sign(&self, payload: &[u8]) -> MsgSignature {
        let sig = self.signing_key.sign(payload).to_bytes();
        MsgSignature {
            r: sig[..32].to_vec(),
            s: sig[32..].to_vec(),
        }
    }

    /// Verifies a detached `(r, s)` signature against the sender's
    /// declared identity bytes. Malformed identities or signature halves
    /// simply fail verification.
    pub fn verify(signature: &MsgSignature, payload: &[u8], identity: &[u8]) -> bool {
        let Ok(identity_bytes) = <[u8; 32]>::try_from(identity) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&identity_bytes) else {
            return false;
        };

        if signature.r.len() != 32 || signature.s.len() != 32 {
            return false;
        }
        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&signature.r);
        sig_bytes[32..].copy_from_slice(&signature.s);

        let sig = Signature::from_bytes(&sig_bytes);
        verifying_key.verify(payload, &sig).is_ok()
    }
}
