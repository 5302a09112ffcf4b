//! # Key Management
//!
//! Ed25519 keypairs for the identities that matter in a fleet: the fleet
//! owner, the creation signers, and any operator tooling that signs vault
//! creation requests.
//!
//! Private keys never leave this module implicitly. [`Keypair`] does not
//! implement `Serialize`, its `Debug` output shows only the public half,
//! and exporting the secret is an explicit `secret_key_bytes()` call.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not valid hex")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignature,
}

/// An Ed25519 signing identity.
///
/// # Examples
///
/// ```
/// use pulsevault_protocol::crypto::keys::Keypair;
///
/// let kp = Keypair::generate();
/// let sig = kp.sign(b"authorize vault creation");
/// assert!(kp.public_key().verify(b"authorize vault creation", &sig));
/// ```
pub struct Keypair {
    signing_key: SigningKey,
}

/// The public half of a signing identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; 32],
}

/// A 64-byte Ed25519 signature.
///
/// Stored as `Vec<u8>` for serde; anything that is not exactly 64 bytes
/// simply fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Tests and fixtures only;
    /// a weak seed is a weak key.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a keypair from a hex-encoded 32-byte secret.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public key for this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign `message`. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Raw secret key material. Don't log it.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

impl PublicKey {
    /// Wrap raw bytes without point validation. Verification will fail
    /// later if the bytes are not a valid point.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Parse and validate a 32-byte slice as an Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify `signature` over `message`. A plain yes/no: callers here
    /// never need to know *why* a signature is bad.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(sig) = signature.to_dalek() else {
            return false;
        };
        verifying_key.verify(message, &sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn to_dalek(&self) -> Option<DalekSignature> {
        let arr: [u8; 64] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse a hex-encoded 64-byte signature.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|_| KeyError::InvalidSignature)?;
        if bytes.len() != 64 {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "Signature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"create vault");
        assert!(kp.public_key().verify(b"create vault", &sig));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"create vault");
        assert!(!kp.public_key().verify(b"create other vault", &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.public_key().verify(b"message", &sig));
    }

    #[test]
    fn hex_secret_roundtrip() {
        let kp = Keypair::generate();
        let restored = Keypair::from_hex(&hex::encode(kp.secret_key_bytes())).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn malformed_secret_rejected() {
        assert!(Keypair::from_hex("deadbeef").is_err());
        assert!(Keypair::from_hex("not hex").is_err());
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let pk = Keypair::generate().public_key();
        assert_eq!(PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
    }

    #[test]
    fn truncated_signature_fails_quietly() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"m");
        let truncated = Signature {
            bytes: sig.as_bytes()[..32].to_vec(),
        };
        assert!(!kp.public_key().verify(b"m", &truncated));
        assert!(Signature::from_hex(&hex::encode(&sig.as_bytes()[..32])).is_err());
    }

    #[test]
    fn seeded_keys_are_deterministic() {
        let a = Keypair::from_seed(&[9u8; 32]);
        let b = Keypair::from_seed(&[9u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let dbg = format!("{:?}", kp);
        assert!(dbg.starts_with("Keypair(pub="));
        assert!(!dbg.contains(&hex::encode([1u8; 32])));
    }
}
