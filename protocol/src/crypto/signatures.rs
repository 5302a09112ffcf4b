//! # Creation Signatures
//!
//! A vault can only be created with a signature from a fleet signer over
//! the creation digest `(name, nonce)`. This module produces and checks
//! those signatures.
//!
//! ## Recovery
//!
//! Ed25519 has no public-key recovery: given a message and a signature you
//! cannot compute who signed it. So a [`CreationSignature`] travels with the
//! signer's public key attached, and [`CreationSignature::recover`] returns
//! the signer's account only if the signature actually verifies under that
//! key. Whether that account is a *current* signer is the authorization
//! layer's decision, not ours.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::creation_digest;
use super::keys::{Keypair, PublicKey, Signature};
use crate::types::AccountId;

/// Errors during signature checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,
}

/// A signed authorization to create the vault `name` with nonce `nonce`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationSignature {
    /// The key that claims to have signed.
    pub signer: PublicKey,
    /// Ed25519 signature over [`creation_digest`].
    pub signature: Signature,
}

impl CreationSignature {
    /// Recover the signing account, checking the signature over the
    /// creation digest of `(name, nonce)`.
    pub fn recover(&self, name: &str, nonce: u64) -> Result<AccountId, SignatureError> {
        let digest = creation_digest(name, nonce);
        if self.signer.verify(&digest, &self.signature) {
            Ok(AccountId::from_public_key(&self.signer))
        } else {
            Err(SignatureError::VerificationFailed)
        }
    }
}

/// Sign a creation request for `(name, nonce)`.
///
/// # Example
///
/// ```
/// use pulsevault_protocol::crypto::{sign_creation, Keypair};
/// use pulsevault_protocol::types::AccountId;
///
/// let signer = Keypair::generate();
/// let sig = sign_creation(&signer, "family-vault", 1);
/// let who = sig.recover("family-vault", 1).unwrap();
/// assert_eq!(who, AccountId::from_public_key(&signer.public_key()));
/// ```
pub fn sign_creation(keypair: &Keypair, name: &str, nonce: u64) -> CreationSignature {
    CreationSignature {
        signer: keypair.public_key(),
        signature: keypair.sign(&creation_digest(name, nonce)),
    }
}
