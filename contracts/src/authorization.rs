//! # Creation Authorization
//!
//! The only gate on vault creation. A request names a vault and a nonce,
//! and a fleet signer signs the creation digest of that pair. We accept it
//! iff the signature verifies, its key belongs to a current signer, and the
//! pair has never created a vault before.
//!
//! Checking and consuming are separate steps. The manager checks first,
//! builds the vault, and only then consumes the pair, so a request that is
//! rejected later (bad shares, bad lock) leaves its nonce usable.

use std::collections::BTreeSet;

use pulsevault_protocol::crypto::hash::creation_digest;
use pulsevault_protocol::crypto::signatures::CreationSignature;
use pulsevault_protocol::types::AccountId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::access_control::AccessControl;
use crate::error::{AuthorizationError, ContractResult};

/// Record of consumed creation digests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationScheme {
    consumed: BTreeSet<[u8; 32]>,
}

impl AuthorizationScheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, name: &str, nonce: u64) -> bool {
        self.consumed.contains(&creation_digest(name, nonce))
    }

    /// Verify a creation request. Returns the signer's account.
    ///
    /// Replay is checked first, so a reused request fails the same way no
    /// matter who signed it.
    pub fn check(
        &self,
        access: &AccessControl,
        name: &str,
        nonce: u64,
        signature: &CreationSignature,
    ) -> ContractResult<AccountId> {
        if self.is_consumed(name, nonce) {
            warn!(name, nonce, "replayed creation request");
            return Err(AuthorizationError::NonceConsumed {
                name: name.to_string(),
                nonce,
            }
            .into());
        }

        let signer = signature.recover(name, nonce).map_err(|_| {
            warn!(name, nonce, "creation signature failed verification");
            AuthorizationError::InvalidSignature
        })?;

        if !access.is_signer(&signer) {
            warn!(name, nonce, %signer, "creation signed by a non-signer");
            return Err(AuthorizationError::UnknownSigner(signer).into());
        }

        Ok(signer)
    }

    /// Mark `(name, nonce)` as used. Permanent.
    pub fn consume(&mut self, name: &str, nonce: u64) {
        self.consumed.insert(creation_digest(name, nonce));
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.len()
    }
}
