//! # Access Control
//!
//! The fleet owner and the set of creation signers. Pure state: no funds,
//! no business logic.
//!
//! Signer membership grants exactly one right, signing vault creation
//! requests. It never lets anyone move funds. The owner is privileged
//! whether or not it is also in the signer set.

use std::collections::BTreeSet;

use pulsevault_protocol::types::AccountId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AuthorizationError, ContractResult};

/// Owner plus signer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: AccountId,
    signers: BTreeSet<AccountId>,
}

impl AccessControl {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            signers: BTreeSet::new(),
        }
    }

    /// Construction-time seeding. After this, only the owner edits the set.
    pub fn with_signers(owner: AccountId, signers: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            owner,
            signers: signers.into_iter().collect(),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_owner(&self, who: &AccountId) -> bool {
        self.owner == *who
    }

    pub fn is_signer(&self, who: &AccountId) -> bool {
        self.signers.contains(who)
    }

    pub fn signers(&self) -> impl Iterator<Item = &AccountId> {
        self.signers.iter()
    }

    /// Fails with `OnlyFleetOwner` unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &AccountId) -> ContractResult<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(AuthorizationError::OnlyFleetOwner.into())
        }
    }

    pub fn change_owner(&mut self, caller: &AccountId, new_owner: AccountId) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        info!(from = %self.owner, to = %new_owner, "fleet ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    /// Adding a signer that is already present succeeds and changes nothing.
    pub fn add_signer(&mut self, caller: &AccountId, signer: AccountId) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        if self.signers.insert(signer) {
            info!(%signer, "signer added");
        }
        Ok(())
    }

    /// Deleting an absent signer succeeds and changes nothing.
    pub fn delete_signer(&mut self, caller: &AccountId, signer: &AccountId) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        if self.signers.remove(signer) {
            info!(%signer, "signer removed");
        }
        Ok(())
    }
}
