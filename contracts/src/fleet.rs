//! # Fleet Configuration
//!
//! Everything fleet-wide and mutable lives in one value: who owns the
//! fleet, who may sign creations, which fee tokens are accepted, how long
//! the free grace period is, and where fees are collected. The manager
//! owns it; modules see it read-only through their call context.

use pulsevault_protocol::config::{DEFAULT_GRACE_PERIOD_SECS, TREASURY_ID_DOMAIN};
use pulsevault_protocol::types::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

use crate::access_control::AccessControl;
use crate::billing::FeeSchedule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Fleet owner and creation signers.
    pub access: AccessControl,
    /// Accepted fee tokens and prices.
    pub fees: FeeSchedule,
    /// Free upkeep granted to every new vault, in seconds.
    pub grace_period_secs: u64,
    /// The account fees are paid into. Also the spender payers approve.
    pub treasury: AccountId,
}

impl FleetConfig {
    /// A fleet with no signers, no fee tokens and the default grace period.
    /// The treasury account is derived from the owner.
    pub fn new(owner: AccountId) -> Self {
        Self {
            access: AccessControl::new(owner),
            fees: FeeSchedule::new(),
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            treasury: AccountId::derive(TREASURY_ID_DOMAIN, &[owner.as_bytes()]),
        }
    }

    pub fn with_signer(self, signer: AccountId) -> Self {
        let signers: Vec<AccountId> = self
            .access
            .signers()
            .copied()
            .chain(std::iter::once(signer))
            .collect();
        Self {
            access: AccessControl::with_signers(self.access.owner(), signers),
            ..self
        }
    }

    pub fn with_fee(mut self, token: TokenId, monthly: u64, yearly: u64) -> Self {
        self.fees.allow_token(token, monthly, yearly);
        self
    }

    pub fn with_grace_period(mut self, secs: u64) -> Self {
        self.grace_period_secs = secs;
        self
    }

    pub fn with_treasury(mut self, treasury: AccountId) -> Self {
        self.treasury = treasury;
        self
    }

    pub fn owner(&self) -> AccountId {
        self.access.owner()
    }
}
