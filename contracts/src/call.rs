//! # Vault Calls
//!
//! The operation surface of a vault, as data. Every call has a stable name
//! and a [`Selector`] derived from it; the registry routes on the selector.
//!
//! Modules never move value themselves. They push [`Effect`]s, and the
//! manager settles those after the vault's new state is committed.

use chrono::{DateTime, Utc};
use pulsevault_protocol::types::{AccountId, ModuleVersion, Selector, TokenId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One operation against a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum VaultCall {
    Pulse,
    /// Claim the native-value share.
    Withdraw,
    WithdrawToken {
        token: TokenId,
    },
    UpdateLock {
        lock_secs: u64,
    },
    UpdateHeirs {
        beneficiaries: Vec<AccountId>,
        tokens: Vec<TokenId>,
        shares: Vec<u16>,
    },
    UpdateDistributions {
        tokens: Vec<TokenId>,
        shares: Vec<u16>,
    },
    UpdateOrAddTokenDistributions {
        tokens: Vec<TokenId>,
        shares: Vec<u16>,
    },
    RemoveTokenDistributions {
        tokens: Vec<TokenId>,
        registered_tokens: Vec<TokenId>,
    },
    Transfer {
        to: AccountId,
        token: TokenId,
        amount: u64,
    },
    TransferMultiple {
        recipients: Vec<AccountId>,
        tokens: Vec<TokenId>,
        amounts: Vec<u64>,
    },
    ChangeOwner {
        new_owner: AccountId,
    },
    SetVersion {
        version: ModuleVersion,
    },
    PayMonthlyFee {
        token: TokenId,
    },
    PayYearlyFee {
        token: TokenId,
    },
    Supply {
        pool: AccountId,
        amount: u64,
    },
    RedeemAll {
        pool: AccountId,
    },
    /// `share_units` picks how `amount` is read: pool shares, or a target
    /// underlying amount.
    Redeem {
        pool: AccountId,
        amount: u64,
        share_units: bool,
    },
    /// Sweep the full balance of each token to `to`.
    Exit {
        to: AccountId,
        tokens: Vec<TokenId>,
    },
}

impl VaultCall {
    /// The operation name the selector is derived from.
    pub fn name(&self) -> &'static str {
        match self {
            VaultCall::Pulse => "pulse",
            VaultCall::Withdraw => "withdraw",
            VaultCall::WithdrawToken { .. } => "withdrawToken",
            VaultCall::UpdateLock { .. } => "updateLock",
            VaultCall::UpdateHeirs { .. } => "updateHeirs",
            VaultCall::UpdateDistributions { .. } => "updateDistributions",
            VaultCall::UpdateOrAddTokenDistributions { .. } => "updateOrAddTokenDistributions",
            VaultCall::RemoveTokenDistributions { .. } => "removeTokenDistributions",
            VaultCall::Transfer { .. } => "transfer",
            VaultCall::TransferMultiple { .. } => "transferMultiple",
            VaultCall::ChangeOwner { .. } => "changeOwner",
            VaultCall::SetVersion { .. } => "setVersion",
            VaultCall::PayMonthlyFee { .. } => "payMonthlyFee",
            VaultCall::PayYearlyFee { .. } => "payYearlyFee",
            VaultCall::Supply { .. } => "supply",
            VaultCall::RedeemAll { .. } => "redeemAll",
            VaultCall::Redeem { .. } => "redeem",
            VaultCall::Exit { .. } => "exit",
        }
    }

    pub fn selector(&self) -> Selector {
        Selector::of(self.name())
    }
}

/// A value movement requested by a module, settled by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Transfer {
        from: AccountId,
        to: AccountId,
        token: TokenId,
        amount: u64,
    },
    Supply {
        pool: AccountId,
        holder: AccountId,
        amount: u64,
    },
    RedeemAll {
        pool: AccountId,
        holder: AccountId,
    },
    Redeem {
        pool: AccountId,
        holder: AccountId,
        amount: u64,
        share_units: bool,
    },
}

impl Effect {
    pub fn touches_pool(&self) -> bool {
        !matches!(self, Effect::Transfer { .. })
    }
}

/// What a successful call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub vault: AccountId,
    pub caller: AccountId,
    pub operation: String,
    pub effects: Vec<Effect>,
    pub executed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_follow_names() {
        assert_eq!(VaultCall::Pulse.selector(), Selector::of("pulse"));
        assert_eq!(
            VaultCall::WithdrawToken {
                token: TokenId::Native
            }
            .selector(),
            Selector::of("withdrawToken")
        );
    }

    #[test]
    fn calls_serialize_with_op_tag() {
        let call = VaultCall::UpdateLock { lock_secs: 99 };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["op"], "update_lock");
        assert_eq!(json["lock_secs"], 99);
        let back: VaultCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);
    }

    #[test]
    fn only_transfers_stay_off_pools() {
        let a = AccountId::named("a");
        assert!(!Effect::Transfer {
            from: a,
            to: a,
            token: TokenId::Native,
            amount: 1
        }
        .touches_pool());
        assert!(Effect::RedeemAll { pool: a, holder: a }.touches_pool());
    }
}
