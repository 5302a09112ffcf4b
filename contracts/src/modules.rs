//! # Vault Modules
//!
//! Stateless logic units that operate on a vault's record. The registry
//! binds each operation selector of a version to one module; the manager
//! hands the module a [`CallContext`] holding a draft of the vault state.
//!
//! A module may only:
//!
//! - mutate the draft it was given, and
//! - push [`Effect`]s describing value to move.
//!
//! It never touches the ledger or a pool directly. That keeps re-entrancy
//! out of reach: by the time any value moves, the vault's new state is
//! already committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulsevault_protocol::types::{AccountId, Selector, TokenId};

use crate::billing::BillingPeriod;
use crate::call::{Effect, VaultCall};
use crate::error::{ContractResult, RoutingError, ValidationError};
use crate::fleet::FleetConfig;
use crate::ledger::ValueLedger;
use crate::registry::ModuleRegistry;
use crate::succession::VaultState;

/// Everything a module can see while executing one call.
pub struct CallContext<'a> {
    pub caller: AccountId,
    pub now: DateTime<Utc>,
    /// Draft of the vault's state. Committed only if the call succeeds.
    pub vault: &'a mut VaultState,
    pub fleet: &'a FleetConfig,
    pub registry: &'a ModuleRegistry,
    ledger: &'a ValueLedger,
    effects: Vec<Effect>,
}

impl<'a> CallContext<'a> {
    pub fn new(
        caller: AccountId,
        now: DateTime<Utc>,
        vault: &'a mut VaultState,
        fleet: &'a FleetConfig,
        registry: &'a ModuleRegistry,
        ledger: &'a ValueLedger,
    ) -> Self {
        Self {
            caller,
            now,
            vault,
            fleet,
            registry,
            ledger,
            effects: Vec::new(),
        }
    }

    /// The vault's current holding of `token`.
    pub fn balance(&self, token: &TokenId) -> u64 {
        self.ledger.balance_of(&self.vault.id(), token)
    }

    pub fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Queue an outbound transfer from the vault.
    pub fn pay(&mut self, to: AccountId, token: TokenId, amount: u64) {
        let from = self.vault.id();
        self.emit(Effect::Transfer {
            from,
            to,
            token,
            amount,
        });
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

/// A unit of vault logic.
pub trait VaultModule: Send + Sync {
    /// Stable name. The module's address is derived from it.
    fn name(&self) -> &'static str;

    /// Every selector this module can execute.
    fn selectors(&self) -> Vec<Selector>;

    fn execute(&self, ctx: &mut CallContext<'_>, call: &VaultCall) -> ContractResult<()>;
}

fn unsupported(module: &'static str, call: &VaultCall) -> ContractResult<()> {
    Err(RoutingError::UnsupportedCall {
        module,
        selector: call.selector(),
    }
    .into())
}

// ---------------------------------------------------------------------------
// BaseModule
// ---------------------------------------------------------------------------

/// Succession, configuration, transfers, billing, ownership and upgrades.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseModule;

impl BaseModule {
    pub const NAME: &'static str = "base-module";

    const OPERATIONS: [&'static str; 15] = [
        "pulse",
        "withdraw",
        "withdrawToken",
        "updateLock",
        "updateHeirs",
        "updateDistributions",
        "updateOrAddTokenDistributions",
        "removeTokenDistributions",
        "transfer",
        "transferMultiple",
        "changeOwner",
        "setVersion",
        "payMonthlyFee",
        "payYearlyFee",
        "exit",
    ];

    fn withdraw(ctx: &mut CallContext<'_>, token: &TokenId) -> ContractResult<()> {
        let balance = ctx.balance(token);
        let caller = ctx.caller;
        let payout = ctx.vault.claim(&caller, token, ctx.now, balance)?;
        if payout > 0 {
            ctx.pay(caller, token.clone(), payout);
        }
        Ok(())
    }

    fn pay_fee(ctx: &mut CallContext<'_>, token: &TokenId, period: BillingPeriod) -> ContractResult<()> {
        ctx.vault.ensure_owner(&ctx.caller)?;
        let fee = ctx.fleet.fees.quote(token, period)?;
        ctx.vault.extend_paid_until(period.extension_secs())?;
        let treasury = ctx.fleet.treasury;
        ctx.pay(treasury, token.clone(), fee);
        Ok(())
    }

    fn transfer_multiple(
        ctx: &mut CallContext<'_>,
        recipients: &[AccountId],
        tokens: &[TokenId],
        amounts: &[u64],
    ) -> ContractResult<()> {
        ctx.vault.ensure_owner(&ctx.caller)?;
        for (what, len) in [("tokens", tokens.len()), ("amounts", amounts.len())] {
            if len != recipients.len() {
                return Err(ValidationError::LengthMismatch {
                    what,
                    expected: recipients.len(),
                    actual: len,
                }
                .into());
            }
        }
        for ((to, token), amount) in recipients.iter().zip(tokens).zip(amounts) {
            ctx.pay(*to, token.clone(), *amount);
        }
        Ok(())
    }

    fn exit(ctx: &mut CallContext<'_>, to: AccountId, tokens: &[TokenId]) -> ContractResult<()> {
        ctx.vault.ensure_owner(&ctx.caller)?;
        for token in tokens {
            let balance = ctx.balance(token);
            if balance > 0 {
                ctx.pay(to, token.clone(), balance);
            }
        }
        Ok(())
    }
}

impl VaultModule for BaseModule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn selectors(&self) -> Vec<Selector> {
        Self::OPERATIONS.iter().map(|op| Selector::of(op)).collect()
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &VaultCall) -> ContractResult<()> {
        let caller = ctx.caller;
        match call {
            VaultCall::Pulse => ctx.vault.pulse(&caller, ctx.now),
            VaultCall::Withdraw => Self::withdraw(ctx, &TokenId::Native),
            VaultCall::WithdrawToken { token } => Self::withdraw(ctx, token),
            VaultCall::UpdateLock { lock_secs } => ctx.vault.update_lock(&caller, *lock_secs),
            VaultCall::UpdateHeirs {
                beneficiaries,
                tokens,
                shares,
            } => ctx
                .vault
                .update_heirs(&caller, beneficiaries.clone(), tokens, shares),
            VaultCall::UpdateDistributions { tokens, shares } => {
                ctx.vault.update_distributions(&caller, tokens, shares)
            }
            VaultCall::UpdateOrAddTokenDistributions { tokens, shares } => ctx
                .vault
                .update_or_add_token_distributions(&caller, tokens, shares),
            VaultCall::RemoveTokenDistributions {
                tokens,
                registered_tokens,
            } => ctx
                .vault
                .remove_token_distributions(&caller, tokens, registered_tokens),
            VaultCall::Transfer { to, token, amount } => {
                ctx.vault.ensure_owner(&caller)?;
                ctx.pay(*to, token.clone(), *amount);
                Ok(())
            }
            VaultCall::TransferMultiple {
                recipients,
                tokens,
                amounts,
            } => Self::transfer_multiple(ctx, recipients, tokens, amounts),
            VaultCall::ChangeOwner { new_owner } => ctx.vault.change_owner(&caller, *new_owner),
            VaultCall::SetVersion { version } => {
                ctx.vault.ensure_owner(&caller)?;
                if !ctx.registry.has_version(version) {
                    return Err(ValidationError::UnknownVersion(version.clone()).into());
                }
                ctx.vault.set_version(&caller, version.clone())
            }
            VaultCall::PayMonthlyFee { token } => Self::pay_fee(ctx, token, BillingPeriod::Monthly),
            VaultCall::PayYearlyFee { token } => Self::pay_fee(ctx, token, BillingPeriod::Yearly),
            VaultCall::Exit { to, tokens } => Self::exit(ctx, *to, tokens),
            VaultCall::Supply { .. } | VaultCall::RedeemAll { .. } | VaultCall::Redeem { .. } => {
                unsupported(Self::NAME, call)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// YieldModule
// ---------------------------------------------------------------------------

/// The owner-only bridge to external interest-bearing pools.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldModule;

impl YieldModule {
    pub const NAME: &'static str = "yield-module";

    const OPERATIONS: [&'static str; 3] = ["supply", "redeemAll", "redeem"];
}

impl VaultModule for YieldModule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn selectors(&self) -> Vec<Selector> {
        Self::OPERATIONS.iter().map(|op| Selector::of(op)).collect()
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &VaultCall) -> ContractResult<()> {
        let holder = ctx.vault.id();
        let effect = match call {
            VaultCall::Supply { pool, amount } => Effect::Supply {
                pool: *pool,
                holder,
                amount: *amount,
            },
            VaultCall::RedeemAll { pool } => Effect::RedeemAll {
                pool: *pool,
                holder,
            },
            VaultCall::Redeem {
                pool,
                amount,
                share_units,
            } => Effect::Redeem {
                pool: *pool,
                holder,
                amount: *amount,
                share_units: *share_units,
            },
            _ => return unsupported(Self::NAME, call),
        };
        ctx.vault.ensure_owner(&ctx.caller)?;
        ctx.emit(effect);
        Ok(())
    }
}

/// The modules a fresh fleet registers under its genesis version.
pub fn builtin_modules() -> Vec<Arc<dyn VaultModule>> {
    vec![Arc::new(BaseModule), Arc::new(YieldModule)]
}
