//! # Yield Adapters
//!
//! The bridge between a vault and an external interest-bearing pool. The
//! vault never computes interest. It hands underlying to a pool, holds
//! pool shares, and later trades shares back for underlying at whatever
//! exchange rate the pool quotes.
//!
//! [`YieldPool`] is the pool's contract as the vault sees it.
//! [`InterestPool`] is a compact implementation with a monotonically
//! growing exchange rate, enough for tests and simulation.
//!
//! ## Rounding
//!
//! Share balances are queried on demand, never cached on the vault side.
//! Rounding is the pool's business:
//!
//! - `supply` mints `floor(amount / rate)` shares.
//! - `redeem_shares` pays `floor(shares * rate)`.
//! - `redeem_underlying` burns `ceil(amount / rate)` shares and pays
//!   exactly `amount`.
//!
//! Every path rounds in the pool's favour, so the pool can always cover
//! what it owes.

use std::collections::BTreeMap;

use pulsevault_protocol::config::{BASIS_POINTS_TOTAL, EXCHANGE_RATE_SCALE, POOL_ID_DOMAIN};
use pulsevault_protocol::types::{AccountId, TokenId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ContractResult, ValidationError};
use crate::ledger::ValueLedger;

/// The supply/redeem/balance contract of an external pool.
pub trait YieldPool: Send + Sync {
    /// The pool's account on the ledger. It custodies supplied underlying.
    fn id(&self) -> AccountId;

    /// The asset this pool accepts and pays out.
    fn underlying(&self) -> &TokenId;

    /// Move `amount` underlying from `holder` into the pool. Returns shares minted.
    fn supply(&mut self, ledger: &mut ValueLedger, holder: AccountId, amount: u64)
        -> ContractResult<u64>;

    /// Burn `shares` and pay the underlying they are worth. Returns underlying paid.
    fn redeem_shares(
        &mut self,
        ledger: &mut ValueLedger,
        holder: AccountId,
        shares: u64,
    ) -> ContractResult<u64>;

    /// Pay exactly `amount` underlying, burning whatever shares that costs.
    /// Returns shares burned.
    fn redeem_underlying(
        &mut self,
        ledger: &mut ValueLedger,
        holder: AccountId,
        amount: u64,
    ) -> ContractResult<u64>;

    fn share_balance(&self, holder: &AccountId) -> u64;

    /// Underlying the holder's shares are worth right now.
    fn underlying_balance(&self, holder: &AccountId) -> u64;

    /// Let time pass for the pool: grow every share's value by `rate_bps`.
    /// The pool funds the growth itself.
    fn accrue_interest(&mut self, ledger: &mut ValueLedger, rate_bps: u32) -> ContractResult<()>;

    /// Redeem the holder's entire share balance. Returns underlying paid.
    fn redeem_all(&mut self, ledger: &mut ValueLedger, holder: AccountId) -> ContractResult<u64> {
        let held = self.share_balance(&holder);
        if held == 0 {
            return Ok(0);
        }
        self.redeem_shares(ledger, holder, held)
    }
}

// ---------------------------------------------------------------------------
// InterestPool
// ---------------------------------------------------------------------------

/// A pool whose exchange rate (underlying per share, scaled by
/// [`EXCHANGE_RATE_SCALE`]) only goes up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestPool {
    id: AccountId,
    underlying: TokenId,
    exchange_rate: u128,
    shares: BTreeMap<AccountId, u64>,
    total_shares: u64,
}

impl InterestPool {
    /// A fresh pool at a 1:1 exchange rate.
    pub fn new(label: &str, underlying: TokenId) -> Self {
        Self {
            id: AccountId::derive(POOL_ID_DOMAIN, &[label.as_bytes()]),
            underlying,
            exchange_rate: EXCHANGE_RATE_SCALE,
            shares: BTreeMap::new(),
            total_shares: 0,
        }
    }

    /// Start at a non-unit exchange rate. A zero rate is treated as 1:1.
    pub fn with_exchange_rate(mut self, rate: u128) -> Self {
        self.exchange_rate = if rate == 0 { EXCHANGE_RATE_SCALE } else { rate };
        self
    }

    pub fn exchange_rate(&self) -> u128 {
        self.exchange_rate
    }

    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    fn shares_to_underlying(&self, shares: u64) -> ContractResult<u64> {
        let value = (shares as u128)
            .checked_mul(self.exchange_rate)
            .ok_or(ValidationError::AmountOverflow)?
            / EXCHANGE_RATE_SCALE;
        u64::try_from(value).map_err(|_| ValidationError::AmountOverflow.into())
    }

    fn underlying_to_shares(&self, amount: u64, round_up: bool) -> ContractResult<u64> {
        let scaled = (amount as u128)
            .checked_mul(EXCHANGE_RATE_SCALE)
            .ok_or(ValidationError::AmountOverflow)?;
        let mut shares = scaled / self.exchange_rate;
        if round_up && scaled % self.exchange_rate != 0 {
            shares += 1;
        }
        u64::try_from(shares).map_err(|_| ValidationError::AmountOverflow.into())
    }

    fn held(&self, holder: &AccountId) -> u64 {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    fn burn(&mut self, holder: AccountId, shares: u64) -> ContractResult<()> {
        let held = self.held(&holder);
        if held < shares {
            return Err(ValidationError::InsufficientShares {
                requested: shares,
                held,
            }
            .into());
        }
        self.shares.insert(holder, held - shares);
        self.total_shares = self.total_shares.saturating_sub(shares);
        Ok(())
    }
}

impl YieldPool for InterestPool {
    fn id(&self) -> AccountId {
        self.id
    }

    fn underlying(&self) -> &TokenId {
        &self.underlying
    }

    fn supply(
        &mut self,
        ledger: &mut ValueLedger,
        holder: AccountId,
        amount: u64,
    ) -> ContractResult<u64> {
        let minted = self.underlying_to_shares(amount, false)?;
        if minted == 0 {
            return Err(ValidationError::DustAmount.into());
        }
        let new_held = self
            .held(&holder)
            .checked_add(minted)
            .ok_or(ValidationError::AmountOverflow)?;
        let new_total = self
            .total_shares
            .checked_add(minted)
            .ok_or(ValidationError::AmountOverflow)?;

        ledger.transfer(&holder, &self.id, &self.underlying, amount)?;
        self.shares.insert(holder, new_held);
        self.total_shares = new_total;
        debug!(pool = %self.id, %holder, amount, minted, "pool supply");
        Ok(minted)
    }

    fn redeem_shares(
        &mut self,
        ledger: &mut ValueLedger,
        holder: AccountId,
        shares: u64,
    ) -> ContractResult<u64> {
        let held = self.held(&holder);
        if held < shares {
            return Err(ValidationError::InsufficientShares {
                requested: shares,
                held,
            }
            .into());
        }
        let paid = self.shares_to_underlying(shares)?;
        ledger.transfer(&self.id, &holder, &self.underlying, paid)?;
        self.burn(holder, shares)?;
        debug!(pool = %self.id, %holder, shares, paid, "pool redeem by shares");
        Ok(paid)
    }

    fn redeem_underlying(
        &mut self,
        ledger: &mut ValueLedger,
        holder: AccountId,
        amount: u64,
    ) -> ContractResult<u64> {
        let burned = self.underlying_to_shares(amount, true)?;
        let held = self.held(&holder);
        if held < burned {
            return Err(ValidationError::InsufficientShares {
                requested: burned,
                held,
            }
            .into());
        }
        ledger.transfer(&self.id, &holder, &self.underlying, amount)?;
        self.burn(holder, burned)?;
        debug!(pool = %self.id, %holder, amount, burned, "pool redeem by underlying");
        Ok(burned)
    }

    fn share_balance(&self, holder: &AccountId) -> u64 {
        self.held(holder)
    }

    fn underlying_balance(&self, holder: &AccountId) -> u64 {
        self.shares_to_underlying(self.held(holder)).unwrap_or(u64::MAX)
    }

    fn accrue_interest(&mut self, ledger: &mut ValueLedger, rate_bps: u32) -> ContractResult<()> {
        let new_rate = self
            .exchange_rate
            .checked_mul(u128::from(BASIS_POINTS_TOTAL) + u128::from(rate_bps))
            .ok_or(ValidationError::AmountOverflow)?
            / u128::from(BASIS_POINTS_TOTAL);

        let owed = (self.total_shares as u128)
            .checked_mul(new_rate)
            .ok_or(ValidationError::AmountOverflow)?
            / EXCHANGE_RATE_SCALE;
        let owed = u64::try_from(owed).map_err(|_| ValidationError::AmountOverflow)?;
        let reserves = ledger.balance_of(&self.id, &self.underlying);
        if owed > reserves {
            ledger.deposit(self.id, &self.underlying, owed - reserves)?;
        }
        self.exchange_rate = new_rate;
        debug!(pool = %self.id, rate_bps, "pool interest accrued");
        Ok(())
    }
}
