//! # Value Ledger
//!
//! Balances and allowances for every account and token in a fleet. This
//! stands in for the settlement substrate the vaults run on: native value
//! and token contracts alike.
//!
//! Every mutation checks before it writes, so a failed call leaves the
//! ledger untouched. Multi-step settlements go through [`ValueLedger::staged`]
//! and commit by replacing the original.

use std::collections::BTreeMap;

use pulsevault_protocol::types::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::{ContractResult, ValidationError};

/// Per-token balances and `owner -> spender` allowances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueLedger {
    /// `token -> (account -> balance)`.
    balances: BTreeMap<TokenId, BTreeMap<AccountId, u64>>,
    /// `token -> (owner -> (spender -> remaining allowance))`.
    allowances: BTreeMap<TokenId, BTreeMap<AccountId, BTreeMap<AccountId, u64>>>,
}

impl ValueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountId, token: &TokenId) -> u64 {
        self.balances
            .get(token)
            .and_then(|b| b.get(account))
            .copied()
            .unwrap_or(0)
    }

    /// Credit `amount` from outside the fleet (receive, faucet, minting).
    pub fn deposit(&mut self, account: AccountId, token: &TokenId, amount: u64) -> ContractResult<()> {
        let current = self.balance_of(&account, token);
        let updated = current
            .checked_add(amount)
            .ok_or(ValidationError::AmountOverflow)?;
        self.balances
            .entry(token.clone())
            .or_default()
            .insert(account, updated);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        token: &TokenId,
        amount: u64,
    ) -> ContractResult<()> {
        let available = self.balance_of(from, token);
        if available < amount {
            return Err(ValidationError::InsufficientFunds {
                token: token.clone(),
                requested: amount,
                available,
            }
            .into());
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let credited = self
            .balance_of(to, token)
            .checked_add(amount)
            .ok_or(ValidationError::AmountOverflow)?;

        let book = self.balances.entry(token.clone()).or_default();
        book.insert(*from, available - amount);
        book.insert(*to, credited);
        Ok(())
    }

    /// Set (not add to) the allowance `spender` may pull from `owner`.
    pub fn approve(&mut self, owner: AccountId, spender: AccountId, token: &TokenId, amount: u64) {
        self.allowances
            .entry(token.clone())
            .or_default()
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId, token: &TokenId) -> u64 {
        self.allowances
            .get(token)
            .and_then(|o| o.get(owner))
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Pull `amount` from `from`'s balance into `to`, spending `spender`'s
    /// allowance.
    pub fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        token: &TokenId,
        amount: u64,
    ) -> ContractResult<()> {
        let approved = self.allowance(from, spender, token);
        if approved < amount {
            return Err(ValidationError::InsufficientAllowance {
                token: token.clone(),
                requested: amount,
                approved,
            }
            .into());
        }
        self.transfer(from, to, token, amount)?;
        self.approve(*from, *spender, token, approved - amount);
        Ok(())
    }

    /// A scratch copy for multi-step settlement. Commit by assigning it back.
    pub fn staged(&self) -> Self {
        self.clone()
    }
}
