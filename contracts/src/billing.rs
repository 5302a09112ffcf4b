//! # Billing
//!
//! Vault upkeep is a subscription. Each vault carries a `paid_until`
//! timestamp; paying a fee pushes it forward by a fixed increment:
//!
//! | Period  | Increment |
//! |---------|-----------|
//! | Monthly | 30 days   |
//! | Yearly  | 365 days  |
//!
//! The fleet owner decides which tokens are accepted and at what price.
//! A token missing from the [`FeeSchedule`] is rejected by every payment
//! path. The fleet owner can also grant time for free (`admin_pay`), which
//! extends `paid_until` in whole 30-day months without moving any funds.

use std::collections::BTreeMap;

use pulsevault_protocol::config::{BILLING_MONTH_SECS, BILLING_YEAR_SECS};
use pulsevault_protocol::types::TokenId;
use serde::{Deserialize, Serialize};

use crate::error::{ContractResult, ValidationError};

/// Price of one billing period in a given token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub monthly: u64,
    pub yearly: u64,
}

/// Which subscription period a payment buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

impl BillingPeriod {
    /// How far one payment moves `paid_until`.
    pub fn extension_secs(self) -> u64 {
        match self {
            BillingPeriod::Monthly => BILLING_MONTH_SECS,
            BillingPeriod::Yearly => BILLING_YEAR_SECS,
        }
    }

    pub fn fee(self, quote: &FeeQuote) -> u64 {
        match self {
            BillingPeriod::Monthly => quote.monthly,
            BillingPeriod::Yearly => quote.yearly,
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingPeriod::Monthly => write!(f, "monthly"),
            BillingPeriod::Yearly => write!(f, "yearly"),
        }
    }
}

/// Accepted fee tokens and their prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    fees: BTreeMap<TokenId, FeeQuote>,
}

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token`, or reprice it if already accepted.
    pub fn allow_token(&mut self, token: TokenId, monthly: u64, yearly: u64) {
        self.fees.insert(token, FeeQuote { monthly, yearly });
    }

    pub fn is_token_allowed(&self, token: &TokenId) -> bool {
        self.fees.contains_key(token)
    }

    pub fn monthly_fee(&self, token: &TokenId) -> Option<u64> {
        self.fees.get(token).map(|q| q.monthly)
    }

    pub fn yearly_fee(&self, token: &TokenId) -> Option<u64> {
        self.fees.get(token).map(|q| q.yearly)
    }

    /// The fee for `period` in `token`, or `TokenNotAllowed`.
    pub fn quote(&self, token: &TokenId, period: BillingPeriod) -> ContractResult<u64> {
        self.fees
            .get(token)
            .map(|q| period.fee(q))
            .ok_or_else(|| ValidationError::TokenNotAllowed(token.clone()).into())
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.fees.keys()
    }
}

/// Seconds granted by an administrative payment of `months` months.
pub fn admin_extension_secs(months: u32) -> ContractResult<u64> {
    u64::from(months)
        .checked_mul(BILLING_MONTH_SECS)
        .ok_or_else(|| ValidationError::AmountOverflow.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;

    #[test]
    fn quotes_follow_schedule() {
        let mut fees = FeeSchedule::new();
        let dai = TokenId::asset("DAI");
        fees.allow_token(dai.clone(), 4, 40);
        assert_eq!(fees.quote(&dai, BillingPeriod::Monthly).unwrap(), 4);
        assert_eq!(fees.quote(&dai, BillingPeriod::Yearly).unwrap(), 40);
        assert_eq!(fees.monthly_fee(&dai), Some(4));
        assert_eq!(fees.yearly_fee(&dai), Some(40));
    }

    #[test]
    fn unlisted_token_is_not_allowed() {
        let fees = FeeSchedule::new();
        let err = fees
            .quote(&TokenId::asset("USDT"), BillingPeriod::Monthly)
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Validation(ValidationError::TokenNotAllowed(_))
        ));
        assert!(!fees.is_token_allowed(&TokenId::Native));
    }

    #[test]
    fn repricing_replaces_quote() {
        let mut fees = FeeSchedule::new();
        fees.allow_token(TokenId::Native, 1, 10);
        fees.allow_token(TokenId::Native, 2, 20);
        assert_eq!(fees.monthly_fee(&TokenId::Native), Some(2));
        assert_eq!(fees.tokens().count(), 1);
    }

    #[test]
    fn period_increments() {
        assert_eq!(BillingPeriod::Monthly.extension_secs(), 30 * 86_400);
        assert_eq!(BillingPeriod::Yearly.extension_secs(), 365 * 86_400);
        assert_eq!(admin_extension_secs(3).unwrap(), 90 * 86_400);
    }
}
