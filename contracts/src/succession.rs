//! # Succession Ledger
//!
//! The per-vault record and the dead-man's-switch state machine that
//! governs it.
//!
//! ```text
//!            pulse()                      pulse()
//!   ┌──────────────────┐       ┌──────────────────────────┐
//!   ▼                  │       ▼                          │
//! ALIVE ───── now - last_pulse >= lock ─────▶ CLAIMABLE ──┘
//! ```
//!
//! A vault is **ALIVE** while `now - last_pulse < lock` and **CLAIMABLE**
//! otherwise. Every `pulse()` opens a new *claim cycle*. Inside a cycle
//! each beneficiary may claim each token once.
//!
//! ## Claim arithmetic
//!
//! The first claim of a token in a cycle samples the vault's balance of
//! that token. Every claim in the cycle pays
//! `floor(sample * basis_points / 10000)`, capped at what the vault still
//! holds. Four heirs at 25 % each therefore drain 100 units to exactly 0,
//! in any order.
//!
//! Nothing in this module moves value. Claims return the payout and the
//! caller turns it into a transfer once the new state is committed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use pulsevault_protocol::config::{
    BASIS_POINTS_TOTAL, MAX_BENEFICIARIES, MAX_LOCK_SECS, MIN_LOCK_SECS,
};
use pulsevault_protocol::types::{AccountId, ModuleVersion, TokenId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AuthorizationError, ContractResult, StateError, ValidationError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a vault is in its succession lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    /// The owner has pulsed within the lock period.
    Alive,
    /// The lock period has elapsed since the last pulse. Beneficiaries may claim.
    Claimable,
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultStatus::Alive => write!(f, "ALIVE"),
            VaultStatus::Claimable => write!(f, "CLAIMABLE"),
        }
    }
}

/// Balance sampled at the first claim of a token in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct CycleSnapshot {
    cycle: u64,
    balance: u64,
}

/// Everything needed to open a vault.
#[derive(Debug, Clone)]
pub struct VaultParams {
    pub id: AccountId,
    pub name: String,
    pub owner: AccountId,
    pub beneficiaries: Vec<AccountId>,
    /// Native-token shares, one per beneficiary, in basis points.
    pub shares: Vec<u16>,
    pub lock_secs: u64,
    pub version: ModuleVersion,
    pub created_at: DateTime<Utc>,
    pub paid_until: DateTime<Utc>,
}

/// The durable record of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    id: AccountId,
    name: String,
    owner: AccountId,
    created_at: DateTime<Utc>,
    last_pulse: DateTime<Utc>,
    lock_secs: u64,
    beneficiaries: Vec<AccountId>,
    /// Explicit per-token share vectors, aligned with `beneficiaries`.
    distributions: BTreeMap<TokenId, Vec<u16>>,
    /// Tokens with an explicit distribution. Native is always first.
    registered_tokens: Vec<TokenId>,
    claim_cycle: u64,
    /// `beneficiary -> (token -> cycle of last claim)`.
    claims: BTreeMap<AccountId, BTreeMap<TokenId, u64>>,
    snapshots: BTreeMap<TokenId, CycleSnapshot>,
    paid_until: DateTime<Utc>,
    version: ModuleVersion,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_lock(lock_secs: u64) -> ContractResult<()> {
    if (MIN_LOCK_SECS..=MAX_LOCK_SECS).contains(&lock_secs) {
        Ok(())
    } else {
        Err(StateError::LockOutOfBounds {
            requested: lock_secs,
            min: MIN_LOCK_SECS,
            max: MAX_LOCK_SECS,
        }
        .into())
    }
}

fn check_beneficiaries(beneficiaries: &[AccountId]) -> ContractResult<()> {
    if beneficiaries.is_empty() {
        return Err(ValidationError::EmptyBeneficiaries.into());
    }
    if beneficiaries.len() > MAX_BENEFICIARIES {
        return Err(ValidationError::TooManyBeneficiaries {
            count: beneficiaries.len(),
            max: MAX_BENEFICIARIES,
        }
        .into());
    }
    let mut seen = BTreeSet::new();
    for b in beneficiaries {
        if !seen.insert(b) {
            return Err(ValidationError::DuplicateBeneficiary(*b).into());
        }
    }
    Ok(())
}

fn check_sum(token: &TokenId, shares: &[u16]) -> ContractResult<()> {
    let sum: u32 = shares.iter().map(|&s| u32::from(s)).sum();
    if sum == BASIS_POINTS_TOTAL {
        Ok(())
    } else {
        Err(ValidationError::ShareSum {
            token: token.clone(),
            sum,
        }
        .into())
    }
}

/// Cut a flat share array into one slice per token, validating everything
/// before anything is applied.
fn split_shares(
    tokens: &[TokenId],
    flat: &[u16],
    width: usize,
) -> ContractResult<Vec<(TokenId, Vec<u16>)>> {
    let expected = tokens
        .len()
        .checked_mul(width)
        .ok_or(ValidationError::AmountOverflow)?;
    if flat.len() != expected {
        return Err(ValidationError::LengthMismatch {
            what: "shares",
            expected,
            actual: flat.len(),
        }
        .into());
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(tokens.len());
    for (token, slice) in tokens.iter().zip(flat.chunks(width.max(1))) {
        token.check().map_err(ValidationError::InvalidToken)?;
        if !seen.insert(token) {
            return Err(ValidationError::DuplicateToken(token.clone()).into());
        }
        check_sum(token, slice)?;
        out.push((token.clone(), slice.to_vec()));
    }
    Ok(out)
}

/// `at + secs`, or `AmountOverflow` if that leaves chrono's range.
pub(crate) fn add_secs(at: DateTime<Utc>, secs: u64) -> ContractResult<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| at.checked_add_signed(d))
        .ok_or_else(|| ValidationError::AmountOverflow.into())
}

// ---------------------------------------------------------------------------
// VaultState
// ---------------------------------------------------------------------------

impl VaultState {
    /// Open a vault. The creation moment counts as the first pulse.
    pub fn open(params: VaultParams) -> ContractResult<Self> {
        check_lock(params.lock_secs)?;
        check_beneficiaries(&params.beneficiaries)?;
        if params.shares.len() != params.beneficiaries.len() {
            return Err(ValidationError::LengthMismatch {
                what: "shares",
                expected: params.beneficiaries.len(),
                actual: params.shares.len(),
            }
            .into());
        }
        check_sum(&TokenId::Native, &params.shares)?;

        let mut distributions = BTreeMap::new();
        distributions.insert(TokenId::Native, params.shares);

        Ok(Self {
            id: params.id,
            name: params.name,
            owner: params.owner,
            created_at: params.created_at,
            last_pulse: params.created_at,
            lock_secs: params.lock_secs,
            beneficiaries: params.beneficiaries,
            distributions,
            registered_tokens: vec![TokenId::Native],
            claim_cycle: 0,
            claims: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            paid_until: params.paid_until,
            version: params.version,
        })
    }

    // -- Reads --------------------------------------------------------------

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_pulse(&self) -> DateTime<Utc> {
        self.last_pulse
    }

    pub fn lock_secs(&self) -> u64 {
        self.lock_secs
    }

    pub fn beneficiaries(&self) -> &[AccountId] {
        &self.beneficiaries
    }

    pub fn registered_tokens(&self) -> &[TokenId] {
        &self.registered_tokens
    }

    pub fn claim_cycle(&self) -> u64 {
        self.claim_cycle
    }

    pub fn paid_until(&self) -> DateTime<Utc> {
        self.paid_until
    }

    pub fn version(&self) -> &ModuleVersion {
        &self.version
    }

    pub fn has_explicit_distribution(&self, token: &TokenId) -> bool {
        self.distributions.contains_key(token)
    }

    /// Shares for `token`, falling back to the native distribution.
    pub fn distribution(&self, token: &TokenId) -> &[u16] {
        self.distributions
            .get(token)
            .or_else(|| self.distributions.get(&TokenId::Native))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Shares for each of `tokens`, concatenated.
    pub fn distributions(&self, tokens: &[TokenId]) -> Vec<u16> {
        tokens
            .iter()
            .flat_map(|t| self.distribution(t).iter().copied())
            .collect()
    }

    pub fn has_claimed(&self, beneficiary: &AccountId, token: &TokenId) -> bool {
        self.claims
            .get(beneficiary)
            .and_then(|per_token| per_token.get(token))
            .is_some_and(|&cycle| cycle == self.claim_cycle)
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.last_pulse).num_seconds()).unwrap_or(0)
    }

    pub fn status(&self, now: DateTime<Utc>) -> VaultStatus {
        if self.elapsed_secs(now) >= self.lock_secs {
            VaultStatus::Claimable
        } else {
            VaultStatus::Alive
        }
    }

    pub fn is_owner(&self, who: &AccountId) -> bool {
        self.owner == *who
    }

    pub fn ensure_owner(&self, caller: &AccountId) -> ContractResult<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(AuthorizationError::OnlyOwner.into())
        }
    }

    // -- Liveness and claims ------------------------------------------------

    /// Prove the owner is alive. Resets the lock and opens a new claim cycle.
    pub fn pulse(&mut self, caller: &AccountId, now: DateTime<Utc>) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        self.last_pulse = now;
        self.open_cycle();
        info!(vault = %self.id, cycle = self.claim_cycle, "pulse");
        Ok(())
    }

    fn open_cycle(&mut self) {
        self.claim_cycle += 1;
        self.snapshots.clear();
    }

    /// Record a claim of `token` by `caller` and return the payout.
    ///
    /// `balance` is the vault's current holding of `token`. Checks run in
    /// order: vault is claimable (for any caller), caller is a
    /// beneficiary, caller has not claimed this token in this cycle.
    pub fn claim(
        &mut self,
        caller: &AccountId,
        token: &TokenId,
        now: DateTime<Utc>,
        balance: u64,
    ) -> ContractResult<u64> {
        let elapsed = self.elapsed_secs(now);
        if elapsed < self.lock_secs {
            return Err(StateError::NotClaimable {
                remaining_secs: self.lock_secs - elapsed,
            }
            .into());
        }

        let index = self
            .beneficiaries
            .iter()
            .position(|b| b == caller)
            .ok_or(AuthorizationError::NotBeneficiary(*caller))?;

        if self.has_claimed(caller, token) {
            return Err(StateError::AlreadyClaimed {
                beneficiary: *caller,
                token: token.clone(),
            }
            .into());
        }

        let basis_points = self.distribution(token).get(index).copied().unwrap_or(0);
        let cycle = self.claim_cycle;
        let sample = match self.snapshots.get(token) {
            Some(snap) if snap.cycle == cycle => snap.balance,
            _ => {
                self.snapshots
                    .insert(token.clone(), CycleSnapshot { cycle, balance });
                balance
            }
        };

        let entitled = u128::from(sample) * u128::from(basis_points)
            / u128::from(BASIS_POINTS_TOTAL);
        // entitled <= sample, so it fits.
        let payout = u64::try_from(entitled).unwrap_or(u64::MAX).min(balance);

        self.claims
            .entry(*caller)
            .or_default()
            .insert(token.clone(), cycle);

        info!(
            vault = %self.id,
            beneficiary = %caller,
            %token,
            cycle,
            payout,
            "claim recorded"
        );
        Ok(payout)
    }

    // -- Configuration ------------------------------------------------------

    pub fn update_lock(&mut self, caller: &AccountId, lock_secs: u64) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        check_lock(lock_secs)?;
        self.lock_secs = lock_secs;
        Ok(())
    }

    /// Replace the beneficiary list and every distribution.
    ///
    /// `shares` holds one slice of `beneficiaries.len()` entries per token,
    /// in the order of `tokens`. Native must be among the tokens. Prior
    /// claims are discarded and a new claim cycle opens, so a removed
    /// beneficiary keeps nothing.
    pub fn update_heirs(
        &mut self,
        caller: &AccountId,
        beneficiaries: Vec<AccountId>,
        tokens: &[TokenId],
        shares: &[u16],
    ) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        check_beneficiaries(&beneficiaries)?;
        let slices = split_shares(tokens, shares, beneficiaries.len())?;
        if !tokens.contains(&TokenId::Native) {
            return Err(ValidationError::MissingNativeDistribution.into());
        }

        let mut registered = vec![TokenId::Native];
        registered.extend(tokens.iter().filter(|t| !t.is_native()).cloned());

        self.beneficiaries = beneficiaries;
        self.distributions = slices.into_iter().collect();
        self.registered_tokens = registered;
        self.claims.clear();
        self.open_cycle();
        info!(
            vault = %self.id,
            heirs = self.beneficiaries.len(),
            cycle = self.claim_cycle,
            "beneficiaries replaced"
        );
        Ok(())
    }

    /// Replace shares for tokens that already have an explicit entry.
    pub fn update_distributions(
        &mut self,
        caller: &AccountId,
        tokens: &[TokenId],
        shares: &[u16],
    ) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        let slices = split_shares(tokens, shares, self.beneficiaries.len())?;
        if let Some(unknown) = tokens.iter().find(|t| !self.distributions.contains_key(t)) {
            return Err(ValidationError::UnknownDistribution(unknown.clone()).into());
        }
        self.distributions.extend(slices);
        Ok(())
    }

    /// Like [`update_distributions`](Self::update_distributions), but
    /// registers tokens that have no entry yet.
    pub fn update_or_add_token_distributions(
        &mut self,
        caller: &AccountId,
        tokens: &[TokenId],
        shares: &[u16],
    ) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        let slices = split_shares(tokens, shares, self.beneficiaries.len())?;
        for (token, slice) in slices {
            if !self.registered_tokens.contains(&token) {
                self.registered_tokens.push(token.clone());
            }
            self.distributions.insert(token, slice);
        }
        Ok(())
    }

    /// Drop explicit entries so those tokens fall back to the native
    /// distribution.
    ///
    /// `registered_tokens` is the caller's view of the resulting set and
    /// must equal the current set minus `tokens`.
    pub fn remove_token_distributions(
        &mut self,
        caller: &AccountId,
        tokens: &[TokenId],
        registered_tokens: &[TokenId],
    ) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        if tokens.iter().any(TokenId::is_native) {
            return Err(StateError::FallbackDistribution.into());
        }
        if let Some(unknown) = tokens.iter().find(|t| !self.distributions.contains_key(t)) {
            return Err(ValidationError::UnknownDistribution(unknown.clone()).into());
        }

        let remaining: Vec<TokenId> = self
            .registered_tokens
            .iter()
            .filter(|t| !tokens.contains(t))
            .cloned()
            .collect();
        let expected: BTreeSet<&TokenId> = remaining.iter().collect();
        let claimed: BTreeSet<&TokenId> = registered_tokens.iter().collect();
        if expected != claimed || registered_tokens.len() != remaining.len() {
            return Err(ValidationError::RegisteredSetMismatch.into());
        }

        for token in tokens {
            self.distributions.remove(token);
        }
        self.registered_tokens = remaining;
        Ok(())
    }

    pub fn change_owner(&mut self, caller: &AccountId, new_owner: AccountId) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        info!(vault = %self.id, from = %self.owner, to = %new_owner, "vault ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    /// Rebind the vault to another module version. Whether that version
    /// exists is the registry's question; the module asks it first.
    pub fn set_version(&mut self, caller: &AccountId, version: ModuleVersion) -> ContractResult<()> {
        self.ensure_owner(caller)?;
        info!(vault = %self.id, from = %self.version, to = %version, "vault version changed");
        self.version = version;
        Ok(())
    }

    // -- Billing ------------------------------------------------------------

    /// Push `paid_until` forward by `secs`. Returns the new expiry.
    pub fn extend_paid_until(&mut self, secs: u64) -> ContractResult<DateTime<Utc>> {
        self.paid_until = add_secs(self.paid_until, secs)?;
        Ok(self.paid_until)
    }

    pub(crate) fn set_paid_until(&mut self, at: DateTime<Utc>) {
        self.paid_until = at;
    }
}
