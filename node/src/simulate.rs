//! # Fleet Simulation
//!
//! Drives an in-memory fleet on a manual clock through the two scenarios
//! operators ask about: heirs draining a vault once the owner goes quiet,
//! and a vault paying its upkeep.
//!
//! Expected failures are part of the report. A scenario step that should
//! fail but succeeds aborts the run.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pulsevault_contracts::{ContractResult, CreateVaultRequest, Manager, VaultCall};
use pulsevault_protocol::clock::ManualClock;
use pulsevault_protocol::crypto::keys::Keypair;
use pulsevault_protocol::crypto::signatures::sign_creation;
use pulsevault_protocol::types::{AccountId, TokenId};
use serde::Serialize;
use tracing::info;

use crate::settings::FleetSettings;

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub fleet_owner: AccountId,
    pub treasury: AccountId,
    pub signer: AccountId,
    pub module_version: String,
    pub inheritance: InheritanceReport,
    pub billing: BillingReport,
}

#[derive(Debug, Serialize)]
pub struct InheritanceReport {
    pub vault: AccountId,
    pub deposit: u64,
    pub lock_secs: u64,
    /// What a claim one second before the lock expires returns.
    pub early_claim: String,
    pub claims: Vec<ClaimRecord>,
    pub remaining: u64,
    /// What a second claim by the first heir returns.
    pub repeat_claim: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimRecord {
    pub heir: AccountId,
    pub amount: u64,
    pub vault_balance_after: u64,
}

#[derive(Debug, Serialize)]
pub struct BillingReport {
    pub vault: AccountId,
    pub token: TokenId,
    pub monthly_fee: u64,
    pub yearly_fee: u64,
    pub paid_until_at_creation: DateTime<Utc>,
    pub paid_until_after_monthly: DateTime<Utc>,
    pub paid_until_after_yearly: DateTime<Utc>,
    pub treasury_balance: u64,
    /// What paying in a token the fleet does not accept returns.
    pub unlisted_token: String,
}

/// Render an expected failure as `Kind: message`.
fn expect_failure<T>(step: &str, result: ContractResult<T>) -> Result<String> {
    match result {
        Ok(_) => bail!("{step} unexpectedly succeeded"),
        Err(err) => Ok(format!("{}: {}", err.kind(), err)),
    }
}

pub fn run(settings: &FleetSettings) -> Result<SimulationReport> {
    let clock = Arc::new(ManualClock::new(settings.start()?));
    let signer = Keypair::generate();
    let signer_id = AccountId::from_public_key(&signer.public_key());
    let mut manager = Manager::new(settings.fleet_config(signer_id), clock.clone())
        .context("failed to set up fleet")?;
    info!(fleet = ?manager, "simulation fleet ready");

    let inheritance = run_inheritance(&mut manager, &clock, &signer, settings)?;
    let billing = run_billing(&mut manager, &signer, settings)?;

    Ok(SimulationReport {
        fleet_owner: manager.owner(),
        treasury: manager.treasury(),
        signer: signer_id,
        module_version: manager.active_version().to_string(),
        inheritance,
        billing,
    })
}

fn create(
    manager: &mut Manager,
    signer: &Keypair,
    settings: &FleetSettings,
    name: &str,
) -> Result<AccountId> {
    let nonce = 1;
    let vault = &settings.vault;
    manager
        .create_vault(CreateVaultRequest {
            owner: vault.owner_id(),
            beneficiaries: vault.heir_ids(),
            shares: vault.shares.clone(),
            lock_secs: vault.lock_secs(),
            name: name.to_string(),
            nonce,
            signature: sign_creation(signer, name, nonce),
        })
        .with_context(|| format!("failed to create vault `{name}`"))
}

fn run_inheritance(
    manager: &mut Manager,
    clock: &ManualClock,
    signer: &Keypair,
    settings: &FleetSettings,
) -> Result<InheritanceReport> {
    let native = TokenId::Native;
    let heirs = settings.vault.heir_ids();
    let lock_secs = settings.vault.lock_secs();
    let vault = create(manager, signer, settings, &settings.vault.name)?;
    manager.deposit(vault, &native, settings.vault.deposit)?;

    clock.advance_secs(lock_secs.saturating_sub(1));
    let early_claim = expect_failure(
        "claim before the lock expired",
        manager.call(heirs[0], vault, VaultCall::Withdraw),
    )?;
    clock.advance_secs(1);

    let mut claims = Vec::with_capacity(heirs.len());
    for heir in &heirs {
        let before = manager.balance_of(heir, &native);
        manager
            .call(*heir, vault, VaultCall::Withdraw)
            .with_context(|| format!("claim by {heir} failed"))?;
        claims.push(ClaimRecord {
            heir: *heir,
            amount: manager.balance_of(heir, &native) - before,
            vault_balance_after: manager.balance_of(&vault, &native),
        });
    }

    let repeat_claim = expect_failure(
        "second claim in one cycle",
        manager.call(heirs[0], vault, VaultCall::Withdraw),
    )?;

    Ok(InheritanceReport {
        vault,
        deposit: settings.vault.deposit,
        lock_secs,
        early_claim,
        claims,
        remaining: manager.balance_of(&vault, &native),
        repeat_claim,
    })
}

fn run_billing(
    manager: &mut Manager,
    signer: &Keypair,
    settings: &FleetSettings,
) -> Result<BillingReport> {
    let Some(fee) = settings.fees.first() else {
        bail!("billing scenario needs at least one fee token");
    };
    let owner = settings.vault.owner_id();
    let name = format!("{}-upkeep", settings.vault.name);
    let vault = create(manager, signer, settings, &name)?;
    let funding = fee
        .monthly
        .checked_add(fee.yearly)
        .context("fee amounts overflow")?;
    manager.deposit(vault, &fee.token, funding)?;

    let paid_until_at = |m: &Manager| m.vault(&vault).map(|v| v.paid_until());
    let paid_until_at_creation = paid_until_at(manager).context("vault vanished")?;

    manager.call(
        owner,
        vault,
        VaultCall::PayMonthlyFee {
            token: fee.token.clone(),
        },
    )?;
    let paid_until_after_monthly = paid_until_at(manager).context("vault vanished")?;

    manager.call(
        owner,
        vault,
        VaultCall::PayYearlyFee {
            token: fee.token.clone(),
        },
    )?;
    let paid_until_after_yearly = paid_until_at(manager).context("vault vanished")?;

    let unlisted = TokenId::asset("UNLISTED");
    let unlisted_token = expect_failure(
        "fee in an unlisted token",
        manager.call(owner, vault, VaultCall::PayMonthlyFee { token: unlisted }),
    )?;

    Ok(BillingReport {
        vault,
        token: fee.token.clone(),
        monthly_fee: fee.monthly,
        yearly_fee: fee.yearly,
        paid_until_at_creation,
        paid_until_after_monthly,
        paid_until_after_yearly,
        treasury_balance: manager.balance_of(&manager.treasury(), &fee.token),
        unlisted_token,
    })
}
