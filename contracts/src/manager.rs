//! # Fleet Manager
//!
//! The one object that owns a fleet: its configuration, the creation
//! authorization record, the module registry, every vault, the value
//! ledger, and the external pools vaults can supply to.
//!
//! ## Call lifecycle
//!
//! ```text
//! call(caller, vault, op)
//!   1. look up the vault                      → ValidationError
//!   2. resolve (vault.version, op.selector)   → RoutingError
//!   3. module executes on a draft copy        → any error, nothing changed
//!   4. draft replaces the stored vault        (state first)
//!   5. effects settle on a staged ledger      (value second)
//!   6. settlement failed? restore the vault   → error, nothing changed
//! ```
//!
//! Step 4 before step 5 is the whole re-entrancy story: a recipient that
//! calls back in during settlement already sees the post-call state, and
//! claim flags are already set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulsevault_protocol::clock::{Clock, SystemClock};
use pulsevault_protocol::config::{GENESIS_MODULE_VERSION, VAULT_ID_DOMAIN};
use pulsevault_protocol::crypto::signatures::CreationSignature;
use pulsevault_protocol::types::{AccountId, ModuleVersion, Selector, TokenId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authorization::AuthorizationScheme;
use crate::billing::{admin_extension_secs, BillingPeriod};
use crate::call::{Effect, Receipt, VaultCall};
use crate::error::{ContractResult, ValidationError};
use crate::fleet::FleetConfig;
use crate::ledger::ValueLedger;
use crate::modules::{CallContext, VaultModule};
use crate::registry::ModuleRegistry;
use crate::succession::{add_secs, VaultParams, VaultState, VaultStatus};
use crate::yield_adapter::YieldPool;

/// A signed request to open a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVaultRequest {
    pub owner: AccountId,
    pub beneficiaries: Vec<AccountId>,
    /// Native-value shares in basis points, one per beneficiary.
    pub shares: Vec<u16>,
    pub lock_secs: u64,
    pub name: String,
    pub nonce: u64,
    pub signature: CreationSignature,
}

/// The address a vault created from `(name, nonce)` lives at.
pub fn vault_address(name: &str, nonce: u64) -> AccountId {
    AccountId::derive(VAULT_ID_DOMAIN, &[name.as_bytes(), &nonce.to_be_bytes()])
}

pub struct Manager {
    config: FleetConfig,
    authorization: AuthorizationScheme,
    registry: ModuleRegistry,
    active_version: ModuleVersion,
    vaults: BTreeMap<AccountId, VaultState>,
    ledger: ValueLedger,
    pools: BTreeMap<AccountId, Box<dyn YieldPool>>,
    clock: Arc<dyn Clock>,
}

impl Manager {
    /// A fleet with the built-in modules registered under the genesis
    /// version, which new vaults bind to.
    pub fn new(config: FleetConfig, clock: Arc<dyn Clock>) -> ContractResult<Self> {
        for token in config.fees.tokens() {
            token.check().map_err(ValidationError::InvalidToken)?;
        }
        let registry = ModuleRegistry::with_builtin_modules()?;
        let active_version = ModuleVersion::new(GENESIS_MODULE_VERSION)
            .map_err(|_| ValidationError::EmptyImplementation)?;
        info!(
            owner = %config.owner(),
            treasury = %config.treasury,
            version = %active_version,
            "fleet manager initialized"
        );
        Ok(Self {
            config,
            authorization: AuthorizationScheme::new(),
            registry,
            active_version,
            vaults: BTreeMap::new(),
            ledger: ValueLedger::new(),
            pools: BTreeMap::new(),
            clock,
        })
    }

    pub fn with_system_clock(config: FleetConfig) -> ContractResult<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Vault creation
    // -----------------------------------------------------------------------

    /// Authorize and open a vault. Returns its address.
    ///
    /// The `(name, nonce)` pair is consumed only if the vault is actually
    /// created.
    pub fn create_vault(&mut self, request: CreateVaultRequest) -> ContractResult<AccountId> {
        let signer = self.authorization.check(
            &self.config.access,
            &request.name,
            request.nonce,
            &request.signature,
        )?;

        let id = vault_address(&request.name, request.nonce);
        if self.vaults.contains_key(&id) {
            return Err(ValidationError::VaultExists(id).into());
        }

        let now = self.clock.now();
        let vault = VaultState::open(VaultParams {
            id,
            name: request.name.clone(),
            owner: request.owner,
            beneficiaries: request.beneficiaries,
            shares: request.shares,
            lock_secs: request.lock_secs,
            version: self.active_version.clone(),
            created_at: now,
            paid_until: add_secs(now, self.config.grace_period_secs)?,
        })?;

        self.authorization.consume(&request.name, request.nonce);
        self.vaults.insert(id, vault);
        info!(
            vault = %id,
            name = %request.name,
            nonce = request.nonce,
            %signer,
            consumed = self.authorization.consumed_count(),
            "vault created"
        );
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Route `call` to the module bound for the vault's version and run it.
    pub fn call(
        &mut self,
        caller: AccountId,
        vault_id: AccountId,
        call: VaultCall,
    ) -> ContractResult<Receipt> {
        let now = self.clock.now();
        let vault = self
            .vaults
            .get(&vault_id)
            .ok_or(ValidationError::UnknownVault(vault_id))?;
        let module = self.registry.resolve(vault.version(), &call.selector())?;

        let mut draft = vault.clone();
        let effects = {
            let mut ctx = CallContext::new(
                caller,
                now,
                &mut draft,
                &self.config,
                &self.registry,
                &self.ledger,
            );
            module.execute(&mut ctx, &call)?;
            ctx.into_effects()
        };

        let previous = self.vaults.insert(vault_id, draft);
        if let Err(err) = self.settle(&effects) {
            if let Some(previous) = previous {
                self.vaults.insert(vault_id, previous);
            }
            warn!(vault = %vault_id, op = call.name(), %err, "settlement failed, call reverted");
            return Err(err);
        }

        info!(
            vault = %vault_id,
            %caller,
            op = call.name(),
            effects = effects.len(),
            "vault call executed"
        );
        Ok(Receipt {
            id: Uuid::new_v4(),
            vault: vault_id,
            caller,
            operation: call.name().to_string(),
            effects,
            executed_at: now,
        })
    }

    /// Apply effects to a staged ledger and commit it only if all succeed.
    ///
    /// Pool bookkeeping is not staged, so a call may carry at most one pool
    /// effect and it must come last. The pool itself checks before it
    /// writes.
    fn settle(&mut self, effects: &[Effect]) -> ContractResult<()> {
        let pool_effects = effects.iter().filter(|e| e.touches_pool()).count();
        let pool_last = effects.last().is_some_and(Effect::touches_pool);
        if pool_effects > 1 || (pool_effects == 1 && !pool_last) {
            return Err(ValidationError::UnsettleablePoolEffects {
                count: pool_effects,
            }
            .into());
        }

        let mut staged = self.ledger.staged();
        for effect in effects {
            match effect {
                Effect::Transfer {
                    from,
                    to,
                    token,
                    amount,
                } => staged.transfer(from, to, token, *amount)?,
                Effect::Supply {
                    pool,
                    holder,
                    amount,
                } => {
                    self.pool_mut(pool)?.supply(&mut staged, *holder, *amount)?;
                }
                Effect::RedeemAll { pool, holder } => {
                    self.pool_mut(pool)?.redeem_all(&mut staged, *holder)?;
                }
                Effect::Redeem {
                    pool,
                    holder,
                    amount,
                    share_units,
                } => {
                    let pool = self.pool_mut(pool)?;
                    if *share_units {
                        pool.redeem_shares(&mut staged, *holder, *amount)?;
                    } else {
                        pool.redeem_underlying(&mut staged, *holder, *amount)?;
                    }
                }
            }
            debug!(?effect, "effect settled");
        }
        self.ledger = staged;
        Ok(())
    }

    fn pool_mut(&mut self, id: &AccountId) -> ContractResult<&mut (dyn YieldPool + 'static)> {
        self.pools
            .get_mut(id)
            .map(|pool| pool.as_mut())
            .ok_or_else(|| ValidationError::UnknownPool(*id).into())
    }

    // -----------------------------------------------------------------------
    // Value in and out
    // -----------------------------------------------------------------------

    /// Credit `amount` to any account from outside the fleet. Anyone may
    /// send value to a vault or to the treasury.
    pub fn deposit(&mut self, account: AccountId, token: &TokenId, amount: u64) -> ContractResult<()> {
        token.check().map_err(ValidationError::InvalidToken)?;
        self.ledger.deposit(account, token, amount)?;
        debug!(%account, %token, amount, "deposit");
        Ok(())
    }

    /// Let the manager pull up to `amount` of `token` from `owner` for fees.
    pub fn approve(&mut self, owner: AccountId, token: &TokenId, amount: u64) {
        let spender = self.config.treasury;
        self.ledger.approve(owner, spender, token, amount);
    }

    /// Pay out of the treasury. Fleet owner only.
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        to: AccountId,
        token: &TokenId,
        amount: u64,
    ) -> ContractResult<()> {
        self.config.access.ensure_owner(caller)?;
        let treasury = self.config.treasury;
        self.ledger.transfer(&treasury, &to, token, amount)?;
        info!(%to, %token, amount, "treasury transfer");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Billing
    // -----------------------------------------------------------------------

    pub fn allow_token(
        &mut self,
        caller: &AccountId,
        token: TokenId,
        monthly: u64,
        yearly: u64,
    ) -> ContractResult<()> {
        self.config.access.ensure_owner(caller)?;
        token.check().map_err(ValidationError::InvalidToken)?;
        info!(%token, monthly, yearly, "fee token allowed");
        self.config.fees.allow_token(token, monthly, yearly);
        Ok(())
    }

    /// A third party pays a vault's monthly fee from its allowance.
    pub fn pay_monthly_fee(
        &mut self,
        payer: AccountId,
        vault_id: AccountId,
        token: &TokenId,
    ) -> ContractResult<DateTime<Utc>> {
        self.pay_fee(payer, vault_id, token, BillingPeriod::Monthly)
    }

    /// A third party pays a vault's yearly fee from its allowance.
    pub fn pay_yearly_fee(
        &mut self,
        payer: AccountId,
        vault_id: AccountId,
        token: &TokenId,
    ) -> ContractResult<DateTime<Utc>> {
        self.pay_fee(payer, vault_id, token, BillingPeriod::Yearly)
    }

    fn pay_fee(
        &mut self,
        payer: AccountId,
        vault_id: AccountId,
        token: &TokenId,
        period: BillingPeriod,
    ) -> ContractResult<DateTime<Utc>> {
        let fee = self.config.fees.quote(token, period)?;
        let treasury = self.config.treasury;
        let vault = self
            .vaults
            .get_mut(&vault_id)
            .ok_or(ValidationError::UnknownVault(vault_id))?;

        let previous = vault.paid_until();
        let paid_until = vault.extend_paid_until(period.extension_secs())?;
        if let Err(err) = self
            .ledger
            .transfer_from(&treasury, &payer, &treasury, token, fee)
        {
            vault.set_paid_until(previous);
            return Err(err);
        }
        info!(vault = %vault_id, %payer, %token, fee, %period, %paid_until, "fee paid");
        Ok(paid_until)
    }

    /// Grant `months[i]` free months to `vaults[i]`. Fleet owner only.
    pub fn admin_pay(
        &mut self,
        caller: &AccountId,
        vaults: &[AccountId],
        months: &[u32],
    ) -> ContractResult<()> {
        self.config.access.ensure_owner(caller)?;
        if vaults.len() != months.len() {
            return Err(ValidationError::LengthMismatch {
                what: "months",
                expected: vaults.len(),
                actual: months.len(),
            }
            .into());
        }

        let mut pending: BTreeMap<AccountId, DateTime<Utc>> = BTreeMap::new();
        for (id, &m) in vaults.iter().zip(months) {
            let current = match pending.get(id) {
                Some(at) => *at,
                None => self
                    .vaults
                    .get(id)
                    .ok_or(ValidationError::UnknownVault(*id))?
                    .paid_until(),
            };
            pending.insert(*id, add_secs(current, admin_extension_secs(m)?)?);
        }

        for (id, paid_until) in pending {
            if let Some(vault) = self.vaults.get_mut(&id) {
                vault.set_paid_until(paid_until);
            }
        }
        info!(vaults = vaults.len(), "administrative payment applied");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    pub fn change_owner(&mut self, caller: &AccountId, new_owner: AccountId) -> ContractResult<()> {
        self.config.access.change_owner(caller, new_owner)
    }

    pub fn add_signer(&mut self, caller: &AccountId, signer: AccountId) -> ContractResult<()> {
        self.config.access.add_signer(caller, signer)
    }

    pub fn delete_signer(&mut self, caller: &AccountId, signer: &AccountId) -> ContractResult<()> {
        self.config.access.delete_signer(caller, signer)
    }

    /// Deploy module code so versions can point at it. Fleet owner only.
    pub fn deploy_module(
        &mut self,
        caller: &AccountId,
        module: Arc<dyn VaultModule>,
    ) -> ContractResult<AccountId> {
        self.config.access.ensure_owner(caller)?;
        Ok(self.registry.deploy_module(module))
    }

    /// Register a new, immutable module version. Fleet owner only.
    pub fn set_new_version_implementation(
        &mut self,
        caller: &AccountId,
        version: ModuleVersion,
        selectors: &[Selector],
        addresses: &[AccountId],
    ) -> ContractResult<()> {
        self.config.access.ensure_owner(caller)?;
        self.registry
            .set_new_version_implementation(version, selectors, addresses)
    }

    /// Choose the version new vaults bind to. Fleet owner only.
    pub fn set_active_version(&mut self, caller: &AccountId, version: ModuleVersion) -> ContractResult<()> {
        self.config.access.ensure_owner(caller)?;
        if !self.registry.has_version(&version) {
            return Err(ValidationError::UnknownVersion(version).into());
        }
        info!(%version, "active module version changed");
        self.active_version = version;
        Ok(())
    }

    /// Make an external pool reachable from vaults. Fleet owner only.
    /// Registering a pool id twice keeps the first.
    pub fn register_pool(
        &mut self,
        caller: &AccountId,
        pool: Box<dyn YieldPool>,
    ) -> ContractResult<AccountId> {
        self.config.access.ensure_owner(caller)?;
        let id = pool.id();
        self.pools.entry(id).or_insert(pool);
        info!(pool = %id, "pool registered");
        Ok(id)
    }

    /// Let interest accrue in an external pool. This models the outside
    /// world, so no fleet role is required.
    pub fn accrue_pool_interest(&mut self, pool: &AccountId, rate_bps: u32) -> ContractResult<()> {
        let Manager { pools, ledger, .. } = self;
        let pool = pools
            .get_mut(pool)
            .ok_or(ValidationError::UnknownPool(*pool))?;
        pool.accrue_interest(ledger, rate_bps)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn owner(&self) -> AccountId {
        self.config.owner()
    }

    pub fn treasury(&self) -> AccountId {
        self.config.treasury
    }

    pub fn is_signer(&self, who: &AccountId) -> bool {
        self.config.access.is_signer(who)
    }

    pub fn is_token_allowed(&self, token: &TokenId) -> bool {
        self.config.fees.is_token_allowed(token)
    }

    pub fn monthly_fee(&self, token: &TokenId) -> Option<u64> {
        self.config.fees.monthly_fee(token)
    }

    pub fn yearly_fee(&self, token: &TokenId) -> Option<u64> {
        self.config.fees.yearly_fee(token)
    }

    pub fn is_creation_consumed(&self, name: &str, nonce: u64) -> bool {
        self.authorization.is_consumed(name, nonce)
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn active_version(&self) -> &ModuleVersion {
        &self.active_version
    }

    pub fn implementation_address(
        &self,
        version: &ModuleVersion,
        selector: &Selector,
    ) -> Option<AccountId> {
        self.registry.implementation_address(version, selector)
    }

    pub fn vault(&self, id: &AccountId) -> Option<&VaultState> {
        self.vaults.get(id)
    }

    pub fn vaults(&self) -> impl Iterator<Item = &VaultState> {
        self.vaults.values()
    }

    pub fn vault_status(&self, id: &AccountId) -> Option<VaultStatus> {
        self.vaults.get(id).map(|v| v.status(self.clock.now()))
    }

    pub fn balance_of(&self, account: &AccountId, token: &TokenId) -> u64 {
        self.ledger.balance_of(account, token)
    }

    pub fn ledger(&self) -> &ValueLedger {
        &self.ledger
    }

    pub fn share_balance(&self, pool: &AccountId, holder: &AccountId) -> Option<u64> {
        self.pools.get(pool).map(|p| p.share_balance(holder))
    }

    pub fn underlying_balance(&self, pool: &AccountId, holder: &AccountId) -> Option<u64> {
        self.pools.get(pool).map(|p| p.underlying_balance(holder))
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("owner", &self.config.owner())
            .field("active_version", &self.active_version)
            .field("vaults", &self.vaults.len())
            .field("pools", &self.pools.len())
            .field("registry", &self.registry)
            .finish()
    }
}
