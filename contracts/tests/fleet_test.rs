//! Integration tests for fleet-level behavior: creation authorization,
//! upkeep billing, module upgrades, and yield pools.

use std::sync::Arc;

use pulsevault_contracts::error::{
    AuthorizationError, ContractResult, RoutingError, StateError, ValidationError,
};
use pulsevault_contracts::modules::{BaseModule, CallContext, VaultModule};
use pulsevault_contracts::registry::module_address;
use pulsevault_contracts::yield_adapter::InterestPool;
use pulsevault_contracts::{
    vault_address, ContractError, CreateVaultRequest, Effect, ErrorKind, FleetConfig, Manager,
    VaultCall,
};
use pulsevault_protocol::clock::ManualClock;
use pulsevault_protocol::config::{EXCHANGE_RATE_SCALE, SECONDS_PER_DAY};
use pulsevault_protocol::crypto::keys::Keypair;
use pulsevault_protocol::crypto::signatures::sign_creation;
use pulsevault_protocol::types::{AccountId, ModuleVersion, Selector, TokenId};

const LOCK: u64 = 60 * SECONDS_PER_DAY;

struct Fleet {
    manager: Manager,
    clock: Arc<ManualClock>,
    signer: Keypair,
    admin: AccountId,
}

fn fleet() -> Fleet {
    let admin = AccountId::named("fleet-owner");
    let signer = Keypair::from_seed(&[9u8; 32]);
    let config = FleetConfig::new(admin)
        .with_signer(AccountId::from_public_key(&signer.public_key()))
        .with_fee(TokenId::Native, 4, 40);
    let clock = Arc::new(ManualClock::at_unix(1_760_000_000));
    let manager = Manager::new(config, clock.clone()).unwrap();
    Fleet {
        manager,
        clock,
        signer,
        admin,
    }
}

fn owner() -> AccountId {
    AccountId::named("owner")
}

fn request(signer: &Keypair, name: &str, nonce: u64) -> CreateVaultRequest {
    CreateVaultRequest {
        owner: owner(),
        beneficiaries: vec![AccountId::named("heir")],
        shares: vec![10_000],
        lock_secs: LOCK,
        name: name.into(),
        nonce,
        signature: sign_creation(signer, name, nonce),
    }
}

fn v(tag: &str) -> ModuleVersion {
    ModuleVersion::new(tag).unwrap()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn creation_request_cannot_be_replayed() {
    let mut f = fleet();
    let req = request(&f.signer, "home", 7);

    let vault = f.manager.create_vault(req.clone()).unwrap();
    assert_eq!(vault, vault_address("home", 7));

    // Long after, the identical request is still spent.
    f.clock.advance_secs(1_000 * SECONDS_PER_DAY);
    let err = f.manager.create_vault(req).unwrap_err();
    assert_eq!(
        err,
        ContractError::Authorization(AuthorizationError::NonceConsumed {
            name: "home".into(),
            nonce: 7,
        })
    );
    assert_eq!(f.manager.vaults().count(), 1);
}

#[test]
fn creation_needs_a_fleet_signer() {
    let mut f = fleet();
    let rogue = Keypair::from_seed(&[1u8; 32]);
    let err = f.manager.create_vault(request(&rogue, "home", 1)).unwrap_err();
    assert!(matches!(
        err,
        ContractError::Authorization(AuthorizationError::UnknownSigner(_))
    ));

    // A signature over a different nonce does not transfer.
    let mut forged = request(&f.signer, "home", 1);
    forged.nonce = 2;
    let err = f.manager.create_vault(forged).unwrap_err();
    assert_eq!(
        err,
        ContractError::Authorization(AuthorizationError::InvalidSignature)
    );
    assert!(!f.manager.is_creation_consumed("home", 1));
    assert!(!f.manager.is_creation_consumed("home", 2));
}

#[test]
fn signer_set_is_managed_by_fleet_owner() {
    let mut f = fleet();
    let admin = f.admin;
    let second = Keypair::from_seed(&[2u8; 32]);
    let second_id = AccountId::from_public_key(&second.public_key());

    assert!(f.manager.add_signer(&owner(), second_id).is_err());
    f.manager.add_signer(&admin, second_id).unwrap();
    f.manager.add_signer(&admin, second_id).unwrap();
    assert!(f.manager.is_signer(&second_id));
    f.manager.create_vault(request(&second, "a", 1)).unwrap();

    f.manager.delete_signer(&admin, &second_id).unwrap();
    let err = f.manager.create_vault(request(&second, "b", 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

#[test]
fn monthly_and_yearly_fees_extend_upkeep() {
    let mut f = fleet();
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    f.manager.deposit(vault, &TokenId::Native, 100).unwrap();
    let start = f.manager.vault(&vault).unwrap().paid_until();

    f.manager
        .call(owner(), vault, VaultCall::PayMonthlyFee { token: TokenId::Native })
        .unwrap();
    assert_eq!(f.manager.balance_of(&vault, &TokenId::Native), 96);
    let after_month = f.manager.vault(&vault).unwrap().paid_until();
    assert_eq!((after_month - start).num_days(), 30);

    f.manager
        .call(owner(), vault, VaultCall::PayYearlyFee { token: TokenId::Native })
        .unwrap();
    assert_eq!(f.manager.balance_of(&vault, &TokenId::Native), 56);
    let after_year = f.manager.vault(&vault).unwrap().paid_until();
    assert_eq!((after_year - after_month).num_days(), 365);
    assert_eq!(
        f.manager.balance_of(&f.manager.treasury(), &TokenId::Native),
        44
    );
}

#[test]
fn fee_in_unlisted_token_is_rejected() {
    let mut f = fleet();
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    let doge = TokenId::asset("DOGE");
    f.manager.deposit(vault, &doge, 1_000).unwrap();
    let before = f.manager.vault(&vault).unwrap().paid_until();

    let err = f
        .manager
        .call(owner(), vault, VaultCall::PayMonthlyFee { token: doge.clone() })
        .unwrap_err();
    assert_eq!(
        err,
        ContractError::Validation(ValidationError::TokenNotAllowed(doge.clone()))
    );
    assert_eq!(f.manager.vault(&vault).unwrap().paid_until(), before);
    assert_eq!(f.manager.balance_of(&vault, &doge), 1_000);
}

#[test]
fn fee_tokens_are_configurable() {
    let mut f = fleet();
    let admin = f.admin;
    let usdc = TokenId::asset("USDC");
    assert!(!f.manager.is_token_allowed(&usdc));

    f.manager.allow_token(&admin, usdc.clone(), 5, 50).unwrap();
    assert!(f.manager.is_token_allowed(&usdc));
    assert_eq!(f.manager.monthly_fee(&usdc), Some(5));
    assert_eq!(f.manager.yearly_fee(&usdc), Some(50));
    assert_eq!(f.manager.monthly_fee(&TokenId::asset("DOGE")), None);
}

#[test]
fn anyone_can_pay_upkeep_from_an_allowance() {
    let mut f = fleet();
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    let friend = AccountId::named("friend");
    let usdc = TokenId::asset("USDC");
    let admin = f.admin;
    f.manager.allow_token(&admin, usdc.clone(), 5, 50).unwrap();
    f.manager.deposit(friend, &usdc, 100).unwrap();
    let before = f.manager.vault(&vault).unwrap().paid_until();

    // Nothing approved yet.
    let err = f.manager.pay_yearly_fee(friend, vault, &usdc).unwrap_err();
    assert!(matches!(
        err,
        ContractError::Validation(ValidationError::InsufficientAllowance { .. })
    ));
    assert_eq!(f.manager.vault(&vault).unwrap().paid_until(), before);

    f.manager.approve(friend, &usdc, 50);
    let paid_until = f.manager.pay_yearly_fee(friend, vault, &usdc).unwrap();
    assert_eq!((paid_until - before).num_days(), 365);
    assert_eq!(f.manager.balance_of(&friend, &usdc), 50);
    assert_eq!(f.manager.balance_of(&f.manager.treasury(), &usdc), 50);

    // Allowance is spent.
    assert!(f.manager.pay_monthly_fee(friend, vault, &usdc).is_err());
}

#[test]
fn admin_pay_grants_months() {
    let mut f = fleet();
    let admin = f.admin;
    let a = f.manager.create_vault(request(&f.signer, "a", 1)).unwrap();
    let b = f.manager.create_vault(request(&f.signer, "b", 1)).unwrap();
    let a0 = f.manager.vault(&a).unwrap().paid_until();
    let b0 = f.manager.vault(&b).unwrap().paid_until();

    f.manager.admin_pay(&admin, &[a, b, a], &[2, 12, 1]).unwrap();
    assert_eq!((f.manager.vault(&a).unwrap().paid_until() - a0).num_days(), 90);
    assert_eq!((f.manager.vault(&b).unwrap().paid_until() - b0).num_days(), 360);

    let err = f.manager.admin_pay(&admin, &[a, b], &[1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // One unknown vault spoils the whole batch.
    let ghost = AccountId::named("ghost");
    let err = f.manager.admin_pay(&admin, &[a, ghost], &[1, 1]).unwrap_err();
    assert_eq!(
        err,
        ContractError::Validation(ValidationError::UnknownVault(ghost))
    );
    assert_eq!((f.manager.vault(&a).unwrap().paid_until() - a0).num_days(), 90);
}

#[test]
fn treasury_pays_out_to_fleet_owner_order() {
    let mut f = fleet();
    let admin = f.admin;
    let treasury = f.manager.treasury();
    f.manager.deposit(treasury, &TokenId::Native, 10).unwrap();
    let ops = AccountId::named("ops");

    assert!(f
        .manager
        .transfer(&owner(), ops, &TokenId::Native, 1)
        .is_err());
    f.manager.transfer(&admin, ops, &TokenId::Native, 7).unwrap();
    assert_eq!(f.manager.balance_of(&ops, &TokenId::Native), 7);
    assert!(f.manager.transfer(&admin, ops, &TokenId::Native, 4).is_err());
}

// ---------------------------------------------------------------------------
// Upgrades
// ---------------------------------------------------------------------------

/// A pulse that also stretches the lock to its current value plus a day.
struct GenerousPulse;

impl VaultModule for GenerousPulse {
    fn name(&self) -> &'static str {
        "generous-pulse"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![Selector::of("pulse")]
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &VaultCall) -> ContractResult<()> {
        let caller = ctx.caller;
        match call {
            VaultCall::Pulse => {
                ctx.vault.pulse(&caller, ctx.now)?;
                let lock = ctx.vault.lock_secs() + SECONDS_PER_DAY;
                ctx.vault.update_lock(&caller, lock)
            }
            _ => Err(RoutingError::UnsupportedCall {
                module: "generous-pulse",
                selector: call.selector(),
            }
            .into()),
        }
    }
}

#[test]
fn vaults_opt_into_new_versions() {
    let mut f = fleet();
    let admin = f.admin;
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();

    let generous = f.manager.deploy_module(&admin, Arc::new(GenerousPulse)).unwrap();
    let base = module_address(BaseModule::NAME);
    f.manager
        .set_new_version_implementation(
            &admin,
            v("2.0.0"),
            &[Selector::of("pulse"), Selector::of("setVersion")],
            &[generous, base],
        )
        .unwrap();
    assert_eq!(
        f.manager
            .implementation_address(&v("2.0.0"), &Selector::of("pulse")),
        Some(generous)
    );

    // Still on 1.0.0: plain pulse.
    f.manager.call(owner(), vault, VaultCall::Pulse).unwrap();
    assert_eq!(f.manager.vault(&vault).unwrap().lock_secs(), LOCK);

    f.manager
        .call(owner(), vault, VaultCall::SetVersion { version: v("2.0.0") })
        .unwrap();
    f.manager.call(owner(), vault, VaultCall::Pulse).unwrap();
    assert_eq!(
        f.manager.vault(&vault).unwrap().lock_secs(),
        LOCK + SECONDS_PER_DAY
    );

    // 2.0.0 dropped updateLock.
    let err = f
        .manager
        .call(owner(), vault, VaultCall::UpdateLock { lock_secs: LOCK })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Routing);

    // Back to genesis.
    f.manager
        .call(owner(), vault, VaultCall::SetVersion { version: v("1.0.0") })
        .unwrap();
    f.manager
        .call(owner(), vault, VaultCall::UpdateLock { lock_secs: LOCK })
        .unwrap();
}

#[test]
fn registered_versions_are_immutable() {
    let mut f = fleet();
    let admin = f.admin;
    let base = module_address(BaseModule::NAME);
    let pulse = Selector::of("pulse");

    f.manager
        .set_new_version_implementation(&admin, v("2.0.0"), &[pulse], &[base])
        .unwrap();
    let generous = f.manager.deploy_module(&admin, Arc::new(GenerousPulse)).unwrap();
    let err = f
        .manager
        .set_new_version_implementation(&admin, v("2.0.0"), &[pulse], &[generous])
        .unwrap_err();
    assert!(matches!(
        err,
        ContractError::State(StateError::VersionExists(_))
    ));
    assert_eq!(f.manager.implementation_address(&v("2.0.0"), &pulse), Some(base));
}

#[test]
fn active_version_binds_new_vaults() {
    let mut f = fleet();
    let admin = f.admin;
    let base = module_address(BaseModule::NAME);

    let err = f.manager.set_active_version(&admin, v("9.9.9")).unwrap_err();
    assert_eq!(
        err,
        ContractError::Validation(ValidationError::UnknownVersion(v("9.9.9")))
    );

    f.manager
        .set_new_version_implementation(&admin, v("1.1.0"), &[Selector::of("pulse")], &[base])
        .unwrap();
    f.manager.set_active_version(&admin, v("1.1.0")).unwrap();
    let vault = f.manager.create_vault(request(&f.signer, "late", 1)).unwrap();
    assert_eq!(f.manager.vault(&vault).unwrap().version(), &v("1.1.0"));

    let err = f
        .manager
        .call(owner(), vault, VaultCall::SetVersion { version: v("1.0.0") })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Routing);
}

#[test]
fn set_version_requires_a_registered_version() {
    let mut f = fleet();
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    let err = f
        .manager
        .call(owner(), vault, VaultCall::SetVersion { version: v("3.0.0") })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(f.manager.vault(&vault).unwrap().version(), &v("1.0.0"));
}

// ---------------------------------------------------------------------------
// Yield
// ---------------------------------------------------------------------------

#[test]
fn vault_earns_in_an_external_pool() {
    let mut f = fleet();
    let admin = f.admin;
    let dai = TokenId::asset("DAI");
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    f.manager.deposit(vault, &dai, 1_000).unwrap();
    let pool = f
        .manager
        .register_pool(
            &admin,
            Box::new(InterestPool::new("savings", dai.clone()).with_exchange_rate(EXCHANGE_RATE_SCALE)),
        )
        .unwrap();

    f.manager
        .call(owner(), vault, VaultCall::Supply { pool, amount: 600 })
        .unwrap();
    assert_eq!(f.manager.balance_of(&vault, &dai), 400);
    assert_eq!(f.manager.share_balance(&pool, &vault), Some(600));

    // 5 %.
    f.manager.accrue_pool_interest(&pool, 500).unwrap();
    assert_eq!(f.manager.underlying_balance(&pool, &vault), Some(630));

    f.manager
        .call(
            owner(),
            vault,
            VaultCall::Redeem {
                pool,
                amount: 105,
                share_units: false,
            },
        )
        .unwrap();
    assert_eq!(f.manager.balance_of(&vault, &dai), 505);
    assert_eq!(f.manager.share_balance(&pool, &vault), Some(500));

    f.manager
        .call(owner(), vault, VaultCall::RedeemAll { pool })
        .unwrap();
    assert_eq!(f.manager.balance_of(&vault, &dai), 1_030);
    assert_eq!(f.manager.share_balance(&pool, &vault), Some(0));
}

#[test]
fn supplying_more_than_held_changes_nothing() {
    let mut f = fleet();
    let admin = f.admin;
    let dai = TokenId::asset("DAI");
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    f.manager.deposit(vault, &dai, 10).unwrap();
    let pool = f
        .manager
        .register_pool(&admin, Box::new(InterestPool::new("savings", dai.clone())))
        .unwrap();

    let err = f
        .manager
        .call(owner(), vault, VaultCall::Supply { pool, amount: 11 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(f.manager.balance_of(&vault, &dai), 10);
    assert_eq!(f.manager.share_balance(&pool, &vault), Some(0));
}

/// Splits one supply into two pool effects.
struct SplitSupply;

impl VaultModule for SplitSupply {
    fn name(&self) -> &'static str {
        "split-supply"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![Selector::of("supply")]
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &VaultCall) -> ContractResult<()> {
        let VaultCall::Supply { pool, amount } = call else {
            return Err(RoutingError::UnsupportedCall {
                module: "split-supply",
                selector: call.selector(),
            }
            .into());
        };
        let holder = ctx.vault.id();
        for part in [amount / 2, amount - amount / 2] {
            ctx.emit(Effect::Supply {
                pool: *pool,
                holder,
                amount: part,
            });
        }
        Ok(())
    }
}

#[test]
fn second_pool_effect_in_one_call_is_refused() {
    let mut f = fleet();
    let admin = f.admin;
    let dai = TokenId::asset("DAI");
    let vault = f.manager.create_vault(request(&f.signer, "home", 1)).unwrap();
    f.manager.deposit(vault, &dai, 10).unwrap();
    let pool = f
        .manager
        .register_pool(&admin, Box::new(InterestPool::new("savings", dai.clone())))
        .unwrap();

    let split = f.manager.deploy_module(&admin, Arc::new(SplitSupply)).unwrap();
    let base = module_address(BaseModule::NAME);
    f.manager
        .set_new_version_implementation(
            &admin,
            v("1.0.1"),
            &[Selector::of("supply"), Selector::of("setVersion")],
            &[split, base],
        )
        .unwrap();
    f.manager
        .call(owner(), vault, VaultCall::SetVersion { version: v("1.0.1") })
        .unwrap();

    let err = f
        .manager
        .call(owner(), vault, VaultCall::Supply { pool, amount: 10 })
        .unwrap_err();
    assert_eq!(
        err,
        ContractError::Validation(ValidationError::UnsettleablePoolEffects { count: 2 })
    );
    assert_eq!(f.manager.balance_of(&vault, &dai), 10);
    assert_eq!(f.manager.share_balance(&pool, &vault), Some(0));
}
