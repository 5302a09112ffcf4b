//! # PulseVault Contracts
//!
//! Custody vaults with a dead-man's switch, and the fleet manager that
//! creates, routes, and bills them.
//!
//! - **Succession**: a vault holds value for an owner who must pulse
//!   periodically. Once the lock period passes without a pulse, each
//!   beneficiary may claim its basis-point share of every token, once per
//!   claim cycle.
//! - **Manager**: authorizes vault creation against fleet signers, owns
//!   the module registry and the value ledger, and collects upkeep fees.
//! - **Registry**: append-only module versions. Each vault runs the
//!   version it chose, so upgrades are opt-in.
//! - **Yield**: vaults may park value in an external interest pool and
//!   redeem it later.
//!
//! ## Design Principles
//!
//! 1. Amounts are `u64` and every addition is checked.
//! 2. A failed operation changes nothing. Modules work on a draft of the
//!    vault and emit effects; the manager commits state, then settles.
//! 3. Errors are typed into four kinds (authorization, validation, state,
//!    routing) so callers can branch on what went wrong.
//! 4. Every public type is serializable (serde) for reports and fixtures.

pub mod access_control;
pub mod authorization;
pub mod billing;
pub mod call;
pub mod error;
pub mod fleet;
pub mod ledger;
pub mod manager;
pub mod modules;
pub mod registry;
pub mod succession;
pub mod yield_adapter;

pub use call::{Effect, Receipt, VaultCall};
pub use error::{ContractError, ContractResult, ErrorKind};
pub use fleet::FleetConfig;
pub use manager::{vault_address, CreateVaultRequest, Manager};
pub use succession::{VaultState, VaultStatus};
