//! # Fleet Constants
//!
//! Every magic number in PulseVault lives here: lock bounds, billing
//! increments, basis-point arithmetic and id-derivation domains. If a
//! duration or a percentage shows up as a literal anywhere else, it
//! belongs in this file instead.
//!
//! Changing any of these after vaults exist changes the rules under
//! people's inheritance plans. Treat them as part of the protocol, not
//! as tuning knobs.

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Shortest lock period a vault may be configured with: 31 days.
///
/// Anything shorter and a vacation without internet becomes an
/// inheritance event.
pub const MIN_LOCK_SECS: u64 = 31 * SECONDS_PER_DAY;

/// Longest lock period a vault may be configured with: two years.
pub const MAX_LOCK_SECS: u64 = 2 * 365 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Basis points that make up 100.00 %. Every share vector sums to this.
pub const BASIS_POINTS_TOTAL: u32 = 10_000;

/// Maximum number of beneficiaries per vault. Keeps claim bookkeeping and
/// distribution vectors bounded.
pub const MAX_BENEFICIARIES: usize = 64;

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

/// How far a monthly payment pushes `paid_until`: 30 days.
pub const BILLING_MONTH_SECS: u64 = 30 * SECONDS_PER_DAY;

/// How far a yearly payment pushes `paid_until`: 365 days.
pub const BILLING_YEAR_SECS: u64 = 365 * SECONDS_PER_DAY;

/// Free period granted to every newly created vault: 90 days.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 90 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Width of an operation selector in bytes.
pub const SELECTOR_LENGTH: usize = 4;

/// Version tag the built-in module set is registered under on a fresh fleet.
pub const GENESIS_MODULE_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Domain separation tag prepended when deriving vault identifiers, so a
/// vault ID can never collide with an ID derived for something else.
pub const VAULT_ID_DOMAIN: &str = "pulsevault/vault/v1";

/// Domain tag for module implementation addresses.
pub const MODULE_ID_DOMAIN: &str = "pulsevault/module/v1";

/// Domain tag for external pool identifiers.
pub const POOL_ID_DOMAIN: &str = "pulsevault/pool/v1";

/// Domain tag for the fleet treasury account, derived from the fleet owner.
pub const TREASURY_ID_DOMAIN: &str = "pulsevault/treasury/v1";

/// Domain tag for accounts derived from a plain label (fixtures, simulation).
pub const LABEL_ID_DOMAIN: &str = "pulsevault/label/v1";

/// Fixed-point scale for pool exchange rates (underlying per share).
pub const EXCHANGE_RATE_SCALE: u128 = 1_000_000_000_000_000_000;
