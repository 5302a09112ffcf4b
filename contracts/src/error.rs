//! # Contract Errors
//!
//! Every rejected operation maps to exactly one of four families, and the
//! family tells the caller what went wrong:
//!
//! - **Authorization**: right call, wrong caller.
//! - **Validation**: malformed input: lengths, sums, unknown tokens.
//! - **State**: valid input, wrong moment: vault still alive, already
//!   claimed, version already registered.
//! - **Routing**: nothing is bound to the requested operation.
//!
//! Errors abort the whole operation. Nothing in this crate retries.

use pulsevault_protocol::types::{AccountId, IdError, ModuleVersion, Selector, TokenId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Families
// ---------------------------------------------------------------------------

/// Wrong caller role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("caller is not the vault owner")]
    OnlyOwner,

    #[error("caller is not the fleet owner")]
    OnlyFleetOwner,

    /// The caller is not in the vault's beneficiary list.
    #[error("{0} is not a beneficiary of this vault")]
    NotBeneficiary(AccountId),

    #[error("creation signature does not verify")]
    InvalidSignature,

    /// The signature verifies, but its key is not a current signer.
    #[error("{0} is not an authorized signer")]
    UnknownSigner(AccountId),

    /// This `(name, nonce)` pair already created a vault.
    #[error("creation request ({name}, {nonce}) has already been used")]
    NonceConsumed {
        /// Vault name in the creation request.
        name: String,
        /// Creation nonce.
        nonce: u64,
    },
}

/// Malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Two parallel arrays do not line up.
    #[error("length mismatch in {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which argument is the wrong length.
        what: &'static str,
        /// Length implied by the other arguments.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A share vector does not add up to 100.00 %.
    #[error("shares for {token} sum to {sum} basis points, expected 10000")]
    ShareSum {
        /// Token whose slice is wrong.
        token: TokenId,
        /// Actual sum in basis points.
        sum: u32,
    },

    #[error("beneficiary list is empty")]
    EmptyBeneficiaries,

    #[error("too many beneficiaries: {count} (max {max})")]
    TooManyBeneficiaries { count: usize, max: usize },

    #[error("beneficiary {0} listed twice")]
    DuplicateBeneficiary(AccountId),

    #[error("token {0} listed twice")]
    DuplicateToken(TokenId),

    #[error("invalid token: {0}")]
    InvalidToken(IdError),

    #[error("token {0} is not allowed for fee payment")]
    TokenNotAllowed(TokenId),

    /// The token has no explicit distribution to update or remove.
    #[error("token {0} has no explicit distribution")]
    UnknownDistribution(TokenId),

    #[error("new registered-token set does not match the old set minus removed tokens")]
    RegisteredSetMismatch,

    #[error("beneficiary update must include the native distribution")]
    MissingNativeDistribution,

    #[error("unknown vault {0}")]
    UnknownVault(AccountId),

    #[error("vault {0} already exists")]
    VaultExists(AccountId),

    #[error("no module deployed at {0}")]
    UnknownModule(AccountId),

    #[error("module version {0} is not registered")]
    UnknownVersion(ModuleVersion),

    #[error("selector {0} appears twice in one registration")]
    DuplicateSelector(Selector),

    #[error("a module version needs at least one selector")]
    EmptyImplementation,

    #[error("unknown pool {0}")]
    UnknownPool(AccountId),

    /// A module emitted pool effects that cannot be rolled back.
    #[error("{count} pool effect(s) in one call; at most one, and only as the last effect")]
    UnsettleablePoolEffects { count: usize },

    #[error("insufficient {token}: requested {requested}, available {available}")]
    InsufficientFunds {
        token: TokenId,
        requested: u64,
        available: u64,
    },

    #[error("insufficient {token} allowance: requested {requested}, approved {approved}")]
    InsufficientAllowance {
        token: TokenId,
        requested: u64,
        approved: u64,
    },

    #[error("insufficient pool shares: requested {requested}, held {held}")]
    InsufficientShares { requested: u64, held: u64 },

    #[error("amount rounds to zero pool shares")]
    DustAmount,

    #[error("arithmetic overflow")]
    AmountOverflow,
}

/// Operation not valid in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The owner has pulsed recently enough.
    #[error("vault is not claimable for another {remaining_secs}s")]
    NotClaimable { remaining_secs: u64 },

    #[error("{beneficiary} already claimed {token} in this cycle")]
    AlreadyClaimed {
        beneficiary: AccountId,
        token: TokenId,
    },

    #[error("lock period {requested}s outside [{min}s, {max}s]")]
    LockOutOfBounds { requested: u64, min: u64, max: u64 },

    /// Versions are append-only. A tag is registered once.
    #[error("module version {0} is already registered")]
    VersionExists(ModuleVersion),

    #[error("the native distribution is the fallback and cannot be removed")]
    FallbackDistribution,
}

/// Nothing bound to the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no implementation for {selector} in version {version}")]
    NoImplementation {
        version: ModuleVersion,
        selector: Selector,
    },

    /// The registry bound a selector to a module that does not handle it.
    #[error("module {module} does not handle {selector}")]
    UnsupportedCall {
        module: &'static str,
        selector: Selector,
    },
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// The error every contract operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("authorization: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("state: {0}")]
    State(#[from] StateError),

    #[error("routing: {0}")]
    Routing(#[from] RoutingError),
}

/// The family of a [`ContractError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Authorization,
    Validation,
    State,
    Routing,
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Authorization(_) => ErrorKind::Authorization,
            ContractError::Validation(_) => ErrorKind::Validation,
            ContractError::State(_) => ErrorKind::State,
            ContractError::Routing(_) => ErrorKind::Routing,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Authorization => write!(f, "AuthorizationError"),
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::State => write!(f, "StateError"),
            ErrorKind::Routing => write!(f, "RoutingError"),
        }
    }
}

/// Shorthand used throughout the crate.
pub type ContractResult<T> = Result<T, ContractError>;
