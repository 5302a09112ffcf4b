// Copyright (c) 2026 PulseVault Contributors. MIT License.
// See LICENSE for details.

//! # PulseVault Protocol: Primitives
//!
//! The boring, load-bearing layer underneath PulseVault's custody vaults.
//! Nothing here knows what a beneficiary is. It knows how to name an
//! account, hash a creation request, check an Ed25519 signature and tell
//! the time.
//!
//! ## Modules
//!
//! - **config**: fleet constants (lock bounds, basis points, billing increments).
//! - **crypto**: Ed25519 keys, creation signatures, SHA-256 / BLAKE3 helpers.
//! - **types**: `AccountId`, `TokenId`, `Selector`, `ModuleVersion`.
//! - **clock**: Injected time source, real or manual.
//!
//! ## Ground rules
//!
//! 1. No unsafe code. There is nothing here fast enough to need it.
//! 2. Identifiers serialize as strings, so they can key JSON maps.
//! 3. If it is a duration or a percentage, it is a constant in `config`.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{AccountId, IdError, ModuleVersion, Selector, TokenId};
