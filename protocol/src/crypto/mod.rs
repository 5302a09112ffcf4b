//! # Cryptographic Primitives
//!
//! Everything signature- and hash-shaped in PulseVault goes through here:
//!
//! - **Ed25519** for creation signatures and signer identities.
//! - **SHA-256** for the creation digest signers sign.
//! - **BLAKE3** for deriving internal identifiers.
//!
//! All of it is a thin wrapper over audited crates. Nothing in this
//! module is clever, and it should stay that way.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, creation_digest, derive_id, sha256};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
pub use signatures::{sign_creation, CreationSignature, SignatureError};
