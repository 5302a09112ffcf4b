//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **SHA-256** builds the vault-creation digest that signers sign. It is
//!   the format external tooling (the operator binary, wallets, scripts)
//!   reproduces, so it stays on the boring, universally available hash.
//!
//! - **BLAKE3** derives internal identifiers: vault IDs, module addresses,
//!   pool IDs, operation selectors. Nothing outside the fleet ever needs
//!   to recompute those from scratch.
//!
//! ## Creation digest
//!
//! ```text
//! digest = SHA-256( SHA-256(name) || nonce as 8 big-endian bytes )
//! ```
//!
//! Hashing the name first fixes its width, so `("ab", 1)` and `("a", ...)`
//! can never produce the same preimage.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input and return a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// The message a signer signs to authorize creation of a vault named
/// `name` with creation nonce `nonce`.
///
/// # Example
///
/// ```
/// use pulsevault_protocol::crypto::hash::creation_digest;
///
/// let a = creation_digest("family-vault", 1);
/// let b = creation_digest("family-vault", 2);
/// assert_ne!(a, b);
/// ```
pub fn creation_digest(name: &str, nonce: u64) -> [u8; 32] {
    let name_hash = sha256(name.as_bytes());
    let mut preimage = [0u8; 40];
    preimage[..32].copy_from_slice(&name_hash);
    preimage[32..].copy_from_slice(&nonce.to_be_bytes());
    sha256(&preimage)
}

/// Derive a 32-byte identifier from a domain tag and a list of parts.
///
/// Each part is length-prefixed (u32 big-endian) before hashing, so the
/// boundary between parts is unambiguous.
pub fn derive_id(domain: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(domain.len() as u32).to_be_bytes());
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update(&(part.len() as u32).to_be_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc"), FIPS 180-2 appendix B.1.
        let expected =
            hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
                .unwrap();
        assert_eq!(sha256(b"abc").to_vec(), expected);
    }

    #[test]
    fn creation_digest_is_deterministic() {
        assert_eq!(creation_digest("vault", 7), creation_digest("vault", 7));
    }

    #[test]
    fn creation_digest_binds_name_and_nonce() {
        let base = creation_digest("vault", 7);
        assert_ne!(base, creation_digest("vault", 8));
        assert_ne!(base, creation_digest("vault2", 7));
    }

    #[test]
    fn creation_digest_matches_manual_construction() {
        let mut preimage = sha256(b"grandma-vault").to_vec();
        preimage.extend_from_slice(&42u64.to_be_bytes());
        assert_eq!(creation_digest("grandma-vault", 42), sha256(&preimage));
    }

    #[test]
    fn derive_id_separates_domains() {
        let a = derive_id("one", &[b"x"]);
        let b = derive_id("two", &[b"x"]);
        assert_ne!(a, b);
    }

    #[test]
    fn derive_id_part_boundaries_matter() {
        let a = derive_id("d", &[b"ab", b"c"]);
        let b = derive_id("d", &[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn blake3_output_length() {
        assert_eq!(blake3_hash(b"pulse").len(), 32);
    }
}
