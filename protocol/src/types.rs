//! # Core Identifiers
//!
//! The small value types every other layer passes around: accounts,
//! tokens, operation selectors and module versions.
//!
//! `AccountId` serializes as a hex string rather than a byte array so it
//! can key JSON maps (claim flags, balances) without a custom map adapter.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{LABEL_ID_DOMAIN, SELECTOR_LENGTH};
use crate::crypto::hash::{blake3_hash, derive_id};
use crate::crypto::keys::PublicKey;

/// Errors when parsing identifiers from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid account id: expected 64 hex characters")]
    InvalidAccount,

    #[error("invalid selector: expected 4 bytes of hex")]
    InvalidSelector,

    #[error("empty module version tag")]
    EmptyVersion,

    #[error("empty token symbol")]
    EmptySymbol,

    #[error("token symbol {0:?} is reserved for the native token")]
    ReservedSymbol(String),
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A 32-byte actor identifier: owner, beneficiary, signer, payer, vault,
/// pool or treasury. Nothing more than an address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The account controlled by an Ed25519 key: the BLAKE3 hash of the
    /// public key bytes.
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self(blake3_hash(key.as_bytes()))
    }

    /// Derive a non-key account (vault, pool, module) from a domain tag
    /// and identifying parts.
    pub fn derive(domain: &str, parts: &[&[u8]]) -> Self {
        Self(derive_id(domain, parts))
    }

    /// Convenience for fixtures: the account derived from a label.
    pub fn named(label: &str) -> Self {
        Self::derive(LABEL_ID_DOMAIN, &[label.as_bytes()])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let bytes = hex::decode(s.trim()).map_err(|_| IdError::InvalidAccount)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdError::InvalidAccount)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({}..)", &self.to_hex()[..12])
    }
}

impl FromStr for AccountId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// A transferable asset. `Native` is the fleet's base value and the
/// fallback distribution for every other token.
///
/// Serialized as a plain string (`"native"` or the asset symbol) so it can
/// key JSON maps. An asset whose symbol reads as `native` in any case would
/// come back as [`TokenId::Native`], so such symbols fail [`TokenId::check`]
/// and never make it into fleet state.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenId {
    Native,
    Asset(String),
}

impl TokenId {
    const NATIVE_TAG: &'static str = "native";

    pub fn asset(symbol: impl Into<String>) -> Self {
        Self::Asset(symbol.into())
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Whether this token survives its own string form unchanged.
    pub fn check(&self) -> Result<(), IdError> {
        match self {
            Self::Native => Ok(()),
            Self::Asset(symbol) if symbol.trim().is_empty() => Err(IdError::EmptySymbol),
            Self::Asset(symbol) if symbol.eq_ignore_ascii_case(Self::NATIVE_TAG) => {
                Err(IdError::ReservedSymbol(symbol.clone()))
            }
            Self::Asset(_) => Ok(()),
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "{}", Self::NATIVE_TAG),
            Self::Asset(symbol) => write!(f, "{}", symbol),
        }
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case(Self::NATIVE_TAG) {
            Self::Native
        } else {
            Self::Asset(s.to_string())
        }
    }
}

impl FromStr for TokenId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = Self::from(s);
        token.check()?;
        Ok(token)
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// A fixed-width operation identifier: the first four bytes of the BLAKE3
/// hash of the operation's name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector([u8; SELECTOR_LENGTH]);

impl Selector {
    pub const fn from_bytes(bytes: [u8; SELECTOR_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Selector for the operation named `name`.
    ///
    /// ```
    /// use pulsevault_protocol::types::Selector;
    ///
    /// assert_eq!(Selector::of("pulse"), Selector::of("pulse"));
    /// assert_ne!(Selector::of("pulse"), Selector::of("withdraw"));
    /// ```
    pub fn of(name: &str) -> Self {
        let hash = blake3_hash(name.as_bytes());
        let mut bytes = [0u8; SELECTOR_LENGTH];
        bytes.copy_from_slice(&hash[..SELECTOR_LENGTH]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SELECTOR_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| IdError::InvalidSelector)?;
        let arr: [u8; SELECTOR_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdError::InvalidSelector)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector(0x{})", self.to_hex())
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ModuleVersion
// ---------------------------------------------------------------------------

/// Human-readable version tag, e.g. `"1.0.0"`. Compared as an opaque
/// string; the registry does not interpret it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ModuleVersion(String);

impl ModuleVersion {
    pub fn new(tag: impl Into<String>) -> Result<Self, IdError> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(IdError::EmptyVersion);
        }
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl TryFrom<String> for ModuleVersion {
    type Error = IdError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        Self::new(tag)
    }
}

impl From<ModuleVersion> for String {
    fn from(version: ModuleVersion) -> Self {
        version.0
    }
}

impl FromStr for ModuleVersion {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use std::collections::BTreeMap;

    #[test]
    fn account_hex_roundtrip() {
        let id = AccountId::named("alice");
        assert_eq!(AccountId::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(id.to_string().parse::<AccountId>().unwrap(), id);
    }

    #[test]
    fn account_rejects_short_hex() {
        assert_eq!(AccountId::from_hex("abcd"), Err(IdError::InvalidAccount));
    }

    #[test]
    fn account_from_key_is_stable() {
        let kp = Keypair::from_seed(&[3u8; 32]);
        assert_eq!(
            AccountId::from_public_key(&kp.public_key()),
            AccountId::from_public_key(&kp.public_key())
        );
    }

    #[test]
    fn accounts_key_json_maps() {
        let mut map = BTreeMap::new();
        map.insert(AccountId::named("bob"), 7u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<AccountId, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn token_string_form() {
        assert_eq!(TokenId::from("native"), TokenId::Native);
        assert_eq!(TokenId::from("USDC"), TokenId::asset("USDC"));
        assert_eq!(TokenId::asset("DAI").to_string(), "DAI");
        let json = serde_json::to_string(&TokenId::Native).unwrap();
        assert_eq!(json, "\"native\"");
    }

    #[test]
    fn native_lookalike_symbols_fail_check() {
        assert_eq!(
            TokenId::asset("NATIVE").check(),
            Err(IdError::ReservedSymbol("NATIVE".into()))
        );
        assert_eq!(TokenId::asset(" ").check(), Err(IdError::EmptySymbol));
        assert!(TokenId::asset("USDC").check().is_ok());
        assert!(TokenId::Native.check().is_ok());
        assert_eq!("Native".parse::<TokenId>().unwrap(), TokenId::Native);
        assert!(serde_json::from_str::<TokenId>("\"\"").is_err());
    }

    #[test]
    fn native_sorts_first() {
        assert!(TokenId::Native < TokenId::asset("AAA"));
    }

    #[test]
    fn selector_display_roundtrip() {
        let sel = Selector::of("withdraw");
        assert_eq!(Selector::from_hex(&sel.to_string()).unwrap(), sel);
        assert!(Selector::from_hex("0x0102").is_err());
    }

    #[test]
    fn empty_version_rejected() {
        assert_eq!(ModuleVersion::new("  "), Err(IdError::EmptyVersion));
        assert_eq!(ModuleVersion::new("2.0.0").unwrap().as_str(), "2.0.0");
    }

    #[test]
    fn empty_version_rejected_on_deserialize() {
        assert!(serde_json::from_str::<ModuleVersion>("\"\"").is_err());
        let v: ModuleVersion = serde_json::from_str("\"1.0.0\"").unwrap();
        assert_eq!(v.as_str(), "1.0.0");
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1.0.0\"");
    }
}
