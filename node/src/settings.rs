//! # Fleet Settings
//!
//! The JSON document `pulsevault simulate --config` reads. Every field has
//! a default, so `{}` is a valid file and describes the stock scenario:
//! four heirs at 25 % each, 100 native units, and a 4 / 40 native fee.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use pulsevault_contracts::FleetConfig;
use pulsevault_protocol::config::SECONDS_PER_DAY;
use pulsevault_protocol::types::{AccountId, TokenId};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetSettings {
    /// Label the fleet owner's account is derived from.
    pub fleet_owner: String,
    pub grace_period_days: u64,
    pub fees: Vec<FeeSetting>,
    pub vault: VaultSettings,
    /// Simulated wall-clock start, unix seconds.
    pub start_unix: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSetting {
    pub token: TokenId,
    pub monthly: u64,
    pub yearly: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultSettings {
    pub name: String,
    pub owner: String,
    pub heirs: Vec<String>,
    /// Native basis points, one per heir.
    pub shares: Vec<u16>,
    pub lock_days: u64,
    /// Native units deposited before the owner goes quiet.
    pub deposit: u64,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            fleet_owner: "fleet-owner".into(),
            grace_period_days: 90,
            fees: vec![FeeSetting {
                token: TokenId::Native,
                monthly: 4,
                yearly: 40,
            }],
            vault: VaultSettings::default(),
            // 2026-01-01T00:00:00Z
            start_unix: 1_767_225_600,
        }
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            name: "family".into(),
            owner: "grandma".into(),
            heirs: ["alice", "bob", "carol", "dave"].map(String::from).to_vec(),
            shares: vec![2_500; 4],
            lock_days: 90,
            deposit: 100,
        }
    }
}

impl FleetSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid fleet settings in {}", path.display()))
    }

    /// Fleet configuration with `signer` as the only creation signer.
    pub fn fleet_config(&self, signer: AccountId) -> FleetConfig {
        let config = FleetConfig::new(AccountId::named(&self.fleet_owner))
            .with_signer(signer)
            .with_grace_period(self.grace_period_days.saturating_mul(SECONDS_PER_DAY));
        self.fees.iter().fold(config, |config, fee| {
            config.with_fee(fee.token.clone(), fee.monthly, fee.yearly)
        })
    }

    pub fn start(&self) -> Result<DateTime<Utc>> {
        Utc.timestamp_opt(self.start_unix, 0)
            .single()
            .with_context(|| format!("start_unix {} is out of range", self.start_unix))
    }
}

impl VaultSettings {
    pub fn owner_id(&self) -> AccountId {
        AccountId::named(&self.owner)
    }

    pub fn heir_ids(&self) -> Vec<AccountId> {
        self.heirs.iter().map(|h| AccountId::named(h)).collect()
    }

    pub fn lock_secs(&self) -> u64 {
        self.lock_days.saturating_mul(SECONDS_PER_DAY)
    }
}
