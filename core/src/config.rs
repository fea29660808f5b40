//! Startup-time configuration.
//!
//! Reward constants, the owner identity, and the store location are
//! fixed when the process starts — from environment variables or a JSON
//! file. There is no hot reload.

use crate::error::LedgerResult;
use crate::types::{Coins, UserId};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

/// Reward constants. Defaults match the production deployment values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Coins credited to the referrer per successful referral.
    #[serde(default = "default_referral_reward")]
    pub referral_reward: Coins,
    /// Coins credited to the referred account.
    #[serde(default = "default_referral_bonus")]
    pub referral_bonus: Coins,
    /// Coins per rupee.
    #[serde(default = "default_conversion_rate")]
    pub conversion_rate: Coins,
    /// Coins granted per daily-bonus claim.
    #[serde(default = "default_daily_bonus")]
    pub daily_bonus: Coins,
    /// Minimum withdrawal is `conversion_rate * min_withdrawal_multiplier`.
    #[serde(default = "default_min_withdrawal_multiplier")]
    pub min_withdrawal_multiplier: Coins,
}

fn default_referral_reward() -> Coins {
    10
}
fn default_referral_bonus() -> Coins {
    5
}
fn default_conversion_rate() -> Coins {
    10
}
fn default_daily_bonus() -> Coins {
    5
}
fn default_min_withdrawal_multiplier() -> Coins {
    10
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            referral_reward: default_referral_reward(),
            referral_bonus: default_referral_bonus(),
            conversion_rate: default_conversion_rate(),
            daily_bonus: default_daily_bonus(),
            min_withdrawal_multiplier: default_min_withdrawal_multiplier(),
        }
    }
}

impl RewardConfig {
    /// Smallest balance eligible for a withdrawal request, in coins.
    pub fn min_withdrawal(&self) -> Coins {
        self.conversion_rate * self.min_withdrawal_multiplier
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The single administrator id authorized to approve withdrawals
    /// and view admin aggregates. Compared, never authenticated.
    pub owner_id: UserId,
    /// Channels the transport's membership gate requires. The core
    /// never consults these; they are handed to the gate.
    #[serde(default)]
    pub required_channels: Vec<String>,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub rewards: RewardConfig,
}

fn default_db_path() -> String {
    "ledger.db".to_string()
}

impl LedgerConfig {
    /// Read configuration from the environment. `OWNER_ID` is required;
    /// everything else falls back to defaults.
    ///
    /// Recognized variables: `OWNER_ID`, `REQUIRED_CHANNELS` (comma
    /// separated), `LEDGER_DB`, `REFERRAL_REWARD`, `REFERRAL_BONUS`,
    /// `CONVERSION_RATE`, `DAILY_BONUS`, `MIN_WITHDRAWAL_MULTIPLIER`.
    pub fn from_env() -> LedgerResult<Self> {
        let owner_id = env::var("OWNER_ID")
            .context("OWNER_ID must be set")?
            .parse::<UserId>()
            .context("OWNER_ID must be a numeric user id")?;

        let required_channels = env::var("REQUIRED_CHANNELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let rewards = RewardConfig {
            referral_reward: env_coins("REFERRAL_REWARD", default_referral_reward())?,
            referral_bonus: env_coins("REFERRAL_BONUS", default_referral_bonus())?,
            conversion_rate: env_coins("CONVERSION_RATE", default_conversion_rate())?,
            daily_bonus: env_coins("DAILY_BONUS", default_daily_bonus())?,
            min_withdrawal_multiplier: env_coins(
                "MIN_WITHDRAWAL_MULTIPLIER",
                default_min_withdrawal_multiplier(),
            )?,
        };

        Ok(Self {
            owner_id,
            required_channels,
            db_path: env::var("LEDGER_DB").unwrap_or_else(|_| default_db_path()),
            rewards,
        })
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &str) -> LedgerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {path}"))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults used by the integration tests: in-memory store,
    /// owner id 42, production reward constants.
    pub fn test_defaults() -> Self {
        Self {
            owner_id: 42,
            required_channels: Vec::new(),
            db_path: ":memory:".to_string(),
            rewards: RewardConfig::default(),
        }
    }
}

fn env_coins(name: &str, default: Coins) -> LedgerResult<Coins> {
    match env::var(name) {
        Ok(raw) => Ok(raw
            .parse::<Coins>()
            .with_context(|| format!("{name} must be an integer"))?),
        Err(_) => Ok(default),
    }
}
