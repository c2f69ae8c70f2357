//! Engine Configuration

use serde::{Serialize, Deserialize};

use crate::core::growth::{DEFAULT_GROWTH_RATE, GrowthModel};
use crate::core::sampler::DEFAULT_CRASH_CAP;
use crate::game::history::{DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY, MIN_HISTORY_CAPACITY};
use crate::game::ledger::StakePolicy;

/// Pause between a crash and the next round (ms).
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1800;

/// Pause before the very first round (ms).
pub const DEFAULT_FIRST_ROUND_DELAY_MS: u64 = 600;

/// Lowest auto-cashout target accepted.
pub const DEFAULT_AUTO_CASHOUT_FLOOR: f64 = 1.01;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Why it was refused.
        reason: String,
    },

    /// JSON could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable could not be parsed.
    #[error("Invalid environment variable {var}={value:?}")]
    Env {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
}

/// Round engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Growth rate `k` of `m = exp(k * t)`.
    pub growth_rate: f64,
    /// Hard ceiling on sampled crash points.
    pub crash_cap: f64,
    /// Pause after a crash before the next round (ms).
    pub restart_delay_ms: u64,
    /// Pause before the first round (ms).
    pub first_round_delay_ms: u64,
    /// History entries kept (8 to 20).
    pub history_capacity: usize,
    /// Opening balance.
    pub starting_balance: f64,
    /// Accept stakes on a round that is already running.
    pub allow_late_entry: bool,
    /// Stake validation rules.
    pub stake: StakePolicy,
    /// Lowest auto-cashout target accepted.
    pub auto_cashout_floor: f64,
    /// Record cashouts in the history log alongside crashes.
    pub record_cash_outs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            growth_rate: DEFAULT_GROWTH_RATE,
            crash_cap: DEFAULT_CRASH_CAP,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            first_round_delay_ms: DEFAULT_FIRST_ROUND_DELAY_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            starting_balance: 1000.0,
            allow_late_entry: true,
            stake: StakePolicy::default(),
            auto_cashout_floor: DEFAULT_AUTO_CASHOUT_FLOOR,
            record_cash_outs: true,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON and validate. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if GrowthModel::new(self.growth_rate).is_none() {
            return Err(invalid("growth_rate", "must be finite and positive"));
        }
        if !self.crash_cap.is_finite() || self.crash_cap < 1.0 {
            return Err(invalid("crash_cap", "must be at least 1.0"));
        }
        if !(MIN_HISTORY_CAPACITY..=MAX_HISTORY_CAPACITY).contains(&self.history_capacity) {
            return Err(invalid("history_capacity", "must be between 8 and 20"));
        }
        if !self.starting_balance.is_finite() || self.starting_balance < 0.0 {
            return Err(invalid("starting_balance", "must be finite and non-negative"));
        }
        if !self.stake.min_stake.is_finite() || self.stake.min_stake <= 0.0 {
            return Err(invalid("stake.min_stake", "must be positive"));
        }
        if !self.auto_cashout_floor.is_finite() || self.auto_cashout_floor < 1.0 {
            return Err(invalid("auto_cashout_floor", "must be at least 1.0"));
        }
        Ok(())
    }

    /// Growth model for these settings.
    pub fn growth(&self) -> GrowthModel {
        GrowthModel::new(self.growth_rate).unwrap_or_default()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ledger::InvalidAmountPolicy;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "growth_rate": 0.3, "allow_late_entry": false, "stake": { "invalid_amount": "reject" } }"#,
        )
        .unwrap();

        assert_eq!(config.growth_rate, 0.3);
        assert!(!config.allow_late_entry);
        assert_eq!(config.stake.invalid_amount, InvalidAmountPolicy::Reject);
        assert_eq!(config.stake.min_stake, 1.0);
        assert_eq!(config.restart_delay_ms, DEFAULT_RESTART_DELAY_MS);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            r#"{ "growth_rate": 0.0 }"#,
            r#"{ "growth_rate": -1.0 }"#,
            r#"{ "crash_cap": 0.5 }"#,
            r#"{ "history_capacity": 0 }"#,
            r#"{ "history_capacity": 4 }"#,
            r#"{ "history_capacity": 30 }"#,
            r#"{ "starting_balance": -5.0 }"#,
            r#"{ "stake": { "min_stake": 0.0 } }"#,
            r#"{ "auto_cashout_floor": 0.9 }"#,
        ];
        for json in cases {
            assert!(
                matches!(EngineConfig::from_json(json), Err(ConfigError::InvalidValue { .. })),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }
}
