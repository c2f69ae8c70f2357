//! Driver Configuration
//!
//! Engine settings plus the host-side knobs (tick interval, seed), loaded
//! from the environment.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::core::rng::derive_seed;
use crate::game::config::{ConfigError, EngineConfig};
use crate::TICK_RATE;

/// Inline JSON for the whole engine section.
pub const CONFIG_JSON_VAR: &str = "CRASH_CONFIG_JSON";
/// Seed phrase (or a plain integer seed).
pub const SEED_VAR: &str = "CRASH_SEED";

/// Default seed phrase.
const DEFAULT_SEED_PHRASE: &str = "crash-round";

/// Host configuration for a [`EngineHandle`](crate::runtime::EngineHandle).
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Engine settings.
    pub engine: EngineConfig,
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Seed for the crash sampler.
    pub seed: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            tick_interval: Duration::from_micros(1_000_000 / TICK_RATE as u64),
            seed: derive_seed(DEFAULT_SEED_PHRASE.as_bytes()),
        }
    }
}

impl DriverConfig {
    /// Load from process environment.
    ///
    /// Without `CRASH_SEED` the seed is taken from the wall clock so each
    /// run plays a different sequence.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_vars(|var| std::env::var(var).ok())?;
        if std::env::var(SEED_VAR).is_err() {
            config.seed = clock_seed();
        }
        Ok(config)
    }

    /// Load from an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(json) = lookup(CONFIG_JSON_VAR) {
            config.engine = EngineConfig::from_json(&json)?;
        }

        let engine = &mut config.engine;
        if let Some(v) = parse_var(&lookup, "CRASH_GROWTH_RATE")? {
            engine.growth_rate = v;
        }
        if let Some(v) = parse_var(&lookup, "CRASH_CAP")? {
            engine.crash_cap = v;
        }
        if let Some(v) = parse_var(&lookup, "CRASH_RESTART_DELAY_MS")? {
            engine.restart_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "CRASH_HISTORY_CAPACITY")? {
            engine.history_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "CRASH_STARTING_BALANCE")? {
            engine.starting_balance = v;
        }
        if let Some(raw) = lookup("CRASH_ALLOW_LATE_ENTRY") {
            engine.allow_late_entry = parse_flag("CRASH_ALLOW_LATE_ENTRY", &raw)?;
        }
        engine.validate()?;

        if let Some(ms) = parse_var::<u64, _>(&lookup, "CRASH_TICK_MS")? {
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "tick_interval",
                    reason: "must be at least 1 ms".to_string(),
                });
            }
            config.tick_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(SEED_VAR) {
            config.seed = raw
                .trim()
                .parse::<u64>()
                .unwrap_or_else(|_| derive_seed(raw.as_bytes()));
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Env {
            var: var.to_string(),
            value: raw,
        }),
    }
}

fn parse_flag(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn clock_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    derive_seed(&nanos.to_le_bytes())
}
