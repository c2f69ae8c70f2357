//! Multiplier Growth Curve
//!
//! Maps elapsed round time to the live multiplier and back:
//! `m = exp(k * t)` and `t = ln(m) / k`.

use serde::{Serialize, Deserialize};

/// Default growth rate `k` (per second).
///
/// A 2.00x round lasts ~3.15 s; a 10.00x round ~10.5 s.
pub const DEFAULT_GROWTH_RATE: f64 = 0.22;

/// Floor applied to the multiplier before taking its logarithm.
///
/// Keeps `multiplier_to_time` strictly positive for a 1.00x crash.
pub const MIN_LOG_MULTIPLIER: f64 = 1.0001;

/// Exponential growth model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthModel {
    rate: f64,
}

impl Default for GrowthModel {
    fn default() -> Self {
        Self { rate: DEFAULT_GROWTH_RATE }
    }
}

impl GrowthModel {
    /// Create a model with growth rate `k`.
    ///
    /// Returns `None` unless `k` is finite and positive.
    pub fn new(rate: f64) -> Option<Self> {
        if rate.is_finite() && rate > 0.0 {
            Some(Self { rate })
        } else {
            None
        }
    }

    /// Growth rate `k`.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Multiplier after `seconds` of growth. Negative time reads as zero.
    #[inline]
    pub fn time_to_multiplier(&self, seconds: f64) -> f64 {
        (self.rate * seconds.max(0.0)).exp()
    }

    /// Seconds needed to reach `multiplier`.
    #[inline]
    pub fn multiplier_to_time(&self, multiplier: f64) -> f64 {
        multiplier.max(MIN_LOG_MULTIPLIER).ln() / self.rate
    }

    /// Multiplier after `elapsed_ms` milliseconds.
    #[inline]
    pub fn multiplier_at(&self, elapsed_ms: u64) -> f64 {
        self.time_to_multiplier(elapsed_ms as f64 / 1000.0)
    }

    /// Planned lifetime in milliseconds of a round crashing at `multiplier`.
    #[inline]
    pub fn duration_ms(&self, multiplier: f64) -> f64 {
        self.multiplier_to_time(multiplier) * 1000.0
    }
}
