//! Crash Point Sampling
//!
//! Draws one hidden crash multiplier per round from a piecewise
//! heavy-tailed distribution:
//!
//! | Roll          | Share | Multiplier                            |
//! |---------------|-------|---------------------------------------|
//! | `[0.00,0.40)` | 40%   | uniform `[1.00, 1.99]`                |
//! | `[0.40,0.75)` | 35%   | uniform `[2.00, 10.00]`               |
//! | `[0.75,0.92)` | 17%   | uniform `[10.00, 60.00]`              |
//! | `[0.92,1.00)` | 8%    | `min(cap, 50 + 10 * (1/(1-u))^0.9)`   |
//!
//! Every result is rounded to two decimals and clamped to `[1.00, cap]`.

use serde::{Serialize, Deserialize};

/// Hard ceiling on any sampled crash multiplier.
pub const DEFAULT_CRASH_CAP: f64 = 1000.0;

/// Lowest possible crash multiplier.
pub const MIN_CRASH_MULTIPLIER: f64 = 1.0;

/// Exponent of the power-law tail.
const TAIL_EXPONENT: f64 = 0.9;

/// A source of uniform draws in `[0, 1)`.
pub trait UniformSource {
    /// Next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Anything the engine can draw a round's crash multiplier from.
pub trait CrashSource {
    /// Crash multiplier for the next round. Always `>= 1.0`.
    fn next_crash(&mut self) -> f64;
}

/// Multiplier range selected by the first roll.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Bucket {
    /// Uniform over `[low, low + span]`.
    Uniform {
        /// Lower bound.
        low: f64,
        /// Width of the range.
        span: f64,
    },
    /// Power-law tail above 50x.
    Tail,
}

/// Buckets keyed by the cumulative probability that closes them.
pub const BUCKETS: [(f64, Bucket); 4] = [
    (0.40, Bucket::Uniform { low: 1.0, span: 0.99 }),
    (0.75, Bucket::Uniform { low: 2.0, span: 8.0 }),
    (0.92, Bucket::Uniform { low: 10.0, span: 50.0 }),
    (1.00, Bucket::Tail),
];

/// Round to two decimals, the precision crash points are stored and compared at.
#[inline]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Largest whole-cent value not above `value`.
fn floor_cents(value: f64) -> f64 {
    let rounded = round_cents(value);
    if rounded > value {
        round_cents(rounded - 0.01)
    } else {
        rounded
    }
}

/// Pick the bucket for a roll in `[0, 1)`.
pub fn bucket_for(roll: f64) -> Bucket {
    BUCKETS
        .iter()
        .find(|(upper, _)| roll < *upper)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(Bucket::Tail)
}

/// Heavy-tailed crash sampler.
#[derive(Clone, Debug)]
pub struct CrashSampler<R> {
    rng: R,
    cap: f64,
}

impl<R: UniformSource> CrashSampler<R> {
    /// Create a sampler with the default 1000x cap.
    pub fn new(rng: R) -> Self {
        Self::with_cap(rng, DEFAULT_CRASH_CAP)
    }

    /// Create a sampler with a custom cap (never below 1.0).
    ///
    /// The cap is floored to whole cents so capped draws stay on the
    /// two-decimal grid.
    pub fn with_cap(rng: R, cap: f64) -> Self {
        Self {
            rng,
            cap: floor_cents(cap).max(MIN_CRASH_MULTIPLIER),
        }
    }

    /// Configured ceiling.
    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Underlying uniform source.
    pub fn rng(&self) -> &R {
        &self.rng
    }

    /// Draw one crash multiplier.
    pub fn sample(&mut self) -> f64 {
        let roll = self.rng.next_unit();
        let u = self.rng.next_unit();

        let raw = match bucket_for(roll) {
            Bucket::Uniform { low, span } => low + u * span,
            Bucket::Tail => {
                let tail = (1.0 / (1.0 - u)).powf(TAIL_EXPONENT);
                50.0 + tail * 10.0
            }
        };

        round_cents(raw.clamp(MIN_CRASH_MULTIPLIER, self.cap))
    }
}

impl<R: UniformSource> CrashSource for CrashSampler<R> {
    fn next_crash(&mut self) -> f64 {
        self.sample()
    }
}
