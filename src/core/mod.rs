//! Core deterministic primitives.
//!
//! Nothing in this module reads a clock or touches engine state.
//! Given the same seed, the same crash points come out on every platform.

pub mod rng;
pub mod growth;
pub mod sampler;

// Re-export core types
pub use rng::{DeterministicRng, derive_seed};
pub use growth::GrowthModel;
pub use sampler::{CrashSampler, CrashSource, UniformSource, round_cents};
