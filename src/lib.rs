//! # Crash Round Server
//!
//! Round engine for a single-player crash wager: a multiplier climbs from
//! 1.00x until a hidden, pre-sampled crash point; the player cashes out
//! before the crash or loses the stake.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CRASH ROUND SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  ├── growth.rs   - Exponential multiplier curve              │
//! │  └── sampler.rs  - Piecewise crash point distribution        │
//! │                                                              │
//! │  game/           - Round engine (deterministic)              │
//! │  ├── bet.rs      - Single stake record                       │
//! │  ├── ledger.rs   - Balance, stakes, cashout settlement       │
//! │  ├── history.rs  - Bounded outcome history                   │
//! │  ├── state.rs    - Engine state and commands                 │
//! │  ├── tick.rs     - Per-frame update                          │
//! │  ├── events.rs   - Round events                              │
//! │  └── config.rs   - Engine tuning                             │
//! │                                                              │
//! │  runtime/        - Host (non-deterministic)                  │
//! │  ├── config.rs   - Environment configuration                 │
//! │  └── driver.rs   - Tokio tick task and engine handle         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `game/` never read a clock or an unseeded RNG. Given the
//! same seed, the same command sequence and the same `now` timestamps,
//! the engine produces identical rounds, payouts and events.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod runtime;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use core::growth::GrowthModel;
pub use core::sampler::{CrashSampler, CrashSource};
pub use game::config::EngineConfig;
pub use game::state::{EngineSnapshot, RoundEngine, RoundState};
pub use runtime::{DriverConfig, EngineHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tick rate of the runtime driver (Hz)
pub const TICK_RATE: u32 = 60;
