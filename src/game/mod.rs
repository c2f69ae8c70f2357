//! Game Logic Module
//!
//! The round engine. Pure and clock-free: the host supplies every timestamp.
//!
//! ## Module Structure
//!
//! - `bet`: A single stake and its cashout record
//! - `ledger`: Balance, stake validation, cashout and forfeit settlement
//! - `history`: Bounded newest-first outcome log
//! - `state`: Round engine, lifecycle state, snapshots, commands
//! - `tick`: Per-frame update
//! - `events`: Round events for hosts and logs
//! - `config`: Engine tuning

pub mod bet;
pub mod ledger;
pub mod history;
pub mod state;
pub mod tick;
pub mod events;
pub mod config;


// Re-export key types
pub use bet::{Bet, BetId};
pub use ledger::{BetError, BetLedger, CashOut, Forfeit, InvalidAmountPolicy, StakePolicy, StakePreset};
pub use history::{ChipTier, HistoryEntry, HistoryKind, HistoryLog};
pub use state::{EngineSnapshot, PendingStart, Round, RoundEngine, RoundState, RoundStatus};
pub use tick::{tick, simulate, TickResult};
pub use events::{CashOutTrigger, RoundEvent, RoundEventData, StartReason};
pub use config::{ConfigError, EngineConfig};
