//! Round Events
//!
//! Emitted by the engine on every transition and command outcome so hosts
//! can log, broadcast or animate without polling the engine.

use serde::{Serialize, Deserialize};

use crate::game::bet::BetId;

/// Why a deferred round start was scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartReason {
    /// First round after the engine came up.
    FirstRound,
    /// Pause after a crash.
    AfterCrash,
}

/// What triggered a cashout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashOutTrigger {
    /// Player request.
    Manual,
    /// Auto-cashout target reached.
    Auto,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEventData {
    /// A round began. The crash point stays hidden.
    RoundStarted {
        stakes_carried: usize,
    },

    /// A stake was accepted.
    BetPlaced {
        bet_id: BetId,
        amount: f64,
        /// Round the stake rides on
        for_round: u64,
    },

    /// Open bets were cashed out.
    CashedOut {
        trigger: CashOutTrigger,
        multiplier: f64,
        payout: f64,
        bets: Vec<BetId>,
    },

    /// The round crashed.
    Crashed {
        crash_multiplier: f64,
        forfeited_bets: usize,
        forfeited_stake: f64,
    },

    /// A deferred start was scheduled.
    StartScheduled {
        due_at: u64,
        reason: StartReason,
    },

    /// A deferred start was cancelled before firing.
    StartCancelled {
        due_at: u64,
    },
}

/// An event tagged with round and time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundEvent {
    /// Round index when the event happened (0 before the first round)
    pub round: u64,

    /// Engine timestamp (ms)
    pub at: u64,

    /// Event data
    pub data: RoundEventData,
}

impl RoundEvent {
    /// Create a new event.
    pub fn new(round: u64, at: u64, data: RoundEventData) -> Self {
        Self { round, at, data }
    }

    /// Create round started event.
    pub fn round_started(round: u64, at: u64, stakes_carried: usize) -> Self {
        Self::new(round, at, RoundEventData::RoundStarted { stakes_carried })
    }

    /// Create bet placed event.
    pub fn bet_placed(round: u64, at: u64, bet_id: BetId, amount: f64, for_round: u64) -> Self {
        Self::new(round, at, RoundEventData::BetPlaced { bet_id, amount, for_round })
    }

    /// Create cashed out event.
    pub fn cashed_out(
        round: u64,
        at: u64,
        trigger: CashOutTrigger,
        multiplier: f64,
        payout: f64,
        bets: Vec<BetId>,
    ) -> Self {
        Self::new(
            round,
            at,
            RoundEventData::CashedOut {
                trigger,
                multiplier,
                payout,
                bets,
            },
        )
    }

    /// Create crashed event.
    pub fn crashed(
        round: u64,
        at: u64,
        crash_multiplier: f64,
        forfeited_bets: usize,
        forfeited_stake: f64,
    ) -> Self {
        Self::new(
            round,
            at,
            RoundEventData::Crashed {
                crash_multiplier,
                forfeited_bets,
                forfeited_stake,
            },
        )
    }

    /// Create start scheduled event.
    pub fn start_scheduled(round: u64, at: u64, due_at: u64, reason: StartReason) -> Self {
        Self::new(round, at, RoundEventData::StartScheduled { due_at, reason })
    }

    /// Create start cancelled event.
    pub fn start_cancelled(round: u64, at: u64, due_at: u64) -> Self {
        Self::new(round, at, RoundEventData::StartCancelled { due_at })
    }

    /// Is this a crash?
    pub fn is_crash(&self) -> bool {
        matches!(self.data, RoundEventData::Crashed { .. })
    }
}
