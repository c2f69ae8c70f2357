//! Round Engine State
//!
//! The single object owning every piece of mutable game state: round
//! counter, active round, ledger (and through it the balance), history,
//! auto-cashout setting and the deferred start. Hosts drive it through
//! [`RoundEngine::on_tick`](crate::game::tick) and the command methods here.

use serde::{Serialize, Deserialize};

use crate::core::growth::GrowthModel;
use crate::core::rng::DeterministicRng;
use crate::core::sampler::{CrashSampler, CrashSource, MIN_CRASH_MULTIPLIER};
use crate::game::bet::Bet;
use crate::game::config::EngineConfig;
use crate::game::events::{CashOutTrigger, RoundEvent, StartReason};
use crate::game::history::{HistoryEntry, HistoryKind, HistoryLog};
use crate::game::ledger::{BetError, BetLedger, CashOut};

// =============================================================================
// ROUND STATE
// =============================================================================

/// Engine lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// No round running: before the first round, or momentarily between rounds.
    #[default]
    Idle,
    /// Multiplier is climbing.
    Running,
    /// Round is over; waiting for the restart.
    Crashed,
}

/// Status of a single round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Still climbing.
    Running,
    /// Crashed.
    Crashed,
}

/// One round of play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based round counter
    pub index: u64,

    /// Hidden crash point, rounded to two decimals
    pub crash_multiplier: f64,

    /// Planned lifetime derived from the crash point (ms, always > 0)
    pub duration_ms: f64,

    /// Engine time the round started at (ms)
    pub start_timestamp: u64,

    /// Running or crashed
    pub status: RoundStatus,
}

impl Round {
    /// Milliseconds since the round started.
    #[inline]
    pub fn elapsed_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.start_timestamp)
    }

    /// Fraction of the planned lifetime elapsed, in `[0, 1]`.
    #[inline]
    pub fn progress_at(&self, elapsed_ms: u64) -> f64 {
        (elapsed_ms as f64 / self.duration_ms).min(1.0)
    }

    /// Does this reading end the round?
    ///
    /// `progress` is the fallback for float drift in the multiplier compare.
    #[inline]
    pub fn crashes_at(&self, multiplier: f64, progress: f64) -> bool {
        multiplier >= self.crash_multiplier || progress >= 1.0
    }
}

/// A scheduled round start. Checked at the top of every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStart {
    /// Engine time at which the round starts (ms)
    pub due_at: u64,
    /// Why it was scheduled
    pub reason: StartReason,
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Everything the presentation layer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Lifecycle state.
    pub round_state: RoundState,
    /// Current round index (0 before the first round).
    pub round_index: u64,
    /// Live multiplier; 1.0 when idle, the crash point once crashed.
    pub current_multiplier: f64,
    /// Fraction of the round elapsed.
    pub progress: f64,
    /// History chip values, newest first.
    pub history: Vec<f64>,
    /// Player balance.
    pub balance: f64,
    /// Bets that can still be cashed out this round.
    pub open_bets: usize,
    /// Bets waiting for the next round.
    pub queued_bets: usize,
    /// Would a manual cashout do anything right now?
    pub can_cash_out: bool,
    /// Auto-cashout target, if enabled.
    pub auto_cashout_target: Option<f64>,
    /// Crash point, revealed only after the crash.
    pub crash_multiplier: Option<f64>,
    /// Next scheduled start.
    pub pending_start: Option<PendingStart>,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The round engine.
///
/// Generic over where crash points come from so tests can script them;
/// production uses a seeded [`CrashSampler`].
pub struct RoundEngine<S = CrashSampler<DeterministicRng>> {
    pub(crate) config: EngineConfig,
    pub(crate) growth: GrowthModel,
    pub(crate) source: S,

    pub(crate) state: RoundState,
    pub(crate) round_index: u64,
    pub(crate) round: Option<Round>,

    pub(crate) ledger: BetLedger,
    pub(crate) history: HistoryLog,

    /// Multiplier read by the most recent tick
    pub(crate) current_multiplier: f64,
    pub(crate) progress: f64,
    /// Timestamp of the most recent tick
    pub(crate) clock: u64,

    pub(crate) auto_target: Option<f64>,
    /// Auto-cashout still live for the current round
    pub(crate) auto_armed: bool,
    /// Auto-cashout already fired this round
    pub(crate) auto_fired: bool,

    pub(crate) pending_start: Option<PendingStart>,

    events: Vec<RoundEvent>,
}

impl RoundEngine {
    /// Create an engine drawing crash points from a seeded sampler.
    pub fn new(config: EngineConfig, seed: u64) -> Self {
        let sampler = CrashSampler::with_cap(DeterministicRng::new(seed), config.crash_cap);
        Self::with_source(config, sampler)
    }
}

impl<S: CrashSource> RoundEngine<S> {
    /// Create an idle engine with an explicit crash source.
    pub fn with_source(config: EngineConfig, source: S) -> Self {
        Self {
            growth: config.growth(),
            ledger: BetLedger::new(config.starting_balance, config.stake),
            history: HistoryLog::new(config.history_capacity),
            config,
            source,
            state: RoundState::Idle,
            round_index: 0,
            round: None,
            current_multiplier: 1.0,
            progress: 0.0,
            clock: 0,
            auto_target: None,
            auto_armed: false,
            auto_fired: false,
            pending_start: None,
            events: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Lifecycle state.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Current round index (0 before the first round).
    pub fn round_index(&self) -> u64 {
        self.round_index
    }

    /// Active or last round.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Multiplier read by the most recent tick.
    pub fn current_multiplier(&self) -> f64 {
        self.current_multiplier
    }

    /// Progress read by the most recent tick.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Player balance.
    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    /// Stake records.
    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    /// Outcome history.
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Configured auto-cashout target.
    pub fn auto_cashout_target(&self) -> Option<f64> {
        self.auto_target
    }

    /// Is auto-cashout still live for this round?
    pub fn auto_cashout_armed(&self) -> bool {
        self.auto_armed
    }

    /// Scheduled start, if any.
    pub fn pending_start(&self) -> Option<PendingStart> {
        self.pending_start
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Growth model in use.
    pub fn growth(&self) -> &GrowthModel {
        &self.growth
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Stake `amount`.
    ///
    /// While a round runs the stake joins it (if late entry is allowed);
    /// otherwise it rides on the next round.
    pub fn place_bet(&mut self, amount: f64) -> Result<Bet, BetError> {
        let for_round = match self.state {
            RoundState::Running if self.config.allow_late_entry => self.round_index,
            RoundState::Running => return Err(BetError::EntryClosed),
            RoundState::Idle | RoundState::Crashed => self.round_index + 1,
        };

        let bet = self.ledger.place(amount, for_round)?;
        self.push_event(RoundEvent::bet_placed(
            self.round_index,
            self.clock,
            bet.id,
            bet.amount,
            for_round,
        ));
        Ok(bet)
    }

    /// Cash out every open bet at the multiplier of the most recent tick.
    ///
    /// `None` when no round is running or nothing is open.
    pub fn request_cash_out(&mut self) -> Option<CashOut> {
        if self.state != RoundState::Running {
            return None;
        }
        self.cash_out(CashOutTrigger::Manual)
    }

    /// Set or clear the auto-cashout target. Returns the stored value.
    ///
    /// Targets are raised to the configured floor; a non-finite target
    /// is read as the floor. Setting a target mid-round arms it for the
    /// current round unless auto-cashout already fired in it.
    pub fn set_auto_cashout_target(&mut self, target: Option<f64>) -> Option<f64> {
        let floor = self.config.auto_cashout_floor;
        let target = target.map(|t| if t.is_finite() { t.max(floor) } else { floor });

        self.auto_target = target;
        if self.state == RoundState::Running {
            self.auto_armed = target.is_some() && !self.auto_fired;
        }
        target
    }

    /// Schedule the first round after the configured delay.
    ///
    /// No-op unless the engine is idle with nothing scheduled.
    pub fn schedule_first_round(&mut self, now: u64) -> Option<PendingStart> {
        if self.state != RoundState::Idle || self.pending_start.is_some() {
            return None;
        }
        self.clock = self.clock.max(now);
        Some(self.schedule_start(now, self.config.first_round_delay_ms, StartReason::FirstRound))
    }

    /// Cancel the scheduled start, if any. A cancelled start never fires.
    pub fn cancel_pending_start(&mut self) -> Option<PendingStart> {
        let pending = self.pending_start.take()?;
        self.push_event(RoundEvent::start_cancelled(self.round_index, self.clock, pending.due_at));
        Some(pending)
    }

    /// Current presentation snapshot.
    pub fn snapshot(&self) -> EngineSnapshot {
        let (current_multiplier, progress, crash_multiplier) = match self.state {
            RoundState::Idle => (1.0, 0.0, None),
            RoundState::Running => (self.current_multiplier, self.progress, None),
            RoundState::Crashed => {
                let crash = self.round.as_ref().map(|r| r.crash_multiplier);
                (crash.unwrap_or(self.current_multiplier), 1.0, crash)
            }
        };
        let open_bets = self.ledger.open_bets().count();

        EngineSnapshot {
            round_state: self.state,
            round_index: self.round_index,
            current_multiplier,
            progress,
            history: self.history.values(),
            balance: self.ledger.balance(),
            open_bets,
            queued_bets: self.ledger.queued_bets().count(),
            can_cash_out: self.state == RoundState::Running && open_bets > 0,
            auto_cashout_target: self.auto_target,
            crash_multiplier,
            pending_start: self.pending_start,
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Queue an event.
    pub(crate) fn push_event(&mut self, event: RoundEvent) {
        self.events.push(event);
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Transitions (driven by tick)
    // -------------------------------------------------------------------------

    pub(crate) fn schedule_start(&mut self, now: u64, delay_ms: u64, reason: StartReason) -> PendingStart {
        let pending = PendingStart {
            due_at: now.saturating_add(delay_ms),
            reason,
        };
        self.pending_start = Some(pending);
        self.push_event(RoundEvent::start_scheduled(self.round_index, now, pending.due_at, reason));
        pending
    }

    /// IDLE -> RUNNING. A crashed engine passes through IDLE first.
    pub(crate) fn start_round(&mut self, now: u64) {
        self.pending_start = None;
        self.state = RoundState::Idle;

        let crash_multiplier = self.source.next_crash().max(MIN_CRASH_MULTIPLIER);
        let duration_ms = self.growth.duration_ms(crash_multiplier);

        self.round_index += 1;
        self.ledger.reset(self.round_index);
        self.round = Some(Round {
            index: self.round_index,
            crash_multiplier,
            duration_ms,
            start_timestamp: now,
            status: RoundStatus::Running,
        });

        self.current_multiplier = 1.0;
        self.progress = 0.0;
        self.auto_armed = self.auto_target.is_some();
        self.auto_fired = false;
        self.state = RoundState::Running;

        let carried = self.ledger.open_bets().count();
        self.push_event(RoundEvent::round_started(self.round_index, now, carried));
    }

    /// RUNNING -> CRASHED. Forfeits open bets, records history, schedules the restart.
    pub(crate) fn crash(&mut self, now: u64) {
        let crash_multiplier = match self.round.as_mut() {
            Some(round) => {
                round.status = RoundStatus::Crashed;
                round.crash_multiplier
            }
            None => return,
        };

        self.state = RoundState::Crashed;
        self.auto_armed = false;

        let forfeit = self.ledger.settle_crash();
        self.history.push(HistoryEntry {
            value: crash_multiplier,
            kind: HistoryKind::Crash,
            round: self.round_index,
        });

        self.push_event(RoundEvent::crashed(
            self.round_index,
            now,
            crash_multiplier,
            forfeit.bets,
            forfeit.stake,
        ));

        self.schedule_start(now, self.config.restart_delay_ms, StartReason::AfterCrash);
    }

    /// Cash out open bets at the current tick's multiplier.
    pub(crate) fn cash_out(&mut self, trigger: CashOutTrigger) -> Option<CashOut> {
        let cash_out = self.ledger.cash_out_all(self.current_multiplier)?;

        if self.config.record_cash_outs && cash_out.payout > 0.0 {
            self.history.push(HistoryEntry {
                value: cash_out.multiplier,
                kind: HistoryKind::CashOut,
                round: self.round_index,
            });
        }

        self.push_event(RoundEvent::cashed_out(
            self.round_index,
            self.clock,
            trigger,
            cash_out.multiplier,
            cash_out.payout,
            cash_out.bets.clone(),
        ));
        Some(cash_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::RoundEventData;

    /// Crash points served in order, then 1000x forever.
    struct Scripted(Vec<f64>);

    impl CrashSource for Scripted {
        fn next_crash(&mut self) -> f64 {
            if self.0.is_empty() {
                1000.0
            } else {
                self.0.remove(0)
            }
        }
    }

    fn engine(crashes: &[f64]) -> RoundEngine<Scripted> {
        RoundEngine::with_source(EngineConfig::default(), Scripted(crashes.to_vec()))
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = engine(&[]);
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.round_state, RoundState::Idle);
        assert_eq!(snapshot.round_index, 0);
        assert_eq!(snapshot.current_multiplier, 1.0);
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(snapshot.balance, 1000.0);
        assert!(snapshot.history.is_empty());
        assert!(!snapshot.can_cash_out);
        assert!(engine.pending_start().is_none());
    }

    #[test]
    fn test_start_round_sets_up_round() {
        let mut engine = engine(&[2.0]);
        engine.start_round(500);

        let round = engine.round().unwrap();
        assert_eq!(round.index, 1);
        assert_eq!(round.crash_multiplier, 2.0);
        assert_eq!(round.start_timestamp, 500);
        assert!((round.duration_ms - 3150.67).abs() < 0.01);
        assert_eq!(engine.state(), RoundState::Running);
    }

    #[test]
    fn test_bet_while_idle_rides_next_round() {
        let mut engine = engine(&[3.0]);
        let bet = engine.place_bet(100.0).unwrap();
        assert_eq!(bet.placed_in_round, 1);
        assert_eq!(engine.snapshot().queued_bets, 1);

        // Not cashable before its round
        assert!(engine.request_cash_out().is_none());

        engine.start_round(0);
        assert_eq!(engine.ledger().open_bets().count(), 1);
        assert_eq!(engine.balance(), 900.0);
    }

    #[test]
    fn test_late_entry_policy() {
        let mut engine = engine(&[5.0]);
        engine.start_round(0);
        assert_eq!(engine.place_bet(10.0).unwrap().placed_in_round, 1);

        let config = EngineConfig {
            allow_late_entry: false,
            ..Default::default()
        };
        let mut strict = RoundEngine::with_source(config, Scripted(vec![5.0]));
        strict.place_bet(10.0).unwrap();
        strict.start_round(0);

        assert_eq!(strict.place_bet(10.0), Err(BetError::EntryClosed));
        assert_eq!(strict.balance(), 990.0);
    }

    #[test]
    fn test_cash_out_noop_when_not_running() {
        let mut engine = engine(&[2.0]);
        engine.place_bet(100.0).unwrap();
        assert!(engine.request_cash_out().is_none());
        assert_eq!(engine.balance(), 900.0);
    }

    #[test]
    fn test_auto_target_floor_and_disable() {
        let mut engine = engine(&[]);
        assert_eq!(engine.set_auto_cashout_target(Some(0.5)), Some(1.01));
        assert_eq!(engine.set_auto_cashout_target(Some(f64::NAN)), Some(1.01));
        assert_eq!(engine.set_auto_cashout_target(Some(2.5)), Some(2.5));
        assert_eq!(engine.set_auto_cashout_target(None), None);
        assert!(!engine.auto_cashout_armed());
    }

    #[test]
    fn test_auto_armed_per_round() {
        let mut engine = engine(&[5.0, 5.0]);
        engine.set_auto_cashout_target(Some(1.5));
        assert!(!engine.auto_cashout_armed(), "not armed while idle");

        engine.start_round(0);
        assert!(engine.auto_cashout_armed());

        engine.set_auto_cashout_target(None);
        assert!(!engine.auto_cashout_armed());

        engine.set_auto_cashout_target(Some(3.0));
        assert!(engine.auto_cashout_armed());
    }

    #[test]
    fn test_fired_auto_cashout_stays_disarmed_for_round() {
        let mut engine = engine(&[50.0, 50.0]);
        engine.set_auto_cashout_target(Some(1.5));
        engine.start_round(0);
        engine.place_bet(100.0).unwrap();

        let fired = engine.on_tick(2000);
        assert!(fired.multiplier.unwrap() >= 1.5);
        assert_eq!(engine.balance(), 900.0 + 100.0 * fired.multiplier.unwrap());
        assert!(!engine.auto_cashout_armed());

        // Re-sending the target mid-round must not re-arm it
        assert_eq!(engine.set_auto_cashout_target(Some(1.5)), Some(1.5));
        assert!(!engine.auto_cashout_armed());
        engine.place_bet(100.0).unwrap();
        let result = engine.on_tick(3000);
        assert!(!result
            .events
            .iter()
            .any(|e| matches!(e.data, RoundEventData::CashedOut { .. })));
        assert_eq!(engine.ledger().open_bets().count(), 1);

        // Next round arms again
        engine.crash(4000);
        engine.start_round(6000);
        assert!(engine.auto_cashout_armed());
    }

    #[test]
    fn test_schedule_and_cancel_first_round() {
        let mut engine = engine(&[]);
        let pending = engine.schedule_first_round(100).unwrap();
        assert_eq!(pending.due_at, 700);
        assert_eq!(pending.reason, StartReason::FirstRound);

        // Already scheduled
        assert!(engine.schedule_first_round(200).is_none());

        assert_eq!(engine.cancel_pending_start(), Some(pending));
        assert!(engine.pending_start().is_none());
        assert!(engine.cancel_pending_start().is_none());

        let events = engine.take_events();
        assert!(matches!(events[0].data, RoundEventData::StartScheduled { due_at: 700, .. }));
        assert!(matches!(events[1].data, RoundEventData::StartCancelled { due_at: 700 }));
    }

    #[test]
    fn test_crash_hides_then_reveals() {
        let mut engine = engine(&[4.2]);
        engine.start_round(0);
        assert_eq!(engine.snapshot().crash_multiplier, None);

        engine.crash(1000);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.round_state, RoundState::Crashed);
        assert_eq!(snapshot.crash_multiplier, Some(4.2));
        assert_eq!(snapshot.current_multiplier, 4.2);
        assert_eq!(snapshot.progress, 1.0);
        assert_eq!(snapshot.history, vec![4.2]);
        assert_eq!(engine.round().unwrap().status, RoundStatus::Crashed);
    }

    #[test]
    fn test_events_drained_once() {
        let mut engine = engine(&[]);
        engine.place_bet(5.0).unwrap();
        assert_eq!(engine.take_events().len(), 1);
        assert!(engine.take_events().is_empty());
    }
}
