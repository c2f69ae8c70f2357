//! Engine Driver
//!
//! Runs a [`RoundEngine`] on a tokio task: ticks it at a fixed interval,
//! serializes player commands through a lock, and broadcasts a snapshot
//! plus drained events after every tick.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::rng::DeterministicRng;
use crate::core::sampler::{CrashSampler, CrashSource};
use crate::game::bet::Bet;
use crate::game::events::{RoundEvent, RoundEventData};
use crate::game::ledger::{BetError, CashOut};
use crate::game::state::{EngineSnapshot, RoundEngine};
use crate::runtime::config::DriverConfig;

/// Capacity of the update channel. Slow subscribers skip ahead.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Driver errors.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The tick task panicked or was cancelled.
    #[error("Engine task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Broadcast after every tick.
#[derive(Debug, Clone, Serialize)]
pub struct EngineUpdate {
    /// Engine time of the tick (ms since the driver started)
    pub at: u64,
    /// State after the tick
    pub snapshot: EngineSnapshot,
    /// Events drained by the tick
    pub events: Vec<RoundEvent>,
}

/// Handle to a running engine.
///
/// Dropping the handle leaves the task running; call [`EngineHandle::shutdown`].
pub struct EngineHandle<S> {
    engine: Arc<RwLock<RoundEngine<S>>>,
    epoch: Instant,
    updates_tx: broadcast::Sender<EngineUpdate>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl EngineHandle<CrashSampler<DeterministicRng>> {
    /// Build a seeded engine from `config` and start driving it.
    pub fn spawn(config: DriverConfig) -> Self {
        let engine = RoundEngine::new(config.engine, config.seed);
        Self::spawn_engine(engine, config.tick_interval)
    }
}

impl<S: CrashSource + Send + Sync + 'static> EngineHandle<S> {
    /// Start driving an existing engine. Schedules the first round.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_engine(mut engine: RoundEngine<S>, tick_interval: Duration) -> Self {
        engine.schedule_first_round(0);

        let engine = Arc::new(RwLock::new(engine));
        let epoch = Instant::now();
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(run_tick_loop(
            engine.clone(),
            epoch,
            tick_interval,
            updates_tx.clone(),
            shutdown_tx.subscribe(),
        ));

        info!("Round engine started, ticking every {:?}", tick_interval);

        Self {
            engine,
            epoch,
            updates_tx,
            shutdown_tx,
            task,
        }
    }

    /// Milliseconds since the driver started.
    pub fn now_ms(&self) -> u64 {
        elapsed_ms(self.epoch)
    }

    /// Stake `amount` on the current or next round.
    pub async fn place_bet(&self, amount: f64) -> Result<Bet, BetError> {
        self.engine.write().await.place_bet(amount)
    }

    /// Cash out every open bet at the last tick's multiplier.
    pub async fn request_cash_out(&self) -> Option<CashOut> {
        self.engine.write().await.request_cash_out()
    }

    /// Set or clear the auto-cashout target.
    pub async fn set_auto_cashout_target(&self, target: Option<f64>) -> Option<f64> {
        self.engine.write().await.set_auto_cashout_target(target)
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> EngineSnapshot {
        self.engine.read().await.snapshot()
    }

    /// Subscribe to per-tick updates.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineUpdate> {
        self.updates_tx.subscribe()
    }

    /// Stop ticking, wait for the task, then cancel any scheduled start.
    ///
    /// No tick runs after the cancel, so no start can be left pending.
    /// Returns the final snapshot.
    pub async fn shutdown(self) -> Result<EngineSnapshot, DriverError> {
        let _ = self.shutdown_tx.send(());
        self.task.await?;

        if let Some(pending) = self.engine.write().await.cancel_pending_start() {
            debug!("Cancelled start due at {} ms", pending.due_at);
        }

        let snapshot = self.engine.read().await.snapshot();
        info!(
            "Round engine stopped after {} rounds, balance {:.2}",
            snapshot.round_index, snapshot.balance
        );
        Ok(snapshot)
    }
}

fn elapsed_ms(epoch: Instant) -> u64 {
    epoch.elapsed().as_millis() as u64
}

async fn run_tick_loop<S: CrashSource>(
    engine: Arc<RwLock<RoundEngine<S>>>,
    epoch: Instant,
    tick_interval: Duration,
    updates_tx: broadcast::Sender<EngineUpdate>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let lag_threshold = (tick_interval * 4).as_millis() as u64;
    let mut last_tick: Option<u64> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = elapsed_ms(epoch);
                if let Some(previous) = last_tick {
                    if now.saturating_sub(previous) > lag_threshold {
                        warn!("Tick lagging: {} ms since previous tick", now - previous);
                    }
                }
                last_tick = Some(now);

                let update = {
                    let mut engine = engine.write().await;
                    let result = engine.on_tick(now);
                    EngineUpdate {
                        at: now,
                        snapshot: engine.snapshot(),
                        events: result.events,
                    }
                };

                for event in &update.events {
                    log_event(event);
                }

                // No subscribers is fine
                let _ = updates_tx.send(update);
            }
            _ = shutdown_rx.recv() => {
                debug!("Tick loop received shutdown");
                break;
            }
        }
    }
}

fn log_event(event: &RoundEvent) {
    match &event.data {
        RoundEventData::RoundStarted { stakes_carried } => {
            debug!("Round {} started at {} ms ({} stakes)", event.round, event.at, stakes_carried);
        }
        RoundEventData::Crashed { crash_multiplier, forfeited_bets, .. } => {
            debug!(
                "Round {} crashed at {:.2}x ({} bets forfeited)",
                event.round, crash_multiplier, forfeited_bets
            );
        }
        RoundEventData::CashedOut { trigger, multiplier, payout, .. } => {
            debug!("{:?} cashout at {:.2}x paid {:.2}", trigger, multiplier, payout);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::EngineConfig;
    use crate::game::state::RoundState;

    struct Fixed(f64);

    impl CrashSource for Fixed {
        fn next_crash(&mut self) -> f64 {
            self.0
        }
    }

    fn spawn_fixed(crash: f64) -> EngineHandle<Fixed> {
        let engine = RoundEngine::with_source(EngineConfig::default(), Fixed(crash));
        EngineHandle::spawn_engine(engine, Duration::from_millis(16))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_round_starts_after_delay() {
        let handle = spawn_fixed(5.0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.round_state, RoundState::Idle);
        assert!(snapshot.pending_start.is_some());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.round_state, RoundState::Running);
        assert_eq!(snapshot.round_index, 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_bet_and_cash_out() {
        let handle = spawn_fixed(5.0);
        handle.place_bet(100.0).await.unwrap();

        tokio::time::sleep(Duration::from_millis(600 + 2000)).await;
        let cash_out = handle.request_cash_out().await.unwrap();
        assert!(cash_out.multiplier > 1.4);

        let snapshot = handle.snapshot().await;
        assert!((snapshot.balance - (900.0 + cash_out.payout)).abs() < 1e-9);
        assert!(!snapshot.can_cash_out);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_carry_events() {
        let handle = spawn_fixed(1.5);
        let mut updates = handle.subscribe();

        let mut started = false;
        let mut crashed = false;
        while !(started && crashed) {
            let update = match updates.recv().await {
                Ok(update) => update,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("update channel closed: {}", e),
            };
            for event in &update.events {
                match event.data {
                    RoundEventData::RoundStarted { .. } => started = true,
                    RoundEventData::Crashed { .. } => crashed = true,
                    _ => {}
                }
            }
        }

        let snapshot = handle.shutdown().await.unwrap();
        assert_eq!(snapshot.crash_multiplier, Some(1.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_start() {
        let handle = spawn_fixed(5.0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = handle.shutdown().await.unwrap();
        assert_eq!(snapshot.round_index, 0);
        assert!(snapshot.pending_start.is_none());
        assert_eq!(snapshot.round_state, RoundState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_after_crash_leaves_no_restart() {
        let handle = spawn_fixed(1.5);
        tokio::time::sleep(Duration::from_millis(600 + 2000)).await;
        assert!(handle.snapshot().await.pending_start.is_some());

        let snapshot = handle.shutdown().await.unwrap();
        assert_eq!(snapshot.round_state, RoundState::Crashed);
        assert_eq!(snapshot.round_index, 1);
        assert!(snapshot.pending_start.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_spawn_runs_rounds() {
        let handle = EngineHandle::spawn(DriverConfig::default());
        tokio::time::sleep(Duration::from_secs(60)).await;

        let snapshot = handle.shutdown().await.unwrap();
        assert!(snapshot.round_index > 1);
        assert!(!snapshot.history.is_empty());
    }
}
