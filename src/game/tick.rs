//! Round Tick
//!
//! The per-frame state update. Every tick reads the multiplier exactly once
//! and uses that single reading for the crash check, auto-cashout and the
//! presentation snapshot, so the three can never disagree.

use crate::core::sampler::CrashSource;
use crate::game::events::{CashOutTrigger, RoundEvent};
use crate::game::state::{RoundEngine, RoundState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick (including queued command events)
    pub events: Vec<RoundEvent>,
    /// A round started this tick
    pub round_started: bool,
    /// The round crashed this tick
    pub crashed: bool,
    /// Multiplier read this tick (`None` when no round was running)
    pub multiplier: Option<f64>,
    /// Progress read this tick
    pub progress: Option<f64>,
}

/// Advance the engine to `now` (ms).
///
/// Timestamps earlier than the previous tick are treated as the previous
/// tick, so the multiplier never runs backwards.
pub fn tick<S: CrashSource>(engine: &mut RoundEngine<S>, now: u64) -> TickResult {
    let mut result = TickResult::default();
    let now = now.max(engine.clock);
    engine.clock = now;

    // 1. Fire a due start
    if let Some(pending) = engine.pending_start {
        if now >= pending.due_at {
            engine.start_round(now);
            result.round_started = true;

            #[cfg(feature = "debug-tracing")]
            tracing::trace!(round = engine.round_index, "round started");
        }
    }

    if engine.state != RoundState::Running {
        result.events = engine.take_events();
        return result;
    }

    let Some(round) = engine.round.as_ref() else {
        result.events = engine.take_events();
        return result;
    };

    // 2. Single multiplier reading for this tick
    let elapsed = round.elapsed_ms(now);
    let multiplier = engine.growth.multiplier_at(elapsed);
    let progress = round.progress_at(elapsed);
    let crashes = round.crashes_at(multiplier, progress);

    engine.current_multiplier = multiplier;
    engine.progress = progress;
    result.multiplier = Some(multiplier);
    result.progress = Some(progress);

    if crashes {
        // 3. Crash wins over any cashout at the same reading
        engine.crash(now);
        result.crashed = true;

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(round = engine.round_index, multiplier, "round crashed");
    } else {
        // 4. Auto-cashout
        process_auto_cash_out(engine, multiplier);
    }

    result.events = engine.take_events();
    result
}

/// Fire the auto-cashout once the reading reaches the target. Disarms either way.
fn process_auto_cash_out<S: CrashSource>(engine: &mut RoundEngine<S>, multiplier: f64) {
    if !engine.auto_armed {
        return;
    }
    let Some(target) = engine.auto_target else {
        return;
    };
    if multiplier >= target {
        engine.auto_armed = false;
        engine.auto_fired = true;
        engine.cash_out(CashOutTrigger::Auto);
    }
}

impl<S: CrashSource> RoundEngine<S> {
    /// Advance the engine to `now` (ms). See [`tick`].
    pub fn on_tick(&mut self, now: u64) -> TickResult {
        tick(self, now)
    }
}

/// Drive the engine from `start` to `end` in fixed steps.
///
/// Returns every event emitted along the way.
pub fn simulate<S: CrashSource>(
    engine: &mut RoundEngine<S>,
    start: u64,
    end: u64,
    step_ms: u64,
) -> Vec<RoundEvent> {
    let step = step_ms.max(1);
    let mut all_events = Vec::new();
    let mut now = start;

    while now <= end {
        all_events.extend(tick(engine, now).events);
        now += step;
    }

    all_events
}
