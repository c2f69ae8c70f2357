//! Crash Round Server
//!
//! Demo host: runs the round engine on the tokio driver and plays a simple
//! autoplay strategy until the round limit or Ctrl-C.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crash_round::{
    CrashSampler, DeterministicRng, DriverConfig, EngineHandle, RoundState, TICK_RATE, VERSION,
    game::{ledger::StakePreset, BetError},
};

/// Rounds to play before exiting (`CRASH_DEMO_ROUNDS`).
const DEFAULT_DEMO_ROUNDS: u64 = 10;

/// Autoplay cashout target.
const DEMO_AUTO_TARGET: f64 = 1.8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Crash Round Server v{}", VERSION);

    let config = DriverConfig::from_env().context("Invalid configuration")?;
    let rounds = std::env::var("CRASH_DEMO_ROUNDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DEMO_ROUNDS);

    info!("Tick Rate: {} Hz (interval {:?})", TICK_RATE, config.tick_interval);
    info!("Seed: {}", hex::encode(config.seed.to_be_bytes()));
    info!(
        "Growth rate {}, cap {:.0}x, restart delay {} ms",
        config.engine.growth_rate, config.engine.crash_cap, config.engine.restart_delay_ms
    );

    let handle = EngineHandle::spawn(config);

    tokio::select! {
        result = autoplay(&handle, rounds) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    let snapshot = handle.shutdown().await?;
    info!("=== Session Results ===");
    info!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}

/// Stake a preset amount on every round with auto-cashout on.
async fn autoplay(
    handle: &EngineHandle<CrashSampler<DeterministicRng>>,
    rounds: u64,
) -> anyhow::Result<()> {
    handle.set_auto_cashout_target(Some(DEMO_AUTO_TARGET)).await;
    let mut updates = handle.subscribe();
    let mut stake = 10.0;
    let mut staked_for = 0;

    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Autoplay skipped {} updates", skipped);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot = update.snapshot;

        if update.events.iter().any(|e| e.is_crash()) {
            info!(
                "Round {} crashed at {:.2}x, balance {:.2}",
                snapshot.round_index,
                snapshot.crash_multiplier.unwrap_or(snapshot.current_multiplier),
                snapshot.balance
            );
            if snapshot.round_index >= rounds {
                return Ok(());
            }
        }

        // One stake per upcoming round, placed during the pause
        let next_round = snapshot.round_index + 1;
        if snapshot.round_state != RoundState::Running && staked_for < next_round {
            match handle.place_bet(stake).await {
                Ok(bet) => {
                    info!("Staked {:.0} on round {}", bet.amount, bet.placed_in_round);
                    staked_for = next_round;
                }
                Err(BetError::InsufficientFunds { available, .. }) if available >= 1.0 => {
                    stake = StakePreset::Max.apply(stake, available);
                }
                Err(e) => {
                    warn!("Stake refused: {}", e);
                    return Ok(());
                }
            }
        }
    }
}
