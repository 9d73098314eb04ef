use crate::metrics::Metrics;
use fleet_core::{Backoff, FleetResult, Simulation, SnapshotPublisher, TaskQueue};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, sleep, MissedTickBehavior},
};

/// Cadence settings shared by the periodic loops.
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub period: Duration,
    pub max_backoff: Duration,
}

/// Runs `job` every `timing.period` until shutdown.
///
/// Jobs touch storage synchronously (the CSV mirror writes a file per tick),
/// so each run goes to the blocking pool. Each run completes before the next
/// one starts. A failed or panicked run is logged and the loop waits out an
/// exponential backoff before trying again; the loop itself never exits on a
/// job error.
pub fn spawn_periodic<F>(
    name: &'static str,
    timing: LoopTiming,
    mut shutdown_rx: watch::Receiver<()>,
    job: F,
) -> JoinHandle<anyhow::Result<()>>
where
    F: Fn() -> FleetResult<()> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    tokio::spawn(async move {
        tracing::info!(task = name, period_ms = timing.period.as_millis() as u64, "Periodic task started.");
        let mut backoff = Backoff::new(timing.period, timing.max_backoff);
        let mut ticker = interval(timing.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let run = job.clone();
            let outcome = match tokio::task::spawn_blocking(move || run()).await {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(join_err) => Err(anyhow::Error::from(join_err)),
            };

            match outcome {
                Ok(()) => {
                    if backoff.streak() > 0 {
                        tracing::info!(task = name, failures = backoff.streak(), "Periodic task recovered.");
                    }
                    backoff.succeed();
                }
                Err(e) => {
                    let delay = backoff.fail();
                    if backoff.streak() == 1 {
                        tracing::warn!(task = name, error = %e, retry_in_ms = delay.as_millis() as u64, "Periodic task failed; retrying.");
                    } else {
                        tracing::error!(task = name, error = %e, failures = backoff.streak(), retry_in_ms = delay.as_millis() as u64, "Periodic task still failing.");
                    }
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(task = name, "Periodic task has shut down.");
        Ok(())
    })
}

/// Spawns the simulation tick loop.
pub fn spawn_simulation(
    simulation: Arc<Simulation>,
    queue: Arc<dyn TaskQueue>,
    metrics: Arc<Metrics>,
    timing: LoopTiming,
    shutdown_rx: watch::Receiver<()>,
) -> JoinHandle<anyhow::Result<()>> {
    spawn_periodic("simulation", timing, shutdown_rx, move || {
        let report = simulation.tick().map_err(|e| {
            metrics.tick_failures_total.inc();
            e
        })?;
        metrics.record_step(&report);
        if !report.reached.is_empty() || report.assigned > 0 {
            tracing::debug!(
                tick = report.tick,
                assigned = report.assigned,
                moved = report.moved,
                reached = report.reached.len(),
                busy = report.busy,
                "Tick committed"
            );
        }
        metrics.update_queue_depth(queue.len()?);
        Ok(())
    })
}

/// Spawns the snapshot refresh loop.
pub fn spawn_publisher(
    publisher: Arc<SnapshotPublisher>,
    timing: LoopTiming,
    shutdown_rx: watch::Receiver<()>,
) -> JoinHandle<anyhow::Result<()>> {
    spawn_periodic("snapshot", timing, shutdown_rx, move || {
        publisher.refresh().map(|_| ())
    })
}
