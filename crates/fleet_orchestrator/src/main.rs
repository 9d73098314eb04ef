// fleet/crates/fleet_orchestrator/src/main.rs
mod config;
mod http;
mod metrics;
mod runner;

use crate::config::Config;
use crate::http::ApiState;
use crate::metrics::Metrics;
use crate::runner::LoopTiming;
use anyhow::Context;
use clap::Parser;
use fleet_core::{
    AgentTable, CsvAgentTable, Dispatcher, FleetState, MemoryAgentTable, MemoryTaskQueue,
    Simulation, SnapshotPublisher, TaskQueue,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::parse();
    let fleet = config
        .fleet_config()
        .context("Refusing to start with invalid fleet configuration")?;
    tracing::info!(config = ?config, "Loaded configuration");

    let initial = FleetState::new(fleet.generate_agents());
    let table: Arc<dyn AgentTable> = match &config.csv_path {
        Some(path) => Arc::new(
            CsvAgentTable::create(path, initial)
                .with_context(|| format!("Failed to create CSV agent table at '{}'", path.display()))?,
        ),
        None => Arc::new(MemoryAgentTable::new(initial)),
    };
    let queue: Arc<dyn TaskQueue> = Arc::new(MemoryTaskQueue::new());

    let metrics = Arc::new(Metrics::new());
    let simulation = Arc::new(
        Simulation::new(queue.clone(), table.clone(), fleet.speed)
            .context("Failed to build simulation")?,
    );
    let publisher = Arc::new(
        SnapshotPublisher::new(table.clone()).context("Failed to read initial agent table")?,
    );
    let dispatcher = Dispatcher::new(queue.clone(), table.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let simulation_handle = runner::spawn_simulation(
        simulation,
        queue.clone(),
        metrics.clone(),
        LoopTiming {
            period: fleet.tick_interval,
            max_backoff: fleet.max_backoff,
        },
        shutdown_rx.clone(),
    );

    let publisher_handle = runner::spawn_publisher(
        publisher.clone(),
        LoopTiming {
            period: fleet.snapshot_interval,
            max_backoff: fleet.max_backoff,
        },
        shutdown_rx.clone(),
    );

    let http_handle = {
        let state = ApiState {
            dispatcher,
            publisher,
            metrics: metrics.clone(),
        };
        let addr = config.http_listen_addr;
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { http::serve_http(state, addr, rx).await })
    };

    let metrics_handle = {
        let router = metrics.router();
        let addr = config.metrics_listen_addr;
        let mut rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind metrics listener on {addr}"))?;
            tracing::info!(address = %addr, "Metrics server started");
            axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = rx.changed().await;
                })
                .await?;
            Ok::<(), anyhow::Error>(())
        })
    };

    tracing::info!(agents = fleet.num_agents, "All services started. Awaiting shutdown signal...");

    shutdown_signal().await;

    tracing::info!("Shutdown signal received. Terminating services...");
    // Dropping the sender wakes every `changed()` waiter.
    drop(shutdown_tx);

    let (simulation_res, publisher_res, http_res, metrics_res) =
        tokio::join!(simulation_handle, publisher_handle, http_handle, metrics_handle);

    for (name, res) in [
        ("Simulation", simulation_res),
        ("Snapshot publisher", publisher_res),
        ("HTTP server", http_res),
        ("Metrics server", metrics_res),
    ] {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(task = name, error = %e, "Task failed."),
            Err(e) => tracing::error!(task = name, error = %e, "Task panicked."),
        }
    }

    tracing::info!("Orchestrator shut down gracefully.");
    Ok(())
}

/// Listens for OS shutdown signals (SIGINT, SIGTERM) and resolves when one is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
