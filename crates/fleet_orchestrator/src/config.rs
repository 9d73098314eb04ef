use clap::Parser;
use fleet_core::{FleetConfig, FleetResult, ValueRange};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// `fleet_orchestrator` - simulates a fleet of point agents and dispatches
/// movement goals to them.
///
/// One process runs the simulation tick loop, the snapshot refresh loop, the
/// JSON API used by the presentation layer and a Prometheus metrics endpoint.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Listen address of the dispatch / snapshot HTTP API.
    #[arg(long, env = "FLEET_HTTP_LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub http_listen_addr: SocketAddr,

    /// Listen address of the Prometheus metrics server.
    #[arg(long, env = "FLEET_METRICS_LISTEN_ADDR", default_value = "0.0.0.0:9091")]
    pub metrics_listen_addr: SocketAddr,

    /// Number of agents generated at startup.
    #[arg(long, env = "FLEET_NUM_AGENTS", default_value_t = 25)]
    pub num_agents: usize,

    /// Distance an agent covers per tick. Also the arrival threshold.
    #[arg(long, env = "FLEET_SPEED", default_value_t = 0.1, allow_negative_numbers = true)]
    pub speed: f64,

    #[arg(long, env = "FLEET_TICK_INTERVAL_MS", default_value_t = 100)]
    pub tick_interval_ms: u64,

    /// How often the published snapshot is refreshed from the agent table.
    /// Must not exceed the tick interval.
    #[arg(long, env = "FLEET_SNAPSHOT_INTERVAL_MS", default_value_t = 100)]
    pub snapshot_interval_ms: u64,

    #[arg(long, env = "FLEET_POSITION_MIN", default_value_t = 1.0, allow_negative_numbers = true)]
    pub position_min: f64,

    #[arg(long, env = "FLEET_POSITION_MAX", default_value_t = 5.0, allow_negative_numbers = true)]
    pub position_max: f64,

    #[arg(long, env = "FLEET_CHARGE_MIN", default_value_t = 80.0)]
    pub charge_min: f64,

    #[arg(long, env = "FLEET_CHARGE_MAX", default_value_t = 100.0)]
    pub charge_max: f64,

    /// Longest wait between retries while ticks keep failing.
    #[arg(long, env = "FLEET_MAX_BACKOFF_MS", default_value_t = 5000)]
    pub max_backoff_ms: u64,

    /// Seed for the initial agent layout. Random when unset.
    #[arg(long, env = "FLEET_SEED")]
    pub seed: Option<u64>,

    /// Mirror the agent table to this CSV file after every tick.
    #[arg(long, env = "FLEET_CSV_PATH")]
    pub csv_path: Option<PathBuf>,
}

impl Config {
    /// Builds and validates the simulation settings.
    pub fn fleet_config(&self) -> FleetResult<FleetConfig> {
        FleetConfig {
            num_agents: self.num_agents,
            position_range: ValueRange::new(self.position_min, self.position_max),
            charge_range: ValueRange::new(self.charge_min, self.charge_max),
            speed: self.speed,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            snapshot_interval: Duration::from_millis(self.snapshot_interval_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            seed: self.seed,
        }
        .validate()
    }
}
