use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use fleet_core::StepReport;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Prometheus collectors for the fleet orchestrator.
///
/// Wrapped in an `Arc` and shared by the tick loops and the HTTP handlers.
pub struct Metrics {
    pub registry: Registry,
    /// Simulation ticks committed.
    pub ticks_total: IntCounter,
    /// Simulation ticks abandoned because storage failed.
    pub tick_failures_total: IntCounter,
    pub goals_enqueued_total: IntCounter,
    pub goals_reached_total: IntCounter,
    /// Nearest-idle requests refused because every agent was busy.
    pub dispatch_rejected_total: IntCounter,
    pub unknown_agents_dropped_total: IntCounter,
    pub agents_busy: IntGauge,
    pub task_queue_depth: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("fleet_orchestrator".into()), None)
            .expect("Failed to create custom metrics registry");

        macro_rules! reg {
            ($metric:expr) => {{
                let collector = $metric.expect("Failed to create metric");
                registry
                    .register(Box::new(collector.clone()))
                    .expect("Failed to register metric");
                collector
            }};
        }

        Self {
            ticks_total: reg!(IntCounter::new(
                "ticks_total",
                "Total number of committed simulation ticks"
            )),
            tick_failures_total: reg!(IntCounter::new(
                "tick_failures_total",
                "Total number of simulation ticks abandoned on storage errors"
            )),
            goals_enqueued_total: reg!(IntCounter::new(
                "goals_enqueued_total",
                "Total number of goal assignments placed on the task queue"
            )),
            goals_reached_total: reg!(IntCounter::new(
                "goals_reached_total",
                "Total number of goals agents have arrived at"
            )),
            dispatch_rejected_total: reg!(IntCounter::new(
                "dispatch_rejected_total",
                "Nearest-idle dispatches rejected because no agent was idle"
            )),
            unknown_agents_dropped_total: reg!(IntCounter::new(
                "unknown_agents_dropped_total",
                "Queued assignments dropped because the agent does not exist"
            )),
            agents_busy: reg!(IntGauge::new(
                "agents_busy",
                "Number of agents holding an active goal"
            )),
            task_queue_depth: reg!(IntGauge::new(
                "task_queue_depth",
                "Goal assignments waiting for the next tick"
            )),
            registry,
        }
    }

    /// Serves the registry on `/metrics`.
    pub fn router(&self) -> Router {
        let registry = self.registry.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let registry = registry.clone();
                async move {
                    let mut buffer = Vec::new();
                    match TextEncoder::new().encode(&registry.gather(), &mut buffer) {
                        Ok(()) => String::from_utf8_lossy(&buffer).into_owned().into_response(),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode metrics");
                            StatusCode::INTERNAL_SERVER_ERROR.into_response()
                        }
                    }
                }
            }),
        )
    }

    pub fn record_step(&self, report: &StepReport) {
        self.ticks_total.inc();
        self.goals_reached_total.inc_by(report.reached.len() as u64);
        self.unknown_agents_dropped_total
            .inc_by(report.unknown.len() as u64);
        self.agents_busy.set(report.busy as i64);
    }

    pub fn update_queue_depth(&self, depth: usize) {
        self.task_queue_depth.set(depth as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::AgentId;

    #[test]
    fn step_report_feeds_counters() {
        let metrics = Metrics::new();
        metrics.record_step(&StepReport {
            tick: 4,
            assigned: 2,
            moved: 1,
            reached: vec![AgentId::new("BOT_1")],
            unknown: vec![AgentId::new("GHOST")],
            busy: 1,
        });
        assert_eq!(metrics.ticks_total.get(), 1);
        assert_eq!(metrics.goals_reached_total.get(), 1);
        assert_eq!(metrics.unknown_agents_dropped_total.get(), 1);
        assert_eq!(metrics.agents_busy.get(), 1);
    }

    #[test]
    fn registry_uses_prefix() {
        let metrics = Metrics::new();
        metrics.ticks_total.inc();
        let names: Vec<_> = metrics
            .registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_owned())
            .collect();
        assert!(names.contains(&"fleet_orchestrator_ticks_total".to_owned()));
    }
}
