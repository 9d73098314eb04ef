use crate::metrics::Metrics;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fleet_core::{
    AgentId, Dispatcher, FleetError, FleetResult, FleetSnapshot, GoalAssignment, GoalRequest,
    Position, SnapshotPublisher,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::watch;

/// Shared handles for the request handlers.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Dispatcher,
    pub publisher: Arc<SnapshotPublisher>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Deserialize)]
pub struct NearestGoal {
    pub goal_x: f64,
    pub goal_y: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BusyResponse {
    pub identity: AgentId,
    pub busy: bool,
}

/// Snapshot in the dashboard's polling shape: `{"points": [[x, y, name, charge], ...]}`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PointsResponse {
    pub points: Vec<(f64, f64, AgentId, f64)>,
}

/// Maps a [`FleetError`] onto an HTTP status with a plain-text reason.
#[derive(Debug)]
pub struct ApiError(pub FleetError);

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FleetError::NoAvailableAgent => StatusCode::CONFLICT,
            FleetError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            FleetError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            FleetError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            FleetError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/coordinates", get(get_coordinates))
        .route("/get_coordinates", get(get_points))
        .route("/assign_task", post(assign_task))
        .route("/assign_nearest_task", post(assign_nearest_task))
        .route("/agents/:identity/busy", get(agent_busy))
        .with_state(state)
}

/// Latest published snapshot. Staleness is bounded by the refresh interval.
pub async fn get_coordinates(State(api): State<ApiState>) -> Json<FleetSnapshot> {
    Json(FleetSnapshot::clone(&api.publisher.current()))
}

/// Same snapshot as [`get_coordinates`], flattened into point tuples.
pub async fn get_points(State(api): State<ApiState>) -> Json<PointsResponse> {
    let snapshot = api.publisher.current();
    let points = snapshot
        .agents
        .iter()
        .map(|record| (record.x, record.y, record.identity.clone(), record.charge))
        .collect();
    Json(PointsResponse { points })
}

/// Named dispatch, or nearest-idle when the body carries no agent identity.
pub async fn assign_task(
    State(api): State<ApiState>,
    Json(request): Json<GoalRequest>,
) -> Result<StatusCode, ApiError> {
    let result = api.dispatcher.dispatch(request);
    finish_dispatch(&api, result)
}

pub async fn assign_nearest_task(
    State(api): State<ApiState>,
    Json(goal): Json<NearestGoal>,
) -> Result<StatusCode, ApiError> {
    let result = api
        .dispatcher
        .assign_nearest(Position::new(goal.goal_x, goal.goal_y));
    finish_dispatch(&api, result)
}

fn finish_dispatch(
    api: &ApiState,
    result: FleetResult<GoalAssignment>,
) -> Result<StatusCode, ApiError> {
    match result {
        Ok(_) => {
            api.metrics.goals_enqueued_total.inc();
            Ok(StatusCode::NO_CONTENT)
        }
        Err(FleetError::NoAvailableAgent) => {
            api.metrics.dispatch_rejected_total.inc();
            tracing::info!("Nearest-idle dispatch rejected: no available agent");
            Err(ApiError(FleetError::NoAvailableAgent))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dispatch failed");
            Err(e.into())
        }
    }
}

pub async fn agent_busy(
    State(api): State<ApiState>,
    Path(identity): Path<String>,
) -> Result<Json<BusyResponse>, ApiError> {
    let identity = AgentId(identity);
    let busy = api.dispatcher.is_busy(&identity)?;
    Ok(Json(BusyResponse { identity, busy }))
}

/// Serves the API until the shutdown channel fires.
pub async fn serve_http(
    state: ApiState,
    addr: SocketAddr,
    mut shutdown_rx: watch::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Starting dispatch HTTP server");
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{
        Agent, AgentTable, FleetState, MemoryAgentTable, MemoryTaskQueue, Simulation, TaskQueue,
    };

    struct Harness {
        api: ApiState,
        queue: Arc<MemoryTaskQueue>,
        simulation: Simulation,
    }

    fn harness() -> Harness {
        let table = Arc::new(MemoryAgentTable::new(FleetState::new(vec![
            Agent {
                id: AgentId::new("BOT_1"),
                position: Position::new(0.0, 0.0),
                charge: 90.0,
            },
            Agent {
                id: AgentId::new("BOT_2"),
                position: Position::new(4.0, 4.0),
                charge: 82.0,
            },
        ])));
        let queue = Arc::new(MemoryTaskQueue::new());
        let simulation = Simulation::new(queue.clone(), table.clone(), 0.1).unwrap();
        let publisher = Arc::new(SnapshotPublisher::new(table.clone() as Arc<dyn AgentTable>).unwrap());
        let api = ApiState {
            dispatcher: Dispatcher::new(queue.clone(), table),
            publisher,
            metrics: Arc::new(Metrics::new()),
        };
        Harness {
            api,
            queue,
            simulation,
        }
    }

    fn status(result: Result<StatusCode, ApiError>) -> StatusCode {
        match result {
            Ok(code) => code,
            Err(err) => err.into_response().status(),
        }
    }

    #[tokio::test]
    async fn coordinates_return_snapshot() {
        let h = harness();
        let Json(snapshot) = get_coordinates(State(h.api.clone())).await;
        assert_eq!(snapshot.agents.len(), 2);
        assert_eq!(snapshot.agents[1].identity, AgentId::new("BOT_2"));
    }

    #[tokio::test]
    async fn points_list_agents_as_tuples() {
        let h = harness();
        let Json(response) = get_points(State(h.api.clone())).await;
        assert_eq!(
            response.points,
            vec![
                (0.0, 0.0, AgentId::new("BOT_1"), 90.0),
                (4.0, 4.0, AgentId::new("BOT_2"), 82.0),
            ]
        );
    }

    #[tokio::test]
    async fn reached_goal_shows_up_in_points() {
        let h = harness();
        let request = GoalRequest {
            agent_identity: Some(AgentId::new("BOT_2")),
            goal_x: 4.0,
            goal_y: 4.05,
        };
        let code = status(assign_task(State(h.api.clone()), Json(request)).await);
        assert_eq!(code, StatusCode::NO_CONTENT);

        h.simulation.tick().unwrap();
        h.api.publisher.refresh().unwrap();
        let Json(response) = get_points(State(h.api.clone())).await;
        assert_eq!(response.points[1], (4.0, 4.05, AgentId::new("BOT_2"), 82.0));
    }

    #[tokio::test]
    async fn named_assignment_is_queued() {
        let h = harness();
        let code = status(
            assign_task(State(h.api.clone()), Json(GoalRequest::named("BOT_2", 1.0, 1.0))).await,
        );
        assert_eq!(code, StatusCode::NO_CONTENT);
        assert_eq!(h.queue.len().unwrap(), 1);
        assert_eq!(h.api.metrics.goals_enqueued_total.get(), 1);
    }

    #[tokio::test]
    async fn nearest_assignment_conflicts_when_fleet_is_busy() {
        let h = harness();
        for name in ["BOT_1", "BOT_2"] {
            h.api
                .dispatcher
                .assign(name.into(), Position::new(9.0, 9.0))
                .unwrap();
        }
        h.simulation.tick().unwrap();

        let code = status(
            assign_nearest_task(
                State(h.api.clone()),
                Json(NearestGoal {
                    goal_x: 1.0,
                    goal_y: 1.0,
                }),
            )
            .await,
        );
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(h.queue.len().unwrap(), 0);
        assert_eq!(h.api.metrics.dispatch_rejected_total.get(), 1);
    }

    #[tokio::test]
    async fn invalid_goal_is_bad_request() {
        let h = harness();
        let code = status(
            assign_task(State(h.api.clone()), Json(GoalRequest::nearest(f64::NAN, 1.0))).await,
        );
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn busy_endpoint_tracks_active_goals() {
        let h = harness();
        h.api
            .dispatcher
            .assign("BOT_1".into(), Position::new(3.0, 0.0))
            .unwrap();

        let Json(before) = agent_busy(State(h.api.clone()), Path("BOT_1".into()))
            .await
            .unwrap();
        assert!(!before.busy);

        h.simulation.tick().unwrap();
        let Json(after) = agent_busy(State(h.api.clone()), Path("BOT_1".into()))
            .await
            .unwrap();
        assert_eq!(
            after,
            BusyResponse {
                identity: AgentId::new("BOT_1"),
                busy: true
            }
        );

        let missing = agent_busy(State(h.api.clone()), Path("BOT_99".into()))
            .await
            .unwrap_err();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
