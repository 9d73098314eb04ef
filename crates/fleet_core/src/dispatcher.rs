//! Turns goal requests into queued assignments.

use std::sync::Arc;

use crate::error::{FleetError, FleetResult};
use crate::model::{Agent, AgentId, GoalAssignment, GoalRequest, Position};
use crate::queue::TaskQueue;
use crate::state::FleetState;
use crate::table::AgentTable;

/// Nearest agent to `target` among those without an active goal.
///
/// Ties keep the first agent in scan order (creation order): a later agent
/// only wins with a strictly smaller distance.
pub fn nearest_idle(state: &FleetState, target: Position) -> Option<&Agent> {
    let mut best: Option<(&Agent, f64)> = None;
    for agent in state.idle_agents() {
        let distance = agent.position.distance_to(target);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((agent, distance)),
        }
    }
    best.map(|(agent, _)| agent)
}

/// Accepts goal requests and enqueues them for the simulation.
///
/// The dispatcher only reads the agent table and only writes the queue. It
/// never marks an agent busy: that happens when the simulation consumes the
/// assignment, so two nearest-idle requests landing in the same tick window
/// can pick the same agent.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<dyn TaskQueue>,
    table: Arc<dyn AgentTable>,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn TaskQueue>, table: Arc<dyn AgentTable>) -> Self {
        Self { queue, table }
    }

    /// Routes `request` to a named or a nearest-idle dispatch.
    pub fn dispatch(&self, request: GoalRequest) -> FleetResult<GoalAssignment> {
        let target = request.target();
        match request.agent_identity {
            Some(agent) => self.assign(agent, target),
            None => self.assign_nearest(target),
        }
    }

    /// Queues `target` for `agent` whatever its current state. An existing
    /// goal is replaced once the simulation consumes this one; an unknown
    /// agent is only detected at that point.
    pub fn assign(&self, agent: AgentId, target: Position) -> FleetResult<GoalAssignment> {
        check_target(target)?;
        let assignment = GoalAssignment { agent, target };
        self.queue.push(assignment.clone())?;
        tracing::debug!(agent = %assignment.agent, goal_x = target.x, goal_y = target.y, "Goal enqueued");
        Ok(assignment)
    }

    /// Queues `target` for the closest idle agent, or fails with
    /// [`FleetError::NoAvailableAgent`] without touching the queue.
    pub fn assign_nearest(&self, target: Position) -> FleetResult<GoalAssignment> {
        check_target(target)?;
        let state = self.table.load()?;
        let agent = nearest_idle(&state, target)
            .map(|agent| agent.id.clone())
            .ok_or(FleetError::NoAvailableAgent)?;
        tracing::info!(agent = %agent, goal_x = target.x, goal_y = target.y, "Selected nearest idle agent");
        self.assign(agent, target)
    }

    /// Whether `agent` currently holds an active goal. Queued but not yet
    /// consumed assignments do not count.
    pub fn is_busy(&self, agent: &AgentId) -> FleetResult<bool> {
        let state = self.table.load()?;
        if !state.contains(agent) {
            return Err(FleetError::UnknownAgent(agent.clone()));
        }
        Ok(state.is_busy(agent))
    }
}

fn check_target(target: Position) -> FleetResult<()> {
    if target.is_finite() {
        Ok(())
    } else {
        Err(FleetError::InvalidRequest(format!(
            "goal ({}, {}) is not a finite coordinate",
            target.x, target.y
        )))
    }
}
