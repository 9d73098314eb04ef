//! The simulation step: drain queued goals, then move every busy agent one
//! step toward its target.

use std::sync::Arc;

use crate::error::{FleetError, FleetResult};
use crate::model::{AgentId, GoalAssignment, Position};
use crate::queue::TaskQueue;
use crate::state::FleetState;
use crate::table::AgentTable;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub tick: u64,
    /// Assignments accepted into the active goals table.
    pub assigned: usize,
    /// Agents that moved a full step and are still under way.
    pub moved: usize,
    /// Agents that arrived this tick, in scan order.
    pub reached: Vec<AgentId>,
    /// Drained assignments dropped because their agent does not exist.
    pub unknown: Vec<AgentId>,
    /// Agents still busy after the tick.
    pub busy: usize,
}

/// Applies one tick to `state` in place.
///
/// `speed` is both the step length and the arrival threshold: an agent
/// within `speed` of its target is snapped onto it exactly and its goal is
/// removed. The snap also discards any floating drift picked up on the way.
pub fn advance(state: &mut FleetState, drained: &[GoalAssignment], speed: f64) -> StepReport {
    let mut report = StepReport::default();

    for assignment in drained {
        if !state.contains(&assignment.agent) {
            tracing::warn!(
                agent = %assignment.agent,
                error = %FleetError::UnknownAgent(assignment.agent.clone()),
                "Dropping assignment for unknown agent"
            );
            report.unknown.push(assignment.agent.clone());
            continue;
        }
        tracing::info!(
            agent = %assignment.agent,
            goal_x = assignment.target.x,
            goal_y = assignment.target.y,
            "New task assigned"
        );
        state
            .active_goals
            .insert(assignment.agent.clone(), assignment.target);
        report.assigned += 1;
    }

    let arrival_threshold = speed;
    for agent in state.agents.iter_mut() {
        let Some(target) = state.active_goals.get(&agent.id).copied() else {
            continue;
        };
        let distance = agent.position.distance_to(target);
        if distance <= arrival_threshold {
            agent.position = target;
            tracing::info!(agent = %agent.id, x = target.x, y = target.y, "Agent reached goal");
            report.reached.push(agent.id.clone());
        } else if let Some((ux, uy)) = heading(agent.position, target) {
            agent.position.x += speed * ux;
            agent.position.y += speed * uy;
            report.moved += 1;
        } else {
            agent.position = target;
            report.reached.push(agent.id.clone());
        }
    }
    for id in &report.reached {
        state.active_goals.remove(id);
    }

    state.tick += 1;
    report.tick = state.tick;
    report.busy = state.busy_count();
    report
}

/// Unit vector from `from` toward `to`, or `None` when the two coincide.
///
/// Works on halved components rescaled by their larger magnitude, so goals
/// near the `f64` limits still give a finite heading where `hypot` of the raw
/// difference would overflow.
fn heading(from: Position, to: Position) -> Option<(f64, f64)> {
    let dx = to.x / 2.0 - from.x / 2.0;
    let dy = to.y / 2.0 - from.y / 2.0;
    let scale = dx.abs().max(dy.abs());
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    let (sx, sy) = (dx / scale, dy / scale);
    let norm = sx.hypot(sy);
    Some((sx / norm, sy / norm))
}

/// Drives [`advance`] against the shared queue and agent table.
pub struct Simulation {
    queue: Arc<dyn TaskQueue>,
    table: Arc<dyn AgentTable>,
    speed: f64,
}

impl Simulation {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        table: Arc<dyn AgentTable>,
        speed: f64,
    ) -> FleetResult<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(FleetError::InvalidConfiguration(format!(
                "speed must be a positive finite number, got {speed}"
            )));
        }
        Ok(Self {
            queue,
            table,
            speed,
        })
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Runs one tick. Either the whole tick is committed, or the table keeps
    /// its previous state and the drained assignments go back to the front
    /// of the queue.
    pub fn tick(&self) -> FleetResult<StepReport> {
        let current = self.table.load()?;
        let drained = self.queue.drain()?;

        let mut next = FleetState::clone(&current);
        let report = advance(&mut next, &drained, self.speed);

        if let Err(err) = self.table.commit(next) {
            if !drained.is_empty() {
                let count = drained.len();
                if let Err(restore_err) = self.queue.restore(drained) {
                    tracing::error!(
                        error = %restore_err,
                        lost = count,
                        "Failed to return drained assignments to the queue"
                    );
                }
            }
            return Err(err);
        }
        Ok(report)
    }
}
