use std::collections::HashMap;

use crate::model::{Agent, AgentId, AgentRecord, Position};

/// One consistent view of the fleet: every agent plus the active goals
/// table, as of the end of tick `tick`.
///
/// `agents` keeps creation order. That order is the scan order used for
/// nearest-idle tie-breaking and the order of published snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetState {
    pub tick: u64,
    pub agents: Vec<Agent>,
    /// At most one target per agent; a newer assignment replaces the old one.
    pub active_goals: HashMap<AgentId, Position>,
}

impl FleetState {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self {
            tick: 0,
            agents,
            active_goals: HashMap::new(),
        }
    }

    pub fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| &agent.id == id)
    }

    pub(crate) fn agent_index(&self, id: &AgentId) -> Option<usize> {
        self.agents.iter().position(|agent| &agent.id == id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agent_index(id).is_some()
    }

    pub fn is_busy(&self, id: &AgentId) -> bool {
        self.active_goals.contains_key(id)
    }

    pub fn busy_count(&self) -> usize {
        self.active_goals.len()
    }

    /// Agents without an active goal, in scan order.
    pub fn idle_agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter().filter(|agent| !self.is_busy(&agent.id))
    }

    pub fn records(&self) -> Vec<AgentRecord> {
        self.agents.iter().map(AgentRecord::from).collect()
    }
}
