//! Plain data carried between the dispatcher, the simulation and readers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, unique agent name (`BOT_1`, `BOT_2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// A point in the shared coordinate space. No units are implied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance_to(&self, other: Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A simulated point entity.
///
/// The busy flag is not stored here: an agent is busy iff the active goals
/// table holds an entry for its id (see [`crate::FleetState::is_busy`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub position: Position,
    /// Informational only; nothing in the engine drains or consumes it.
    pub charge: f64,
}

/// An agent paired with the coordinate it should move to.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalAssignment {
    pub agent: AgentId,
    pub target: Position,
}

impl GoalAssignment {
    pub fn new(agent: impl Into<AgentId>, target: Position) -> Self {
        Self {
            agent: agent.into(),
            target,
        }
    }
}

/// Inbound goal request. Without an agent identity the dispatcher resolves
/// the nearest idle agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRequest {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub agent_identity: Option<AgentId>,
    pub goal_x: f64,
    pub goal_y: f64,
}

impl GoalRequest {
    pub fn named(agent: impl Into<AgentId>, goal_x: f64, goal_y: f64) -> Self {
        Self {
            agent_identity: Some(agent.into()),
            goal_x,
            goal_y,
        }
    }

    pub fn nearest(goal_x: f64, goal_y: f64) -> Self {
        Self {
            agent_identity: None,
            goal_x,
            goal_y,
        }
    }

    pub fn target(&self) -> Position {
        Position::new(self.goal_x, self.goal_y)
    }
}

/// One row of the published agent snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub x: f64,
    pub y: f64,
    pub identity: AgentId,
    pub charge: f64,
}

impl From<&Agent> for AgentRecord {
    fn from(agent: &Agent) -> Self {
        Self {
            x: agent.position.x,
            y: agent.position.y,
            identity: agent.id.clone(),
            charge: agent.charge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        assert_eq!(a.distance_to(Position::new(3.0, 4.0)), 5.0);
        assert_eq!(a.distance_to(a), 0.0);
    }

    #[test]
    fn goal_request_accepts_legacy_name_field() {
        let req: GoalRequest =
            serde_json::from_str(r#"{"name":"BOT_3","goal_x":1.5,"goal_y":2.0}"#).unwrap();
        assert_eq!(req, GoalRequest::named("BOT_3", 1.5, 2.0));
    }

    #[test]
    fn goal_request_without_identity_is_nearest() {
        let req: GoalRequest = serde_json::from_str(r#"{"goal_x":1.0,"goal_y":0.0}"#).unwrap();
        assert!(req.agent_identity.is_none());
        assert_eq!(req.target(), Position::new(1.0, 0.0));
    }

    #[test]
    fn agent_record_serializes_flat() {
        let agent = Agent {
            id: AgentId::new("BOT_1"),
            position: Position::new(1.0, 2.0),
            charge: 90.5,
        };
        let json = serde_json::to_value(AgentRecord::from(&agent)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "x": 1.0, "y": 2.0, "identity": "BOT_1", "charge": 90.5 })
        );
    }
}
