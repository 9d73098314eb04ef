use thiserror::Error;

use crate::model::AgentId;

/// Outcomes a fleet component can report instead of success.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FleetError {
    /// A nearest-idle dispatch found no agent without an active goal.
    #[error("no idle agent is available for the requested goal")]
    NoAvailableAgent,

    /// An operation named an agent that is not part of the fleet.
    #[error("unknown agent '{0}'")]
    UnknownAgent(AgentId),

    /// The queue or agent table backend could not be reached or written.
    #[error("{backend} storage unavailable: {reason}")]
    StorageUnavailable {
        backend: &'static str,
        reason: String,
    },

    /// Startup configuration that cannot produce a working simulation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A dispatch request that can never be satisfied, e.g. a NaN goal.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FleetError {
    pub(crate) fn storage(backend: &'static str, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            backend,
            reason: reason.to_string(),
        }
    }
}

pub type FleetResult<T> = Result<T, FleetError>;
