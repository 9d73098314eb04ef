//! `fleet_core` — task dispatch and position integration for a fleet of
//! point agents.
//!
//! | Module         | Contents                                                      |
//! |----------------|---------------------------------------------------------------|
//! | [`model`]      | `AgentId`, `Position`, `Agent`, `GoalAssignment`, wire types  |
//! | [`state`]      | `FleetState` — agents plus the active goals table             |
//! | [`queue`]      | `TaskQueue` trait, `MemoryTaskQueue`                          |
//! | [`table`]      | `AgentTable` trait, `MemoryAgentTable`, `CsvAgentTable`       |
//! | [`simulation`] | `advance`, `Simulation` — one tick of movement               |
//! | [`dispatcher`] | `Dispatcher`, `nearest_idle`                                  |
//! | [`snapshot`]   | `SnapshotPublisher`, `FleetSnapshot`                          |
//! | [`config`]     | `FleetConfig` validation and agent generation                 |
//! | [`backoff`]    | `Backoff` for failing periodic loops                          |
//! | [`error`]      | `FleetError`, `FleetResult<T>`                                |
//!
//! The dispatcher writes only to the queue. The simulation is the only
//! writer of the agent table: it drains the queue into the active goals
//! table, moves agents and commits the result in one swap. Readers (the
//! snapshot publisher, nearest-idle selection, busy queries) always work on
//! a whole committed tick.

pub mod backoff;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod queue;
pub mod simulation;
pub mod snapshot;
pub mod state;
pub mod table;

pub use backoff::Backoff;
pub use config::{FleetConfig, ValueRange};
pub use dispatcher::{nearest_idle, Dispatcher};
pub use error::{FleetError, FleetResult};
pub use model::{Agent, AgentId, AgentRecord, GoalAssignment, GoalRequest, Position};
pub use queue::{MemoryTaskQueue, TaskQueue};
pub use simulation::{advance, Simulation, StepReport};
pub use snapshot::{FleetSnapshot, SnapshotPublisher};
pub use state::FleetState;
pub use table::{AgentTable, CsvAgentTable, MemoryAgentTable};
