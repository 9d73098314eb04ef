use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::FleetResult;
use crate::model::AgentRecord;
use crate::state::FleetState;
use crate::table::AgentTable;

/// Read-only copy of the agent table handed to external readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub tick: u64,
    pub timestamp_ms: i64,
    pub agents: Vec<AgentRecord>,
}

impl FleetSnapshot {
    pub fn from_state(state: &FleetState) -> Self {
        Self {
            tick: state.tick,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            agents: state.records(),
        }
    }
}

/// Republishes the committed agent table on a watch channel.
///
/// Each [`refresh`](Self::refresh) reads the table once; subscribers only
/// wake when the tick number moved since the last publish.
pub struct SnapshotPublisher {
    table: Arc<dyn AgentTable>,
    tx: watch::Sender<Arc<FleetSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new(table: Arc<dyn AgentTable>) -> FleetResult<Self> {
        let state = table.load()?;
        let initial = FleetSnapshot::from_state(&state);
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Ok(Self { table, tx })
    }

    /// Reloads the table and publishes it if it changed. Returns the
    /// snapshot readers now see.
    pub fn refresh(&self) -> FleetResult<Arc<FleetSnapshot>> {
        let state = self.table.load()?;
        self.tx.send_if_modified(|current| {
            if current.tick == state.tick {
                return false;
            }
            *current = Arc::new(FleetSnapshot::from_state(&state));
            true
        });
        Ok(self.current())
    }

    pub fn current(&self) -> Arc<FleetSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.tx.subscribe()
    }
}
