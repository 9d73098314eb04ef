//! The shared agent table: the committed fleet state every reader sees.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{FleetError, FleetResult};
use crate::state::FleetState;

/// Storage for the committed [`FleetState`].
///
/// `load` hands out an immutable view; `commit` replaces the whole state at
/// once, so a reader never observes a tick half-applied.
pub trait AgentTable: Send + Sync {
    fn load(&self) -> FleetResult<Arc<FleetState>>;

    fn commit(&self, state: FleetState) -> FleetResult<()>;
}

pub struct MemoryAgentTable {
    current: RwLock<Arc<FleetState>>,
}

impl MemoryAgentTable {
    pub fn new(initial: FleetState) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }
}

impl AgentTable for MemoryAgentTable {
    fn load(&self) -> FleetResult<Arc<FleetState>> {
        Ok(self.current.read().clone())
    }

    fn commit(&self, state: FleetState) -> FleetResult<()> {
        *self.current.write() = Arc::new(state);
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    x: f64,
    y: f64,
    charge: f64,
}

/// In-memory table that also mirrors every commit to a `name,x,y,charge`
/// CSV file for external tools.
///
/// A failed file write fails the commit and leaves the in-memory state at
/// the previous tick.
pub struct CsvAgentTable {
    path: PathBuf,
    inner: MemoryAgentTable,
}

impl CsvAgentTable {
    /// Writes `initial` to `path` and starts serving it.
    pub fn create(path: impl Into<PathBuf>, initial: FleetState) -> FleetResult<Self> {
        let path = path.into();
        write_csv(&path, &initial)?;
        tracing::info!(path = %path.display(), agents = initial.agents.len(), "CSV agent table created");
        Ok(Self {
            path,
            inner: MemoryAgentTable::new(initial),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AgentTable for CsvAgentTable {
    fn load(&self) -> FleetResult<Arc<FleetState>> {
        self.inner.load()
    }

    fn commit(&self, state: FleetState) -> FleetResult<()> {
        write_csv(&self.path, &state)?;
        self.inner.commit(state)
    }
}

/// Writes to a sibling temp file and renames it over `path`, so a reader of
/// the file never sees a partially written table.
fn write_csv(path: &Path, state: &FleetState) -> FleetResult<()> {
    let tmp = path.with_extension("csv.tmp");
    let mut writer = csv::Writer::from_path(&tmp).map_err(|e| FleetError::storage("csv", e))?;
    for agent in &state.agents {
        writer
            .serialize(CsvRow {
                name: agent.id.as_str(),
                x: agent.position.x,
                y: agent.position.y,
                charge: agent.charge,
            })
            .map_err(|e| FleetError::storage("csv", e))?;
    }
    writer.flush().map_err(|e| FleetError::storage("csv", e))?;
    drop(writer);
    std::fs::rename(&tmp, path).map_err(|e| FleetError::storage("csv", e))
}
