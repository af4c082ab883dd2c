//! Run snapshots keyed by task graph id, for resumption and audit.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use crate::core::AgentState;
use crate::errors::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Stores `state` under its `task_graph_id`, replacing any earlier snapshot
    async fn save(&self, state: &AgentState) -> Result<()>;

    async fn get(&self, task_graph_id: &str) -> Result<Option<AgentState>>;

    async fn clear(&self, task_graph_id: &str) -> Result<()>;
}
