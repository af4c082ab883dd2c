use super::CheckpointStore;
use crate::core::AgentState;
use crate::db::{CheckpointRepository, Database};
use crate::errors::Result;
use async_trait::async_trait;
use tracing::debug;

/// Checkpoints persisted in the `checkpoints` table as JSON
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    db: Database,
}

impl SqliteCheckpointStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, state: &AgentState) -> Result<()> {
        let graph_id = state.task_graph_id.clone();
        let serialized = serde_json::to_string(state)?;
        debug!(task_graph_id = %graph_id, "Saving checkpoint");
        self.db
            .run(move |conn| CheckpointRepository::new(conn).upsert(&graph_id, &serialized))
            .await
    }

    async fn get(&self, task_graph_id: &str) -> Result<Option<AgentState>> {
        let graph_id = task_graph_id.to_string();
        let record = self
            .db
            .run(move |conn| CheckpointRepository::new(conn).find(&graph_id))
            .await?;
        record
            .map(|r| serde_json::from_str::<AgentState>(&r.state).map_err(Into::into))
            .transpose()
    }

    async fn clear(&self, task_graph_id: &str) -> Result<()> {
        let graph_id = task_graph_id.to_string();
        self.db
            .run(move |conn| CheckpointRepository::new(conn).delete(&graph_id).map(|_| ()))
            .await
    }
}
