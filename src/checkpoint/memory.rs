use super::CheckpointStore;
use crate::core::AgentState;
use crate::errors::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local checkpoints, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    states: RwLock<HashMap<String, AgentState>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, state: &AgentState) -> Result<()> {
        self.states
            .write()
            .await
            .insert(state.task_graph_id.clone(), state.clone());
        Ok(())
    }

    async fn get(&self, task_graph_id: &str) -> Result<Option<AgentState>> {
        Ok(self.states.read().await.get(task_graph_id).cloned())
    }

    async fn clear(&self, task_graph_id: &str) -> Result<()> {
        self.states.write().await.remove(task_graph_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskGraph;

    #[tokio::test]
    async fn save_get_clear() {
        let store = InMemoryCheckpointStore::new();
        let mut state = AgentState::new("g1", TaskGraph::new("q", vec![]).unwrap(), 2);

        store.save(&state).await.unwrap();
        state.final_answer = "done".to_string();
        store.save(&state).await.unwrap();

        let saved = store.get("g1").await.unwrap().unwrap();
        assert_eq!(saved.final_answer, "done");

        store.clear("g1").await.unwrap();
        assert!(store.get("g1").await.unwrap().is_none());
        assert!(store.get("unknown").await.unwrap().is_none());
    }
}
