use super::ChatMessageResponse;
use crate::db::{ChatMessageRecord, ChatRepository, Database};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Where answered messages are kept
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    async fn append(&self, response: &ChatMessageResponse, correlation_id: &str) -> Result<()>;

    /// Every stored response, oldest first
    async fn list(&self) -> Result<Vec<ChatMessageResponse>>;
}

#[derive(Debug, Default)]
pub struct InMemoryChatHistory {
    messages: RwLock<Vec<ChatMessageResponse>>,
}

#[async_trait]
impl ChatHistoryStore for InMemoryChatHistory {
    async fn append(&self, response: &ChatMessageResponse, _correlation_id: &str) -> Result<()> {
        self.messages.write().await.push(response.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ChatMessageResponse>> {
        Ok(self.messages.read().await.clone())
    }
}

/// History in the `chat_messages` table
#[derive(Debug, Clone)]
pub struct SqliteChatHistory {
    db: Database,
}

impl SqliteChatHistory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatHistoryStore for SqliteChatHistory {
    async fn append(&self, response: &ChatMessageResponse, correlation_id: &str) -> Result<()> {
        let record = ChatMessageRecord {
            id: response.id.clone(),
            correlation_id: Some(correlation_id.to_string()),
            message: response.message.clone(),
            response: response.response.clone(),
            task_graph: response
                .task_graph
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            created_at: response.timestamp.to_rfc3339(),
        };
        self.db
            .run(move |conn| ChatRepository::new(conn).insert_message(&record))
            .await
    }

    async fn list(&self) -> Result<Vec<ChatMessageResponse>> {
        let records = self
            .db
            .run(|conn| ChatRepository::new(conn).list_messages())
            .await?;
        records.into_iter().map(record_to_response).collect()
    }
}

fn record_to_response(record: ChatMessageRecord) -> Result<ChatMessageResponse> {
    let timestamp = DateTime::parse_from_rfc3339(&record.created_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let task_graph = record
        .task_graph
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    Ok(ChatMessageResponse {
        id: record.id,
        message: record.message,
        response: record.response,
        timestamp,
        task_graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SubgraphType, TaskGraph, TaskNode};

    #[tokio::test]
    async fn sqlite_history_keeps_the_task_graph() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let history = SqliteChatHistory::new(Database::new(db_path.to_str().unwrap()).unwrap());

        let graph = TaskGraph::new(
            "q",
            vec![TaskNode::new("c", SubgraphType::Conversation, "answer")],
        )
        .unwrap();
        let response = ChatMessageResponse::new("q", "a", Some(graph));
        history.append(&response, "corr-1").await.unwrap();

        let listed = history.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, response.id);
        assert_eq!(listed[0].task_graph.as_ref().unwrap().tasks.ids(), vec!["c"]);
    }
}
