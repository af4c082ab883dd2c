use crate::schema::{chat_messages, checkpoints};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

/// One answered chat message
#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable,
)]
#[diesel(table_name = chat_messages)]
pub struct ChatMessageRecord {
    pub id: String,
    /// Correlation id of the request that produced the answer
    pub correlation_id: Option<String>,
    /// The user's message
    pub message: String,
    /// The answer sent back
    pub response: String,
    /// JSON serialized task graph, absent when the guardrail rejected the input
    pub task_graph: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Latest snapshot of a run
#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable,
)]
#[diesel(table_name = checkpoints, primary_key(task_graph_id))]
pub struct CheckpointRecord {
    pub task_graph_id: String,
    /// JSON serialized agent state
    pub state: String,
    pub updated_at: String,
}
