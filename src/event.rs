use crate::core::{ExecutionStatus, SubgraphType};

/// Progress notifications emitted by the engine while a run is in flight
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A task was handed to its capability
    TaskStarted {
        task_id: String,
        subgraph: SubgraphType,
        retry_count: u32,
    },

    /// A task left the active slot with a terminal status
    TaskResolved {
        task_id: String,
        status: ExecutionStatus,
    },

    /// A failed task went back to the tail of the queue
    TaskRequeued {
        task_id: String,
        retry_count: u32,
        error: Option<String>,
    },

    /// A task exhausted its retries
    TaskFailed { task_id: String, error: Option<String> },

    /// The pending queue is empty
    RunFinished { task_graph_id: String },
}

impl Event {
    /// One-line description for spinners and logs
    pub fn message(&self) -> String {
        match self {
            Event::TaskStarted {
                subgraph,
                retry_count,
                ..
            } => {
                let verb = match subgraph {
                    SubgraphType::DbSearch => "🔍 Searching the dataset",
                    SubgraphType::WebSearch => "🌐 Searching the web",
                    SubgraphType::DbUpdate => "✏️ Updating the dataset",
                    SubgraphType::Conversation => "💬 Drafting the answer",
                };
                if *retry_count > 0 {
                    format!("{}... (retry {})", verb, retry_count)
                } else {
                    format!("{}...", verb)
                }
            }
            Event::TaskResolved { task_id, status } => format!("Task {} {}", task_id, status),
            Event::TaskRequeued {
                task_id,
                retry_count,
                ..
            } => format!("Task {} failed, retrying (attempt {})", task_id, retry_count + 1),
            Event::TaskFailed { task_id, error } => format!(
                "Task {} failed permanently: {}",
                task_id,
                error.as_deref().unwrap_or("unknown error")
            ),
            Event::RunFinished { .. } => "✅ All tasks processed".to_string(),
        }
    }
}
