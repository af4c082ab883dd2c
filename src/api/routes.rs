//! API routes configuration module

use crate::api::handlers::{get_history, post_message};
use crate::api::middleware::correlation_id;
use crate::app::AppContext;
use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

/// Creates and configures the API router with all routes
///
/// # Arguments
/// * `ctx` - Application context shared across handlers
///
/// # Returns
/// * `Router` - Configured router with all API endpoints and middleware
pub fn app(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/chat/message", post(post_message))
        .route("/chat/history", get(get_history))
        .layer(Extension(ctx))
        .layer(middleware::from_fn(correlation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{Capability, CapabilityTable};
    use crate::checkpoint::InMemoryCheckpointStore;
    use crate::constants::CORRELATION_HEADER;
    use crate::core::{
        AgentState, Engine, ExecutionStatus, SubgraphType, TaskGraph, TaskNode, TaskResult,
    };
    use crate::errors::Result;
    use crate::services::{
        ChatHistoryResponse, ChatMessageResponse, ChatService, Decomposer, DisabledGuardrail,
        InMemoryChatHistory,
    };
    use async_trait::async_trait;
    use serde_json::json;

    struct OneStep;

    #[async_trait]
    impl Decomposer for OneStep {
        async fn decompose(&self, query: &str) -> Result<TaskGraph> {
            TaskGraph::new(
                query,
                vec![TaskNode::new("c", SubgraphType::Conversation, "answer")],
            )
        }
    }

    struct Reply(SubgraphType);

    #[async_trait]
    impl Capability for Reply {
        fn name(&self) -> &str {
            "reply"
        }

        fn subgraph_type(&self) -> SubgraphType {
            self.0
        }

        async fn process(&self, state: &mut AgentState) -> Result<()> {
            state.final_answer = "42".to_string();
            state.resolve_current(
                ExecutionStatus::Success,
                TaskResult::Conversation {
                    answer: "42".to_string(),
                },
            );
            Ok(())
        }
    }

    async fn serve() -> String {
        let table = CapabilityTable::new(
            Arc::new(Reply(SubgraphType::DbSearch)),
            Arc::new(Reply(SubgraphType::WebSearch)),
            Arc::new(Reply(SubgraphType::DbUpdate)),
            Arc::new(Reply(SubgraphType::Conversation)),
        )
        .unwrap();
        let chat = ChatService::new(
            Arc::new(OneStep),
            Arc::new(DisabledGuardrail),
            Engine::new(table),
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(InMemoryChatHistory::default()),
            2,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(AppContext::new(chat))).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn message_round_trip_echoes_correlation_id() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{}/chat/message", base))
            .header(CORRELATION_HEADER, "abc-123")
            .json(&json!({"message": "meaning of life?"}))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
        assert_eq!(res.headers()[CORRELATION_HEADER], "abc-123");
        let body: ChatMessageResponse = res.json().await.unwrap();
        assert_eq!(body.response, "42");
        assert_eq!(body.message, "meaning of life?");

        let res = client
            .get(format!("{}/chat/history", base))
            .send()
            .await
            .unwrap();
        let generated = res.headers()[CORRELATION_HEADER].to_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
        let history: ChatHistoryResponse = res.json().await.unwrap();
        assert_eq!(history.messages.len(), 1);
    }

    #[tokio::test]
    async fn empty_message_is_a_bad_request() {
        let base = serve().await;
        let res = reqwest::Client::new()
            .post(format!("{}/chat/message", base))
            .json(&json!({"message": "  "}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
    }
}
