use super::{ChatHistoryStore, Decomposer, Guardrail};
use crate::checkpoint::CheckpointStore;
use crate::constants::FALLBACK_ANSWER;
use crate::core::{AgentState, Engine, TaskGraph};
use crate::errors::{Error, Result};
use crate::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

/// Answer to one chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub id: String,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    /// Graph the message was decomposed into, as planned before the run
    pub task_graph: Option<TaskGraph>,
}

impl ChatMessageResponse {
    pub fn new(message: &str, response: &str, task_graph: Option<TaskGraph>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
            task_graph,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageResponse>,
}

/// Full request pipeline: guardrail, decomposition, engine run, output check
pub struct ChatService {
    decomposer: Arc<dyn Decomposer>,
    guardrail: Arc<dyn Guardrail>,
    engine: Engine,
    checkpoints: Arc<dyn CheckpointStore>,
    history: Arc<dyn ChatHistoryStore>,
    max_retries: u32,
}

impl ChatService {
    pub fn new(
        decomposer: Arc<dyn Decomposer>,
        guardrail: Arc<dyn Guardrail>,
        engine: Engine,
        checkpoints: Arc<dyn CheckpointStore>,
        history: Arc<dyn ChatHistoryStore>,
        max_retries: u32,
    ) -> Self {
        Self {
            decomposer,
            guardrail,
            engine,
            checkpoints,
            history,
            max_retries,
        }
    }

    pub async fn process_message(
        &self,
        message: &str,
        correlation_id: &str,
    ) -> Result<ChatMessageResponse> {
        self.process_message_observed(message, correlation_id, None)
            .await
    }

    /// Same as [`ChatService::process_message`], forwarding engine events
    pub async fn process_message_observed(
        &self,
        message: &str,
        correlation_id: &str,
        events: Option<&UnboundedSender<Event>>,
    ) -> Result<ChatMessageResponse> {
        let span = info_span!("chat", correlation_id = %correlation_id);
        async {
            let response = match self.answer(message, events).await {
                Ok(response) => response,
                Err(e) => {
                    error!(correlation_id = %correlation_id, error = %e, "Chat pipeline failed");
                    ChatMessageResponse::new(message, FALLBACK_ANSWER, None)
                }
            };
            if let Err(e) = self.history.append(&response, correlation_id).await {
                error!(correlation_id = %correlation_id, error = %e, "Failed to record chat message");
            }
            info!("Chat message processed");
            Ok::<_, Error>(response)
        }
        .instrument(span)
        .await
    }

    pub async fn history(&self) -> Result<ChatHistoryResponse> {
        Ok(ChatHistoryResponse {
            messages: self.history.list().await?,
        })
    }

    async fn answer(
        &self,
        message: &str,
        events: Option<&UnboundedSender<Event>>,
    ) -> Result<ChatMessageResponse> {
        if !self.guardrail.check_input(message).await? {
            warn!("Input rejected by guardrail");
            return Ok(ChatMessageResponse::new(message, FALLBACK_ANSWER, None));
        }

        let graph = self.decomposer.decompose(message).await?;
        let planned = graph.clone();
        let state = AgentState::new(Uuid::new_v4().to_string(), graph, self.max_retries);
        self.checkpoints.save(&state).await?;

        let final_state = self.engine.run_observed(state, events).await?;
        self.checkpoints.save(&final_state).await?;

        let answer = if final_state.final_answer.trim().is_empty() {
            warn!(task_graph_id = %final_state.task_graph_id, "Run produced no answer");
            FALLBACK_ANSWER.to_string()
        } else if self.guardrail.check_output(&final_state).await?.is_valid() {
            final_state.final_answer.clone()
        } else {
            warn!(task_graph_id = %final_state.task_graph_id, "Answer not grounded in evidence");
            FALLBACK_ANSWER.to_string()
        };

        Ok(ChatMessageResponse::new(message, &answer, Some(planned)))
    }
}
