use super::Capability;
use crate::constants::{render_prompt, CITATION_SYSTEM_PROMPT, DRAFT_SYSTEM_PROMPT};
use crate::core::{AgentState, ExecutionStatus, SubgraphType, TaskResult};
use crate::errors::Result;
use crate::llm::{CallOptions, LlmClient};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Terminal step of a run: drafts the answer from the collected evidence and,
/// when sources are available, rewrites it with citations.
pub struct ConversationCapability {
    llm: Arc<LlmClient>,
}

impl ConversationCapability {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self { llm }
    }

    async fn draft(&self, question: &str, evidence: &str) -> Result<String> {
        let system_prompt = render_prompt(
            DRAFT_SYSTEM_PROMPT,
            &[("question", question), ("evidence", evidence)],
        );
        self.llm
            .complete(&system_prompt, question, CallOptions::default())
            .await
    }

    async fn cite(&self, question: &str, evidence: &str, answer: &str) -> Result<String> {
        let system_prompt = render_prompt(
            CITATION_SYSTEM_PROMPT,
            &[("question", question), ("evidence", evidence), ("answer", answer)],
        );
        self.llm
            .complete(&system_prompt, question, CallOptions::default())
            .await
    }
}

#[async_trait]
impl Capability for ConversationCapability {
    fn name(&self) -> &str {
        "conversation"
    }

    fn subgraph_type(&self) -> SubgraphType {
        SubgraphType::Conversation
    }

    async fn process(&self, state: &mut AgentState) -> Result<()> {
        let question = state.query().to_string();
        let evidence = state.render_evidence();

        let mut answer = self.draft(&question, &evidence).await?;
        if state.has_citations() {
            debug!("Adding citations to the drafted answer");
            answer = self.cite(&question, &evidence, &answer).await?;
        }

        state.final_answer = answer.clone();
        state.resolve_current(ExecutionStatus::Success, TaskResult::Conversation { answer });
        Ok(())
    }
}
