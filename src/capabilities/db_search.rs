use super::Capability;
use crate::constants::{
    render_prompt, DB_SEARCH_SYSTEM_PROMPT, DB_SEARCH_USER_PROMPT, FORMAT_CHECK_ATTEMPTS,
    PROGRAM_FORMAT_REMINDER,
};
use crate::core::{
    AgentState, Evidence, ExecutionStatus, SubgraphType, TaskParameters, TaskResult,
};
use crate::errors::{Error, Result};
use crate::llm::{CallOptions, ChatMessage, LlmClient};
use crate::tabular::{QueryProgram, TabularStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Answers data questions: the LLM writes a read-only query program which
/// the tabular store evaluates.
pub struct DbSearchCapability {
    llm: Arc<LlmClient>,
    store: Arc<dyn TabularStore>,
}

impl DbSearchCapability {
    pub fn new(llm: Arc<LlmClient>, store: Arc<dyn TabularStore>) -> Self {
        Self { llm, store }
    }

    async fn generate(&self, state: &AgentState) -> Result<QueryProgram> {
        let task = state
            .current_task
            .as_ref()
            .ok_or_else(|| Error::InvariantViolation("db_search without a current task".into()))?;
        let table = self.store.describe().await?;
        let user_prompt = render_prompt(
            DB_SEARCH_USER_PROMPT,
            &[
                ("table", &table.to_prompt()),
                ("query", state.query()),
                ("parameters", &task.task_node.parameters.to_prompt_json()),
            ],
        );

        let mut messages = vec![
            ChatMessage::system(DB_SEARCH_SYSTEM_PROMPT),
            ChatMessage::user(&user_prompt),
        ];
        let response = self
            .llm
            .call_llm_with_format_check(
                &mut messages,
                |r| QueryProgram::parse(r).is_ok(),
                PROGRAM_FORMAT_REMINDER,
                FORMAT_CHECK_ATTEMPTS,
                CallOptions::json().with_temperature(0.1),
            )
            .await?;

        let mut program = QueryProgram::parse(&response)?;
        if program.limit.is_none() {
            if let TaskParameters::DbSearch(params) = &task.task_node.parameters {
                program.limit = params.limit.filter(|&l| l > 0).map(|l| l as usize);
            }
        }
        Ok(program)
    }
}

#[async_trait]
impl Capability for DbSearchCapability {
    fn name(&self) -> &str {
        "db_search"
    }

    fn subgraph_type(&self) -> SubgraphType {
        SubgraphType::DbSearch
    }

    async fn process(&self, state: &mut AgentState) -> Result<()> {
        let program = self.generate(state).await?;
        info!(program = %program.to_json(), "Executing search program");

        let output = self.store.search(&program).await?;

        let label = format!("db_search for {}", state.query());
        state.db_search_used = true;
        state.push_evidence(Evidence::new(
            SubgraphType::DbSearch,
            label,
            output.to_string(),
        ));
        state.resolve_current(
            ExecutionStatus::Success,
            TaskResult::DbSearch {
                program: program.to_json(),
                output,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbSearchParams, TaskExecutionState, TaskGraph, TaskNode};
    use crate::llm::testing::ScriptedProvider;
    use crate::tabular::FileTableStore;
    use serde_json::json;

    fn store() -> Arc<dyn TabularStore> {
        let rows = serde_json::from_value(json!([
            {"title": "Gran Turismo", "console": "PS", "total_sales": "10.85m"},
            {"title": "Final Fantasy VII", "console": "PS", "total_sales": "9.90m"},
            {"title": "Halo 3", "console": "X360", "total_sales": "8.1m"}
        ]))
        .unwrap();
        Arc::new(FileTableStore::from_rows(rows))
    }

    fn running_state(parameters: TaskParameters) -> AgentState {
        let mut state = AgentState::new(
            "g",
            TaskGraph::new("best selling PS game", vec![]).unwrap(),
            2,
        );
        let node = TaskNode::new("s1", SubgraphType::DbSearch, "find it").with_parameters(parameters);
        state.current_task = Some(TaskExecutionState::running(node, 0));
        state
    }

    #[tokio::test]
    async fn runs_the_generated_program() {
        let provider = ScriptedProvider::new([
            "```json\n{\"filters\": [{\"column\": \"console\", \"op\": \"eq\", \"value\": \"ps\"}], \"sort\": {\"column\": \"total_sales\", \"descending\": true}, \"select\": [\"title\"]}\n```",
        ]);
        let capability = DbSearchCapability::new(Arc::new(provider.client()), store());
        let mut state = running_state(TaskParameters::DbSearch(DbSearchParams {
            limit: Some(1),
            ..Default::default()
        }));

        capability.process(&mut state).await.unwrap();

        assert!(state.current_task.is_none());
        assert!(state.db_search_used);
        let archived = state.completed_tasks.get("s1").unwrap();
        assert_eq!(archived.status, ExecutionStatus::Success);
        match archived.result.as_ref().unwrap() {
            TaskResult::DbSearch { output, .. } => {
                assert_eq!(output["rows"], json!([{"title": "Gran Turismo"}]));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(state.evidence().len(), 1);
        assert_eq!(state.evidence()[0].label, "db_search for best selling PS game");

        let calls = provider.calls.lock().unwrap();
        assert!(calls[0].1.json_response);
        assert!(calls[0].0[1].content.contains("Columns: title, console, total_sales"));
    }

    #[tokio::test]
    async fn zero_limit_parameter_is_ignored() {
        let provider = ScriptedProvider::new([
            "{\"filters\": [{\"column\": \"console\", \"op\": \"eq\", \"value\": \"ps\"}], \"select\": [\"title\"]}",
        ]);
        let capability = DbSearchCapability::new(Arc::new(provider.client()), store());
        let mut state = running_state(TaskParameters::DbSearch(DbSearchParams {
            limit: Some(0),
            ..Default::default()
        }));

        capability.process(&mut state).await.unwrap();

        match state.completed_tasks.get("s1").unwrap().result.as_ref().unwrap() {
            TaskResult::DbSearch { program, output } => {
                let program: QueryProgram = serde_json::from_str(program).unwrap();
                assert_eq!(program.limit, None);
                assert_eq!(
                    output["rows"],
                    json!([{"title": "Gran Turismo"}, {"title": "Final Fantasy VII"}])
                );
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_programs_fail_without_evidence() {
        let provider = ScriptedProvider::new(["df.head()", "still not json", "nope"]);
        let capability = DbSearchCapability::new(Arc::new(provider.client()), store());
        let mut state = running_state(TaskParameters::default_for(SubgraphType::DbSearch));

        let result = capability.process(&mut state).await;

        assert!(matches!(result, Err(Error::Llm(_))));
        assert_eq!(provider.call_count(), FORMAT_CHECK_ATTEMPTS);
        assert!(state.evidence().is_empty());
        assert!(!state.db_search_used);
        assert!(state.current_task.is_some());
    }
}
