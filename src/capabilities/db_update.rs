use super::Capability;
use crate::constants::{
    render_prompt, DB_UPDATE_SYSTEM_PROMPT, DB_UPDATE_USER_PROMPT, FORMAT_CHECK_ATTEMPTS,
    PROGRAM_FORMAT_REMINDER,
};
use crate::core::{AgentState, Evidence, ExecutionStatus, SubgraphType, TaskResult};
use crate::errors::{Error, Result};
use crate::llm::{CallOptions, ChatMessage, LlmClient};
use crate::tabular::{QueryProgram, TableSummary, TabularStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Applies data changes in three steps: generate, validate, apply.
pub struct DbUpdateCapability {
    llm: Arc<LlmClient>,
    store: Arc<dyn TabularStore>,
}

impl DbUpdateCapability {
    pub fn new(llm: Arc<LlmClient>, store: Arc<dyn TabularStore>) -> Self {
        Self { llm, store }
    }

    async fn generate(&self, state: &AgentState, table: &TableSummary) -> Result<String> {
        let task = state
            .current_task
            .as_ref()
            .ok_or_else(|| Error::InvariantViolation("db_update without a current task".into()))?;
        let user_prompt = render_prompt(
            DB_UPDATE_USER_PROMPT,
            &[
                ("table", &table.to_prompt()),
                ("query", state.query()),
                ("parameters", &task.task_node.parameters.to_prompt_json()),
                ("evidence", &state.render_evidence()),
            ],
        );

        let mut messages = vec![
            ChatMessage::system(DB_UPDATE_SYSTEM_PROMPT),
            ChatMessage::user(&user_prompt),
        ];
        self.llm
            .call_llm_with_format_check(
                &mut messages,
                |r| QueryProgram::parse(r).is_ok(),
                PROGRAM_FORMAT_REMINDER,
                FORMAT_CHECK_ATTEMPTS,
                CallOptions::json().with_temperature(0.0),
            )
            .await
    }
}

/// Rejects programs that are not narrow updates or that name unknown columns
pub fn validate_update(program: &QueryProgram, table: &TableSummary) -> Result<()> {
    program.ensure_update()?;
    let unknown: Vec<&str> = program
        .filters
        .iter()
        .map(|f| f.column.as_str())
        .chain(program.set.keys().map(String::as_str))
        .filter(|column| !table.columns.iter().any(|c| c.as_str() == *column))
        .collect();
    if !unknown.is_empty() {
        return Err(Error::Validation(format!(
            "update program names unknown columns: {}",
            unknown.join(", ")
        )));
    }
    Ok(())
}

#[async_trait]
impl Capability for DbUpdateCapability {
    fn name(&self) -> &str {
        "db_update"
    }

    fn subgraph_type(&self) -> SubgraphType {
        SubgraphType::DbUpdate
    }

    async fn process(&self, state: &mut AgentState) -> Result<()> {
        let table = self.store.describe().await?;
        let response = self.generate(state, &table).await?;

        let program = QueryProgram::parse(&response)?;
        validate_update(&program, &table)?;
        info!(program = %program.to_json(), "Applying update program");

        let output = self.store.update(&program).await?;
        let updated_records = output["updated_records"].as_u64().unwrap_or(0);
        if updated_records == 0 {
            warn!("Update program matched no rows");
        }

        let label = format!("db_update for {}", state.query());
        state.db_update_used = true;
        state.push_evidence(Evidence::new(
            SubgraphType::DbUpdate,
            label,
            output.to_string(),
        ));
        state.resolve_current(
            ExecutionStatus::Success,
            TaskResult::DbUpdate {
                program: program.to_json(),
                updated_records,
            },
        );
        Ok(())
    }
}
