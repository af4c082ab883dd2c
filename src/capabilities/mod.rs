//! Task capabilities: one handler per subgraph type, and the static table the
//! engine dispatches through.

mod conversation;
mod db_search;
mod db_update;
mod web_search;

pub use conversation::*;
pub use db_search::*;
pub use db_update::*;
pub use web_search::*;

use crate::core::{AgentState, SubgraphType};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Contract every task handler satisfies.
///
/// `process` works on `state.current_task`. On success it archives the task
/// (SUCCESS or COMPLETED, `result` set), usually after appending one evidence
/// entry. On failure it either leaves the task current with status FAILED, or
/// returns an error which the dispatcher records the same way.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn subgraph_type(&self) -> SubgraphType;
    async fn process(&self, state: &mut AgentState) -> Result<()>;
}

/// Next step of the engine after routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    Dispatch(SubgraphType),
    End,
}

/// Maps each subgraph type to exactly one handler
#[derive(Clone)]
pub struct CapabilityTable {
    db_search: Arc<dyn Capability>,
    web_search: Arc<dyn Capability>,
    db_update: Arc<dyn Capability>,
    conversation: Arc<dyn Capability>,
}

impl CapabilityTable {
    /// Builds the table, checking every handler sits in its own slot
    pub fn new(
        db_search: Arc<dyn Capability>,
        web_search: Arc<dyn Capability>,
        db_update: Arc<dyn Capability>,
        conversation: Arc<dyn Capability>,
    ) -> Result<Self> {
        for (slot, handler) in [
            (SubgraphType::DbSearch, &db_search),
            (SubgraphType::WebSearch, &web_search),
            (SubgraphType::DbUpdate, &db_update),
            (SubgraphType::Conversation, &conversation),
        ] {
            if handler.subgraph_type() != slot {
                return Err(Error::Validation(format!(
                    "capability '{}' handles {} but was registered for {}",
                    handler.name(),
                    handler.subgraph_type(),
                    slot
                )));
            }
        }

        Ok(Self {
            db_search,
            web_search,
            db_update,
            conversation,
        })
    }

    pub fn handler_for(&self, subgraph: SubgraphType) -> &dyn Capability {
        match subgraph {
            SubgraphType::DbSearch => self.db_search.as_ref(),
            SubgraphType::WebSearch => self.web_search.as_ref(),
            SubgraphType::DbUpdate => self.db_update.as_ref(),
            SubgraphType::Conversation => self.conversation.as_ref(),
        }
    }

    /// Where the engine goes once the router has run
    pub fn next_hop(state: &AgentState) -> Hop {
        match &state.current_task {
            Some(task) => Hop::Dispatch(task.subgraph_type()),
            None => Hop::End,
        }
    }

    /// Invokes the handler for the current task.
    ///
    /// Handler errors stop here: they are written into the task's status and
    /// error fields instead of being returned.
    pub async fn dispatch(&self, state: &mut AgentState) {
        let Hop::Dispatch(subgraph) = Self::next_hop(state) else {
            return;
        };
        let handler = self.handler_for(subgraph);

        if let Err(e) = handler.process(state).await {
            let task_id = state
                .current_task
                .as_ref()
                .map(|t| t.id().to_string())
                .unwrap_or_default();
            error!(task_id = %task_id, capability = handler.name(), "Capability failed: {}", e);
            state.fail_current(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionStatus, TaskExecutionState, TaskGraph, TaskNode, TaskResult};

    struct Fixed(SubgraphType, bool);

    #[async_trait]
    impl Capability for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn subgraph_type(&self) -> SubgraphType {
            self.0
        }

        async fn process(&self, state: &mut AgentState) -> Result<()> {
            if self.1 {
                state.resolve_current(
                    ExecutionStatus::Success,
                    TaskResult::Conversation {
                        answer: self.0.to_string(),
                    },
                );
                Ok(())
            } else {
                Err(Error::Executor("unreachable backend".to_string()))
            }
        }
    }

    fn table(succeed: bool) -> CapabilityTable {
        CapabilityTable::new(
            Arc::new(Fixed(SubgraphType::DbSearch, succeed)),
            Arc::new(Fixed(SubgraphType::WebSearch, succeed)),
            Arc::new(Fixed(SubgraphType::DbUpdate, succeed)),
            Arc::new(Fixed(SubgraphType::Conversation, succeed)),
        )
        .unwrap()
    }

    fn state_with_current(subgraph: SubgraphType) -> AgentState {
        let mut state = AgentState::new("g", TaskGraph::new("q", vec![]).unwrap(), 1);
        state.current_task = Some(TaskExecutionState::running(
            TaskNode::new("t", subgraph, "d"),
            0,
        ));
        state
    }

    #[test]
    fn rejects_a_handler_in_the_wrong_slot() {
        let result = CapabilityTable::new(
            Arc::new(Fixed(SubgraphType::WebSearch, true)),
            Arc::new(Fixed(SubgraphType::WebSearch, true)),
            Arc::new(Fixed(SubgraphType::DbUpdate, true)),
            Arc::new(Fixed(SubgraphType::Conversation, true)),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn selects_the_handler_by_subgraph_type() {
        let table = table(true);
        for subgraph in SubgraphType::ALL {
            assert_eq!(table.handler_for(subgraph).subgraph_type(), subgraph);
        }
    }

    #[test]
    fn absent_task_routes_to_end() {
        let state = AgentState::new("g", TaskGraph::new("q", vec![]).unwrap(), 1);
        assert_eq!(CapabilityTable::next_hop(&state), Hop::End);
        assert_eq!(
            CapabilityTable::next_hop(&state_with_current(SubgraphType::DbUpdate)),
            Hop::Dispatch(SubgraphType::DbUpdate)
        );
    }

    #[tokio::test]
    async fn handler_error_is_recorded_on_the_task() {
        let mut state = state_with_current(SubgraphType::WebSearch);

        table(false).dispatch(&mut state).await;

        let current = state.current_task.as_ref().unwrap();
        assert_eq!(current.status, ExecutionStatus::Failed);
        assert_eq!(
            current.error.as_deref(),
            Some("Executor error: unreachable backend")
        );
    }

    #[tokio::test]
    async fn successful_handler_archives_the_task() {
        let mut state = state_with_current(SubgraphType::Conversation);

        table(true).dispatch(&mut state).await;

        assert!(state.current_task.is_none());
        assert_eq!(
            state.completed_tasks.get("t").unwrap().status,
            ExecutionStatus::Success
        );
    }
}
