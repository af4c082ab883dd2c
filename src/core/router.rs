use super::retry::RetryNode;
use super::state::{AgentState, TaskExecutionState};
use super::task_state::ExecutionStatus;
use crate::errors::{Error, Result};
use tracing::{debug, info};

/// Picks the next task from the pending queue and installs it as the current task
pub struct Router;

impl Router {
    /// Decides whether the active slot can be refilled.
    ///
    /// Failed or retry-flagged tasks go through the retry policy first, so the
    /// router and the retry node share one bounded retry path.
    pub fn check_completed(state: &mut AgentState) -> Result<bool> {
        let Some(current) = state.current_task.as_ref() else {
            return Ok(true);
        };

        match current.status {
            ExecutionStatus::Success | ExecutionStatus::Completed => Ok(true),
            ExecutionStatus::Failed | ExecutionStatus::Retry | ExecutionStatus::Retrying => {
                RetryNode::process(state);
                Ok(true)
            }
            ExecutionStatus::Running | ExecutionStatus::Pending => {
                Err(Error::InvariantViolation(format!(
                    "task {} is {} between dispatch steps",
                    current.id(),
                    current.status
                )))
            }
        }
    }

    /// Advances the state by one routing step.
    ///
    /// Leaves `current_task` empty when the queue is exhausted; the engine reads
    /// that as the end of the run.
    pub fn process(state: &mut AgentState) -> Result<()> {
        if !Self::check_completed(state)? {
            return Ok(());
        }

        if state.current_task.is_some() {
            state.archive_current();
        }

        let Some(next) = state.task_graph.tasks.pop() else {
            info!(task_graph_id = %state.task_graph_id, "No more tasks, ending run");
            return Ok(());
        };

        let mut node = next.node;
        node.status = ExecutionStatus::Running;
        debug!(
            task_id = %node.id,
            subgraph = %node.subgraph_type,
            retry_count = next.attempts,
            "Routing task"
        );
        state.current_task = Some(TaskExecutionState::running(node, next.attempts));
        state.touch();
        Ok(())
    }
}
