use super::state::AgentState;
use super::task_state::ExecutionStatus;
use tracing::{info, warn};

/// What the retry policy did with the current task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueued at the tail with the given retry count
    Requeued { task_id: String, retry_count: u32 },
    /// Archived as permanently failed
    Exhausted { task_id: String, retry_count: u32 },
    /// No failed task to act on
    Skipped,
}

/// Bounded retry policy for a failed current task.
///
/// Only edits scheduling state; never calls a capability. Both branches
/// leave `current_task` empty so the task id lives in exactly one place.
pub struct RetryNode;

impl RetryNode {
    /// Whether the state holds a task this node should act on
    pub fn applies(state: &AgentState) -> bool {
        state
            .current_task
            .as_ref()
            .is_some_and(|task| task.status.needs_retry())
    }

    pub fn process(state: &mut AgentState) -> RetryDecision {
        if !Self::applies(state) {
            return RetryDecision::Skipped;
        }
        let Some(mut task) = state.current_task.take() else {
            return RetryDecision::Skipped;
        };
        let task_id = task.id().to_string();

        if task.retry_count >= state.max_retries {
            warn!(
                task_id = %task_id,
                retry_count = task.retry_count,
                error = task.error.as_deref().unwrap_or(""),
                "Task failed permanently"
            );
            task.status = ExecutionStatus::Failed;
            let retry_count = task.retry_count;
            state.completed_tasks.insert(task);
            state.touch();
            return RetryDecision::Exhausted {
                task_id,
                retry_count,
            };
        }

        task.retry_count += 1;
        task.status = ExecutionStatus::Retrying;
        task.result = None;
        info!(
            task_id = %task_id,
            retry_count = task.retry_count,
            max_retries = state.max_retries,
            "Re-enqueueing failed task"
        );

        let mut node = task.task_node;
        node.status = ExecutionStatus::Pending;
        state.task_graph.tasks.push_attempted(node, task.retry_count);
        state.touch();

        RetryDecision::Requeued {
            task_id,
            retry_count: task.retry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SubgraphType, TaskExecutionState, TaskGraph, TaskNode};

    fn failing_state(retry_count: u32, max_retries: u32) -> AgentState {
        let graph = TaskGraph::new(
            "q",
            vec![TaskNode::new("next", SubgraphType::Conversation, "answer")],
        )
        .unwrap();
        let mut state = AgentState::new("g", graph, max_retries);
        let mut task =
            TaskExecutionState::running(TaskNode::new("a", SubgraphType::WebSearch, "s"), retry_count);
        task.status = ExecutionStatus::Failed;
        task.error = Some("boom".to_string());
        state.current_task = Some(task);
        state
    }

    #[test]
    fn requeues_at_the_tail_with_incremented_count() {
        let mut state = failing_state(0, 2);

        let decision = RetryNode::process(&mut state);

        assert_eq!(
            decision,
            RetryDecision::Requeued {
                task_id: "a".to_string(),
                retry_count: 1
            }
        );
        assert!(state.current_task.is_none());
        assert_eq!(state.task_graph.tasks.ids(), vec!["next", "a"]);
        let tail = state.task_graph.tasks.iter().last().unwrap();
        assert_eq!(tail.attempts, 1);
        assert_eq!(tail.node.status, ExecutionStatus::Pending);
        assert!(state.completed_tasks.is_empty());
    }

    #[test]
    fn archives_when_retries_are_exhausted() {
        let mut state = failing_state(2, 2);

        let decision = RetryNode::process(&mut state);

        assert!(matches!(decision, RetryDecision::Exhausted { retry_count: 2, .. }));
        assert!(state.current_task.is_none());
        assert_eq!(state.task_graph.tasks.ids(), vec!["next"]);
        let archived = state.completed_tasks.get("a").unwrap();
        assert_eq!(archived.status, ExecutionStatus::Failed);
        assert_eq!(archived.error.as_deref(), Some("boom"));
    }

    #[test]
    fn zero_max_retries_fails_on_first_error() {
        let mut state = failing_state(0, 0);
        assert!(matches!(
            RetryNode::process(&mut state),
            RetryDecision::Exhausted { .. }
        ));
    }

    #[test]
    fn ignores_non_failed_tasks() {
        let mut state = failing_state(0, 2);
        state.current_task.as_mut().unwrap().status = ExecutionStatus::Running;
        assert_eq!(RetryNode::process(&mut state), RetryDecision::Skipped);
        assert!(state.current_task.is_some());
    }
}
