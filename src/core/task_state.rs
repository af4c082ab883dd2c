use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution status of a task, both on the static node and on its run-time wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Waiting in the pending queue
    #[default]
    Pending,
    /// Installed as the current task and handed to a capability
    Running,
    /// Finished successfully (database capabilities and conversation)
    Success,
    /// Finished successfully (web search)
    Completed,
    /// The last attempt failed, or the task failed permanently once archived
    Failed,
    /// A capability asked for the task to be attempted again
    Retry,
    /// The retry policy re-enqueued the task
    Retrying,
}

impl ExecutionStatus {
    /// Whether the status marks a successfully resolved task
    pub fn is_success(self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Completed)
    }

    /// Whether the status should be handed to the retry policy
    pub fn needs_retry(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Failed | ExecutionStatus::Retry | ExecutionStatus::Retrying
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Retry => "retry",
            ExecutionStatus::Retrying => "retrying",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses() {
        assert!(ExecutionStatus::Success.is_success());
        assert!(ExecutionStatus::Completed.is_success());
        assert!(!ExecutionStatus::Failed.is_success());
        assert!(!ExecutionStatus::Running.is_success());
    }

    #[test]
    fn retry_statuses() {
        assert!(ExecutionStatus::Failed.needs_retry());
        assert!(ExecutionStatus::Retry.needs_retry());
        assert!(!ExecutionStatus::Pending.needs_retry());
    }
}
