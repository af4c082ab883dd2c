use super::retry::{RetryDecision, RetryNode};
use super::router::Router;
use super::state::AgentState;
use crate::capabilities::{CapabilityTable, Hop};
use crate::errors::{Error, Result};
use crate::event::Event;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Drives one run: router, capability dispatch and retry policy in a single loop
#[derive(Clone)]
pub struct Engine {
    capabilities: CapabilityTable,
}

impl Engine {
    pub fn new(capabilities: CapabilityTable) -> Self {
        Self { capabilities }
    }

    /// Upper bound on handler invocations for a state: every task known to it
    /// may be dispatched at most `max_retries + 1` times.
    pub fn dispatch_budget(state: &AgentState) -> usize {
        let tasks = state.task_graph.tasks.len() + usize::from(state.current_task.is_some());
        tasks.saturating_mul(state.max_retries as usize + 1)
    }

    /// Runs the state until no task remains and returns the final state
    pub async fn run(&self, state: AgentState) -> Result<AgentState> {
        self.run_observed(state, None).await
    }

    /// Same as [`Engine::run`], reporting progress on `events` when given
    pub async fn run_observed(
        &self,
        mut state: AgentState,
        events: Option<&UnboundedSender<Event>>,
    ) -> Result<AgentState> {
        let emit = |event: Event| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        let budget = Self::dispatch_budget(&state);
        let mut dispatches = 0usize;
        info!(
            task_graph_id = %state.task_graph_id,
            tasks = state.task_graph.tasks.len(),
            max_retries = state.max_retries,
            "Starting run"
        );

        loop {
            Router::process(&mut state)?;

            let Hop::Dispatch(subgraph) = CapabilityTable::next_hop(&state) else {
                break;
            };

            if dispatches >= budget {
                return Err(Error::InvariantViolation(format!(
                    "run {} exceeded its dispatch budget of {}",
                    state.task_graph_id, budget
                )));
            }
            dispatches += 1;

            let (task_id, retry_count) = match &state.current_task {
                Some(task) => (task.id().to_string(), task.retry_count),
                None => break,
            };
            emit(Event::TaskStarted {
                task_id: task_id.clone(),
                subgraph,
                retry_count,
            });

            self.capabilities.dispatch(&mut state).await;

            match &state.current_task {
                None => {
                    if let Some(done) = state.completed_tasks.get(&task_id) {
                        emit(Event::TaskResolved {
                            task_id: task_id.clone(),
                            status: done.status,
                        });
                    }
                }
                Some(task) if task.status.needs_retry() => {
                    let error = task.error.clone();
                    match RetryNode::process(&mut state) {
                        RetryDecision::Requeued { retry_count, .. } => {
                            emit(Event::TaskRequeued {
                                task_id: task_id.clone(),
                                retry_count,
                                error,
                            })
                        }
                        RetryDecision::Exhausted { .. } => emit(Event::TaskFailed {
                            task_id: task_id.clone(),
                            error,
                        }),
                        RetryDecision::Skipped => {}
                    }
                }
                Some(task) => {
                    debug!(task_id = %task_id, status = %task.status, "Task left in the active slot");
                }
            }
        }

        info!(
            task_graph_id = %state.task_graph_id,
            completed = state.completed_tasks.len(),
            dispatches,
            "Run finished"
        );
        emit(Event::RunFinished {
            task_graph_id: state.task_graph_id.clone(),
        });
        Ok(state)
    }
}
