//! Core module containing the task-dispatch engine
//!
//! This module contains:
//! - The task model (nodes, graph, FIFO queue, execution status)
//! - The run-scoped agent state
//! - The router and the retry policy
//! - The engine loop tying them to the capabilities

mod engine;
mod queue;
mod retry;
mod router;
mod state;
mod task;
mod task_state;

pub use engine::*;
pub use queue::*;
pub use retry::*;
pub use router::*;
pub use state::*;
pub use task::*;
pub use task_state::*;
