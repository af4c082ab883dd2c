//! Tabular data access for the DB capabilities.
//!
//! Capabilities never hand raw code to the store: the LLM writes a
//! [`QueryProgram`], a small JSON document that is schema-checked and then
//! interpreted against the rows.

mod file_store;
mod program;

pub use file_store::*;
pub use program::*;

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Shape of the table, rendered into prompts so the LLM can write programs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub sample: Vec<Map<String, Value>>,
}

impl TableSummary {
    pub fn to_prompt(&self) -> String {
        let sample = serde_json::to_string_pretty(&self.sample).unwrap_or_default();
        format!(
            "Columns: {}\nRow count: {}\nSample rows:\n{}",
            self.columns.join(", "),
            self.row_count,
            sample
        )
    }
}

/// Operations a table backend offers to the capabilities
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Runs a read-only program and returns its output
    async fn search(&self, program: &QueryProgram) -> Result<Value>;

    /// Applies the program's `set` to every matching row.
    ///
    /// # Returns
    /// * `Result<Value>` - `{"updated_records": n}`
    async fn update(&self, program: &QueryProgram) -> Result<Value>;

    async fn describe(&self) -> Result<TableSummary>;
}
