use super::queue::TaskQueue;
use super::task_state::ExecutionStatus;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Category of a task; selects the capability that executes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgraphType {
    #[serde(alias = "DB_SEARCH")]
    DbSearch,
    #[serde(alias = "WEB_SEARCH")]
    WebSearch,
    #[serde(alias = "DB_UPDATE")]
    DbUpdate,
    #[serde(alias = "CONVERSATION")]
    Conversation,
}

impl SubgraphType {
    pub const ALL: [SubgraphType; 4] = [
        SubgraphType::DbSearch,
        SubgraphType::WebSearch,
        SubgraphType::DbUpdate,
        SubgraphType::Conversation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubgraphType::DbSearch => "db_search",
            SubgraphType::WebSearch => "web_search",
            SubgraphType::DbUpdate => "db_update",
            SubgraphType::Conversation => "conversation",
        }
    }
}

impl fmt::Display for SubgraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubgraphType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "db_search" => Ok(SubgraphType::DbSearch),
            "web_search" => Ok(SubgraphType::WebSearch),
            "db_update" => Ok(SubgraphType::DbUpdate),
            "conversation" => Ok(SubgraphType::Conversation),
            other => Err(Error::Validation(format!(
                "unsupported subgraph type '{}'",
                other
            ))),
        }
    }
}

/// Parameters of a database search task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSearchParams {
    /// Natural-language description of the lookup
    #[serde(default)]
    pub query: Option<String>,
    /// Column name to accepted values
    #[serde(default)]
    pub filters: Map<String, Value>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Parameters of a web search task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Restricts citations to these domains when non-empty
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Parameters of a database update task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbUpdateParams {
    /// What should change, in natural language
    #[serde(default)]
    pub instruction: Option<String>,
    /// Known column values to write
    #[serde(default)]
    pub changes: Map<String, Value>,
}

/// Task-specific parameters, one variant per subgraph type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskParameters {
    DbSearch(DbSearchParams),
    WebSearch(WebSearchParams),
    DbUpdate(DbUpdateParams),
    Conversation,
}

impl TaskParameters {
    /// Decodes a loosely typed parameter object for the given subgraph type.
    ///
    /// A `null` or missing object decodes to the variant's defaults.
    pub fn decode(subgraph_type: SubgraphType, raw: Value) -> Result<Self> {
        let raw = match raw {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => raw,
            other => {
                return Err(Error::Validation(format!(
                    "parameters for {} must be an object, got {}",
                    subgraph_type, other
                )))
            }
        };

        let decoded = match subgraph_type {
            SubgraphType::DbSearch => TaskParameters::DbSearch(serde_json::from_value(raw)?),
            SubgraphType::WebSearch => TaskParameters::WebSearch(serde_json::from_value(raw)?),
            SubgraphType::DbUpdate => TaskParameters::DbUpdate(serde_json::from_value(raw)?),
            SubgraphType::Conversation => TaskParameters::Conversation,
        };
        Ok(decoded)
    }

    pub fn default_for(subgraph_type: SubgraphType) -> Self {
        match subgraph_type {
            SubgraphType::DbSearch => TaskParameters::DbSearch(DbSearchParams::default()),
            SubgraphType::WebSearch => TaskParameters::WebSearch(WebSearchParams::default()),
            SubgraphType::DbUpdate => TaskParameters::DbUpdate(DbUpdateParams::default()),
            SubgraphType::Conversation => TaskParameters::Conversation,
        }
    }

    pub fn subgraph_type(&self) -> SubgraphType {
        match self {
            TaskParameters::DbSearch(_) => SubgraphType::DbSearch,
            TaskParameters::WebSearch(_) => SubgraphType::WebSearch,
            TaskParameters::DbUpdate(_) => SubgraphType::DbUpdate,
            TaskParameters::Conversation => SubgraphType::Conversation,
        }
    }

    /// JSON rendering used inside prompts
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Static specification of one task produced by the decomposer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Ids of tasks this one relies on. Informational only: the queue is FIFO.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub parameters: TaskParameters,
    /// Between 1 and 5
    pub estimated_complexity: u8,
    pub subgraph_type: SubgraphType,
    #[serde(default)]
    pub status: ExecutionStatus,
}

impl TaskNode {
    /// Creates a pending node with default parameters and complexity 1
    pub fn new(id: impl Into<String>, subgraph_type: SubgraphType, description: &str) -> Self {
        Self {
            id: id.into(),
            title: subgraph_type.to_string(),
            description: description.to_string(),
            dependencies: Vec::new(),
            parameters: TaskParameters::default_for(subgraph_type),
            estimated_complexity: 1,
            subgraph_type,
            status: ExecutionStatus::Pending,
        }
    }

    pub fn with_parameters(mut self, parameters: TaskParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Checks the node before it may enter a run
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("task id must not be empty".to_string()));
        }
        if !(1..=5).contains(&self.estimated_complexity) {
            return Err(Error::Validation(format!(
                "task {} has estimated_complexity {} outside 1..=5",
                self.id, self.estimated_complexity
            )));
        }
        if self.parameters.subgraph_type() != self.subgraph_type {
            return Err(Error::Validation(format!(
                "task {} is {} but carries {} parameters",
                self.id,
                self.subgraph_type,
                self.parameters.subgraph_type()
            )));
        }
        Ok(())
    }
}

/// Ordered set of tasks derived from one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGraph {
    pub id: String,
    /// Query the graph was decomposed from
    pub query: String,
    /// Pending queue; the head is dispatched next
    pub tasks: TaskQueue,
    pub created_at: DateTime<Utc>,
}

impl TaskGraph {
    /// Builds a graph with a fresh id, validating every node and id uniqueness
    pub fn new(query: &str, nodes: Vec<TaskNode>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for node in &nodes {
            node.validate()?;
            if !seen.insert(node.id.as_str()) {
                return Err(Error::Validation(format!("duplicate task id {}", node.id)));
            }
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            tasks: TaskQueue::from_nodes(nodes),
            created_at: Utc::now(),
        })
    }
}
