use super::task::{SubgraphType, TaskGraph, TaskNode};
use super::task_state::ExecutionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A source reference attached to web search output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
}

/// Result carried by a resolved task, one variant per capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskResult {
    DbSearch {
        program: String,
        output: Value,
    },
    WebSearch {
        text: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },
    DbUpdate {
        program: String,
        updated_records: u64,
    },
    Conversation {
        answer: String,
    },
}

/// A fact captured by a capability for answer synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: SubgraphType,
    /// Short label, e.g. "db_search for <query>"
    pub label: String,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl Evidence {
    pub fn new(source: SubgraphType, label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source,
            label: label.into(),
            content: content.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

/// Run-time wrapper around one task node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecutionState {
    pub task_node: TaskNode,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskExecutionState {
    /// Activates a node that has already consumed `retry_count` retries
    pub fn running(task_node: TaskNode, retry_count: u32) -> Self {
        Self {
            task_node,
            status: ExecutionStatus::Running,
            retry_count,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.task_node.id
    }

    pub fn subgraph_type(&self) -> SubgraphType {
        self.task_node.subgraph_type
    }
}

/// Archived tasks keyed by id, iterated in archive order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedTasks {
    entries: Vec<TaskExecutionState>,
}

impl CompletedTasks {
    /// Archives a task; an entry with the same id is replaced in place
    pub fn insert(&mut self, task: TaskExecutionState) {
        match self.entries.iter_mut().find(|t| t.id() == task.id()) {
            Some(existing) => *existing = task,
            None => self.entries.push(task),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TaskExecutionState> {
        self.entries.iter().find(|t| t.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|t| t.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskExecutionState> {
        self.entries.iter()
    }
}

/// Run-scoped context shared by the router, the retry policy and the capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub task_graph_id: String,
    pub task_graph: TaskGraph,
    #[serde(default)]
    pub current_task: Option<TaskExecutionState>,
    #[serde(default)]
    pub completed_tasks: CompletedTasks,
    #[serde(default)]
    collected_evidence: Vec<Evidence>,
    pub max_retries: u32,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub db_search_used: bool,
    #[serde(default)]
    pub web_search_used: bool,
    #[serde(default)]
    pub db_update_used: bool,
    #[serde(default)]
    pub final_answer: String,
}

impl AgentState {
    pub fn new(task_graph_id: impl Into<String>, task_graph: TaskGraph, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            task_graph_id: task_graph_id.into(),
            task_graph,
            current_task: None,
            completed_tasks: CompletedTasks::default(),
            collected_evidence: Vec::new(),
            max_retries,
            start_time: now,
            last_updated: now,
            db_search_used: false,
            web_search_used: false,
            db_update_used: false,
            final_answer: String::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.task_graph.query
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.collected_evidence
    }

    /// Appends evidence; existing entries are never touched
    pub fn push_evidence(&mut self, evidence: Evidence) {
        self.collected_evidence.push(evidence);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Moves the current task, if any, into `completed_tasks`
    pub fn archive_current(&mut self) -> Option<&TaskExecutionState> {
        let task = self.current_task.take()?;
        let id = task.id().to_string();
        self.completed_tasks.insert(task);
        self.touch();
        self.completed_tasks.get(&id)
    }

    /// Success path of a capability: records the result and archives the task
    pub fn resolve_current(&mut self, status: ExecutionStatus, result: TaskResult) {
        if let Some(task) = self.current_task.as_mut() {
            task.status = status;
            task.result = Some(result);
            task.error = None;
        }
        self.archive_current();
    }

    /// Retry path of a capability: the task stays current with status FAILED
    pub fn fail_current(&mut self, error: impl Into<String>) {
        if let Some(task) = self.current_task.as_mut() {
            task.status = ExecutionStatus::Failed;
            task.error = Some(error.into());
        }
        self.touch();
    }

    /// Evidence rendered as `label: content` lines for prompts
    pub fn render_evidence(&self) -> String {
        let mut rendered = String::new();
        for entry in &self.collected_evidence {
            rendered.push_str(&entry.label);
            rendered.push_str(": ");
            rendered.push_str(&entry.content);
            rendered.push('\n');
            for citation in &entry.citations {
                rendered.push_str("  source: ");
                if let Some(title) = &citation.title {
                    rendered.push_str(title);
                    rendered.push(' ');
                }
                rendered.push_str(&citation.url);
                rendered.push('\n');
            }
        }
        rendered
    }

    /// Whether any collected evidence carries citations
    pub fn has_citations(&self) -> bool {
        self.collected_evidence
            .iter()
            .any(|entry| !entry.citations.is_empty())
    }

    /// Every task id known to the run, counting the queue, the active slot and the archive
    pub fn known_task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .task_graph
            .tasks
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Some(current) = &self.current_task {
            ids.push(current.id().to_string());
        }
        ids.extend(self.completed_tasks.ids().into_iter().map(str::to_string));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(ids: &[&str]) -> AgentState {
        let nodes = ids
            .iter()
            .map(|id| TaskNode::new(*id, SubgraphType::DbSearch, id))
            .collect();
        AgentState::new("graph", TaskGraph::new("query", nodes).unwrap(), 2)
    }

    #[test]
    fn new_state_is_empty() {
        let state = state_with(&["a"]);
        assert!(state.current_task.is_none());
        assert!(state.completed_tasks.is_empty());
        assert!(state.evidence().is_empty());
        assert_eq!(state.final_answer, "");
        assert_eq!(state.max_retries, 2);
    }

    #[test]
    fn resolve_current_archives_with_result() {
        let mut state = state_with(&[]);
        state.current_task = Some(TaskExecutionState::running(
            TaskNode::new("a", SubgraphType::Conversation, "answer"),
            0,
        ));

        state.resolve_current(
            ExecutionStatus::Success,
            TaskResult::Conversation {
                answer: "hi".to_string(),
            },
        );

        assert!(state.current_task.is_none());
        let archived = state.completed_tasks.get("a").unwrap();
        assert_eq!(archived.status, ExecutionStatus::Success);
        assert!(archived.result.is_some());
    }

    #[test]
    fn fail_current_keeps_the_task_active() {
        let mut state = state_with(&[]);
        state.current_task = Some(TaskExecutionState::running(
            TaskNode::new("a", SubgraphType::WebSearch, "search"),
            1,
        ));

        state.fail_current("timeout");

        let current = state.current_task.as_ref().unwrap();
        assert_eq!(current.status, ExecutionStatus::Failed);
        assert_eq!(current.error.as_deref(), Some("timeout"));
        assert_eq!(current.retry_count, 1);
    }

    #[test]
    fn completed_tasks_replace_in_place() {
        let mut completed = CompletedTasks::default();
        let a = TaskExecutionState::running(TaskNode::new("a", SubgraphType::DbSearch, "a"), 0);
        let b = TaskExecutionState::running(TaskNode::new("b", SubgraphType::DbSearch, "b"), 0);
        completed.insert(a.clone());
        completed.insert(b);

        let mut a_failed = a;
        a_failed.status = ExecutionStatus::Failed;
        completed.insert(a_failed);

        assert_eq!(completed.ids(), vec!["a", "b"]);
        assert_eq!(completed.get("a").unwrap().status, ExecutionStatus::Failed);
    }

    #[test]
    fn renders_evidence_with_citations() {
        let mut state = state_with(&[]);
        state.push_evidence(Evidence::new(SubgraphType::DbSearch, "db_search for q", "3 rows"));
        state.push_evidence(
            Evidence::new(SubgraphType::WebSearch, "web_search_result", "news").with_citations(
                vec![Citation {
                    title: Some("Site".to_string()),
                    url: "https://example.com".to_string(),
                }],
            ),
        );

        let rendered = state.render_evidence();
        assert!(rendered.starts_with("db_search for q: 3 rows\n"));
        assert!(rendered.contains("source: Site https://example.com"));
        assert!(state.has_citations());
    }

    #[test]
    fn state_survives_a_json_round_trip() {
        let mut state = state_with(&["a", "b"]);
        state.push_evidence(Evidence::new(SubgraphType::DbSearch, "l", "c"));
        let json = serde_json::to_string(&state).unwrap();
        let back: AgentState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.evidence().len(), 1);
        assert_eq!(back.task_graph.tasks.ids(), vec!["a", "b"]);
    }
}
