use crate::constants::{
    CONVERSATION_TASK_TITLE, DECOMPOSER_FORMAT_REMINDER, DECOMPOSER_SYSTEM_PROMPT,
    DECOMPOSITION_SCHEMA, FORMAT_CHECK_ATTEMPTS,
};
use crate::core::{SubgraphType, TaskGraph, TaskNode, TaskParameters};
use crate::errors::{Error, Result};
use crate::llm::{build_validator, CallOptions, ChatMessage, LlmClient};
use crate::utils::extract_json_object;
use async_trait::async_trait;
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Turns a natural-language query into a task graph
#[async_trait]
pub trait Decomposer: Send + Sync {
    async fn decompose(&self, query: &str) -> Result<TaskGraph>;
}

/// One task as written by the LLM
#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    task_id: Option<String>,
    task_type: String,
    description: String,
    #[serde(default)]
    parameters: Value,
    #[serde(default, alias = "dependencies")]
    depends_on: Vec<String>,
    #[serde(default)]
    estimated_complexity: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawDecomposition {
    #[serde(default)]
    query_intent: Option<String>,
    tasks: Vec<RawTask>,
}

/// LLM-backed decomposer answering in JSON mode
pub struct LlmDecomposer {
    llm: Arc<LlmClient>,
    validator: Validator,
}

impl LlmDecomposer {
    pub fn new(llm: Arc<LlmClient>) -> Result<Self> {
        Ok(Self {
            llm,
            validator: build_validator(DECOMPOSITION_SCHEMA)?,
        })
    }
}

#[async_trait]
impl Decomposer for LlmDecomposer {
    async fn decompose(&self, query: &str) -> Result<TaskGraph> {
        let mut messages = vec![
            ChatMessage::system(DECOMPOSER_SYSTEM_PROMPT),
            ChatMessage::user(&format!("Query: {}\n", query)),
        ];
        let response = self
            .llm
            .call_llm_with_format_check(
                &mut messages,
                |r| extract_json_object(r).is_some_and(|v| self.validator.is_valid(&v)),
                DECOMPOSER_FORMAT_REMINDER,
                FORMAT_CHECK_ATTEMPTS,
                CallOptions::json(),
            )
            .await
            .map_err(|e| match e {
                Error::Llm(msg) => Error::Decomposition(msg),
                other => other,
            })?;

        let value = extract_json_object(&response)
            .ok_or_else(|| Error::Decomposition("decomposer answer is not a JSON object".into()))?;
        let graph = build_task_graph(query, value)?;
        info!(
            task_graph_id = %graph.id,
            task_count = graph.tasks.len(),
            "Decomposed query into task graph"
        );
        Ok(graph)
    }
}

/// Builds the graph from a decoded decomposer answer.
///
/// Every task gets a fresh uuid; `depends_on` entries are translated to the
/// new ids and unknown references are dropped. A terminal conversation task
/// depending on all others is always appended, so conversation tasks written
/// by the LLM are skipped.
pub fn build_task_graph(query: &str, value: Value) -> Result<TaskGraph> {
    let raw: RawDecomposition = serde_json::from_value(value)
        .map_err(|e| Error::Decomposition(format!("unexpected decomposer answer: {}", e)))?;
    if let Some(intent) = &raw.query_intent {
        info!(intent = %intent, "Query intent");
    }

    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut typed: Vec<(SubgraphType, RawTask, String)> = Vec::new();
    for task in raw.tasks {
        let subgraph: SubgraphType = task.task_type.parse()?;
        if subgraph == SubgraphType::Conversation {
            warn!("Ignoring conversation task written by the decomposer");
            continue;
        }
        let id = Uuid::new_v4().to_string();
        if let Some(original) = &task.task_id {
            id_map.insert(original.clone(), id.clone());
        }
        typed.push((subgraph, task, id));
    }

    let mut nodes = Vec::with_capacity(typed.len() + 1);
    for (subgraph, task, id) in typed {
        let parameters = TaskParameters::decode(subgraph, task.parameters)?;
        let dependencies = task
            .depends_on
            .iter()
            .filter_map(|dep| id_map.get(dep).cloned())
            .collect();
        let mut node = TaskNode::new(id, subgraph, &task.description)
            .with_parameters(parameters)
            .with_dependencies(dependencies);
        node.estimated_complexity = task.estimated_complexity.unwrap_or(1).clamp(1, 5) as u8;
        nodes.push(node);
    }

    let all_ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut conversation = TaskNode::new(
        Uuid::new_v4().to_string(),
        SubgraphType::Conversation,
        "Respond to the user's query",
    )
    .with_dependencies(all_ids);
    conversation.title = CONVERSATION_TASK_TITLE.to_string();
    nodes.push(conversation);

    TaskGraph::new(query, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use serde_json::json;

    #[test]
    fn appends_conversation_depending_on_everything() {
        let graph = build_task_graph(
            "find games then research them",
            json!({
                "query_intent": "db_web_update",
                "tasks": [
                    {"task_id": "t1", "task_type": "db_search", "description": "find", "parameters": {"limit": 3}},
                    {"task_id": "t2", "task_type": "WEB_SEARCH", "description": "research", "parameters": {"query": "q"}, "depends_on": ["t1", "ghost"], "estimated_complexity": 9}
                ]
            }),
        )
        .unwrap();

        let nodes: Vec<_> = graph.tasks.iter().map(|q| q.node.clone()).collect();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].subgraph_type, SubgraphType::DbSearch);
        assert_eq!(nodes[1].dependencies, vec![nodes[0].id.clone()]);
        assert_eq!(nodes[1].estimated_complexity, 5);
        assert_eq!(nodes[2].subgraph_type, SubgraphType::Conversation);
        assert_eq!(nodes[2].title, "conversation");
        assert_eq!(
            nodes[2].dependencies,
            vec![nodes[0].id.clone(), nodes[1].id.clone()]
        );
        assert!(Uuid::parse_str(&nodes[0].id).is_ok());
        match &nodes[0].parameters {
            TaskParameters::DbSearch(params) => assert_eq!(params.limit, Some(3)),
            other => panic!("unexpected parameters {:?}", other),
        }
    }

    #[test]
    fn unknown_task_type_is_rejected() {
        let result = build_task_graph(
            "q",
            json!({"tasks": [{"task_type": "send_email", "description": "x"}]}),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn empty_task_list_still_answers() {
        let graph = build_task_graph("hello", json!({"tasks": []})).unwrap();
        assert_eq!(graph.tasks.len(), 1);
        assert_eq!(
            graph.tasks.peek().unwrap().node.subgraph_type,
            SubgraphType::Conversation
        );
    }

    #[tokio::test]
    async fn decomposes_through_the_llm() {
        let provider = ScriptedProvider::new([
            "```json\n{\"tasks\": [{\"task_type\": \"web_search\", \"description\": \"latest news\"}]}\n```",
        ]);
        let decomposer = LlmDecomposer::new(Arc::new(provider.client())).unwrap();

        let graph = decomposer.decompose("gaming news").await.unwrap();

        assert_eq!(graph.query, "gaming news");
        assert_eq!(graph.tasks.len(), 2);
        assert!(provider.calls.lock().unwrap()[0].1.json_response);
    }

    #[tokio::test]
    async fn unusable_answers_become_decomposition_errors() {
        let provider = ScriptedProvider::new(["no", "still no", "never"]);
        let decomposer = LlmDecomposer::new(Arc::new(provider.client())).unwrap();

        let err = decomposer.decompose("q").await.unwrap_err();
        assert!(matches!(err, Error::Decomposition(_)));
    }
}
