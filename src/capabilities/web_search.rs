use super::Capability;
use crate::core::{
    AgentState, Citation, Evidence, ExecutionStatus, SubgraphType, TaskParameters, TaskResult,
};
use crate::errors::{Error, Result};
use crate::websearch::WebSearch;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Fetches outside information through a search-augmented model
pub struct WebSearchCapability {
    search: Arc<dyn WebSearch>,
}

impl WebSearchCapability {
    pub fn new(search: Arc<dyn WebSearch>) -> Self {
        Self { search }
    }
}

/// Keeps citations whose host falls under one of `domains` (all when empty),
/// then caps their number.
fn filter_citations(
    citations: Vec<Citation>,
    domains: &[String],
    max_results: Option<u32>,
) -> Vec<Citation> {
    let allowed = |citation: &Citation| {
        if domains.is_empty() {
            return true;
        }
        let Ok(url) = Url::parse(&citation.url) else {
            return false;
        };
        let host = url.host_str().unwrap_or_default();
        domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    };
    let cap = max_results.map(|m| m as usize).unwrap_or(usize::MAX);
    citations.into_iter().filter(allowed).take(cap).collect()
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn name(&self) -> &str {
        "web_search"
    }

    fn subgraph_type(&self) -> SubgraphType {
        SubgraphType::WebSearch
    }

    async fn process(&self, state: &mut AgentState) -> Result<()> {
        let task = state
            .current_task
            .as_ref()
            .ok_or_else(|| Error::InvariantViolation("web_search without a current task".into()))?;
        let (query, domains, max_results) = match &task.task_node.parameters {
            TaskParameters::WebSearch(params) => (
                params
                    .query
                    .clone()
                    .unwrap_or_else(|| task.task_node.description.clone()),
                params.domains.clone(),
                params.max_results,
            ),
            _ => (task.task_node.description.clone(), Vec::new(), None),
        };

        info!(query = %query, "Running web search");
        let outcome = self.search.search(&query).await?;
        let citations = filter_citations(outcome.citations, &domains, max_results);

        state.web_search_used = true;
        state.push_evidence(
            Evidence::new(SubgraphType::WebSearch, "web_search_result", outcome.text.clone())
                .with_citations(citations.clone()),
        );
        state.resolve_current(
            ExecutionStatus::Completed,
            TaskResult::WebSearch {
                text: outcome.text,
                citations,
            },
        );
        Ok(())
    }
}
