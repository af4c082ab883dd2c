//! Wiring of the long-lived collaborators shared by the CLI and the HTTP API.

use crate::capabilities::{
    CapabilityTable, ConversationCapability, DbSearchCapability, DbUpdateCapability,
    WebSearchCapability,
};
use crate::checkpoint::SqliteCheckpointStore;
use crate::config::AppConfig;
use crate::core::Engine;
use crate::db::Database;
use crate::errors::Result;
use crate::llm::LlmClient;
use crate::services::{
    ChatService, DisabledGuardrail, Guardrail, LlmDecomposer, LlmGuardrail, SqliteChatHistory,
};
use crate::tabular::{FileTableStore, TabularStore};
use crate::websearch::OpenAiWebSearch;
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    pub chat: ChatService,
}

impl AppContext {
    pub fn new(chat: ChatService) -> Arc<Self> {
        Arc::new(Self { chat })
    }

    /// Builds every collaborator from the configuration
    pub async fn from_config(config: &AppConfig) -> Result<Arc<Self>> {
        let timeout = config.request_timeout()?;
        let llm = Arc::new(LlmClient::new(
            &config.llm.provider,
            &config.llm.model,
            config.llm.temperature,
            timeout,
        )?);
        info!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            "LLM client ready"
        );

        let store: Arc<dyn TabularStore> =
            Arc::new(FileTableStore::open(&config.data.table_path).await?);
        let web_search = Arc::new(OpenAiWebSearch::new(&config.web_search.model, timeout)?);

        let capabilities = CapabilityTable::new(
            Arc::new(DbSearchCapability::new(llm.clone(), store.clone())),
            Arc::new(WebSearchCapability::new(web_search)),
            Arc::new(DbUpdateCapability::new(llm.clone(), store)),
            Arc::new(ConversationCapability::new(llm.clone())),
        )?;

        let database = Database::new(&config.database.path)?;
        let guardrail: Arc<dyn Guardrail> = if config.guardrail.enabled {
            Arc::new(LlmGuardrail::new(llm.clone()))
        } else {
            info!("Guardrail disabled");
            Arc::new(DisabledGuardrail)
        };

        let chat = ChatService::new(
            Arc::new(LlmDecomposer::new(llm)?),
            guardrail,
            Engine::new(capabilities),
            Arc::new(SqliteCheckpointStore::new(database.clone())),
            Arc::new(SqliteChatHistory::new(database)),
            config.engine.max_retries,
        );
        Ok(Self::new(chat))
    }
}
