mod parser;
use crate::constants::DEFAULT_MAX_RETRIES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use parser::{default_config_path, load_app_config};

/// Top-level application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub guardrail: GuardrailConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    /// Per-request HTTP timeout, humantime format ("60s", "2m")
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

impl AppConfig {
    pub fn request_timeout(&self) -> crate::errors::Result<Duration> {
        humantime::parse_duration(&self.request_timeout).map_err(|e| {
            crate::errors::Error::Config(format!(
                "invalid request_timeout '{}': {}",
                self.request_timeout, e
            ))
        })
    }
}

/// LLM provider selection
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct LlmConfig {
    /// "openai", "anthropic", "ollama" or "deepseek"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct EngineConfig {
    /// Retries granted to each task after its first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct DataConfig {
    /// JSON file holding the table the DB capabilities work on
    #[serde(default = "default_table_path")]
    pub table_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            table_path: default_table_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file for chat history and checkpoints; `DATABASE_PATH` wins when set
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_web_search_model")]
    pub model: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            model: default_web_search_model(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_table_path() -> String {
    "data/table.json".to_string()
}

fn default_database_path() -> String {
    "taskgraph.db".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_web_search_model() -> String {
    "gpt-4o".to_string()
}

fn default_request_timeout() -> String {
    "60s".to_string()
}
