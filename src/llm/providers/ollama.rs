use super::{CallOptions, LlmProvider};
use crate::errors::{Error, Result};
use crate::llm::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Provider implementation for a local Ollama server
#[derive(Debug)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OllamaProvider {
    /// Creates a provider talking to `OLLAMA_URL`, or the default local port
    pub fn new(model: &str, temperature: f32, client: Client) -> Result<Self> {
        let base_url = std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.into());
        Ok(OllamaProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, options: CallOptions) -> Result<String> {
        let mut request_body = json!({
            "model": self.model,
            "stream": false,
            "messages": messages,
            "options": { "temperature": options.temperature.unwrap_or(self.temperature) }
        });
        if options.json_response {
            request_body["format"] = json!("json");
        }

        let res = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Llm(format!("Ollama API error: {}", text)));
        }

        let json_resp: serde_json::Value = res.json().await?;
        if let Some(content) = json_resp["message"]["content"].as_str() {
            Ok(content.trim().to_string())
        } else {
            Err(Error::Llm("No content in Ollama LLM response".into()))
        }
    }
}
