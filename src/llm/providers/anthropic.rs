use super::{CallOptions, LlmProvider};
use crate::errors::{Error, Result};
use crate::llm::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Provider implementation for Anthropic's messages API
#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(model: &str, temperature: f32, client: Client) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| Error::Config("ANTHROPIC_API_KEY environment variable not set".into()))?;
        Ok(AnthropicProvider {
            api_key,
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    /// System messages are lifted into the top-level `system` field; the API
    /// has no JSON mode, so `json_response` only relies on the prompt.
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, options: CallOptions) -> Result<String> {
        let (system_messages, user_messages): (Vec<_>, Vec<_>) =
            messages.into_iter().partition(|msg| msg.role == "system");
        let system_content = system_messages
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n");

        // The API rejects an empty message list
        let messages = if user_messages.is_empty() {
            vec![ChatMessage::new("user", "Proceed.")]
        } else {
            user_messages
        };

        let request_body = json!({
            "model": self.model,
            "system": system_content,
            "max_tokens": 4096,
            "temperature": options.temperature.unwrap_or(self.temperature),
            "messages": messages
        });

        let res = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.api_key.to_string())
            .header("anthropic-version", "2023-06-01")
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Llm(format!("Anthropic API error: {}", text)));
        }

        let json_resp: serde_json::Value = res.json().await?;
        if let Some(content) = json_resp["content"][0]["text"].as_str() {
            debug!("Anthropic response: {}", content);
            Ok(content.trim().to_string())
        } else {
            Err(Error::Llm("No content in Anthropic LLM response".into()))
        }
    }
}
