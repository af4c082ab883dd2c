use super::{CallOptions, LlmProvider};
use crate::errors::{Error, Result};
use crate::llm::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Provider implementation for OpenAI's chat completions API
#[derive(Debug)]
pub struct OpenAiProvider {
    /// OpenAI API key loaded from environment
    api_key: String,
    /// Model identifier to use (e.g. "gpt-4o", "gpt-4o-mini")
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiProvider {
    /// Creates a new OpenAI provider instance
    ///
    /// # Arguments
    /// * `model` - The model identifier to use
    /// * `temperature` - Default sampling temperature
    /// * `client` - Shared HTTP client
    ///
    /// # Returns
    /// * `Result<Self>` - Provider instance or error if API key not found
    pub fn new(model: &str, temperature: f32, client: Client) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".into()))?;
        Ok(OpenAiProvider {
            api_key,
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, options: CallOptions) -> Result<String> {
        let mut request_body = json!({
          "model": self.model,
          "messages": messages,
          "temperature": options.temperature.unwrap_or(self.temperature)
        });
        if options.json_response {
            request_body["response_format"] = json!({ "type": "json_object" });
        }

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Llm(format!("OpenAI API error: {}", text)));
        }

        let json_resp: serde_json::Value = res.json().await?;
        if let Some(content) = json_resp["choices"][0]["message"]["content"].as_str() {
            Ok(content.trim().to_string())
        } else {
            Err(Error::Llm("No content in OpenAI LLM response".into()))
        }
    }
}
