use super::{CallOptions, LlmProvider};
use crate::errors::{Error, Result};
use crate::llm::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Provider implementation for DeepSeek's OpenAI-compatible API
#[derive(Debug)]
pub struct DeepSeekProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl DeepSeekProvider {
    pub fn new(model: &str, temperature: f32, client: Client) -> Result<Self> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .map_err(|_| Error::Config("DEEPSEEK_API_KEY environment variable not set".into()))?;
        Ok(DeepSeekProvider {
            api_key,
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, options: CallOptions) -> Result<String> {
        let mut request_body = json!({
          "model": self.model,
          "messages": messages,
          "temperature": options.temperature.unwrap_or(self.temperature),
          "stream": false
        });
        if options.json_response {
            request_body["response_format"] = json!({ "type": "json_object" });
        }

        let res = self
            .client
            .post("https://api.deepseek.com/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Llm(format!("DeepSeek API error: {}", text)));
        }

        let json_resp: serde_json::Value = res.json().await?;
        if let Some(content) = json_resp["choices"][0]["message"]["content"].as_str() {
            Ok(content.trim().to_string())
        } else {
            Err(Error::Llm("No content in DeepSeek LLM response".into()))
        }
    }
}
