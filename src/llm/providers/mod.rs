use crate::errors::Result;
use crate::llm::ChatMessage;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod anthropic;
pub mod deepseek;
pub mod ollama;
pub mod openai;

/// Per-call knobs forwarded to the provider
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallOptions {
    /// Overrides the provider's configured temperature
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response when it supports it
    pub json_response: bool,
}

impl CallOptions {
    pub fn json() -> Self {
        Self {
            temperature: None,
            json_response: true,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
pub trait LlmProvider: Debug + Send + Sync {
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, options: CallOptions)
        -> Result<String>;
}
