use crate::errors::{Error, Result};
use crate::llm::providers::{
    anthropic::AnthropicProvider, deepseek::DeepSeekProvider, ollama::OllamaProvider,
    openai::OpenAiProvider, CallOptions, LlmProvider,
};
use crate::llm::ChatMessage;
use crate::utils::manage_token_count;
use std::time::Duration;
use tracing::{debug, info};

/// Character budget applied to a conversation before it is sent
const CONTEXT_CHAR_LIMIT: usize = 35_000;

/// Generic LLM client that delegates work to a concrete provider.
#[derive(Debug)]
pub struct LlmClient {
    provider: Box<dyn LlmProvider>,
}

impl LlmClient {
    /// Creates a new LLM client with the specified provider and model.
    ///
    /// # Arguments
    /// * `provider_name` - Name of the LLM provider ("openai", "anthropic", "ollama" or "deepseek")
    /// * `model` - Model name to use with the provider
    /// * `temperature` - Default sampling temperature
    /// * `timeout` - Per-request HTTP timeout
    ///
    /// # Returns
    /// * `Result<LlmClient>` - New LLM client instance or error
    pub fn new(
        provider_name: &str,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let provider: Box<dyn LlmProvider> = match provider_name {
            "openai" => Box::new(OpenAiProvider::new(model, temperature, client)?),
            "anthropic" => Box::new(AnthropicProvider::new(model, temperature, client)?),
            "ollama" => Box::new(OllamaProvider::new(model, temperature, client)?),
            "deepseek" => Box::new(DeepSeekProvider::new(model, temperature, client)?),
            _ => {
                return Err(Error::Config(format!(
                    "Unknown provider '{}'",
                    provider_name
                )))
            }
        };

        Ok(LlmClient { provider })
    }

    /// Wraps an already constructed provider.
    pub fn with_provider(provider: Box<dyn LlmProvider>) -> Self {
        LlmClient { provider }
    }

    /// Sends the messages to the provider and returns the raw response.
    pub async fn call_llm_api(
        &self,
        messages: Vec<ChatMessage>,
        options: CallOptions,
    ) -> Result<String> {
        self.provider.call_llm_api(messages, options).await
    }

    /// Single-turn helper: one system prompt and one user prompt.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CallOptions,
    ) -> Result<String> {
        self.call_llm_api(
            vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            options,
        )
        .await
    }

    /// Calls the LLM with format validation and automatic retries if format check fails.
    ///
    /// # Arguments
    /// * `messages` - Conversation so far; retry reminders are appended to it
    /// * `validate_response` - Function to validate response format
    /// * `format_reminder` - Format instructions to include in retry attempts
    /// * `max_retries` - Maximum number of attempts
    /// * `options` - Provider call options
    ///
    /// # Returns
    /// * `Result<String>` - Validated LLM response or error
    pub async fn call_llm_with_format_check<F>(
        &self,
        messages: &mut Vec<ChatMessage>,
        validate_response: F,
        format_reminder: &str,
        max_retries: usize,
        options: CallOptions,
    ) -> Result<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut attempts = 0;

        manage_token_count(messages, CONTEXT_CHAR_LIMIT);

        loop {
            attempts += 1;
            let response = self.call_llm_api(messages.clone(), options).await?;
            debug!("LLM response: {}", response);

            if validate_response(&response) {
                return Ok(response);
            } else if attempts >= max_retries {
                info!(
                    "LLM did not follow the format after {} attempts response: {}",
                    max_retries, response
                );
                return Err(Error::Llm(format!(
                    "LLM did not follow the format after {} attempts",
                    max_retries
                )));
            } else {
                let retry_message = format!(
                    "Your last answer did not follow the required format.\n\
                     {} \n\
                     Please provide a new answer following exactly these formatting rules.",
                    format_reminder
                );
                messages.push(ChatMessage::new("assistant", &response));
                messages.push(ChatMessage::new("user", &retry_message));
            }
        }
    }
}

/// Test doubles shared by the modules that talk to an LLM.
#[cfg(test)]
pub mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned responses in order and records every request.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedProvider {
        responses: Arc<Mutex<VecDeque<Result<String>>>>,
        pub calls: Arc<Mutex<Vec<(Vec<ChatMessage>, CallOptions)>>>,
    }

    impl ScriptedProvider {
        pub fn new<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                responses: Arc::new(Mutex::new(
                    responses.into_iter().map(|r| Ok(r.into())).collect(),
                )),
                calls: Arc::default(),
            }
        }

        pub fn push_error(&self, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(Error::Llm(message.to_string())));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn client(&self) -> LlmClient {
            LlmClient::with_provider(Box::new(self.clone()))
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn call_llm_api(
            &self,
            messages: Vec<ChatMessage>,
            options: CallOptions,
        ) -> Result<String> {
            self.calls.lock().unwrap().push((messages, options));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Llm("no scripted response left".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = LlmClient::new("mystery", "m", 0.0, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn format_check_retries_until_valid() {
        let provider = ScriptedProvider::new(["nope", "{\"ok\": true}"]);
        let client = provider.client();
        let mut messages = vec![ChatMessage::user("give me json")];

        let response = client
            .call_llm_with_format_check(
                &mut messages,
                |r| serde_json::from_str::<serde_json::Value>(r).is_ok(),
                "Answer with a JSON object.",
                3,
                CallOptions::json(),
            )
            .await
            .unwrap();

        assert_eq!(response, "{\"ok\": true}");
        assert_eq!(provider.call_count(), 2);
        let calls = provider.calls.lock().unwrap();
        let (second_request, options) = &calls[1];
        assert!(options.json_response);
        assert!(second_request
            .last()
            .unwrap()
            .content
            .contains("Answer with a JSON object."));
    }

    #[tokio::test]
    async fn format_check_gives_up() {
        let provider = ScriptedProvider::new(["a", "b"]);
        let client = provider.client();
        let mut messages = vec![ChatMessage::user("q")];
        let err = client
            .call_llm_with_format_check(&mut messages, |_| false, "", 2, CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert_eq!(provider.call_count(), 2);
    }
}
