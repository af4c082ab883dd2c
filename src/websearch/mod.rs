mod openai;

pub use openai::*;

use crate::core::Citation;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Narrative answer of a web search plus the sources it cites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSearchOutcome {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<WebSearchOutcome>;
}
