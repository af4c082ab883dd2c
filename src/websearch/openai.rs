use super::{WebSearch, WebSearchOutcome};
use crate::core::Citation;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

/// Web search through OpenAI's Responses API and its `web_search_preview` tool
#[derive(Debug)]
pub struct OpenAiWebSearch {
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiWebSearch {
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".into()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model: model.to_string(),
            client,
        })
    }
}

#[async_trait]
impl WebSearch for OpenAiWebSearch {
    async fn search(&self, query: &str) -> Result<WebSearchOutcome> {
        let request_body = json!({
            "model": self.model,
            "tools": [{ "type": "web_search_preview" }],
            "input": query
        });

        let res = self
            .client
            .post(RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Executor(format!("web search failed: {}", text)));
        }

        let body: Value = res.json().await?;
        parse_response(&body)
    }
}

/// Collects the output text and `url_citation` annotations of a Responses API body.
///
/// Citations with unparsable URLs are dropped; duplicates keep their first
/// occurrence.
pub fn parse_response(body: &Value) -> Result<WebSearchOutcome> {
    let mut text = String::new();
    let mut citations: Vec<Citation> = Vec::new();

    let items = body["output"].as_array().cloned().unwrap_or_default();
    for item in items.iter().filter(|i| i["type"] == "message") {
        let Some(parts) = item["content"].as_array() else {
            continue;
        };
        for part in parts.iter().filter(|p| p["type"] == "output_text") {
            if let Some(chunk) = part["text"].as_str() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(chunk);
            }
            let annotations = part["annotations"].as_array().cloned().unwrap_or_default();
            for annotation in annotations
                .iter()
                .filter(|a| a["type"] == "url_citation")
            {
                let Some(raw_url) = annotation["url"].as_str() else {
                    continue;
                };
                match Url::parse(raw_url) {
                    Ok(url) => {
                        let url = url.to_string();
                        if !citations.iter().any(|c| c.url == url) {
                            citations.push(Citation {
                                title: annotation["title"].as_str().map(str::to_string),
                                url,
                            });
                        }
                    }
                    Err(e) => warn!("Dropping citation with invalid url {}: {}", raw_url, e),
                }
            }
        }
    }

    if text.is_empty() {
        if let Some(output_text) = body["output_text"].as_str() {
            text = output_text.to_string();
        }
    }
    if text.trim().is_empty() {
        return Err(Error::Executor("web search returned no text".into()));
    }

    debug!("Web search returned {} citations", citations.len());
    Ok(WebSearchOutcome { text, citations })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_citations() {
        let body = json!({
            "output": [
                { "type": "web_search_call", "status": "completed" },
                {
                    "type": "message",
                    "content": [{
                        "type": "output_text",
                        "text": "Rust 1.0 shipped in May 2015.",
                        "annotations": [
                            { "type": "url_citation", "url": "https://blog.rust-lang.org/2015/05/15/Rust-1.0.html", "title": "Announcing Rust 1.0" },
                            { "type": "url_citation", "url": "https://blog.rust-lang.org/2015/05/15/Rust-1.0.html", "title": "dup" },
                            { "type": "url_citation", "url": "not a url" }
                        ]
                    }]
                }
            ]
        });

        let outcome = parse_response(&body).unwrap();
        assert_eq!(outcome.text, "Rust 1.0 shipped in May 2015.");
        assert_eq!(outcome.citations.len(), 1);
        assert_eq!(
            outcome.citations[0].title.as_deref(),
            Some("Announcing Rust 1.0")
        );
    }

    #[test]
    fn empty_output_is_an_error() {
        let body = json!({ "output": [] });
        assert!(matches!(parse_response(&body), Err(Error::Executor(_))));
    }

    #[test]
    fn falls_back_to_output_text() {
        let body = json!({ "output_text": "short answer" });
        assert_eq!(parse_response(&body).unwrap().text, "short answer");
    }
}
