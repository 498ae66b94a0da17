use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::completion::Completer;
use crate::capability::{instruction_argument, Capability, CapabilityOutput};
use crate::prompt_template::{load_prompt, GENERAL_PROMPT};

pub const SEARCH_HOST: &str = "https://api.tavily.com";
pub const SEARCH_MAX_RESULTS: usize = 5;
pub const SEARCH_FAILED: &str = "Web search failed.";

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub host: String,
    pub api_key: String,
    pub max_results: usize,
    pub timeout: Duration,
}

impl SearchConfig {
    pub fn new<K: Into<String>>(api_key: K) -> Self {
        Self {
            host: SEARCH_HOST.to_string(),
            api_key: api_key.into(),
            max_results: SEARCH_MAX_RESULTS,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily web search client
#[derive(Clone)]
pub struct WebSearch {
    client: Client,
    config: SearchConfig,
}

impl WebSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub async fn search(&self, query: &str) -> Result<String> {
        let url = format!("{}/search", self.config.host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "api_key": self.config.api_key,
                "query": query,
                "max_results": self.config.max_results,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Search API error {}: {}", status, body));
        }

        let data: SearchResponse = response.json().await?;
        Ok(data
            .results
            .iter()
            .map(|hit| format!("- {}: {}\n  {}", hit.title, hit.url, hit.content))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// General-purpose assistant that grounds its answer in live search results
pub struct GeneralAgent {
    completer: Completer,
    search: Option<WebSearch>,
}

impl GeneralAgent {
    pub fn new(completer: Completer, search: Option<WebSearch>) -> Self {
        Self { completer, search }
    }

    /// Search results for the prompt; a failed or unconfigured search never fails the agent
    async fn search_context(&self, query: &str) -> String {
        match &self.search {
            Some(search) => match search.search(query).await {
                Ok(results) => results,
                Err(err) => {
                    warn!(error = %err, "web search failed");
                    SEARCH_FAILED.to_string()
                }
            },
            None => "Web search is not configured.".to_string(),
        }
    }
}

#[async_trait]
impl Capability for GeneralAgent {
    async fn invoke(&self, arguments: Value) -> Result<CapabilityOutput> {
        let instruction = instruction_argument(&arguments)?;
        let search_results = self.search_context(&instruction).await;
        let system = load_prompt(GENERAL_PROMPT, &json!({ "search_results": search_results }))?;
        let answer = self.completer.complete(&system, &instruction).await?;
        Ok(CapabilityOutput::Text(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::base::Provider;
    use crate::providers::mock::MockProvider;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_for(server: &MockServer) -> WebSearch {
        WebSearch::new(SearchConfig {
            host: server.uri(),
            ..SearchConfig::new("tvly-test")
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_formats_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({"api_key": "tvly-test", "max_results": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"title": "Bakery trends", "url": "https://news.example/bakery", "content": "Sourdough is up."},
                    {"title": "Flour prices", "url": "https://news.example/flour", "content": "Prices fell."}
                ]
            })))
            .mount(&server)
            .await;

        let results = search_for(&server).search("bakery news").await.unwrap();

        assert_eq!(
            results,
            "- Bakery trends: https://news.example/bakery\n  Sourdough is up.\n\n\
             - Flour prices: https://news.example/flour\n  Prices fell."
        );
    }

    #[tokio::test]
    async fn test_failed_search_degrades_to_notice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("Paris is the capital of France.")
        ]));
        let agent = GeneralAgent::new(
            Completer::new(vec![provider.clone() as Arc<dyn Provider>]),
            Some(search_for(&server)),
        );

        let output = agent
            .invoke(json!({"instruction": "What is the capital of France?"}))
            .await
            .unwrap();

        assert_eq!(output, CapabilityOutput::text("Paris is the capital of France."));
        assert_eq!(agent.search_context("anything").await, SEARCH_FAILED);
    }
}
