use anyhow::{bail, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use super::completion::Completer;
use super::website::strip_code_fence;
use crate::capability::{instruction_argument, Capability, CapabilityOutput};
use crate::prompt_template::{load_prompt, CRAWLER_PROMPT};

const CRAWLER_SYSTEM: &str =
    "You find public business websites for market research. Respond with a JSON array of URLs only.";

lazy_static! {
    static ref URL: Regex = Regex::new(r#"https?://[^\s"'<>\]\)]+"#).unwrap();
}

/// Finds business website URLs for a search query
pub struct CrawlerAgent {
    completer: Completer,
}

impl CrawlerAgent {
    pub fn new(completer: Completer) -> Self {
        Self { completer }
    }
}

#[async_trait]
impl Capability for CrawlerAgent {
    async fn invoke(&self, arguments: Value) -> Result<CapabilityOutput> {
        let query = instruction_argument(&arguments)?;
        let prompt = load_prompt(CRAWLER_PROMPT, &json!({ "query": query }))?;
        let reply = self.completer.complete(CRAWLER_SYSTEM, &prompt).await?;

        let urls = extract_urls(&reply);
        if urls.is_empty() {
            bail!("No URLs found for '{}'", query);
        }
        Ok(CapabilityOutput::Urls(urls))
    }
}

/// URLs from a reply that should be a JSON array, falling back to scanning the text.
/// Duplicates are dropped; first occurrence order is kept.
pub fn extract_urls(reply: &str) -> Vec<String> {
    let cleaned = strip_code_fence(reply);
    let candidates = match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(list) => list,
        Err(_) => URL
            .find_iter(cleaned)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .collect(),
    };

    let mut urls: Vec<String> = Vec::new();
    for url in candidates {
        let url = url.trim().to_string();
        if url.starts_with("http") && !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::base::Provider;
    use crate::providers::mock::MockProvider;
    use std::sync::Arc;

    #[test]
    fn test_extract_from_json_array() {
        let reply = "```json\n[\"https://a.example\", \"https://b.example\", \"https://a.example\"]\n```";
        assert_eq!(
            extract_urls(reply),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_extract_from_prose() {
        let reply = "Try https://bakers.example/lyon, or (https://pain.example). Also https://bakers.example/lyon.";
        assert_eq!(
            extract_urls(reply),
            vec!["https://bakers.example/lyon", "https://pain.example"]
        );
    }

    #[tokio::test]
    async fn test_agent_without_urls_fails() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("I could not find anything.")
        ]));
        let agent = CrawlerAgent::new(Completer::new(vec![provider as Arc<dyn Provider>]));

        let err = agent
            .invoke(json!({"instruction": "bakeries in Lyon"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No URLs found for 'bakeries in Lyon'");
    }
}
