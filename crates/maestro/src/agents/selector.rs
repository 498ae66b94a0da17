use anyhow::Result;
use serde_json::json;
use tracing::debug;

use super::completion::Completer;
use crate::prompt_template::{load_prompt, SELECTOR_PROMPT};

/// Agents a caller can pick for a chain, in the spelling the chain expects
pub const KNOWN_AGENTS: [&str; 5] = ["website", "seo", "copyWriting", "video", "motherAI"];

/// Chosen when nothing else fits
pub const FALLBACK_AGENT: &str = "motherAI";

const SELECTOR_SYSTEM: &str = "You are an expert AI agent selector. Always respond with a comma-separated list of suitable agent names only.";

/// Asks a model which known agents suit an instruction
pub struct AgentSelector {
    completer: Completer,
}

impl AgentSelector {
    pub fn new(completer: Completer) -> Self {
        Self { completer }
    }

    pub async fn select(&self, instruction: &str) -> Result<Vec<String>> {
        let prompt = load_prompt(
            SELECTOR_PROMPT,
            &json!({ "instruction": instruction, "agents": KNOWN_AGENTS }),
        )?;
        let reply = self.completer.complete(SELECTOR_SYSTEM, &prompt).await?;
        debug!(reply = %reply, "agent selector replied");
        Ok(parse_selection(&reply))
    }
}

/// Known agent names from a comma-separated reply, de-duplicated in reply order
pub fn parse_selection(reply: &str) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for name in reply.split(',').map(str::trim) {
        if KNOWN_AGENTS.contains(&name) && !selected.iter().any(|s| s == name) {
            selected.push(name.to_string());
        }
    }

    if selected.is_empty() {
        selected.push(FALLBACK_AGENT.to_string());
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::base::Provider;
    use crate::providers::mock::MockProvider;
    use std::sync::Arc;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("website, seo"), vec!["website", "seo"]);
        assert_eq!(
            parse_selection(" video ,copyWriting, video, podcast"),
            vec!["video", "copyWriting"]
        );
        assert_eq!(parse_selection("I think you need a lawyer"), vec!["motherAI"]);
        assert_eq!(parse_selection(""), vec!["motherAI"]);
    }

    #[tokio::test]
    async fn test_select_asks_provider() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("website, seo")
        ]));
        let selector = AgentSelector::new(Completer::new(vec![provider.clone() as Arc<dyn Provider>]));

        let agents = selector
            .select("Generate an SEO friendly website")
            .await
            .unwrap();

        assert_eq!(agents, vec!["website", "seo"]);
        let prompt = provider.seen_messages()[0][0].text();
        assert!(prompt.contains("Instruction: \"Generate an SEO friendly website\""));
    }
}
