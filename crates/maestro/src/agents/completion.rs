use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::warn;

use crate::models::message::Message;
use crate::providers::base::Provider;

/// Plain text completions with the same provider priority as orchestration runs.
///
/// Each provider gets one attempt; the first successful answer wins.
#[derive(Clone)]
pub struct Completer {
    providers: Vec<Arc<dyn Provider>>,
}

impl Completer {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let messages = [Message::user().with_text(prompt)];
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.complete(system, &messages, &[]).await {
                Ok((message, _usage)) => return Ok(message.text()),
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "completion failed");
                    failures.push(format!("{}: {}", provider.name(), err));
                }
            }
        }

        if failures.is_empty() {
            Err(anyhow!("No providers configured"))
        } else {
            Err(anyhow!("All providers failed: {}", failures.join("; ")))
        }
    }
}
