use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::completion::Completer;
use crate::capability::{instruction_argument, Capability, CapabilityOutput};
use crate::prompt_template::{COPYWRITING_PROMPT, SEO_PROMPT};

/// A text agent defined entirely by its system prompt
pub struct PromptedAgent {
    completer: Completer,
    system_prompt: &'static str,
}

impl PromptedAgent {
    pub fn new(completer: Completer, system_prompt: &'static str) -> Self {
        Self {
            completer,
            system_prompt,
        }
    }

    pub fn seo(completer: Completer) -> Self {
        Self::new(completer, SEO_PROMPT)
    }

    pub fn copywriting(completer: Completer) -> Self {
        Self::new(completer, COPYWRITING_PROMPT)
    }
}

#[async_trait]
impl Capability for PromptedAgent {
    async fn invoke(&self, arguments: Value) -> Result<CapabilityOutput> {
        let instruction = instruction_argument(&arguments)?;
        let text = self
            .completer
            .complete(self.system_prompt.trim(), &instruction)
            .await?;
        Ok(CapabilityOutput::Text(text))
    }
}
