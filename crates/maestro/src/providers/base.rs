use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ProviderResult;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for AI providers (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short identifier used in logs and failure reports
    fn name(&self) -> &str;

    /// Generate the next assistant message for the given conversation and tool catalog
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)>;
}

/// What the orchestration loop should do with an assistant message
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderTurn {
    /// No tool calls: the conversation is over
    Final { text: String, message: Message },
    /// One or more tool calls that must all be answered before the next turn
    ToolCalls {
        requests: Vec<ToolRequest>,
        message: Message,
    },
}

impl ProviderTurn {
    pub fn from_message(message: Message) -> Self {
        let requests: Vec<ToolRequest> = message.tool_requests().into_iter().cloned().collect();
        if requests.is_empty() {
            let text = message.text();
            let text = if text.trim().is_empty() {
                "No response".to_string()
            } else {
                text
            };
            ProviderTurn::Final { text, message }
        } else {
            ProviderTurn::ToolCalls { requests, message }
        }
    }
}
