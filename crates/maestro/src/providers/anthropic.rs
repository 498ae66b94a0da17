use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::base::{Provider, Usage};
use super::configs::{AnthropicProviderConfig, ANTHROPIC_MAX_TOKENS};
use super::errors::{ProviderError, ProviderResult};
use super::utils::{
    is_valid_function_name, send_json, uninterpretable_request_ids, uninterpretable_request_note,
};
use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = data.get("usage");
        let input_tokens = usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let output_tokens = usage
            .and_then(|u| u.get("output_tokens"))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };
        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
        let invalid_ids = uninterpretable_request_ids(messages);
        let mut anthropic_messages = Vec::new();

        for message in messages {
            let mut blocks = Vec::new();
            let mut notes = Vec::new();

            for content in &message.content {
                match content {
                    MessageContent::Text(text) => {
                        if !text.is_empty() {
                            blocks.push(json!({"type": "text", "text": text}));
                        }
                    }
                    MessageContent::ToolRequest(request) => match &request.tool_call {
                        Ok(tool_call) => blocks.push(json!({
                            "type": "tool_use",
                            "id": request.id,
                            "name": tool_call.name,
                            "input": tool_call.arguments,
                        })),
                        Err(_) => notes.push(json!({
                            "type": "text",
                            "text": format!("(tool call {} could not be interpreted)", request.id),
                        })),
                    },
                    MessageContent::ToolResponse(response) => {
                        if invalid_ids.contains(&response.id) {
                            notes.push(json!({
                                "type": "text",
                                "text": uninterpretable_request_note(&response.id, &response.tool_result),
                            }));
                            continue;
                        }
                        let block = match &response.tool_result {
                            Ok(result) => json!({
                                "type": "tool_result",
                                "tool_use_id": response.id,
                                "content": result,
                            }),
                            Err(e) => json!({
                                "type": "tool_result",
                                "tool_use_id": response.id,
                                "content": format!("The tool call returned the following error:\n{}", e),
                                "is_error": true,
                            }),
                        };
                        blocks.push(block);
                    }
                }
            }

            // tool_result blocks must lead a user message
            blocks.extend(notes);
            if blocks.is_empty() {
                continue;
            }

            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            anthropic_messages.push(json!({
                "role": role,
                "content": blocks,
            }));
        }

        anthropic_messages
    }

    fn tools_to_anthropic_spec(tools: &[Tool]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect()
    }

    fn response_to_message(response: &Value) -> ProviderResult<Message> {
        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response has no content array".to_string())
            })?;

        let mut message = Message::assistant();
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    let text = block.get("text").and_then(|t| t.as_str()).unwrap_or_default();
                    message = message.with_text(text);
                }
                Some("tool_use") => {
                    let id = block
                        .get("id")
                        .and_then(|i| i.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let name = block
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or_default();
                    let input = block.get("input").cloned().unwrap_or_else(|| json!({}));

                    let tool_call = if !is_valid_function_name(name) {
                        Err(AgentError::ToolNotFound(format!(
                            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                            name
                        )))
                    } else if !input.is_object() {
                        Err(AgentError::InvalidParameters(format!(
                            "Tool use input for id {} is not an object",
                            id
                        )))
                    } else {
                        Ok(ToolCall::new(name, input))
                    };
                    message = message.with_tool_request(id, tool_call);
                }
                _ => {}
            }
        }

        Ok(message)
    }

    async fn post(&self, payload: Value) -> ProviderResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload);

        send_json(request, self.config.timeout).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": Self::messages_to_anthropic_spec(messages),
            "max_tokens": self.config.max_tokens.unwrap_or(ANTHROPIC_MAX_TOKENS),
        });

        if !system.is_empty() {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(Self::tools_to_anthropic_spec(tools));
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api {
                status: None,
                body: Some(error.to_string()),
            });
        }

        let message = Self::response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}
