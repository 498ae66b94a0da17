use std::collections::HashSet;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::RequestBuilder;
use serde_json::{json, Value};

use super::errors::{ProviderError, ProviderResult};
use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Send a JSON request and decode a JSON response within `timeout`.
///
/// Non-success statuses become [`ProviderError::Api`] carrying the response body.
pub async fn send_json(request: RequestBuilder, timeout: Duration) -> ProviderResult<Value> {
    let exchange = async {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<Value>().await?)
        } else {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            Err(ProviderError::Api {
                status: Some(status.as_u16()),
                body,
            })
        }
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| ProviderError::Timeout(timeout))?
}

/// Ids of tool requests that could not be interpreted anywhere in the history.
///
/// Those requests are never replayed as tool calls; their error responses are
/// replayed as plain user text so the model can still read them.
pub fn uninterpretable_request_ids(messages: &[Message]) -> HashSet<String> {
    messages
        .iter()
        .flat_map(|m| m.tool_requests())
        .filter(|request| request.tool_call.is_err())
        .map(|request| request.id.clone())
        .collect()
}

/// Text replayed for a tool request that never became a call
pub fn uninterpretable_request_note(id: &str, result: &Result<String, AgentError>) -> String {
    let reason = match result {
        Ok(text) => text.clone(),
        Err(e) => e.to_string(),
    };
    format!("The tool call {} could not be interpreted:\n{}", id, reason)
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let invalid_ids = uninterpretable_request_ids(messages);
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut text = Vec::new();
        let mut tool_calls = Vec::new();
        let mut output = Vec::new();
        let mut notes = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(t) => {
                    if !t.is_empty() {
                        text.push(t.as_str());
                    }
                }
                MessageContent::ToolRequest(request) => {
                    if let Ok(tool_call) = &request.tool_call {
                        tool_calls.push(json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": sanitize_function_name(&tool_call.name),
                                "arguments": tool_call.arguments.to_string(),
                            }
                        }));
                    }
                }
                MessageContent::ToolResponse(response) => {
                    if invalid_ids.contains(&response.id) {
                        notes.push(json!({
                            "role": "user",
                            "content": uninterpretable_request_note(&response.id, &response.tool_result),
                        }));
                        continue;
                    }
                    match &response.tool_result {
                        Ok(result) => output.push(json!({
                            "role": "tool",
                            "content": result,
                            "tool_call_id": response.id
                        })),
                        // A tool result error is shown as output so the model can interpret the error message
                        Err(e) => output.push(json!({
                            "role": "tool",
                            "content": format!("The tool call returned the following error:\n{}", e),
                            "tool_call_id": response.id
                        })),
                    }
                }
            }
        }

        if !text.is_empty() {
            converted["content"] = json!(text.join("\n"));
        }
        if !tool_calls.is_empty() {
            converted["tool_calls"] = json!(tool_calls);
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            messages_spec.push(converted);
        }
        messages_spec.extend(output);
        messages_spec.extend(notes);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(ProviderError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> ProviderResult<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .cloned()
        .ok_or_else(|| {
            ProviderError::MalformedResponse("response has no choices[0].message".to_string())
        })?;
    let mut content = Vec::new();

    if let Some(text) = original.get("content").and_then(|t| t.as_str()) {
        content.push(MessageContent::text(text));
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            content.push(MessageContent::tool_request(
                id.clone(),
                parse_tool_call(&id, &function_name, &arguments),
            ));
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn parse_tool_call(id: &str, name: &str, arguments: &str) -> Result<ToolCall, AgentError> {
    if !is_valid_function_name(name) {
        return Err(AgentError::ToolNotFound(format!(
            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
            name
        )));
    }

    // Models sometimes send an empty string for tools without parameters
    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };

    serde_json::from_str::<Value>(arguments)
        .map(|params| ToolCall::new(name, params))
        .map_err(|e| {
            AgentError::InvalidParameters(format!(
                "Could not interpret tool use parameters for id {}: {}",
                id, e
            ))
        })
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

pub fn check_openai_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ProviderError::ContextLengthExceeded(message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "role": "assistant",
            "message": {
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "example_fn",
                        "arguments": "{\"param\": \"value\"}"
                    }
                }]
            }
        }],
        "usage": {
            "input_tokens": 10,
            "output_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    #[test]
    fn test_messages_to_openai_spec() {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_openai_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
    }

    #[test]
    fn test_messages_to_openai_spec_complex() {
        let messages = vec![
            Message::user().with_text("Build a bakery site"),
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new("website", json!({"instruction": "bakery"}))),
            ),
            Message::user()
                .with_tool_response("call_1", Err(AgentError::ToolNotFound("website".into()))),
            Message::assistant().with_text("Sorry, no website tool."),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[1]["role"], "assistant");
        assert_eq!(spec[1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            spec[1]["tool_calls"][0]["function"]["arguments"],
            r#"{"instruction":"bakery"}"#
        );
        assert_eq!(spec[2]["role"], "tool");
        assert_eq!(spec[2]["tool_call_id"], "call_1");
        assert!(spec[2]["content"]
            .as_str()
            .unwrap()
            .starts_with("The tool call returned the following error:"));
        assert_eq!(spec[3]["content"], "Sorry, no website tool.");
    }

    #[test]
    fn test_uninterpretable_requests_replayed_as_text() {
        let messages = vec![
            Message::assistant()
                .with_tool_request(
                    "bad",
                    Err(AgentError::InvalidParameters("not json".to_string())),
                )
                .with_tool_request("good", Ok(ToolCall::new("seo", json!({})))),
            Message::user()
                .with_tool_response(
                    "bad",
                    Err(AgentError::InvalidParameters("not json".to_string())),
                )
                .with_tool_response("good", Ok("keywords".to_string())),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 3);
        assert_eq!(spec[0]["tool_calls"].as_array().unwrap().len(), 1);
        assert_eq!(spec[1]["role"], "tool");
        assert_eq!(spec[1]["tool_call_id"], "good");
        assert_eq!(spec[2]["role"], "user");
        assert!(spec[2]["content"].as_str().unwrap().contains("bad"));
    }

    #[test]
    fn test_tools_to_openai_spec() {
        let tool = Tool::new(
            "test_tool",
            "A test tool",
            json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Test parameter"
                    }
                },
                "required": ["input"]
            }),
        );

        let spec = tools_to_openai_spec(&[tool]).unwrap();

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "test_tool");
        assert_eq!(spec[0]["function"]["parameters"]["required"], json!(["input"]));
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let tool = Tool::new("test_tool", "Test tool", json!({}));
        let result = tools_to_openai_spec(&[tool.clone(), tool]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("hello-world"));
        assert!(is_valid_function_name("motherAI"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name(""));
    }

    #[test]
    fn test_openai_response_to_message_text() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Here is your bakery site."
                }
            }]
        });

        let message = openai_response_to_message(response).unwrap();
        assert_eq!(message.content, vec![MessageContent::text("Here is your bakery site.")]);
        assert_eq!(message.role, Role::Assistant);
    }

    #[test]
    fn test_openai_response_to_message_valid_toolrequest() {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE).unwrap();
        let message = openai_response_to_message(response).unwrap();

        let requests = message.tool_requests();
        assert_eq!(requests.len(), 1);
        let tool_call = requests[0].tool_call.as_ref().unwrap();
        assert_eq!(tool_call.name, "example_fn");
        assert_eq!(tool_call.arguments, json!({"param": "value"}));
    }

    #[test]
    fn test_openai_response_to_message_invalid_func_name() {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE).unwrap();
        response["choices"][0]["message"]["tool_calls"][0]["function"]["name"] =
            json!("invalid fn");

        let message = openai_response_to_message(response).unwrap();

        match &message.tool_requests()[0].tool_call {
            Err(AgentError::ToolNotFound(msg)) => {
                assert!(msg.starts_with("The provided function name"));
            }
            other => panic!("Expected ToolNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_openai_response_to_message_json_decode_error() {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE).unwrap();
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] =
            json!("invalid json {");

        let message = openai_response_to_message(response).unwrap();

        match &message.tool_requests()[0].tool_call {
            Err(AgentError::InvalidParameters(msg)) => {
                assert!(msg.starts_with("Could not interpret tool use parameters"));
            }
            other => panic!("Expected InvalidParameters error, got {:?}", other),
        }
    }

    #[test]
    fn test_openai_response_without_choices_is_malformed() {
        let err = openai_response_to_message(json!({"object": "error"})).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });

        let result = check_openai_context_length_error(&error);
        assert_eq!(
            result.unwrap().to_string(),
            "Context length exceeded: This message is too long"
        );

        let error = json!({
            "code": "other_error",
            "message": "Some other error"
        });
        assert!(check_openai_context_length_error(&error).is_none());
    }
}
