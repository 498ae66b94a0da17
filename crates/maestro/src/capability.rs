//! Uniform contract over the heterogeneous capabilities the orchestrator drives.
//!
//! A capability is anything that turns a JSON argument object into an output: an LLM
//! backed copywriter, a web search, an image pipeline, a test stub. The orchestrator never
//! sees the concrete error types of those capabilities; [`CapabilityAdapter`] folds every
//! failure into an [`AgentError`] so the loop has a single error path.
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::registry::ToolRegistry;

/// Generated website source, as produced by website capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteCode {
    pub html: String,
    pub css: String,
}

/// The raw value returned by a capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityOutput {
    Text(String),
    Website(WebsiteCode),
    Urls(Vec<String>),
    Structured(Value),
}

impl CapabilityOutput {
    pub fn text<S: Into<String>>(text: S) -> Self {
        CapabilityOutput::Text(text.into())
    }

    pub fn website<H: Into<String>, C: Into<String>>(html: H, css: C) -> Self {
        CapabilityOutput::Website(WebsiteCode {
            html: html.into(),
            css: css.into(),
        })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CapabilityOutput::Text(text) => text.trim().is_empty(),
            CapabilityOutput::Website(code) => code.html.trim().is_empty(),
            CapabilityOutput::Urls(urls) => urls.is_empty(),
            CapabilityOutput::Structured(value) => value.is_null(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            CapabilityOutput::Text(text) => Value::String(text.clone()),
            CapabilityOutput::Website(code) => {
                serde_json::json!({ "html": code.html, "css": code.css })
            }
            CapabilityOutput::Urls(urls) => Value::from(urls.clone()),
            CapabilityOutput::Structured(value) => value.clone(),
        }
    }

    /// Content sent back to a model as a tool result: strings verbatim, everything else as JSON
    pub fn to_tool_content(&self) -> String {
        match self {
            CapabilityOutput::Text(text) => text.clone(),
            other => other.to_value().to_string(),
        }
    }

    /// Deterministic single-string rendering used to hand output from one agent to the next
    pub fn format_for_chain(&self) -> String {
        match self {
            CapabilityOutput::Text(text) => text.clone(),
            CapabilityOutput::Website(code) => format!(
                "HTML Code:\n```html\n{}\n```\n\nCSS Code:\n```css\n{}\n```",
                code.html, code.css
            ),
            other => serde_json::to_string_pretty(&other.to_value())
                .unwrap_or_else(|_| other.to_value().to_string()),
        }
    }
}

impl From<String> for CapabilityOutput {
    fn from(text: String) -> Self {
        CapabilityOutput::Text(text)
    }
}

impl From<&str> for CapabilityOutput {
    fn from(text: &str) -> Self {
        CapabilityOutput::Text(text.to_string())
    }
}

/// Core trait for anything the orchestrator can execute by name
#[async_trait]
pub trait Capability: Send + Sync {
    /// Run the capability with the arguments supplied by a model or a chain step
    async fn invoke(&self, arguments: Value) -> anyhow::Result<CapabilityOutput>;
}

/// Adapts a plain async closure into a [`Capability`]
pub struct FnCapability<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> Capability for FnCapability<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<CapabilityOutput>> + Send + 'static,
{
    async fn invoke(&self, arguments: Value) -> anyhow::Result<CapabilityOutput> {
        (self.func)(arguments).await
    }
}

pub fn capability_fn<F, Fut>(func: F) -> Arc<dyn Capability>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<CapabilityOutput>> + Send + 'static,
{
    Arc::new(FnCapability { func })
}

/// Extract the `instruction` string that every built-in capability takes
pub fn instruction_argument(arguments: &Value) -> anyhow::Result<String> {
    arguments
        .get("instruction")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing required string argument 'instruction'"))
}

/// Executes registered tools by name on behalf of the orchestration loop.
///
/// Stateless apart from the shared, read-only registry, so it may be used for
/// several tool calls at once.
#[derive(Clone)]
pub struct CapabilityAdapter {
    registry: Arc<ToolRegistry>,
}

impl CapabilityAdapter {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn execute(&self, name: &str, arguments: Value) -> AgentResult<CapabilityOutput> {
        let tool = self.registry.resolve(name)?;
        tool.handler
            .invoke(arguments)
            .await
            .map_err(|cause| AgentError::ExecutionError {
                tool: name.to_string(),
                cause: format!("{:#}", cause),
            })
    }
}
