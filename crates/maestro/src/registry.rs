use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

use crate::capability::Capability;
use crate::errors::{AgentError, AgentResult, RegistryError};
use crate::models::tool::Tool;

/// The closed set of tool and agent kinds the orchestrator knows how to classify.
///
/// Registration stays open: any name can be registered, but only these kinds
/// produce artifacts or get a role framing inside a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum ToolKind {
    #[strum(to_string = "website")]
    Website,
    #[strum(to_string = "seo")]
    Seo,
    #[strum(to_string = "copywriting", serialize = "copyWriting")]
    Copywriting,
    #[strum(to_string = "image")]
    Image,
    #[strum(to_string = "crawler")]
    Crawler,
    #[strum(to_string = "motherAI")]
    MotherAi,
    #[strum(to_string = "video")]
    Video,
    #[strum(to_string = "listTools")]
    ListTools,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    pub fn artifact_category(self) -> Option<ArtifactCategory> {
        match self {
            ToolKind::Website => Some(ArtifactCategory::Website),
            ToolKind::Seo => Some(ArtifactCategory::Seo),
            ToolKind::Copywriting => Some(ArtifactCategory::Copywriting),
            ToolKind::Image => Some(ArtifactCategory::Image),
            ToolKind::Crawler => Some(ArtifactCategory::Crawler),
            ToolKind::MotherAi => Some(ArtifactCategory::GeneralAnswer),
            ToolKind::Video | ToolKind::ListTools => None,
        }
    }

    /// Framing sentence that opens an agent's instruction inside a chain
    pub fn role_framing(self) -> &'static str {
        match self {
            ToolKind::Website => "You are creating website specifications and design.",
            ToolKind::Seo => "You are optimizing for search engines.",
            ToolKind::Copywriting => "You are writing compelling content.",
            ToolKind::Video => "You are creating video production plans.",
            ToolKind::MotherAi => "You are providing general assistance.",
            ToolKind::Image => "You are creating image concepts.",
            ToolKind::Crawler => "You are researching relevant business websites.",
            ToolKind::ListTools => "",
        }
    }
}

/// Buckets under which the latest successful tool output is kept for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactCategory {
    Website,
    Seo,
    Copywriting,
    Image,
    Crawler,
    GeneralAnswer,
}

/// A tool definition together with the capability that executes it
#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: Tool,
    pub handler: Arc<dyn Capability>,
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Name-keyed catalog of tools, populated once at startup and read-only afterwards.
///
/// Definitions are listed in registration order so provider requests are stable.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<N, D>(
        &mut self,
        name: N,
        description: D,
        input_schema: Value,
        handler: Arc<dyn Capability>,
    ) -> Result<(), RegistryError>
    where
        N: Into<String>,
        D: Into<String>,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }

        self.index.insert(name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition: Tool::new(name, description, input_schema),
            handler,
        });
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> AgentResult<&RegisteredTool> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool definitions for injection into provider requests
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .map(|t| t.definition.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Schema shared by every tool that takes a single free-form instruction
pub fn instruction_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "instruction": {
                "type": "string",
                "description": description
            }
        },
        "required": ["instruction"]
    })
}
