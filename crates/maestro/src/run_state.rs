use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::capability::CapabilityOutput;
use crate::errors::AgentError;
use crate::models::message::Message;
use crate::registry::{ArtifactCategory, ToolKind};

/// Audit entry for one tool invocation. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub tool: String,
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Most recent successful output for one artifact category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub data: Value,
    pub generated_at: DateTime<Utc>,
}

/// How a single orchestration run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunOutcome {
    /// The model produced a final answer
    Completed { summary: String },
    /// The provider call itself failed; tool failures never end up here.
    /// A reply whose tool calls name an unknown tool or carry undecodable
    /// arguments is answered with tool errors inside the same attempt.
    #[serde(rename_all = "camelCase")]
    Failed { error: String, failed_at: usize },
    /// The iteration budget ran out before a final answer
    #[serde(rename_all = "camelCase")]
    MaxIterationsExceeded { max_iterations: usize },
}

/// Everything one orchestration loop accumulates. Owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: Uuid,
    pub original_query: String,
    /// Name of the provider that drove this run
    pub provider: String,
    pub messages: Vec<Message>,
    pub tools_used: BTreeSet<String>,
    pub artifacts: BTreeMap<ArtifactCategory, Artifact>,
    pub execution_log: Vec<ExecutionRecord>,
    pub iterations: usize,
    pub outcome: Option<RunOutcome>,
}

impl RunState {
    pub fn new<Q: Into<String>, P: Into<String>>(query: Q, provider: P) -> Self {
        let query = query.into();
        Self {
            run_id: Uuid::new_v4(),
            messages: vec![Message::user().with_text(query.clone())],
            original_query: query,
            provider: provider.into(),
            tools_used: BTreeSet::new(),
            artifacts: BTreeMap::new(),
            execution_log: Vec::new(),
            iterations: 0,
            outcome: None,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match &self.outcome {
            Some(RunOutcome::Completed { summary }) => Some(summary),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            Some(RunOutcome::Failed { error, .. }) => Some(error.clone()),
            Some(RunOutcome::MaxIterationsExceeded { max_iterations }) => {
                Some(format!("Max iterations reached ({})", max_iterations))
            }
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Some(RunOutcome::Completed { .. }))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Some(RunOutcome::Failed { .. }))
    }

    pub(crate) fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = Some(outcome);
    }

    pub(crate) fn record_success(
        &mut self,
        tool: &str,
        arguments: Value,
        output: &CapabilityOutput,
        elapsed: Duration,
    ) {
        let now = Utc::now();
        self.execution_log.push(ExecutionRecord {
            tool: tool.to_string(),
            arguments,
            result: Some(output.to_value()),
            error: None,
            success: true,
            elapsed_ms: elapsed.as_millis() as u64,
            timestamp: now,
        });
        self.tools_used.insert(tool.to_string());

        let category = ToolKind::from_name(tool).and_then(ToolKind::artifact_category);
        if let Some(category) = category {
            if !output.is_empty() {
                self.artifacts.insert(
                    category,
                    Artifact {
                        data: output.to_value(),
                        generated_at: now,
                    },
                );
            }
        }
    }

    /// Record a failed invocation. Only tools that were actually resolved count as used.
    pub(crate) fn record_failure(
        &mut self,
        tool: &str,
        arguments: Value,
        error: &AgentError,
        elapsed: Duration,
    ) {
        self.execution_log.push(ExecutionRecord {
            tool: tool.to_string(),
            arguments,
            result: None,
            error: Some(error.to_string()),
            success: false,
            elapsed_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        });
        if matches!(error, AgentError::ExecutionError { .. }) {
            self.tools_used.insert(tool.to_string());
        }
    }
}
