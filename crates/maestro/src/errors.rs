use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ChainResult;
use crate::run_state::RunState;

/// Errors raised while resolving or executing a single tool call.
///
/// These are folded back into the conversation as tool results, so they must be
/// cheap to clone and serializable along with the rest of the history.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool '{tool}' execution failed: {cause}")]
    ExecutionError { tool: String, cause: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Agent '{0}' is already bound")]
    DuplicateAgent(String),
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Agent chain is empty")]
    EmptyChain,

    #[error("Agent function not found: {0}")]
    UnknownAgent(String),

    #[error("Agent '{agent}' failed at step {step}: {cause}")]
    AgentFailed {
        agent: String,
        step: usize,
        cause: String,
        /// The steps that finished before the failure
        partial: Box<ChainResult>,
    },

    #[error("Failed to render instruction: {0}")]
    Template(#[from] tera::Error),
}

/// A provider attempt that ended before producing a final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("No providers configured")]
    NoProviders,

    #[error("All providers failed: {}", format_failures(.failures))]
    ProvidersExhausted {
        failures: Vec<ProviderFailure>,
        /// Progress made by the last attempt before it failed
        partial: Option<Box<RunState>>,
    },
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.provider, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_names_every_provider() {
        let error = OrchestrationError::ProvidersExhausted {
            failures: vec![
                ProviderFailure {
                    provider: "openai".to_string(),
                    error: "timed out".to_string(),
                },
                ProviderFailure {
                    provider: "anthropic".to_string(),
                    error: "status 529".to_string(),
                },
            ],
            partial: None,
        };

        assert_eq!(
            error.to_string(),
            "All providers failed: openai: timed out; anthropic: status 529"
        );
    }

    #[test]
    fn test_agent_error_roundtrips_through_history() {
        let error = AgentError::ExecutionError {
            tool: "image".to_string(),
            cause: "upstream 502".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        let decoded: AgentError = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, error);
        assert_eq!(
            decoded.to_string(),
            "Tool 'image' execution failed: upstream 502"
        );
    }
}
