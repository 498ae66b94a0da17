//! The inbound facade: one call that runs either a chain or a tool-calling run
//! and always answers with a serializable response.
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agents::{
    builtin_chain_runner, builtin_tool_registry, AgentSelector, BuiltinAgents, BuiltinConfig,
    Completer,
};
use crate::capability::CapabilityAdapter;
use crate::chain::{AgentChainStep, ChainResult, ChainRunner};
use crate::errors::{ChainError, OrchestrationError, ProviderFailure};
use crate::fallback::FallbackController;
use crate::orchestrator::{orchestrator_prompt, Orchestrator, DEFAULT_MAX_ITERATIONS};
use crate::providers::base::Provider;
use crate::providers::configs::ProviderConfig;
use crate::providers::factory::get_providers;
use crate::registry::{ArtifactCategory, ToolRegistry};
use crate::run_state::{Artifact, ExecutionRecord, RunState};

/// Everything needed to build an [`Engine`] with the built-in agents
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Providers in priority order
    pub providers: Vec<ProviderConfig>,
    pub max_iterations: usize,
    pub builtin: BuiltinConfig,
}

impl EngineConfig {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            builtin: BuiltinConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<AgentChainStep>>,
}

impl OrchestrationRequest {
    pub fn new<S: Into<String>>(instruction: S) -> Self {
        Self {
            instruction: instruction.into(),
            chain: None,
        }
    }

    pub fn with_chain(mut self, chain: Vec<AgentChainStep>) -> Self {
        self.chain = Some(chain);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub tools_used: Vec<String>,
    pub artifacts: BTreeMap<ArtifactCategory, Artifact>,
    pub execution_log: Vec<ExecutionRecord>,
    pub iterations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProviderFailure>,
}

impl From<RunState> for OrchestrationResponse {
    fn from(state: RunState) -> Self {
        Self {
            success: state.is_completed(),
            summary: state.summary().map(str::to_string),
            error: state.error(),
            provider: Some(state.provider),
            tools_used: state.tools_used.into_iter().collect(),
            artifacts: state.artifacts,
            execution_log: state.execution_log,
            iterations: state.iterations,
            ..Default::default()
        }
    }
}

impl From<ChainResult> for OrchestrationResponse {
    fn from(chain: ChainResult) -> Self {
        Self {
            success: true,
            final_output: Some(chain.final_output.clone()),
            chain: Some(chain),
            ..Default::default()
        }
    }
}

impl From<OrchestrationError> for OrchestrationResponse {
    fn from(err: OrchestrationError) -> Self {
        let error = err.to_string();
        match err {
            OrchestrationError::ProvidersExhausted { failures, partial } => {
                let partial = partial.map(|state| Self::from(*state)).unwrap_or_default();
                Self {
                    success: false,
                    error: Some(error),
                    failures,
                    ..partial
                }
            }
            OrchestrationError::NoProviders => Self {
                error: Some(error),
                ..Default::default()
            },
        }
    }
}

impl From<ChainError> for OrchestrationResponse {
    fn from(err: ChainError) -> Self {
        let error = Some(err.to_string());
        match err {
            ChainError::AgentFailed { partial, .. } => Self {
                success: false,
                error,
                chain: Some(*partial),
                ..Default::default()
            },
            _ => Self {
                error,
                ..Default::default()
            },
        }
    }
}

/// Runs orchestration requests against a fixed set of providers and capabilities.
///
/// Built once at startup; every request gets its own run state.
pub struct Engine {
    controller: FallbackController,
    chain: ChainRunner,
    selector: AgentSelector,
}

impl Engine {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        registry: ToolRegistry,
        chain: ChainRunner,
        max_iterations: usize,
    ) -> Result<Self> {
        let system_prompt = orchestrator_prompt(&registry)?;
        let orchestrator = Orchestrator::new(
            CapabilityAdapter::new(Arc::new(registry)),
            system_prompt,
            max_iterations,
        );
        let selector = AgentSelector::new(Completer::new(providers.clone()));
        Ok(Self {
            controller: FallbackController::new(orchestrator, providers),
            chain,
            selector,
        })
    }

    /// An engine with every built-in agent registered as a tool and bound for chains
    pub fn with_builtins(
        providers: Vec<Arc<dyn Provider>>,
        builtin: &BuiltinConfig,
        max_iterations: usize,
    ) -> Result<Self> {
        let agents = BuiltinAgents::new(Completer::new(providers.clone()), builtin)?;
        let registry = builtin_tool_registry(&agents)?;
        let chain = builtin_chain_runner(&agents)?;
        Self::new(providers, registry, chain, max_iterations)
    }

    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let providers = get_providers(config.providers)?;
        Self::with_builtins(providers, &config.builtin, config.max_iterations)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.controller.orchestrator().adapter().registry().names()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.controller.providers().iter().map(|p| p.name()).collect()
    }

    pub fn chain_agents(&self) -> Vec<&str> {
        self.chain.agent_names()
    }

    /// Run a chain when one is given, otherwise a tool-calling run with fallback
    pub async fn orchestrate(&self, request: OrchestrationRequest) -> OrchestrationResponse {
        match request.chain {
            Some(steps) if !steps.is_empty() => {
                self.run_chain(&request.instruction, &steps).await
            }
            _ => self.run_tools(&request.instruction).await,
        }
    }

    pub async fn run_tools(&self, instruction: &str) -> OrchestrationResponse {
        match self.controller.run(instruction).await {
            Ok(state) => {
                info!(
                    provider = %state.provider,
                    completed = state.is_completed(),
                    "orchestration finished"
                );
                state.into()
            }
            Err(err) => {
                warn!(error = %err, "orchestration failed");
                err.into()
            }
        }
    }

    pub async fn run_chain(
        &self,
        instruction: &str,
        steps: &[AgentChainStep],
    ) -> OrchestrationResponse {
        match self.chain.run(instruction, steps).await {
            Ok(result) => result.into(),
            Err(err) => {
                warn!(error = %err, "agent chain failed");
                err.into()
            }
        }
    }

    /// Known agent names suited to `instruction`
    pub async fn select_agents(&self, instruction: &str) -> Result<Vec<String>> {
        self.selector.select(instruction).await
    }
}
