use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{OrchestrationError, ProviderFailure};
use crate::orchestrator::Orchestrator;
use crate::providers::base::Provider;
use crate::run_state::RunState;

/// Runs the orchestration loop against providers in priority order.
///
/// A provider that fails gets its attempt thrown away and the next provider
/// starts over from the original instruction. Attempts never overlap, so a tool
/// with side effects runs at most once per attempt that reached it.
pub struct FallbackController {
    orchestrator: Orchestrator,
    providers: Vec<Arc<dyn Provider>>,
}

impl FallbackController {
    pub fn new(orchestrator: Orchestrator, providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            orchestrator,
            providers,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Run `instruction` to a terminal outcome.
    ///
    /// Completed runs and runs that exhausted their iteration budget are returned
    /// as-is. Only provider failures move on to the next provider; a reply with
    /// unreadable tool calls becomes tool errors for the same provider to see.
    pub async fn run(&self, instruction: &str) -> Result<RunState, OrchestrationError> {
        if self.providers.is_empty() {
            return Err(OrchestrationError::NoProviders);
        }

        let mut failures = Vec::new();
        let mut last_attempt = None;

        for provider in &self.providers {
            let state = self.orchestrator.run(provider.as_ref(), instruction).await;
            if !state.is_failed() {
                return Ok(state);
            }

            let error = state.error().unwrap_or_default();
            warn!(
                provider = provider.name(),
                error = %error,
                "provider attempt failed, trying next provider"
            );
            failures.push(ProviderFailure {
                provider: provider.name().to_string(),
                error,
            });
            last_attempt = Some(Box::new(state));
        }

        info!(attempts = failures.len(), "all providers failed");
        Err(OrchestrationError::ProvidersExhausted {
            failures,
            partial: last_attempt,
        })
    }
}
