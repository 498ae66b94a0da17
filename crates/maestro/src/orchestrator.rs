//! The single-turn orchestration loop.
//!
//! One [`Orchestrator::run`] drives one provider through a bounded conversation:
//! ask the model, execute every tool it requests, fold the results back into the
//! history and ask again, until the model answers in plain text, the provider
//! fails, or the iteration budget is spent.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capability::{CapabilityAdapter, CapabilityOutput};
use crate::errors::AgentResult;
use crate::models::message::{Message, ToolRequest};
use crate::prompt_template::{load_prompt, ORCHESTRATOR_PROMPT};
use crate::providers::base::{Provider, ProviderTurn};
use crate::registry::ToolRegistry;
use crate::run_state::{RunOutcome, RunState};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Logged as the tool name for requests the provider sent in a shape we could not read
const UNPARSED_TOOL: &str = "<unparsed>";

/// Where the loop is between provider calls
#[derive(Debug)]
enum Phase {
    Thinking,
    ExecutingTools(Vec<ToolRequest>),
    Finished(RunOutcome),
}

/// Result of one dispatched tool request, before it is folded into the run state
struct Dispatched {
    id: String,
    tool: Option<String>,
    arguments: Value,
    result: AgentResult<CapabilityOutput>,
    elapsed: Duration,
}

/// Render the orchestrator system prompt for the tools in `registry`
pub fn orchestrator_prompt(registry: &ToolRegistry) -> Result<String, tera::Error> {
    let mut context = HashMap::new();
    context.insert("tools", registry.definitions());
    load_prompt(ORCHESTRATOR_PROMPT, &context)
}

/// Drives the tool-calling conversation for any [`Provider`].
///
/// Holds no per-run state, so one orchestrator serves any number of runs.
#[derive(Clone)]
pub struct Orchestrator {
    adapter: CapabilityAdapter,
    system_prompt: String,
    max_iterations: usize,
}

impl Orchestrator {
    pub fn new<S: Into<String>>(
        adapter: CapabilityAdapter,
        system_prompt: S,
        max_iterations: usize,
    ) -> Self {
        Self {
            adapter,
            system_prompt: system_prompt.into(),
            max_iterations,
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn adapter(&self) -> &CapabilityAdapter {
        &self.adapter
    }

    /// Run the loop against `provider` until it reaches a terminal outcome.
    ///
    /// Never returns an error: provider failures end the run with
    /// [`RunOutcome::Failed`] and tool failures are handed back to the model.
    pub async fn run(&self, provider: &dyn Provider, instruction: &str) -> RunState {
        let mut state = RunState::new(instruction, provider.name());
        let tools = self.adapter.registry().definitions();
        let mut phase = Phase::Thinking;

        info!(
            run_id = %state.run_id,
            provider = provider.name(),
            tools = tools.len(),
            "starting orchestration run"
        );

        loop {
            phase = match phase {
                Phase::Thinking if state.iterations >= self.max_iterations => {
                    warn!(run_id = %state.run_id, max_iterations = self.max_iterations, "iteration budget exhausted");
                    Phase::Finished(RunOutcome::MaxIterationsExceeded {
                        max_iterations: self.max_iterations,
                    })
                }
                Phase::Thinking => {
                    state.iterations += 1;
                    debug!(run_id = %state.run_id, iteration = state.iterations, "calling provider");

                    match provider
                        .complete(&self.system_prompt, &state.messages, &tools)
                        .await
                    {
                        Ok((message, _usage)) => match ProviderTurn::from_message(message) {
                            ProviderTurn::Final { text, message } => {
                                state.messages.push(message);
                                Phase::Finished(RunOutcome::Completed { summary: text })
                            }
                            ProviderTurn::ToolCalls { requests, message } => {
                                state.messages.push(message);
                                Phase::ExecutingTools(requests)
                            }
                        },
                        Err(err) => {
                            warn!(
                                run_id = %state.run_id,
                                provider = provider.name(),
                                iteration = state.iterations,
                                error = %err,
                                "provider call failed"
                            );
                            Phase::Finished(RunOutcome::Failed {
                                error: err.to_string(),
                                failed_at: state.iterations,
                            })
                        }
                    }
                }
                Phase::ExecutingTools(requests) => {
                    let response = self.execute_tools(&mut state, &requests).await;
                    state.messages.push(response);
                    Phase::Thinking
                }
                Phase::Finished(outcome) => {
                    info!(
                        run_id = %state.run_id,
                        iterations = state.iterations,
                        tools_used = state.tools_used.len(),
                        "orchestration run finished"
                    );
                    state.finish(outcome);
                    return state;
                }
            };
        }
    }

    /// Execute every request of one turn concurrently and build the single
    /// message answering all of them, one response per request id.
    async fn execute_tools(&self, state: &mut RunState, requests: &[ToolRequest]) -> Message {
        let dispatched = join_all(requests.iter().map(|request| self.dispatch(request))).await;

        let mut response = Message::user();
        for outcome in dispatched {
            let tool = outcome.tool.as_deref().unwrap_or(UNPARSED_TOOL);
            match &outcome.result {
                Ok(output) => {
                    debug!(tool, elapsed_ms = outcome.elapsed.as_millis() as u64, "tool succeeded");
                    state.record_success(tool, outcome.arguments, output, outcome.elapsed);
                }
                Err(err) => {
                    warn!(tool, error = %err, "tool failed");
                    state.record_failure(tool, outcome.arguments, err, outcome.elapsed);
                }
            }
            let content = outcome.result.map(|output| output.to_tool_content());
            response = response.with_tool_response(outcome.id, content);
        }
        response
    }

    async fn dispatch(&self, request: &ToolRequest) -> Dispatched {
        let started = Instant::now();
        match &request.tool_call {
            Ok(call) => Dispatched {
                id: request.id.clone(),
                tool: Some(call.name.clone()),
                arguments: call.arguments.clone(),
                result: self
                    .adapter
                    .execute(&call.name, call.arguments.clone())
                    .await,
                elapsed: started.elapsed(),
            },
            Err(err) => Dispatched {
                id: request.id.clone(),
                tool: None,
                arguments: Value::Null,
                result: Err(err.clone()),
                elapsed: Duration::ZERO,
            },
        }
    }
}
