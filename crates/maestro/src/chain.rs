//! Sequential agent pipelines.
//!
//! A chain hands the original request to its first agent, then feeds each
//! agent's formatted output to the next one inside a rewritten instruction.
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::capability::Capability;
use crate::errors::{ChainError, RegistryError};
use crate::prompt_template::{load_prompt, CHAIN_STEP_PROMPT};
use crate::registry::ToolKind;

/// One caller-supplied step of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChainStep {
    #[serde(rename = "name")]
    pub agent_name: String,
    #[serde(rename = "instruction", default, skip_serializing_if = "Option::is_none")]
    pub extra_instruction: Option<String>,
}

impl AgentChainStep {
    pub fn new<S: Into<String>>(agent_name: S) -> Self {
        Self {
            agent_name: agent_name.into(),
            extra_instruction: None,
        }
    }

    pub fn with_instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.extra_instruction = Some(instruction.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStepResult {
    pub agent_name: String,
    /// 1-based position in the chain
    pub step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_instruction: Option<String>,
    pub instruction_used: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResult {
    pub original_instruction: String,
    pub agent_chain: Vec<String>,
    pub results: Vec<ChainStepResult>,
    pub final_output: String,
}

impl ChainResult {
    /// Results of the steps that ran; the final output is the last one's output
    fn new(
        original_instruction: &str,
        steps: &[AgentChainStep],
        results: Vec<ChainStepResult>,
    ) -> Self {
        let final_output = results
            .last()
            .map(|r| r.output.clone())
            .unwrap_or_default();
        Self {
            original_instruction: original_instruction.to_string(),
            agent_chain: steps.iter().map(|s| s.agent_name.clone()).collect(),
            results,
            final_output,
        }
    }
}

#[derive(Serialize)]
struct StepContext<'a> {
    framing: &'a str,
    extra: Option<&'a str>,
    original: &'a str,
    agent: &'a str,
    has_previous: bool,
    previous: &'a str,
    next: Option<&'a str>,
}

/// Build the instruction handed to the agent at `index`.
///
/// Depends only on its inputs, so the same chain always yields the same
/// instructions for the same agent outputs.
pub fn tailored_instruction(
    original_instruction: &str,
    steps: &[AgentChainStep],
    index: usize,
    previous_output: Option<&str>,
) -> Result<String, ChainError> {
    let step = &steps[index];
    let framing = ToolKind::from_name(&step.agent_name)
        .map(ToolKind::role_framing)
        .unwrap_or_default();

    let context = StepContext {
        framing,
        extra: step
            .extra_instruction
            .as_deref()
            .filter(|extra| !extra.trim().is_empty()),
        original: original_instruction,
        agent: &step.agent_name,
        has_previous: index > 0,
        previous: previous_output.unwrap_or_default(),
        next: steps.get(index + 1).map(|next| next.agent_name.as_str()),
    };

    Ok(load_prompt(CHAIN_STEP_PROMPT, &context)?)
}

/// Runs chains over a fixed set of named agents.
///
/// Agents are bound once at startup; the runner is read-only afterwards.
#[derive(Default, Clone)]
pub struct ChainRunner {
    agents: HashMap<String, Arc<dyn Capability>>,
}

impl ChainRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<S: Into<String>>(
        &mut self,
        name: S,
        agent: Arc<dyn Capability>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.agents.contains_key(&name) {
            return Err(RegistryError::DuplicateAgent(name));
        }
        self.agents.insert(name, agent);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Bound agent names, sorted
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run every step in order, each one seeing the previous step's output.
    ///
    /// All agent names are checked before the first step runs, so an unknown
    /// agent never leaves a half-executed chain behind.
    pub async fn run(
        &self,
        original_instruction: &str,
        steps: &[AgentChainStep],
    ) -> Result<ChainResult, ChainError> {
        if steps.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        if let Some(unknown) = steps.iter().find(|s| !self.contains(&s.agent_name)) {
            return Err(ChainError::UnknownAgent(unknown.agent_name.clone()));
        }

        let mut results: Vec<ChainStepResult> = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let previous = results.last().map(|r| r.output.as_str());
            let instruction = tailored_instruction(original_instruction, steps, index, previous)?;

            info!(
                agent = %step.agent_name,
                step = index + 1,
                total = steps.len(),
                "executing chain step"
            );

            let agent = self
                .agents
                .get(&step.agent_name)
                .ok_or_else(|| ChainError::UnknownAgent(step.agent_name.clone()))?;
            let raw = match agent.invoke(json!({ "instruction": instruction })).await {
                Ok(raw) => raw,
                Err(cause) => {
                    warn!(
                        agent = %step.agent_name,
                        step = index + 1,
                        error = %cause,
                        "chain step failed"
                    );
                    return Err(ChainError::AgentFailed {
                        agent: step.agent_name.clone(),
                        step: index + 1,
                        cause: format!("{:#}", cause),
                        partial: Box::new(ChainResult::new(original_instruction, steps, results)),
                    });
                }
            };
            let output = raw.format_for_chain();

            debug!(agent = %step.agent_name, chars = output.len(), "chain step completed");

            results.push(ChainStepResult {
                agent_name: step.agent_name.clone(),
                step: index + 1,
                extra_instruction: step.extra_instruction.clone(),
                instruction_used: instruction,
                output,
            });
        }

        Ok(ChainResult::new(original_instruction, steps, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{capability_fn, instruction_argument, CapabilityOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bakery_runner() -> ChainRunner {
        let mut runner = ChainRunner::new();
        runner
            .bind(
                "website",
                capability_fn(|_| async {
                    Ok::<_, anyhow::Error>(CapabilityOutput::website(
                        "<h1>Sweet Crumbs Bakery</h1>",
                        "h1 { font-family: serif; }",
                    ))
                }),
            )
            .unwrap();
        runner
            .bind(
                "seo",
                capability_fn(|args| async move {
                    let instruction = instruction_argument(&args)?;
                    Ok::<_, anyhow::Error>(CapabilityOutput::text(format!(
                        "SEO plan ({} chars of input)",
                        instruction.len()
                    )))
                }),
            )
            .unwrap();
        runner
    }

    fn bakery_chain() -> Vec<AgentChainStep> {
        vec![AgentChainStep::new("website"), AgentChainStep::new("seo")]
    }

    #[tokio::test]
    async fn test_bakery_website_then_seo() {
        let result = bakery_runner()
            .run("Build a website for a bakery", &bakery_chain())
            .await
            .unwrap();

        assert_eq!(result.agent_chain, vec!["website", "seo"]);
        assert_eq!(result.results.len(), 2);

        let website = &result.results[0];
        assert_eq!(website.step, 1);
        assert_eq!(
            website.output,
            "HTML Code:\n```html\n<h1>Sweet Crumbs Bakery</h1>\n```\n\nCSS Code:\n```css\nh1 { font-family: serif; }\n```"
        );
        assert_eq!(
            website.instruction_used,
            "You are creating website specifications and design.\n\n\
             Original Request: \"Build a website for a bakery\"\n\n\
             Please provide your output for this request.\n\n\
             Note: Your output will be used by the seo agent next, so ensure it contains relevant information for seo work."
        );

        let seo = &result.results[1];
        assert!(seo.instruction_used.contains(&website.output));
        assert!(seo.instruction_used.starts_with("You are optimizing for search engines."));
        assert!(seo
            .instruction_used
            .ends_with("Based on the above output, provide your specialized seo work."));
        assert_eq!(result.final_output, seo.output);
    }

    #[tokio::test]
    async fn test_chain_is_repeatable() {
        let runner = bakery_runner();
        let first = runner.run("Build a website for a bakery", &bakery_chain()).await.unwrap();
        let second = runner.run("Build a website for a bakery", &bakery_chain()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_agent_fails_before_any_step_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut runner = ChainRunner::new();
        runner
            .bind(
                "website",
                capability_fn(move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>(CapabilityOutput::text("site"))
                    }
                }),
            )
            .unwrap();

        let err = runner
            .run(
                "Build a website",
                &[AgentChainStep::new("website"), AgentChainStep::new("podcast")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ChainError::UnknownAgent(ref name) if name == "podcast"));
        assert_eq!(err.to_string(), "Agent function not found: podcast");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_agent_aborts_remaining_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut runner = ChainRunner::new();
        runner
            .bind(
                "website",
                capability_fn(|_| async {
                    Err::<CapabilityOutput, _>(anyhow::anyhow!("model refused"))
                }),
            )
            .unwrap();
        runner
            .bind(
                "seo",
                capability_fn(move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>(CapabilityOutput::text("seo"))
                    }
                }),
            )
            .unwrap();

        let err = runner.run("Build", &bakery_chain()).await.unwrap_err();

        match err {
            ChainError::AgentFailed {
                agent,
                step,
                cause,
                partial,
            } => {
                assert_eq!(agent, "website");
                assert_eq!(step, 1);
                assert_eq!(cause, "model refused");
                assert!(partial.results.is_empty());
                assert_eq!(partial.agent_chain, vec!["website", "seo"]);
            }
            other => panic!("Expected AgentFailed, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_later_failure_keeps_completed_steps() {
        let mut runner = ChainRunner::new();
        runner
            .bind(
                "website",
                capability_fn(|_| async {
                    Ok::<_, anyhow::Error>(CapabilityOutput::website(
                        "<h1>Sweet Crumbs Bakery</h1>",
                        "h1 { font-family: serif; }",
                    ))
                }),
            )
            .unwrap();
        runner
            .bind(
                "seo",
                capability_fn(|_| async {
                    Err::<CapabilityOutput, _>(anyhow::anyhow!("seo down"))
                }),
            )
            .unwrap();

        let err = runner
            .run("Build a website for a bakery", &bakery_chain())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Agent 'seo' failed at step 2: seo down");
        let ChainError::AgentFailed { partial, .. } = err else {
            panic!("Expected AgentFailed");
        };
        assert_eq!(partial.results.len(), 1);
        assert_eq!(partial.results[0].agent_name, "website");
        assert!(partial.results[0].output.contains("<h1>Sweet Crumbs Bakery</h1>"));
        assert_eq!(partial.final_output, partial.results[0].output);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let err = bakery_runner().run("anything", &[]).await.unwrap_err();
        assert!(matches!(err, ChainError::EmptyChain));
    }

    #[test]
    fn test_extra_instruction_and_unknown_framing() {
        let steps = vec![
            AgentChainStep::new("copyWriting").with_instruction("Keep it under 50 words"),
            AgentChainStep::new("translator"),
        ];

        let first = tailored_instruction("Launch our bread", &steps, 0, None).unwrap();
        assert_eq!(
            first,
            "You are writing compelling content.\n\n\
             SPECIFIC INSTRUCTION FOR THIS TASK:\nKeep it under 50 words\n\n\
             Original Request: \"Launch our bread\"\n\n\
             Please provide your output for this request.\n\n\
             Note: Your output will be used by the translator agent next, so ensure it contains relevant information for translator work."
        );

        let last = tailored_instruction("Launch our bread", &steps, 1, Some("Fresh daily.")).unwrap();
        assert_eq!(
            last,
            "Original Request: \"Launch our bread\"\n\n\
             Previous Agent Output:\n---\nFresh daily.\n---\n\n\
             Based on the above output, provide your specialized translator work."
        );
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut runner = bakery_runner();
        let err = runner
            .bind(
                "seo",
                capability_fn(|_| async { Ok::<_, anyhow::Error>(CapabilityOutput::text("x")) }),
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAgent("seo".to_string()));
        assert_eq!(runner.agent_names(), vec!["seo", "website"]);
    }

    #[test]
    fn test_step_deserializes_from_request_shape() {
        let step: AgentChainStep =
            serde_json::from_str(r#"{"name": "seo", "instruction": "focus on local"}"#).unwrap();
        assert_eq!(step, AgentChainStep::new("seo").with_instruction("focus on local"));
        let bare: AgentChainStep = serde_json::from_str(r#"{"name": "website"}"#).unwrap();
        assert_eq!(bare.extra_instruction, None);
    }
}
