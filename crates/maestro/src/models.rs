//! These models represent the objects passed around by the orchestrator
//!
//! There are several different related formats we need to interact with:
//! - openai messages/tools, sent from the orchestrator to the primary LLM
//! - anthropic messages/tools, sent from the orchestrator to the secondary LLM
//! - capability requests, sent from the orchestrator to the tools that do the work
//!
//! We always immediately convert the provider formats into the internal structs using
//! to/from helpers in the providers module, so the history can be replayed against any
//! provider without carrying over a provider-specific shape.
pub mod message;
pub mod role;
pub mod tool;
