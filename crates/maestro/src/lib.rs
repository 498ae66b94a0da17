pub mod agents;
pub mod capability;
pub mod chain;
pub mod engine;
pub mod errors;
pub mod fallback;
pub mod models;
pub mod orchestrator;
pub mod prompt_template;
pub mod providers;
pub mod registry;
pub mod run_state;
