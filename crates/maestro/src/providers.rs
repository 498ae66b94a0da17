pub mod anthropic;
pub mod base;
pub mod configs;
pub mod errors;
pub mod factory;
pub mod openai;
pub mod utils;

#[cfg(test)]
pub mod mock;
