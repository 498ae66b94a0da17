use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};
use crate::providers::errors::{ProviderError, ProviderResult};

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    name: String,
    responses: Mutex<VecDeque<ProviderResult<Message>>>,
    repeat: Option<Box<dyn Fn() -> ProviderResult<Message> + Send + Sync>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Responses and errors, handed out in order
    pub fn scripted(responses: Vec<ProviderResult<Message>>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses.into()),
            repeat: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same response once the script runs out
    pub fn repeating<F>(response: F) -> Self
    where
        F: Fn() -> ProviderResult<Message> + Send + Sync + 'static,
    {
        Self {
            repeat: Some(Box::new(response)),
            ..Self::scripted(Vec::new())
        }
    }

    /// A provider whose every call times out
    pub fn timing_out() -> Self {
        Self::repeating(|| Err(ProviderError::Timeout(Duration::from_secs(30))))
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Conversation histories passed to each call, in call order
    pub fn seen_messages(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[Message],
        _tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());

        let next = self.responses.lock().unwrap().pop_front();
        let response = match (next, &self.repeat) {
            (Some(response), _) => response,
            (None, Some(repeat)) => repeat(),
            // Empty response if no more pre-configured responses
            (None, None) => Ok(Message::assistant().with_text("")),
        };
        response.map(|message| (message, Usage::default()))
    }
}
