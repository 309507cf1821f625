//! Scripted [`LlmClient`] for tests of code that drives a model.
//!
//! Replies are queued per operation and consumed in order. Every request
//! is recorded so tests can count calls and inspect exactly what the
//! model would have seen.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use copydesk_core::{Message, ToolCall};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::client::{InvokeRequest, LlmClient, OutputSchema, ToolChoice};
use crate::errors::{LlmError, LlmResult};

/// Which operation a recorded call used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// [`LlmClient::invoke`].
    Invoke,
    /// [`LlmClient::invoke_structured`].
    Structured,
}

/// One recorded request.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    /// Operation.
    pub kind: CallKind,
    /// Messages as sent.
    pub messages: Vec<Message>,
    /// Names of the bound tools.
    pub tools: Vec<String>,
    /// Tool policy.
    pub tool_choice: ToolChoice,
    /// Schema name for structured calls.
    pub schema: Option<String>,
}

impl RecordedCall {
    /// All message contents joined, for substring assertions.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("[{}] {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

type Reply<T> = Box<dyn FnOnce() -> LlmResult<T> + Send>;

/// Scripted model.
pub struct ScriptedLlm {
    model: String,
    invokes: Mutex<VecDeque<Reply<Message>>>,
    structured: Mutex<VecDeque<Reply<Value>>>,
    fallback: Option<Message>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    /// Empty script. Any call fails until replies are queued.
    pub fn new() -> Self {
        Self {
            model: "scripted".into(),
            invokes: Mutex::new(VecDeque::new()),
            structured: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain assistant reply.
    #[must_use]
    pub fn text(self, content: impl Into<String>) -> Self {
        self.reply(Message::assistant(content))
    }

    /// Queue an assistant reply requesting `calls`, given as `(name, args)`.
    ///
    /// Call ids are `"{prefix}_{index}"` with the prefix unique per reply.
    #[must_use]
    pub fn tool_calls(self, calls: &[(&str, Value)]) -> Self {
        let prefix = uuid::Uuid::now_v7().simple().to_string();
        let calls = calls
            .iter()
            .enumerate()
            .map(|(i, (name, args))| ToolCall::new(format!("call_{prefix}_{i}"), *name, as_map(args)))
            .collect();
        self.reply(Message::assistant_with_tool_calls("", calls))
    }

    /// Queue an arbitrary assistant message.
    #[must_use]
    pub fn reply(self, message: Message) -> Self {
        self.invokes.lock().push_back(Box::new(move || Ok(message)));
        self
    }

    /// Queue a failure for the next freeform call.
    #[must_use]
    pub fn fail_with(self, make: impl FnOnce() -> LlmError + Send + 'static) -> Self {
        self.invokes.lock().push_back(Box::new(move || Err(make())));
        self
    }

    /// Queue a structured reply.
    #[must_use]
    pub fn structured(self, value: Value) -> Self {
        self.structured.lock().push_back(Box::new(move || Ok(value)));
        self
    }

    /// Queue a failure for the next structured call.
    #[must_use]
    pub fn structured_fail_with(self, make: impl FnOnce() -> LlmError + Send + 'static) -> Self {
        self.structured.lock().push_back(Box::new(move || Err(make())));
        self
    }

    /// Reply used once the freeform queue is empty.
    #[must_use]
    pub fn otherwise(mut self, message: Message) -> Self {
        self.fallback = Some(message);
        self
    }

    /// Sleep before every reply.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls of `kind`.
    pub fn count(&self, kind: CallKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    /// Text of every message ever sent, for substring assertions.
    pub fn everything_sent(&self) -> String {
        self.calls
            .lock()
            .iter()
            .map(RecordedCall::transcript)
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn as_map(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn exhausted(kind: &str) -> LlmError {
    LlmError::Other {
        message: format!("script exhausted: no {kind} reply queued"),
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: &InvokeRequest) -> LlmResult<Message> {
        self.calls.lock().push(RecordedCall {
            kind: CallKind::Invoke,
            messages: request.messages.clone(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            tool_choice: request.tool_choice.clone(),
            schema: None,
        });
        self.pause().await;
        let next = self.invokes.lock().pop_front();
        match next {
            Some(reply) => reply(),
            None => self.fallback.clone().ok_or_else(|| exhausted("freeform")),
        }
    }

    async fn invoke_structured(&self, messages: &[Message], schema: &OutputSchema) -> LlmResult<Value> {
        self.calls.lock().push(RecordedCall {
            kind: CallKind::Structured,
            messages: messages.to_vec(),
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
            schema: Some(schema.name.clone()),
        });
        self.pause().await;
        let next = self.structured.lock().pop_front();
        match next {
            Some(reply) => reply(),
            None => Err(exhausted("structured")),
        }
    }
}
