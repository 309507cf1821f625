//! # LLM client trait
//!
//! Two distinct operations cover everything the engine asks of a model:
//!
//! - [`LlmClient::invoke`]: freeform turn over a multi-turn history, with
//!   zero or more tools bound. The reply may request tool calls.
//! - [`LlmClient::invoke_structured`]: schema-constrained turn with no
//!   tools bound. The reply is a JSON object matching [`OutputSchema`].
//!
//! [`StructuredOutput`] ties a Rust type to its schema so callers get a
//! typed value from [`complete_structured`].

use async_trait::async_trait;
use copydesk_core::{Message, ToolDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{LlmError, LlmResult};

/// How the model may use the bound tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides.
    #[default]
    Auto,
    /// Model must call some tool.
    Required,
    /// Model must not call tools.
    None,
    /// Model must call the named function.
    Function(String),
}

/// A freeform invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvokeRequest {
    /// Conversation so far, oldest first.
    pub messages: Vec<Message>,
    /// Tools bound for this turn. Empty means none.
    pub tools: Vec<ToolDefinition>,
    /// Tool use policy. Ignored when `tools` is empty.
    pub tool_choice: ToolChoice,
}

impl InvokeRequest {
    /// Request with no tools bound.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Bind tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the tool use policy.
    #[must_use]
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }
}

/// JSON Schema the structured reply must satisfy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name, `[a-zA-Z0-9_-]+`.
    pub name: String,
    /// JSON Schema object.
    pub schema: Value,
}

impl OutputSchema {
    /// Build a schema.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Connection to an LLM inference service.
///
/// Implementors must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier, for logs.
    fn model(&self) -> &str;

    /// Freeform turn. Returns the assistant message, possibly with tool calls.
    async fn invoke(&self, request: &InvokeRequest) -> LlmResult<Message>;

    /// Schema-constrained turn with no tools bound.
    async fn invoke_structured(&self, messages: &[Message], schema: &OutputSchema) -> LlmResult<Value>;
}

/// A type the model can be asked to produce directly.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Schema handed to [`LlmClient::invoke_structured`].
    fn output_schema() -> OutputSchema;
}

/// Run a structured call and decode the reply into `T`.
///
/// A reply that does not deserialize into `T` is an [`LlmError::Parse`].
pub async fn complete_structured<T: StructuredOutput>(
    client: &dyn LlmClient,
    messages: &[Message],
) -> LlmResult<T> {
    let schema = T::output_schema();
    let value = client.invoke_structured(messages, &schema).await?;
    serde_json::from_value(value)
        .map_err(|e| LlmError::parse(format!("reply does not match `{}`: {e}", schema.name)))
}
