//! # copydesk-llm
//!
//! Connection to the LLM inference service.
//!
//! - [`LlmClient`]: freeform `invoke` (tools optional) and schema-typed
//!   `invoke_structured`
//! - [`StructuredOutput`] + [`complete_structured`]: typed structured replies
//! - [`LlmError`]: transport, API, timeout and parse failures
//! - [`OpenAiClient`]: chat-completions implementation over `reqwest`
//! - [`testutil::ScriptedLlm`]: scripted client for tests of model-driving code

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod openai;
pub mod testutil;

pub use client::{
    InvokeRequest, LlmClient, OutputSchema, StructuredOutput, ToolChoice, complete_structured,
};
pub use errors::{LlmError, LlmResult};
pub use openai::{OpenAiClient, OpenAiConfig};
