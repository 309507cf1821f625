//! OpenAI-compatible chat-completions backend.

pub mod client;
pub mod wire;

pub use client::{DEFAULT_BASE_URL, OpenAiClient, OpenAiConfig};
