//! # copydesk-tools
//!
//! The tools a phase can offer the model, and the machinery that runs them.
//!
//! - [`ToolKind`]: the closed catalogue, with definitions and argument validation
//! - [`ToolProvider`]: executes one kind; [`HttpToolProvider`] calls a remote service
//! - [`ToolRegistry`]: which kinds have a provider
//! - [`ToolDispatcher`]: runs one turn's calls concurrently, isolating failures
//! - [`ToolOutput`] and [`formatting`]: typed results and their LOG/LLM renderings

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod errors;
pub mod formatting;
pub mod http;
pub mod kind;
pub mod output;
pub mod provider;
pub mod registry;

pub use dispatcher::{DEFAULT_TOOL_TIMEOUT, DispatchOutcome, ToolDispatcher, ToolResult};
pub use errors::ToolError;
pub use formatting::{render_generic, render_llm, render_log};
pub use http::HttpToolProvider;
pub use kind::{ToolKind, resolve_names};
pub use output::ToolOutput;
pub use provider::ToolProvider;
pub use registry::ToolRegistry;
