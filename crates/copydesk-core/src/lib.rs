//! # copydesk-core
//!
//! Shared vocabulary for the copydesk content engine.
//!
//! - **Messages**: [`Message`] with `system`/`human`/`assistant`/`tool` roles and [`ToolCall`]
//! - **Content**: [`ContentState`], [`Artifact`], [`Modality`] and the copy-then-overwrite merges
//! - **Agents**: [`AgentKind`], the three phases a follow-up can be routed to
//! - **Tools**: [`ToolDefinition`], a function schema offered to the model
//! - **Tenant**: [`TenantContext`], the read-only company profile threaded through a request
//! - **Log sink**: [`LogSink`] and [`RequestLog`] for best-effort progress lines
//! - **Logging**: `tracing` subscriber setup and capture helpers for tests

#![deny(unsafe_code)]

pub mod agents;
pub mod content;
pub mod log_sink;
pub mod logging;
pub mod messages;
pub mod tenant;
pub mod text;
pub mod tools;

pub use agents::AgentKind;
pub use content::{Artifact, ArtifactKind, ContentError, ContentErrorKind, ContentState, Modality};
pub use log_sink::{ChannelLogSink, LogSink, LogSinkError, RequestLog, TracingLogSink};
pub use messages::{Message, Role, ToolCall};
pub use tenant::TenantContext;
pub use tools::ToolDefinition;
