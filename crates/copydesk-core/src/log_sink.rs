//! Best-effort delivery of human-readable progress lines.
//!
//! A [`LogSink`] is an external collaborator (a websocket, a channel to a
//! CLI, a log shipper). [`RequestLog`] wraps an optional sink for one
//! request: every line is mirrored to `tracing`, delivery is bounded by a
//! timeout, and sink failures are logged and dropped. A broken sink never
//! fails a request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default bound on a single sink delivery.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Error from a sink delivery.
#[derive(Debug, Error)]
pub enum LogSinkError {
    /// The receiving side has gone away.
    #[error("log sink closed")]
    Closed,
    /// Sink-specific failure.
    #[error("log sink failed: {0}")]
    Failed(String),
}

/// Receiver of progress lines.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one line.
    async fn send(&self, line: &str) -> Result<(), LogSinkError>;
}

// ── Sinks ──────────────────────────────────────────────────────────────────

/// Sink that forwards lines into an unbounded tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelLogSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelLogSink {
    /// Create a sink and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl LogSink for ChannelLogSink {
    async fn send(&self, line: &str) -> Result<(), LogSinkError> {
        self.tx
            .send(line.to_owned())
            .map_err(|_| LogSinkError::Closed)
    }
}

/// Sink that emits every line as an `info` event on the `copydesk::progress` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    async fn send(&self, line: &str) -> Result<(), LogSinkError> {
        info!(target: "copydesk::progress", "{line}");
        Ok(())
    }
}

// ── RequestLog ─────────────────────────────────────────────────────────────

/// Per-request handle over an optional sink.
#[derive(Clone)]
pub struct RequestLog {
    sink: Option<Arc<dyn LogSink>>,
    timeout: Duration,
}

impl RequestLog {
    /// Log to `sink` with the given delivery timeout.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, timeout: Duration) -> Self {
        Self {
            sink: Some(sink),
            timeout,
        }
    }

    /// Log to `tracing` only.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: None,
            timeout: DEFAULT_SINK_TIMEOUT,
        }
    }

    /// Build from an optional sink.
    #[must_use]
    pub fn from_option(sink: Option<Arc<dyn LogSink>>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Returns `true` if a sink is attached.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Emit one progress line.
    pub async fn log(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        debug!(target: "copydesk::progress", "{line}");

        let Some(sink) = &self.sink else {
            return;
        };
        match tokio::time::timeout(self.timeout, sink.send(line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "log sink delivery failed"),
            Err(_) => warn!(
                timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                "log sink delivery timed out"
            ),
        }
    }

    /// Emit several lines in order.
    pub async fn log_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.log(line).await;
        }
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for RequestLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLog")
            .field("enabled", &self.is_enabled())
            .field("timeout", &self.timeout)
            .finish()
    }
}
