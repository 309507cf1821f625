//! Concurrent execution of one model turn's tool calls.
//!
//! Every call in the batch runs at the same time and the dispatcher waits
//! for all of them. Each call yields exactly one tool message, in the order
//! the calls were issued, whatever happened to it: an unknown name, a tool
//! outside the phase's subset, bad arguments, a provider error or a timeout
//! all become plain-language content for the model. Artifact payloads are
//! pulled out into [`DispatchOutcome::artifacts`] and only a summary goes
//! back to the model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use copydesk_core::{Artifact, Message, RequestLog, TenantContext, ToolCall};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::ToolError;
use crate::formatting::{
    degradation_notice, render_llm, render_log, unavailable_tool_notice, unknown_tool_notice,
};
use crate::kind::ToolKind;
use crate::output::ToolOutput;
use crate::registry::ToolRegistry;

/// Default per-call timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// What happened to one call.
#[derive(Clone, Debug)]
pub struct ToolResult {
    /// Id of the originating call.
    pub tool_call_id: String,
    /// Name the model used.
    pub tool_name: String,
    /// Scan-friendly rendering.
    pub log_text: String,
    /// Content of the tool message.
    pub llm_text: String,
    /// Artifacts the call produced.
    pub artifacts: Vec<Artifact>,
    /// The call did not produce a usable result.
    pub is_error: bool,
}

impl ToolResult {
    fn failed(call: &ToolCall, log_text: String, llm_text: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            log_text,
            llm_text,
            artifacts: Vec::new(),
            is_error: true,
        }
    }

    /// The tool message answering the originating call.
    pub fn to_message(&self) -> Message {
        Message::tool(self.tool_call_id.clone(), self.llm_text.clone())
    }
}

/// Result of one batch.
#[derive(Clone, Debug, Default)]
pub struct DispatchOutcome {
    /// One tool message per call, in call order.
    pub messages: Vec<Message>,
    /// Every artifact produced, in call order.
    pub artifacts: Vec<Artifact>,
    /// Per-call detail.
    pub results: Vec<ToolResult>,
}

impl DispatchOutcome {
    /// Number of calls that failed.
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error).count()
    }
}

/// Runs tool calls against a [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    /// Create a dispatcher with a per-call timeout.
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// The registry calls are resolved against.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `calls` concurrently.
    ///
    /// `allowed` is the phase's tool subset. Never fails.
    #[instrument(skip_all, fields(call_count = calls.len(), tenant_id = %tenant.tenant_id))]
    pub async fn dispatch(
        &self,
        calls: &[ToolCall],
        allowed: &[ToolKind],
        tenant: &TenantContext,
        log: &RequestLog,
    ) -> DispatchOutcome {
        if calls.is_empty() {
            return DispatchOutcome::default();
        }
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        log.log(format!(
            "LLM decided to use {} tool(s): [{}]",
            calls.len(),
            names.join(", ")
        ))
        .await;

        let results = join_all(calls.iter().map(|call| self.run_one(call, allowed, tenant, log))).await;

        let messages = results.iter().map(ToolResult::to_message).collect();
        let artifacts = results
            .iter()
            .flat_map(|r| r.artifacts.iter().cloned())
            .collect();
        let outcome = DispatchOutcome {
            messages,
            artifacts,
            results,
        };
        debug!(
            errors = outcome.error_count(),
            artifacts = outcome.artifacts.len(),
            "tool batch complete"
        );
        outcome
    }

    async fn run_one(
        &self,
        call: &ToolCall,
        allowed: &[ToolKind],
        tenant: &TenantContext,
        log: &RequestLog,
    ) -> ToolResult {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            warn!(tool_name = %call.name, tool_call_id = %call.id, "unknown tool requested");
            let notice = unknown_tool_notice(&call.name);
            log.log(&notice).await;
            return ToolResult::failed(call, notice.clone(), notice);
        };

        let provider = if allowed.contains(&kind) {
            self.registry.get(kind)
        } else {
            None
        };
        let Some(provider) = provider else {
            warn!(tool_name = %call.name, tool_call_id = %call.id, "tool not available in this phase");
            let notice = unavailable_tool_notice(&call.name);
            log.log(&notice).await;
            return ToolResult::failed(call, notice.clone(), notice);
        };

        log.log(format!(
            "Calling tool '{}' with args: {}",
            call.name,
            Value::Object(call.arguments.clone())
        ))
        .await;

        let start = Instant::now();
        let output = match kind.validate(&call.arguments) {
            Ok(()) => match tokio::time::timeout(self.timeout, provider.call(&call.arguments, tenant)).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            },
            Err(e) => Err(e),
        };
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match output {
            Ok(output) => {
                debug!(tool_name = %call.name, tool_call_id = %call.id, duration_ms, "tool executed");
                let log_text = render_log(&output);
                log.log(format!("Tool '{}' results:\n{log_text}", call.name)).await;
                ToolResult {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    llm_text: render_llm(&output),
                    log_text,
                    artifacts: output.artifacts().to_vec(),
                    is_error: matches!(output, ToolOutput::Failure(_)),
                }
            }
            Err(e) => {
                warn!(
                    tool_name = %call.name,
                    tool_call_id = %call.id,
                    duration_ms,
                    category = e.category(),
                    error = %e,
                    "tool call failed"
                );
                let log_text = format!("Error during tool '{}' call: {e}", call.name);
                log.log(&log_text).await;
                ToolResult::failed(call, log_text, degradation_notice(&call.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolProvider;
    use async_trait::async_trait;
    use copydesk_core::{ArtifactKind, ChannelLogSink, Role};
    use mockall::mock;
    use serde_json::{Map, json};

    mock! {
        Provider {}

        #[async_trait]
        impl ToolProvider for Provider {
            async fn call(&self, args: &Map<String, Value>, tenant: &TenantContext) -> Result<ToolOutput, ToolError>;
        }
    }

    struct SlowProvider {
        delay: Duration,
    }

    #[async_trait]
    impl ToolProvider for SlowProvider {
        async fn call(&self, args: &Map<String, Value>, _tenant: &TenantContext) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolOutput::Text(format!("slow result for {}", args["query"])))
        }
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCall {
        ToolCall::new(id, name, args.as_object().cloned().unwrap_or_default())
    }

    fn tenant() -> TenantContext {
        TenantContext::new("acme", "Acme builds payment rails.")
    }

    fn dispatcher(registry: ToolRegistry) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(registry), DEFAULT_TOOL_TIMEOUT)
    }

    fn ok_provider(text: &'static str) -> MockProvider {
        let mut mock = MockProvider::new();
        let _ = mock
            .expect_call()
            .returning(move |_, _| Ok(ToolOutput::Text(text.to_string())));
        mock
    }

    #[tokio::test]
    async fn one_failure_does_not_sink_the_batch() {
        let mut failing = MockProvider::new();
        let _ = failing.expect_call().times(1).returning(|_, _| {
            Err(ToolError::Provider {
                status: 500,
                message: "index offline".into(),
            })
        });
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::DocumentSearch, Arc::new(failing));
        registry.register(ToolKind::WebSearch, Arc::new(ok_provider("fintech trends 2024")));

        let calls = [
            call("c1", "search_document_library", json!({"query": "revenue"})),
            call("c2", "web_search", json!({"query": "fintech"})),
        ];
        let allowed = [ToolKind::DocumentSearch, ToolKind::WebSearch];
        let outcome = dispatcher(registry)
            .dispatch(&calls, &allowed, &tenant(), &RequestLog::disabled())
            .await;

        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0].role, Role::Tool);
        assert_eq!(outcome.messages[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(
            outcome.messages[0].content,
            "The 'search_document_library' tool failed. Please proceed with available information."
        );
        assert_eq!(outcome.messages[1].tool_call_id.as_deref(), Some("c2"));
        assert_eq!(outcome.messages[1].content, "fintech trends 2024");
        assert_eq!(outcome.error_count(), 1);
    }

    #[tokio::test]
    async fn unknown_and_unavailable_tools_answer_inline() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::WebSearch, Arc::new(ok_provider("web")));
        registry.register(ToolKind::ImageGenerate, Arc::new(MockProvider::new()));

        let calls = [
            call("c1", "teleport", json!({})),
            call("c2", "generate_image", json!({"prompt": "p", "style": "modern", "aspect_ratio": "1:1"})),
            call("c3", "search_recent_news", json!({"query": "ai", "sort_by": "relevancy"})),
            call("c4", "web_search", json!({"query": "ai"})),
        ];
        let outcome = dispatcher(registry)
            .dispatch(&calls, &[ToolKind::WebSearch], &tenant(), &RequestLog::disabled())
            .await;

        let contents: Vec<&str> = outcome.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[0], "Error: Unknown tool 'teleport'");
        assert!(contents[1].contains("'generate_image' is not available"));
        assert!(contents[2].contains("'search_recent_news' is not available"));
        assert_eq!(contents[3], "web");
        let ids: Vec<_> = outcome.messages.iter().filter_map(|m| m.tool_call_id.as_deref()).collect();
        assert_eq!(ids, ["c1", "c2", "c3", "c4"]);
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_provider() {
        let mut mock = MockProvider::new();
        let _ = mock.expect_call().times(0);
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::WebSearch, Arc::new(mock));

        let outcome = dispatcher(registry)
            .dispatch(
                &[call("c1", "web_search", json!({}))],
                &[ToolKind::WebSearch],
                &tenant(),
                &RequestLog::disabled(),
            )
            .await;

        assert!(outcome.results[0].is_error);
        assert!(outcome.results[0].log_text.contains("missing required argument `query`"));
    }

    #[tokio::test]
    async fn tenant_is_passed_to_provider() {
        let mut mock = MockProvider::new();
        let _ = mock
            .expect_call()
            .withf(|args, tenant| tenant.tenant_id == "acme" && args["query"] == "revenue")
            .times(1)
            .returning(|_, _| Ok(ToolOutput::Text("ok".into())));
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::DocumentSearch, Arc::new(mock));

        let _ = dispatcher(registry)
            .dispatch(
                &[call("c1", "search_document_library", json!({"query": "revenue"}))],
                &[ToolKind::DocumentSearch],
                &tenant(),
                &RequestLog::disabled(),
            )
            .await;
    }

    #[tokio::test]
    async fn artifact_payload_is_extracted_not_sent() {
        let mut mock = MockProvider::new();
        let _ = mock.expect_call().returning(|_, _| {
            Ok(ToolOutput::Artifact(Artifact::new(
                ArtifactKind::Image,
                "img_1.png",
                b"SECRETPAYLOAD".to_vec(),
                "1KB",
                "modern",
            )))
        });
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::ImageGenerate, Arc::new(mock));

        let outcome = dispatcher(registry)
            .dispatch(
                &[call(
                    "c1",
                    "generate_image",
                    json!({"prompt": "a chart", "style": "modern", "aspect_ratio": "1:1"}),
                )],
                &[ToolKind::ImageGenerate],
                &tenant(),
                &RequestLog::disabled(),
            )
            .await;

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].payload, b"SECRETPAYLOAD");
        let content = &outcome.messages[0].content;
        assert!(content.starts_with("Image generated successfully. Filename: img_1.png"));
        assert!(!content.contains("SECRETPAYLOAD"));
        assert!(!content.contains("U0VDUkVUUEFZTE9BRA"));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_run_concurrently() {
        let mut registry = ToolRegistry::new();
        let slow = Arc::new(SlowProvider {
            delay: Duration::from_secs(10),
        });
        registry.register(ToolKind::WebSearch, slow.clone());
        registry.register(ToolKind::DocumentSearch, slow);

        let start = tokio::time::Instant::now();
        let outcome = dispatcher(registry)
            .dispatch(
                &[
                    call("c1", "web_search", json!({"query": "a"})),
                    call("c2", "search_document_library", json!({"query": "b"})),
                ],
                &[ToolKind::WebSearch, ToolKind::DocumentSearch],
                &tenant(),
                &RequestLog::disabled(),
            )
            .await;

        assert!(start.elapsed() < Duration::from_secs(20));
        assert_eq!(outcome.error_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out_without_blocking_others() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolKind::WebSearch,
            Arc::new(SlowProvider {
                delay: Duration::from_secs(600),
            }),
        );
        registry.register(ToolKind::DocumentSearch, Arc::new(ok_provider("fast")));

        let outcome = ToolDispatcher::new(Arc::new(registry), Duration::from_secs(60))
            .dispatch(
                &[
                    call("c1", "web_search", json!({"query": "a"})),
                    call("c2", "search_document_library", json!({"query": "b"})),
                ],
                &[ToolKind::WebSearch, ToolKind::DocumentSearch],
                &tenant(),
                &RequestLog::disabled(),
            )
            .await;

        assert!(outcome.results[0].is_error);
        assert!(outcome.results[0].log_text.contains("timeout after 60000ms"));
        assert_eq!(outcome.messages[1].content, "fast");
    }

    #[tokio::test]
    async fn progress_lines_reach_sink() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::WebSearch, Arc::new(ok_provider("hello")));
        let (sink, mut rx) = ChannelLogSink::new();
        let log = RequestLog::new(Arc::new(sink), Duration::from_secs(1));

        let _ = dispatcher(registry)
            .dispatch(
                &[call("c1", "web_search", json!({"query": "ai"}))],
                &[ToolKind::WebSearch],
                &tenant(),
                &log,
            )
            .await;
        drop(log);

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(lines[0], "LLM decided to use 1 tool(s): [web_search]");
        assert_eq!(lines[1], r#"Calling tool 'web_search' with args: {"query":"ai"}"#);
        assert_eq!(lines[2], "Tool 'web_search' results:\nhello");
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let outcome = dispatcher(ToolRegistry::new())
            .dispatch(&[], &[], &tenant(), &RequestLog::disabled())
            .await;
        assert!(outcome.messages.is_empty());
    }
}
