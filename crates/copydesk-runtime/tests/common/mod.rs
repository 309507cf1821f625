#![allow(dead_code, missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use copydesk_core::{ChannelLogSink, RequestLog, TenantContext};
use copydesk_llm::testutil::ScriptedLlm;
use copydesk_runtime::{NoTenantContext, Orchestrator};
use copydesk_settings::CopydeskSettings;
use copydesk_tools::{ToolError, ToolKind, ToolOutput, ToolProvider, ToolRegistry};
use serde_json::{Map, Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

/// Eight bytes of PNG signature.
pub const PNG_BASE64: &str = "iVBORw0KGgo=";
pub const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Provider answering every call with the same JSON body.
pub struct CannedProvider {
    kind: ToolKind,
    body: Value,
    calls: AtomicUsize,
}

impl CannedProvider {
    pub fn new(kind: ToolKind, body: Value) -> Arc<Self> {
        Arc::new(Self {
            kind,
            body,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolProvider for CannedProvider {
    async fn call(&self, _args: &Map<String, Value>, _tenant: &TenantContext) -> Result<ToolOutput, ToolError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        ToolOutput::from_json(self.kind, self.body.clone())
    }
}

pub fn image_body() -> Value {
    json!({
        "base64_data": PNG_BASE64,
        "filename": "fintech_hero.png",
        "style": "professional"
    })
}

pub fn document_body(content: &str) -> Value {
    json!({
        "source_files": ["q3_report.pdf"],
        "document_segments": [{
            "segment_number": 1,
            "filename": "q3_report.pdf",
            "similarity_score": 0.91,
            "content": content
        }]
    })
}

pub fn orchestrator(llm: Arc<ScriptedLlm>, providers: &[(ToolKind, Arc<dyn ToolProvider>)]) -> Orchestrator {
    let mut registry = ToolRegistry::new();
    for (kind, provider) in providers {
        registry.register(*kind, Arc::clone(provider));
    }
    Orchestrator::from_settings(
        llm,
        Arc::new(registry),
        Arc::new(NoTenantContext),
        &CopydeskSettings::default(),
    )
}

pub fn captured_log() -> (RequestLog, UnboundedReceiver<String>) {
    let (sink, rx) = ChannelLogSink::new();
    (
        RequestLog::new(Arc::new(sink), copydesk_core::log_sink::DEFAULT_SINK_TIMEOUT),
        rx,
    )
}

pub fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}
