//! [`ToolProvider`] backed by an HTTP endpoint.
//!
//! Each tool kind is served by its own URL. The request body is
//! `{tool, args, tenant_id, company_context}`; the reply body is decoded
//! with [`ToolOutput::from_json`].

use std::time::Duration;

use async_trait::async_trait;
use copydesk_core::TenantContext;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::errors::ToolError;
use crate::kind::ToolKind;
use crate::output::ToolOutput;
use crate::provider::ToolProvider;

#[derive(Serialize)]
struct ToolRequest<'a> {
    tool: &'a str,
    args: &'a Map<String, Value>,
    tenant_id: &'a str,
    company_context: &'a str,
}

/// Calls a remote tool service.
pub struct HttpToolProvider {
    kind: ToolKind,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpToolProvider {
    /// Provider for `kind` at `endpoint`. `timeout` bounds the transport.
    pub fn new(kind: ToolKind, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent("copydesk/0.1")
                .build()
                .unwrap_or_default(),
        }
    }

    /// The tool this provider serves.
    pub fn kind(&self) -> ToolKind {
        self.kind
    }
}

#[async_trait]
impl ToolProvider for HttpToolProvider {
    #[instrument(skip_all, fields(tool_name = self.kind.name(), tenant_id = %tenant.tenant_id))]
    async fn call(&self, args: &Map<String, Value>, tenant: &TenantContext) -> Result<ToolOutput, ToolError> {
        let body = ToolRequest {
            tool: self.kind.name(),
            args,
            tenant_id: &tenant.tenant_id,
            company_context: &tenant.company_context,
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ToolError::Provider {
                status: status.as_u16(),
                message: text,
            });
        }
        debug!(bytes = text.len(), "tool service replied");

        let value: Value = serde_json::from_str(&text)?;
        ToolOutput::from_json(self.kind, value)
    }
}
