//! The seam between the dispatcher and whatever actually runs a tool.

use async_trait::async_trait;
use copydesk_core::TenantContext;
use serde_json::{Map, Value};

use crate::errors::ToolError;
use crate::output::ToolOutput;

/// Executes one tool.
///
/// Arguments have already passed [`ToolKind::validate`](crate::ToolKind::validate).
/// Implementations must scope tenant data by `tenant.tenant_id`.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Run the tool.
    async fn call(&self, args: &Map<String, Value>, tenant: &TenantContext) -> Result<ToolOutput, ToolError>;
}
