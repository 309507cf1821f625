//! Tenant context lookup.
//!
//! The company profile is fetched once per top-level request and threaded
//! unchanged through every phase. A missing tenant is not an error: it
//! yields an empty profile and prompts simply omit the section.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use copydesk_core::TenantContext;
use copydesk_settings::SettingsError;
use serde::Deserialize;
use tracing::{debug, warn};

/// Source of per-tenant company descriptions.
#[async_trait]
pub trait TenantContextProvider: Send + Sync {
    /// Company description for `tenant_id`, or `""` when unknown.
    async fn company_context(&self, tenant_id: &str) -> String;
}

/// Resolve a full [`TenantContext`] through `provider`.
pub async fn resolve_tenant(provider: &dyn TenantContextProvider, tenant_id: &str) -> TenantContext {
    let context = provider.company_context(tenant_id).await;
    if context.trim().is_empty() {
        debug!(tenant_id, "no company context for tenant");
    }
    TenantContext::new(tenant_id, context)
}

/// Provider that knows no tenants.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTenantContext;

#[async_trait]
impl TenantContextProvider for NoTenantContext {
    async fn company_context(&self, _tenant_id: &str) -> String {
        String::new()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TenantEntry {
    Plain(String),
    Record { context_description: Option<String> },
}

/// Fixed tenant table, usually loaded from a JSON file.
///
/// The file maps tenant ids either to a description string or to an
/// object with a `context_description` field.
#[derive(Clone, Debug, Default)]
pub struct StaticTenantDirectory {
    tenants: HashMap<String, String>,
}

impl StaticTenantDirectory {
    /// Build from `(tenant_id, description)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tenants: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Load a tenant table from `path`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let raw: HashMap<String, TenantEntry> = serde_json::from_str(&content)?;
        let tenants = raw
            .into_iter()
            .filter_map(|(id, entry)| match entry {
                TenantEntry::Plain(text) => Some((id, text)),
                TenantEntry::Record { context_description } => {
                    if context_description.is_none() {
                        warn!(tenant_id = %id, "tenant entry has no context_description");
                    }
                    context_description.map(|text| (id, text))
                }
            })
            .collect::<HashMap<_, _>>();
        debug!(path = %path.display(), tenants = tenants.len(), "tenant directory loaded");
        Ok(Self { tenants })
    }

    /// Number of known tenants.
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[async_trait]
impl TenantContextProvider for StaticTenantDirectory {
    async fn company_context(&self, tenant_id: &str) -> String {
        self.tenants.get(tenant_id).cloned().unwrap_or_default()
    }
}
