//! Tool registry: which [`ToolKind`]s have a provider in this process.
//!
//! Phases bind a subset of kinds. The registry answers which of that
//! subset can actually run and hands out their definitions for the model.

use std::collections::HashMap;
use std::sync::Arc;

use copydesk_core::ToolDefinition;
use tracing::debug;

use crate::kind::ToolKind;
use crate::provider::ToolProvider;

/// Maps tool kinds to providers.
#[derive(Default)]
pub struct ToolRegistry {
    providers: HashMap<ToolKind, Arc<dyn ToolProvider>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Overwrites any existing provider for `kind`.
    pub fn register(&mut self, kind: ToolKind, provider: Arc<dyn ToolProvider>) {
        debug!(tool_name = kind.name(), "tool registered");
        let _ = self.providers.insert(kind, provider);
    }

    /// Look up the provider for `kind`.
    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn ToolProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Whether `kind` has a provider.
    pub fn contains(&self, kind: ToolKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Registered kinds in catalogue order.
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL.into_iter().filter(|k| self.contains(*k)).collect()
    }

    /// The part of `wanted` that has a provider, in the order given.
    pub fn available(&self, wanted: &[ToolKind]) -> Vec<ToolKind> {
        wanted.iter().copied().filter(|k| self.contains(*k)).collect()
    }

    /// Definitions for the available part of `wanted`.
    pub fn definitions_for(&self, wanted: &[ToolKind]) -> Vec<ToolDefinition> {
        self.available(wanted).into_iter().map(ToolKind::definition).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;
    use crate::output::ToolOutput;
    use async_trait::async_trait;
    use copydesk_core::TenantContext;
    use serde_json::{Map, Value};

    struct StubProvider;

    #[async_trait]
    impl ToolProvider for StubProvider {
        async fn call(&self, _args: &Map<String, Value>, _tenant: &TenantContext) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::Text("ok".into()))
        }
    }

    #[test]
    fn new_is_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.kinds().is_empty());
    }

    #[test]
    fn register_and_get() {
        let mut reg = ToolRegistry::new();
        reg.register(ToolKind::WebSearch, Arc::new(StubProvider));
        assert!(reg.get(ToolKind::WebSearch).is_some());
        assert!(reg.get(ToolKind::NewsSearch).is_none());
    }

    #[test]
    fn register_duplicate_overwrites() {
        let mut reg = ToolRegistry::new();
        reg.register(ToolKind::WebSearch, Arc::new(StubProvider));
        reg.register(ToolKind::WebSearch, Arc::new(StubProvider));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn available_filters_and_keeps_order() {
        let mut reg = ToolRegistry::new();
        reg.register(ToolKind::WebSearch, Arc::new(StubProvider));
        reg.register(ToolKind::DocumentSearch, Arc::new(StubProvider));

        let wanted = [ToolKind::WebSearch, ToolKind::NewsSearch, ToolKind::DocumentSearch];
        assert_eq!(reg.available(&wanted), [ToolKind::WebSearch, ToolKind::DocumentSearch]);

        let names: Vec<String> = reg.definitions_for(&wanted).into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["web_search", "search_document_library"]);
        assert_eq!(reg.kinds(), [ToolKind::DocumentSearch, ToolKind::WebSearch]);
    }
}
