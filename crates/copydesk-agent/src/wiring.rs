//! Build runtime collaborators from settings.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use copydesk_llm::{LlmClient, OpenAiClient, OpenAiConfig};
use copydesk_runtime::{NoTenantContext, StaticTenantDirectory, TenantContextProvider};
use copydesk_settings::{CopydeskSettings, LlmSettings, ToolSettings};
use copydesk_tools::{HttpToolProvider, ToolKind, ToolRegistry};
use tracing::{info, warn};

/// Chat-completions client for `settings`, reading the key from the configured env var.
pub fn llm_client(settings: &LlmSettings) -> Arc<dyn LlmClient> {
    let api_key = std::env::var(&settings.api_key_env).ok().filter(|k| !k.is_empty());
    if api_key.is_none() {
        warn!(env = %settings.api_key_env, "no API key set, requests will be unauthenticated");
    }
    Arc::new(OpenAiClient::new(OpenAiConfig {
        base_url: settings.base_url.clone(),
        model: settings.model.clone(),
        api_key,
        temperature: Some(settings.temperature),
        request_timeout: Duration::from_millis(settings.structured_timeout_ms.max(settings.turn_timeout_ms)),
    }))
}

/// One HTTP provider per configured endpoint. Unknown tool names are skipped.
pub fn tool_registry(settings: &ToolSettings) -> ToolRegistry {
    let timeout = Duration::from_millis(settings.timeout_ms);
    let mut registry = ToolRegistry::new();
    for (name, endpoint) in &settings.endpoints {
        match ToolKind::from_name(name) {
            Some(kind) => registry.register(kind, Arc::new(HttpToolProvider::new(kind, endpoint, timeout))),
            None => warn!(tool = %name, "endpoint configured for unknown tool, ignoring"),
        }
    }
    info!(tools = registry.len(), "tool providers registered");
    registry
}

/// Tenant directory from `tenants_file`, or an empty provider.
pub fn tenant_provider(tenants_file: Option<&str>) -> Result<Arc<dyn TenantContextProvider>> {
    match tenants_file {
        Some(path) => {
            let directory = StaticTenantDirectory::load(Path::new(path))
                .with_context(|| format!("Failed to load tenants file: {path}"))?;
            info!(tenants = directory.len(), "tenant directory loaded");
            Ok(Arc::new(directory))
        }
        None => Ok(Arc::new(NoTenantContext)),
    }
}

/// Everything [`copydesk_runtime::Orchestrator::from_settings`] needs besides settings.
pub fn collaborators(
    settings: &CopydeskSettings,
) -> Result<(Arc<dyn LlmClient>, Arc<ToolRegistry>, Arc<dyn TenantContextProvider>)> {
    Ok((
        llm_client(&settings.llm),
        Arc::new(tool_registry(&settings.tools)),
        tenant_provider(settings.tenants_file.as_deref())?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn registry_from_endpoints() {
        let settings = ToolSettings {
            timeout_ms: 1_000,
            endpoints: BTreeMap::from([
                ("web_search".to_string(), "http://localhost:9000/web".to_string()),
                ("generate_image".to_string(), "http://localhost:9000/img".to_string()),
                ("fax_machine".to_string(), "http://localhost:9000/fax".to_string()),
            ]),
        };
        let registry = tool_registry(&settings);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(ToolKind::WebSearch));
        assert!(registry.contains(ToolKind::ImageGenerate));
    }

    #[test]
    fn empty_endpoints_give_empty_registry() {
        assert!(tool_registry(&ToolSettings::default()).is_empty());
    }

    #[tokio::test]
    async fn tenants_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"acme": "Acme builds payment rails."}}"#).unwrap();
        let provider = tenant_provider(file.path().to_str()).unwrap();
        assert_eq!(provider.company_context("acme").await, "Acme builds payment rails.");
        assert_eq!(provider.company_context("other").await, "");
    }

    #[test]
    fn missing_tenants_file_is_an_error() {
        let err = tenant_provider(Some("/nonexistent/tenants.json")).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/tenants.json"));
    }

    #[tokio::test]
    async fn no_tenants_file_means_no_context() {
        let provider = tenant_provider(None).unwrap();
        assert_eq!(provider.company_context("acme").await, "");
    }

    #[test]
    fn llm_client_uses_configured_model() {
        let settings = LlmSettings {
            model: "gpt-4o-mini".into(),
            api_key_env: "COPYDESK_TEST_UNSET_KEY".into(),
            ..LlmSettings::default()
        };
        assert_eq!(llm_client(&settings).model(), "gpt-4o-mini");
    }
}
