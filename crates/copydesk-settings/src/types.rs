//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a
//! settings file may be partial: missing fields take their default value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Round limit shared by every phase unless overridden.
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Root settings type.
///
/// ```json
/// {
///   "llm": { "model": "gpt-4o-mini" },
///   "phases": { "info": { "maxRounds": 2 } },
///   "tools": { "endpoints": { "web_search": "http://localhost:9000/web" } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopydeskSettings {
    /// LLM inference service.
    pub llm: LlmSettings,
    /// Per-phase loop limits and tool subsets.
    pub phases: PhaseSettings,
    /// Tool provider wiring.
    pub tools: ToolSettings,
    /// Logging and progress sink.
    pub logging: LoggingSettings,
    /// JSON file mapping tenant ids to company descriptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenants_file: Option<String>,
}

impl CopydeskSettings {
    /// Reject values the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        for (name, phase) in self.phases.iter() {
            if phase.max_rounds == 0 {
                return Err(SettingsError::InvalidValue(format!(
                    "phases.{name}.maxRounds must be at least 1"
                )));
            }
        }
        if self.llm.turn_timeout_ms == 0 || self.llm.structured_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "llm timeouts must be positive".into(),
            ));
        }
        if self.tools.timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "tools.timeoutMs must be positive".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(SettingsError::InvalidValue("llm.model is empty".into()));
        }
        Ok(())
    }
}

// ── LLM ────────────────────────────────────────────────────────────────────

/// Connection to an OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Timeout for a tool-bound or freeform turn.
    pub turn_timeout_ms: u64,
    /// Timeout for the final schema-constrained call.
    pub structured_timeout_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            turn_timeout_ms: 60_000,
            structured_timeout_ms: 120_000,
        }
    }
}

// ── Phases ─────────────────────────────────────────────────────────────────

/// Loop limit and tool subset for one phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseConfig {
    /// Continuation calls allowed before a forced summary.
    pub max_rounds: u32,
    /// Tool names bound for this phase.
    pub tools: Vec<String>,
}

impl PhaseConfig {
    fn with_tools(tools: &[&str]) -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            tools: tools.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self::with_tools(&[])
    }
}

/// Settings for the three phases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseSettings {
    /// Research phase.
    pub info: PhaseConfig,
    /// Copywriting phase.
    pub compose: PhaseConfig,
    /// Visual phase.
    pub multimodal: PhaseConfig,
}

impl PhaseSettings {
    /// `(name, config)` pairs in phase order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PhaseConfig)> {
        [
            ("info", &self.info),
            ("compose", &self.compose),
            ("multimodal", &self.multimodal),
        ]
        .into_iter()
    }
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            info: PhaseConfig::with_tools(&["search_document_library", "web_search"]),
            compose: PhaseConfig::with_tools(&["search_linkedin_posts"]),
            multimodal: PhaseConfig::with_tools(&[
                "generate_image",
                "create_diagram",
                "image_web_search",
            ]),
        }
    }
}

// ── Tools ──────────────────────────────────────────────────────────────────

/// Tool provider settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    /// Timeout for a single tool call.
    pub timeout_ms: u64,
    /// HTTP endpoint per tool name. Tools without an endpoint are unavailable.
    pub endpoints: BTreeMap<String, String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            endpoints: BTreeMap::new(),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────────────────

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
    /// Bound on a single progress-line delivery.
    pub sink_timeout_ms: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            sink_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults() {
        let settings = CopydeskSettings::default();
        assert_eq!(settings.llm.turn_timeout_ms, 60_000);
        assert_eq!(settings.llm.structured_timeout_ms, 120_000);
        assert_eq!(settings.tools.timeout_ms, 60_000);
        assert_eq!(settings.logging.sink_timeout_ms, 5_000);
        assert!(settings.phases.iter().all(|(_, p)| p.max_rounds == DEFAULT_MAX_ROUNDS));
        assert_eq!(settings.phases.compose.tools, ["search_linkedin_posts"]);
        assert!(settings.tenants_file.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: CopydeskSettings =
            serde_json::from_str(r#"{"phases": {"info": {"maxRounds": 5}}}"#).unwrap();
        assert_eq!(settings.phases.info.max_rounds, 5);
        assert!(settings.phases.info.tools.is_empty());
        assert_eq!(settings.phases.compose.max_rounds, DEFAULT_MAX_ROUNDS);
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut settings = CopydeskSettings::default();
        settings.phases.multimodal.max_rounds = 0;
        let err = settings.validate().unwrap_err();
        assert_matches!(err, SettingsError::InvalidValue(ref m) if m.contains("multimodal"));
    }

    #[test]
    fn zero_tool_timeout_rejected() {
        let mut settings = CopydeskSettings::default();
        settings.tools.timeout_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(CopydeskSettings::default()).unwrap();
        assert_eq!(value["llm"]["turnTimeoutMs"], 60_000);
        assert_eq!(value["phases"]["info"]["maxRounds"], 3);
        assert!(value.get("tenantsFile").is_none());
    }
}
