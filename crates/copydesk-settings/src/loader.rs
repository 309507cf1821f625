//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CopydeskSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `COPYDESK_*` environment overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::CopydeskSettings;

/// Resolve the default settings path (`~/.copydesk/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".copydesk").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CopydeskSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid merged
/// value is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CopydeskSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<CopydeskSettings> {
    let defaults = serde_json::to_value(CopydeskSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut CopydeskSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Integers must parse and fall within range; invalid values are ignored
/// with a warning, leaving the file/default value in place.
pub fn apply_overrides_from<F>(settings: &mut CopydeskSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = env.string("COPYDESK_LLM_BASE_URL") {
        settings.llm.base_url = v;
    }
    if let Some(v) = env.string("COPYDESK_LLM_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = env.u64("COPYDESK_LLM_TURN_TIMEOUT_MS", 1_000, 3_600_000) {
        settings.llm.turn_timeout_ms = v;
    }
    if let Some(v) = env.u64("COPYDESK_LLM_STRUCTURED_TIMEOUT_MS", 1_000, 3_600_000) {
        settings.llm.structured_timeout_ms = v;
    }

    // ── Phases ──────────────────────────────────────────────────────
    if let Some(v) = env.u32("COPYDESK_INFO_MAX_ROUNDS", 1, 20) {
        settings.phases.info.max_rounds = v;
    }
    if let Some(v) = env.u32("COPYDESK_COMPOSE_MAX_ROUNDS", 1, 20) {
        settings.phases.compose.max_rounds = v;
    }
    if let Some(v) = env.u32("COPYDESK_MULTIMODAL_MAX_ROUNDS", 1, 20) {
        settings.phases.multimodal.max_rounds = v;
    }

    // ── Tools / logging ─────────────────────────────────────────────
    if let Some(v) = env.u64("COPYDESK_TOOL_TIMEOUT_MS", 100, 3_600_000) {
        settings.tools.timeout_ms = v;
    }
    if let Some(v) = env.string("COPYDESK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.u64("COPYDESK_LOG_SINK_TIMEOUT_MS", 10, 600_000) {
        settings.logging.sink_timeout_ms = v;
    }
    if let Some(v) = env.string("COPYDESK_TENANTS_FILE") {
        settings.tenants_file = Some(v);
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn u32(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        let val = (self.lookup)(name)?;
        let result = parse_u32_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u32 env var, ignoring");
        }
        result
    }
}
