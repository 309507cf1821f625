//! # copydesk-settings
//!
//! Layered configuration for the copydesk engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CopydeskSettings::default()`]
//! 2. **User file**: `~/.copydesk/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `COPYDESK_*` overrides (highest priority)
//!
//! There is no global instance. The loaded value is passed to whatever
//! builds the runtime.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
