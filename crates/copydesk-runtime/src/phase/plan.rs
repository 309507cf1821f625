//! Per-phase tool subsets and round limits, resolved from settings.

use copydesk_core::AgentKind;
use copydesk_settings::{DEFAULT_MAX_ROUNDS, PhaseConfig, PhaseSettings};
use copydesk_tools::{ToolKind, resolve_names};
use tracing::warn;

/// Resolved configuration for one phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseProfile {
    /// Tools the phase binds.
    pub tools: Vec<ToolKind>,
    /// Continuation calls before the forced final call.
    pub max_rounds: u32,
}

impl PhaseProfile {
    /// Profile with the default round limit.
    pub fn new(tools: Vec<ToolKind>) -> Self {
        Self {
            tools,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Resolve a settings entry. Unknown tool names are dropped with a warning.
    pub fn from_config(phase: AgentKind, config: &PhaseConfig) -> Self {
        let (tools, unknown) = resolve_names(&config.tools);
        for name in &unknown {
            warn!(phase = %phase, tool_name = %name, "unknown tool in phase settings, skipping");
        }
        Self {
            tools,
            max_rounds: config.max_rounds.max(1),
        }
    }
}

/// Profiles for all three phases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhasePlan {
    /// Research.
    pub info: PhaseProfile,
    /// Copywriting.
    pub compose: PhaseProfile,
    /// Visuals.
    pub multimodal: PhaseProfile,
}

impl PhasePlan {
    /// Resolve every phase from settings.
    pub fn from_settings(settings: &PhaseSettings) -> Self {
        Self {
            info: PhaseProfile::from_config(AgentKind::Info, &settings.info),
            compose: PhaseProfile::from_config(AgentKind::Compose, &settings.compose),
            multimodal: PhaseProfile::from_config(AgentKind::Multimodal, &settings.multimodal),
        }
    }

    /// Profile for `phase`.
    pub fn profile(&self, phase: AgentKind) -> &PhaseProfile {
        match phase {
            AgentKind::Info => &self.info,
            AgentKind::Compose => &self.compose,
            AgentKind::Multimodal => &self.multimodal,
        }
    }
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self::from_settings(&PhaseSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_matches_catalogue() {
        let plan = PhasePlan::default();
        assert_eq!(plan.info.tools, [ToolKind::DocumentSearch, ToolKind::WebSearch]);
        assert_eq!(plan.compose.tools, [ToolKind::PostExampleSearch]);
        assert_eq!(
            plan.multimodal.tools,
            [ToolKind::ImageGenerate, ToolKind::DiagramCreate, ToolKind::ImageWebSearch]
        );
        assert_eq!(plan.profile(AgentKind::Info).max_rounds, DEFAULT_MAX_ROUNDS);
    }

    #[test]
    fn unknown_names_are_dropped() {
        let config = PhaseConfig {
            max_rounds: 2,
            tools: vec!["web_search".into(), "teleport".into(), "search_recent_news".into()],
        };
        let profile = PhaseProfile::from_config(AgentKind::Info, &config);
        assert_eq!(profile.tools, [ToolKind::WebSearch, ToolKind::NewsSearch]);
        assert_eq!(profile.max_rounds, 2);
    }
}
