//! The three agents a request can be routed to.

use serde::{Deserialize, Serialize};

/// A content agent. Each runs one phase with its own tool subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Gathers facts, stats and context.
    Info,
    /// Writes or rewrites the copy.
    Compose,
    /// Generates or regenerates the visual.
    Multimodal,
}

impl AgentKind {
    /// All agents, in routing-schema order.
    pub const ALL: [Self; 3] = [Self::Info, Self::Compose, Self::Multimodal];

    /// Name used in the routing function schema.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Compose => "compose",
            Self::Multimodal => "multimodal",
        }
    }

    /// One-line description shown to the classifier.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Info => "Gather facts, stats and context for the post",
            Self::Compose => "Write or rewrite the social-media copy",
            Self::Multimodal => "Generate or regenerate an image/diagram for the post",
        }
    }

    /// Resolve an agent name. Returns `None` for anything outside the three agents.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_round_trips() {
        for agent in AgentKind::ALL {
            assert_eq!(AgentKind::from_name(agent.as_str()), Some(agent));
        }
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert_eq!(AgentKind::from_name("publisher"), None);
        assert_eq!(AgentKind::from_name("Compose"), None);
        assert_eq!(AgentKind::from_name(""), None);
    }

    #[test]
    fn descriptions_are_distinct() {
        let [a, b, c] = AgentKind::ALL.map(AgentKind::description);
        assert_ne!(a, b);
        assert_ne!(b, c);
    }
}
