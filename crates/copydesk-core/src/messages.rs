//! Conversation messages exchanged with the LLM inference service.
//!
//! A [`Message`] carries one of four [`Role`]s. Assistant messages may hold
//! an ordered list of [`ToolCall`]s; tool messages answer exactly one call
//! through `tool_call_id`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Role ───────────────────────────────────────────────────────────────────

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// End-user or runtime-authored input.
    Human,
    /// Model output.
    Assistant,
    /// Result of a tool call.
    Tool,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "human",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ToolCall ───────────────────────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier, unique within one assistant turn.
    pub id: String,
    /// Tool name as the model spelled it.
    pub name: String,
    /// Arguments object.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Build a tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// String argument by key, if present.
    #[must_use]
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

// ── Message ────────────────────────────────────────────────────────────────

/// One entry of a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call answered by a tool message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Human message.
    #[must_use]
    pub fn human(content: impl Into<String>) -> Self {
        Self::plain(Role::Human, content)
    }

    /// Assistant message without tool calls.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message requesting tool calls.
    #[must_use]
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Tool result answering `tool_call_id`.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// Returns `true` if the message requests at least one tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::human("h").role, Role::Human);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        let tool = Message::tool("call_1", "done");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn assistant_with_tool_calls_keeps_order() {
        let calls = vec![
            ToolCall::new("a", "web_search", Map::new()),
            ToolCall::new("b", "search_document_library", Map::new()),
        ];
        let msg = Message::assistant_with_tool_calls("", calls);
        assert!(msg.has_tool_calls());
        let ids: Vec<_> = msg.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn arg_str_reads_strings_only() {
        let mut args = Map::new();
        let _ = args.insert("query".into(), json!("q3 revenue"));
        let _ = args.insert("limit".into(), json!(5));
        let call = ToolCall::new("c", "web_search", args);
        assert_eq!(call.arg_str("query"), Some("q3 revenue"));
        assert_eq!(call.arg_str("limit"), None);
        assert_eq!(call.arg_str("missing"), None);
    }

    #[test]
    fn serde_omits_empty_tool_fields() {
        let value = serde_json::to_value(Message::human("hi")).unwrap();
        assert_eq!(value, json!({"role": "human", "content": "hi"}));
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::Tool.to_string(), "tool");
        assert_eq!(Role::Human.to_string(), "human");
    }
}
