//! Chat-completions wire types and conversion from engine messages.
//!
//! - System/human/assistant messages map to `system`/`user`/`assistant`
//! - Assistant tool calls become `tool_calls` with JSON-string arguments
//! - Tool messages become `tool` entries keyed by `tool_call_id`

use copydesk_core::{Message, Role, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::client::{OutputSchema, ToolChoice};
use crate::errors::{LlmError, LlmResult};

// ── Request ────────────────────────────────────────────────────────────────

/// Request body for `POST /chat/completions`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation.
    pub messages: Vec<ChatMessage>,
    /// Bound functions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
    /// Tool policy, present only when tools are bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    /// Structured output constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One message on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user`, `assistant` or `tool`.
    pub role: String,
    /// Text content. `null` for assistant turns that only call tools.
    #[serde(default)]
    pub content: Option<String>,
    /// Function calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChatToolCall>,
    /// Call answered by a tool message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A function call on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCall {
    /// Call id.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// Function name and arguments.
    pub function: ChatFunctionCall,
}

/// Function name plus JSON-encoded arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatFunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

/// A bound function.
#[derive(Clone, Debug, Serialize)]
pub struct ChatTool {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    /// Definition.
    pub function: ToolDefinition,
}

fn function_type() -> String {
    "function".into()
}

// ── Response ───────────────────────────────────────────────────────────────

/// Response body.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    /// Candidate replies. Only the first is read.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One candidate reply.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    /// The reply.
    pub message: ChatMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

/// Convert engine messages to wire messages.
#[must_use]
pub fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| {
            let content = if m.role == Role::Assistant && m.content.is_empty() && m.has_tool_calls() {
                None
            } else {
                Some(m.content.clone())
            };
            ChatMessage {
                role: wire_role(m.role).to_string(),
                content,
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|c| ChatToolCall {
                        id: c.id.clone(),
                        call_type: function_type(),
                        function: ChatFunctionCall {
                            name: c.name.clone(),
                            arguments: Value::Object(c.arguments.clone()).to_string(),
                        },
                    })
                    .collect(),
                tool_call_id: m.tool_call_id.clone(),
            }
        })
        .collect()
}

/// Wrap definitions as bound functions.
#[must_use]
pub fn to_chat_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|t| ChatTool {
            tool_type: "function",
            function: t.clone(),
        })
        .collect()
}

/// Wire form of a tool policy.
#[must_use]
pub fn to_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Function(name) => json!({"type": "function", "function": {"name": name}}),
    }
}

/// `response_format` for a strict JSON-schema reply.
#[must_use]
pub fn to_response_format(schema: &OutputSchema) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "schema": schema.schema,
            "strict": true,
        }
    })
}

/// Parse a function-call argument string.
///
/// Empty input is an empty object. Malformed JSON or a non-object is
/// logged and treated as empty, so the tool sees missing arguments and
/// reports them instead of the whole turn failing.
#[must_use]
pub fn parse_arguments(tool_name: &str, raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(tool_name, kind = %json_kind(&other), "tool arguments are not an object");
            Map::new()
        }
        Err(e) => {
            warn!(tool_name, error = %e, "malformed tool arguments");
            Map::new()
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read the first choice as an assistant message.
pub fn into_assistant_message(response: ChatResponse) -> LlmResult<Message> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;
    let calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|c| {
            let arguments = parse_arguments(&c.function.name, &c.function.arguments);
            ToolCall::new(c.id, c.function.name, arguments)
        })
        .collect();
    Ok(Message::assistant_with_tool_calls(
        choice.message.content.unwrap_or_default(),
        calls,
    ))
}

/// Read the first choice as a JSON object.
pub fn into_structured_value(response: ChatResponse) -> LlmResult<Value> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;
    let content = choice.message.content.unwrap_or_default();
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| LlmError::parse(format!("structured reply is not JSON: {e}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(LlmError::parse("structured reply is not a JSON object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn roles_map_to_wire_names() {
        let wire = to_chat_messages(&[
            Message::system("s"),
            Message::human("h"),
            Message::assistant("a"),
            Message::tool("call_1", "t"),
        ]);
        let roles: Vec<_> = wire.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "tool"]);
        assert_eq!(wire[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_only_assistant_has_null_content() {
        let mut args = Map::new();
        let _ = args.insert("query".into(), json!("ai"));
        let msg = Message::assistant_with_tool_calls("", vec![ToolCall::new("c1", "web_search", args)]);
        let wire = to_chat_messages(&[msg]);
        assert_eq!(wire[0].content, None);
        assert_eq!(wire[0].tool_calls[0].function.arguments, r#"{"query":"ai"}"#);

        let value = serde_json::to_value(&wire[0]).unwrap();
        assert_eq!(value["content"], Value::Null);
        assert_eq!(value["tool_calls"][0]["type"], "function");
    }

    #[test]
    fn tool_choice_forms() {
        assert_eq!(to_tool_choice(&ToolChoice::Auto), json!("auto"));
        assert_eq!(
            to_tool_choice(&ToolChoice::Function("dispatch_agent".into())),
            json!({"type": "function", "function": {"name": "dispatch_agent"}})
        );
    }

    #[test]
    fn parse_arguments_tolerates_garbage() {
        assert!(parse_arguments("web_search", "").is_empty());
        assert!(parse_arguments("web_search", "{not json").is_empty());
        assert!(parse_arguments("web_search", "[1,2]").is_empty());
        assert_eq!(
            parse_arguments("web_search", r#"{"query":"x"}"#).get("query"),
            Some(&json!("x"))
        );
    }

    #[test]
    fn empty_choices_is_error() {
        let resp = ChatResponse { choices: vec![] };
        assert_matches!(into_assistant_message(resp), Err(LlmError::EmptyResponse));
    }

    #[test]
    fn structured_rejects_non_object() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "[1]"}}]
        }))
        .unwrap();
        assert_matches!(into_structured_value(resp), Err(LlmError::Parse { .. }));
    }
}
