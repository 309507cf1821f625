//! [`LlmClient`] over an OpenAI-compatible chat-completions endpoint.
//!
//! Freeform turns bind tools through `tools`/`tool_choice`. Structured
//! turns bind no tools and set `response_format` to a strict JSON schema.

use std::time::Duration;

use async_trait::async_trait;
use copydesk_core::Message;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::{InvokeRequest, LlmClient, OutputSchema};
use crate::errors::{LlmError, LlmResult};
use crate::openai::wire::{
    ChatRequest, ChatResponse, into_assistant_message, into_structured_value, to_chat_messages,
    to_chat_tools, to_response_format, to_tool_choice,
};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token. Omitted from requests when `None`.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Transport timeout per request.
    pub request_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            temperature: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Chat-completions client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client.
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn headers(&self) -> LlmResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| LlmError::Other {
                message: format!("invalid API key header: {e}"),
            })?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn base_request(&self, messages: &[Message]) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: to_chat_messages(messages),
            tools: Vec::new(),
            tool_choice: None,
            response_format: None,
            temperature: self.config.temperature,
        }
    }

    async fn send(&self, request: &ChatRequest) -> LlmResult<ChatResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let (message, code, retryable) = parse_api_error(&body_text, status.as_u16());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
                code,
                retryable,
            });
        }

        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn map_transport(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                timeout_ms: u64::try_from(self.config.request_timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            LlmError::Http(e)
        }
    }
}

/// Parse an API error response body into `(message, code, retryable)`.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>, bool) {
    let retryable = status == 429 || status >= 500;
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        let code = error["code"]
            .as_str()
            .or_else(|| error["type"].as_str())
            .map(String::from);
        (message, code, retryable)
    } else {
        (format!("HTTP {status}: {body}"), None, retryable)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model, tool_count = request.tools.len()))]
    async fn invoke(&self, request: &InvokeRequest) -> LlmResult<Message> {
        let mut body = self.base_request(&request.messages);
        if !request.tools.is_empty() {
            body.tools = to_chat_tools(&request.tools);
            body.tool_choice = Some(to_tool_choice(&request.tool_choice));
        }
        debug!(message_count = body.messages.len(), "sending chat completion");

        let reply = into_assistant_message(self.send(&body).await?)?;
        debug!(tool_calls = reply.tool_calls.len(), "chat completion received");
        Ok(reply)
    }

    #[instrument(skip_all, fields(model = %self.config.model, schema = %schema.name))]
    async fn invoke_structured(&self, messages: &[Message], schema: &OutputSchema) -> LlmResult<Value> {
        let mut body = self.base_request(messages);
        body.response_format = Some(to_response_format(schema));
        debug!(message_count = body.messages.len(), "sending structured completion");

        into_structured_value(self.send(&body).await?)
    }
}
