//! Follow-up routing.
//!
//! One forced `dispatch_agent` function call picks the agent that should
//! handle a follow-up to existing content. No decision, an unknown agent
//! or a classifier error all fall back to compose with no new research.
//!
//! Merges copy the existing content and overwrite only what the chosen
//! agent owns: `info` and `compose` replace the copy and image
//! description, `multimodal` replaces the images.

use std::sync::Arc;

use copydesk_core::text::take_chars;
use copydesk_core::{AgentKind, ContentState, Message, Modality, RequestLog, TenantContext, ToolDefinition};
use copydesk_llm::{InvokeRequest, LlmError, ToolChoice};
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use crate::orchestrator::Orchestrator;
use crate::phase::compose::{self, ComposeInput};
use crate::phase::info as info_phase;
use crate::phase::multimodal::{self, MediaInput};

/// Name of the routing function.
pub const DISPATCH_FUNCTION: &str = "dispatch_agent";

/// Research summary used when a follow-up gathers nothing new.
pub const NO_ADDITIONAL_INFO: &str = "No additional information gathered";

const NO_PREVIOUS_DESCRIPTION: &str = "No previous description";

/// The classifier's choice.
#[derive(Clone, Debug, PartialEq)]
pub struct RouterDecision {
    /// Agent to run.
    pub agent: AgentKind,
    /// Extra arguments for the agent.
    pub args: Map<String, Value>,
    /// Why the classifier chose it.
    pub reasoning: String,
}

impl RouterDecision {
    fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Why routing fell back to compose.
#[derive(Debug)]
pub enum RouteFallback {
    /// The classifier did not call `dispatch_agent`.
    NoDecision,
    /// The classifier named an agent that does not exist.
    UnknownAgent(String),
    /// The classifier call failed.
    ClassifierFailed(LlmError),
}

impl std::fmt::Display for RouteFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDecision => f.write_str("Router did not select an agent"),
            Self::UnknownAgent(name) => write!(f, "Unknown agent: {name}"),
            Self::ClassifierFailed(e) => write!(f, "Router error: {e}"),
        }
    }
}

/// Function definition the classifier must call.
pub fn dispatch_definition() -> ToolDefinition {
    let agents: Vec<&str> = AgentKind::ALL.iter().map(|a| a.as_str()).collect();
    ToolDefinition::new(
        DISPATCH_FUNCTION,
        "Select which specialized agent should handle the user's follow-up request to modify existing content.",
        json!({
            "type": "object",
            "properties": {
                "agent": {
                    "type": "string",
                    "enum": agents,
                    "description": "The agent to dispatch the request to"
                },
                "args": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "For info: a refined research query."
                        },
                        "gathered_info": {
                            "type": "string",
                            "description": "For compose: information to use in the rewrite."
                        }
                    },
                    "additionalProperties": false,
                    "description": "Arguments to pass to the selected agent"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Brief explanation of why this agent was chosen"
                }
            },
            "required": ["agent", "args", "reasoning"],
            "additionalProperties": false
        }),
    )
}

fn system_prompt(existing: &ContentState, modality: Modality, tenant: &TenantContext) -> String {
    let agents = AgentKind::ALL
        .iter()
        .map(|a| format!("- {}: {}", a.as_str(), a.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let post = if existing.post_content.is_empty() {
        "Not generated"
    } else {
        take_chars(&existing.post_content, 200)
    };
    let company = if tenant.has_company_context() {
        tenant.company_context.trim()
    } else {
        "Not available"
    };
    format!(
        "You are the routing brain of a marketing-content workflow handling follow-up requests.

Available agents:
{agents}

Current content state:
- Post content: {post}...
- Generated images: {} images
- Modality: {modality}

Company context: {company}

Analyze the follow-up request and determine which agent should handle it.

Examples:
- \"Make the post more engaging\" -> compose (rewrite the post)
- \"Add more statistics\" -> info (gather more information)
- \"Change the image to be more professional\" -> multimodal (regenerate image)
- \"Rewrite with a different tone\" -> compose (rewrite the post)
- \"Add more context about the industry\" -> info (gather more information)

Return ONLY the function call to {DISPATCH_FUNCTION}. Do not explain your reasoning beyond the reasoning field.",
        existing.generated_images.len()
    )
}

/// Read a decision out of the classifier's reply.
pub fn parse_decision(reply: &Message) -> Result<RouterDecision, RouteFallback> {
    let call = reply
        .tool_calls
        .iter()
        .find(|c| c.name == DISPATCH_FUNCTION)
        .ok_or(RouteFallback::NoDecision)?;
    let name = call.arg_str("agent").unwrap_or_default();
    let agent = AgentKind::from_name(name).ok_or_else(|| RouteFallback::UnknownAgent(name.to_string()))?;
    Ok(RouterDecision {
        agent,
        args: call
            .arguments
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        reasoning: call
            .arg_str("reasoning")
            .unwrap_or("No reasoning provided")
            .to_string(),
    })
}

/// Routes follow-ups to the agent that owns the change.
pub struct FollowupRouter {
    orchestrator: Arc<Orchestrator>,
}

impl FollowupRouter {
    /// Create a router that runs phases through `orchestrator`.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Apply `query` to `existing`.
    ///
    /// Never fails: a failed phase leaves the content untouched except for
    /// [`ContentState::error`].
    #[instrument(skip_all, fields(tenant_id = %tenant_id, modality = %modality))]
    pub async fn route(
        &self,
        query: &str,
        existing: &ContentState,
        modality: Modality,
        tenant_id: &str,
        log: &RequestLog,
    ) -> ContentState {
        log.log(format!("Routing follow-up query: {}...", take_chars(query, 100))).await;
        let tenant = self.orchestrator.tenant_context(tenant_id).await;

        let existing = ContentState {
            modality,
            ..existing.clone()
        };
        match self.classify(query, &existing, modality, &tenant).await {
            Ok(decision) => {
                info!(agent = %decision.agent, reasoning = %decision.reasoning, "follow-up routed");
                log.log(format!(
                    "Router selected agent '{}': {}",
                    decision.agent, decision.reasoning
                ))
                .await;
                match decision.agent {
                    AgentKind::Info => {
                        let research = decision.arg("query").unwrap_or(query);
                        self.info_followup(query, research, &existing, &tenant, log).await
                    }
                    AgentKind::Compose => {
                        let gathered = decision.arg("gathered_info").unwrap_or(NO_ADDITIONAL_INFO);
                        self.compose_followup(query, gathered, &existing, &tenant, log).await
                    }
                    AgentKind::Multimodal => self.multimodal_followup(query, &existing, &tenant, log).await,
                }
            }
            Err(fallback) => {
                warn!(reason = %fallback, "follow-up routing fell back to compose");
                log.log(format!("{fallback}, defaulting to compose")).await;
                self.compose_followup(query, NO_ADDITIONAL_INFO, &existing, &tenant, log)
                    .await
            }
        }
    }

    /// Ask the model which agent should handle `query`.
    pub async fn classify(
        &self,
        query: &str,
        existing: &ContentState,
        modality: Modality,
        tenant: &TenantContext,
    ) -> Result<RouterDecision, RouteFallback> {
        let request = InvokeRequest::new(vec![
            Message::system(system_prompt(existing, modality, tenant)),
            Message::human(format!("Follow-up request: {query}")),
        ])
        .with_tools(vec![dispatch_definition()])
        .with_tool_choice(ToolChoice::Function(DISPATCH_FUNCTION.to_string()));

        let reply = self
            .orchestrator
            .runner()
            .invoke(&request)
            .await
            .map_err(RouteFallback::ClassifierFailed)?;
        parse_decision(&reply)
    }

    async fn info_followup(
        &self,
        query: &str,
        research_query: &str,
        existing: &ContentState,
        tenant: &TenantContext,
        log: &RequestLog,
    ) -> ContentState {
        log.log("Gathering additional information for follow-up...").await;
        let outcome = self.orchestrator.gather(research_query, tenant, log).await;
        let gathered = info_phase::summary(&outcome);
        self.compose_followup(query, &gathered, existing, tenant, log).await
    }

    async fn compose_followup(
        &self,
        query: &str,
        gathered_info: &str,
        existing: &ContentState,
        tenant: &TenantContext,
        log: &RequestLog,
    ) -> ContentState {
        log.log("Modifying post content based on follow-up...").await;
        let prompt = format!(
            "Original request resulted in: {}. Now modify it based on this follow-up: {query}",
            existing.post_content
        );
        let input = ComposeInput {
            prompt: &prompt,
            gathered_info,
            modality: existing.modality,
        };
        let outcome = compose::run(
            self.orchestrator.runner(),
            &self.orchestrator.plan().compose,
            &input,
            tenant,
            log,
        )
        .await;
        match compose::into_result(outcome) {
            Ok(result) => existing.with_copy(result.post_content, result.image_description),
            Err(error) => {
                warn!(error = %error.message, "compose follow-up failed");
                log.log(&error.message).await;
                existing.with_error(error)
            }
        }
    }

    async fn multimodal_followup(
        &self,
        query: &str,
        existing: &ContentState,
        tenant: &TenantContext,
        log: &RequestLog,
    ) -> ContentState {
        log.log("Modifying visual content based on follow-up...").await;
        let previous = if existing.image_description.trim().is_empty() {
            NO_PREVIOUS_DESCRIPTION
        } else {
            existing.image_description.as_str()
        };
        let description = format!("Based on this follow-up request: {query}. Previous image description: {previous}");
        let input = MediaInput {
            post_content: &existing.post_content,
            image_description: &description,
            modality: existing.modality,
        };
        let images = multimodal::run(
            self.orchestrator.runner(),
            &self.orchestrator.plan().multimodal,
            &input,
            tenant,
            log,
        )
        .await;
        existing.with_images(images)
    }
}
