//! Compose phase: write the post, ending in a typed [`ComposeResult`].

use copydesk_core::{AgentKind, ContentError, ContentErrorKind, Modality, RequestLog, TenantContext};
use copydesk_llm::{OutputSchema, StructuredOutput};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::plan::PhaseProfile;
use super::runner::{PhaseRunner, PhaseSpec, StructuredPhaseOutcome};

/// Final answer of the compose phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeResult {
    /// Post copy, ready to publish.
    pub post_content: String,
    /// Visual that should accompany the post; empty if none.
    pub image_description: String,
}

impl StructuredOutput for ComposeResult {
    fn output_schema() -> OutputSchema {
        OutputSchema::new(
            "compose_result",
            json!({
                "type": "object",
                "properties": {
                    "post_content": {
                        "type": "string",
                        "description": "The complete post, with no preamble or commentary."
                    },
                    "image_description": {
                        "type": "string",
                        "description": "A short description of an image or diagram that would enhance the post. Empty if none."
                    }
                },
                "required": ["post_content", "image_description"],
                "additionalProperties": false
            }),
        )
    }
}

/// What compose writes from.
#[derive(Clone, Debug)]
pub struct ComposeInput<'a> {
    /// The request, or the rewrite instruction for a follow-up.
    pub prompt: &'a str,
    /// Research summary.
    pub gathered_info: &'a str,
    /// Target platform.
    pub modality: Modality,
}

fn system_prompt(modality: Modality, tenant: &TenantContext) -> String {
    let base = format!(
        "You are a social media marketing expert. Your task is to create a single viral {modality} post \
using the provided information and examples of successful posts.

1. Use the search_linkedin_posts tool to find examples of successful posts related to the topic.
2. Write a compelling post that:
    - Uses the gathered information as context and facts. Describes entities if their name is not known. \
Does not include direct quotes unless they appear in the gathered information.
    - Follows the structure and style of the successful examples, including their use of emojis and hashtags. \
Avoid asterisks.
    - Is engaging, authentic and likely to perform well on {modality}.
3. Describe one image or diagram that would enhance the post. There should be no text in the image.

The post content must be ONLY the post. No preamble, explanations, apologies or conversational filler."
    );
    let section = tenant.prompt_section();
    if section.is_empty() {
        base
    } else {
        format!("{base}\n\n{section}").trim_end().to_string()
    }
}

/// Build the compose phase.
pub fn spec(profile: &PhaseProfile, input: &ComposeInput<'_>, tenant: &TenantContext) -> PhaseSpec {
    PhaseSpec {
        phase: AgentKind::Compose,
        system_prompt: system_prompt(input.modality, tenant),
        initial_message: format!(
            "Original request: {}\n\nGathered information: {}\n\nCreate a viral {} post using this information \
             and examples from successful posts.",
            input.prompt, input.gathered_info, input.modality
        ),
        tools: profile.tools.clone(),
        max_rounds: profile.max_rounds,
    }
}

/// Write the post.
pub async fn run(
    runner: &PhaseRunner,
    profile: &PhaseProfile,
    input: &ComposeInput<'_>,
    tenant: &TenantContext,
    log: &RequestLog,
) -> StructuredPhaseOutcome<ComposeResult> {
    log.log("\n=== PHASE 2: POST CREATION ===").await;
    let outcome = runner
        .run_structured_phase::<ComposeResult>(&spec(profile, input, tenant), tenant, log)
        .await;
    if outcome.value.is_some() {
        log.log("Post creation complete.").await;
    }
    outcome
}

/// The composed copy, or the error to record on the content.
pub fn into_result(outcome: StructuredPhaseOutcome<ComposeResult>) -> Result<ComposeResult, ContentError> {
    if let Some(result) = outcome.value {
        return Ok(result);
    }
    let reason = outcome
        .degradation
        .as_ref()
        .and_then(|d| d.error())
        .map_or_else(|| "no post was produced".to_string(), ToString::to_string);
    Err(ContentError::new(
        ContentErrorKind::Inference,
        format!("Post creation encountered an error: {reason}"),
    ))
}
