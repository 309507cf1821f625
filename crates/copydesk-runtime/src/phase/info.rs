//! Info phase: research the topic with document and web search.

use copydesk_core::{AgentKind, RequestLog, TenantContext};

use super::plan::PhaseProfile;
use super::runner::{PhaseOutcome, PhaseRunner, PhaseSpec};

const SYSTEM_PROMPT: &str = "You are a research assistant. Your task is to gather comprehensive \
information relevant to the user's request for creating a social media post.

Use the available tools to:
1. Search the document library for relevant company and internal information
2. Perform web searches for broader context, recent trends and industry insights

Be thorough. Call several tools with different queries to cover the topic from more than one angle. \
Your goal is to collect relevant context, not to write the post yet.

When you are done, give a detailed summary of everything relevant you found, INCLUDING KEY FACTS AND \
NUMBERS, in a loose, unstructured format.";

/// Build the info phase for `prompt`.
pub fn spec(profile: &PhaseProfile, prompt: &str, tenant: &TenantContext) -> PhaseSpec {
    PhaseSpec {
        phase: AgentKind::Info,
        system_prompt: format!("{SYSTEM_PROMPT}\n\n{}", tenant.prompt_section()).trim_end().to_string(),
        initial_message: format!("Gather comprehensive information for creating a post about: {prompt}"),
        tools: profile.tools.clone(),
        max_rounds: profile.max_rounds,
    }
}

/// Research `prompt`.
pub async fn run(
    runner: &PhaseRunner,
    profile: &PhaseProfile,
    prompt: &str,
    tenant: &TenantContext,
    log: &RequestLog,
) -> PhaseOutcome {
    log.log("\n=== PHASE 1: INFORMATION GATHERING ===").await;
    let outcome = runner.run_phase(&spec(profile, prompt, tenant), tenant, log).await;
    log.log(format!(
        "Information gathering complete. Gathered info preview: {}",
        copydesk_core::text::preview(&outcome.text, 200)
    ))
    .await;
    outcome
}

/// The text handed to the compose phase.
///
/// A phase that produced nothing usable degrades to an explicit
/// "no information" line so compose still runs.
pub fn summary(outcome: &PhaseOutcome) -> String {
    if outcome.is_unavailable() || outcome.text.trim().is_empty() {
        let reason = outcome
            .degradation
            .as_ref()
            .and_then(|d| d.error())
            .map_or_else(|| "the research step returned nothing".to_string(), ToString::to_string);
        format!("No information available ({reason}). Proceed with general knowledge.")
    } else {
        outcome.text.clone()
    }
}
