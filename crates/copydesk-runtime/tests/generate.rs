#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{CannedProvider, PNG_BASE64, PNG_BYTES, captured_log, document_body, drain, image_body, orchestrator};
use copydesk_core::{ArtifactKind, Modality, RequestLog};
use copydesk_llm::LlmError;
use copydesk_llm::testutil::{CallKind, ScriptedLlm};
use copydesk_runtime::GenerateRequest;
use copydesk_tools::{ToolKind, ToolProvider};
use serde_json::json;

fn composed() -> serde_json::Value {
    json!({
        "post_content": "Q3 was our best quarter yet.",
        "image_description": "Upward revenue chart"
    })
}

#[tokio::test]
async fn research_reaches_model_in_full_but_log_is_truncated() {
    let filler = "Background on regional expansion and hiring. ".repeat(6);
    let content = format!("{filler}Revenue grew 22% quarter over quarter.");
    let docs = CannedProvider::new(ToolKind::DocumentSearch, document_body(&content));

    let llm = Arc::new(
        ScriptedLlm::new()
            .tool_calls(&[("search_document_library", json!({"query": "Q3 revenue"}))])
            .text("Revenue grew 22% in Q3.")
            .text("draft")
            .structured(composed()),
    );
    let orch = orchestrator(
        llm.clone(),
        &[(ToolKind::DocumentSearch, docs.clone() as Arc<dyn ToolProvider>)],
    );
    let (log, mut rx) = captured_log();

    let state = orch
        .generate(&GenerateRequest::new("Q3 results", "acme").with_image(false), &log)
        .await
        .unwrap();
    assert_eq!(state.post_content, "Q3 was our best quarter yet.");
    assert_eq!(docs.calls(), 1);

    let second_turn = &llm.calls()[1];
    assert!(second_turn.transcript().contains("22%"));

    let lines = drain(&mut rx);
    let results = lines
        .iter()
        .find(|l| l.starts_with("Tool 'search_document_library' results:"))
        .expect("tool results logged");
    assert!(!results.contains("22%"));
    let content_line = results
        .lines()
        .find(|l| l.trim_start().starts_with("Content:"))
        .unwrap();
    assert!(content_line.trim_start().trim_start_matches("Content: ").chars().count() <= 150);
    assert!(lines.iter().any(|l| l.contains("LLM decided to use 1 tool(s)")));
}

#[tokio::test]
async fn artifact_bytes_reach_caller_but_never_the_model() {
    let images = CannedProvider::new(ToolKind::ImageGenerate, image_body());
    let llm = Arc::new(
        ScriptedLlm::new()
            .text("facts")
            .text("draft")
            .structured(composed())
            .tool_calls(&[(
                "generate_image",
                json!({"prompt": "upward chart", "style": "professional", "aspect_ratio": "16:9"}),
            )])
            .text("Image ready."),
    );
    let orch = orchestrator(
        llm.clone(),
        &[(ToolKind::ImageGenerate, images.clone() as Arc<dyn ToolProvider>)],
    );

    let state = orch
        .generate(&GenerateRequest::new("Q3 results", "acme"), &RequestLog::disabled())
        .await
        .unwrap();

    assert_eq!(state.generated_images.len(), 1);
    let image = &state.generated_images[0];
    assert_eq!(image.payload, PNG_BYTES);
    assert_eq!(image.kind, ArtifactKind::Image);
    assert_eq!(image.filename, "fintech_hero.png");

    let sent = llm.everything_sent();
    assert!(!sent.contains(PNG_BASE64));
    assert!(sent.contains("Image generated successfully. Filename: fintech_hero.png"));

    let wire = serde_json::to_value(&state).unwrap();
    assert_eq!(wire["generated_images"][0]["base64_data"], PNG_BASE64);
}

#[tokio::test]
async fn tool_outside_phase_is_refused_with_notice() {
    let news = CannedProvider::new(ToolKind::NewsSearch, json!({"articles": []}));
    let llm = Arc::new(
        ScriptedLlm::new()
            .tool_calls(&[(
                "search_recent_news",
                json!({"query": "fintech", "sort_by": "relevancy"}),
            )])
            .text("Nothing new.")
            .text("draft")
            .structured(composed()),
    );
    let orch = orchestrator(
        llm.clone(),
        &[(ToolKind::NewsSearch, news.clone() as Arc<dyn ToolProvider>)],
    );

    let _ = orch
        .generate(&GenerateRequest::new("fintech", "acme").with_image(false), &RequestLog::disabled())
        .await
        .unwrap();

    assert_eq!(news.calls(), 0);
    assert!(
        llm.calls()[1]
            .transcript()
            .contains("Error: Tool 'search_recent_news' is not available. Continue without it.")
    );
}

#[tokio::test]
async fn research_outage_degrades_to_general_knowledge() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .fail_with(|| LlmError::Timeout { timeout_ms: 60_000 })
            .text("draft")
            .structured(composed()),
    );
    let orch = orchestrator(llm.clone(), &[]);

    let state = orch
        .generate(
            &GenerateRequest::new("fintech", "acme")
                .with_modality(Modality::Twitter)
                .with_image(false),
            &RequestLog::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(state.modality, Modality::Twitter);
    assert!(state.error.is_none());
    assert!(llm.calls()[1].transcript().contains("No information available"));
    assert_eq!(llm.count(CallKind::Structured), 1);
}

#[tokio::test]
async fn compose_failure_returns_state_with_error() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .text("facts")
            .text("draft")
            .structured_fail_with(|| LlmError::Parse {
                message: "not json".into(),
            }),
    );
    let orch = orchestrator(llm, &[]);

    let state = orch
        .generate(&GenerateRequest::new("fintech", "acme"), &RequestLog::disabled())
        .await
        .unwrap();

    assert!(state.post_content.is_empty());
    assert!(state.generated_images.is_empty());
    let error = state.error.unwrap();
    assert!(error.message.starts_with("Post creation encountered an error"));
}
