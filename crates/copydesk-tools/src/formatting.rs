//! Two renderings of every tool result.
//!
//! The LOG rendering is for humans scanning progress: counts, scores and
//! content previews cut to [`LOG_SEGMENT_CHARS`] or [`LOG_SNIPPET_CHARS`].
//! The LLM rendering is what the model reads: full content, no binary
//! payloads, no echo or counter fields.

use copydesk_core::text::preview;
use copydesk_core::{Artifact, ArtifactKind};
use serde_json::{Map, Value};

use crate::output::{DocumentResults, ImageResult, NewsArticle, PostExample, ToolOutput, WebResult};

/// Preview length for document segments in the log rendering.
pub const LOG_SEGMENT_CHARS: usize = 150;
/// Preview length for posts, web and news results in the log rendering.
pub const LOG_SNIPPET_CHARS: usize = 100;
/// Preview length for unrecognized output in the log rendering.
pub const LOG_GENERIC_CHARS: usize = 500;

/// Fields the generic renderer never shows the model.
const NOISY_FIELDS: [&str; 7] = [
    "success",
    "query",
    "total_segments",
    "total_posts",
    "total_results",
    "base64_data",
    "url_error",
];

/// LLM-facing content for a failed tool call.
pub fn degradation_notice(tool_name: &str) -> String {
    format!("The '{tool_name}' tool failed. Please proceed with available information.")
}

/// LLM-facing content for a name outside the catalogue.
pub fn unknown_tool_notice(tool_name: &str) -> String {
    format!("Error: Unknown tool '{tool_name}'")
}

/// LLM-facing content for a known tool that cannot run here.
pub fn unavailable_tool_notice(tool_name: &str) -> String {
    format!("Error: Tool '{tool_name}' is not available. Continue without it.")
}

// ── LOG rendering ───────────────────────────────────────────────────────────

/// Scan-friendly rendering with truncated content.
pub fn render_log(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Documents(docs) => log_documents(docs),
        ToolOutput::PostExamples(posts) => log_posts(posts),
        ToolOutput::WebResults(results) => log_web(results),
        ToolOutput::News(articles) => log_news(articles),
        ToolOutput::ImageResults(images) => log_images(images),
        ToolOutput::Artifact(artifact) => log_artifact(artifact),
        ToolOutput::Artifacts { artifacts, rest } => {
            let mut lines: Vec<String> = artifacts.iter().map(log_artifact).collect();
            let rest = render_value(rest);
            if !rest.trim().is_empty() {
                lines.push(preview(&rest, LOG_GENERIC_CHARS));
            }
            lines.join("\n")
        }
        ToolOutput::Failure(error) => format!("Error: {error}"),
        ToolOutput::Text(text) => preview(text, LOG_GENERIC_CHARS),
        ToolOutput::Other(value) => preview(&render_value(value), LOG_GENERIC_CHARS),
    }
}

fn log_documents(docs: &DocumentResults) -> String {
    let mut lines = vec![
        format!("Found {} document segments", docs.segments.len()),
        format!("Source files: {}", docs.source_files.join(", ")),
    ];
    for seg in &docs.segments {
        lines.push(format!("\nSegment {}:", seg.segment_number));
        lines.push(format!("  File: {}", seg.filename));
        lines.push(format!("  Similarity: {:.3}", seg.similarity_score));
        lines.push(format!(
            "  Document URL: {}",
            seg.document_url.as_deref().unwrap_or("Not available")
        ));
        lines.push(format!("  Content: {}", preview(&seg.content, LOG_SEGMENT_CHARS)));
    }
    lines.join("\n")
}

fn log_posts(posts: &[PostExample]) -> String {
    let mut lines = vec![format!("Found {} viral post examples", posts.len())];
    for post in posts {
        lines.push(format!("\nExample {}:", post.example_number));
        lines.push(format!("  Similarity: {:.3}", post.similarity_score));
        lines.push(format!("  Content: {}", preview(&post.content, LOG_SNIPPET_CHARS)));
    }
    lines.join("\n")
}

fn log_web(results: &[WebResult]) -> String {
    let mut lines = vec![format!("Found {} web results", results.len())];
    for r in results {
        lines.push(format!("\nResult {}:", r.result_number));
        lines.push(format!("  Title: {}", r.title));
        lines.push(format!("  URL: {}", r.url));
        lines.push(format!("  Content: {}", preview(&r.content, LOG_SNIPPET_CHARS)));
    }
    lines.join("\n")
}

fn log_news(articles: &[NewsArticle]) -> String {
    let mut lines = vec![format!("Found {} news articles", articles.len())];
    for (i, a) in articles.iter().enumerate() {
        lines.push(format!("\nArticle {}: {}", i + 1, a.title));
        if let Some(content) = a.content.as_deref().or(a.description.as_deref()) {
            lines.push(format!("  Content: {}", preview(content, LOG_SNIPPET_CHARS)));
        }
    }
    lines.join("\n")
}

fn log_images(images: &[ImageResult]) -> String {
    let mut lines = vec![format!("Found {} images", images.len())];
    for img in images {
        lines.push(format!("  {}. {} ({})", img.result_number, img.title, img.url));
    }
    lines.join("\n")
}

fn log_artifact(artifact: &Artifact) -> String {
    match artifact.kind {
        ArtifactKind::Image => format!(
            "Image generated: {} ({}, {} style)",
            artifact.filename, artifact.size, artifact.style
        ),
        ArtifactKind::Diagram => format!(
            "Diagram created: {} ({}, {} diagram)",
            artifact.filename, artifact.size, artifact.style
        ),
    }
}

// ── LLM rendering ───────────────────────────────────────────────────────────

/// Model-facing rendering with full content and no binary payload.
pub fn render_llm(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Documents(docs) => llm_documents(docs),
        ToolOutput::PostExamples(posts) => llm_posts(posts),
        ToolOutput::WebResults(results) => llm_web(results),
        ToolOutput::News(articles) => llm_news(articles),
        ToolOutput::ImageResults(images) => llm_images(images),
        ToolOutput::Artifact(artifact) => llm_artifact(artifact),
        ToolOutput::Artifacts { artifacts, rest } => {
            let mut blocks: Vec<String> = artifacts.iter().map(llm_artifact).collect();
            let rest = render_value(rest);
            if !rest.trim().is_empty() {
                blocks.push(rest);
            }
            blocks.join("\n")
        }
        ToolOutput::Failure(error) => error.clone(),
        ToolOutput::Text(text) => text.clone(),
        ToolOutput::Other(value) => render_value(value),
    }
}

fn llm_documents(docs: &DocumentResults) -> String {
    let mut blocks = Vec::with_capacity(docs.segments.len() + 1);
    if !docs.source_files.is_empty() {
        blocks.push(format!("Source Files: {}", docs.source_files.join(", ")));
    }
    for seg in &docs.segments {
        blocks.push(format!(
            "Document Segment {}:\nFilename: {}\nSimilarity Score: {:.3}\nContent: {}\nDocument URL: {}",
            seg.segment_number,
            seg.filename,
            seg.similarity_score,
            seg.content,
            seg.document_url.as_deref().unwrap_or("Not available"),
        ));
    }
    blocks.join("\n---\n")
}

fn llm_posts(posts: &[PostExample]) -> String {
    posts
        .iter()
        .map(|p| {
            let mut lines = vec![
                format!("Viral Post Example {}:", p.example_number),
                format!("Content: {}", p.content),
                format!("Similarity Score: {:.3}", p.similarity_score),
            ];
            push_optional(&mut lines, "Target Audience", p.target_audience.as_deref());
            push_optional(&mut lines, "Media Description", p.media_description.as_deref());
            push_optional(&mut lines, "Content Url", p.content_url.as_deref());
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn llm_web(results: &[WebResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "Web Result {}:\nTitle: {}\nUrl: {}\nContent: {}",
                r.result_number, r.title, r.url, r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn llm_news(articles: &[NewsArticle]) -> String {
    if articles.is_empty() {
        return "No news articles found for your query.".to_string();
    }
    articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "Article {}:\n  Title: {}\n  Source: {}\n  Description: {}\n  Content: {}\n  URL: {}",
                i + 1,
                a.title,
                non_empty(a.source.as_deref()).unwrap_or("Unknown Source"),
                non_empty(a.description.as_deref()).unwrap_or("No description available."),
                non_empty(a.content.as_deref()).unwrap_or("No content available."),
                non_empty(a.url.as_deref()).unwrap_or("N/A"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn llm_images(images: &[ImageResult]) -> String {
    images
        .iter()
        .map(|img| format!("Image Result {}:\nTitle: {}\nUrl: {}", img.result_number, img.title, img.url))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn llm_artifact(artifact: &Artifact) -> String {
    match artifact.kind {
        ArtifactKind::Image => format!(
            "Image generated successfully. Filename: {}, Size: {}, Style: {}. The image has been prepared for display.",
            artifact.filename, artifact.size, artifact.style
        ),
        ArtifactKind::Diagram => format!(
            "Diagram created successfully. Filename: {}, Size: {}, Type: {}. The diagram has been prepared for display.",
            artifact.filename, artifact.size, artifact.style
        ),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn push_optional(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(v) = non_empty(value) {
        lines.push(format!("{label}: {v}"));
    }
}

// ── Generic renderer ────────────────────────────────────────────────────────

/// Key/value rendering for outputs without a dedicated renderer.
///
/// Drops noisy fields, title-cases keys, separates list entries with
/// `---`, and indents nested objects two spaces per level.
pub fn render_generic(map: &Map<String, Value>) -> String {
    let mut lines = Vec::new();
    render_object(map, 0, &mut lines);
    lines.join("\n")
}

/// [`render_generic`] for any JSON value. Containers are never printed raw.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Object(map) => render_generic(map),
        Value::Array(items) => {
            let mut lines = Vec::new();
            render_array(None, items, 0, &mut lines);
            lines.join("\n")
        }
        other => scalar(other),
    }
}

fn render_object(map: &Map<String, Value>, indent: usize, lines: &mut Vec<String>) {
    let prefix = "  ".repeat(indent);
    for (key, value) in map {
        if NOISY_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Array(items) => render_array(Some(key), items, indent, lines),
            Value::Object(inner) => {
                lines.push(format!("{prefix}{}:", title_case(key)));
                render_object(inner, indent + 1, lines);
            }
            other => lines.push(render_scalar_field(&prefix, key, other)),
        }
    }
}

fn render_array(key: Option<&str>, items: &[Value], indent: usize, lines: &mut Vec<String>) {
    let prefix = "  ".repeat(indent);
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(inner) => {
                if i > 0 {
                    lines.push("---".to_string());
                }
                render_object(inner, indent, lines);
            }
            Value::Array(nested) => render_array(key, nested, indent, lines),
            other => match key {
                Some(key) => lines.push(format!("{prefix}{}: {}", title_case(key), scalar(other))),
                None => lines.push(format!("{prefix}{}", scalar(other))),
            },
        }
    }
}

fn render_scalar_field(prefix: &str, key: &str, value: &Value) -> String {
    match key {
        "segment_number" => format!("\nDocument Segment {}:", scalar(value)),
        "example_number" => format!("\nViral Post Example {}:", scalar(value)),
        "result_number" => format!("\nWeb Result {}:", scalar(value)),
        "similarity_score" => match value.as_f64() {
            Some(score) => format!("{prefix}Similarity Score: {score:.3}"),
            None => format!("{prefix}Similarity Score: {}", scalar(value)),
        },
        "document_url" if is_blank(value) => format!("{prefix}Document URL: Not available"),
        _ => format!("{prefix}{}: {}", title_case(key), scalar(value)),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// `"target_audience"` → `"Target Audience"`.
pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::DocumentSegment;
    use proptest::prelude::*;
    use serde_json::json;

    fn revenue_docs(content: &str) -> ToolOutput {
        ToolOutput::Documents(DocumentResults {
            source_files: vec!["annual_report.pdf".into()],
            segments: vec![DocumentSegment {
                segment_number: 1,
                filename: "annual_report.pdf".into(),
                similarity_score: 0.912_345,
                content: content.into(),
                document_url: None,
            }],
        })
    }

    fn content_line(log: &str) -> &str {
        log.lines()
            .find_map(|l| l.strip_prefix("  Content: "))
            .unwrap_or_default()
    }

    #[test]
    fn document_llm_keeps_full_content() {
        let long = format!("Revenue grew 22% in fiscal 2024. {}", "Detail. ".repeat(60));
        let out = revenue_docs(&long);

        let llm = render_llm(&out);
        assert!(llm.contains("22%"));
        assert!(llm.contains(&long));
        assert!(llm.contains("Similarity Score: 0.912"));
        assert!(llm.contains("Document URL: Not available"));
    }

    #[test]
    fn document_log_truncates_segment() {
        let long = format!("Revenue grew 22% in fiscal 2024. {}", "Detail. ".repeat(60));
        let log = render_log(&revenue_docs(&long));

        assert!(log.starts_with("Found 1 document segments\nSource files: annual_report.pdf"));
        assert!(log.contains("  Similarity: 0.912"));
        let content = content_line(&log);
        assert!(content.chars().count() <= LOG_SEGMENT_CHARS);
        assert!(content.ends_with("..."));
    }

    #[test]
    fn short_segment_is_not_marked_truncated() {
        let log = render_log(&revenue_docs("revenue grew 22%"));
        assert_eq!(content_line(&log), "revenue grew 22%");
    }

    #[test]
    fn artifact_llm_summary_has_no_payload() {
        let artifact = Artifact::new(ArtifactKind::Image, "img_7.png", b"RAWBYTES".to_vec(), "512KB", "modern");
        let out = ToolOutput::Artifact(artifact);

        let llm = render_llm(&out);
        assert_eq!(
            llm,
            "Image generated successfully. Filename: img_7.png, Size: 512KB, Style: modern. The image has been prepared for display."
        );
        assert!(!llm.contains("RAWBYTES"));
        assert_eq!(render_log(&out), "Image generated: img_7.png (512KB, modern style)");
    }

    #[test]
    fn diagram_summary() {
        let artifact = Artifact::new(ArtifactKind::Diagram, "flowchart_diagram_1a2b.png", vec![1], "4KB", "flowchart");
        let llm = render_llm(&ToolOutput::Artifact(artifact));
        assert!(llm.starts_with("Diagram created successfully. Filename: flowchart_diagram_1a2b.png"));
        assert!(llm.contains("Type: flowchart"));
    }

    #[test]
    fn failure_renders_error_text() {
        let out = ToolOutput::Failure("No web search results found for query: 'x'".into());
        assert_eq!(render_llm(&out), "No web search results found for query: 'x'");
        assert_eq!(render_log(&out), "Error: No web search results found for query: 'x'");
    }

    #[test]
    fn news_llm_format() {
        let out = ToolOutput::News(vec![NewsArticle {
            title: "Fintech funding rebounds".into(),
            source: Some("Reuters".into()),
            description: None,
            content: Some("Funding rose".into()),
            url: Some("https://example.com/a".into()),
        }]);
        let llm = render_llm(&out);
        assert!(llm.starts_with("Article 1:\n  Title: Fintech funding rebounds\n  Source: Reuters"));
        assert!(llm.contains("Description: No description available."));
        assert_eq!(render_llm(&ToolOutput::News(vec![])), "No news articles found for your query.");
    }

    #[test]
    fn generic_renderer_drops_noise_and_titles_keys() {
        let map = json!({
            "success": true,
            "query": "ai",
            "total_results": 2,
            "base64_data": "AAAA",
            "items": [
                {"result_number": 1, "page_title": "One", "similarity_score": 0.5},
                {"result_number": 2, "page_title": "Two", "document_url": null, "url_error": "expired"}
            ],
            "meta": {"fetched_by": "crawler"}
        });
        let text = render_generic(map.as_object().unwrap());

        assert!(!text.contains("success"));
        assert!(!text.contains("AAAA"));
        assert!(!text.contains("Total Results"));
        assert!(!text.contains("expired"));
        assert!(text.contains("\nWeb Result 1:"));
        assert!(text.contains("Page Title: One"));
        assert!(text.contains("Similarity Score: 0.500"));
        assert!(text.contains("---"));
        assert!(text.contains("Document URL: Not available"));
        assert!(text.contains("Meta:\n  Fetched By: crawler"));
    }

    #[test]
    fn generic_renderer_lists_scalars() {
        let map = json!({"source_files": ["a.pdf", "b.pdf"]});
        let text = render_generic(map.as_object().unwrap());
        assert_eq!(text, "Source Files: a.pdf\nSource Files: b.pdf");
    }

    #[test]
    fn list_shaped_reply_is_rendered_without_raw_json() {
        let out = ToolOutput::Other(json!([
            {"title": "Fintech adoption", "query": "fintech", "base64_data": "SECRETBYTES"},
            [{"title": "Nested", "success": true}],
            "plain note"
        ]));

        let llm = render_llm(&out);
        let log = render_log(&out);
        for text in [&llm, &log] {
            assert!(!text.contains("SECRETBYTES"));
            assert!(!text.contains("fintech\""));
            assert!(!text.contains('{'));
            assert!(!text.contains("Query"));
            assert!(!text.contains("Success"));
        }
        assert!(llm.contains("Title: Fintech adoption"));
        assert!(llm.contains("Title: Nested"));
        assert!(llm.contains("plain note"));
    }

    #[test]
    fn object_log_uses_generic_renderer() {
        let out = ToolOutput::Other(json!({
            "success": true,
            "query": "q3 revenue",
            "summary": "Revenue grew 22%",
            "items": [[{"base64_data": "SECRETBYTES", "label": "chart"}]]
        }));
        let log = render_log(&out);

        assert!(log.contains("Summary: Revenue grew 22%"));
        assert!(log.contains("Label: chart"));
        assert!(!log.contains("q3 revenue"));
        assert!(!log.contains("SECRETBYTES"));
    }

    #[test]
    fn extracted_artifacts_render_as_summaries() {
        let out = ToolOutput::from_json(
            crate::kind::ToolKind::ImageGenerate,
            json!({"images": [{"base64_data": "aGVsbG8=", "filename": "a.png", "size": "1KB", "style": "modern"}], "note": "one image"}),
        )
        .unwrap();

        let llm = render_llm(&out);
        assert!(llm.starts_with("Image generated successfully. Filename: a.png"));
        assert!(llm.contains("Note: one image"));
        assert!(!llm.contains("aGVsbG8="));
        let log = render_log(&out);
        assert!(log.starts_with("Image generated: a.png (1KB, modern style)"));
        assert!(!log.contains("aGVsbG8="));
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("target_audience"), "Target Audience");
        assert_eq!(title_case("URL"), "Url");
        assert_eq!(title_case("__x"), "X");
    }

    #[test]
    fn notices() {
        assert_eq!(
            degradation_notice("web_search"),
            "The 'web_search' tool failed. Please proceed with available information."
        );
        assert_eq!(unknown_tool_notice("teleport"), "Error: Unknown tool 'teleport'");
    }

    proptest! {
        #[test]
        fn log_snippets_respect_limit(content in "\\PC{0,600}") {
            let out = ToolOutput::WebResults(vec![WebResult {
                result_number: 1,
                title: "t".into(),
                url: "u".into(),
                content: content.clone(),
            }]);
            let log = render_log(&out);
            let line = log.lines().find_map(|l| l.strip_prefix("  Content: ")).unwrap_or_default();
            prop_assert!(line.chars().count() <= LOG_SNIPPET_CHARS);
            prop_assert!(render_llm(&out).contains(&content));
        }
    }
}
