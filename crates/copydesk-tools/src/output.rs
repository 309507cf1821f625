//! Typed tool outputs.
//!
//! Providers reply with JSON. [`ToolOutput::from_json`] turns a reply into
//! a tagged variant: an explicit `error` field becomes [`ToolOutput::Failure`],
//! any object carrying `base64_data` becomes an [`Artifact`] whatever the
//! tool and however deep it sits, and known shapes decode into typed
//! records. Anything else is kept as [`ToolOutput::Other`] for the generic
//! renderer. No payload survives inside a non-artifact variant.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use copydesk_core::{Artifact, ArtifactKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ToolError;
use crate::kind::ToolKind;

/// One matching segment of an internal document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentSegment {
    /// 1-based rank.
    pub segment_number: u32,
    /// Source file name.
    pub filename: String,
    /// Retriever similarity.
    #[serde(default)]
    pub similarity_score: f64,
    /// Segment text.
    pub content: String,
    /// Link to the source, when one could be produced.
    #[serde(default)]
    pub document_url: Option<String>,
}

/// Result of a document search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentResults {
    /// Distinct source files, sorted.
    #[serde(default)]
    pub source_files: Vec<String>,
    /// Matching segments, best first.
    #[serde(rename = "document_segments")]
    pub segments: Vec<DocumentSegment>,
}

/// A successful post to imitate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostExample {
    /// 1-based rank.
    pub example_number: u32,
    /// Post text.
    pub content: String,
    /// Retriever similarity.
    #[serde(default)]
    pub similarity_score: f64,
    /// Who the post was written for.
    #[serde(default)]
    pub target_audience: Option<String>,
    /// What visual accompanied it.
    #[serde(default)]
    pub media_description: Option<String>,
    /// Link to the original.
    #[serde(default)]
    pub content_url: Option<String>,
}

/// A web page hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    /// 1-based rank.
    pub result_number: u32,
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Extracted text.
    #[serde(default)]
    pub content: String,
}

/// A news article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Headline.
    pub title: String,
    /// Publisher.
    #[serde(default)]
    pub source: Option<String>,
    /// Summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Body excerpt.
    #[serde(default)]
    pub content: Option<String>,
    /// Article URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// An image found on the web.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    /// 1-based rank.
    pub result_number: u32,
    /// Image title.
    #[serde(default)]
    pub title: String,
    /// Image URL.
    pub url: String,
}

/// Output of one tool call.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    /// Document search hits.
    Documents(DocumentResults),
    /// Post examples.
    PostExamples(Vec<PostExample>),
    /// Web search hits.
    WebResults(Vec<WebResult>),
    /// News articles.
    News(Vec<NewsArticle>),
    /// Web image hits.
    ImageResults(Vec<ImageResult>),
    /// A generated image or diagram.
    Artifact(Artifact),
    /// Payloads found inside a larger reply.
    Artifacts {
        /// Decoded payloads, in document order.
        artifacts: Vec<Artifact>,
        /// The reply with the payload nodes removed.
        rest: Value,
    },
    /// The provider reported an error instead of a result.
    Failure(String),
    /// Preformatted text.
    Text(String),
    /// Unrecognized shape.
    Other(Value),
}

#[derive(Deserialize)]
struct PostsEnvelope {
    viral_posts: Vec<PostExample>,
}

#[derive(Deserialize)]
struct WebEnvelope {
    web_results: Vec<WebResult>,
}

#[derive(Deserialize)]
struct NewsEnvelope {
    articles: Vec<NewsArticle>,
}

#[derive(Deserialize)]
struct ImagesEnvelope {
    image_results: Vec<ImageResult>,
}

#[derive(Deserialize)]
struct ArtifactFields {
    base64_data: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    diagram_type: Option<String>,
}

impl ToolOutput {
    /// Decode a provider reply for `kind`.
    ///
    /// Fails only when a binary payload is present but not valid base64.
    pub fn from_json(kind: ToolKind, value: Value) -> Result<Self, ToolError> {
        let mut value = match value {
            Value::String(text) => return Ok(Self::Text(text)),
            other => other,
        };

        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map_or_else(|| error.to_string(), ToString::to_string);
            return Ok(Self::Failure(message));
        }

        if value.get("base64_data").is_some() {
            return decode_artifact(kind, value).map(Self::Artifact);
        }

        let mut artifacts = Vec::new();
        let _ = extract_artifacts(kind, &mut value, &mut artifacts)?;
        if !artifacts.is_empty() {
            return Ok(Self::Artifacts { artifacts, rest: value });
        }
        if !value.is_object() {
            return Ok(Self::Other(value));
        }

        let typed = match kind {
            ToolKind::DocumentSearch => serde_json::from_value(value.clone()).ok().map(Self::Documents),
            ToolKind::PostExampleSearch => serde_json::from_value::<PostsEnvelope>(value.clone())
                .ok()
                .map(|e| Self::PostExamples(e.viral_posts)),
            ToolKind::WebSearch => serde_json::from_value::<WebEnvelope>(value.clone())
                .ok()
                .map(|e| Self::WebResults(e.web_results)),
            ToolKind::NewsSearch => serde_json::from_value::<NewsEnvelope>(value.clone())
                .ok()
                .map(|e| Self::News(e.articles)),
            ToolKind::ImageWebSearch => serde_json::from_value::<ImagesEnvelope>(value.clone())
                .ok()
                .map(|e| Self::ImageResults(e.image_results)),
            ToolKind::ImageGenerate | ToolKind::DiagramCreate => None,
        };
        Ok(typed.unwrap_or(Self::Other(value)))
    }

    /// Every artifact carried by this output.
    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            Self::Artifact(a) => std::slice::from_ref(a),
            Self::Artifacts { artifacts, .. } => artifacts,
            _ => &[],
        }
    }

    /// The first artifact carried by this output, if any.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifacts().first()
    }

    /// Returns `true` for an explicit provider error.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Move every payload node under `value` into `found`.
///
/// Returns `true` when `value` itself was a payload node; the caller drops it.
fn extract_artifacts(kind: ToolKind, value: &mut Value, found: &mut Vec<Artifact>) -> Result<bool, ToolError> {
    if value.get("base64_data").is_some() {
        found.push(decode_artifact(kind, std::mem::take(value))?);
        return Ok(true);
    }
    match value {
        Value::Object(obj) => {
            let mut consumed = Vec::new();
            for (key, child) in obj.iter_mut() {
                if extract_artifacts(kind, child, found)? {
                    consumed.push(key.clone());
                }
            }
            for key in consumed {
                let _ = obj.remove(&key);
            }
        }
        Value::Array(items) => {
            let mut kept = Vec::with_capacity(items.len());
            for mut item in std::mem::take(items) {
                if !extract_artifacts(kind, &mut item, found)? {
                    kept.push(item);
                }
            }
            *items = kept;
        }
        _ => {}
    }
    Ok(false)
}

fn decode_artifact(kind: ToolKind, value: Value) -> Result<Artifact, ToolError> {
    let fields: ArtifactFields = serde_json::from_value(value).map_err(|e| ToolError::InvalidOutput {
        message: format!("artifact fields: {e}"),
    })?;
    let payload = STANDARD
        .decode(fields.base64_data.trim().as_bytes())
        .map_err(|e| ToolError::InvalidOutput {
            message: format!("artifact payload is not valid base64: {e}"),
        })?;

    let artifact_kind = if kind == ToolKind::DiagramCreate || fields.diagram_type.is_some() {
        ArtifactKind::Diagram
    } else {
        ArtifactKind::Image
    };
    let style = match artifact_kind {
        ArtifactKind::Diagram => fields.diagram_type.or(fields.style).unwrap_or_else(|| "diagram".into()),
        ArtifactKind::Image => fields.style.unwrap_or_else(|| "professional".into()),
    };
    let size = fields.size.unwrap_or_else(|| format_size(payload.len()));
    let filename = fields.filename.unwrap_or_else(|| match artifact_kind {
        ArtifactKind::Diagram => format!("{style}_diagram.png"),
        ArtifactKind::Image => "generated_image.png".into(),
    });

    Ok(Artifact::new(artifact_kind, filename, payload, size, style))
}

/// Human-readable size in whole kilobytes, e.g. `"12KB"`.
pub fn format_size(bytes: usize) -> String {
    format!("{}KB", bytes.div_ceil(1024))
}
