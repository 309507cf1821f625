//! The closed catalogue of tools a phase can bind.
//!
//! Names, LLM definitions and argument validation all resolve through
//! [`ToolKind`], so an unknown name is caught once, at resolution, and
//! every other match is exhaustive.

use copydesk_core::ToolDefinition;
use serde_json::{Map, Value, json};

use crate::errors::ToolError;

/// A tool known to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    /// Tenant-scoped search over internal documents.
    DocumentSearch,
    /// General web search.
    WebSearch,
    /// Recent news articles.
    NewsSearch,
    /// Successful social posts to imitate.
    PostExampleSearch,
    /// Image generation.
    ImageGenerate,
    /// Mermaid diagram rendering.
    DiagramCreate,
    /// Existing images on the web.
    ImageWebSearch,
}

/// Accepted `style` values for image generation.
pub const IMAGE_STYLES: [&str; 6] = [
    "professional",
    "infographic",
    "modern",
    "minimalist",
    "tech-focused",
    "corporate",
];

/// Accepted `aspect_ratio` values for image generation.
pub const ASPECT_RATIOS: [&str; 3] = ["16:9", "1:1", "4:5"];

/// Accepted `sort_by` values for news search.
pub const NEWS_SORT_ORDERS: [&str; 2] = ["publishedAt", "relevancy"];

impl ToolKind {
    /// Every tool.
    pub const ALL: [Self; 7] = [
        Self::DocumentSearch,
        Self::WebSearch,
        Self::NewsSearch,
        Self::PostExampleSearch,
        Self::ImageGenerate,
        Self::DiagramCreate,
        Self::ImageWebSearch,
    ];

    /// Function name as seen by the model.
    pub fn name(self) -> &'static str {
        match self {
            Self::DocumentSearch => "search_document_library",
            Self::WebSearch => "web_search",
            Self::NewsSearch => "search_recent_news",
            Self::PostExampleSearch => "search_linkedin_posts",
            Self::ImageGenerate => "generate_image",
            Self::DiagramCreate => "create_diagram",
            Self::ImageWebSearch => "image_web_search",
        }
    }

    /// Resolve a function name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Returns `true` if the tool yields a binary artifact.
    pub fn produces_artifact(self) -> bool {
        matches!(self, Self::ImageGenerate | Self::DiagramCreate)
    }

    /// Definition bound into the model's tool list.
    pub fn definition(self) -> ToolDefinition {
        let (description, parameters) = match self {
            Self::DocumentSearch => (
                "Search the internal document library of company information using an \
                 embedding-based retriever. Use this to find relevant information about the \
                 company or related topics. These are internal documents for context, not \
                 published sources.",
                object_schema(
                    json!({"query": {
                        "type": "string",
                        "description": "The topic or theme to search for in company information documents."
                    }}),
                    &["query"],
                ),
            ),
            Self::WebSearch => (
                "Search the web for information on any topic. Use this to find market research \
                 including company information, industry insights, recent trends, and other \
                 relevant web content.",
                object_schema(
                    json!({"query": {
                        "type": "string",
                        "description": "The search query. Use descriptive keywords and phrases that complement the information gathered so far."
                    }}),
                    &["query"],
                ),
            ),
            Self::NewsSearch => (
                "Search for recent news articles based on a query. Use this to find recent, \
                 relevant information for the post. Prefer relevancy sorting if unsure.",
                object_schema(
                    json!({
                        "query": {
                            "type": "string",
                            "description": "Several keywords separated by OR, e.g. 'AI OR fintech OR payments'. Avoid long phrases. Max 500 characters."
                        },
                        "sort_by": {
                            "type": "string",
                            "description": "Sort order for the articles.",
                            "enum": NEWS_SORT_ORDERS
                        }
                    }),
                    &["query", "sort_by"],
                ),
            ),
            Self::PostExampleSearch => (
                "Search for successful social posts using an embedding-based retriever. Use this \
                 to find examples matching the content type and themes being written, to learn \
                 their structure, tone and style.",
                object_schema(
                    json!({"query": {
                        "type": "string",
                        "description": "A content brief: key message, content type and structure, tone, target audience, and desired call to action."
                    }}),
                    &["query"],
                ),
            ),
            Self::ImageGenerate => (
                "Generate an image for the post based on its content and a visual style. Use \
                 this when the text would benefit from a visual element.",
                object_schema(
                    json!({
                        "prompt": {
                            "type": "string",
                            "description": "Detailed description of the image: style, composition and key elements aligned with the post. Avoid repetitive imagery and text."
                        },
                        "style": {
                            "type": "string",
                            "description": "Visual style for the image.",
                            "enum": IMAGE_STYLES
                        },
                        "aspect_ratio": {
                            "type": "string",
                            "description": "Aspect ratio for the target platform.",
                            "enum": ASPECT_RATIOS
                        }
                    }),
                    &["prompt", "style", "aspect_ratio"],
                ),
            ),
            Self::DiagramCreate => (
                "Render a diagram from Mermaid code. Use this when a flow, timeline, hierarchy \
                 or comparison explains the post better than a picture.",
                object_schema(
                    json!({"mermaid_code": {
                        "type": "string",
                        "description": "Complete, valid Mermaid diagram code."
                    }}),
                    &["mermaid_code"],
                ),
            ),
            Self::ImageWebSearch => (
                "Search the web for existing images matching a query.",
                object_schema(
                    json!({"query": {
                        "type": "string",
                        "description": "What the image should show."
                    }}),
                    &["query"],
                ),
            ),
        };
        ToolDefinition::new(self.name(), description, parameters)
    }

    /// Check that required arguments are present and enumerated values are legal.
    pub fn validate(self, args: &Map<String, Value>) -> Result<(), ToolError> {
        let definition = self.definition();
        for key in definition.required_params() {
            let present = args
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(ToolError::Validation {
                    message: format!("missing required argument `{key}`"),
                });
            }
        }
        for (key, allowed) in self.enumerated_args() {
            if let Some(value) = args.get(*key).and_then(Value::as_str) {
                if !allowed.contains(&value) {
                    return Err(ToolError::Validation {
                        message: format!("`{key}` must be one of {}", allowed.join(", ")),
                    });
                }
            }
        }
        Ok(())
    }
}

type EnumeratedArgs = &'static [(&'static str, &'static [&'static str])];

const IMAGE_ENUM_ARGS: EnumeratedArgs = &[("style", &IMAGE_STYLES), ("aspect_ratio", &ASPECT_RATIOS)];
const NEWS_ENUM_ARGS: EnumeratedArgs = &[("sort_by", &NEWS_SORT_ORDERS)];

impl ToolKind {
    fn enumerated_args(self) -> EnumeratedArgs {
        match self {
            Self::ImageGenerate => IMAGE_ENUM_ARGS,
            Self::NewsSearch => NEWS_ENUM_ARGS,
            _ => &[],
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Parse a list of tool names, separating known kinds from unknown names.
pub fn resolve_names<S: AsRef<str>>(names: &[S]) -> (Vec<ToolKind>, Vec<String>) {
    let mut kinds = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        match ToolKind::from_name(name.as_ref()) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => unknown.push(name.as_ref().to_string()),
        }
    }
    (kinds, unknown)
}
