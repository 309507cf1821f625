//! Content produced by a request: copy, image description, and artifacts.
//!
//! [`ContentState`] is owned by exactly one top-level request. Every merge
//! returns a fresh value built from a copy of the receiver, so a caller's
//! existing state is never mutated in place.

use serde::{Deserialize, Serialize};

// ── Modality ────────────────────────────────────────────────────────────────

/// Target social platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// `LinkedIn` (default).
    #[default]
    Linkedin,
    /// Twitter / X.
    Twitter,
    /// `TikTok`.
    Tiktok,
    /// Instagram.
    Instagram,
}

impl Modality {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Tiktok => "tiktok",
            Self::Instagram => "instagram",
        }
    }

    /// Parse a platform name, case-insensitively. Unknown names map to `LinkedIn`.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Self::Twitter,
            "tiktok" => Self::Tiktok,
            "instagram" => Self::Instagram,
            _ => Self::Linkedin,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Artifact ────────────────────────────────────────────────────────────────

/// What kind of binary an artifact holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Generated raster image.
    Image,
    /// Rendered diagram.
    Diagram,
}

/// A binary asset produced by a tool.
///
/// The payload travels to the caller only. It is never placed in a message
/// sent to the LLM; the model sees the metadata summary instead.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// File name suggested by the producer.
    pub filename: String,
    /// Raw bytes. Serialized as base64.
    #[serde(rename = "base64_data", with = "base64_bytes")]
    pub payload: Vec<u8>,
    /// Human-readable size, e.g. `"512KB"`.
    pub size: String,
    /// Image or diagram.
    pub kind: ArtifactKind,
    /// Visual style for images, diagram type for diagrams.
    pub style: String,
}

impl Artifact {
    /// Build an artifact.
    #[must_use]
    pub fn new(
        kind: ArtifactKind,
        filename: impl Into<String>,
        payload: Vec<u8>,
        size: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            payload,
            size: size.into(),
            kind,
            style: style.into(),
        }
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("payload_bytes", &self.payload.len())
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("style", &self.style)
            .finish()
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// ── ContentError ────────────────────────────────────────────────────────────

/// Category of a failure surfaced inside a [`ContentState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentErrorKind {
    /// The LLM inference service could not be reached or answered badly.
    Inference,
    /// Anything else.
    Internal,
}

/// Structured error carried by a degraded [`ContentState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentError {
    /// Category.
    pub kind: ContentErrorKind,
    /// Causal message.
    pub message: String,
}

impl ContentError {
    /// Build a content error.
    #[must_use]
    pub fn new(kind: ContentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ── ContentState ────────────────────────────────────────────────────────────

/// Content under construction for one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentState {
    /// The post copy.
    #[serde(default)]
    pub post_content: String,
    /// Description of the visual that should accompany the post.
    #[serde(default)]
    pub image_description: String,
    /// Generated images and diagrams.
    #[serde(default)]
    pub generated_images: Vec<Artifact>,
    /// Target platform.
    #[serde(default)]
    pub modality: Modality,
    /// Set when a phase failed and the content is degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ContentError>,
}

impl ContentState {
    /// Empty content for `modality`.
    #[must_use]
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            ..Self::default()
        }
    }

    /// Content carrying only an error.
    #[must_use]
    pub fn failed(modality: Modality, error: ContentError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(modality)
        }
    }

    /// Copy with `post_content` and `image_description` replaced.
    ///
    /// New copy supersedes an earlier failure, so `error` is cleared.
    #[must_use]
    pub fn with_copy(&self, post_content: impl Into<String>, image_description: impl Into<String>) -> Self {
        Self {
            post_content: post_content.into(),
            image_description: image_description.into(),
            error: None,
            ..self.clone()
        }
    }

    /// Copy with `generated_images` replaced, not appended.
    #[must_use]
    pub fn with_images(&self, generated_images: Vec<Artifact>) -> Self {
        Self {
            generated_images,
            ..self.clone()
        }
    }

    /// Copy with `error` set.
    #[must_use]
    pub fn with_error(&self, error: ContentError) -> Self {
        Self {
            error: Some(error),
            ..self.clone()
        }
    }

    /// Returns `true` if a phase failure degraded this content.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
