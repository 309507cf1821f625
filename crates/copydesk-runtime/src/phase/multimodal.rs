//! Multimodal phase: produce at most one visual for the post.

use copydesk_core::{AgentKind, Artifact, Modality, RequestLog, TenantContext};
use tracing::warn;

use super::plan::PhaseProfile;
use super::runner::{PhaseRunner, PhaseSpec};

const BASE_PROMPT: &str = "You are an expert visual content creator for social media. Produce exactly \
one visual: call generate_image or create_diagram one time only. Use image_web_search only to find \
reference material. Prefer a diagram when the post explains a process, timeline or comparison.";

/// System prompt for `modality`.
pub fn system_prompt(modality: Modality) -> String {
    let platform = match modality {
        Modality::Linkedin => "",
        Modality::Twitter => {
            "Create an engaging, eye-catching image for Twitter posts.
- Use bold, attention-grabbing visuals
- Keep designs simple and clear for small screens
- Use trending color schemes and modern design
- Focus on visual impact and shareability"
        }
        Modality::Tiktok => {
            "Create vibrant, dynamic images for TikTok content.
- Use bright, energetic colors
- Include dynamic elements and modern aesthetics
- Focus on youth-oriented, trendy visual styles
- Create visuals that would work as video thumbnails or backgrounds"
        }
        Modality::Instagram => {
            "Create aesthetically pleasing images for Instagram posts.
- Use Instagram-native visual styles and trends
- Focus on beauty, lifestyle, and visual appeal
- Use popular color palettes and compositions
- Ensure high visual quality and aesthetic coherence"
        }
    };
    if platform.is_empty() {
        BASE_PROMPT.to_string()
    } else {
        format!("{BASE_PROMPT}\n\n{platform}")
    }
}

/// What the visual is for.
#[derive(Clone, Debug)]
pub struct MediaInput<'a> {
    /// Post the visual accompanies.
    pub post_content: &'a str,
    /// What the visual should show.
    pub image_description: &'a str,
    /// Target platform.
    pub modality: Modality,
}

/// Build the multimodal phase.
pub fn spec(profile: &PhaseProfile, input: &MediaInput<'_>) -> PhaseSpec {
    PhaseSpec {
        phase: AgentKind::Multimodal,
        system_prompt: system_prompt(input.modality),
        initial_message: format!(
            "Generated {} post content: {}, with the following image description: {}.\n\n\
             Generate ONE professional visual that enhances this post's engagement based on the provided \
             information and image description. There should be no text in the image.",
            input.modality, input.post_content, input.image_description
        ),
        tools: profile.tools.clone(),
        max_rounds: profile.max_rounds,
    }
}

/// Produce the visual. Returns zero or one artifact.
pub async fn run(
    runner: &PhaseRunner,
    profile: &PhaseProfile,
    input: &MediaInput<'_>,
    tenant: &TenantContext,
    log: &RequestLog,
) -> Vec<Artifact> {
    log.log(format!(
        "\n=== PHASE 3: IMAGE GENERATION FOR {} ===",
        input.modality.as_str().to_uppercase()
    ))
    .await;
    let outcome = runner.run_phase(&spec(profile, input), tenant, log).await;

    let produced = outcome.artifacts.len();
    let images = first_only(outcome.artifacts);
    if produced > 1 {
        warn!(produced, "multimodal phase produced more than one artifact, keeping the first");
    }
    for image in &images {
        log.log(format!(
            "Image: {} ({}, {} style)",
            image.filename, image.size, image.style
        ))
        .await;
    }
    log.log(format!("{} image generation complete.", input.modality)).await;
    images
}

fn first_only(artifacts: Vec<Artifact>) -> Vec<Artifact> {
    artifacts.into_iter().take(1).collect()
}
