//! Orchestrator: Info → Compose → Multimodal for one content request.
//!
//! Tenant context is resolved once and handed unchanged to every phase.
//! Research failures degrade to a "no information" line; a compose failure
//! yields a [`ContentState`] carrying the error. Only a model that never
//! answered in either of the first two phases is a hard failure.

use std::sync::Arc;
use std::time::Duration;

use copydesk_core::{ContentState, Modality, RequestLog, TenantContext};
use copydesk_llm::LlmClient;
use copydesk_settings::CopydeskSettings;
use copydesk_tools::{ToolDispatcher, ToolRegistry};
use tracing::{info, instrument, warn};

use crate::errors::RuntimeError;
use crate::phase::compose::{self, ComposeInput};
use crate::phase::multimodal::{self, MediaInput};
use crate::phase::{PhaseOutcome, PhasePlan, PhaseRunner, info as info_phase};
use crate::tenant::{TenantContextProvider, resolve_tenant};

/// A new content request.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    /// What the post should be about.
    pub prompt: String,
    /// Target platform.
    pub modality: Modality,
    /// Tenant whose data and profile apply.
    pub tenant_id: String,
    /// Whether to run the multimodal phase.
    pub want_image: bool,
}

impl GenerateRequest {
    /// Request for a LinkedIn post with an image.
    pub fn new(prompt: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            modality: Modality::default(),
            tenant_id: tenant_id.into(),
            want_image: true,
        }
    }

    /// Set the platform.
    #[must_use]
    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    /// Set whether a visual is wanted.
    #[must_use]
    pub fn with_image(mut self, want_image: bool) -> Self {
        self.want_image = want_image;
        self
    }
}

/// Runs content requests.
pub struct Orchestrator {
    runner: PhaseRunner,
    plan: PhasePlan,
    tenants: Arc<dyn TenantContextProvider>,
}

impl Orchestrator {
    /// Create an orchestrator from its parts.
    pub fn new(runner: PhaseRunner, plan: PhasePlan, tenants: Arc<dyn TenantContextProvider>) -> Self {
        Self { runner, plan, tenants }
    }

    /// Wire an orchestrator from loaded settings.
    pub fn from_settings(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        tenants: Arc<dyn TenantContextProvider>,
        settings: &CopydeskSettings,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(registry, Duration::from_millis(settings.tools.timeout_ms));
        let runner = PhaseRunner::new(llm, dispatcher).with_timeouts(
            Duration::from_millis(settings.llm.turn_timeout_ms),
            Duration::from_millis(settings.llm.structured_timeout_ms),
        );
        Self::new(runner, PhasePlan::from_settings(&settings.phases), tenants)
    }

    /// The runner phases execute on.
    pub fn runner(&self) -> &PhaseRunner {
        &self.runner
    }

    /// Resolved phase configuration.
    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    /// Resolve `tenant_id` to its context.
    pub async fn tenant_context(&self, tenant_id: &str) -> TenantContext {
        resolve_tenant(self.tenants.as_ref(), tenant_id).await
    }

    /// Generate content for `request`.
    #[instrument(skip_all, fields(tenant_id = %request.tenant_id, modality = %request.modality, want_image = request.want_image))]
    pub async fn generate(&self, request: &GenerateRequest, log: &RequestLog) -> Result<ContentState, RuntimeError> {
        let tenant = self.tenant_context(&request.tenant_id).await;
        log.log(format!(
            "Starting {} content generation with model {}",
            request.modality,
            self.runner.llm().model()
        ))
        .await;

        let info_outcome = self.gather(&request.prompt, &tenant, log).await;
        let gathered = info_phase::summary(&info_outcome);

        let input = ComposeInput {
            prompt: &request.prompt,
            gathered_info: &gathered,
            modality: request.modality,
        };
        let mut composed = compose::run(&self.runner, &self.plan.compose, &input, &tenant, log).await;
        if info_outcome.is_unavailable() {
            if let Some(e) = composed.take_unavailable() {
                warn!(error = %e, "inference service unavailable for the whole request");
                log.log(format!("Content generation failed: {e}")).await;
                return Err(RuntimeError::Inference(e));
            }
        }

        let state = match compose::into_result(composed) {
            Ok(result) => ContentState::new(request.modality).with_copy(result.post_content, result.image_description),
            Err(error) => {
                warn!(error = %error.message, "compose phase failed");
                log.log(&error.message).await;
                return Ok(ContentState::failed(request.modality, error));
            }
        };

        let state = if request.want_image && !state.image_description.trim().is_empty() {
            let input = MediaInput {
                post_content: &state.post_content,
                image_description: &state.image_description,
                modality: request.modality,
            };
            let images = multimodal::run(&self.runner, &self.plan.multimodal, &input, &tenant, log).await;
            state.with_images(images)
        } else {
            log.log("Skipping image generation.").await;
            state
        };

        info!(
            post_chars = state.post_content.chars().count(),
            images = state.generated_images.len(),
            "content generated"
        );
        Ok(state)
    }

    /// Run the info phase.
    pub(crate) async fn gather(&self, prompt: &str, tenant: &TenantContext, log: &RequestLog) -> PhaseOutcome {
        info_phase::run(&self.runner, &self.plan.info, prompt, tenant, log).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copydesk_llm::testutil::{CallKind, ScriptedLlm};
    use copydesk_llm::LlmError;
    use mockall::mock;
    use serde_json::json;

    mock! {
        Tenants {}

        #[async_trait]
        impl TenantContextProvider for Tenants {
            async fn company_context(&self, tenant_id: &str) -> String;
        }
    }

    fn orchestrator(llm: Arc<ScriptedLlm>, tenants: MockTenants) -> Orchestrator {
        Orchestrator::from_settings(
            llm,
            Arc::new(ToolRegistry::new()),
            Arc::new(tenants),
            &CopydeskSettings::default(),
        )
    }

    fn acme() -> MockTenants {
        let mut tenants = MockTenants::new();
        let _ = tenants
            .expect_company_context()
            .withf(|id| id.eq("acme"))
            .times(1)
            .returning(|_| "Acme builds payment rails.".to_string());
        tenants
    }

    #[tokio::test]
    async fn tenant_is_fetched_once_and_reaches_every_phase() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .text("facts")
                .text("draft")
                .structured(json!({"post_content": "Post", "image_description": "Chart"}))
                .text("no visual"),
        );
        let state = orchestrator(llm.clone(), acme())
            .generate(&GenerateRequest::new("Q3", "acme"), &RequestLog::disabled())
            .await
            .unwrap();

        assert_eq!(state.post_content, "Post");
        let calls = llm.calls();
        assert!(calls[0].transcript().contains("Acme builds payment rails."));
        assert!(calls[1].transcript().contains("Acme builds payment rails."));
        assert_eq!(llm.count(CallKind::Invoke), 3);
    }

    #[tokio::test]
    async fn no_image_when_not_wanted() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .text("facts")
                .text("draft")
                .structured(json!({"post_content": "Post", "image_description": "Chart"})),
        );
        let state = orchestrator(llm.clone(), acme())
            .generate(
                &GenerateRequest::new("Q3", "acme").with_image(false),
                &RequestLog::disabled(),
            )
            .await
            .unwrap();
        assert!(state.generated_images.is_empty());
        assert_eq!(llm.count(CallKind::Invoke), 2);
    }

    #[tokio::test]
    async fn total_outage_is_hard_failure() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .fail_with(|| LlmError::Timeout { timeout_ms: 1 })
                .fail_with(|| LlmError::Timeout { timeout_ms: 1 }),
        );
        let err = orchestrator(llm, acme())
            .generate(&GenerateRequest::new("Q3", "acme"), &RequestLog::disabled())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "inference");
    }
}
