//! Phase runner: the bounded tool loop shared by every phase.
//!
//! A phase seeds a session with a system and a human message and invokes
//! the model with the phase's tools bound. While the model keeps asking
//! for tools, the requested calls are dispatched, their results appended,
//! and the model is asked again with an explicit "do you have enough"
//! instruction. After `max_rounds` continuation calls the model is told to
//! stop and a final call with no tools bound produces the answer, so a
//! phase always terminates.
//!
//! Nothing escapes a phase as an error. A failed continuation call is
//! folded into the session as a notice and the runner jumps to the final
//! call. A failed first call marks the outcome [`Degradation::Unavailable`].

use std::sync::Arc;
use std::time::Duration;

use copydesk_core::{AgentKind, Artifact, Message, RequestLog, TenantContext, ToolDefinition};
use copydesk_llm::{InvokeRequest, LlmClient, LlmError, LlmResult, StructuredOutput};
use copydesk_tools::{ToolDispatcher, ToolKind};
use tracing::{debug, info, instrument, warn};

/// Default timeout for a freeform turn.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);
/// Default timeout for the final schema-constrained call.
pub const DEFAULT_STRUCTURED_TIMEOUT: Duration = Duration::from_secs(120);

const CONTINUE_INSTRUCTION: &str = "Review the tool results above. If you have enough information, \
     give your final answer now without calling any tools. Otherwise, call the tools you still need.";

const BUDGET_INSTRUCTION: &str = "You have used all available tool rounds for this step. Do not call \
     any more tools. Summarize now using the information gathered so far.";

/// One phase invocation.
#[derive(Clone, Debug)]
pub struct PhaseSpec {
    /// Which phase, for logs.
    pub phase: AgentKind,
    /// System prompt.
    pub system_prompt: String,
    /// First human message.
    pub initial_message: String,
    /// Tools the model may call.
    pub tools: Vec<ToolKind>,
    /// Continuation calls allowed before the forced final call.
    pub max_rounds: u32,
}

/// How the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The model answered without requesting tools.
    Natural,
    /// The runner forced a final call with no tools bound.
    Forced,
    /// The model never answered.
    Aborted,
}

/// Why an outcome is lower quality than a clean run.
#[derive(Debug)]
pub enum Degradation {
    /// The round budget ran out while the model still wanted tools.
    BudgetExhausted,
    /// A call after the first one failed.
    TurnFailed(LlmError),
    /// The first call failed; there is no model output.
    Unavailable(LlmError),
    /// The final schema-constrained call failed.
    StructuredFailed(LlmError),
}

impl Degradation {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BudgetExhausted => "budget_exhausted",
            Self::TurnFailed(_) => "turn_failed",
            Self::Unavailable(_) => "unavailable",
            Self::StructuredFailed(_) => "structured_failed",
        }
    }

    /// The underlying inference error, if any.
    pub fn error(&self) -> Option<&LlmError> {
        match self {
            Self::BudgetExhausted => None,
            Self::TurnFailed(e) | Self::Unavailable(e) | Self::StructuredFailed(e) => Some(e),
        }
    }
}

/// Result of [`PhaseRunner::run_phase`].
#[derive(Debug)]
pub struct PhaseOutcome {
    /// Final answer, or a degradation notice when there is none.
    pub text: String,
    /// Artifacts produced by tools, in order.
    pub artifacts: Vec<Artifact>,
    /// Continuation calls made.
    pub rounds: u32,
    /// How the loop ended.
    pub termination: Termination,
    /// First degradation hit, if any.
    pub degradation: Option<Degradation>,
}

impl PhaseOutcome {
    /// Whether the model never answered.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.degradation, Some(Degradation::Unavailable(_)))
    }

    /// Take the error out of an [`Degradation::Unavailable`] outcome.
    pub fn take_unavailable(&mut self) -> Option<LlmError> {
        take_unavailable(&mut self.degradation)
    }
}

/// Result of [`PhaseRunner::run_structured_phase`].
#[derive(Debug)]
pub struct StructuredPhaseOutcome<T> {
    /// Decoded final answer. `None` when the structured call failed or never ran.
    pub value: Option<T>,
    /// Last freeform text the model produced.
    pub text: String,
    /// Artifacts produced by tools, in order.
    pub artifacts: Vec<Artifact>,
    /// Continuation calls made.
    pub rounds: u32,
    /// How the tool loop ended.
    pub termination: Termination,
    /// First degradation hit, if any.
    pub degradation: Option<Degradation>,
}

impl<T> StructuredPhaseOutcome<T> {
    /// Whether the model never answered.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.degradation, Some(Degradation::Unavailable(_)))
    }

    /// Take the error out of an [`Degradation::Unavailable`] outcome.
    pub fn take_unavailable(&mut self) -> Option<LlmError> {
        take_unavailable(&mut self.degradation)
    }
}

fn take_unavailable(slot: &mut Option<Degradation>) -> Option<LlmError> {
    match slot.take() {
        Some(Degradation::Unavailable(e)) => Some(e),
        other => {
            *slot = other;
            None
        }
    }
}

/// Where the tool loop left the session.
enum LoopExit {
    /// Model answered on its own.
    Natural(String),
    /// A final call is needed; the instruction is already in the session.
    NeedsFinal,
    /// First call failed.
    Unavailable(LlmError),
}

struct LoopState {
    messages: Vec<Message>,
    artifacts: Vec<Artifact>,
    rounds: u32,
    degradation: Option<Degradation>,
    exit: LoopExit,
}

/// Drives phases against a model and a tool dispatcher.
#[derive(Clone)]
pub struct PhaseRunner {
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    turn_timeout: Duration,
    structured_timeout: Duration,
}

impl PhaseRunner {
    /// Create a runner with default timeouts.
    pub fn new(llm: Arc<dyn LlmClient>, dispatcher: ToolDispatcher) -> Self {
        Self {
            llm,
            dispatcher,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            structured_timeout: DEFAULT_STRUCTURED_TIMEOUT,
        }
    }

    /// Override the timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, turn: Duration, structured: Duration) -> Self {
        self.turn_timeout = turn;
        self.structured_timeout = structured;
        self
    }

    /// The model this runner drives.
    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    /// Freeform call bounded by the turn timeout.
    pub async fn invoke(&self, request: &InvokeRequest) -> LlmResult<Message> {
        match tokio::time::timeout(self.turn_timeout, self.llm.invoke(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                timeout_ms: millis(self.turn_timeout),
            }),
        }
    }

    async fn invoke_structured<T: StructuredOutput>(&self, messages: &[Message]) -> LlmResult<T> {
        let call = copydesk_llm::complete_structured::<T>(self.llm.as_ref(), messages);
        match tokio::time::timeout(self.structured_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                timeout_ms: millis(self.structured_timeout),
            }),
        }
    }

    /// Run a phase to a freeform answer.
    #[instrument(skip_all, fields(phase = %spec.phase, tenant_id = %tenant.tenant_id, max_rounds = spec.max_rounds))]
    pub async fn run_phase(&self, spec: &PhaseSpec, tenant: &TenantContext, log: &RequestLog) -> PhaseOutcome {
        let mut state = self.run_loop(spec, tenant, log).await;

        let (text, termination) = match state.exit {
            LoopExit::Natural(text) => (text, Termination::Natural),
            LoopExit::Unavailable(e) => {
                let text = unavailable_notice(spec.phase, &e);
                state.degradation = Some(Degradation::Unavailable(e));
                (text, Termination::Aborted)
            }
            LoopExit::NeedsFinal => {
                log.log("Requesting final summary...").await;
                let request = InvokeRequest::new(state.messages.clone());
                match self.invoke(&request).await {
                    Ok(reply) => (reply.content, Termination::Forced),
                    Err(e) => {
                        warn!(phase = %spec.phase, error = %e, "final summary call failed");
                        log.log(format!("Error during {} phase summary: {e}", spec.phase)).await;
                        let text = unavailable_notice(spec.phase, &e);
                        if state.degradation.is_none() {
                            state.degradation = Some(Degradation::TurnFailed(e));
                        }
                        (text, Termination::Forced)
                    }
                }
            }
        };

        info!(
            phase = %spec.phase,
            rounds = state.rounds,
            artifacts = state.artifacts.len(),
            termination = ?termination,
            degradation = state.degradation.as_ref().map(Degradation::label),
            "phase complete"
        );
        PhaseOutcome {
            text,
            artifacts: state.artifacts,
            rounds: state.rounds,
            termination,
            degradation: state.degradation,
        }
    }

    /// Run a phase whose final answer is a `T`.
    ///
    /// The tool loop is the same as [`run_phase`](Self::run_phase); instead
    /// of a freeform final call, one schema-constrained call with no tools
    /// bound runs over the whole session.
    #[instrument(skip_all, fields(phase = %spec.phase, tenant_id = %tenant.tenant_id, max_rounds = spec.max_rounds))]
    pub async fn run_structured_phase<T: StructuredOutput>(
        &self,
        spec: &PhaseSpec,
        tenant: &TenantContext,
        log: &RequestLog,
    ) -> StructuredPhaseOutcome<T> {
        let mut state = self.run_loop(spec, tenant, log).await;

        let (text, termination) = match state.exit {
            LoopExit::Unavailable(e) => {
                let text = unavailable_notice(spec.phase, &e);
                return StructuredPhaseOutcome {
                    value: None,
                    text,
                    artifacts: state.artifacts,
                    rounds: state.rounds,
                    termination: Termination::Aborted,
                    degradation: Some(Degradation::Unavailable(e)),
                };
            }
            LoopExit::Natural(text) => {
                if !text.is_empty() {
                    state.messages.push(Message::assistant(text.clone()));
                }
                (text, Termination::Natural)
            }
            LoopExit::NeedsFinal => (String::new(), Termination::Forced),
        };

        debug!(phase = %spec.phase, "requesting structured answer");
        let value = match self.invoke_structured::<T>(&state.messages).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(phase = %spec.phase, error = %e, category = e.category(), "structured call failed");
                log.log(format!("Error during {} phase: {e}", spec.phase)).await;
                if state.degradation.is_none() {
                    state.degradation = Some(Degradation::StructuredFailed(e));
                }
                None
            }
        };

        info!(
            phase = %spec.phase,
            rounds = state.rounds,
            artifacts = state.artifacts.len(),
            termination = ?termination,
            structured = value.is_some(),
            degradation = state.degradation.as_ref().map(Degradation::label),
            "phase complete"
        );
        StructuredPhaseOutcome {
            value,
            text,
            artifacts: state.artifacts,
            rounds: state.rounds,
            termination,
            degradation: state.degradation,
        }
    }

    async fn run_loop(&self, spec: &PhaseSpec, tenant: &TenantContext, log: &RequestLog) -> LoopState {
        let registry = self.dispatcher.registry();
        let allowed = registry.available(&spec.tools);
        let definitions = registry.definitions_for(&spec.tools);
        if allowed.len() < spec.tools.len() {
            debug!(
                phase = %spec.phase,
                wanted = spec.tools.len(),
                available = allowed.len(),
                "some phase tools have no provider"
            );
        }

        let mut state = LoopState {
            messages: vec![
                Message::system(spec.system_prompt.clone()),
                Message::human(spec.initial_message.clone()),
            ],
            artifacts: Vec::new(),
            rounds: 0,
            degradation: None,
            exit: LoopExit::NeedsFinal,
        };

        log.log(format!("Invoking LLM for {} phase...", spec.phase)).await;
        let mut reply = match self.turn(&state.messages, &definitions).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(phase = %spec.phase, error = %e, category = e.category(), "first call failed");
                log.log(format!("Error during {} phase: {e}", spec.phase)).await;
                state.exit = LoopExit::Unavailable(e);
                return state;
            }
        };

        loop {
            if !reply.has_tool_calls() {
                state.exit = LoopExit::Natural(reply.content);
                return state;
            }

            if state.rounds >= spec.max_rounds {
                warn!(
                    phase = %spec.phase,
                    rounds = state.rounds,
                    dropped_calls = reply.tool_calls.len(),
                    "round budget exhausted"
                );
                log.log(format!(
                    "Reached the maximum of {} tool rounds; summarizing.",
                    spec.max_rounds
                ))
                .await;
                if !reply.content.trim().is_empty() {
                    state.messages.push(Message::assistant(reply.content));
                }
                state.messages.push(Message::human(BUDGET_INSTRUCTION));
                state.degradation = Some(Degradation::BudgetExhausted);
                state.exit = LoopExit::NeedsFinal;
                return state;
            }

            let outcome = self
                .dispatcher
                .dispatch(&reply.tool_calls, &allowed, tenant, log)
                .await;
            state.messages.push(reply);
            state.messages.extend(outcome.messages);
            state.artifacts.extend(outcome.artifacts);
            state.messages.push(Message::human(CONTINUE_INSTRUCTION));
            state.rounds += 1;
            debug!(phase = %spec.phase, round = state.rounds, "continuing after tool round");

            reply = match self.turn(&state.messages, &definitions).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(phase = %spec.phase, round = state.rounds, error = %e, "continuation call failed");
                    log.log(format!("Error during {} phase: {e}", spec.phase)).await;
                    state.messages.push(Message::human(format!(
                        "The previous step failed ({e}). Do not call any more tools. \
                         Summarize now using the information gathered so far."
                    )));
                    state.degradation = Some(Degradation::TurnFailed(e));
                    state.exit = LoopExit::NeedsFinal;
                    return state;
                }
            };
        }
    }

    async fn turn(&self, messages: &[Message], tools: &[ToolDefinition]) -> LlmResult<Message> {
        let request = InvokeRequest::new(messages.to_vec()).with_tools(tools.to_vec());
        self.invoke(&request).await
    }
}

fn unavailable_notice(phase: AgentKind, e: &LlmError) -> String {
    format!("The {phase} phase encountered an error: {e}. Proceeding with available information.")
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
