//! # copydesk-runtime
//!
//! Drives the model through the content workflow.
//!
//! - [`PhaseRunner`]: bounded tool-calling loop for one phase, with forced final answer
//! - [`Orchestrator`]: Info → Compose → Multimodal for a new request
//! - [`FollowupRouter`]: classifies a follow-up and merges the chosen agent's output
//! - [`TenantContextProvider`]: company profile lookup, resolved once per request

#![deny(unsafe_code)]

pub mod errors;
pub mod orchestrator;
pub mod phase;
pub mod router;
pub mod tenant;

pub use errors::RuntimeError;
pub use orchestrator::{GenerateRequest, Orchestrator};
pub use phase::{
    Degradation, PhaseOutcome, PhasePlan, PhaseProfile, PhaseRunner, PhaseSpec, StructuredPhaseOutcome, Termination,
};
pub use router::{FollowupRouter, RouteFallback, RouterDecision};
pub use tenant::{NoTenantContext, StaticTenantDirectory, TenantContextProvider, resolve_tenant};
