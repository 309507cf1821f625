//! Phases and the runner that drives them.

pub mod compose;
pub mod info;
pub mod multimodal;
pub mod plan;
pub mod runner;

pub use compose::{ComposeInput, ComposeResult};
pub use multimodal::MediaInput;
pub use plan::{PhasePlan, PhaseProfile};
pub use runner::{
    DEFAULT_STRUCTURED_TIMEOUT, DEFAULT_TURN_TIMEOUT, Degradation, PhaseOutcome, PhaseRunner, PhaseSpec,
    StructuredPhaseOutcome, Termination,
};
