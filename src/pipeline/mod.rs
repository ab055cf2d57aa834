//! Pipeline core: stages, the sequential executor, the quality gate, and the
//! bounded run loop.
//!
//! # Run flow
//!
//! 1. **Seed**: the session is created with the request and guideline text.
//! 2. **Pass**: the [`Pipeline`] runs every [`Stage`] in order; each stage
//!    reads its declared keys and the executor writes its output key.
//! 3. **Gate**: the [`QualityGate`] scores the pass as accept or continue.
//! 4. **Loop**: the [`LoopController`] repeats up to the iteration budget,
//!    then returns the last pass's artifacts or fails if none exist.

pub mod controller;
pub mod executor;
pub mod gate;
pub mod stage;

pub use controller::{
    IterationDecision, IterationRecord, LoopController, RunError, RunOutcome, RunReport,
    RunState,
};
pub use executor::{Pipeline, PipelineError};
pub use gate::{Decision, QualityGate};
pub use stage::{Stage, StageError};
