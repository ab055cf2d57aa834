//! lesson_forge: grade-differentiated educational content generation.
//!
//! Turns a free-text teacher request into per-grade content artifacts via a
//! quality-gated pipeline: request analysis, grade targeting, per-grade
//! planning, generation with template fallback, and heuristic validation,
//! all repeated under a bounded retry loop.

pub mod cli;
pub mod config;
pub mod content;
pub mod generation;
pub mod guidelines;
pub mod partition;
pub mod pipeline;
pub mod session;
pub mod stages;

pub use config::{ConfigError, RunConfig};
pub use content::{ArtifactRecord, ArtifactSet, QualityScore, SourceAnalysis};
pub use guidelines::{GuidelineError, GuidelineStore};
pub use partition::{partition_targets, GradeDomain, TargetSet};
pub use pipeline::{
    Decision, LoopController, Pipeline, PipelineError, QualityGate, RunError, RunOutcome,
    RunReport,
};
pub use session::{SessionState, SessionValue};
