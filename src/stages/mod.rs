//! Concrete pipeline stages and pipeline assembly.
//!
//! Both supported pipelines run the same five-stage sequence; they differ in
//! the default artifact kind the analysis stage assumes and in how planning
//! and validation treat localization.

use std::sync::Arc;

use crate::content::ContentKind;
use crate::generation::fallback::FallbackEngine;
use crate::guidelines::{GuidelineError, GuidelineKind, GuidelineStore};
use crate::partition::GradeDomain;
use crate::pipeline::executor::Pipeline;
use crate::session::{keys, SessionState, SessionValue};

pub mod analysis;
pub mod generation;
pub mod planning;
pub mod targeting;
pub mod validation;

pub use analysis::RequestAnalysisStage;
pub use generation::GenerationStage;
pub use planning::PlanningStage;
pub use targeting::TargetingStage;
pub use validation::ValidationStage;

/// Which content pipeline to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Differentiated worksheets with questions and answer keys.
    Worksheet,
    /// Localized narrative lesson content.
    Lesson,
}

impl PipelineKind {
    /// Artifact kind assumed when the request names none.
    pub fn default_content_kind(&self) -> ContentKind {
        match self {
            PipelineKind::Worksheet => ContentKind::Worksheet,
            PipelineKind::Lesson => ContentKind::Story,
        }
    }
}

/// Assembles the standard five-stage pipeline.
pub fn build_pipeline(
    kind: PipelineKind,
    engine: Arc<FallbackEngine>,
    domain: GradeDomain,
) -> Result<Pipeline, regex::Error> {
    Ok(Pipeline::new(vec![
        Box::new(RequestAnalysisStage::new(kind.default_content_kind())?),
        Box::new(TargetingStage::new(domain)),
        Box::new(PlanningStage::new()),
        Box::new(GenerationStage::new(engine)),
        Box::new(ValidationStage::new()),
    ]))
}

/// Creates a session seeded with the request and both guideline documents.
pub fn seed_state(
    request: impl Into<String>,
    store: &GuidelineStore,
) -> Result<SessionState, GuidelineError> {
    let mut state = SessionState::for_request(request);
    state.set(
        keys::GRADE_GUIDELINES,
        SessionValue::Text(store.get(GuidelineKind::Grade)?.to_string()),
    );
    state.set(
        keys::CULTURAL_GUIDELINES,
        SessionValue::Text(store.get(GuidelineKind::Cultural)?.to_string()),
    );
    Ok(state)
}
