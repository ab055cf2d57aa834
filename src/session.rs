//! Per-run mutable session state shared by all pipeline stages.
//!
//! The store is exclusively owned by one run: stages and the loop controller
//! are its only writers, and it is dropped when the run completes. Keys come
//! from the fixed schema in [`keys`]; values are the closed [`SessionValue`]
//! set, never untyped maps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{ArtifactSet, PlanSet, QualityScore, SourceAnalysis};
use crate::partition::TargetSet;

/// Fixed session key schema.
pub mod keys {
    /// The free-text request the run was started with.
    pub const REQUEST: &str = "request";
    /// `SourceAnalysis` written by the analysis stage.
    pub const SOURCE_ANALYSIS: &str = "source_analysis";
    /// `TargetSet` written by the targeting stage.
    pub const TARGET_PLAN: &str = "target_plan";
    /// `PlanSet` written by the planning stage.
    pub const CONTENT_PLANS: &str = "content_plans";
    /// `ArtifactSet` written by the generation stage, overwritten per pass.
    pub const GENERATED_ARTIFACTS: &str = "generated_artifacts";
    /// `QualityScore` written by the validation stage, overwritten per pass.
    pub const QUALITY_SCORE: &str = "quality_score";
    /// Current 1-based iteration, written by the loop controller.
    pub const ITERATION_COUNT: &str = "iteration_count";
    /// Grade guideline document text, seeded before the run.
    pub const GRADE_GUIDELINES: &str = "grade_guidelines";
    /// Cultural guideline document text, seeded before the run.
    pub const CULTURAL_GUIDELINES: &str = "cultural_guidelines";
}

/// A value stored in the session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SessionValue {
    Text(String),
    Integer(i64),
    Analysis(SourceAnalysis),
    Targets(TargetSet),
    Plans(PlanSet),
    Artifacts(ArtifactSet),
    Score(QualityScore),
}

impl SessionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SessionValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SessionValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_analysis(&self) -> Option<&SourceAnalysis> {
        match self {
            SessionValue::Analysis(analysis) => Some(analysis),
            _ => None,
        }
    }

    pub fn as_targets(&self) -> Option<&TargetSet> {
        match self {
            SessionValue::Targets(targets) => Some(targets),
            _ => None,
        }
    }

    pub fn as_plans(&self) -> Option<&PlanSet> {
        match self {
            SessionValue::Plans(plans) => Some(plans),
            _ => None,
        }
    }

    pub fn as_artifacts(&self) -> Option<&ArtifactSet> {
        match self {
            SessionValue::Artifacts(artifacts) => Some(artifacts),
            _ => None,
        }
    }

    pub fn as_score(&self) -> Option<QualityScore> {
        match self {
            SessionValue::Score(score) => Some(*score),
            _ => None,
        }
    }
}

/// Keyed, mutable state for a single pipeline run.
#[derive(Debug, Clone)]
pub struct SessionState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    values: HashMap<String, SessionValue>,
}

impl SessionState {
    /// Creates an empty session with a fresh run id and start timestamp.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            values: HashMap::new(),
        }
    }

    /// Creates a session seeded with the request text.
    pub fn for_request(request: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.set(keys::REQUEST, SessionValue::Text(request.into()));
        state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.values.get(key)
    }

    /// Stores `value` under `key`, overwriting any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: SessionValue) {
        self.values.insert(key.into(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    // Typed accessors for schema keys.

    pub fn request(&self) -> Option<&str> {
        self.get(keys::REQUEST).and_then(SessionValue::as_text)
    }

    pub fn analysis(&self) -> Option<&SourceAnalysis> {
        self.get(keys::SOURCE_ANALYSIS)
            .and_then(SessionValue::as_analysis)
    }

    pub fn targets(&self) -> Option<&TargetSet> {
        self.get(keys::TARGET_PLAN)
            .and_then(SessionValue::as_targets)
    }

    pub fn plans(&self) -> Option<&PlanSet> {
        self.get(keys::CONTENT_PLANS)
            .and_then(SessionValue::as_plans)
    }

    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        self.get(keys::GENERATED_ARTIFACTS)
            .and_then(SessionValue::as_artifacts)
    }

    pub fn quality_score(&self) -> Option<QualityScore> {
        self.get(keys::QUALITY_SCORE)
            .and_then(SessionValue::as_score)
    }

    /// Current iteration count, zero before the first pass.
    pub fn iteration(&self) -> u32 {
        self.get(keys::ITERATION_COUNT)
            .and_then(SessionValue::as_integer)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
