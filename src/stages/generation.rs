//! Generation stage: one artifact per target grade via the fallback engine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::content::ArtifactSet;
use crate::generation::fallback::{FallbackEngine, ProduceError};
use crate::pipeline::stage::{Stage, StageError};
use crate::session::{keys, SessionState, SessionValue};

/// Drives the fallback engine across the planned grades.
///
/// A subject with no synthesis path exhausts the whole stage immediately;
/// a per-grade synthesis failure only skips that grade. The stage is
/// exhausted if no grade produced an artifact.
pub struct GenerationStage {
    engine: Arc<FallbackEngine>,
}

impl GenerationStage {
    pub fn new(engine: Arc<FallbackEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Stage for GenerationStage {
    fn name(&self) -> &'static str {
        "generation"
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::SOURCE_ANALYSIS, keys::CONTENT_PLANS]
    }

    fn output_key(&self) -> &'static str {
        keys::GENERATED_ARTIFACTS
    }

    async fn transform(&self, state: &SessionState) -> Result<SessionValue, StageError> {
        let analysis = state
            .analysis()
            .ok_or_else(|| StageError::MissingDependency {
                key: keys::SOURCE_ANALYSIS.to_string(),
            })?;
        let plans = state
            .plans()
            .ok_or_else(|| StageError::MissingDependency {
                key: keys::CONTENT_PLANS.to_string(),
            })?;
        if plans.is_empty() {
            return Err(StageError::Exhausted("no grade plans to generate from".to_string()));
        }

        let mut artifacts = ArtifactSet::new();
        for (attempt, plan) in plans.plans.values().enumerate() {
            match self.engine.produce(analysis, plan, attempt as u32 + 1).await {
                Ok(record) => artifacts.insert(record),
                Err(ProduceError::UnknownCategory(subject)) => {
                    return Err(StageError::Exhausted(format!(
                        "no synthesis path for subject '{subject}'"
                    )));
                }
                Err(ProduceError::Synthesis(message)) => {
                    warn!(grade = plan.grade, error = %message, "skipping grade");
                }
            }
        }

        if artifacts.is_empty() {
            return Err(StageError::Exhausted(
                "no artifacts produced for any target grade".to_string(),
            ));
        }
        Ok(SessionValue::Artifacts(artifacts))
    }

    fn degraded_output(&self, _state: &SessionState) -> SessionValue {
        SessionValue::Artifacts(ArtifactSet::new())
    }
}
