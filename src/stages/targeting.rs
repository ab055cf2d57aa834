//! Targeting stage: picks the grade levels to differentiate for.

use async_trait::async_trait;

use crate::content::{Complexity, SourceAnalysis};
use crate::partition::{partition_targets, GradeDomain};
use crate::pipeline::stage::{Stage, StageError};
use crate::session::{keys, SessionState, SessionValue};

/// Applies the target partitioner to the analysis result.
pub struct TargetingStage {
    domain: GradeDomain,
}

impl TargetingStage {
    pub fn new(domain: GradeDomain) -> Self {
        Self { domain }
    }
}

#[async_trait]
impl Stage for TargetingStage {
    fn name(&self) -> &'static str {
        "targeting"
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::SOURCE_ANALYSIS]
    }

    fn output_key(&self) -> &'static str {
        keys::TARGET_PLAN
    }

    async fn transform(&self, state: &SessionState) -> Result<SessionValue, StageError> {
        let analysis = state
            .analysis()
            .ok_or_else(|| StageError::MissingDependency {
                key: keys::SOURCE_ANALYSIS.to_string(),
            })?;
        let targets = partition_targets(analysis.estimated_level, analysis.complexity, self.domain);
        Ok(SessionValue::Targets(targets))
    }

    fn degraded_output(&self, state: &SessionState) -> SessionValue {
        let fallback = SourceAnalysis::fallback(state.request().unwrap_or_default());
        SessionValue::Targets(partition_targets(
            fallback.estimated_level,
            Complexity::Medium,
            self.domain,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::stages::analysis::RequestAnalysisStage;

    #[tokio::test]
    async fn targets_follow_the_analysis() {
        let analysis = RequestAnalysisStage::new(ContentKind::Worksheet)
            .unwrap()
            .analyze("worksheet on fractions for grade 6");
        let mut state = SessionState::for_request("worksheet on fractions for grade 6");
        state.set(keys::SOURCE_ANALYSIS, SessionValue::Analysis(analysis));

        let stage = TargetingStage::new(GradeDomain::default());
        let value = stage.transform(&state).await.unwrap();
        assert_eq!(value.as_targets().unwrap().grades(), &[5, 6, 7]);
    }

    #[tokio::test]
    async fn wrong_variant_surfaces_missing_dependency() {
        let mut state = SessionState::new();
        state.set(keys::SOURCE_ANALYSIS, SessionValue::Text("oops".into()));
        let stage = TargetingStage::new(GradeDomain::default());
        let err = stage.transform(&state).await.unwrap_err();
        assert!(matches!(err, StageError::MissingDependency { .. }));
    }

    #[test]
    fn degraded_output_still_yields_three_targets() {
        let stage = TargetingStage::new(GradeDomain::default());
        let value = stage.degraded_output(&SessionState::new());
        assert_eq!(value.as_targets().unwrap().len(), 3);
    }
}
