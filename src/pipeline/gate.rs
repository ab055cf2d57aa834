//! Quality gate: decides whether a pass's output is good enough to stop.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::SessionState;

/// Verdict of the quality gate for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The output is acceptable; stop iterating.
    Accept,
    /// The output is not acceptable; run another pass if the budget allows.
    Continue,
}

/// Threshold-based acceptance check over the session's quality score.
///
/// Two tiers: a score at or above the primary threshold always accepts, and a
/// relaxed threshold (`threshold * relaxed_factor`) accepts only when the
/// pass actually produced artifacts. An absent or malformed score counts as
/// zero, never as a pass.
#[derive(Debug, Clone)]
pub struct QualityGate {
    threshold: u32,
    relaxed_factor: f64,
}

impl QualityGate {
    pub fn new(threshold: u32, relaxed_factor: f64) -> Self {
        Self {
            threshold,
            relaxed_factor,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// The relaxed acceptance bar, applied only when artifacts exist.
    pub fn relaxed_threshold(&self) -> f64 {
        self.threshold as f64 * self.relaxed_factor
    }

    /// Evaluates the current pass.
    pub fn evaluate(&self, state: &SessionState) -> Decision {
        let score = state.quality_score().map(|s| s.points).unwrap_or(0);
        let has_artifacts = state.artifacts().map(|a| !a.is_empty()).unwrap_or(false);

        let decision = if has_artifacts && score as f64 >= self.relaxed_threshold() {
            Decision::Accept
        } else if score >= self.threshold {
            Decision::Accept
        } else {
            Decision::Continue
        };

        debug!(
            score,
            has_artifacts,
            threshold = self.threshold,
            relaxed = self.relaxed_threshold(),
            ?decision,
            "quality gate evaluated"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ArtifactRecord, ArtifactSet, GenerationMethod, QualityScore};
    use crate::session::{keys, SessionValue};

    fn state_with(score: Option<u32>, artifacts: bool) -> SessionState {
        let mut state = SessionState::new();
        if let Some(points) = score {
            state.set(
                keys::QUALITY_SCORE,
                SessionValue::Score(QualityScore::new(points, QualityScore::DEFAULT_MAX)),
            );
        }
        if artifacts {
            let mut set = ArtifactSet::new();
            set.insert(ArtifactRecord::new("content", GenerationMethod::Templated, 5).unwrap());
            state.set(keys::GENERATED_ARTIFACTS, SessionValue::Artifacts(set));
        }
        state
    }

    #[test]
    fn accepts_at_primary_threshold() {
        let gate = QualityGate::new(40, 0.6);
        assert_eq!(gate.evaluate(&state_with(Some(40), true)), Decision::Accept);
        assert_eq!(gate.evaluate(&state_with(Some(45), false)), Decision::Accept);
    }

    #[test]
    fn relaxed_tier_needs_artifacts() {
        let gate = QualityGate::new(40, 0.6);
        // 24 is exactly threshold * 0.6.
        assert_eq!(gate.evaluate(&state_with(Some(24), true)), Decision::Accept);
        assert_eq!(
            gate.evaluate(&state_with(Some(24), false)),
            Decision::Continue
        );
    }

    #[test]
    fn below_relaxed_continues_even_with_artifacts() {
        let gate = QualityGate::new(40, 0.6);
        assert_eq!(
            gate.evaluate(&state_with(Some(23), true)),
            Decision::Continue
        );
    }

    #[test]
    fn missing_score_counts_as_zero() {
        let gate = QualityGate::new(40, 0.6);
        assert_eq!(gate.evaluate(&state_with(None, true)), Decision::Continue);
        assert_eq!(gate.evaluate(&state_with(None, false)), Decision::Continue);
    }

    #[test]
    fn malformed_score_value_counts_as_zero() {
        let gate = QualityGate::new(40, 0.6);
        let mut state = state_with(None, true);
        state.set(keys::QUALITY_SCORE, SessionValue::Text("not a score".into()));
        assert_eq!(gate.evaluate(&state), Decision::Continue);
    }
}
