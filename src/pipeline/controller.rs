//! Bounded quality-gated run loop.
//!
//! The controller runs the pipeline up to a fixed number of passes, asking
//! the quality gate after each one whether to stop. Loop progress is an
//! explicit state machine, not a flag buried in the session: every run ends
//! in exactly one of `Accepted`, `Exhausted`, or `Failed`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::content::{ArtifactSet, QualityScore};
use crate::pipeline::executor::{Pipeline, PipelineError};
use crate::pipeline::gate::{Decision, QualityGate};
use crate::session::{keys, SessionState, SessionValue};

/// Loop progress states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No pass has started yet.
    Idle,
    /// Pass `n` (1-based) is executing.
    Running(u32),
    /// The gate accepted a pass's output.
    Accepted,
    /// The iteration budget ran out without acceptance.
    Exhausted,
    /// A pass failed structurally.
    Failed,
}

/// How a run ended when it produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The quality gate accepted the output.
    Accepted,
    /// The budget ran out; the last pass's artifacts are returned as-is.
    Exhausted,
}

/// Per-pass verdict recorded in the run history.
///
/// The last record's decision matches the run outcome: `Accept` for accepted
/// runs, `Exhausted` when the budget ran out on that pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationDecision {
    /// The gate asked for another pass.
    Continue,
    /// The gate accepted this pass's output.
    Accept,
    /// This pass was the last one the budget allowed, without acceptance.
    Exhausted,
}

/// One pass's result, for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IterationRecord {
    /// 1-based pass index.
    pub index: u32,
    /// Quality score the pass ended with.
    pub score: QualityScore,
    /// Verdict for the pass.
    pub decision: IterationDecision,
}

/// Final result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    /// Artifacts from the accepting pass, or the last pass on exhaustion.
    pub artifacts: ArtifactSet,
    pub final_score: QualityScore,
    /// Per-pass history, in order.
    pub iterations: Vec<IterationRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn passes(&self) -> u32 {
        self.iterations.len() as u32
    }
}

/// Errors that end a run without a report.
#[derive(Debug, Error)]
pub enum RunError {
    /// A pass failed structurally.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The budget ran out and no pass produced a single artifact.
    #[error("Run exhausted after {iterations} iterations with no artifacts")]
    ExhaustedEmpty { iterations: u32 },
}

/// Drives the pipeline through the bounded quality loop.
pub struct LoopController {
    pipeline: Pipeline,
    gate: QualityGate,
    max_iterations: u32,
}

impl LoopController {
    pub fn new(pipeline: Pipeline, gate: QualityGate, max_iterations: u32) -> Self {
        Self {
            pipeline,
            gate,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Runs the loop to completion over the given session.
    pub async fn run(&self, mut state: SessionState) -> Result<RunReport, RunError> {
        let mut run_state = RunState::Idle;
        let mut iterations = Vec::new();
        debug!(run_id = %state.run_id(), ?run_state, budget = self.max_iterations, "run created");

        for pass in 1..=self.max_iterations {
            run_state = RunState::Running(pass);
            state.set(keys::ITERATION_COUNT, SessionValue::Integer(pass as i64));
            info!(run_id = %state.run_id(), ?run_state, "starting pipeline pass");

            if let Err(e) = self.pipeline.run(&mut state).await {
                run_state = RunState::Failed;
                warn!(run_id = %state.run_id(), ?run_state, pass, error = %e, "pass failed");
                return Err(RunError::Pipeline(e));
            }

            let score = state
                .quality_score()
                .unwrap_or(QualityScore::new(0, QualityScore::DEFAULT_MAX));
            let decision = self.gate.evaluate(&state);
            iterations.push(IterationRecord {
                index: pass,
                score,
                decision: match decision {
                    Decision::Accept => IterationDecision::Accept,
                    Decision::Continue => IterationDecision::Continue,
                },
            });
            info!(run_id = %state.run_id(), pass, %score, ?decision, "pass evaluated");

            if decision == Decision::Accept {
                run_state = RunState::Accepted;
                info!(run_id = %state.run_id(), ?run_state, pass, "run accepted");
                return Ok(self.report(&state, RunOutcome::Accepted, iterations));
            }
        }

        run_state = RunState::Exhausted;
        if let Some(last) = iterations.last_mut() {
            last.decision = IterationDecision::Exhausted;
        }
        let has_artifacts = state.artifacts().map(|a| !a.is_empty()).unwrap_or(false);
        if !has_artifacts {
            return Err(RunError::ExhaustedEmpty {
                iterations: self.max_iterations,
            });
        }
        warn!(
            run_id = %state.run_id(),
            ?run_state,
            iterations = self.max_iterations,
            "budget exhausted, returning last pass output"
        );
        Ok(self.report(&state, RunOutcome::Exhausted, iterations))
    }

    fn report(
        &self,
        state: &SessionState,
        outcome: RunOutcome,
        iterations: Vec<IterationRecord>,
    ) -> RunReport {
        RunReport {
            run_id: state.run_id(),
            outcome,
            artifacts: state.artifacts().cloned().unwrap_or_default(),
            final_score: state
                .quality_score()
                .unwrap_or(QualityScore::new(0, QualityScore::DEFAULT_MAX)),
            iterations,
            started_at: state.started_at(),
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ArtifactRecord, GenerationMethod};
    use crate::pipeline::stage::{Stage, StageError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Writes a score that depends on the pass number.
    struct ScriptedPass {
        scores: Vec<u32>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Stage for ScriptedPass {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn required_keys(&self) -> &[&'static str] {
            &[]
        }

        fn output_key(&self) -> &'static str {
            keys::QUALITY_SCORE
        }

        async fn transform(&self, state: &SessionState) -> Result<SessionValue, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let pass = state.iteration() as usize;
            let points = self.scores[(pass - 1).min(self.scores.len() - 1)];
            Ok(SessionValue::Score(QualityScore::new(
                points,
                QualityScore::DEFAULT_MAX,
            )))
        }

        fn degraded_output(&self, _state: &SessionState) -> SessionValue {
            SessionValue::Score(QualityScore::new(0, QualityScore::DEFAULT_MAX))
        }
    }

    struct EmitArtifacts;

    #[async_trait]
    impl Stage for EmitArtifacts {
        fn name(&self) -> &'static str {
            "emit"
        }

        fn required_keys(&self) -> &[&'static str] {
            &[]
        }

        fn output_key(&self) -> &'static str {
            keys::GENERATED_ARTIFACTS
        }

        async fn transform(&self, _state: &SessionState) -> Result<SessionValue, StageError> {
            let mut set = ArtifactSet::new();
            set.insert(ArtifactRecord::new("text", GenerationMethod::Templated, 5).unwrap());
            Ok(SessionValue::Artifacts(set))
        }

        fn degraded_output(&self, _state: &SessionState) -> SessionValue {
            SessionValue::Artifacts(ArtifactSet::new())
        }
    }

    struct AlwaysExhausted;

    #[async_trait]
    impl Stage for AlwaysExhausted {
        fn name(&self) -> &'static str {
            "exhausted"
        }

        fn required_keys(&self) -> &[&'static str] {
            &[]
        }

        fn output_key(&self) -> &'static str {
            keys::GENERATED_ARTIFACTS
        }

        async fn transform(&self, _state: &SessionState) -> Result<SessionValue, StageError> {
            Err(StageError::Exhausted("no synthesis path".to_string()))
        }

        fn degraded_output(&self, _state: &SessionState) -> SessionValue {
            SessionValue::Artifacts(ArtifactSet::new())
        }
    }

    fn controller(scores: Vec<u32>, with_artifacts: bool, calls: Arc<AtomicU32>) -> LoopController {
        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if with_artifacts {
            stages.push(Box::new(EmitArtifacts));
        }
        stages.push(Box::new(ScriptedPass { scores, calls }));
        LoopController::new(Pipeline::new(stages), QualityGate::new(40, 0.6), 2)
    }

    #[tokio::test]
    async fn accepts_on_first_pass() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = controller(vec![45], true, calls.clone());
        let report = c.run(SessionState::for_request("r")).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(report.passes(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.final_score.points, 45);
    }

    #[tokio::test]
    async fn retries_then_accepts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = controller(vec![10, 42], true, calls.clone());
        let report = c.run(SessionState::for_request("r")).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(report.passes(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.iterations[0].decision, IterationDecision::Continue);
        assert_eq!(report.iterations[1].decision, IterationDecision::Accept);
    }

    #[tokio::test]
    async fn exhaustion_with_artifacts_returns_report() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = controller(vec![10, 12], true, calls.clone());
        let report = c.run(SessionState::for_request("r")).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.passes(), 2);
        assert!(!report.artifacts.is_empty());
        assert_eq!(report.final_score.points, 12);
        assert_eq!(report.iterations[0].decision, IterationDecision::Continue);
        assert_eq!(
            report.iterations.last().unwrap().decision,
            IterationDecision::Exhausted
        );
    }

    #[tokio::test]
    async fn exhaustion_without_artifacts_is_an_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = controller(vec![10, 12], false, calls.clone());
        let err = c.run(SessionState::for_request("r")).await.unwrap_err();
        assert!(matches!(err, RunError::ExhaustedEmpty { iterations: 2 }));
    }

    #[tokio::test]
    async fn structural_failure_ends_the_run() {
        let pipeline = Pipeline::new(vec![Box::new(AlwaysExhausted)]);
        let c = LoopController::new(pipeline, QualityGate::new(40, 0.6), 2);
        let err = c.run(SessionState::for_request("r")).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Pipeline(PipelineError::GenerationExhausted { .. })
        ));
    }

    #[tokio::test]
    async fn relaxed_acceptance_applies_with_artifacts() {
        let calls = Arc::new(AtomicU32::new(0));
        // 25 < 40 but >= 24 relaxed bar, and artifacts exist.
        let c = controller(vec![25], true, calls.clone());
        let report = c.run(SessionState::for_request("r")).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(report.passes(), 1);
    }
}
