//! Sequential pipeline executor.
//!
//! Runs stages in order against a shared session state. Structural failures
//! (missing dependencies, exhausted generation) abort the pass; recoverable
//! stage failures are replaced by the stage's degraded output so the pass can
//! finish.

use thiserror::Error;
use tracing::{debug, warn};

use crate::pipeline::stage::{Stage, StageError};
use crate::session::SessionState;

/// Fatal pipeline failures that abort the current pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage's declared input was absent, indicating a mis-assembled
    /// pipeline rather than bad content.
    #[error("Stage '{stage}' requires session key '{key}' which is missing")]
    MissingDependency { stage: &'static str, key: String },

    /// A stage ran out of production paths for its output.
    #[error("Stage '{stage}' exhausted all generation paths: {reason}")]
    GenerationExhausted { stage: &'static str, reason: String },
}

/// An ordered sequence of stages sharing one session state.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage once, in order.
    ///
    /// Each stage's declared inputs are checked before it runs; its output is
    /// written under its declared output key. A stage that fails with
    /// [`StageError::Internal`] contributes its degraded output instead, and
    /// the pass continues.
    pub async fn run(&self, state: &mut SessionState) -> Result<(), PipelineError> {
        for stage in &self.stages {
            for key in stage.required_keys() {
                if !state.has(key) {
                    return Err(PipelineError::MissingDependency {
                        stage: stage.name(),
                        key: (*key).to_string(),
                    });
                }
            }

            let output = match stage.transform(state).await {
                Ok(output) => {
                    debug!(stage = stage.name(), "stage completed");
                    output
                }
                Err(StageError::MissingDependency { key }) => {
                    return Err(PipelineError::MissingDependency {
                        stage: stage.name(),
                        key,
                    });
                }
                Err(StageError::Exhausted(reason)) => {
                    return Err(PipelineError::GenerationExhausted {
                        stage: stage.name(),
                        reason,
                    });
                }
                Err(StageError::Internal(message)) => {
                    warn!(stage = stage.name(), error = %message, "stage degraded");
                    stage.degraded_output(state)
                }
            };
            state.set(stage.output_key(), output);
        }
        Ok(())
    }
}
