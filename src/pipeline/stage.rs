//! Stage abstraction for the sequential content pipeline.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{SessionState, SessionValue};

/// Errors a stage can raise from [`Stage::transform`].
#[derive(Debug, Error)]
pub enum StageError {
    /// A declared input key is missing from the session state.
    #[error("Required session key '{key}' is missing")]
    MissingDependency { key: String },

    /// Every production path for this stage's output is spent.
    #[error("Generation exhausted: {0}")]
    Exhausted(String),

    /// Recoverable internal failure; the executor substitutes the stage's
    /// degraded output.
    #[error("{0}")]
    Internal(String),
}

/// One step of the content pipeline.
///
/// A stage declares the session keys it reads and the single key it writes.
/// The executor enforces the read contract before calling
/// [`transform`](Stage::transform) and owns the write, so a stage never
/// mutates the session directly.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logs and error context.
    fn name(&self) -> &'static str;

    /// Session keys that must be present before this stage runs.
    fn required_keys(&self) -> &[&'static str];

    /// The session key this stage's output is stored under.
    fn output_key(&self) -> &'static str;

    /// Computes this stage's output from the session state.
    async fn transform(&self, state: &SessionState) -> Result<SessionValue, StageError>;

    /// Neutral output substituted when [`transform`](Stage::transform) fails
    /// with [`StageError::Internal`].
    fn degraded_output(&self, state: &SessionState) -> SessionValue;
}
