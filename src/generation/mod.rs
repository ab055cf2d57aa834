//! Artifact generation: external backend, template synthesis, and the
//! fallback engine that chains them.

pub mod backend;
pub mod fallback;
pub mod templates;

pub use backend::{
    BackendError, DelayPolicy, GenAiClient, GenerationBackend, JitterDelay, NoDelay,
};
pub use fallback::{FallbackEngine, ProduceError};
pub use templates::{TemplateContext, TemplateError, TemplateLibrary};
