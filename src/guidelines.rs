//! Static reference-guideline store.
//!
//! Guideline documents (grade-level expectations, cultural localization
//! rules) are JSON files read once at pipeline-construction time. Any load
//! failure is fatal before the run starts; per-iteration code only ever sees
//! documents that loaded cleanly.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading guideline documents.
#[derive(Debug, Error)]
pub enum GuidelineError {
    /// Failed to read a guideline file.
    #[error("Failed to read guideline file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A guideline file is not valid JSON.
    #[error("Guideline file '{path}' is not valid JSON: {message}")]
    Parse { path: PathBuf, message: String },

    /// A requested guideline kind was never loaded.
    #[error("Guideline document '{0}' not loaded")]
    Missing(&'static str),
}

/// The guideline documents the pipelines consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuidelineKind {
    /// Grade-level differentiation expectations.
    Grade,
    /// Cultural localization rules per region.
    Cultural,
}

impl GuidelineKind {
    /// File name the document is loaded from.
    pub fn file_name(&self) -> &'static str {
        match self {
            GuidelineKind::Grade => "grade_guidelines.json",
            GuidelineKind::Cultural => "cultural_guidelines.json",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            GuidelineKind::Grade => "grade",
            GuidelineKind::Cultural => "cultural",
        }
    }
}

/// In-memory store of guideline document text.
#[derive(Debug, Clone, Default)]
pub struct GuidelineStore {
    documents: HashMap<GuidelineKind, String>,
}

impl GuidelineStore {
    /// Loads both guideline documents from a directory.
    ///
    /// Each file must exist and parse as JSON; the raw text is stored so the
    /// documents can be embedded verbatim into prompts and plans.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, GuidelineError> {
        let dir = dir.as_ref();
        let mut documents = HashMap::new();
        for kind in [GuidelineKind::Grade, GuidelineKind::Cultural] {
            let path = dir.join(kind.file_name());
            let text = fs::read_to_string(&path).map_err(|source| GuidelineError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
                GuidelineError::Parse {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?;
            documents.insert(kind, text);
        }
        Ok(Self { documents })
    }

    /// Builds a store from in-memory documents (tests, embedded defaults).
    pub fn from_documents(grade: impl Into<String>, cultural: impl Into<String>) -> Self {
        let mut documents = HashMap::new();
        documents.insert(GuidelineKind::Grade, grade.into());
        documents.insert(GuidelineKind::Cultural, cultural.into());
        Self { documents }
    }

    /// Returns the raw text of a guideline document.
    pub fn get(&self, kind: GuidelineKind) -> Result<&str, GuidelineError> {
        self.documents
            .get(&kind)
            .map(String::as_str)
            .ok_or(GuidelineError::Missing(kind.label()))
    }
}
