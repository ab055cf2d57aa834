//! Run configuration for the quality-gated generation loop.
//!
//! All knobs carry environment-variable overrides so deployments can tune
//! thresholds without rebuilding. The relaxed acceptance factor is a policy
//! knob tuned to tolerate scorer flakiness, not a principled quality bar;
//! keep it configurable.

use std::path::PathBuf;

use thiserror::Error;

use crate::partition::GradeDomain;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Quality score a pass must reach for unconditional acceptance.
    pub threshold: u32,
    /// Maximum number of full pipeline passes.
    pub max_iterations: u32,
    /// Fraction of `threshold` accepted when artifacts exist (policy knob).
    pub relaxed_factor: f64,
    /// Valid grade domain for differentiation targets.
    pub grade_domain: GradeDomain,
    /// Model name passed to the generation backend.
    pub model: String,
    /// Directory holding the guideline documents.
    pub guidelines_dir: PathBuf,
    /// When true, skip the external backend and synthesize from templates only.
    pub offline: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: 40,
            max_iterations: 2,
            relaxed_factor: 0.6,
            grade_domain: GradeDomain::default(),
            model: "gemini-2.0-flash".to_string(),
            guidelines_dir: PathBuf::from("./guidelines"),
            offline: false,
        }
    }
}

impl RunConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `QUALITY_THRESHOLD`, `MAX_ITERATIONS`,
    /// `RELAXED_FACTOR`, `GENAI_MODEL`, `GUIDELINES_DIR`,
    /// `LESSON_FORGE_OFFLINE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = read_env("QUALITY_THRESHOLD")? {
            config.threshold = parse_env("QUALITY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("MAX_ITERATIONS")? {
            config.max_iterations = parse_env("MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("RELAXED_FACTOR")? {
            config.relaxed_factor = parse_env("RELAXED_FACTOR", &value)?;
        }
        if let Some(value) = read_env("GENAI_MODEL")? {
            config.model = value;
        }
        if let Some(value) = read_env("GUIDELINES_DIR")? {
            config.guidelines_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("LESSON_FORGE_OFFLINE")? {
            config.offline = parse_bool("LESSON_FORGE_OFFLINE", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.relaxed_factor) || self.relaxed_factor == 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "relaxed_factor must be in (0, 1], got {}",
                self.relaxed_factor
            )));
        }
        if self.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the acceptance threshold.
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the relaxed acceptance factor.
    pub fn with_relaxed_factor(mut self, relaxed_factor: f64) -> Self {
        self.relaxed_factor = relaxed_factor;
        self
    }
}

fn read_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
