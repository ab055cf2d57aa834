//! External generation backend interface and HTTP client.
//!
//! The pipeline core never assumes the backend succeeds: any failure surfaces
//! as a [`BackendError`] that the fallback engine converts into deterministic
//! template synthesis. The bundled [`GenAiClient`] speaks an OpenAI-compatible
//! chat-completions endpoint.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the external generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failure (timeout, connection refused, ...).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The backend signalled throttling.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Non-throttling API error.
    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    /// The response parsed but contained no usable candidate text.
    #[error("Backend returned no completion candidates")]
    EmptyCompletion,

    /// Failed to parse the backend response.
    #[error("Failed to parse backend response: {0}")]
    ParseError(String),

    /// The client could not be constructed.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A natural-language generation backend: prompt in, text out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generates text for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Client-side delay applied immediately before rate-limited external calls.
///
/// This is a one-shot pacing measure, not a retry schedule; if the call still
/// fails, template fallback applies within the same iteration.
pub trait DelayPolicy: Send + Sync {
    /// Delay to apply before the given 1-based attempt.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Uniformly random delay between two bounds, independent of attempt count.
#[derive(Debug, Clone)]
pub struct JitterDelay {
    min_ms: u64,
    max_ms: u64,
}

impl JitterDelay {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        let (min_ms, max_ms) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self { min_ms, max_ms }
    }
}

impl Default for JitterDelay {
    fn default() -> Self {
        Self::new(500, 1500)
    }
}

impl DelayPolicy for JitterDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Zero delay, for tests and offline synthesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayPolicy for NoDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug)]
pub struct GenAiClient {
    api_base: String,
    api_key: Option<String>,
    model: String,
    http_client: Client,
}

impl GenAiClient {
    /// Creates a client with explicit configuration.
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
    ) -> Result<Self, BackendError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(Self {
            api_base,
            api_key,
            model,
            http_client,
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `GENAI_API_BASE` (required), `GENAI_API_KEY` (optional) and
    /// `GENAI_MODEL` (defaults to the given model).
    pub fn from_env(default_model: &str) -> Result<Self, BackendError> {
        let api_base = env::var("GENAI_API_BASE")
            .map_err(|_| BackendError::Unavailable("GENAI_API_BASE not set".to_string()))?;
        let api_key = env::var("GENAI_API_KEY").ok();
        let model = env::var("GENAI_MODEL").unwrap_or_else(|_| default_model.to_string());
        Self::new(api_base, api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl GenerationBackend for GenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request = ApiRequest {
            model: &self.model,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(ref api_key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = http_request
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            if code == 429 {
                return Err(BackendError::RateLimited(message));
            }
            return Err(BackendError::ApiError { code, message });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(BackendError::EmptyCompletion)?;
        if text.trim().is_empty() {
            return Err(BackendError::EmptyCompletion);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_delay_stays_in_bounds() {
        let policy = JitterDelay::new(10, 20);
        for attempt in 1..=50 {
            let d = policy.delay(attempt);
            assert!(d >= Duration::from_millis(10));
            assert!(d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn jitter_delay_normalizes_inverted_bounds() {
        let policy = JitterDelay::new(30, 5);
        let d = policy.delay(1);
        assert!(d >= Duration::from_millis(5));
        assert!(d <= Duration::from_millis(30));
    }

    #[test]
    fn no_delay_is_zero() {
        assert_eq!(NoDelay.delay(3), Duration::ZERO);
    }

    #[test]
    fn client_from_env_requires_api_base() {
        // Runs in-process; only asserts the missing-variable path.
        std::env::remove_var("GENAI_API_BASE");
        let err = GenAiClient::from_env("test-model").unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
