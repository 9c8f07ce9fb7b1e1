//! Outbound language-model calls.
//!
//! [`AiGateway`] sends one prompt to the primary provider and, when that attempt fails for
//! any reason, repeats it once against the secondary provider. There are no retries inside a
//! single provider: every caller has a static fallback, so a failure falls straight through.

pub mod gemini;
pub mod json;
pub mod openai;
pub mod opencode;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AiConfig, ProviderKind};

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use opencode::OpencodeProvider;

pub const GENERATION_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API returned status {status}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("API error: {0}")]
    Api(String),
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One language-model HTTP endpoint adapted to a plain prompt-in, text-out call.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCompletion {
    pub text: String,
    pub provider: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} failed: {message}")]
pub struct AiFailure {
    pub provider: &'static str,
    pub message: String,
}

#[derive(Clone)]
pub struct AiGateway {
    primary: Arc<dyn AiProvider>,
    secondary: Arc<dyn AiProvider>,
}

impl AiGateway {
    pub fn new(primary: Arc<dyn AiProvider>, secondary: Arc<dyn AiProvider>) -> Self {
        Self { primary, secondary }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            primary: build_provider(config.primary, config, client.clone()),
            secondary: build_provider(config.secondary, config, client),
        }
    }

    pub fn provider_names(&self) -> (&'static str, &'static str) {
        (self.primary.name(), self.secondary.name())
    }

    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<AiCompletion, AiFailure> {
        let primary = self.primary.name();
        match self.primary.generate(prompt, max_tokens).await {
            Ok(text) => {
                debug!(provider = primary, "AI request succeeded");
                return Ok(AiCompletion {
                    text,
                    provider: primary,
                });
            }
            Err(err) => {
                warn!(provider = primary, error = %err, "AI provider failed, trying fallback provider");
            }
        }

        let secondary = self.secondary.name();
        match self.secondary.generate(prompt, max_tokens).await {
            Ok(text) => {
                debug!(provider = secondary, "AI request succeeded");
                Ok(AiCompletion {
                    text,
                    provider: secondary,
                })
            }
            Err(err) => {
                warn!(provider = secondary, error = %err, "AI fallback provider failed");
                Err(AiFailure {
                    provider: secondary,
                    message: err.to_string(),
                })
            }
        }
    }
}

fn build_provider(
    kind: ProviderKind,
    config: &AiConfig,
    client: reqwest::Client,
) -> Arc<dyn AiProvider> {
    match kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config.gemini.clone(), client)),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config.openai.clone(), client)),
        ProviderKind::Opencode => Arc::new(OpencodeProvider::new(config.opencode.clone(), client)),
    }
}

/// Sends a request and decodes the success body, mapping non-2xx statuses to errors.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::HttpStatus { status, body });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Reads the error member some providers put into a 200 response.
pub(crate) fn envelope_error(error: Option<&serde_json::Value>) -> Option<String> {
    match error? {
        serde_json::Value::Null => None,
        serde_json::Value::String(message) => Some(message.clone()),
        other => Some(
            other
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        ),
    }
}
