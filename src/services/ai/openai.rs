use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::services::ai::{envelope_error, send_json, AiProvider, ProviderError, GENERATION_TEMPERATURE};

/// Any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatUsage {
    total_tokens: Option<i64>,
}

impl ChatResponse {
    fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", normalize_endpoint(&self.config.endpoint))
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ProviderError::NotConfigured("OPENAI_API_KEY"))?;

        let messages = [ChatMessage {
            role: "user".into(),
            content: prompt.into(),
        }];
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": GENERATION_TEMPERATURE,
            "max_tokens": max_tokens,
            "stream": false
        });

        let response: ChatResponse = send_json(
            self.client
                .post(self.completions_url())
                .bearer_auth(api_key)
                .json(&payload),
        )
        .await?;

        if let Some(message) = envelope_error(response.error.as_ref()) {
            return Err(ProviderError::Api(message));
        }

        tracing::debug!(
            model = response.model.as_deref().unwrap_or(&self.config.model),
            total_tokens = response.usage.as_ref().and_then(|u| u.total_tokens),
            "chat completion received"
        );
        Ok(response.first_content().unwrap_or_default().to_string())
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}
