use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OpencodeConfig;
use crate::services::ai::{envelope_error, send_json, AiProvider, ProviderError};

/// Session-message endpoint of a local opencode server.
#[derive(Clone)]
pub struct OpencodeProvider {
    config: OpencodeConfig,
    client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageResponse {
    parts: Vec<MessagePart>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessagePart {
    text: Option<String>,
}

impl OpencodeProvider {
    pub fn new(config: OpencodeConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl AiProvider for OpencodeProvider {
    fn name(&self) -> &'static str {
        "opencode"
    }

    // The session endpoint takes no sampling options; the token budget is advisory here.
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        let session_id = self
            .config
            .session_id
            .as_deref()
            .ok_or(ProviderError::NotConfigured("OPENCODE_SESSION_ID"))?;

        let url = format!(
            "{}/session/{}/message",
            self.config.endpoint.trim_end_matches('/'),
            session_id
        );
        let payload = serde_json::json!({
            "parts": [{ "type": "text", "text": prompt }]
        });

        tracing::debug!(%url, "sending opencode request");
        let response: MessageResponse = send_json(self.client.post(url).json(&payload)).await?;

        if let Some(message) = envelope_error(response.error.as_ref()) {
            return Err(ProviderError::Api(message));
        }
        Ok(response
            .parts
            .into_iter()
            .next()
            .and_then(|part| part.text)
            .unwrap_or_default())
    }
}
