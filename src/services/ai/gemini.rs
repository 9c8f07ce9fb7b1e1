use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GeminiConfig;
use crate::services::ai::{envelope_error, send_json, AiProvider, ProviderError, GENERATION_TEMPERATURE};

#[derive(Clone)]
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default()
    }
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("GEMINI_API_KEY"))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": GENERATION_TEMPERATURE,
                "maxOutputTokens": max_tokens,
                "responseMimeType": "application/json"
            }
        });

        tracing::debug!(model = %self.config.model, "sending Gemini request");
        let response: GenerateContentResponse = send_json(
            self.client
                .post(url)
                .query(&[("key", api_key)])
                .json(&payload),
        )
        .await?;

        if let Some(message) = envelope_error(response.error.as_ref()) {
            return Err(ProviderError::Api(message));
        }
        Ok(response.first_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_reads_nested_payload() {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"score\": 80}" }] } }]
        });
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.first_text(), "{\"score\": 80}");
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(response.first_text(), "");
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = GeminiProvider::new(
            GeminiConfig {
                api_key: None,
                model: "m".into(),
                endpoint: "http://127.0.0.1:9".into(),
            },
            reqwest::Client::new(),
        );
        let err = provider.generate("hi", 10).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured("GEMINI_API_KEY")));
    }
}
