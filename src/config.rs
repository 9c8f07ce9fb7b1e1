use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_ERROR_LOG_PATH: &str = "./logs/error.log";
const DEFAULT_SEED_PER_COMBO: usize = 10;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_OPENCODE_ENDPOINT: &str = "http://localhost:4096";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: String,
    pub frontend_origin: String,
    pub error_log_path: PathBuf,
    pub seed: SeedConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedConfig {
    pub enabled: bool,
    pub per_combo: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_string("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let host = env_string("HOST")
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = env_string("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let jwt_secret = env_string("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            host,
            port,
            log_level,
            jwt_secret,
            frontend_origin: env_string("FRONTEND_ORIGIN")
                .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_string()),
            error_log_path: env_string("ERROR_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_LOG_PATH)),
            seed: SeedConfig {
                enabled: env_bool("SEED_QUESTION_BANK").unwrap_or(false),
                per_combo: env_string("SEED_QUESTIONS_PER_COMBO")
                    .and_then(|value| value.parse::<usize>().ok())
                    .unwrap_or(DEFAULT_SEED_PER_COMBO),
            },
            ai: AiConfig::from_env()?,
        })
    }

    /// Configuration for tests and tooling: no providers configured, nothing seeded.
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            log_level: "info".to_string(),
            jwt_secret: jwt_secret.into(),
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG_PATH),
            seed: SeedConfig {
                enabled: false,
                per_combo: DEFAULT_SEED_PER_COMBO,
            },
            ai: AiConfig::default(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Opencode,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "opencode" => Ok(Self::Opencode),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct OpencodeConfig {
    pub endpoint: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub primary: ProviderKind,
    pub secondary: ProviderKind,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
    pub opencode: OpencodeConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            primary: ProviderKind::Gemini,
            secondary: ProviderKind::Opencode,
            gemini: GeminiConfig {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            },
            openai: OpenAiConfig {
                api_key: None,
                model: DEFAULT_OPENAI_MODEL.to_string(),
                endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            },
            opencode: OpencodeConfig {
                endpoint: DEFAULT_OPENCODE_ENDPOINT.to_string(),
                session_id: None,
            },
        }
    }
}

impl AiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let (mut primary, mut secondary) = (defaults.primary, defaults.secondary);
        if env_bool("USE_OPENCODE_PRIMARY").unwrap_or(false) {
            std::mem::swap(&mut primary, &mut secondary);
        }
        if let Some(raw) = env_string("AI_PRIMARY_PROVIDER") {
            primary = parse_provider("AI_PRIMARY_PROVIDER", &raw)?;
        }
        if let Some(raw) = env_string("AI_SECONDARY_PROVIDER") {
            secondary = parse_provider("AI_SECONDARY_PROVIDER", &raw)?;
        }

        Ok(Self {
            primary,
            secondary,
            gemini: GeminiConfig {
                api_key: env_string("GEMINI_API_KEY"),
                model: env_string("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
                endpoint: env_string("GEMINI_ENDPOINT").unwrap_or(defaults.gemini.endpoint),
            },
            openai: OpenAiConfig {
                api_key: env_string("OPENAI_API_KEY"),
                model: env_string("OPENAI_MODEL").unwrap_or(defaults.openai.model),
                endpoint: env_string("OPENAI_API_ENDPOINT").unwrap_or(defaults.openai.endpoint),
            },
            opencode: OpencodeConfig {
                endpoint: env_string("OPENCODE_ENDPOINT").unwrap_or(defaults.opencode.endpoint),
                session_id: env_string("OPENCODE_SESSION_ID"),
            },
        })
    }
}

fn parse_provider(key: &'static str, raw: &str) -> Result<ProviderKind, ConfigError> {
    raw.parse::<ProviderKind>()
        .map_err(|value| ConfigError::Invalid { key, value })
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    match env_string(key)?.as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("Gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(" openai ".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("opencode".parse::<ProviderKind>(), Ok(ProviderKind::Opencode));
        assert!("claude".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_config_uses_defaults() {
        let config = Config::for_tests("secret");
        assert_eq!(config.jwt_secret, "secret");
        assert_eq!(config.ai.primary, ProviderKind::Gemini);
        assert_eq!(config.ai.secondary, ProviderKind::Opencode);
        assert!(!config.seed.enabled);
    }
}
