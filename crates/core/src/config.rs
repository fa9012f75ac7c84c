use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    /// Fails with [`ConfigError::MissingApiKey`] when the key is absent or blank.
    pub fn new(api_key: Option<String>, api_base: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let api_base = api_base.into();
        url::Url::parse(&api_base)?;

        Ok(Self {
            api_key,
            api_base,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub chat_model: String,
    pub temperature: f32,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_batch_size: 64,
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidArgument(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.embedding_batch_size == 0 {
            return Err(ConfigError::InvalidArgument(
                "embedding batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
