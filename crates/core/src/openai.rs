use crate::config::OpenAiConfig;
use crate::error::{ConfigError, ProviderError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

const BACKEND: &str = "openai";
const MAX_ERROR_BODY: usize = 500;

/// Thin JSON client for an OpenAI-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base: Url,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ConfigError> {
        let mut base = Url::parse(&config.api_base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| ConfigError::InvalidArgument(format!("http client: {error}")))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "posting to openai");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendResponse {
                backend: BACKEND.to_string(),
                status: status.as_u16(),
                details: truncate(&details, MAX_ERROR_BODY),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_BASE;

    fn client(base: &str) -> OpenAiClient {
        let config = OpenAiConfig::new(Some("sk-test".to_string()), base).expect("config");
        OpenAiClient::new(&config).expect("client")
    }

    #[test]
    fn endpoints_are_joined_under_the_base() {
        assert_eq!(
            client(DEFAULT_API_BASE)
                .endpoint("/v1/embeddings")
                .expect("url")
                .as_str(),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            client("http://localhost:8080/proxy")
                .endpoint("v1/chat/completions")
                .expect("url")
                .as_str(),
            "http://localhost:8080/proxy/v1/chat/completions"
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
