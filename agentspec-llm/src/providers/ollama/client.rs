//! Ollama HTTP transport. Unlike the Anthropic/OpenAI transports this talks
//! to a local daemon with no API key and no provider-imposed rate limit, so
//! it skips the semaphore/min-interval machinery those two carry.

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::client::{LlmError, LlmResult};

pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into() }
    }

    pub fn local() -> Self {
        Self::new("http://localhost:11434")
    }

    pub async fn request<Req: Serialize, Res: DeserializeOwned>(&self, endpoint: &str, body: Req) -> LlmResult<Res> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ProviderError { provider: "ollama".to_string(), message: format!("HTTP request failed: {e}") })?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| LlmError::ProviderError { provider: "ollama".to_string(), message: format!("failed to parse response: {e}") })
        } else {
            let error_text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            Err(match status {
                StatusCode::NOT_FOUND => LlmError::ProviderError { provider: "ollama".to_string(), message: format!("model not pulled: {error_text}") },
                _ => LlmError::ProviderError { provider: "ollama".to_string(), message: error_text },
            })
        }
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient").field("base_url", &self.base_url).finish()
    }
}
