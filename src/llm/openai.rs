//! OpenAI-compatible chat-completions client
//!
//! Works against any `/chat/completions` endpoint: Gemini's OpenAI
//! compatibility layer (the default), OpenAI, OpenRouter, Ollama.
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{ChatCompletionRequest, ChatCompletionResponse, LlmProvider};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{error, info};

pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        info!(model = %request.model, "Calling LLM provider");

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            error!("LLM request failed: {}", e);
            ProviderError::Network(e.to_string())
        })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Authentication(body));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                error!(status = s.as_u16(), "LLM provider error response: {}", body);
                return Err(ProviderError::Api {
                    status: s.as_u16(),
                    message: body,
                });
            }
            _ => {}
        }

        response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!("Failed to parse LLM response: {}", e);
            ProviderError::MalformedResponse(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let provider =
            OpenAiCompatProvider::new("http://localhost:11434/v1/", "", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_network_error() {
        let provider =
            OpenAiCompatProvider::new("http://127.0.0.1:9", "key", Duration::from_secs(2)).unwrap();
        let request = ChatCompletionRequest {
            model: "test".to_string(),
            messages: vec![],
            temperature: 0.0,
            tools: None,
            tool_choice: None,
            thinking: None,
            extra_body: None,
        };

        let result = provider.complete(request).await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }
}
