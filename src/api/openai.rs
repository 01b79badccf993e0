use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::rate_limiter::{RateLimiter, RateLimiterConfig};
use super::types::*;
use crate::core::config::OpenAiConfig;
use crate::core::error::{Result, ServiceError};

/// Longest upstream error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A single chat-completion round trip returning the assistant text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    limiter: RateLimiter,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Config(format!("HTTP client: {}", e)))?;

        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: config.requests_per_minute,
            window_duration: Duration::from_secs(60),
            max_in_flight: config.max_concurrent,
        });

        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let permit = self.limiter.acquire().await?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| error_text.chars().take(MAX_ERROR_BODY_CHARS).collect());
            tracing::error!("OpenAI API error ({}): {} - {}", request.model, status, detail);
            return Err(ServiceError::upstream(format!("{} - {}", status, detail)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::upstream(format!("failed to parse completion: {}", e)))?;

        tracing::debug!(
            "Completion from {} in {:?}",
            request.model,
            permit.elapsed()
        );

        completion
            .first_content()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ServiceError::upstream(format!("{} returned no content", request.model)))
    }
}
