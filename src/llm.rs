use crate::config::{LlmConfig, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Uniform error kind for everything that can go wrong talking to a
/// provider: network, auth, rate limits, or a response whose shape we
/// cannot read the completion text out of.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("API key not provided for the selected provider")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Error kind shared by the analysis services: either the gateway call
/// failed, or the model replied with something we refuse to interpret.
/// Callers treat both identically.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The boundary to the external LLM provider. Backends are interchangeable:
/// the pipeline only ever sees this contract and [`GatewayError`].
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Sends a system-level instruction plus user content and returns the
    /// raw completion text. No structural guarantee on the output.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, GatewayError>;
}

/// Builds the configured backend behind the gateway contract.
pub fn build_gateway(config: &LlmConfig) -> Result<Arc<dyn LlmGateway>, GatewayError> {
    match config.provider {
        LlmProvider::OpenAi => Ok(Arc::new(OpenAiGateway::new(config.clone())?)),
        LlmProvider::Anthropic => Ok(Arc::new(AnthropicGateway::new(config.clone())?)),
    }
}

async fn with_retries<F, Fut>(retries: u32, mut call: F) -> Result<String, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(text) => return Ok(text),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!(error = %e, attempt, retries, "gateway call failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(e) => return Err(e),
        }
    }
}

pub struct OpenAiGateway {
    config: LlmConfig,
    client: Client,
}

impl OpenAiGateway {
    pub fn new(config: LlmConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");
        format!("{}/v1/chat/completions", base.trim_end_matches('/'))
    }

    async fn request_once(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, GatewayError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(GatewayError::MissingApiKey)?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response.json().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                GatewayError::MalformedResponse("missing choices[0].message.content".to_string())
            })
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, GatewayError> {
        with_retries(self.config.retry_count, || {
            self.request_once(system_prompt, prompt)
        })
        .await
    }
}

pub struct AnthropicGateway {
    config: LlmConfig,
    client: Client,
}

impl AnthropicGateway {
    pub fn new(config: LlmConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com");
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }

    async fn request_once(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, GatewayError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(GatewayError::MissingApiKey)?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system_prompt,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response.json().await?;
        body["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GatewayError::MalformedResponse("missing content[0].text".to_string()))
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, GatewayError> {
        with_retries(self.config.retry_count, || {
            self.request_once(system_prompt, prompt)
        })
        .await
    }
}

/// Truncates to at most `max_chars` characters without splitting a multibyte
/// character.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Models regularly wrap the requested JSON in a markdown fence; strip it
/// before parsing.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
