//! Language-model transports.
//!
//! Three wire shapes are supported, picked once from the configured provider
//! name when the client is built:
//!
//! | Provider name | Variant | Request | Reply text at |
//! |---------------|---------|---------|---------------|
//! | `"anthropic"` | [`LlmProvider::Anthropic`] | `POST {base}/messages` | `content[0].text` |
//! | `"ollama"` | [`LlmProvider::Ollama`] | `POST {base}/api/generate` | `response` |
//! | anything else | [`LlmProvider::OpenAiCompatible`] | `POST {base}/chat/completions` | `choices[0].message.content` |
//!
//! Matching is case-sensitive; unknown names (`"deepseek"`, `"groq"`, ...)
//! use the OpenAI-compatible shape.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::traits::CompletionTransport;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAiCompatible,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn from_name(name: &str) -> Self {
        match name {
            "anthropic" => LlmProvider::Anthropic,
            "ollama" => LlmProvider::Ollama,
            _ => LlmProvider::OpenAiCompatible,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAiCompatible => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com/v1",
            LlmProvider::Ollama => "http://localhost:11434",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            LlmProvider::OpenAiCompatible => "/chat/completions",
            LlmProvider::Anthropic => "/messages",
            LlmProvider::Ollama => "/api/generate",
        }
    }
}

/// HTTP transport for one configured provider.
pub struct LlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    provider_name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let provider = LlmProvider::from_name(&config.provider);
        let api_key = config.resolved_api_key();
        if api_key.is_none() && provider != LlmProvider::Ollama {
            tracing::warn!(
                "No API key for LLM provider '{}'; requests will likely be rejected",
                config.provider
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build LLM HTTP client")?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(provider.default_base_url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider,
            provider_name: config.provider.clone(),
            base_url,
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// JSON request body for `prompt` in this provider's shape.
    pub fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            LlmProvider::OpenAiCompatible => json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            }),
            LlmProvider::Anthropic => json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": self.temperature,
            }),
            LlmProvider::Ollama => json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "num_predict": self.max_tokens,
                    "temperature": self.temperature,
                },
            }),
        }
    }
}

/// Pull the reply text out of a provider response body.
pub fn extract_text(provider: LlmProvider, body: &Value) -> Result<String> {
    let text = match provider {
        LlmProvider::OpenAiCompatible => body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Invalid chat completion response: missing choices[0].message.content"))?,
        LlmProvider::Anthropic => body
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Invalid messages response: missing content[0].text"))?,
        // Ollama omits `response` on some errors; treat that as an empty reply.
        LlmProvider::Ollama => body.get("response").and_then(Value::as_str).unwrap_or(""),
    };
    Ok(text.to_string())
}

#[async_trait]
impl CompletionTransport for LlmClient {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, self.provider.endpoint());
        let mut request = self.client.post(&url).json(&self.request_body(prompt));

        match (self.provider, &self.api_key) {
            (LlmProvider::OpenAiCompatible, Some(key)) => {
                request = request.header("Authorization", format!("Bearer {}", key));
            }
            (LlmProvider::Anthropic, key) => {
                request = request
                    .header("x-api-key", key.as_deref().unwrap_or_default())
                    .header("anthropic-version", ANTHROPIC_VERSION);
            }
            _ => {}
        }

        tracing::debug!(url = %url, model = %self.model, "Sending LLM request");
        let response = request
            .send()
            .await
            .with_context(|| format!("LLM request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("LLM request failed: {} {}", status, body);
            bail!("{} API error {}: {}", self.provider_name, status, body);
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))?;
        extract_text(self.provider, &body)
    }
}
