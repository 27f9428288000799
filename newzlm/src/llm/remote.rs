use anyhow::{Context, Result};
use common::RemoteLlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Sampling and transport settings applied when a request leaves them unset
#[derive(Debug, Clone, Copy)]
struct Fallbacks {
    timeout: Duration,
    max_tokens: usize,
    temperature: f32,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_tokens: 1024,
            temperature: 1.0,
        }
    }
}

/// Chat-completions client for any OpenAI-compatible endpoint (Groq, OpenAI, local servers)
pub struct RemoteLlmProvider {
    endpoint: String,
    api_key: String,
    model: String,
    fallbacks: Fallbacks,
    http: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            fallbacks: Fallbacks::default(),
            http: reqwest::Client::new(),
        }
    }

    /// Build from a `[generator.llm]` section, reading the key from the named env var.
    pub fn from_config(config: &RemoteLlmConfig) -> Result<Self> {
        let var = config
            .api_key_env
            .as_deref()
            .context("Missing api_key_env in LLM config")?;
        let api_key = std::env::var(var).with_context(|| format!("LLM API key env var '{var}' not set"))?;

        let mut provider = Self::new(
            config.api_url.as_deref().unwrap_or(DEFAULT_API_URL),
            api_key,
            config.model.as_deref().unwrap_or(DEFAULT_MODEL),
        );
        if let Some(secs) = config.timeout_seconds {
            provider.fallbacks.timeout = Duration::from_secs(secs);
        }
        if let Some(max_tokens) = config.max_tokens {
            provider.fallbacks.max_tokens = max_tokens;
        }
        Ok(provider)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body<'a>(&'a self, request: &'a LlmRequest) -> ChatBody<'a> {
        let system = request.system.as_deref().map(|content| Turn { role: "system", content });
        let user = Turn {
            role: "user",
            content: &request.prompt,
        };

        ChatBody {
            model: &self.model,
            messages: system.into_iter().chain(std::iter::once(user)).collect(),
            max_tokens: request.max_tokens.unwrap_or(self.fallbacks.max_tokens),
            temperature: request.temperature.unwrap_or(self.fallbacks.temperature),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let timeout = request
            .timeout_seconds
            .map_or(self.fallbacks.timeout, Duration::from_secs);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("LLM request timed out after {}s", timeout.as_secs())
                } else {
                    anyhow::Error::new(e).context("LLM HTTP request failed")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {status}: {detail}");
        }

        let reply: ChatReply = response.json().await.context("Failed to parse LLM response")?;
        reply.into_response(&self.model)
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<Turn<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    model: Option<String>,
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Option<TokenCounts>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct TokenCounts {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl ChatReply {
    fn into_response(self, requested_model: &str) -> Result<LlmResponse> {
        let message = self
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("LLM response has no choices")?;

        let usage = self.usage.unwrap_or_default();
        Ok(LlmResponse {
            content: message.content.trim().to_string(),
            usage: UsageMetadata {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}
