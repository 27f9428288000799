use anyhow::Context;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ArticleGenerator, GeneratedArticle, GenerationError, GenerationRequest};

/// Client for the local generation service:
/// `GET <url>?system_prompt=...&url=...` answering `{"title": ..., "content": ...}`.
pub struct EndpointGenerator {
    url: String,
    client: Client,
}

impl EndpointGenerator {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl ArticleGenerator for EndpointGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle, GenerationError> {
        // The service only takes a system prompt, so extra instructions ride along in it
        let system_prompt = match &request.instructions {
            Some(instructions) => format!("{}\n\n{}", request.system_prompt, instructions),
            None => request.system_prompt.clone(),
        };

        debug!(source = %request.source.url, "generator: calling endpoint");
        let response = self
            .client
            .get(&self.url)
            .query(&[("system_prompt", system_prompt.as_str()), ("url", request.source.url.as_str())])
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "generator: endpoint rejected request");
            return Err(GenerationError::Remote { status: status.as_u16() });
        }

        let article: GeneratedArticle = response.json().await.map_err(|e| {
            warn!(error = %e, "generator: endpoint returned unexpected body");
            GenerationError::Unparsable
        })?;

        if article.content.trim().is_empty() {
            return Err(GenerationError::Unparsable);
        }
        Ok(article)
    }
}
