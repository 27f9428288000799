use std::sync::Arc;
use tracing::{info, warn};

use super::{ArticleGenerator, GeneratedArticle, GenerationError, GenerationRequest};
use crate::llm::{extract_json_from_text, LlmProvider, LlmRequest};
use crate::scraping::{scrape_article_text, truncate_utf8};

const MAX_SOURCE_BYTES: usize = 8000;

const JOURNALIST_PROMPT: &str = "You are a professional journalist. Generate a comprehensive article based on the provided news information. Focus on Central Asian perspectives and regional relevance when possible. Write in a clear, engaging style suitable for NewzLM publication.";

/// Generator that prompts a chat-completion model directly
pub struct LlmArticleGenerator<P: LlmProvider + ?Sized> {
    provider: Arc<P>,
    scrape_sources: bool,
    scrape_timeout_secs: u64,
}

impl<P: LlmProvider + ?Sized> LlmArticleGenerator<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            scrape_sources: false,
            scrape_timeout_secs: 10,
        }
    }

    /// Include the fetched text of `source.url` in the prompt when possible
    pub fn with_source_scraping(mut self, enabled: bool) -> Self {
        self.scrape_sources = enabled;
        self
    }

    async fn source_text(&self, request: &GenerationRequest) -> Option<String> {
        if !self.scrape_sources || request.source.url.is_empty() {
            return None;
        }
        match scrape_article_text(&request.source.url, self.scrape_timeout_secs).await {
            Ok(text) => text.map(|t| truncate_utf8(&t, MAX_SOURCE_BYTES).to_string()),
            Err(e) => {
                // The headline and description are still enough to write from
                warn!(url = %request.source.url, error = %e, "generator: source scraping failed");
                None
            }
        }
    }
}

/// User message for a request, with optional scraped source text.
pub fn build_prompt(request: &GenerationRequest, source_text: Option<&str>) -> String {
    let source = &request.source;
    let mut prompt = match &request.instructions {
        Some(instructions) => instructions.clone(),
        None => format!(
            "Write a detailed article based on this news:\nTitle: {}\nDescription: {}\nSource: {}\n\nPlease expand this into a full article with proper structure, analysis, and relevant context.",
            source.title, source.description, source.source.name
        ),
    };

    if let Some(text) = source_text {
        prompt.push_str("\n\nSource article text:\n");
        prompt.push_str(text);
    }

    prompt.push_str(
        "\n\nRespond with a single JSON object and nothing else:\n{\"title\": \"a creative headline of at most 30 words\", \"content\": \"the full article in markdown\"}",
    );
    prompt
}

#[async_trait::async_trait]
impl<P: LlmProvider + ?Sized> ArticleGenerator for LlmArticleGenerator<P> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle, GenerationError> {
        let source_text = self.source_text(request).await;

        let mut llm_request = LlmRequest::new(build_prompt(request, source_text.as_deref()));
        llm_request.system = Some(format!("{}\n\n{}", JOURNALIST_PROMPT, request.system_prompt));

        let response = self
            .provider
            .generate(llm_request)
            .await
            .map_err(|e| GenerationError::Transport(format!("{:#}", e)))?;

        let json = extract_json_from_text(&response.content).ok_or_else(|| {
            warn!("generator: no JSON object in model reply");
            GenerationError::Unparsable
        })?;

        let article: GeneratedArticle = serde_json::from_str(&json).map_err(|e| {
            warn!(error = %e, "generator: model reply is not an article object");
            GenerationError::Unparsable
        })?;

        if article.content.trim().is_empty() {
            return Err(GenerationError::Unparsable);
        }

        info!(
            model = %response.model,
            tokens = response.usage.total_tokens,
            "generator: article generated"
        );
        Ok(GeneratedArticle {
            title: article.title.trim().to_string(),
            content: article.content,
        })
    }
}
