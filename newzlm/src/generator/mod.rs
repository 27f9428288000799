//! AI article generation.
//!
//! Generation is an opaque remote capability: it may fail, and a failure never touches
//! the editorial collections. Callers show [`GenerationError::USER_MESSAGE`] and keep
//! whatever the editor had before.

use common::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::remote::RemoteLlmProvider;
use crate::news::NewsArticle;

pub mod compose;
pub mod endpoint;
pub mod llm_backed;

pub use compose::{compose_from_source, enhancement_request, generation_request, ComposedDraft};
pub use endpoint::EndpointGenerator;
pub use llm_backed::LlmArticleGenerator;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("nothing to generate from: provide a title or a source article")]
    NothingToGenerate,
    #[error("generation service unreachable: {0}")]
    Transport(String),
    #[error("generation service answered with status {status}")]
    Remote { status: u16 },
    #[error("generation service returned unparsable output")]
    Unparsable,
}

impl GenerationError {
    /// What the editor sees, whatever went wrong remotely
    pub const USER_MESSAGE: &'static str = "Failed to generate article. Please try again.";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
}

/// Everything a generator needs for one article
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source: NewsArticle,
    /// Replaces the default "write an article from this source" instruction
    pub instructions: Option<String>,
    /// Editorial voice and guidelines, see `EditorialSettings::system_prompt`
    pub system_prompt: String,
}

#[async_trait::async_trait]
pub trait ArticleGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle, GenerationError>;
}

/// Build the generator selected by `[generator] adapter`. `Ok(None)` means generation is
/// switched off; the API then answers generation requests with an error.
pub fn from_config(config: Option<&GeneratorConfig>) -> anyhow::Result<Option<Arc<dyn ArticleGenerator>>> {
    let Some(config) = config else {
        return Ok(None);
    };

    match config.adapter.as_deref().unwrap_or("none") {
        "endpoint" => {
            let endpoint = config.endpoint.clone().unwrap_or_default();
            let url = endpoint
                .url
                .unwrap_or_else(|| "http://localhost:8000/generate_article".to_string());
            info!(url = %url, "generator: local generation endpoint");
            let generator = EndpointGenerator::new(url, endpoint.timeout_seconds.unwrap_or(120))?;
            Ok(Some(Arc::new(generator)))
        }
        "llm" => {
            let llm_config = config
                .llm
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("generator adapter 'llm' needs a [generator.llm] section"))?;
            let provider = RemoteLlmProvider::from_config(llm_config)?;
            info!(model = provider.model(), "generator: remote LLM");
            let generator = LlmArticleGenerator::new(Arc::new(provider))
                .with_source_scraping(config.scrape_sources.unwrap_or(true));
            Ok(Some(Arc::new(generator)))
        }
        "none" => {
            warn!("generator: disabled");
            Ok(None)
        }
        other => anyhow::bail!("Unknown generator adapter: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_section_disables_generation() {
        assert!(from_config(None).unwrap().is_none());
    }

    #[test]
    fn unknown_adapter_is_an_error() {
        let config = GeneratorConfig {
            adapter: Some("oracle".to_string()),
            ..Default::default()
        };
        assert!(from_config(Some(&config)).is_err());
    }

    #[test]
    fn llm_adapter_needs_its_section() {
        let config = GeneratorConfig {
            adapter: Some("llm".to_string()),
            ..Default::default()
        };
        assert!(from_config(Some(&config)).is_err());
    }

    #[test]
    fn endpoint_adapter_has_a_default_url() {
        let config = GeneratorConfig {
            adapter: Some("endpoint".to_string()),
            ..Default::default()
        };
        assert!(from_config(Some(&config)).unwrap().is_some());
    }
}
