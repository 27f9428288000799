use serde::Serialize;

use super::{GenerationError, GenerationRequest};
use crate::editorial::EditorialSettings;
use crate::news::{NewsArticle, SourceName};

/// Title and seed text for an editor opened from a news article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedDraft {
    pub title: String,
    pub content: String,
}

/// Seed markdown for a new article based on a news item.
pub fn compose_from_source(article: &NewsArticle) -> ComposedDraft {
    let source_name = if article.source.name.is_empty() {
        "Unknown"
    } else {
        article.source.name.as_str()
    };
    let url = if article.url.is_empty() { "N/A" } else { article.url.as_str() };
    let body = article
        .content
        .as_deref()
        .filter(|c| !c.is_empty())
        .or(Some(article.description.as_str()).filter(|d| !d.is_empty()))
        .unwrap_or("Please provide more details about this topic...");

    let content = format!(
        "# {title}\n\n{description}\n\n## Source Information\n- **Original Source**: {source_name}\n- **URL**: {url}\n\n## Content to Expand\n{body}\n\n---\n\n*This article is being developed from source material. Use AI generation to expand and enhance the content.*",
        title = article.title,
        description = article.description,
    );

    ComposedDraft {
        title: article.title.clone(),
        content,
    }
}

/// Request for "Generate Article": from the source article when there is one, otherwise
/// from what the editor typed.
pub fn generation_request(
    source: Option<NewsArticle>,
    title: &str,
    content: &str,
    settings: &EditorialSettings,
) -> Result<GenerationRequest, GenerationError> {
    let source = match source {
        Some(article) => article,
        None if title.trim().is_empty() => return Err(GenerationError::NothingToGenerate),
        None => editor_article(title, prefix(content, 200), "User Input", None),
    };

    Ok(GenerationRequest {
        source,
        instructions: None,
        system_prompt: settings.system_prompt(),
    })
}

/// Request for "Enhance Existing": rewrite the editor's current text.
pub fn enhancement_request(
    title: &str,
    content: &str,
    settings: &EditorialSettings,
) -> Result<GenerationRequest, GenerationError> {
    if content.trim().is_empty() {
        return Err(GenerationError::NothingToGenerate);
    }

    let instructions = format!(
        "Please enhance and expand this existing article content, improving clarity, adding relevant context, and maintaining professional journalism standards:\n\n{}",
        content
    );

    Ok(GenerationRequest {
        source: editor_article(title, prefix(content, 500), "NewzLM Editor", Some(content.to_string())),
        instructions: Some(instructions),
        system_prompt: settings.system_prompt(),
    })
}

fn editor_article(title: &str, description: String, source: &str, content: Option<String>) -> NewsArticle {
    NewsArticle {
        id: String::new(),
        title: title.to_string(),
        description,
        url: String::new(),
        url_to_image: crate::news::placeholder_image(),
        published_at: String::new(),
        source: SourceName::new(source),
        category: None,
        content,
    }
}

fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
