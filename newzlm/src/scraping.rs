use anyhow::{Context, Result};
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;
use tracing::{info, warn};

/// Fetch an article page and reduce it to readable text for a generation prompt.
/// `Ok(None)` when the page had no extractable article body.
pub async fn scrape_article_text(url: &str, timeout_secs: u64) -> Result<Option<String>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent("Mozilla/5.0 (compatible; NewzLM/0.1)")
        .build()
        .context("failed to build reqwest client")?;

    let response = client.get(url).send().await.context("failed to fetch article page")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("article fetch failed with status: {}", status);
    }

    let html = response.bytes().await.context("failed to read response body")?;
    let page_url = url::Url::parse(url).context("failed to parse article URL")?;

    let text = readable_text(&html, &page_url);
    match &text {
        Some(text) => info!("scraping: extracted {} chars from {}", text.len(), url),
        None => warn!("scraping: nothing readable at {}", url),
    }
    Ok(text)
}

/// Main-content extraction (readability), rendered as wrapped plain text.
pub fn readable_text(html: &[u8], page_url: &url::Url) -> Option<String> {
    let mut reader = Cursor::new(html);
    let product = match readability::extractor::extract(&mut reader, page_url) {
        Ok(product) => product,
        Err(e) => {
            warn!("scraping: readability failed for {}: {}", page_url, e);
            return None;
        }
    };

    // Markdown-ish text keeps headings and lists, which reads better in a prompt
    let text = match html2text::from_read(product.content.as_bytes(), 100) {
        Ok(text) => text,
        Err(e) => {
            warn!("scraping: html to text conversion failed: {}", e);
            product.text
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cut `text` to at most `max_bytes`, on a char boundary.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
