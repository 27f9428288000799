use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod hackernews;
pub mod newsapi;
pub mod samples;
pub mod wordcloud;

pub use hackernews::HackerNewsClient;
pub use newsapi::NewsApiClient;
pub use wordcloud::{word_cloud, WordWeight};

/// Article summary as shown in news lists and used as a generation source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "placeholder_image")]
    pub url_to_image: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub source: SourceName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceName {
    pub name: String,
}

impl SourceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Link-aggregator story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackerNewsItem {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descendants: Option<i64>,
}

pub(crate) fn placeholder_image() -> String {
    "/placeholder.svg".to_string()
}

/// Remote headline/search provider. Implementations report failures; fallback data
/// is chosen by the caller (see [`fetch_top_news`]).
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Top headlines, optionally for one category ("all" means no filter)
    async fn top_headlines(&self, category: Option<&str>) -> Result<Vec<NewsArticle>>;

    /// Free-text search
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>>;
}

/// Headlines for the news pages. Never fails: a missing source (no credentials) or a
/// transport error yields the fixed sample articles.
pub async fn fetch_top_news(source: Option<&dyn NewsSource>, category: Option<&str>) -> Vec<NewsArticle> {
    let Some(source) = source else {
        info!("news: no API credentials configured, serving sample articles");
        return samples::sample_articles();
    };

    match source.top_headlines(category).await {
        Ok(articles) => articles,
        Err(e) => {
            warn!(error = %e, category = ?category, "news: headline fetch failed, serving sample articles");
            samples::sample_articles()
        }
    }
}

/// Search results, empty on failure. Without credentials the sample articles are returned.
pub async fn search_news(source: Option<&dyn NewsSource>, query: &str) -> Vec<NewsArticle> {
    let Some(source) = source else {
        info!("news: no API credentials configured, serving sample articles");
        return samples::sample_articles();
    };

    match source.search(query).await {
        Ok(articles) => articles,
        Err(e) => {
            warn!(error = %e, query, "news: search failed");
            Vec::new()
        }
    }
}

/// Top link-aggregator stories, empty on failure.
pub async fn fetch_hacker_news(client: &HackerNewsClient) -> Vec<HackerNewsItem> {
    match client.top_stories().await {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "news: hacker news fetch failed");
            Vec::new()
        }
    }
}
