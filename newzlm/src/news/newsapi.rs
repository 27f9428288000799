use anyhow::{Context, Result};
use chrono::Utc;
use common::NewsConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{placeholder_image, NewsArticle, NewsSource, SourceName};

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

/// newsapi.org v2 client (top headlines + everything search)
pub struct NewsApiClient {
    base_url: String,
    api_key: String,
    language: String,
    country: String,
    page_size: u32,
    client: Client,
}

impl NewsApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, api_key, 15)
    }

    fn with_timeout(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("NewzLM/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: "en".to_string(),
            country: "us".to_string(),
            page_size: 20,
            client,
        })
    }

    /// Build a client from the `[news]` section. `Ok(None)` when the API key variable is
    /// unset, which callers treat as "missing credentials".
    pub fn from_config(config: &NewsConfig) -> Result<Option<Self>> {
        let key_env = config.api_key_env.as_deref().unwrap_or("NEWS_API_KEY");
        let api_key = match std::env::var(key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => return Ok(None),
        };

        let base_url = config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut client = Self::with_timeout(base_url, api_key, config.timeout_seconds.unwrap_or(15))?;
        if let Some(language) = &config.language {
            client.language = language.clone();
        }
        if let Some(country) = &config.country {
            client.country = country.clone();
        }
        if let Some(page_size) = config.page_size {
            client.page_size = page_size;
        }
        Ok(Some(client))
    }

    async fn get_articles(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<RawArticle>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "news: requesting");

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("news API error {}: {}", status, body);
        }

        let body: ArticlesResponse = response.json().await.context("failed to parse news API response")?;
        Ok(body.articles)
    }
}

#[async_trait::async_trait]
impl NewsSource for NewsApiClient {
    async fn top_headlines(&self, category: Option<&str>) -> Result<Vec<NewsArticle>> {
        let mut params = vec![
            ("language", self.language.clone()),
            ("pageSize", self.page_size.to_string()),
        ];
        let category = category.filter(|c| !c.is_empty());
        match category.filter(|c| *c != "all") {
            Some(category) => params.push(("category", category.to_string())),
            None => params.push(("country", self.country.clone())),
        }

        let raw = self.get_articles("top-headlines", &params).await?;
        let stamp = Utc::now().timestamp_millis();
        // "all" is kept as the label even though it is not sent upstream
        let label = category.unwrap_or("General");

        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, article)| article.into_article(format!("news-{}-{}", i, stamp), label))
            .collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>> {
        let params = vec![
            ("q", query.to_string()),
            ("language", self.language.clone()),
            ("sortBy", "relevancy".to_string()),
            ("pageSize", self.page_size.to_string()),
        ];

        let raw = self.get_articles("everything", &params).await?;
        let stamp = Utc::now().timestamp_millis();

        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, article)| article.into_article(format!("search-{}-{}", i, stamp), "Search Result"))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    url: String,
    url_to_image: Option<String>,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    source: RawSource,
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    #[serde(default)]
    name: Option<String>,
}

impl RawArticle {
    fn into_article(self, id: String, category: &str) -> NewsArticle {
        let description = self.description.unwrap_or_default();
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| description.clone());

        NewsArticle {
            id,
            title: self.title.unwrap_or_default(),
            description,
            url: self.url,
            url_to_image: self.url_to_image.filter(|u| !u.is_empty()).unwrap_or_else(placeholder_image),
            published_at: self.published_at,
            source: SourceName::new(self.source.name.unwrap_or_default()),
            category: Some(category.to_string()),
            content: Some(content),
        }
    }
}
