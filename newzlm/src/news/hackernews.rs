use anyhow::{Context, Result};
use common::HackerNewsConfig;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::HackerNewsItem;

const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Hacker News Firebase API: top story ids, then one request per item.
pub struct HackerNewsClient {
    base_url: String,
    limit: usize,
    client: Client,
}

impl HackerNewsClient {
    pub fn new(base_url: impl Into<String>, limit: usize) -> Result<Self> {
        Self::with_timeout(base_url, limit, 15)
    }

    fn with_timeout(base_url: impl Into<String>, limit: usize, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("NewzLM/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limit,
            client,
        })
    }

    pub fn from_config(config: Option<&HackerNewsConfig>) -> Result<Self> {
        let base_url = config
            .and_then(|c| c.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let limit = config.and_then(|c| c.limit).unwrap_or(10);
        let timeout = config.and_then(|c| c.timeout_seconds).unwrap_or(15);
        Self::with_timeout(base_url, limit, timeout)
    }

    /// Up to `limit` top stories in ranking order. Items without a title are skipped;
    /// a single item failing to load is skipped too, the id list failing is an error.
    pub async fn top_stories(&self) -> Result<Vec<HackerNewsItem>> {
        let ids: Vec<u64> = self
            .client
            .get(format!("{}/topstories.json", self.base_url))
            .send()
            .await
            .context("failed to fetch top story ids")?
            .error_for_status()
            .context("top story ids request rejected")?
            .json()
            .await
            .context("failed to parse top story ids")?;

        let items: Vec<Option<HackerNewsItem>> = stream::iter(ids.into_iter().take(self.limit))
            .map(|id| async move {
                match self.fetch_item(id).await {
                    Ok(item) => item,
                    Err(e) => {
                        debug!(id, error = %e, "skipping story");
                        None
                    }
                }
            })
            .buffered(5)
            .collect()
            .await;

        Ok(items
            .into_iter()
            .flatten()
            .filter(|item| !item.title.trim().is_empty())
            .collect())
    }

    async fn fetch_item(&self, id: u64) -> Result<Option<HackerNewsItem>> {
        let item = self
            .client
            .get(format!("{}/item/{}.json", self.base_url, id))
            .send()
            .await
            .context("failed to fetch story")?
            .error_for_status()
            .context("story request rejected")?
            // Deleted items come back as `null`
            .json::<Option<HackerNewsItem>>()
            .await
            .context("failed to parse story")?;
        Ok(item)
    }
}
