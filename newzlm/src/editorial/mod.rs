//! Draft, moderation and publication workflow.
//!
//! The desk owns three collections (drafts, submitted, published) plus the editorial
//! settings, all persisted through a [`KeyValueStore`]. An article id lives in at most one
//! collection; every transition removes it from the source and inserts it into the
//! destination in a single store write.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::store::KeyValueStore;

pub mod records;
pub mod settings;

pub use records::{ArticleRecord, Collection, Draft, PublishedArticle, Submission};
pub use settings::EditorialSettings;

use records::{decode_collection, format_published_date, seed_published, Keyed};

/// Tab badge counts for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub drafts: usize,
    pub submitted: usize,
    pub published: usize,
}

/// Approval refused because a published record already uses the id
#[derive(Debug, Error)]
#[error("article {0} is already published")]
pub struct AlreadyPublished(pub String);

/// Fresh collision-resistant article id
pub fn new_article_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct EditorialDesk {
    store: Arc<dyn KeyValueStore>,
    default_settings: EditorialSettings,
    // Held across every read-modify-write so transitions never interleave
    lock: Mutex<()>,
}

impl EditorialDesk {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            default_settings: EditorialSettings::default(),
            lock: Mutex::new(()),
        }
    }

    pub fn with_default_settings(mut self, settings: EditorialSettings) -> Self {
        self.default_settings = settings;
        self
    }

    // -- Drafts --

    pub async fn list_drafts(&self) -> Vec<Draft> {
        self.load(Collection::Drafts).await
    }

    pub async fn get_draft(&self, id: &str) -> Option<Draft> {
        self.list_drafts().await.into_iter().find(|d| d.id == id)
    }

    /// Overwrite the draft `id` in place, or create a new draft when `id` is absent
    /// or unknown. The returned draft carries the id to use for later saves.
    pub async fn save_draft(&self, id: Option<&str>, title: &str, content: &str) -> Result<Draft> {
        let _guard = self.lock.lock().await;
        let mut drafts: Vec<Draft> = self.load_for_update(Collection::Drafts).await?;
        let now = Utc::now();

        let position = id.and_then(|id| drafts.iter().position(|d| d.id == id));
        let draft = match position {
            Some(index) => {
                let draft = &mut drafts[index];
                draft.title = title.to_string();
                draft.content = content.to_string();
                draft.updated_at = now;
                draft.clone()
            }
            None => {
                let draft = Draft {
                    id: new_article_id(),
                    title: title.to_string(),
                    content: content.to_string(),
                    updated_at: now,
                };
                drafts.push(draft.clone());
                draft
            }
        };

        self.write(vec![encode(Collection::Drafts, &drafts)?]).await?;
        debug!(id = %draft.id, "draft saved");
        Ok(draft)
    }

    /// Remove a draft. Returns whether anything was removed.
    pub async fn delete_draft(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut drafts: Vec<Draft> = self.load_for_update(Collection::Drafts).await?;

        if take(&mut drafts, id).is_none() {
            debug!(id, "delete of unknown draft ignored");
            return Ok(false);
        }

        self.write(vec![encode(Collection::Drafts, &drafts)?]).await?;
        info!(id, "draft deleted");
        Ok(true)
    }

    // -- Moderation --

    /// Move an existing draft into the moderation queue.
    pub async fn submit(&self, draft_id: &str) -> Result<Option<Submission>> {
        let _guard = self.lock.lock().await;
        let mut drafts: Vec<Draft> = self.load_for_update(Collection::Drafts).await?;

        let Some(draft) = take(&mut drafts, draft_id) else {
            warn!(id = draft_id, "submit: no such draft");
            return Ok(None);
        };

        let submission = Submission {
            id: draft.id,
            title: draft.title,
            content: draft.content,
            submitted_at: Utc::now(),
        };
        self.enqueue(drafts, submission).await.map(Some)
    }

    /// Apply the editor's current title and content, then submit, as one write.
    /// Allocates an id when the caller has not saved the article yet.
    pub async fn save_and_submit(&self, id: Option<&str>, title: &str, content: &str) -> Result<Submission> {
        let _guard = self.lock.lock().await;
        let mut drafts: Vec<Draft> = self.load_for_update(Collection::Drafts).await?;

        let id = id
            .and_then(|id| take(&mut drafts, id))
            .map(|draft| draft.id)
            .unwrap_or_else(new_article_id);

        let submission = Submission {
            id,
            title: title.to_string(),
            content: content.to_string(),
            submitted_at: Utc::now(),
        };
        self.enqueue(drafts, submission).await
    }

    pub async fn list_submitted(&self) -> Vec<Submission> {
        self.load(Collection::Submitted).await
    }

    pub async fn get_submitted(&self, id: &str) -> Option<Submission> {
        self.list_submitted().await.into_iter().find(|s| s.id == id)
    }

    /// Publish a submitted article. `None` when `id` is not awaiting moderation.
    /// Fails without writing when a published record already carries `id`.
    pub async fn approve(&self, id: &str) -> Result<Option<PublishedArticle>> {
        let _guard = self.lock.lock().await;
        let mut submitted: Vec<Submission> = self.load_for_update(Collection::Submitted).await?;

        let Some(submission) = take(&mut submitted, id) else {
            warn!(id, "approve: article is not awaiting moderation");
            return Ok(None);
        };

        let mut published = self.load_published_for_update().await?;
        if published.iter().any(|p| p.id == id) {
            // published records are immutable; leave the submission queued
            warn!(id, "approve: id already published, refusing to overwrite");
            return Err(AlreadyPublished(id.to_string()).into());
        }

        let article = PublishedArticle {
            id: submission.id,
            title: submission.title,
            published_at: format_published_date(Utc::now()),
            views: "0".to_string(),
        };
        published.insert(0, article.clone());

        self.write(vec![
            encode(Collection::Submitted, &submitted)?,
            encode(Collection::Published, &published)?,
        ])
        .await?;

        info!(id = %article.id, title = %article.title, "article approved and published");
        Ok(Some(article))
    }

    /// Send a submitted article back to drafts. `None` when `id` is not awaiting moderation.
    pub async fn reject(&self, id: &str) -> Result<Option<Draft>> {
        let _guard = self.lock.lock().await;
        let mut submitted: Vec<Submission> = self.load_for_update(Collection::Submitted).await?;

        let Some(submission) = take(&mut submitted, id) else {
            warn!(id, "reject: article is not awaiting moderation");
            return Ok(None);
        };

        let mut drafts: Vec<Draft> = self.load_for_update(Collection::Drafts).await?;
        let draft = Draft {
            id: submission.id,
            title: submission.title,
            content: submission.content,
            updated_at: Utc::now(),
        };
        match drafts.iter_mut().find(|d| d.id == draft.id) {
            Some(slot) => *slot = draft.clone(),
            None => drafts.push(draft.clone()),
        }

        self.write(vec![
            encode(Collection::Submitted, &submitted)?,
            encode(Collection::Drafts, &drafts)?,
        ])
        .await?;

        info!(id = %draft.id, "article rejected back to drafts");
        Ok(Some(draft))
    }

    // -- Publication --

    pub async fn list_published(&self) -> Vec<PublishedArticle> {
        self.load_published().await
    }

    /// Find an article in whichever collection currently holds it.
    pub async fn locate(&self, id: &str) -> Option<ArticleRecord> {
        let _guard = self.lock.lock().await;

        if let Some(draft) = self.list_drafts().await.into_iter().find(|d| d.id == id) {
            return Some(ArticleRecord::Draft(draft));
        }
        if let Some(submission) = self.list_submitted().await.into_iter().find(|s| s.id == id) {
            return Some(ArticleRecord::Submitted(submission));
        }
        self.load_published()
            .await
            .into_iter()
            .find(|p| p.id == id)
            .map(ArticleRecord::Published)
    }

    pub async fn dashboard(&self) -> Dashboard {
        let _guard = self.lock.lock().await;
        Dashboard {
            drafts: self.list_drafts().await.len(),
            submitted: self.list_submitted().await.len(),
            published: self.load_published().await.len(),
        }
    }

    // -- Settings --

    /// Saved settings, or the configured defaults when none are stored.
    pub async fn settings(&self) -> EditorialSettings {
        let key = Collection::Settings.key();
        match self.store.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key, error = %e, "malformed settings, using defaults");
                self.default_settings.clone()
            }),
            Ok(None) => self.default_settings.clone(),
            Err(e) => {
                warn!(key, error = %e, "failed to read settings, using defaults");
                self.default_settings.clone()
            }
        }
    }

    pub async fn save_settings(&self, settings: &EditorialSettings) -> Result<()> {
        let _guard = self.lock.lock().await;
        let value = serde_json::to_string(settings).context("failed to serialize settings")?;
        self.write(vec![(Collection::Settings.key().to_string(), value)]).await?;
        info!("editorial settings saved");
        Ok(())
    }

    // -- Persistence helpers --

    async fn enqueue(&self, drafts: Vec<Draft>, submission: Submission) -> Result<Submission> {
        let mut submitted: Vec<Submission> = self.load_for_update(Collection::Submitted).await?;
        take(&mut submitted, &submission.id);
        submitted.insert(0, submission.clone());

        self.write(vec![
            encode(Collection::Drafts, &drafts)?,
            encode(Collection::Submitted, &submitted)?,
        ])
        .await?;

        info!(id = %submission.id, title = %submission.title, "article submitted for moderation");
        Ok(submission)
    }

    /// Read a collection for display, failing soft: unreadable or malformed data is an empty list.
    async fn load<T>(&self, collection: Collection) -> Vec<T>
    where
        T: DeserializeOwned + Keyed,
    {
        self.load_for_update(collection).await.unwrap_or_else(|e| {
            warn!(key = collection.key(), error = %e, "failed to read collection, treating as empty");
            Vec::new()
        })
    }

    /// Read a collection that is about to be rewritten. Store failures propagate so a
    /// transition never writes back a list it could not read; malformed JSON still
    /// decodes as empty.
    async fn load_for_update<T>(&self, collection: Collection) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Keyed,
    {
        let raw = self
            .store
            .get(collection.key())
            .await
            .with_context(|| format!("failed to read {}", collection.key()))?;
        Ok(raw.map(|raw| decode_collection(collection, &raw)).unwrap_or_default())
    }

    /// Published list, seeded with the sample entries until something is stored.
    async fn load_published(&self) -> Vec<PublishedArticle> {
        self.load_published_for_update().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read published articles, treating as empty");
            Vec::new()
        })
    }

    async fn load_published_for_update(&self) -> Result<Vec<PublishedArticle>> {
        let collection = Collection::Published;
        let raw = self
            .store
            .get(collection.key())
            .await
            .with_context(|| format!("failed to read {}", collection.key()))?;
        Ok(match raw {
            Some(raw) => decode_collection(collection, &raw),
            None => seed_published(),
        })
    }

    async fn write(&self, entries: Vec<(String, String)>) -> Result<()> {
        self.store
            .set_many(entries)
            .await
            .context("failed to persist editorial collections")
    }
}

fn encode<T: Serialize>(collection: Collection, records: &[T]) -> Result<(String, String)> {
    let value = serde_json::to_string(records)
        .with_context(|| format!("failed to serialize {}", collection.key()))?;
    Ok((collection.key().to_string(), value))
}

/// Remove and return the record with `id`, if present.
fn take<T: Keyed>(records: &mut Vec<T>, id: &str) -> Option<T> {
    let position = records.iter().position(|r| r.id() == id)?;
    Some(records.remove(position))
}
