use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::KeyValueStore;

/// All keys live in a single JSON object on disk, like one browser profile.
///
/// Every write rewrites the whole document into a sibling temp file and renames it
/// over the original, so a reader sees either the old document or the new one.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<BTreeMap<String, String>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read store file: {}", self.path.display()))
            }
        };

        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&data)
            .with_context(|| format!("Store file is not a JSON object: {}", self.path.display()))
    }

    async fn write_document(&self, document: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create store directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(document).context("Failed to serialize store document")?;
        let tmp_path = self.path.with_extension("tmp");

        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write store file: {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace store file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), keys = document.len(), "store file written");
        Ok(())
    }

    /// Current document for a read-modify-write. A corrupt file is replaced, not repaired.
    async fn document_for_update(&self) -> BTreeMap<String, String> {
        match self.read_document().await {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "store file unreadable, starting from an empty document");
                BTreeMap::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut document = self.read_document().await?;
        Ok(document.remove(key))
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.document_for_update().await;
        document.extend(entries);
        self.write_document(&document).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.document_for_update().await;
        if document.remove(key).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }
}
