use anyhow::{Context, Result};
use common::StorageConfig;
use std::sync::Arc;
use tracing::info;

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// String key-value persistence, the server-side stand-in for the browser's local storage.
///
/// Values are opaque strings; the editorial desk stores JSON documents under fixed keys.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write several keys at once. Either every entry becomes visible or none does.
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<()>;

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)]).await
    }

    async fn remove(&self, key: &str) -> Result<()>;
}

/// Open the store selected by the `[storage]` config section.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    let backend = config.backend.as_deref().unwrap_or("file");
    match backend {
        "memory" => {
            info!("storage: in-memory (nothing survives a restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
        "file" => {
            let path = config.path.clone().unwrap_or_else(|| "data/newzlm.json".to_string());
            info!(path = %path, "storage: JSON file");
            Ok(Arc::new(FileStore::new(path)))
        }
        "sqlite" => {
            let path = config.path.clone().unwrap_or_else(|| "data/newzlm.db".to_string());
            info!(path = %path, "storage: sqlite");
            let store = SqliteStore::connect(&path)
                .await
                .with_context(|| format!("failed to open sqlite store at {}", path))?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("Unknown storage backend: {}", other),
    }
}
