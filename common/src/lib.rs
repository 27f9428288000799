/*!
common/src/lib.rs

Shared configuration types and DB helper functions for NewzLM.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default config file with an optional override
- A helper to initialize an SQLite pool for the database-backed store
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Where the editorial collections are persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "memory", "file" or "sqlite" (defaults to "file")
    pub backend: Option<String>,
    /// JSON document path for "file", database path for "sqlite"
    pub path: Option<String>,
}

/// NewsAPI (headlines + search) client settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub page_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Link-aggregator "top stories" settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HackerNewsConfig {
    pub base_url: Option<String>,
    pub limit: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

/// Remote LLM config (OpenAI-compatible chat completion endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// Local generation service (GET ?system_prompt=..&url=.. -> {title, content})
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Article generation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub adapter: Option<String>, // "endpoint", "llm", "none"
    pub endpoint: Option<EndpointConfig>,
    pub llm: Option<RemoteLlmConfig>,
    /// Fetch the source article page and include its text in LLM prompts
    pub scrape_sources: Option<bool>,
}

/// Editor login settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub email: Option<String>,
    /// Argon2 PHC string, see `newzlm hash-password`
    pub password_hash: Option<String>,
    /// Development fallback: plaintext password read from this env var
    pub password_env: Option<String>,
    pub jwt_secret_env: Option<String>,
    pub token_ttl_hours: Option<u64>,
}

/// Default editorial settings, used until the editor saves their own
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorialConfig {
    pub editorial_voice: Option<String>,
    pub content_guidelines: Option<String>,
    pub tone: Option<String>,
    pub company: Option<String>,
}

/// HTTP bind settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    pub news: Option<NewsConfig>,
    pub hacker_news: Option<HackerNewsConfig>,
    pub generator: Option<GeneratorConfig>,
    pub auth: Option<AuthConfig>,
    pub editorial: Option<EditorialConfig>,
    pub server: Option<ServerConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// With neither present, every section falls back to its built-in default.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Initialize an SQLite connection pool.
///
/// Creates the parent directory if necessary and returns a WAL-mode pool.
/// The pool is small on purpose: all writes go through one editorial desk.
///
/// Example:
///   let pool = init_db_pool("data/newzlm.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [storage]
            backend = "sqlite"
            path = "data/test.db"

            [news]
            api_key_env = "NEWS_API_KEY"
            page_size = 20

            [auth]
            email = "admin@the-steppe.com"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.storage.backend.as_deref(), Some("sqlite"));
        assert_eq!(cfg.news.as_ref().and_then(|n| n.page_size), Some(20));
        assert_eq!(
            cfg.auth.as_ref().and_then(|a| a.email.as_deref()),
            Some("admin@the-steppe.com")
        );
        assert!(cfg.generator.is_none());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert!(cfg.storage.backend.is_none());
        assert!(cfg.server.is_none());
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        std::fs::write(
            &default_path,
            "[storage]\nbackend = \"file\"\npath = \"data/newzlm.json\"\n\n[server]\nport = 8000\n",
        )
        .expect("write default");
        std::fs::write(&override_path, "[storage]\nbackend = \"memory\"\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert_eq!(cfg.storage.backend.as_deref(), Some("memory"));
        // Untouched keys survive the merge
        assert_eq!(cfg.storage.path.as_deref(), Some("data/newzlm.json"));
        assert_eq!(cfg.server.and_then(|s| s.port), Some(8000));
    }

    #[tokio::test]
    async fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_with_defaults(Some(&dir.path().join("nope.toml")), None)
            .await
            .expect("load config");
        assert!(cfg.news.is_none());
    }

    #[tokio::test]
    async fn db_pool_in_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("newzlm.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
        assert!(db_path.exists());
    }
}
