/*
newzlm - single-binary main.rs
Loads configuration, wires the editorial desk to its storage, news and generation
backends, and serves the HTTP API.
*/

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newzlm::auth::{self, Authenticator};
use newzlm::editorial::{EditorialDesk, EditorialSettings};
use newzlm::generator;
use newzlm::news::{HackerNewsClient, NewsApiClient, NewsSource};
use newzlm::server::{launch_rocket, AppState};
use newzlm::store;

#[derive(Parser, Debug)]
#[command(name = "newzlm", about = "NewzLM editorial back-end")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print an argon2 hash for `[auth] password_hash`
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Some(Command::HashPassword { password }) = &args.command {
        println!("{}", auth::hash_password(password)?);
        return Ok(());
    }

    let config = load_config(args.config).await?;
    serve(config).await
}

async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(%e, "failed to load configuration");
        e
    })?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

async fn serve(config: Config) -> Result<()> {
    let store = store::open_store(&config.storage).await?;
    let desk = EditorialDesk::new(store)
        .with_default_settings(EditorialSettings::from_config(config.editorial.as_ref()));

    let news: Option<Arc<dyn NewsSource>> = match config.news.as_ref() {
        Some(news_config) => match NewsApiClient::from_config(news_config)? {
            Some(client) => Some(Arc::new(client)),
            None => {
                warn!("news: API key not set, serving sample articles");
                None
            }
        },
        None => {
            warn!("news: no [news] section, serving sample articles");
            None
        }
    };

    let hacker_news = HackerNewsClient::from_config(config.hacker_news.as_ref())?;

    // A broken generator section should not keep the editorial workflow offline
    let generator = match generator::from_config(config.generator.as_ref()) {
        Ok(generator) => generator,
        Err(e) => {
            error!("Failed to initialize article generator: {:#}", e);
            None
        }
    };

    let state = AppState {
        started_at: Utc::now(),
        desk: Arc::new(desk),
        news,
        hacker_news: Arc::new(hacker_news),
        generator,
        auth: Arc::new(Authenticator::from_config(config.auth.as_ref())),
    };

    info!("Launching Rocket HTTP server");
    if let Err(e) = launch_rocket(state, config.server.as_ref()).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
