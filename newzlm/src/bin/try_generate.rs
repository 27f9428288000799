//! Run the configured article generator once against a sample article.
//!
//! Usage: try_generate [config.toml] [enhance]

use std::path::PathBuf;

use common::Config;
use newzlm::editorial::EditorialSettings;
use newzlm::generator::{self, enhancement_request, generation_request};
use newzlm::news::samples::sample_articles;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| "config.toml".to_string()));
    let enhance = args.next().as_deref() == Some("enhance");

    let default_path = PathBuf::from("config.default.toml");
    let config = Config::load_with_defaults(Some(&default_path), Some(&config_path)).await?;

    let Some(generator) = generator::from_config(config.generator.as_ref())? else {
        anyhow::bail!("generation is disabled in {}", config_path.display());
    };

    let settings = EditorialSettings::from_config(config.editorial.as_ref());
    let source = sample_articles().remove(0);

    println!("\n{}", "=".repeat(60));
    println!("Generating from: {}", source.title);
    println!("Mode: {}", if enhance { "enhance" } else { "generate" });
    println!("{}", "=".repeat(60));

    let request = if enhance {
        enhancement_request(&source.title, &source.description, &settings)?
    } else {
        generation_request(Some(source), "", "", &settings)?
    };

    match generator.generate(&request).await {
        Ok(article) => {
            println!("✓ Success!");
            println!("  Title: {}", article.title);
            println!("  Content ({} chars):\n", article.content.len());
            println!("{}", article.content);
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    Ok(())
}
