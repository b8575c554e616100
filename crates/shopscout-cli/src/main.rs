//! ShopScout CLI
//!
//! Hybrid product search and AI-powered recommendations over a catalog
//! snapshot.

use anyhow::{bail, Context, Result};
use clap::Parser;
use shopscout_core::{
    CategoryResolver, CategoryStore, Config, InMemoryCatalog, LlmClient, OpenAiClient,
};
use std::path::Path;
use std::sync::Arc;

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog_path.clone())
        .context("no catalog given: pass --catalog or set SHOPSCOUT_CATALOG")?;
    let catalog = Arc::new(load_catalog(&catalog_path)?);

    let resolver = Arc::new(CategoryResolver::new(
        Arc::clone(&catalog) as Arc<dyn CategoryStore>
    ));
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(config.llm_service.clone())?);

    match cli.command {
        Commands::Recommend(args) => {
            commands::recommend::run(args, catalog, resolver, llm, &config, cli.format).await
        }
        Commands::Questions(args) => {
            commands::research::run_questions(args, catalog, resolver, llm, &config, cli.format)
                .await
        }
        Commands::Survey(args) => {
            commands::research::run_survey(args, catalog, resolver, llm, &config, cli.format).await
        }
        Commands::Status => commands::status::run(&catalog, cli.format),
    }
}

fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let catalog = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => InMemoryCatalog::from_json_file(path),
        Some("csv") => InMemoryCatalog::from_csv_file(path),
        _ => bail!("unsupported catalog format: {}", path.display()),
    }
    .with_context(|| format!("failed to load catalog from {}", path.display()))?;

    tracing::info!(
        "Loaded {} products ({} with embeddings) from {}",
        catalog.len(),
        catalog.embedded_count(),
        path.display()
    );
    Ok(catalog)
}
