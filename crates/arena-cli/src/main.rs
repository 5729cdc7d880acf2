mod commands;
mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arena_dispatch::Dispatcher;
use arena_llm::AdapterRegistry;
use arena_persist::{JsonFileStore, KeyValueStore, Workspace};

use crate::commands::Command;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.storage.path));
    let workspace = Workspace::load(store.as_ref())
        .await
        .with_context(|| format!("Failed to load state from {}", config.storage.path.display()))?;

    tracing::debug!(path = %config.storage.path.display(), "State loaded");

    let registry = AdapterRegistry::new(&config.providers)?;
    let dispatcher = Dispatcher::builder()
        .adapter(Arc::new(registry))
        .workspace(workspace)
        .with_persistence(store)
        .build()?;

    command.run(&dispatcher).await
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries command output
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
