mod presenter;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomview_core::{
    load_config, load_config_from_env, validate_config, CatalogView, Config, MockRoomSource,
    PaginationController, Room,
};

use presenter::CardPresenter;
use session::{OutputFormat, ScrollSession};

/// Config file used when `ROOMVIEW_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "roomview.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Load the configured file, or defaults plus environment when no file is
/// configured and the default one is absent.
fn resolve_config() -> Result<Config> {
    let (config_path, explicit) = match std::env::var("ROOMVIEW_CONFIG") {
        Ok(path) => (PathBuf::from(path), true),
        Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    if explicit || config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))
    } else {
        info!("No configuration file, using defaults");
        load_config_from_env().context("Failed to load config from environment")
    }
}

async fn run() -> Result<()> {
    // Initialize logging; frames go to stdout, logs to stderr
    let json_logs = std::env::var("ROOMVIEW_LOG_FORMAT").is_ok_and(|v| v == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let config = resolve_config()?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        "Page size: {}, mock rooms: {}, latency: {}ms",
        config.pagination.page_size, config.mock.room_count, config.mock.latency_ms
    );

    let format = OutputFormat::from_env_value(std::env::var("ROOMVIEW_OUTPUT").ok().as_deref());

    let source = Arc::new(MockRoomSource::from_config(&config.mock));
    let controller = PaginationController::<Room>::initialize(source, config.pagination.clone()).await;
    if let Some(failure) = controller.last_error() {
        info!("First page failed ({}), the session will retry", failure.error);
    }

    let presenter = CardPresenter::new(config.view.collapsed_variants);
    let view = CatalogView::new(controller, presenter, config.view.clone());

    let summary = ScrollSession::new(view, config.media.clone(), format, std::io::stdout().lock())
        .run()
        .await?;

    info!(
        "Scrolled {} rooms in {} steps{}",
        summary.rooms,
        summary.steps,
        if summary.exhausted { "" } else { " (catalog not exhausted)" }
    );
    Ok(())
}
