mod cli;
mod config;

use std::sync::Arc;

use crate::cli::{LogFormat, CLI};
use crate::config::{Backend, FileConfig, ServerConfig};
use burrow_gateway::{App, AppState, SharedStore};
use burrow_generator::RandomGenerator;
use burrow_shortener::{DeletePipeline, LinkService};
use burrow_storage::{FileStore, InMemoryStore, PostgresStore};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CLI::parse();
    init_tracing(cli.log_format);

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = ServerConfig::resolve(cli, file)?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.backend,
        "starting burrow http server"
    );

    let store = open_store(&config.backend).await?;
    let links = LinkService::new(store, RandomGenerator::new());
    let pipeline = Arc::new(DeletePipeline::spawn(
        links.clone(),
        config.pipeline.clone(),
    ));
    let state = AppState::new(links, Arc::clone(&pipeline), config.base_url.clone());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pipeline.shutdown().await;
    info!("burrow http server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn open_store(backend: &Backend) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match backend {
        Backend::Postgres(dsn) => {
            let store = PostgresStore::connect(dsn).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        Backend::File(path) => Arc::new(FileStore::open(path)?),
        Backend::InMemory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
