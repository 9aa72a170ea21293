mod cli;

use crate::cli::{LogFormatArg, CLI};
use clap::Parser;
use linkbox_gateway::{select_registry, App, AppState};
use linkbox_generator::RandomGenerator;
use linkbox_shortener::{Shortener, ShortenerService, ShortenerSettings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        server_address = %config.server_address,
        base_url = %config.base_url,
        code_length = config.code_length,
        "starting gateway server"
    );

    let registry = select_registry(
        config.database_dsn.as_deref(),
        Some(config.file_storage_path.as_path()),
    )
    .await;
    let generator = RandomGenerator::new(config.code_length)?;
    let shortener: Arc<dyn Shortener> = Arc::new(ShortenerService::new(
        registry,
        generator,
        ShortenerSettings::default(),
    ));

    let state = AppState::new(Arc::clone(&shortener), config.base_url);
    let listener = TcpListener::bind(&config.server_address).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    shortener.close().await?;
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormatArg::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormatArg::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
