// ABOUTME: Entry point for the redeploy webhook server.
// ABOUTME: Loads services, connects to the engine, then serves until signalled.

mod cli;

use clap::Parser;
use cli::Cli;
use redeploy::config::Config;
use redeploy::error::{Error, Result};
use redeploy::index::ImageIndex;
use redeploy::redeploy::{HttpNotifier, Redeployer};
use redeploy::runtime::{self, RuntimeError};
use redeploy::server::{self, AppState};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level; --verbose wins over both
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let index = Arc::new(ImageIndex::new(&config.services));
    info!(
        config = %cli.config.display(),
        services = config.services.len(),
        images = index.len(),
        "loaded services"
    );

    let listener = server::bind(&cli.host, cli.port)
        .await
        .map_err(|source| Error::Listen {
            address: format!("{}:{}", cli.host, cli.port),
            source,
        })?;

    let engine = runtime::connect(cli.docker_host.as_deref())
        .await
        .inspect_err(report_connection)?;

    let redeployer = Arc::new(Redeployer::new(Arc::new(engine), index));
    let state = AppState::new(redeployer, Arc::new(HttpNotifier::default()));
    let app = server::router(state, &cli.path);

    server::serve(listener, app, server::shutdown_signal())
        .await
        .map_err(Error::Serve)?;

    info!("shut down gracefully");
    Ok(())
}

fn report_connection(e: &RuntimeError) {
    let details = e.connection_details().unwrap_or_default();
    error!(kind = ?e.kind(), details, "cannot reach the container engine");
}
