//! Service entry point: parse the command line, wire the state, serve.

use anyhow::{Context, Result};
use clap::Parser;
use sesame::config::Cli;
use sesame::server::{routes, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sesame=info".parse().unwrap()),
        )
        .init();

    info!("starting sesame v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(cli.server_config())?;
    let app = routes::router(state);

    let addr = cli.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("sesame stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received shutdown signal");
}
