//! Versus - unified CLI
//!
//! Runs the two-player session server or prints its configuration.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, ConfigArgs};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use versus_server::{AppState, SessionRegistry, serve, spawn_reaper};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => run_server(args).await,
        Command::Config(args) => print_config(args),
    }
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,versus_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the session server until Ctrl-C or SIGTERM.
#[instrument(skip(args))]
async fn run_server(args: ConfigArgs) -> Result<()> {
    initialize_tracing();

    let config = args.load()?;
    info!(?config, "Starting versus server");

    let registry = Arc::new(SessionRegistry::with_id_length(*config.session_id_length()));
    let reaper = spawn_reaper(
        Arc::clone(&registry),
        config.sweep_interval(),
        config.retention(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let result = serve(listener, AppState::new(registry), shutdown_signal()).await;

    reaper.abort();
    info!("Reaper stopped");
    result?;

    Ok(())
}

/// Print the effective configuration.
fn print_config(args: ConfigArgs) -> Result<()> {
    let config = args.load()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received: closing HTTP server"),
        _ = terminate => info!("SIGTERM received: closing HTTP server"),
    }
}
