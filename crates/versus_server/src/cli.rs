//! Command-line interface for the versus server.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, instrument};
use versus_server::{ConfigError, ConfigOverrides, ServerConfig};

/// Versus - real-time two-player tic-tac-toe over WebSockets
#[derive(Parser, Debug)]
#[command(name = "versus")]
#[command(about = "Two-player tic-tac-toe session server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve(ConfigArgs),

    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

/// Where configuration comes from
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "VERSUS_HOST")]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Seconds a session may live before it is reaped
    #[arg(long)]
    pub retention_secs: Option<u64>,

    /// Seconds between reaper sweeps
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,
}

impl ConfigArgs {
    /// Resolves file, defaults and overrides into a validated config.
    #[instrument(skip(self))]
    pub fn load(self) -> Result<ServerConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => {
                info!("No config file given, using defaults");
                ServerConfig::default()
            }
        };

        base.with_overrides(ConfigOverrides {
            host: self.host,
            port: self.port,
            retention_secs: self.retention_secs,
            sweep_interval_secs: self.sweep_interval_secs,
        })
        .validate()
    }
}
