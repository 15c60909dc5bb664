// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Herald - rate-limited bulk broadcaster for a VPN subscription Telegram bot.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod send;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use herald_config::model::HeraldConfig;

/// Herald - rate-limited bulk broadcaster.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Run one broadcast from the command line and print its stats.
    Broadcast(BroadcastArgs),
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate the configuration, then exit.
    Check,
}

#[derive(Args, Debug)]
pub(crate) struct BroadcastArgs {
    /// Audience: all, subscribed, unsubscribed, untrial, trial, hotleads or cluster.
    #[arg(long)]
    pub send_to: String,

    /// Message body (Telegram HTML, optional BUTTONS: block).
    #[arg(long, conflicts_with = "text_file", required_unless_present = "text_file")]
    pub text: Option<String>,

    /// Read the message body from a file.
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// Telegram file id of a pre-uploaded photo.
    #[arg(long)]
    pub photo: Option<String>,

    /// Cluster name, required with `--send-to cluster`.
    #[arg(long)]
    pub cluster: Option<String>,

    #[arg(long)]
    pub workers: Option<i64>,

    /// Messages per second.
    #[arg(long)]
    pub rate: Option<i64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            herald_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    if let Err(errors) = check_serving(&cli.command, &config) {
        herald_config::render_errors(&errors);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Config {
            action: ConfigAction::Check,
        } => {
            println!(
                "herald: configuration is valid (service.name={}, database={})",
                config.service.name,
                config.storage.database_path
            );
            Ok(())
        }
        Commands::Serve => {
            init_tracing(&config.service.log_level);
            serve::run_serve(config).await
        }
        Commands::Broadcast(args) => {
            init_tracing(&config.service.log_level);
            send::run_broadcast(config, args).await
        }
    };

    if let Err(e) = result {
        eprintln!("herald: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<HeraldConfig, Vec<herald_config::ConfigError>> {
    match path {
        Some(path) => herald_config::load_and_validate_path(path),
        None => herald_config::load_and_validate(),
    }
}

/// Gateway checks for commands that serve HTTP. `config check` runs them only
/// when the gateway is enabled; `broadcast` never does.
fn check_serving(
    command: &Commands,
    config: &HeraldConfig,
) -> Result<(), Vec<herald_config::ConfigError>> {
    match command {
        Commands::Serve => herald_config::validate_serving(config),
        Commands::Config { .. } if config.gateway.enabled => {
            herald_config::validate_serving(config)
        }
        _ => Ok(()),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("herald={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
