//! Slashhook server - slash-command interactions webhook and command sync.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use slashhook_core::{ApiClient, Credentials, Syncer};
use slashhook_server::{commands, config::Config, logging, routes, state::AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use logging::{LogArgs, LogConfig};

/// Slashhook - slash-command interactions over an HTTP webhook.
#[derive(Parser, Debug)]
#[command(name = "slashhook-server")]
#[command(about = "Serve slash-command interactions and sync command registrations")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Hex-encoded Ed25519 public key of the application
    #[arg(long, env = "PUBLIC_KEY", hide_env_values = true, default_value = "")]
    public_key: String,

    /// Application (client) id
    #[arg(long, env = "CLIENT_ID", default_value = "")]
    client_id: String,

    /// Bot token used for command-management calls
    #[arg(long, env = "TOKEN", hide_env_values = true, default_value = "")]
    token: String,

    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the interactions webhook (default)
    Serve {
        /// Override port from config
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Reconcile the platform's registered commands with the built-in set
    Sync {
        /// Additional guild to sweep for stale commands (repeatable)
        #[arg(long = "guild", value_name = "GUILD_ID")]
        guild_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogConfig::from(&cli.log));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Blank values are reported together, before any work starts
    let credentials = Credentials::new(cli.public_key, cli.client_id, cli.token)?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, credentials, port).await,
        Command::Sync { guild_ids } => sync(config, credentials, guild_ids).await,
    }
}

async fn serve(mut config: Config, credentials: Credentials, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.port = port;
    }
    tracing::info!(
        target: "slashhook::startup",
        "Loaded configuration (port: {}, path: {})",
        config.port,
        config.interactions_path
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config, credentials.public_key)?);
    tracing::info!(
        target: "slashhook::startup",
        "Registered {} commands",
        state.dispatcher.registry().len()
    );

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    tracing::info!(target: "slashhook::startup", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn sync(config: Config, credentials: Credentials, extra_guild_ids: Vec<String>) -> Result<()> {
    let registry = commands::builtin_commands(&config.guild_ids)?;
    let client = ApiClient::new(&credentials, &config.api_base_url)
        .context("building API client")?;

    let mut sweep = config.guild_ids.clone();
    sweep.extend(extra_guild_ids);

    let errors = Syncer::new(client).sync(&registry, &sweep).await;
    for err in &errors {
        tracing::error!(target: "slashhook::sync", "{}", err);
    }
    if !errors.is_empty() {
        bail!("sync finished with {} errors", errors.len());
    }
    Ok(())
}
