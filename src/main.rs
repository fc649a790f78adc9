use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use compass::config::AppConfig;
use compass::server::{create_router, AppState};
use compass::shutdown::{cancel_on_shutdown, wait_for_shutdown};
use compass::workflow::QueryEngine;

#[derive(Parser)]
#[command(name = "compass", about = "Destination questions answered with live local data")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Answer a single query and exit
    Ask {
        /// The question to answer
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ask { query } => ask(config, &query).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting compass server"
    );

    let state = Arc::new(AppState::new(&config)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn ask(config: AppConfig, query: &str) -> anyhow::Result<()> {
    let engine = QueryEngine::from_config(&config)?;
    let state = engine.run(query, &cancel_on_shutdown()).await?;

    for note in state.notes() {
        tracing::warn!(note = %note, "Answer degraded");
    }

    println!("{}", state.into_output()?);
    Ok(())
}
