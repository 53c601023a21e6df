use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytbridge::cache;
use ytbridge::config::Config;
use ytbridge::web::{self, AppState};

#[derive(Parser)]
#[command(name = "ytbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP bridge that resolves YouTube video ids to playable media and proxies/remuxes the stream")]
struct Cli {
    /// Listening host (overrides HOST)
    #[arg(short = 'H', long, value_name = "ADDR")]
    host: Option<String>,

    /// Listening port (overrides PORT)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log filter (overrides RUST_LOG)
    #[arg(short, long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(log_level) = cli.log_level {
        config.log_filter = log_level;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.clone().into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting ytbridge v{}", env!("CARGO_PKG_VERSION"));

    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

    let cache = cache::build(&config);

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, client, cache });
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install Ctrl+C handler: {err}");
    }
}
