//! DEX connector gateway.
//!
//! Serves the connector catalog and AMM price quotes over HTTP.
//!
//! Run with: `cargo run -p gateway -- --config conf/gateway.toml`

mod routes;

use clap::Parser;
use connectors::{Catalog, ChainSet, ConnectorFactory, GatewayConfig};
use routes::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gateway", about = "DEX connector gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "conf/gateway.toml")]
    config: PathBuf,

    /// Port to listen on, overriding the configuration.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = GatewayConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    let chains = ChainSet::from_config(&config)?;
    info!(chains = chains.len(), config = %args.config.display(), "configuration loaded");

    let catalog = Catalog::from_config(&config);
    let factory = ConnectorFactory::new(&config, chains)?;
    let app = routes::router(Arc::new(AppState::new(catalog, factory)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
