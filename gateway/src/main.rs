use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rmcp::{
    ServiceExt,
    transport::{sse_server::SseServer, stdio},
};
use voitta_gateway::{
    adapters::server::GatewayServer,
    app::state::GatewayState,
    infra::{
        config::{DEFAULT_CONFIG_PATH, GatewayConfig},
        logging, metrics,
    },
};

/// Gateway exposing router backends and OpenAPI endpoints over MCP.
#[derive(Parser, Debug)]
#[command(name = "voitta-gateway", version, about)]
struct Cli {
    /// Path to the gateway configuration file.
    #[arg(long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = GatewayConfig::load(&cli.config)?;
    // IMPORTANT: logs go to a file; stdout carries MCP JSON-RPC and must stay clean
    logging::init(&config.log_path());
    tracing::info!(config = %cli.config.display(), "starting voitta gateway");

    if let Some(addr) = config.metrics_addr.as_deref() {
        let addr: SocketAddr = addr.parse()?;
        metrics::spawn_metrics_server(addr, config.metrics_auth_token.clone()).await;
    }

    let state = match GatewayState::initialize(&config).await {
        Ok(state) => Arc::new(state),
        Err(err) => {
            tracing::error!(%err, "gateway initialization failed");
            return Err(err.into());
        }
    };
    tracing::info!(
        tools = state.registry.len(),
        endpoints = state.endpoints.len(),
        "gateway initialized"
    );
    let handler = GatewayServer::new(state);

    let http_mode = env::var("FASTMCP_HTTP").map(|v| v == "1").unwrap_or(false);
    if http_mode {
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10000);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!(%addr, "serving MCP over SSE");
        let ct = SseServer::serve(addr)
            .await?
            .with_service(move || handler.clone());
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");
        ct.cancel();
    } else {
        let server = handler.serve(stdio()).await?;
        server.waiting().await?;
    }
    Ok(())
}
