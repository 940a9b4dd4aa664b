use std::sync::Arc;

use anyhow::Context;
use solana_sdk::signature::read_keypair_file;
use tracing_subscriber::EnvFilter;

mod api;
mod broadcaster;
mod config;
mod error;
mod feed_client;
mod poller;
mod rate_math;
mod registry_client;
mod solana_registry;
mod types;
mod update_decision;

use broadcaster::{NetworkBroadcaster, NetworkTarget};
use config::Config;
use feed_client::TickerClient;
use poller::Poller;
use solana_registry::SolanaRegistryClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("🚀 Starting rate sync service...");

    let config = Config::from_env()?;

    // One registry client per network, in configured order
    let mut targets = Vec::with_capacity(config.networks.len());
    for network in &config.networks {
        let owner = read_keypair_file(&network.keypair_path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to read keypair for {}", network.name))?;

        tracing::info!(
            network = %network.name,
            rpc_url = %network.rpc_url,
            registry = %network.registry_address,
            "🔗 Registered network"
        );

        let client = SolanaRegistryClient::new(&network.rpc_url, network.registry_address, owner);
        targets.push(NetworkTarget::new(network.name.clone(), Arc::new(client)));
    }

    let feed = TickerClient::new(&config.feed_url)?;
    let poller = Arc::new(Poller::new(
        Arc::new(feed),
        NetworkBroadcaster::new(targets),
        config.poll_interval,
    ));

    let router = api::create_router(api::AppState {
        status: poller.status(),
        networks: config.networks.iter().map(|n| n.name.clone()).collect(),
    });
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🌐 Status API listening on {}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Status API stopped");
        }
    });

    let stopped = poller.run(tokio::signal::ctrl_c()).await;

    server.abort();
    stopped.context("Failed to listen for Ctrl-C")?;
    tracing::info!("✅ Shutdown complete");

    Ok(())
}
