// ABOUTME: Production server binary wiring config, logging, store, and routes
// ABOUTME: Serves the OAuth endpoints plus health checks on a single port
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vendia OAuth Server Binary
//!
//! Starts the authorization server with an in-memory store, the commerce
//! scope table, and the full HTTP surface.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use vendia_oauth_server::{
    clients::ClientManager,
    config::ServerConfig,
    crypto::SecretFactory,
    logging,
    routes::{self, ServerResources},
    scopes::ScopeRegistry,
    service::AuthorizationService,
    store::{MemoryStore, OAuthStore},
};

#[derive(Parser)]
#[command(name = "vendia-oauth-server")]
#[command(about = "Vendia OAuth 2.0 authorization server for commerce platform clients")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env();
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Vendia OAuth Server");
    info!("{}", config.summary());

    let store: Arc<dyn OAuthStore> = Arc::new(MemoryStore::new());
    let secrets = Arc::new(SecretFactory::system());
    let registry = Arc::new(ScopeRegistry::commerce());
    let clients = Arc::new(ClientManager::new(
        Arc::clone(&store),
        Arc::clone(&secrets),
        Arc::clone(&registry),
    ));
    let service = AuthorizationService::new(
        store,
        Arc::clone(&clients),
        Arc::clone(&registry),
        secrets,
        config.ttls,
    );

    let resources = Arc::new(ServerResources {
        service,
        clients,
        registry,
        config: config.clone(),
    });
    let app = routes::router(resources);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
