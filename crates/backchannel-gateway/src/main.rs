//! Backchannel Gateway - WebSocket hub for server-to-client RPC
//!
//! This is the main entry point for the gateway service. It wires the
//! durable registry, the blob side-channel, and the correlator to the
//! WebSocket transport and serves the hub API.
//!
//! # Configuration
//!
//! Environment variables:
//!
//! - `LISTEN_ADDR` - bind address (default `0.0.0.0:8080`)
//! - `DATA_DIR` - RocksDB directory (default `/data/backchannel`)
//! - `BLOB_DIR` - local blob store root (default `/data/backchannel-blobs`)
//! - `BLOB_URL` - when set, use the remote HTTP blob service instead of
//!   the local folder
//! - `USER_ID_HEADER` - trusted header carrying the authenticated user

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backchannel_blob::{BlobStore, FsBlobStore, HttpBlobStore};
use backchannel_gateway::{
    create_router, ConnectionMap, GatewayConfig, HeaderAuthenticator, HubState, USER_ID_HEADER,
};
use backchannel_hub::{Hub, HubConfig};
use backchannel_registry::{NoUserLookup, RocksStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,backchannel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Backchannel Gateway");

    // Load configuration from environment
    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/backchannel".into());
    let blob_dir = std::env::var("BLOB_DIR").unwrap_or_else(|_| "/data/backchannel-blobs".into());
    let blob_url = std::env::var("BLOB_URL").ok();
    let user_header = std::env::var("USER_ID_HEADER").unwrap_or_else(|_| USER_ID_HEADER.into());

    tracing::info!(
        listen_addr = %listen_addr,
        data_dir = %data_dir,
        blob_dir = %blob_dir,
        blob_url = ?blob_url,
        "Gateway configuration loaded"
    );

    // Initialize the durable registry store
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&data_dir)?);

    // Initialize the blob side-channel
    let blobs: Arc<dyn BlobStore> = match blob_url {
        Some(url) => {
            tracing::info!(blob_url = %url, "Using the remote HTTP blob service");
            Arc::new(HttpBlobStore::new(url))
        }
        None => Arc::new(FsBlobStore::new(&blob_dir)),
    };

    // Wire the hub to the in-process connection map
    let connections = Arc::new(ConnectionMap::new());
    let hub = Arc::new(Hub::new(
        store,
        Arc::clone(&connections),
        blobs,
        HubConfig::default(),
    ));

    tracing::info!(
        max_concurrent_requests = hub.config().max_concurrent_requests,
        request_timeout_seconds = hub.config().request_timeout_seconds,
        "Hub initialized"
    );

    // Build gateway state and router
    let gateway_config = GatewayConfig {
        listen_addr: listen_addr.clone(),
        ..GatewayConfig::default()
    };
    let state = HubState::new(
        hub,
        connections,
        Arc::new(HeaderAuthenticator::new(user_header)),
        Arc::new(NoUserLookup),
        gateway_config,
    );
    let app = create_router(state);
    tracing::info!("Router configured with all hub endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
