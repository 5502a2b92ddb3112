//! xFloor memory gateway: /memory/* routes forwarded to the xFloor API.

use floor_api::config::Config;
use floor_api::server::{self, AppState};
use floor_client::{MemoryConnector, XfloorConnector};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        base_url = %config.client.base_url,
        verify_tls = config.client.verify_tls,
        ca_cert = ?config.client.ca_cert_path,
        "xFloor API target"
    );
    if !config.client.verify_tls {
        tracing::warn!("TLS certificate verification is disabled");
    }

    let connector: Arc<dyn MemoryConnector> =
        Arc::new(XfloorConnector::new(config.client.clone()));
    let app = server::router(Arc::new(AppState::from_config(&config, connector)));
    let addr: SocketAddr = config.listen.parse()?;
    tracing::info!("xFloor memory gateway listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
