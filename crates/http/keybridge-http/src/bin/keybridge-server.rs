//! Standalone broker server wired with in-memory stores.

use keybridge_core::{ConnectionStore, UserStore};
use keybridge_flow::{
    InMemoryConnectionStore, InMemoryFlowStateStore, InMemoryUserStore, Orchestrator, Reconciler,
};
use keybridge_http::{AppState, InMemorySessionAuth, SessionAuth, router};
use keybridge_providers::{HttpTransport, OAuthConfig, ProviderRegistry, ReqwestTransport};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let base_url = std::env::var("KEYBRIDGE_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());
    let bind_addr =
        std::env::var("KEYBRIDGE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let config = OAuthConfig::from_env(&base_url);
    if config.enabled_providers().is_empty() {
        warn!("no OAuth providers configured; set OAUTH_<PROVIDER>_CLIENT_ID/_CLIENT_SECRET");
    }

    let transport: Arc<dyn HttpTransport> =
        Arc::new(ReqwestTransport::new(config.http_timeout));
    let registry = Arc::new(ProviderRegistry::from_config(&config, transport));

    let users = Arc::new(InMemoryUserStore::new());
    let connections: Arc<dyn ConnectionStore> = Arc::new(InMemoryConnectionStore::new());
    let orchestrator = Orchestrator::new(
        Arc::clone(&registry),
        Arc::new(InMemoryFlowStateStore::new()),
        Reconciler::new(users as Arc<dyn UserStore>, Arc::clone(&connections)),
    );

    let app = router(AppState {
        orchestrator: Arc::new(orchestrator),
        connections,
        sessions: Arc::new(InMemorySessionAuth::new()) as Arc<dyn SessionAuth>,
    });

    info!(%bind_addr, %base_url, providers = ?config.enabled_providers(), "starting keybridge server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
