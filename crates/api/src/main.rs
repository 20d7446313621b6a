//! Herald API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;
use herald_common::db::{create_pool, run_migrations};
use herald_engine::campaign::CampaignService;
use herald_engine::credentials::{ClientResolver, PgCredentialStore};
use herald_engine::dispatch::{DispatchEngine, DispatchWorker};
use herald_engine::store::PgCampaignStore;
use herald_provider::twilio::TwilioConnector;

use herald_api::routes::create_router;
use herald_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("herald_api=debug,herald_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Herald API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;

    // Wire stores, provider and dispatch worker
    let store = Arc::new(PgCampaignStore::new(pool.clone()));
    let resolver = ClientResolver::new(
        Arc::new(PgCredentialStore::new(pool)),
        Arc::new(TwilioConnector::new(config.provider_api_base.clone())),
    );
    let engine = Arc::new(DispatchEngine::new(store.clone(), config.dispatch_interval()));
    let campaigns = CampaignService::new(store, resolver.clone(), DispatchWorker::new(engine));

    // Build application state
    let state = AppState::new(campaigns, resolver, config.clone());

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    tracing::info!("Herald API server stopped.");
    Ok(())
}
