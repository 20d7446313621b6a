//! Shared application state for the Axum API server.

use herald_common::config::AppConfig;
use herald_engine::campaign::CampaignService;
use herald_engine::credentials::ClientResolver;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub campaigns: CampaignService,
    pub credentials: ClientResolver,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(campaigns: CampaignService, credentials: ClientResolver, config: AppConfig) -> Self {
        Self {
            campaigns,
            credentials,
            config,
        }
    }
}
