use std::time::Duration;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Socket address the API server binds to (default: 0.0.0.0:3000)
    pub listen_addr: String,

    /// Base URL of the messaging provider REST API
    pub provider_api_base: String,

    /// Pause between two consecutive sends of one campaign (default: 1000)
    pub dispatch_interval_ms: u64,

    /// Number of campaigns returned by the campaign listing (default: 10)
    pub campaign_list_limit: i64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?,
            listen_addr: std::env::var("API_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            provider_api_base: std::env::var("PROVIDER_API_BASE")
                .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
            dispatch_interval_ms: std::env::var("DISPATCH_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_INTERVAL_MS must be a valid u64"))?,
            campaign_list_limit: std::env::var("CAMPAIGN_LIST_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CAMPAIGN_LIST_LIMIT must be a valid i64"))?,
        })
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}
