//! Issue an API token for a tenant.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=... cargo run --bin issue-token -- <tenant-uuid>
//!
//! # Mint a token for a brand-new tenant id
//! JWT_SECRET=... cargo run --bin issue-token
//! ```
//!
//! Only `JWT_SECRET` (and optionally `JWT_EXPIRY_HOURS`) are read; no database
//! connection is made.

use uuid::Uuid;

use herald_api::middleware::auth::encode_jwt;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
    let expiry_hours: u64 = std::env::var("JWT_EXPIRY_HOURS")
        .unwrap_or_else(|_| "24".to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?;

    let tenant_id = match std::env::args().nth(1) {
        Some(arg) => Uuid::parse_str(&arg)
            .map_err(|e| anyhow::anyhow!("invalid tenant id '{}': {}", arg, e))?,
        None => Uuid::new_v4(),
    };

    let token = encode_jwt(tenant_id, &secret, expiry_hours)?;

    println!("tenant_id: {}", tenant_id);
    println!("token:     {}", token);
    Ok(())
}
