//! Provider credential settings.
//!
//! Credentials are write-only from the client's point of view: reads return a
//! masked summary.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use herald_common::error::AppError;
use herald_common::types::{CredentialSummary, ProviderCredential};

use crate::middleware::auth::AuthTenant;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/settings/credentials",
        get(get_credentials).put(update_credentials),
    )
}

/// Request body for a credential update.
#[derive(Deserialize)]
pub struct UpdateCredentialsRequest {
    pub account_sid: String,
    pub auth_token: String,
}

/// GET /api/settings/credentials - Masked view of the tenant's credentials.
async fn get_credentials(
    State(state): State<AppState>,
    auth: AuthTenant,
) -> Result<Json<CredentialSummary>, AppError> {
    let summary = state.credentials.summary(auth.tenant_id).await?;
    Ok(Json(summary))
}

/// PUT /api/settings/credentials - Replace the tenant's credentials.
async fn update_credentials(
    State(state): State<AppState>,
    auth: AuthTenant,
    Json(req): Json<UpdateCredentialsRequest>,
) -> Result<Json<CredentialSummary>, AppError> {
    let summary = state
        .credentials
        .update(
            auth.tenant_id,
            ProviderCredential::new(req.account_sid, req.auth_token),
        )
        .await?;

    Ok(Json(summary))
}
