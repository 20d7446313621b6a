//! Campaign routes: submission, listing, detail and status polling.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use herald_common::error::AppError;
use herald_common::types::Campaign;
use herald_engine::campaign::{CampaignDetail, RecipientUpload, SubmitCampaign};

use crate::middleware::auth::AuthTenant;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns", get(list_campaigns).post(submit_campaign))
        .route("/api/campaigns/{id}", get(campaign_detail))
        .route("/api/campaigns/{id}/status", get(campaign_status))
}

/// Request body for submitting a campaign. `content` is the recipient file as text.
#[derive(Debug, Deserialize)]
pub struct SubmitCampaignRequest {
    pub name: String,
    pub body: String,
    pub from: String,
    pub file_name: String,
    pub content: String,
}

/// POST /api/campaigns - Create a campaign and start delivery in the background.
async fn submit_campaign(
    State(state): State<AppState>,
    auth: AuthTenant,
    Json(req): Json<SubmitCampaignRequest>,
) -> Result<Response, AppError> {
    let submitted = state
        .campaigns
        .submit(
            auth.tenant_id,
            SubmitCampaign {
                name: req.name,
                body: req.body,
                from: req.from,
                upload: RecipientUpload {
                    file_name: req.file_name,
                    content: req.content.into_bytes(),
                },
            },
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(submitted)).into_response())
}

/// GET /api/campaigns - The tenant's most recent campaigns.
async fn list_campaigns(
    State(state): State<AppState>,
    auth: AuthTenant,
) -> Result<Json<Vec<Campaign>>, AppError> {
    let campaigns = state
        .campaigns
        .list(auth.tenant_id, state.config.campaign_list_limit)
        .await?;
    Ok(Json(campaigns))
}

/// GET /api/campaigns/:id - Campaign snapshot plus per-recipient outcomes.
async fn campaign_detail(
    State(state): State<AppState>,
    auth: AuthTenant,
    Path(id): Path<i64>,
) -> Result<Json<CampaignDetail>, AppError> {
    let detail = state.campaigns.detail(auth.tenant_id, id).await?;
    Ok(Json(detail))
}

/// GET /api/campaigns/:id/status - Live progress for polling clients. Never cached.
async fn campaign_status(
    State(state): State<AppState>,
    auth: AuthTenant,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let progress = state.campaigns.progress(auth.tenant_id, id).await?;

    let mut response = Json(progress).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
