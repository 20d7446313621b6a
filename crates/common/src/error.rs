use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::types::CampaignStatus;

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unusable recipient upload; raised before any campaign exists.
    #[error("Input error: {0}")]
    Input(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing tenant setup (e.g. no provider credentials); raised before any campaign exists.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Input(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Config(msg) => (StatusCode::PRECONDITION_FAILED, msg.clone()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Input("empty".into()), StatusCode::BAD_REQUEST),
            (AppError::Config("no creds".into()), StatusCode::PRECONDITION_FAILED),
            (AppError::NotFound("campaign".into()), StatusCode::NOT_FOUND),
            (
                AppError::InvalidTransition {
                    from: CampaignStatus::Completed,
                    to: CampaignStatus::Sending,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppError::InvalidTransition {
            from: CampaignStatus::Error,
            to: CampaignStatus::Completed,
        };
        assert_eq!(err.to_string(), "Invalid status transition: error -> completed");
    }
}
