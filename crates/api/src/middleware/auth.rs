//! JWT authentication middleware and helpers.
//!
//! Provides JWT encoding/decoding plus an `AuthTenant` Axum extractor
//! that validates the Authorization header on protected routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_common::error::AppError;

use crate::state::AppState;

/// JWT claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the tenant's UUID
    pub sub: String,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
}

/// Authenticated tenant extracted from a JWT.
///
/// Every campaign and credential read is scoped to `tenant_id`:
/// ```ignore
/// async fn handler(auth: AuthTenant) -> impl IntoResponse {
///     // auth.tenant_id owns everything this request may see
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthTenant {
    pub tenant_id: Uuid,
    pub claims: Claims,
}

/// Encode a JWT token for a tenant.
pub fn encode_jwt(tenant_id: Uuid, secret: &str, expiry_hours: u64) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = i64::try_from(expiry_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Auth(format!("Token expiry of {} hours is out of range", expiry_hours))
        })?;

    let claims = Claims {
        sub: tenant_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("Failed to encode JWT: {}", e)))?;

    Ok(token)
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Axum `FromRequestParts` implementation for `AuthTenant`.
///
/// Extracts and validates the JWT from the `Authorization: Bearer <token>` header.
impl FromRequestParts<AppState> for AuthTenant {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = state.config.jwt_secret.clone();

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        async move {
            let token = auth_header
                .as_deref()
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    AppError::Auth(
                        "Missing or invalid Authorization header. Use 'Bearer <JWT>'".to_string(),
                    )
                })?;

            let claims = decode_jwt(token, &secret)?;
            let tenant_id = Uuid::parse_str(&claims.sub)
                .map_err(|_| AppError::Auth("Invalid tenant ID in token".to_string()))?;
            Ok(AuthTenant { tenant_id, claims })
        }
    }
}
