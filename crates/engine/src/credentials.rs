//! Credential Store and Provider Client Resolver.
//!
//! Credentials are keyed by tenant id. Resolution turns a stored credential
//! into an authenticated provider handle; whether the credential actually works
//! is only known once the provider answers a send.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{CredentialSummary, ProviderCredential};
use herald_provider::{MessageProvider, ProviderConnector};

/// Required account SID prefix.
const ACCOUNT_SID_PREFIX: &str = "AC";
/// Exact account SID length.
const ACCOUNT_SID_LEN: usize = 34;
/// Minimum auth token length.
const AUTH_TOKEN_MIN_LEN: usize = 32;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<ProviderCredential>, AppError>;

    /// Replace a tenant's credential (explicit settings update).
    async fn put(&self, tenant_id: Uuid, credential: ProviderCredential) -> Result<(), AppError>;
}

/// Reject credentials that cannot possibly be valid.
pub fn validate_credential(credential: &ProviderCredential) -> Result<(), AppError> {
    let sid = credential.account_sid.trim();
    if !sid.starts_with(ACCOUNT_SID_PREFIX) || sid.len() != ACCOUNT_SID_LEN {
        return Err(AppError::Validation(format!(
            "Account SID must start with '{}' and be {} characters long",
            ACCOUNT_SID_PREFIX, ACCOUNT_SID_LEN
        )));
    }
    if credential.auth_token.expose_secret().trim().len() < AUTH_TOKEN_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Auth token must be at least {} characters long",
            AUTH_TOKEN_MIN_LEN
        )));
    }
    Ok(())
}

/// Stored pairs with a blank half count as "not configured".
fn usable(credential: ProviderCredential) -> Option<ProviderCredential> {
    if credential.account_sid.trim().is_empty()
        || credential.auth_token.expose_secret().trim().is_empty()
    {
        None
    } else {
        Some(credential)
    }
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<ProviderCredential>, AppError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT account_sid, auth_token FROM provider_credentials WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|(sid, token)| ProviderCredential::new(sid, token))
            .and_then(usable))
    }

    async fn put(&self, tenant_id: Uuid, credential: ProviderCredential) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO provider_credentials (tenant_id, account_sid, auth_token)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id) DO UPDATE
            SET account_sid = EXCLUDED.account_sid,
                auth_token = EXCLUDED.auth_token,
                updated_at = NOW()
            "#,
        )
        .bind(tenant_id)
        .bind(&credential.account_sid)
        .bind(credential.auth_token.expose_secret())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<HashMap<Uuid, ProviderCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<ProviderCredential>, AppError> {
        let credentials = self
            .credentials
            .lock()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))?;
        Ok(credentials.get(&tenant_id).cloned().and_then(usable))
    }

    async fn put(&self, tenant_id: Uuid, credential: ProviderCredential) -> Result<(), AppError> {
        let mut credentials = self
            .credentials
            .lock()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))?;
        credentials.insert(tenant_id, credential);
        Ok(())
    }
}

/// Resolves a tenant into an authenticated provider handle.
#[derive(Clone)]
pub struct ClientResolver {
    store: Arc<dyn CredentialStore>,
    connector: Arc<dyn ProviderConnector>,
}

impl ClientResolver {
    pub fn new(store: Arc<dyn CredentialStore>, connector: Arc<dyn ProviderConnector>) -> Self {
        Self { store, connector }
    }

    /// `None` when the tenant has no usable credentials.
    pub async fn resolve(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<Arc<dyn MessageProvider>>, AppError> {
        let credential = self.store.get(tenant_id).await?;
        Ok(credential.map(|c| self.connector.connect(&c)))
    }

    /// Validate and store new credentials for a tenant.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        credential: ProviderCredential,
    ) -> Result<CredentialSummary, AppError> {
        let credential = ProviderCredential::new(
            credential.account_sid.trim(),
            credential.auth_token.expose_secret().trim(),
        );
        validate_credential(&credential)?;
        let summary = credential.summary();
        self.store.put(tenant_id, credential).await?;
        tracing::info!(tenant_id = %tenant_id, "Provider credentials updated");
        Ok(summary)
    }

    /// Masked view of the tenant's credentials.
    pub async fn summary(&self, tenant_id: Uuid) -> Result<CredentialSummary, AppError> {
        Ok(self
            .store
            .get(tenant_id)
            .await?
            .map(|c| c.summary())
            .unwrap_or_else(CredentialSummary::unconfigured))
    }
}
