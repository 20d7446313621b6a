//! Campaign service: submission flow and read-side queries.
//!
//! Submission validates everything that can fail synchronously (fields, recipient
//! list, credentials) before a campaign row exists, then hands delivery to the
//! `DispatchWorker` and returns without waiting for it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Campaign, CampaignProgress, MessageOutcome, NewCampaign};

use crate::credentials::ClientResolver;
use crate::dispatch::{DispatchJob, DispatchWorker};
use crate::recipients::{SourceFormat, parse_recipients};
use crate::stats::{MessageStats, validate_body};
use crate::store::CampaignStore;

/// Already-materialized recipient file.
#[derive(Debug, Clone)]
pub struct RecipientUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Parameters for submitting a new campaign.
#[derive(Debug, Clone)]
pub struct SubmitCampaign {
    pub name: String,
    pub body: String,
    /// Sender identity passed to the provider.
    pub from: String,
    pub upload: RecipientUpload,
}

/// A freshly created campaign as returned to the submitter.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedCampaign {
    pub campaign: Campaign,
    pub stats: MessageStats,
}

/// A campaign together with its outcomes, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDetail {
    pub campaign: Campaign,
    pub messages: Vec<MessageOutcome>,
}

#[derive(Clone)]
pub struct CampaignService {
    store: Arc<dyn CampaignStore>,
    resolver: ClientResolver,
    worker: DispatchWorker,
}

impl CampaignService {
    pub fn new(store: Arc<dyn CampaignStore>, resolver: ClientResolver, worker: DispatchWorker) -> Self {
        Self {
            store,
            resolver,
            worker,
        }
    }

    /// Create a campaign and start delivering it in the background.
    pub async fn submit(
        &self,
        tenant_id: Uuid,
        request: SubmitCampaign,
    ) -> Result<SubmittedCampaign, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Campaign name must not be empty".to_string()));
        }
        let from = request.from.trim();
        if from.is_empty() {
            return Err(AppError::Validation("Sender number must not be empty".to_string()));
        }
        let stats = validate_body(&request.body)?;

        let format = SourceFormat::from_file_name(&request.upload.file_name);
        let recipients = parse_recipients(&request.upload.content, format);
        if recipients.is_empty() {
            return Err(AppError::Input(
                "No valid phone numbers found in the file".to_string(),
            ));
        }

        let provider = self.resolver.resolve(tenant_id).await?.ok_or_else(|| {
            AppError::Config(
                "Provider credentials are not configured for this account".to_string(),
            )
        })?;

        let campaign = self
            .store
            .create_campaign(NewCampaign {
                tenant_id,
                name: name.to_string(),
                message_body: request.body.clone(),
                total_recipients: recipients.len() as i64,
            })
            .await?;

        tracing::info!(
            campaign_id = campaign.id,
            tenant_id = %tenant_id,
            recipients = recipients.len(),
            segments = stats.segments,
            "Campaign submitted"
        );

        // Detached: the handle is dropped and the caller never waits on delivery.
        let _ = self.worker.submit(DispatchJob {
            campaign_id: campaign.id,
            tenant_id,
            from: from.to_string(),
            message_body: request.body,
            recipients,
            provider,
        });

        Ok(SubmittedCampaign { campaign, stats })
    }

    pub async fn get(&self, tenant_id: Uuid, campaign_id: i64) -> Result<Campaign, AppError> {
        self.store.get_campaign(campaign_id, tenant_id).await
    }

    pub async fn progress(
        &self,
        tenant_id: Uuid,
        campaign_id: i64,
    ) -> Result<CampaignProgress, AppError> {
        Ok(self.get(tenant_id, campaign_id).await?.progress())
    }

    /// Outcomes are only read after ownership has been checked.
    pub async fn detail(&self, tenant_id: Uuid, campaign_id: i64) -> Result<CampaignDetail, AppError> {
        let campaign = self.get(tenant_id, campaign_id).await?;
        let messages = self.store.list_outcomes(campaign.id).await?;
        Ok(CampaignDetail { campaign, messages })
    }

    pub async fn list(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Campaign>, AppError> {
        self.store.list_campaigns(tenant_id, limit).await
    }
}
