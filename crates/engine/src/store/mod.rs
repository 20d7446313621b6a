//! Campaign Store: persistent campaign state machine and outcome log.
//!
//! The store is the single source of truth for progress. Each campaign's rows are
//! written only by the dispatch task that owns it; readers get consistent
//! snapshots where `successful + failed <= total` always holds.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Campaign, CampaignStatus, MessageOutcome, NewCampaign, NewOutcome};

pub use memory::MemoryCampaignStore;
pub use postgres::PgCampaignStore;

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Create a campaign in `pending` with its fixed recipient total.
    async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, AppError>;

    /// Take exclusive ownership of a `pending` campaign for dispatch by moving it
    /// to `sending`. Unlike `transition_status` this is not idempotent: a campaign
    /// that is already `sending` (or terminal) cannot be claimed again.
    async fn claim(&self, campaign_id: i64) -> Result<Campaign, AppError>;

    /// Move a campaign to `status`. Repeating the current status is a no-op that
    /// leaves counts and `completed_at` untouched. Entering a terminal status
    /// stamps `completed_at`.
    async fn transition_status(
        &self,
        campaign_id: i64,
        status: CampaignStatus,
    ) -> Result<Campaign, AppError>;

    /// Append one outcome and bump the matching counter atomically.
    /// Only accepted while the campaign is `sending`.
    async fn append_outcome(
        &self,
        campaign_id: i64,
        outcome: NewOutcome,
    ) -> Result<MessageOutcome, AppError>;

    /// Record final counts, set `completed` and stamp `completed_at` in one update.
    async fn finalize(
        &self,
        campaign_id: i64,
        successful: i64,
        failed: i64,
    ) -> Result<Campaign, AppError>;

    /// Snapshot of a campaign owned by `tenant_id`; `NotFound` for any other tenant.
    async fn get_campaign(&self, campaign_id: i64, tenant_id: Uuid) -> Result<Campaign, AppError>;

    /// All outcomes of a campaign, most recent first.
    async fn list_outcomes(&self, campaign_id: i64) -> Result<Vec<MessageOutcome>, AppError>;

    /// A tenant's most recent campaigns, newest first.
    async fn list_campaigns(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Campaign>, AppError>;
}

pub(crate) fn campaign_not_found(campaign_id: i64) -> AppError {
    AppError::NotFound(format!("Campaign {} not found", campaign_id))
}

pub(crate) fn already_claimed(status: CampaignStatus) -> AppError {
    AppError::InvalidTransition {
        from: status,
        to: CampaignStatus::Sending,
    }
}

pub(crate) fn not_accepting_outcomes(campaign_id: i64, status: CampaignStatus) -> AppError {
    AppError::Internal(format!(
        "Campaign {} is {} and does not accept outcomes",
        campaign_id, status
    ))
}

/// Checks shared by every implementation before finalizing.
///
/// Returns `true` when the campaign is already completed with these counts,
/// in which case finalizing again is a no-op.
pub(crate) fn check_finalize(
    campaign: &Campaign,
    successful: i64,
    failed: i64,
) -> Result<bool, AppError> {
    if campaign.status == CampaignStatus::Completed {
        if campaign.successful == successful && campaign.failed == failed {
            return Ok(true);
        }
        return Err(AppError::Internal(format!(
            "Campaign {} is already completed with different counts",
            campaign.id
        )));
    }
    if campaign.status != CampaignStatus::Sending {
        return Err(AppError::InvalidTransition {
            from: campaign.status,
            to: CampaignStatus::Completed,
        });
    }
    if successful < 0 || failed < 0 || successful + failed != campaign.total_recipients {
        return Err(AppError::Internal(format!(
            "Campaign {} cannot finalize with {} successful + {} failed of {} recipients",
            campaign.id, successful, failed, campaign.total_recipients
        )));
    }
    Ok(false)
}

pub(crate) fn check_new_campaign(campaign: &NewCampaign) -> Result<(), AppError> {
    if campaign.total_recipients <= 0 {
        return Err(AppError::Input(
            "A campaign needs at least one recipient".to_string(),
        ));
    }
    Ok(())
}
