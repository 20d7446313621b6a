//! In-process campaign store.
//!
//! All state sits behind one mutex, so every read is a consistent snapshot and
//! every write is atomic. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{
    Campaign, CampaignStatus, MessageOutcome, NewCampaign, NewOutcome, OutcomeStatus,
};

use super::{
    CampaignStore, already_claimed, campaign_not_found, check_finalize, check_new_campaign,
    not_accepting_outcomes,
};

#[derive(Default)]
struct State {
    next_campaign_id: i64,
    next_outcome_id: i64,
    campaigns: HashMap<i64, Campaign>,
    /// Insertion order.
    outcomes: Vec<MessageOutcome>,
}

#[derive(Default)]
pub struct MemoryCampaignStore {
    state: Mutex<State>,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("campaign store lock poisoned".to_string()))
    }

    /// Outcomes of a campaign in insertion order.
    pub fn outcomes_in_insertion_order(&self, campaign_id: i64) -> Result<Vec<MessageOutcome>, AppError> {
        let state = self.lock()?;
        Ok(state
            .outcomes
            .iter()
            .filter(|o| o.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    /// Total number of campaigns across all tenants.
    pub fn campaign_count(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.campaigns.len())
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, AppError> {
        check_new_campaign(&campaign)?;

        let mut state = self.lock()?;
        state.next_campaign_id += 1;
        let created = Campaign {
            id: state.next_campaign_id,
            tenant_id: campaign.tenant_id,
            name: campaign.name,
            message_body: campaign.message_body,
            total_recipients: campaign.total_recipients,
            successful: 0,
            failed: 0,
            status: CampaignStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        state.campaigns.insert(created.id, created.clone());
        Ok(created)
    }

    async fn claim(&self, campaign_id: i64) -> Result<Campaign, AppError> {
        let mut state = self.lock()?;
        let campaign = state
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| campaign_not_found(campaign_id))?;

        if campaign.status != CampaignStatus::Pending {
            return Err(already_claimed(campaign.status));
        }
        campaign.status = CampaignStatus::Sending;
        Ok(campaign.clone())
    }

    async fn transition_status(
        &self,
        campaign_id: i64,
        status: CampaignStatus,
    ) -> Result<Campaign, AppError> {
        let mut state = self.lock()?;
        let campaign = state
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| campaign_not_found(campaign_id))?;

        if campaign.status == status {
            return Ok(campaign.clone());
        }
        if !campaign.status.can_transition_to(status) {
            return Err(AppError::InvalidTransition {
                from: campaign.status,
                to: status,
            });
        }

        campaign.status = status;
        if status.is_terminal() {
            campaign.completed_at = Some(Utc::now());
        }
        Ok(campaign.clone())
    }

    async fn append_outcome(
        &self,
        campaign_id: i64,
        outcome: NewOutcome,
    ) -> Result<MessageOutcome, AppError> {
        let mut state = self.lock()?;
        let campaign = state
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| campaign_not_found(campaign_id))?;

        if campaign.status != CampaignStatus::Sending || campaign.attempted() >= campaign.total_recipients {
            return Err(not_accepting_outcomes(campaign_id, campaign.status));
        }
        match outcome.status {
            OutcomeStatus::Sent => campaign.successful += 1,
            OutcomeStatus::Failed => campaign.failed += 1,
        }

        state.next_outcome_id += 1;
        let row = MessageOutcome {
            id: state.next_outcome_id,
            campaign_id,
            recipient: outcome.recipient,
            message_sid: outcome.message_sid,
            status: outcome.status,
            error_detail: outcome.error_detail,
            created_at: Utc::now(),
        };
        state.outcomes.push(row.clone());
        Ok(row)
    }

    async fn finalize(
        &self,
        campaign_id: i64,
        successful: i64,
        failed: i64,
    ) -> Result<Campaign, AppError> {
        let mut state = self.lock()?;
        let campaign = state
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| campaign_not_found(campaign_id))?;

        if check_finalize(campaign, successful, failed)? {
            return Ok(campaign.clone());
        }

        campaign.successful = successful;
        campaign.failed = failed;
        campaign.status = CampaignStatus::Completed;
        campaign.completed_at = Some(Utc::now());
        Ok(campaign.clone())
    }

    async fn get_campaign(&self, campaign_id: i64, tenant_id: Uuid) -> Result<Campaign, AppError> {
        let state = self.lock()?;
        state
            .campaigns
            .get(&campaign_id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| campaign_not_found(campaign_id))
    }

    async fn list_outcomes(&self, campaign_id: i64) -> Result<Vec<MessageOutcome>, AppError> {
        let state = self.lock()?;
        Ok(state
            .outcomes
            .iter()
            .rev()
            .filter(|o| o.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn list_campaigns(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Campaign>, AppError> {
        let state = self.lock()?;
        let mut campaigns: Vec<Campaign> = state
            .campaigns
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        campaigns.truncate(limit.max(0) as usize);
        Ok(campaigns)
    }
}
