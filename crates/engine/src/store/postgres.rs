//! PostgreSQL-backed campaign store.
//!
//! Every write is a single statement or a single transaction scoped to one
//! campaign id, so dispatch tasks for different campaigns never contend.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{
    Campaign, CampaignStatus, MessageOutcome, NewCampaign, NewOutcome, OutcomeStatus,
};

use super::{
    CampaignStore, already_claimed, campaign_not_found, check_finalize, check_new_campaign,
    not_accepting_outcomes,
};

#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, campaign_id: i64) -> Result<Campaign, AppError> {
        sqlx::query_as("SELECT * FROM campaigns WHERE id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| campaign_not_found(campaign_id))
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, AppError> {
        check_new_campaign(&campaign)?;

        let created: Campaign = sqlx::query_as(
            r#"
            INSERT INTO campaigns (tenant_id, name, message_body, total_recipients, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(campaign.tenant_id)
        .bind(&campaign.name)
        .bind(&campaign.message_body)
        .bind(campaign.total_recipients)
        .bind(CampaignStatus::Pending.to_string())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            campaign_id = created.id,
            tenant_id = %created.tenant_id,
            total = created.total_recipients,
            "Campaign created"
        );

        Ok(created)
    }

    async fn claim(&self, campaign_id: i64) -> Result<Campaign, AppError> {
        let claimed: Option<Campaign> = sqlx::query_as(
            r#"
            UPDATE campaigns
            SET status = 'sending'
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;

        match claimed {
            Some(campaign) => Ok(campaign),
            None => Err(already_claimed(self.fetch(campaign_id).await?.status)),
        }
    }

    async fn transition_status(
        &self,
        campaign_id: i64,
        status: CampaignStatus,
    ) -> Result<Campaign, AppError> {
        let from: Vec<String> = CampaignStatus::predecessors(status)
            .into_iter()
            .filter(|s| *s != status)
            .map(|s| s.to_string())
            .collect();

        // The guard on the current status makes check-and-set a single atomic statement.
        let updated: Option<Campaign> = sqlx::query_as(
            r#"
            UPDATE campaigns
            SET status = $2,
                completed_at = CASE WHEN $3 THEN NOW() ELSE completed_at END
            WHERE id = $1 AND status = ANY($4)
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(status.to_string())
        .bind(status.is_terminal())
        .bind(&from)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(campaign) = updated {
            tracing::debug!(campaign_id, status = %status, "Campaign status changed");
            return Ok(campaign);
        }

        let current = self.fetch(campaign_id).await?;
        if current.status == status {
            Ok(current)
        } else {
            Err(AppError::InvalidTransition {
                from: current.status,
                to: status,
            })
        }
    }

    async fn append_outcome(
        &self,
        campaign_id: i64,
        outcome: NewOutcome,
    ) -> Result<MessageOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let (successful_inc, failed_inc): (i64, i64) = match outcome.status {
            OutcomeStatus::Sent => (1, 0),
            OutcomeStatus::Failed => (0, 1),
        };

        let bumped = sqlx::query(
            r#"
            UPDATE campaigns
            SET successful = successful + $2, failed = failed + $3
            WHERE id = $1 AND status = 'sending' AND successful + failed < total_recipients
            "#,
        )
        .bind(campaign_id)
        .bind(successful_inc)
        .bind(failed_inc)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.fetch(campaign_id).await?;
            return Err(not_accepting_outcomes(campaign_id, current.status));
        }

        let row: MessageOutcome = sqlx::query_as(
            r#"
            INSERT INTO message_outcomes (campaign_id, recipient, message_sid, status, error_detail)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(&outcome.recipient)
        .bind(&outcome.message_sid)
        .bind(outcome.status.to_string())
        .bind(&outcome.error_detail)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn finalize(
        &self,
        campaign_id: i64,
        successful: i64,
        failed: i64,
    ) -> Result<Campaign, AppError> {
        let mut tx = self.pool.begin().await?;

        let current: Campaign = sqlx::query_as("SELECT * FROM campaigns WHERE id = $1 FOR UPDATE")
            .bind(campaign_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| campaign_not_found(campaign_id))?;

        if check_finalize(&current, successful, failed)? {
            tx.rollback().await?;
            return Ok(current);
        }

        let campaign: Campaign = sqlx::query_as(
            r#"
            UPDATE campaigns
            SET successful = $2, failed = $3, status = $4, completed_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(successful)
        .bind(failed)
        .bind(CampaignStatus::Completed.to_string())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(campaign)
    }

    async fn get_campaign(&self, campaign_id: i64, tenant_id: Uuid) -> Result<Campaign, AppError> {
        sqlx::query_as("SELECT * FROM campaigns WHERE id = $1 AND tenant_id = $2")
            .bind(campaign_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| campaign_not_found(campaign_id))
    }

    async fn list_outcomes(&self, campaign_id: i64) -> Result<Vec<MessageOutcome>, AppError> {
        let outcomes: Vec<MessageOutcome> = sqlx::query_as(
            "SELECT * FROM message_outcomes WHERE campaign_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(outcomes)
    }

    async fn list_campaigns(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Campaign>, AppError> {
        let campaigns: Vec<Campaign> = sqlx::query_as(
            "SELECT * FROM campaigns WHERE tenant_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }
}
