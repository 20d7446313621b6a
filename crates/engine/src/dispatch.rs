//! Dispatch Engine: drives one campaign from `pending` to a terminal status.
//!
//! Recipients are attempted strictly in list order, one at a time, with a fixed
//! pause between attempts. Each recipient gets exactly one provider call; a
//! failed call becomes a `failed` outcome and dispatch moves on. Persistence
//! failures are systemic: the campaign is forced into `error` and the remaining
//! recipients are abandoned.
//!
//! There is no timeout on the provider call and no cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{CampaignStatus, NewOutcome, OutcomeStatus};
use herald_provider::MessageProvider;

use crate::store::CampaignStore;

/// Everything needed to deliver one campaign.
pub struct DispatchJob {
    pub campaign_id: i64,
    pub tenant_id: Uuid,
    pub from: String,
    pub message_body: String,
    pub recipients: Vec<String>,
    pub provider: Arc<dyn MessageProvider>,
}

/// Final tally of a dispatch run that reached `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub campaign_id: i64,
    pub successful: i64,
    pub failed: i64,
    pub status: CampaignStatus,
}

pub struct DispatchEngine {
    store: Arc<dyn CampaignStore>,
    interval: Duration,
}

impl DispatchEngine {
    pub fn new(store: Arc<dyn CampaignStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run a job to completion. On a systemic error the campaign is moved to
    /// `error` (best effort) and the error is returned.
    ///
    /// A campaign that is no longer `pending` belongs to another run (or is
    /// finished); it is left untouched and the claim error is returned.
    pub async fn run(&self, job: DispatchJob) -> Result<DispatchReport, AppError> {
        let campaign_id = job.campaign_id;
        if let Err(e) = self.store.claim(campaign_id).await {
            tracing::warn!(campaign_id, error = %e, "Campaign could not be claimed for dispatch");
            return Err(e);
        }

        match self.drive(&job).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!(campaign_id, error = %e, "Campaign dispatch failed");
                if let Err(mark_err) = self
                    .store
                    .transition_status(campaign_id, CampaignStatus::Error)
                    .await
                {
                    tracing::error!(
                        campaign_id,
                        error = %mark_err,
                        "Failed to mark campaign as errored"
                    );
                }
                Err(e)
            }
        }
    }

    async fn drive(&self, job: &DispatchJob) -> Result<DispatchReport, AppError> {
        let campaign_id = job.campaign_id;

        tracing::info!(
            campaign_id,
            recipients = job.recipients.len(),
            "Campaign dispatch started"
        );

        let mut successful = 0i64;
        let mut failed = 0i64;

        for (index, recipient) in job.recipients.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.interval).await;
            }

            let outcome = self.attempt(job, recipient).await;
            let status = outcome.status;
            self.store.append_outcome(campaign_id, outcome).await?;

            match status {
                OutcomeStatus::Sent => successful += 1,
                OutcomeStatus::Failed => failed += 1,
            }
        }

        let campaign = self.store.finalize(campaign_id, successful, failed).await?;

        tracing::info!(
            campaign_id,
            successful,
            failed,
            "Campaign completed"
        );

        Ok(DispatchReport {
            campaign_id,
            successful: campaign.successful,
            failed: campaign.failed,
            status: campaign.status,
        })
    }

    /// One provider call. Errors and panics inside the provider both become a
    /// `failed` outcome.
    async fn attempt(&self, job: &DispatchJob, recipient: &str) -> NewOutcome {
        let provider = Arc::clone(&job.provider);
        let from = job.from.clone();
        let body = job.message_body.clone();
        let to = recipient.to_string();

        let call = tokio::spawn(async move { provider.send(&from, &body, &to).await });

        match call.await {
            Ok(Ok(sent)) => {
                tracing::info!(
                    campaign_id = job.campaign_id,
                    recipient,
                    message_sid = sent.sid.as_deref().unwrap_or(""),
                    "Message sent"
                );
                NewOutcome::sent(recipient, sent.sid)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    campaign_id = job.campaign_id,
                    recipient,
                    error = %e,
                    "Message send failed"
                );
                NewOutcome::failed(recipient, e.to_string())
            }
            Err(join_err) => {
                tracing::error!(
                    campaign_id = job.campaign_id,
                    recipient,
                    error = %join_err,
                    "Unexpected error during provider call"
                );
                NewOutcome::failed(recipient, format!("unexpected error: {}", join_err))
            }
        }
    }
}

/// Fire-and-forget executor for dispatch jobs.
///
/// Each job runs on its own tokio task with its own error boundary; submitting
/// never waits for delivery.
#[derive(Clone)]
pub struct DispatchWorker {
    engine: Arc<DispatchEngine>,
}

impl DispatchWorker {
    pub fn new(engine: Arc<DispatchEngine>) -> Self {
        Self { engine }
    }

    /// Start a job in the background. The handle is only for tests and shutdown
    /// hooks; request paths drop it.
    pub fn submit(&self, job: DispatchJob) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let span = tracing::info_span!(
            "dispatch",
            campaign_id = job.campaign_id,
            tenant_id = %job.tenant_id
        );

        tokio::spawn(
            async move {
                match engine.run(job).await {
                    Ok(report) => tracing::debug!(
                        successful = report.successful,
                        failed = report.failed,
                        "Dispatch task finished"
                    ),
                    Err(e) => tracing::debug!(error = %e, "Dispatch task aborted"),
                }
            }
            .instrument(span),
        )
    }
}
