use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Campaign lifecycle status.
///
/// `pending → sending → {completed, error}`; `pending → error` is also legal
/// for a dispatch that fails before its first send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Sending,
    Completed,
    Error,
}

impl CampaignStatus {
    /// `completed` and `error` are terminal: no further outcomes are appended.
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Error)
    }

    /// Whether `self → next` is a legal move. Identity moves are always legal (no-ops).
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Sending) | (Pending, Error) | (Sending, Completed) | (Sending, Error)
            )
    }

    /// Statuses from which `next` can be reached, including `next` itself.
    pub fn predecessors(next: CampaignStatus) -> Vec<CampaignStatus> {
        [
            CampaignStatus::Pending,
            CampaignStatus::Sending,
            CampaignStatus::Completed,
            CampaignStatus::Error,
        ]
        .into_iter()
        .filter(|s| s.can_transition_to(next))
        .collect()
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Pending => write!(f, "pending"),
            CampaignStatus::Sending => write!(f, "sending"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of one provider send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Sent,
    Failed,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Sent => write!(f, "sent"),
            OutcomeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A bulk-send request spanning a fixed recipient list and message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: i64,
    pub tenant_id: Uuid,
    pub name: String,
    pub message_body: String,
    pub total_recipients: i64,
    pub successful: i64,
    pub failed: i64,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Number of recipients with a recorded outcome.
    pub fn attempted(&self) -> i64 {
        self.successful + self.failed
    }

    pub fn progress(&self) -> CampaignProgress {
        CampaignProgress {
            total: self.total_recipients,
            successful: self.successful,
            failed: self.failed,
            status: self.status,
        }
    }
}

/// Polling projection of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignProgress {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub status: CampaignStatus,
}

/// Fields needed to create a campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub tenant_id: Uuid,
    pub name: String,
    pub message_body: String,
    pub total_recipients: i64,
}

/// The persisted result of one send attempt for one recipient. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageOutcome {
    pub id: i64,
    pub campaign_id: i64,
    pub recipient: String,
    pub message_sid: Option<String>,
    pub status: OutcomeStatus,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An outcome about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutcome {
    pub recipient: String,
    pub message_sid: Option<String>,
    pub status: OutcomeStatus,
    pub error_detail: Option<String>,
}

impl NewOutcome {
    pub fn sent(recipient: impl Into<String>, message_sid: Option<String>) -> Self {
        Self {
            recipient: recipient.into(),
            message_sid,
            status: OutcomeStatus::Sent,
            error_detail: None,
        }
    }

    pub fn failed(recipient: impl Into<String>, error_detail: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            message_sid: None,
            status: OutcomeStatus::Failed,
            error_detail: Some(error_detail.into()),
        }
    }
}

/// Per-tenant provider credential pair. The token never appears in `Debug` output.
#[derive(Debug)]
pub struct ProviderCredential {
    pub account_sid: String,
    pub auth_token: SecretString,
}

impl ProviderCredential {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let auth_token: String = auth_token.into();
        Self {
            account_sid: account_sid.into(),
            auth_token: SecretString::from(auth_token),
        }
    }

    /// Masked view safe to return to clients.
    pub fn summary(&self) -> CredentialSummary {
        let sid = &self.account_sid;
        let masked_sid = if sid.chars().count() > 14 {
            let head: String = sid.chars().take(10).collect();
            let tail: String = sid.chars().skip(sid.chars().count() - 4).collect();
            format!("{head}...{tail}")
        } else {
            "*".repeat(sid.chars().count())
        };

        let token = self.auth_token.expose_secret();
        let masked_token = if token.chars().count() > 4 {
            let tail: String = token.chars().skip(token.chars().count() - 4).collect();
            format!("****{tail}")
        } else {
            "****".to_string()
        };

        CredentialSummary {
            configured: true,
            account_sid: Some(masked_sid),
            auth_token: Some(masked_token),
        }
    }
}

impl Clone for ProviderCredential {
    fn clone(&self) -> Self {
        Self::new(self.account_sid.clone(), self.auth_token.expose_secret())
    }
}

/// Masked credential projection returned by the settings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub configured: bool,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
}

impl CredentialSummary {
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            account_sid: None,
            auth_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use CampaignStatus::*;
        assert!(Pending.can_transition_to(Sending));
        assert!(Pending.can_transition_to(Error));
        assert!(Sending.can_transition_to(Completed));
        assert!(Sending.can_transition_to(Error));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        use CampaignStatus::*;
        for next in [Pending, Sending] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Error.can_transition_to(next));
        }
        assert!(!Completed.can_transition_to(Error));
        assert!(!Error.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Sending.can_transition_to(Pending));
    }

    #[test]
    fn test_predecessors() {
        use CampaignStatus::*;
        assert_eq!(CampaignStatus::predecessors(Sending), vec![Pending, Sending]);
        assert_eq!(CampaignStatus::predecessors(Error), vec![Pending, Sending, Error]);
        assert_eq!(CampaignStatus::predecessors(Pending), vec![Pending]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CampaignStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(OutcomeStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_credential_debug_hides_token() {
        let cred = ProviderCredential::new("AC0123456789abcdef0123456789abcdef", "supersecrettoken");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("supersecrettoken"));
    }

    #[test]
    fn test_credential_summary_masks() {
        let cred = ProviderCredential::new(
            "AC0123456789abcdef0123456789abcdef",
            "0123456789abcdef0123456789abwxyz",
        );
        let summary = cred.summary();
        assert!(summary.configured);
        assert_eq!(summary.account_sid.as_deref(), Some("AC01234567...cdef"));
        assert_eq!(summary.auth_token.as_deref(), Some("****wxyz"));
    }
}
