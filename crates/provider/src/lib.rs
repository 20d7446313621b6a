//! Messaging provider boundary.
//!
//! `MessageProvider` is object-safe so the engine can hold `Arc<dyn MessageProvider>`
//! resolved per tenant. `TwilioClient` is the production implementation; tests
//! supply their own fakes.

pub mod twilio;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use herald_common::types::ProviderCredential;

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Provider-assigned identifier. Some providers acknowledge without one.
    pub sid: Option<String>,
}

/// Failure of a single send call. Never retried by the engine.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider rejected message (HTTP {status}{}): {message}", code_suffix(.code))]
    Rejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(", code {c}")).unwrap_or_default()
}

/// An authenticated handle able to send one message at a time.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    async fn send(&self, from: &str, body: &str, to: &str) -> Result<SentMessage, ProviderError>;
}

/// Builds provider handles from stored tenant credentials.
///
/// Credential validity is only checked by the provider on first use.
pub trait ProviderConnector: Send + Sync {
    fn connect(&self, credential: &ProviderCredential) -> Arc<dyn MessageProvider>;
}
