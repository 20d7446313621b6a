//! Twilio Programmable Messaging client.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use herald_common::types::ProviderCredential;

use crate::{MessageProvider, ProviderConnector, ProviderError, SentMessage};

/// Success body of `POST /Messages.json` (only the fields we use).
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

/// Error body returned by Twilio on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorResource {
    code: Option<i64>,
    message: Option<String>,
}

/// Authenticated client bound to one account.
pub struct TwilioClient {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: SecretString,
}

impl TwilioClient {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, credential: &ProviderCredential) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            account_sid: credential.account_sid.clone(),
            auth_token: SecretString::from(credential.auth_token.expose_secret().to_owned()),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl MessageProvider for TwilioClient {
    async fn send(&self, from: &str, body: &str, to: &str) -> Result<SentMessage, ProviderError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            let parsed: Option<ErrorResource> = serde_json::from_str(&text).ok();
            let (code, message) = match parsed {
                Some(err) => (
                    err.code,
                    err.message.unwrap_or_else(|| status.to_string()),
                ),
                None => (None, text),
            };
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let resource: MessageResource = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if resource.sid.is_none() {
            tracing::debug!(to, "Provider accepted message without a sid");
        }

        Ok(SentMessage { sid: resource.sid })
    }
}

/// Creates `TwilioClient`s sharing one HTTP connection pool.
#[derive(Clone)]
pub struct TwilioConnector {
    http: reqwest::Client,
    api_base: String,
}

impl TwilioConnector {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }
}

impl ProviderConnector for TwilioConnector {
    fn connect(&self, credential: &ProviderCredential) -> Arc<dyn MessageProvider> {
        Arc::new(TwilioClient::new(
            self.http.clone(),
            self.api_base.clone(),
            credential,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_trims_trailing_slash() {
        let cred = ProviderCredential::new("AC123", "token");
        let client = TwilioClient::new(reqwest::Client::new(), "http://localhost:9000/", &cred);
        assert_eq!(
            client.messages_url(),
            "http://localhost:9000/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
