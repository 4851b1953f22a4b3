//! Outbound channel sender collaborator
//!
//! Delivers a reply to the customer through the messaging provider and
//! returns the provider-assigned message id, which the status callback
//! webhook later correlates with delivery updates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::CollaboratorError;

#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Send `body` to the channel address `to`, returning the
    /// provider-assigned message id.
    async fn send_text(&self, to: &str, body: &str) -> Result<String, CollaboratorError>;
}

/// HTTP sender posting to the messaging provider's message endpoint.
pub struct HttpOutboundSender {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    from: Option<String>,
}

impl HttpOutboundSender {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        token: Option<String>,
        from: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url,
            token,
            from,
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendResponse {
    message_id: String,
}

#[async_trait]
impl OutboundSender for HttpOutboundSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<String, CollaboratorError> {
        let mut request = self
            .http
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .json(&SendRequest {
                to,
                body,
                from: self.from.as_deref(),
            });

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                service: "sender",
                status: status.as_u16(),
            });
        }

        let body: SendResponse =
            response
                .json()
                .await
                .map_err(|err| CollaboratorError::MalformedResponse {
                    service: "sender",
                    details: err.to_string(),
                })?;

        Ok(body.message_id)
    }
}

/// Sender used when no provider endpoint is configured; logs the reply and
/// fabricates a local message id so the message row is still complete.
pub struct LogOnlySender;

#[async_trait]
impl OutboundSender for LogOnlySender {
    async fn send_text(&self, to: &str, body: &str) -> Result<String, CollaboratorError> {
        info!(to = %to, body = %body, "Outbound sender not configured; logging reply only");
        Ok(format!("local-{}", Uuid::new_v4()))
    }
}
