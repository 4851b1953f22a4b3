//! Intent classifier collaborator
//!
//! Consumes raw message text and returns the classified intent with a
//! confidence score and an optional city mention. The pipeline treats any
//! failure as "no classification" and carries on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CollaboratorError;

/// Classification result for one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Intent label (e.g. "HOTEL", "GREETING", "OUT_OF_SCOPE")
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_intent: Option<String>,
    pub confidence: f64,
    /// City slug mentioned in the message, when the classifier found one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<IntentResult, CollaboratorError>;
}

/// HTTP classifier client posting `{text}` to `<base>/classify`.
pub struct HttpIntentClassifier {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl HttpIntentClassifier {
    pub fn new(http: reqwest::Client, base_url: Option<String>) -> Self {
        Self { http, base_url }
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[async_trait]
impl IntentClassifier for HttpIntentClassifier {
    async fn classify(&self, text: &str) -> Result<IntentResult, CollaboratorError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(CollaboratorError::Unconfigured)?;

        let response = self
            .http
            .post(format!("{}/classify", base.trim_end_matches('/')))
            .json(&ClassifyRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                service: "classifier",
                status: status.as_u16(),
            });
        }

        let result: IntentResult =
            response
                .json()
                .await
                .map_err(|err| CollaboratorError::MalformedResponse {
                    service: "classifier",
                    details: err.to_string(),
                })?;

        debug!(
            intent = %result.intent,
            confidence = result.confidence,
            "Classified inbound message"
        );

        Ok(result)
    }
}
