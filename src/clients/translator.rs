//! Summarizer/translator collaborator
//!
//! One upstream service exposes both translation and short structured
//! summarization. Either call may fail; the context synthesizer falls back to
//! the original text and an absent summary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::CollaboratorError;

/// Short structured summary of a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// 2-3 sentence summary
    pub summary: String,
    /// Structured fields extracted alongside the summary
    #[serde(default)]
    pub payload: JsonValue,
}

#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Translate `text` into `target_language` (BCP 47-ish tag, e.g. "en").
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, CollaboratorError>;

    /// Produce a short structured summary of `text`.
    async fn summarize(&self, text: &str) -> Result<MessageSummary, CollaboratorError>;
}

/// HTTP client posting to `<base>/translate` and `<base>/summarize`.
pub struct HttpLanguageService {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl HttpLanguageService {
    pub fn new(http: reqwest::Client, base_url: Option<String>) -> Self {
        Self { http, base_url }
    }

    fn base(&self) -> Result<&str, CollaboratorError> {
        self.base_url
            .as_deref()
            .map(|base| base.trim_end_matches('/'))
            .ok_or(CollaboratorError::Unconfigured)
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    text: String,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
}

#[async_trait]
impl LanguageService for HttpLanguageService {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, CollaboratorError> {
        let response = self
            .http
            .post(format!("{}/translate", self.base()?))
            .json(&TranslateRequest {
                text,
                target_language,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                service: "translator",
                status: status.as_u16(),
            });
        }

        let body: TranslateResponse =
            response
                .json()
                .await
                .map_err(|err| CollaboratorError::MalformedResponse {
                    service: "translator",
                    details: err.to_string(),
                })?;

        Ok(body.text)
    }

    async fn summarize(&self, text: &str) -> Result<MessageSummary, CollaboratorError> {
        let response = self
            .http
            .post(format!("{}/summarize", self.base()?))
            .json(&SummarizeRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                service: "summarizer",
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|err| CollaboratorError::MalformedResponse {
                service: "summarizer",
                details: err.to_string(),
            })
    }
}
