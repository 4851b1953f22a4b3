//! # External Collaborators
//!
//! Trait definitions and HTTP implementations for the services the pipeline
//! depends on but does not own: intent classification, translation and
//! summarization, outbound channel delivery, and operational notifications.
//!
//! Every collaborator call is fallible and every call site in the pipeline
//! catches the failure and substitutes a safe default; nothing in this module
//! may block an inbound acknowledgment.

use thiserror::Error;

pub mod classifier;
pub mod notifier;
pub mod sender;
pub mod translator;

pub use classifier::{HttpIntentClassifier, IntentClassifier, IntentResult};
pub use notifier::{HttpNotifier, NoopNotifier, NotificationSink};
pub use sender::{HttpOutboundSender, LogOnlySender, OutboundSender};
pub use translator::{HttpLanguageService, LanguageService, MessageSummary};

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

/// Collaborator-level error type, caught at every pipeline call site.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator endpoint not configured")]
    Unconfigured,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {service}")]
    UnexpectedStatus { service: &'static str, status: u16 },
    #[error("malformed response from {service}: {details}")]
    MalformedResponse {
        service: &'static str,
        details: String,
    },
}

/// The full set of collaborators the pipeline is wired with.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn IntentClassifier>,
    pub language: Arc<dyn LanguageService>,
    pub sender: Arc<dyn OutboundSender>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl Collaborators {
    /// Build collaborators from configuration. Unconfigured endpoints get
    /// degraded implementations (log-only sender, no-op notifier) so a
    /// partial deployment still ingests and persists messages.
    pub fn from_config(config: &AppConfig) -> Result<Self, CollaboratorError> {
        let timeout = Duration::from_millis(config.collaborator_timeout_ms);
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let classifier: Arc<dyn IntentClassifier> = Arc::new(HttpIntentClassifier::new(
            http.clone(),
            config.classifier_url.clone(),
        ));
        let language: Arc<dyn LanguageService> = Arc::new(HttpLanguageService::new(
            http.clone(),
            config.translator_url.clone(),
        ));
        let sender: Arc<dyn OutboundSender> = match &config.sender_url {
            Some(url) => Arc::new(HttpOutboundSender::new(
                http.clone(),
                url.clone(),
                config.sender_token.clone(),
                config.sender_from.clone(),
            )),
            None => Arc::new(LogOnlySender),
        };
        let notifier: Arc<dyn NotificationSink> = match &config.notifier_url {
            Some(url) => Arc::new(HttpNotifier::new(http, url.clone())),
            None => Arc::new(NoopNotifier),
        };

        Ok(Self {
            classifier,
            language,
            sender,
            notifier,
        })
    }
}
