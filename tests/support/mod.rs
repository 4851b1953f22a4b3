//! Shared helpers for integration tests: in-memory database setup, fake
//! collaborators, and seed shortcuts.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use concierge::clients::{
    CollaboratorError, Collaborators, IntentClassifier, IntentResult, LanguageService,
    MessageSummary, NotificationSink, OutboundSender,
};
use concierge::config::AppConfig;
use concierge::db::init_pool;
use concierge::models::{city, provider_profile, provider_user};
use concierge::pipeline::{KeywordTakeover, Pipeline};
use migration::{Migrator, MigratorTrait};

pub async fn setup_db() -> DatabaseConnection {
    let db = init_pool(&AppConfig::test_config())
        .await
        .expect("Failed to init test DB");
    Migrator::up(&db, None).await.expect("migrations failed");
    db
}

/// Classifier returning canned results by exact message text.
pub struct FakeClassifier {
    results: BTreeMap<String, IntentResult>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn new() -> Self {
        Self {
            results: BTreeMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, text: &str, result: IntentResult) -> Self {
        self.results.insert(text.to_string(), result);
        self
    }
}

#[async_trait]
impl IntentClassifier for FakeClassifier {
    async fn classify(&self, text: &str) -> Result<IntentResult, CollaboratorError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(self.results.get(text).cloned().unwrap_or(IntentResult {
            intent: "GREETING".to_string(),
            sub_intent: None,
            confidence: 0.99,
            city: None,
        }))
    }
}

/// Classifier that always fails, for degraded-path tests.
pub struct FailingClassifier;

#[async_trait]
impl IntentClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<IntentResult, CollaboratorError> {
        Err(CollaboratorError::Unconfigured)
    }
}

/// Language service that marks translations and summarizes trivially.
pub struct FakeLanguage {
    pub fail: bool,
}

#[async_trait]
impl LanguageService for FakeLanguage {
    async fn translate(
        &self,
        text: &str,
        _target_language: &str,
    ) -> Result<String, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Unconfigured);
        }
        Ok(format!("[en] {text}"))
    }

    async fn summarize(&self, text: &str) -> Result<MessageSummary, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Unconfigured);
        }
        Ok(MessageSummary {
            summary: format!("Customer wrote: {text}"),
            payload: serde_json::json!({"summarized": true}),
        })
    }
}

/// Sender recording every outbound delivery.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl OutboundSender for RecordingSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<String, CollaboratorError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(format!("SM-fake-{}", Uuid::new_v4()))
    }
}

/// Notifier recording every alert.
#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, subject: &str, _body: &str) -> Result<(), CollaboratorError> {
        self.alerts.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

/// Everything a pipeline test needs in one place.
pub struct TestHarness {
    pub db: DatabaseConnection,
    pub pipeline: Arc<Pipeline>,
    pub sender: Arc<RecordingSender>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn build_harness(classifier: Arc<dyn IntentClassifier>) -> TestHarness {
    let db = setup_db().await;
    let sender = Arc::new(RecordingSender::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let collaborators = Collaborators {
        classifier,
        language: Arc::new(FakeLanguage { fail: false }),
        sender: Arc::clone(&sender) as Arc<dyn OutboundSender>,
        notifier: Arc::clone(&notifier) as Arc<dyn NotificationSink>,
    };

    let pipeline = Arc::new(Pipeline::new(
        db.clone(),
        Arc::new(AppConfig::test_config()),
        collaborators,
        Arc::new(KeywordTakeover),
    ));

    TestHarness {
        db,
        pipeline,
        sender,
        notifier,
    }
}

pub async fn seed_city(db: &DatabaseConnection, slug: &str, is_default: bool) -> city::Model {
    let row = city::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.to_string()),
        display_name: Set(slug.to_string()),
        is_active: Set(true),
        is_default: Set(is_default),
        created_at: Set(Utc::now().into()),
    };
    row.insert(db).await.unwrap()
}

pub struct ProviderSeed<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub categories: &'a [&'a str],
    pub city_id: Option<Uuid>,
    pub is_default: bool,
    pub profile_active: bool,
    pub user_active: bool,
}

impl<'a> Default for ProviderSeed<'a> {
    fn default() -> Self {
        Self {
            name: "Provider",
            phone: None,
            categories: &[],
            city_id: None,
            is_default: false,
            profile_active: true,
            user_active: true,
        }
    }
}

pub async fn seed_provider(db: &DatabaseConnection, seed: ProviderSeed<'_>) -> Uuid {
    let user = provider_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        display_name: Set(seed.name.to_string()),
        phone: Set(seed.phone.map(str::to_string)),
        is_active: Set(seed.user_active),
        created_at: Set(Utc::now().into()),
    };
    let user = user.insert(db).await.unwrap();

    let profile = provider_profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        is_active: Set(seed.profile_active),
        is_default: Set(seed.is_default),
        city_id: Set(seed.city_id),
        categories: Set(serde_json::json!(seed.categories)),
        created_at: Set(Utc::now().into()),
    };
    profile.insert(db).await.unwrap();

    user.id
}

/// Minimal webhook payload builder.
pub fn inbound(sid: &str, from: &str, body: &str) -> concierge::pipeline::InboundChannelMessage {
    concierge::pipeline::InboundChannelMessage {
        message_sid: sid.to_string(),
        from: from.to_string(),
        to: "whatsapp:+8610800000000".to_string(),
        body: Some(body.to_string()),
        profile_name: Some("Test Customer".to_string()),
        attachments: serde_json::json!([]),
        raw: serde_json::json!({"MessageSid": sid, "From": from, "Body": body}),
    }
}
