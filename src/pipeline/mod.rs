//! # Pipeline Orchestrator
//!
//! Glues the intake components together per inbound message. The synchronous
//! half (event admission, lead/thread resolution, message persistence, mode
//! check, takeover flip) runs before the transport acknowledgment is decided;
//! everything slow or fallible after that point travels through the worker
//! pool as [`PipelineJob`]s and never reports back to the caller.

use std::sync::Arc;

use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

pub mod assignment;
pub mod dispatcher;
pub mod synthesizer;
pub mod takeover;
pub mod worker;

pub use assignment::AssignmentEngine;
pub use dispatcher::DispatchScheduler;
pub use synthesizer::ContextSynthesizer;
pub use takeover::{KeywordTakeover, TakeoverDetector};
pub use worker::{JobQueue, PipelineJob, WorkerPool};

use crate::clients::{Collaborators, IntentResult};
use crate::config::AppConfig;
use crate::models::conversation::{ConversationMode, Model as Conversation};
use crate::models::message::Model as Message;
use crate::models::service_request::{Model as ServiceRequest, RequestPayload};
use crate::repositories::{
    ConversationRepository, EventGateRepository, LeadRepository, MessageRepository,
    ServiceRequestRepository, TaxonomyRepository,
};

pub const CHANNEL_WHATSAPP: &str = "whatsapp";
pub const CHANNEL_WEBCHAT: &str = "webchat";

/// Fixed confirmation sent when a conversation flips to HUMAN mode.
const TAKEOVER_REPLY: &str =
    "Got it - a member of our team will take over this conversation shortly.";

/// Confirmation sent after a new service request is created.
const REQUEST_CONFIRMATION: &str =
    "Thanks! We've logged your request and are contacting our partners now.";

/// Parsed inbound message from the WhatsApp-style channel webhook.
#[derive(Debug, Clone)]
pub struct InboundChannelMessage {
    pub message_sid: String,
    pub from: String,
    pub to: String,
    pub body: Option<String>,
    pub profile_name: Option<String>,
    /// JSON array of {url, content_type}
    pub attachments: JsonValue,
    /// Raw form payload, persisted with the webhook event
    pub raw: JsonValue,
}

/// Result of a service-request upsert.
struct RequestOutcome {
    request: ServiceRequest,
    category_key: String,
    created: bool,
}

pub struct Pipeline {
    config: Arc<AppConfig>,
    collaborators: Collaborators,
    detector: Arc<dyn TakeoverDetector>,
    event_gate: EventGateRepository,
    leads: LeadRepository,
    conversations: ConversationRepository,
    messages: MessageRepository,
    taxonomy: TaxonomyRepository,
    requests: ServiceRequestRepository,
    assignment: AssignmentEngine,
    dispatcher: DispatchScheduler,
    synthesizer: ContextSynthesizer,
}

impl Pipeline {
    pub fn new(
        db: DatabaseConnection,
        config: Arc<AppConfig>,
        collaborators: Collaborators,
        detector: Arc<dyn TakeoverDetector>,
    ) -> Self {
        let assignment = AssignmentEngine::new(db.clone(), config.routing.clone());
        let dispatcher = DispatchScheduler::new(
            db.clone(),
            Arc::clone(&collaborators.sender),
            config.routing.clone(),
        );
        let synthesizer = ContextSynthesizer::new(db.clone(), Arc::clone(&collaborators.language));

        Self {
            config,
            collaborators,
            detector,
            event_gate: EventGateRepository::new(db.clone()),
            leads: LeadRepository::new(db.clone()),
            conversations: ConversationRepository::new(db.clone()),
            messages: MessageRepository::new(db.clone()),
            taxonomy: TaxonomyRepository::new(db.clone()),
            requests: ServiceRequestRepository::new(db),
            assignment,
            dispatcher,
            synthesizer,
        }
    }

    // ------------------------------------------------------------------
    // Synchronous half: runs before the transport acknowledgment
    // ------------------------------------------------------------------

    /// Ingest one messaging-channel delivery. Returns the background jobs to
    /// enqueue; an empty vec means the delivery was a duplicate, media-only,
    /// or belongs to a human-handled thread.
    pub async fn ingest_channel_message(
        &self,
        inbound: InboundChannelMessage,
    ) -> Result<Vec<PipelineJob>, DbErr> {
        let admitted = self
            .event_gate
            .admit("inbound_message", &inbound.message_sid, inbound.raw.clone())
            .await?;
        if !admitted {
            counter!("ingest_duplicate_total").increment(1);
            return Ok(Vec::new());
        }

        let phone = inbound
            .from
            .strip_prefix("whatsapp:")
            .unwrap_or(&inbound.from);
        let lead = self
            .leads
            .find_or_create(phone, inbound.profile_name.as_deref(), Some(&inbound.from))
            .await?;

        let body = inbound.body.clone().unwrap_or_default();
        let conversation = self
            .conversations
            .resolve_inbound(
                CHANNEL_WHATSAPP,
                &inbound.from,
                None,
                Some(lead.id),
                (!body.is_empty()).then_some(body.as_str()),
            )
            .await?;

        let message = self
            .messages
            .record_inbound(
                conversation.id,
                &body,
                Some(&inbound.message_sid),
                inbound.attachments.clone(),
            )
            .await?;

        if conversation.mode == ConversationMode::Human {
            return Ok(Vec::new());
        }

        if !body.is_empty() && self.detector.wants_human(&body) {
            info!(conversation_id = %conversation.id, "Human takeover requested");
            self.conversations.mark_human(conversation.clone()).await?;
            return Ok(vec![PipelineJob::TakeoverNotice {
                conversation_id: conversation.id,
                reply_to: Some(inbound.from.clone()),
            }]);
        }

        if body.is_empty() {
            // Media-only delivery: stored, nothing to classify
            return Ok(Vec::new());
        }

        Ok(vec![PipelineJob::ProcessTurn {
            conversation_id: conversation.id,
            message_id: message.id,
            lead_id: Some(lead.id),
            text: body,
            reply_to: Some(inbound.from),
        }])
    }

    /// Record a delivery-status callback against the matching outbound
    /// message. Redeliveries of the same (message, status) pair are admitted
    /// once through the event gate.
    pub async fn record_status_callback(
        &self,
        message_sid: &str,
        message_status: &str,
        raw: JsonValue,
    ) -> Result<(), DbErr> {
        let gate_key = format!("{message_sid}:{message_status}");
        let admitted = self
            .event_gate
            .admit("status_callback", &gate_key, raw)
            .await?;
        if !admitted {
            return Ok(());
        }

        if self
            .messages
            .update_delivery_status(message_sid, message_status)
            .await?
            .is_none()
        {
            warn!(message_sid, "Status callback for unknown message");
        }

        Ok(())
    }

    /// Open (or re-open) a webchat session, returning the session id and its
    /// conversation.
    pub async fn open_webchat_session(
        &self,
        session_id: Option<String>,
    ) -> Result<(String, Conversation), DbErr> {
        let session_id = session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let conversation = self
            .conversations
            .resolve_inbound(CHANNEL_WEBCHAT, &session_id, None, None, None)
            .await?;

        Ok((session_id, conversation))
    }

    /// Store a webchat message synchronously and return the background jobs
    /// to enqueue. `None` when the conversation does not exist.
    pub async fn ingest_webchat_message(
        &self,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<Option<(Message, Vec<PipelineJob>)>, DbErr> {
        let Some(conversation) = self.conversations.find_by_id(conversation_id).await? else {
            return Ok(None);
        };

        let message = self
            .messages
            .record_inbound(conversation.id, content, None, JsonValue::Array(Vec::new()))
            .await?;
        let conversation = self
            .conversations
            .touch_inbound(conversation, Some(content))
            .await?;

        if conversation.mode == ConversationMode::Human {
            return Ok(Some((message, Vec::new())));
        }

        if self.detector.wants_human(content) {
            info!(conversation_id = %conversation.id, "Human takeover requested");
            self.conversations.mark_human(conversation.clone()).await?;
            return Ok(Some((
                message,
                vec![PipelineJob::TakeoverNotice {
                    conversation_id: conversation.id,
                    reply_to: None,
                }],
            )));
        }

        let job = PipelineJob::ProcessTurn {
            conversation_id: conversation.id,
            message_id: message.id,
            lead_id: conversation.lead_id,
            text: content.to_string(),
            reply_to: None,
        };

        Ok(Some((message, vec![job])))
    }

    /// Messages of a conversation, oldest first. `None` when the
    /// conversation does not exist.
    pub async fn conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Vec<Message>>, DbErr> {
        if self.conversations.find_by_id(conversation_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.messages.list_for_conversation(conversation_id).await?))
    }

    // ------------------------------------------------------------------
    // Background half: runs on the worker pool
    // ------------------------------------------------------------------

    /// Run one background job to completion. All failures are logged and
    /// counted here; nothing propagates to the worker loop.
    pub async fn run_job(&self, job: PipelineJob) {
        match job {
            PipelineJob::ProcessTurn {
                conversation_id,
                message_id,
                lead_id,
                text,
                reply_to,
            } => {
                if let Err(err) = self
                    .process_turn(conversation_id, message_id, lead_id, &text, reply_to.as_deref())
                    .await
                {
                    counter!("pipeline_jobs_failed_total", "kind" => "process_turn").increment(1);
                    warn!(
                        conversation_id = %conversation_id,
                        error = %err,
                        "Turn processing failed"
                    );
                }
            }
            PipelineJob::TakeoverNotice {
                conversation_id,
                reply_to,
            } => {
                self.takeover_notice(conversation_id, reply_to.as_deref())
                    .await;
            }
        }
    }

    /// The ordered background chain for one inbound message:
    /// classify, assign, dedup/create request, dispatch, synthesize, notify.
    async fn process_turn(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        lead_id: Option<Uuid>,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), DbErr> {
        let intent = match self.collaborators.classifier.classify(text).await {
            Ok(intent) => intent,
            Err(err) => {
                // Safe default: no classification, no request; the message is
                // already stored
                counter!("classifier_failures_total").increment(1);
                warn!(
                    conversation_id = %conversation_id,
                    message_id = %message_id,
                    error = %err,
                    "Intent classification failed; skipping turn"
                );
                return Ok(());
            }
        };

        let Some(conversation) = self.conversations.find_by_id(conversation_id).await? else {
            return Ok(());
        };
        // A takeover may have landed between acknowledgment and this job
        if conversation.mode == ConversationMode::Human {
            return Ok(());
        }

        let conversation = self
            .assignment
            .classify_and_maybe_assign(conversation, &intent)
            .await?;

        let Some(outcome) = self
            .upsert_service_request(&conversation, lead_id, text, &intent)
            .await?
        else {
            return Ok(());
        };

        if !outcome.created {
            // Merged into an open request: no new dispatch, no new context
            return Ok(());
        }

        if let Err(err) = self
            .dispatcher
            .dispatch(outcome.request.clone(), &outcome.category_key)
            .await
        {
            warn!(
                request_id = %outcome.request.id,
                error = %err,
                "Dispatch failed; request remains routable by operators"
            );
        }

        if let Err(err) = self
            .synthesizer
            .synthesize(outcome.request.id, text, outcome.request.payload.clone())
            .await
        {
            warn!(
                request_id = %outcome.request.id,
                error = %err,
                "Context synthesis failed"
            );
        }

        self.confirm_to_customer(conversation.id, reply_to).await;

        if let Err(err) = self
            .collaborators
            .notifier
            .notify(
                "service_request_created",
                &format!(
                    "Request {} ({}) created from conversation {}",
                    outcome.request.id, outcome.category_key, conversation.id
                ),
            )
            .await
        {
            warn!(error = %err, "Operational notification failed");
        }

        Ok(())
    }

    /// Service request dedup/create: reject non-actionable intents, resolve
    /// category and city, merge into an open request inside the window or
    /// create a fresh one.
    async fn upsert_service_request(
        &self,
        conversation: &Conversation,
        lead_id: Option<Uuid>,
        text: &str,
        intent: &IntentResult,
    ) -> Result<Option<RequestOutcome>, DbErr> {
        if matches!(intent.intent.as_str(), "GREETING" | "OUT_OF_SCOPE") {
            return Ok(None);
        }

        let Some(category_key) = self.config.routing.category_for_intent(&intent.intent) else {
            return Ok(None);
        };
        let category_key = category_key.to_string();

        // Product searches ride the retail search flow, not request routing
        if category_key == "shopping" && intent.sub_intent.as_deref() == Some("product_search") {
            return Ok(None);
        }

        let category = self.taxonomy.find_or_create_category(&category_key).await?;

        let Some(city) = self
            .taxonomy
            .resolve_city(
                intent.city.as_deref(),
                self.config.routing.default_city.as_deref(),
            )
            .await?
        else {
            warn!(
                conversation_id = %conversation.id,
                "No active city available; request not created"
            );
            return Ok(None);
        };

        let turn_payload = RequestPayload {
            version: 0,
            last_user_message: Some(text.to_string()),
            intent: Some(intent.intent.clone()),
            sub_intent: intent.sub_intent.clone(),
            city: Some(city.slug.clone()),
            confidence: Some(intent.confidence),
            updated_at: Some(chrono::Utc::now()),
        };

        if let Some(open) = self
            .requests
            .find_open_in_window(conversation.id, category.id)
            .await?
        {
            let merged = self.requests.merge_payload(open, turn_payload).await?;
            counter!("service_requests_merged_total").increment(1);
            return Ok(Some(RequestOutcome {
                request: merged,
                category_key,
                created: false,
            }));
        }

        let created = self
            .requests
            .create(
                conversation.id,
                category.id,
                city.id,
                lead_id.or(conversation.lead_id),
                turn_payload,
            )
            .await?;
        counter!("service_requests_created_total").increment(1);
        info!(
            request_id = %created.id,
            category = %category_key,
            city = %city.slug,
            "Service request created"
        );

        Ok(Some(RequestOutcome {
            request: created,
            category_key,
            created: true,
        }))
    }

    /// Fixed takeover confirmation plus operational alert, both best-effort.
    async fn takeover_notice(&self, conversation_id: Uuid, reply_to: Option<&str>) {
        self.send_reply(conversation_id, reply_to, TAKEOVER_REPLY)
            .await;

        if let Err(err) = self
            .collaborators
            .notifier
            .notify(
                "human_takeover",
                &format!("Conversation {conversation_id} switched to HUMAN mode"),
            )
            .await
        {
            warn!(error = %err, "Takeover notification failed");
        }
    }

    async fn confirm_to_customer(&self, conversation_id: Uuid, reply_to: Option<&str>) {
        self.send_reply(conversation_id, reply_to, REQUEST_CONFIRMATION)
            .await;
    }

    /// Record an outbound reply and hand it to the channel sender when the
    /// channel supports delivery. Failures leave the message row in place
    /// with a failed status.
    async fn send_reply(&self, conversation_id: Uuid, reply_to: Option<&str>, body: &str) {
        let (provider_message_id, status) = match reply_to {
            Some(address) => match self.collaborators.sender.send_text(address, body).await {
                Ok(id) => (Some(id), "sent"),
                Err(err) => {
                    counter!("outbound_send_failures_total").increment(1);
                    warn!(error = %err, "Outbound reply failed");
                    (None, "failed")
                }
            },
            // Webchat replies surface through the message log only
            None => (None, "sent"),
        };

        if let Err(err) = self
            .messages
            .record_outbound(conversation_id, body, provider_message_id.as_deref(), status)
            .await
        {
            warn!(error = %err, "Failed to record outbound reply");
            return;
        }

        if let Err(err) = self.conversations.touch_outbound(conversation_id).await {
            warn!(error = %err, "Failed to update outbound bookkeeping");
        }
    }
}
