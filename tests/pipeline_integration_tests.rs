//! End-to-end pipeline tests over an in-memory store: idempotent ingestion,
//! thread stability, request dedup, dispatch cap/ordering/idempotency, SLA
//! arithmetic, and the human-takeover path. Background jobs are run inline
//! for determinism.

mod support;

use std::sync::Arc;

use chrono::Duration;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use concierge::clients::IntentResult;
use concierge::models::conversation::ConversationMode;
use concierge::models::message::MessageDirection;
use concierge::models::service_request::RequestPayload;
use concierge::models::{
    Conversation, Lead, Message, ProviderContext, ProviderDispatch, ServiceRequest, WebhookEvent,
};
use support::{FakeClassifier, FailingClassifier, ProviderSeed, build_harness, inbound, seed_city, seed_provider};

fn hotel_intent() -> IntentResult {
    IntentResult {
        intent: "HOTEL".to_string(),
        sub_intent: None,
        confidence: 0.9,
        city: Some("guangzhou".to_string()),
    }
}

#[tokio::test]
async fn idempotent_ingestion_processes_duplicate_once() {
    let classifier = Arc::new(
        FakeClassifier::new().with_result("need a hotel in guangzhou", hotel_intent()),
    );
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Hotel Desk",
            categories: &["hotel"],
            is_default: true,
            ..Default::default()
        },
    )
    .await;

    let first_jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM100", "whatsapp:+8613800000001", "need a hotel in guangzhou"))
        .await
        .unwrap();
    assert_eq!(first_jobs.len(), 1);

    // Redelivery of the same MessageSid: admitted=false, no jobs
    let second_jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM100", "whatsapp:+8613800000001", "need a hotel in guangzhou"))
        .await
        .unwrap();
    assert!(second_jobs.is_empty());

    for job in first_jobs {
        harness.pipeline.run_job(job).await;
    }

    assert_eq!(WebhookEvent::find().count(&harness.db).await.unwrap(), 1);
    assert_eq!(Lead::find().count(&harness.db).await.unwrap(), 1);
    assert_eq!(Conversation::find().count(&harness.db).await.unwrap(), 1);
    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 1);
    // One inbound message plus one confirmation reply
    let inbound_count = Message::find()
        .filter(concierge::models::message::Column::Direction.eq(MessageDirection::Inbound))
        .count(&harness.db)
        .await
        .unwrap();
    assert_eq!(inbound_count, 1);
}

#[tokio::test]
async fn thread_stability_same_identity_same_conversation() {
    let harness = build_harness(Arc::new(FakeClassifier::new())).await;

    let jobs_a = harness
        .pipeline
        .ingest_channel_message(inbound("SM200", "whatsapp:+8613800000002", "hello"))
        .await
        .unwrap();
    let jobs_b = harness
        .pipeline
        .ingest_channel_message(inbound("SM201", "whatsapp:+8613800000002", "hello again"))
        .await
        .unwrap();
    assert_eq!(jobs_a.len(), 1);
    assert_eq!(jobs_b.len(), 1);

    assert_eq!(Conversation::find().count(&harness.db).await.unwrap(), 1);
}

#[tokio::test]
async fn hotel_scenario_dispatches_default_provider_with_thirty_minute_sla() {
    let classifier =
        Arc::new(FakeClassifier::new().with_result("hotel please", hotel_intent()));
    let harness = build_harness(classifier).await;
    let city = seed_city(&harness.db, "guangzhou", false).await;

    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Backup Desk",
            phone: Some("+8613900000001"),
            categories: &["hotel"],
            ..Default::default()
        },
    )
    .await;
    let default_provider = seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Hotel Desk",
            phone: Some("+8613900000002"),
            categories: &["hotel"],
            is_default: true,
            ..Default::default()
        },
    )
    .await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM300", "whatsapp:+8613800000003", "hotel please"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    let request = ServiceRequest::find()
        .one(&harness.db)
        .await
        .unwrap()
        .expect("one service request");
    assert_eq!(request.city_id, city.id);
    let payload = RequestPayload::from_json(&request.payload);
    assert_eq!(payload.intent.as_deref(), Some("HOTEL"));
    assert_eq!(payload.city.as_deref(), Some("guangzhou"));

    // Single-destination category: exactly one dispatch, to the default
    let dispatches = ProviderDispatch::find().all(&harness.db).await.unwrap();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].provider_user_id, default_provider);
    assert_eq!(dispatches[0].status, "sent");

    // SLA arithmetic: dispatched_at + 30 minutes
    let dispatched_at = request.dispatched_at.expect("dispatched");
    let sla_due_at = request.sla_due_at.expect("sla set");
    assert_eq!(sla_due_at - dispatched_at, Duration::minutes(30));

    // Context synthesis wrote a provider context row
    assert_eq!(ProviderContext::find().count(&harness.db).await.unwrap(), 1);

    // Customer got a confirmation on the channel
    let sent = harness.sender.sent.lock().unwrap();
    assert!(sent.iter().any(|(to, _)| to == "whatsapp:+8613800000003"));
}

#[tokio::test]
async fn multi_destination_category_gets_sixty_minute_sla() {
    let classifier = Arc::new(FakeClassifier::new().with_result(
        "book a table",
        IntentResult {
            intent: "RESTAURANT".to_string(),
            sub_intent: None,
            confidence: 0.8,
            city: None,
        },
    ));
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Bistro",
            categories: &["restaurant"],
            ..Default::default()
        },
    )
    .await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM400", "whatsapp:+8613800000004", "book a table"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    let request = ServiceRequest::find()
        .one(&harness.db)
        .await
        .unwrap()
        .expect("request created");
    let dispatched_at = request.dispatched_at.unwrap();
    let sla_due_at = request.sla_due_at.unwrap();
    assert_eq!(sla_due_at - dispatched_at, Duration::minutes(60));
}

#[tokio::test]
async fn second_message_in_window_merges_instead_of_creating() {
    let classifier = Arc::new(
        FakeClassifier::new()
            .with_result("hotel in guangzhou", hotel_intent())
            .with_result("make it two rooms", hotel_intent()),
    );
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Hotel Desk",
            categories: &["hotel"],
            ..Default::default()
        },
    )
    .await;

    for (sid, text) in [("SM500", "hotel in guangzhou"), ("SM501", "make it two rooms")] {
        let jobs = harness
            .pipeline
            .ingest_channel_message(inbound(sid, "whatsapp:+8613800000005", text))
            .await
            .unwrap();
        for job in jobs {
            harness.pipeline.run_job(job).await;
        }
    }

    // Second qualifying message inside the window merged into the first row
    let requests = ServiceRequest::find().all(&harness.db).await.unwrap();
    assert_eq!(requests.len(), 1);
    let payload = RequestPayload::from_json(&requests[0].payload);
    assert_eq!(payload.version, 1);
    assert_eq!(payload.last_user_message.as_deref(), Some("make it two rooms"));

    // Merge did not re-dispatch
    assert_eq!(ProviderDispatch::find().count(&harness.db).await.unwrap(), 1);
}

#[tokio::test]
async fn takeover_flips_mode_and_blocks_request_creation() {
    // Text contains both a takeover keyword and an otherwise-actionable intent
    let classifier = Arc::new(FakeClassifier::new().with_result(
        "let me speak to a human about a hotel",
        hotel_intent(),
    ));
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound(
            "SM600",
            "whatsapp:+8613800000006",
            "let me speak to a human about a hotel",
        ))
        .await
        .unwrap();

    // Takeover produces a notice job, not a processing turn
    assert_eq!(jobs.len(), 1);
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    let conversation = Conversation::find()
        .one(&harness.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.mode, ConversationMode::Human);
    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 0);

    // Fixed confirmation went out and operators were alerted
    assert_eq!(harness.sender.sent.lock().unwrap().len(), 1);
    assert!(harness
        .notifier
        .alerts
        .lock()
        .unwrap()
        .contains(&"human_takeover".to_string()));

    // Follow-up messages on the human thread are stored but spawn no jobs
    let follow_up = harness
        .pipeline
        .ingest_channel_message(inbound("SM601", "whatsapp:+8613800000006", "hotel please"))
        .await
        .unwrap();
    assert!(follow_up.is_empty());
}

#[tokio::test]
async fn greeting_and_unmapped_intents_create_no_request() {
    let classifier = Arc::new(FakeClassifier::new()); // defaults to GREETING
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM700", "whatsapp:+8613800000007", "hi there"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 0);
}

#[tokio::test]
async fn product_search_sub_intent_is_reserved_for_retail_flow() {
    let classifier = Arc::new(FakeClassifier::new().with_result(
        "find me sneakers",
        IntentResult {
            intent: "SHOPPING".to_string(),
            sub_intent: Some("product_search".to_string()),
            confidence: 0.95,
            city: None,
        },
    ));
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM800", "whatsapp:+8613800000008", "find me sneakers"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 0);
}

#[tokio::test]
async fn no_active_city_aborts_request_quietly() {
    let classifier =
        Arc::new(FakeClassifier::new().with_result("hotel please", hotel_intent()));
    let harness = build_harness(classifier).await;
    // No cities seeded at all

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SM900", "whatsapp:+8613800000009", "hotel please"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 0);
    // The inbound message is still stored
    assert_eq!(Message::find().count(&harness.db).await.unwrap(), 1);
}

#[tokio::test]
async fn classifier_failure_stores_message_and_stops() {
    let harness = build_harness(Arc::new(FailingClassifier)).await;
    seed_city(&harness.db, "guangzhou", true).await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SMA00", "whatsapp:+8613800000010", "hotel please"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    assert_eq!(Message::find().count(&harness.db).await.unwrap(), 1);
    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 0);
}

#[tokio::test]
async fn conversation_assignment_is_idempotent_across_turns() {
    let classifier = Arc::new(
        FakeClassifier::new()
            .with_result("hotel one", hotel_intent())
            .with_result("hotel two", hotel_intent()),
    );
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;
    let first_provider = seed_provider(
        &harness.db,
        ProviderSeed {
            name: "First Desk",
            categories: &["hotel"],
            ..Default::default()
        },
    )
    .await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Second Desk",
            categories: &["hotel"],
            ..Default::default()
        },
    )
    .await;

    for (sid, text) in [("SMB00", "hotel one"), ("SMB01", "hotel two")] {
        let jobs = harness
            .pipeline
            .ingest_channel_message(inbound(sid, "whatsapp:+8613800000011", text))
            .await
            .unwrap();
        for job in jobs {
            harness.pipeline.run_job(job).await;
        }
    }

    let conversation = Conversation::find()
        .one(&harness.db)
        .await
        .unwrap()
        .unwrap();
    // First eligible provider in creation order, assigned once
    assert_eq!(conversation.assigned_provider_id, Some(first_provider));
    assert_eq!(conversation.assigned_by.as_deref(), Some("AI"));
    assert_eq!(conversation.category_key.as_deref(), Some("hotel"));
}

#[tokio::test]
async fn low_confidence_routes_to_ops_queue() {
    let classifier = Arc::new(FakeClassifier::new().with_result(
        "maybe a hotel",
        IntentResult {
            intent: "HOTEL".to_string(),
            sub_intent: None,
            confidence: 0.5,
            city: Some("guangzhou".to_string()),
        },
    ));
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Hotel Desk",
            categories: &["hotel"],
            ..Default::default()
        },
    )
    .await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound("SMC00", "whatsapp:+8613800000012", "maybe a hotel"))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    let conversation = Conversation::find()
        .one(&harness.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.category_key.as_deref(), Some("ops_queue"));
    assert!(conversation.assigned_provider_id.is_none());

    // Low confidence blocks assignment but not the request itself
    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 1);
}

#[tokio::test]
async fn dispatch_ordering_prefers_default_then_smallest_user_id() {
    let harness = build_harness(Arc::new(FakeClassifier::new())).await;
    let city = seed_city(&harness.db, "guangzhou", true).await;

    let mut provider_ids = Vec::new();
    for name in ["P1", "P2", "P3", "P4", "P5"] {
        provider_ids.push(
            seed_provider(
                &harness.db,
                ProviderSeed {
                    name,
                    categories: &["tours"],
                    city_id: Some(city.id),
                    ..Default::default()
                },
            )
            .await,
        );
    }

    // Without a default flag, the lexicographically-smallest user id wins
    let expected = provider_ids.iter().min().copied().unwrap();

    use concierge::repositories::ProviderRepository;
    let eligible = ProviderRepository::new(harness.db.clone())
        .eligible_for_dispatch("tours", city.id)
        .await
        .unwrap();
    assert_eq!(eligible.len(), 5);
    assert_eq!(eligible[0].user.id, expected);
}

#[tokio::test]
async fn city_scoped_providers_excluded_for_other_cities() {
    let harness = build_harness(Arc::new(FakeClassifier::new())).await;
    let guangzhou = seed_city(&harness.db, "guangzhou", true).await;
    let shenzhen = seed_city(&harness.db, "shenzhen", false).await;

    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Shenzhen Only",
            categories: &["tours"],
            city_id: Some(shenzhen.id),
            ..Default::default()
        },
    )
    .await;
    let anywhere = seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Anywhere",
            categories: &["tours"],
            ..Default::default()
        },
    )
    .await;

    use concierge::repositories::ProviderRepository;
    let eligible = ProviderRepository::new(harness.db.clone())
        .eligible_for_dispatch("tours", guangzhou.id)
        .await
        .unwrap();

    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].user.id, anywhere);
}

#[tokio::test]
async fn inactive_profiles_and_users_are_ineligible() {
    let harness = build_harness(Arc::new(FakeClassifier::new())).await;
    let city = seed_city(&harness.db, "guangzhou", true).await;

    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Inactive Profile",
            categories: &["tours"],
            profile_active: false,
            ..Default::default()
        },
    )
    .await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Inactive User",
            categories: &["tours"],
            user_active: false,
            ..Default::default()
        },
    )
    .await;

    use concierge::repositories::ProviderRepository;
    let eligible = ProviderRepository::new(harness.db.clone())
        .eligible_for_dispatch("tours", city.id)
        .await
        .unwrap();
    assert!(eligible.is_empty());
}

#[tokio::test]
async fn webchat_send_runs_same_chain() {
    let classifier =
        Arc::new(FakeClassifier::new().with_result("hotel please", hotel_intent()));
    let harness = build_harness(classifier).await;
    seed_city(&harness.db, "guangzhou", true).await;
    seed_provider(
        &harness.db,
        ProviderSeed {
            name: "Hotel Desk",
            categories: &["hotel"],
            ..Default::default()
        },
    )
    .await;

    let (session_id, conversation) = harness
        .pipeline
        .open_webchat_session(None)
        .await
        .unwrap();
    assert!(!session_id.is_empty());

    // Re-opening with the same session id resolves the same conversation
    let (_, resumed) = harness
        .pipeline
        .open_webchat_session(Some(session_id))
        .await
        .unwrap();
    assert_eq!(resumed.id, conversation.id);

    let (message, jobs) = harness
        .pipeline
        .ingest_webchat_message(conversation.id, "hotel please")
        .await
        .unwrap()
        .expect("conversation exists");
    assert_eq!(message.content, "hotel please");

    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    assert_eq!(ServiceRequest::find().count(&harness.db).await.unwrap(), 1);

    // Webchat has no outbound channel; confirmation lands in the transcript
    let transcript = harness
        .pipeline
        .conversation_messages(conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(transcript
        .iter()
        .any(|m| m.direction == MessageDirection::Outbound));
}

#[tokio::test]
async fn status_callback_updates_delivery_status() {
    let classifier = Arc::new(FakeClassifier::new().with_result(
        "let me speak to a human",
        IntentResult {
            intent: "OUT_OF_SCOPE".to_string(),
            sub_intent: None,
            confidence: 0.9,
            city: None,
        },
    ));
    let harness = build_harness(classifier).await;

    let jobs = harness
        .pipeline
        .ingest_channel_message(inbound(
            "SMD00",
            "whatsapp:+8613800000013",
            "let me speak to a human",
        ))
        .await
        .unwrap();
    for job in jobs {
        harness.pipeline.run_job(job).await;
    }

    // The takeover reply was recorded with the fake sender's message id
    let outbound = Message::find()
        .filter(concierge::models::message::Column::Direction.eq(MessageDirection::Outbound))
        .one(&harness.db)
        .await
        .unwrap()
        .expect("outbound reply recorded");
    let sid = outbound.provider_message_id.clone().unwrap();

    harness
        .pipeline
        .record_status_callback(&sid, "delivered", serde_json::json!({}))
        .await
        .unwrap();

    let refreshed = Message::find_by_id(outbound.id)
        .one(&harness.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, "delivered");

    // Replaying the same callback is a no-op, not an error
    harness
        .pipeline
        .record_status_callback(&sid, "delivered", serde_json::json!({}))
        .await
        .unwrap();
}
