//! HTTP collaborator client tests against wiremock upstreams: happy paths,
//! upstream error mapping, and the unconfigured degraded mode.

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concierge::clients::{
    CollaboratorError, HttpIntentClassifier, HttpLanguageService, IntentClassifier,
    LanguageService,
};

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn classifier_parses_intent_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(body_partial_json(serde_json::json!({"text": "hotel in gz"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "intent": "HOTEL",
            "confidence": 0.92,
            "city": "guangzhou"
        })))
        .mount(&server)
        .await;

    let classifier = HttpIntentClassifier::new(http_client(), Some(server.uri()));
    let result = classifier.classify("hotel in gz").await.unwrap();

    assert_eq!(result.intent, "HOTEL");
    assert_eq!(result.confidence, 0.92);
    assert_eq!(result.city.as_deref(), Some("guangzhou"));
    assert!(result.sub_intent.is_none());
}

#[tokio::test]
async fn classifier_maps_upstream_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let classifier = HttpIntentClassifier::new(http_client(), Some(server.uri()));
    let err = classifier.classify("anything").await.unwrap_err();

    assert!(matches!(
        err,
        CollaboratorError::UnexpectedStatus {
            service: "classifier",
            status: 500
        }
    ));
}

#[tokio::test]
async fn classifier_unconfigured_fails_fast() {
    let classifier = HttpIntentClassifier::new(http_client(), None);
    let err = classifier.classify("anything").await.unwrap_err();
    assert!(matches!(err, CollaboratorError::Unconfigured));
}

#[tokio::test]
async fn translator_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(body_partial_json(
            serde_json::json!({"target_language": "en"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "I would like to book a hotel"
        })))
        .mount(&server)
        .await;

    let service = HttpLanguageService::new(http_client(), Some(server.uri()));
    let translated = service.translate("我想订酒店", "en").await.unwrap();
    assert_eq!(translated, "I would like to book a hotel");
}

#[tokio::test]
async fn summarizer_returns_structured_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary": "Customer wants a hotel in Guangzhou for two nights.",
            "payload": {"nights": 2, "city": "guangzhou"}
        })))
        .mount(&server)
        .await;

    let service = HttpLanguageService::new(http_client(), Some(server.uri()));
    let summary = service.summarize("hotel request").await.unwrap();

    assert!(summary.summary.contains("Guangzhou"));
    assert_eq!(summary.payload["nights"], 2);
}

#[tokio::test]
async fn summarizer_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let service = HttpLanguageService::new(http_client(), Some(server.uri()));
    let err = service.summarize("hotel request").await.unwrap_err();

    assert!(matches!(
        err,
        CollaboratorError::MalformedResponse {
            service: "summarizer",
            ..
        }
    ));
}
