//! # Webhook Handlers
//!
//! Inbound endpoints for the WhatsApp-style messaging provider. The provider
//! retries aggressively on slow or non-2xx responses, so both endpoints
//! acknowledge with an empty 200 before and independent of any background
//! outcome - including on malformed payloads, which can never succeed on
//! retry. The only exception is an unreachable persistent store, which fails
//! the call outright so the transport retries later.

use std::collections::BTreeMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{ApiError, is_connection_failure};
use crate::pipeline::InboundChannelMessage;
use crate::server::AppState;

/// Media attachments carried on one delivery, capped by the provider.
const MAX_MEDIA_ITEMS: usize = 3;

/// Parse the indexed MediaUrl{i}/MediaContentType{i} pairs into a JSON array.
fn parse_attachments(params: &BTreeMap<String, String>) -> JsonValue {
    let mut attachments = Vec::new();

    for index in 0..MAX_MEDIA_ITEMS {
        let Some(url) = params.get(&format!("MediaUrl{index}")) else {
            break;
        };
        let content_type = params
            .get(&format!("MediaContentType{index}"))
            .cloned()
            .unwrap_or_default();
        attachments.push(serde_json::json!({
            "url": url,
            "content_type": content_type,
        }));
    }

    JsonValue::Array(attachments)
}

fn raw_payload(params: &BTreeMap<String, String>) -> JsonValue {
    serde_json::to_value(params).unwrap_or(JsonValue::Null)
}

/// Empty acknowledgment unless the store itself is down.
fn acknowledge(result: Result<(), sea_orm::DbErr>) -> Response {
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) if is_connection_failure(&err) => ApiError::from(err).into_response(),
        Err(err) => {
            warn!(error = %err, "Webhook processing failed after admission; acknowledging anyway");
            StatusCode::OK.into_response()
        }
    }
}

/// Inbound message webhook from the messaging provider
#[utoipa::path(
    post,
    path = "/webhooks/messaging",
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Delivery acknowledged; processing continues in the background"),
        (status = 503, description = "Persistent store unavailable; provider should retry")
    ),
    tag = "webhooks"
)]
pub async fn inbound_message(
    State(state): State<AppState>,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response {
    let Form(params) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable webhook body; acknowledging");
            return StatusCode::OK.into_response();
        }
    };

    // Required fields per the provider contract. A payload missing them can
    // never succeed on retry, so it is logged and acknowledged.
    let (Some(message_sid), Some(from), Some(to)) = (
        params.get("MessageSid"),
        params.get("From"),
        params.get("To"),
    ) else {
        warn!("Webhook payload missing MessageSid/From/To; acknowledging");
        return StatusCode::OK.into_response();
    };

    let inbound = InboundChannelMessage {
        message_sid: message_sid.clone(),
        from: from.clone(),
        to: to.clone(),
        body: params.get("Body").cloned(),
        profile_name: params.get("ProfileName").cloned(),
        attachments: parse_attachments(&params),
        raw: raw_payload(&params),
    };

    let result = state
        .pipeline
        .ingest_channel_message(inbound)
        .await
        .map(|jobs| {
            for job in jobs {
                state.queue.enqueue(job);
            }
        });

    acknowledge(result)
}

/// Delivery-status callback from the messaging provider
#[utoipa::path(
    post,
    path = "/webhooks/messaging/status",
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Callback acknowledged"),
        (status = 503, description = "Persistent store unavailable; provider should retry")
    ),
    tag = "webhooks"
)]
pub async fn message_status(
    State(state): State<AppState>,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response {
    let Form(params) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable status callback body; acknowledging");
            return StatusCode::OK.into_response();
        }
    };

    let (Some(message_sid), Some(message_status)) =
        (params.get("MessageSid"), params.get("MessageStatus"))
    else {
        warn!("Status callback missing MessageSid/MessageStatus; acknowledging");
        return StatusCode::OK.into_response();
    };

    if let Some(error_code) = params.get("ErrorCode") {
        info!(
            message_sid = %message_sid,
            error_code = %error_code,
            error_message = params.get("ErrorMessage").map(String::as_str).unwrap_or(""),
            "Provider reported delivery error"
        );
    }

    let result = state
        .pipeline
        .record_status_callback(message_sid, message_status, raw_payload(&params))
        .await;

    acknowledge(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attachments_indexed_pairs() {
        let mut params = BTreeMap::new();
        params.insert("MediaUrl0".to_string(), "https://cdn/a.jpg".to_string());
        params.insert("MediaContentType0".to_string(), "image/jpeg".to_string());
        params.insert("MediaUrl1".to_string(), "https://cdn/b.ogg".to_string());
        params.insert("MediaContentType1".to_string(), "audio/ogg".to_string());

        let attachments = parse_attachments(&params);
        let items = attachments.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["url"], "https://cdn/a.jpg");
        assert_eq!(items[1]["content_type"], "audio/ogg");
    }

    #[test]
    fn test_parse_attachments_stops_at_gap() {
        let mut params = BTreeMap::new();
        params.insert("MediaUrl1".to_string(), "https://cdn/b.jpg".to_string());

        // No MediaUrl0, so indexing stops immediately
        let attachments = parse_attachments(&params);
        assert_eq!(attachments.as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_parse_attachments_caps_at_three() {
        let mut params = BTreeMap::new();
        for index in 0..5 {
            params.insert(format!("MediaUrl{index}"), format!("https://cdn/{index}"));
        }

        let attachments = parse_attachments(&params);
        assert_eq!(attachments.as_array().unwrap().len(), MAX_MEDIA_ITEMS);
    }
}
