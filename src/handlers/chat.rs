//! # Web Chat Handlers
//!
//! Synchronous HTTP surface for the web chat widget. Unlike the webhook
//! endpoints these return real errors to the caller; the send endpoint stores
//! the inbound message synchronously and then enqueues the same background
//! chain the messaging webhook uses, returning before it completes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::models::message::{MessageDirection, Model as MessageModel};
use crate::server::AppState;

/// Session open/resume request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Existing session id to resume; omitted on first load
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Session open/resume response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub conversation_id: Uuid,
}

/// One message in a conversation transcript
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub role: String,
    pub direction: String,
    pub content: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<MessageModel> for MessageView {
    fn from(model: MessageModel) -> Self {
        let direction = match model.direction {
            MessageDirection::Inbound => "INBOUND",
            MessageDirection::Outbound => "OUTBOUND",
        };
        Self {
            id: model.id,
            role: model.role,
            direction: direction.to_string(),
            content: model.content,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

/// Transcript response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub conversation_id: Uuid,
    pub messages: Vec<MessageView>,
}

/// Send request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub content: String,
}

/// Send response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message: MessageView,
}

/// Open or resume a web chat session
#[utoipa::path(
    post,
    path = "/webchat/session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session resolved", body = SessionResponse),
        (status = 500, description = "Internal error", body = ApiError)
    ),
    tag = "webchat"
)]
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (session_id, conversation) = state
        .pipeline
        .open_webchat_session(request.session_id)
        .await?;

    Ok(Json(SessionResponse {
        session_id,
        conversation_id: conversation.id,
    }))
}

/// Fetch the transcript of a conversation
#[utoipa::path(
    get,
    path = "/webchat/{conversation_id}/messages",
    params(
        ("conversation_id" = Uuid, Path, description = "Conversation id")
    ),
    responses(
        (status = 200, description = "Transcript", body = MessagesResponse),
        (status = 404, description = "Unknown conversation", body = ApiError)
    ),
    tag = "webchat"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let Some(messages) = state
        .pipeline
        .conversation_messages(conversation_id)
        .await?
    else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Conversation not found",
        ));
    };

    Ok(Json(MessagesResponse {
        conversation_id,
        messages: messages.into_iter().map(MessageView::from).collect(),
    }))
}

/// Send a message into a conversation
#[utoipa::path(
    post,
    path = "/webchat/{conversation_id}/send",
    params(
        ("conversation_id" = Uuid, Path, description = "Conversation id")
    ),
    request_body = SendRequest,
    responses(
        (status = 200, description = "Message stored; processing continues in the background", body = SendResponse),
        (status = 400, description = "Empty message", body = ApiError),
        (status = 404, description = "Unknown conversation", body = ApiError)
    ),
    tag = "webchat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(validation_error(
            "Message content must not be empty",
            serde_json::json!({"content": "required"}),
        ));
    }

    let Some((message, jobs)) = state
        .pipeline
        .ingest_webchat_message(conversation_id, content)
        .await?
    else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Conversation not found",
        ));
    };

    for job in jobs {
        state.queue.enqueue(job);
    }

    Ok(Json(SendResponse {
        success: true,
        message: MessageView::from(message),
    }))
}
