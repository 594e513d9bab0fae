/// Messaging REST API Handlers
///
/// Every endpoint answers with a `{ "success": ... }` envelope; failures go
/// through `AppError` and carry `"success": false` plus an `error` message.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use crate::{
    config::AppState,
    middleware::{error_handling::Result, Claims},
    models::{MessageResponse, SendMessageRequest, UserId},
    services::{ConversationService, MessagingService, UnreadTracker},
};

fn messaging(state: &AppState) -> MessagingService {
    MessagingService::new(Arc::clone(&state.messages), Arc::clone(&state.users))
}

/// GET /api/messages/conversations
/// Conversation list for the caller, newest activity first
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let service = ConversationService::new(
        Arc::clone(&state.messages),
        Arc::clone(&state.users),
        Arc::clone(&state.orders),
    );
    let conversations = service.list_conversations(claims.user_id, claims.role).await?;

    Ok(Json(json!({
        "success": true,
        "conversations": conversations
    })))
}

/// GET /api/messages/thread/:counterparty_id
/// Full thread with one counterparty; marks the caller's incoming messages read
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(counterparty_id): Path<UserId>,
) -> Result<Json<Value>> {
    let service = messaging(&state);
    let messages = service
        .list_thread(claims.user_id, claims.role, counterparty_id)
        .await?;
    let messages = service.to_responses(messages).await?;

    Ok(Json(json!({
        "success": true,
        "counterparty_id": counterparty_id,
        "messages": messages
    })))
}

/// POST /api/messages/send
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    let request = request.trimmed();
    request.validate()?;

    let service = messaging(&state);
    let message = service
        .send(claims.user_id, request.counterparty_id, &request.body)
        .await?;
    let message: Option<MessageResponse> = service.to_responses(vec![message]).await?.into_iter().next();

    Ok(Json(json!({
        "success": true,
        "message": message
    })))
}

/// GET /api/messages/unread-count
pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let tracker = UnreadTracker::new(Arc::clone(&state.messages));
    let count = tracker.count_unread(claims.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "unread_count": count
    })))
}
