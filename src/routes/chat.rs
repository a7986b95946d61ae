// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Support chat routes. Clients poll for new messages with `since`.

use crate::error::{AppError, Result};
use crate::i18n::Locale;
use crate::middleware::auth::AuthUser;
use crate::models::{ChatMessage, ChatSession};
use crate::time_utils::parse_timestamp;
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chat/session", get(current_session))
        .route("/api/chat/messages", post(send_message))
        .route("/api/chat/sessions", get(list_sessions))
        .route("/api/chat/sessions/{id}/messages", get(list_messages))
        .route("/api/chat/sessions/{id}/human", post(request_human))
        .route("/api/chat/sessions/{id}/reply", post(admin_reply))
        .route("/api/chat/sessions/{id}/close", post(close_session))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub session: Option<ChatSession>,
}

async fn current_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SessionResponse>> {
    let session = state.chat.current_session(&auth.profile).await?;
    Ok(Json(SessionResponse { session }))
}

#[derive(Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    /// Reply language; falls back to Accept-Language
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SendMessageResponse {
    pub session: ChatSession,
    pub message: ChatMessage,
    pub reply: Option<ChatMessage>,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>> {
    payload.validate()?;
    let locale = Locale::negotiate(payload.lang.as_deref(), &headers);

    let sent = state
        .chat
        .send_message(&auth.profile, &payload.message, locale, Utc::now())
        .await?;

    Ok(Json(SendMessageResponse {
        session: sent.session,
        message: sent.message,
        reply: sent.reply,
    }))
}

#[derive(Deserialize)]
struct MessagesQuery {
    /// RFC 3339; only messages strictly after this time
    since: Option<String>,
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<String>,
    ApiQuery(params): ApiQuery<MessagesQuery>,
) -> Result<Json<Vec<ChatMessage>>> {
    let since = params
        .since
        .as_deref()
        .map(|raw| {
            parse_timestamp(raw)
                .ok_or_else(|| AppError::BadRequest("Invalid 'since' parameter".to_string()))
        })
        .transpose()?;

    let messages = state
        .chat
        .messages(&auth.profile, &session_id, since)
        .await?;
    Ok(Json(messages))
}

async fn request_human(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSession>> {
    let session = state
        .chat
        .request_human(&auth.profile, &session_id, Utc::now())
        .await?;
    Ok(Json(session))
}

// ─── Admin ───────────────────────────────────────────────────

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ChatSession>>> {
    Ok(Json(state.chat.awaiting_human(&auth.profile).await?))
}

#[derive(Deserialize, Validate)]
pub struct AdminReplyRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

async fn admin_reply(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<String>,
    ApiJson(payload): ApiJson<AdminReplyRequest>,
) -> Result<Json<ChatMessage>> {
    payload.validate()?;
    let message = state
        .chat
        .admin_reply(&auth.profile, &session_id, &payload.message, Utc::now())
        .await?;
    Ok(Json(message))
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSession>> {
    let session = state
        .chat
        .close(&auth.profile, &session_id, Utc::now())
        .await?;
    Ok(Json(session))
}
