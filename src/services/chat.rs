// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Support chat sessions.
//!
//! A session starts in `active_ai`: every user message gets an assistant
//! reply. The user can escalate to `active_human`, after which replies come
//! from admins. Clients poll for new messages.

use crate::db::Db;
use crate::error::AppError;
use crate::i18n::Locale;
use crate::models::{ChatMessage, ChatSession, ChatSessionStatus, SenderType, User};
use crate::services::SupportAssistant;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Stored as the assistant reply when the assistant call fails.
pub const ASSISTANT_FALLBACK: &str =
    "Sorry, I encountered an error. Would you like to speak with a human support agent?";

/// Notice posted when a user asks for a human.
pub const HUMAN_HANDOFF_NOTICE: &str =
    "A human support agent will join you shortly. Please wait...";

/// Result of a user message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub session: ChatSession,
    pub message: ChatMessage,
    /// Assistant reply, present while the session is AI-handled
    pub reply: Option<ChatMessage>,
}

#[derive(Clone)]
pub struct ChatService {
    db: Db,
    assistant: SupportAssistant,
}

impl ChatService {
    pub fn new(db: Db, assistant: SupportAssistant) -> Self {
        Self { db, assistant }
    }

    /// The user's latest open session, if any.
    pub async fn current_session(&self, user: &User) -> Result<Option<ChatSession>, AppError> {
        Ok(self
            .db
            .chat_sessions_for_user(&user.email)
            .await?
            .into_iter()
            .find(|s| s.status.is_open()))
    }

    /// Post a user message, opening a session if needed.
    pub async fn send_message(
        &self,
        user: &User,
        text: &str,
        locale: Locale,
        now: DateTime<Utc>,
    ) -> Result<SentMessage, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("Message must not be empty".to_string()));
        }

        let mut session = match self.current_session(user).await? {
            Some(session) => session,
            None => {
                let session = ChatSession {
                    id: Uuid::new_v4().to_string(),
                    user_email: user.email.clone(),
                    user_name: user.full_name(),
                    status: ChatSessionStatus::ActiveAi,
                    assigned_to: None,
                    last_message_time: now,
                    created_at: now,
                };
                tracing::info!(session_id = %session.id, user_id = %user.id, "Chat session opened");
                session
            }
        };

        let sent_at = next_timestamp(&session, now);
        let message = new_message(&session.id, SenderType::User, Some(&user.email), text, sent_at);
        self.db.add_chat_message(&message).await?;
        session.last_message_time = sent_at;
        self.db.upsert_chat_session(&session).await?;

        let reply = if session.status == ChatSessionStatus::ActiveAi {
            let reply_text = match self.assistant.reply(text, locale).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Assistant reply failed");
                    ASSISTANT_FALLBACK.to_string()
                }
            };
            let reply_time = next_timestamp(&session, Utc::now());
            let reply = new_message(&session.id, SenderType::Ai, None, &reply_text, reply_time);
            self.db.add_chat_message(&reply).await?;
            session.last_message_time = reply_time;
            self.db.upsert_chat_session(&session).await?;
            Some(reply)
        } else {
            None
        };

        Ok(SentMessage {
            session,
            message,
            reply,
        })
    }

    /// Hand the session over to human support.
    pub async fn request_human(
        &self,
        user: &User,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatSession, AppError> {
        let mut session = self.session_for(user, session_id).await?;
        if !session.status.is_open() {
            return Err(AppError::Conflict("Chat session is closed".to_string()));
        }
        if session.status == ChatSessionStatus::ActiveHuman {
            return Ok(session);
        }

        let sent_at = next_timestamp(&session, now);
        session.status = ChatSessionStatus::ActiveHuman;
        session.last_message_time = sent_at;
        let notice = new_message(&session.id, SenderType::Ai, None, HUMAN_HANDOFF_NOTICE, sent_at);
        self.db.add_chat_message(&notice).await?;
        self.db.upsert_chat_session(&session).await?;

        tracing::info!(session_id = %session.id, "Human support requested");
        Ok(session)
    }

    /// Messages of a session in order, optionally only those after `since`.
    pub async fn messages(
        &self,
        user: &User,
        session_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, AppError> {
        self.session_for(user, session_id).await?;
        let messages = self.db.chat_messages(session_id).await?;
        Ok(match since {
            Some(since) => messages.into_iter().filter(|m| m.timestamp > since).collect(),
            None => messages,
        })
    }

    /// Sessions waiting for (or being handled by) a human.
    pub async fn awaiting_human(&self, admin: &User) -> Result<Vec<ChatSession>, AppError> {
        require_admin(admin)?;
        self.db
            .chat_sessions_with_status(ChatSessionStatus::ActiveHuman)
            .await
    }

    /// Post an admin reply and assign the session to that admin.
    pub async fn admin_reply(
        &self,
        admin: &User,
        session_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage, AppError> {
        require_admin(admin)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("Message must not be empty".to_string()));
        }

        let mut session = self
            .db
            .get_chat_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chat session {} not found", session_id)))?;
        if !session.status.is_open() {
            return Err(AppError::Conflict("Chat session is closed".to_string()));
        }

        let sent_at = next_timestamp(&session, now);
        let message = new_message(&session.id, SenderType::Admin, Some(&admin.email), text, sent_at);
        self.db.add_chat_message(&message).await?;

        session.status = ChatSessionStatus::ActiveHuman;
        session.assigned_to = Some(admin.email.clone());
        session.last_message_time = sent_at;
        self.db.upsert_chat_session(&session).await?;

        Ok(message)
    }

    /// Close a session (its owner or an admin).
    pub async fn close(
        &self,
        user: &User,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatSession, AppError> {
        let mut session = self.session_for(user, session_id).await?;
        session.status = ChatSessionStatus::Closed;
        session.last_message_time = session.last_message_time.max(now);
        self.db.upsert_chat_session(&session).await?;
        tracing::info!(session_id = %session.id, "Chat session closed");
        Ok(session)
    }

    /// Load a session the caller may see.
    async fn session_for(&self, user: &User, session_id: &str) -> Result<ChatSession, AppError> {
        let session = self
            .db
            .get_chat_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chat session {} not found", session_id)))?;
        if session.user_email != user.email && !user.is_admin() {
            return Err(AppError::Forbidden(
                "Not a participant of this chat session".to_string(),
            ));
        }
        Ok(session)
    }
}

/// Message times within a session strictly increase, so `since` polling
/// never skips a message.
fn next_timestamp(session: &ChatSession, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(session.last_message_time + Duration::milliseconds(1))
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

fn new_message(
    session_id: &str,
    sender_type: SenderType,
    sender_email: Option<&str>,
    text: &str,
    timestamp: DateTime<Utc>,
) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        sender_type,
        sender_email: sender_email.map(str::to_string),
        message: text.to_string(),
        timestamp,
    }
}
