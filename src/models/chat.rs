// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Support chat sessions and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Who is answering the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ChatSessionStatus {
    #[default]
    ActiveAi,
    ActiveHuman,
    Closed,
}

impl ChatSessionStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, ChatSessionStatus::Closed)
    }
}

/// Session stored in the `chat_sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatSession {
    pub id: String,
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub status: ChatSessionStatus,
    /// Admin handling the session after escalation
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub last_message_time: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    User,
    Ai,
    Admin,
}

/// Message stored in the `chat_messages` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub sender_email: Option<String>,
    pub message: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
}
