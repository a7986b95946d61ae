// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Db`] exposes typed operations over one of two backends: Firestore in
//! production, or an in-process document store for local development and
//! tests. Both backends implement the check-in commits atomically.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::membership::latest_active;
use crate::models::{
    ChatMessage, ChatSession, ChatSessionStatus, CheckIn, DenialReason, Gym, GymFeedback,
    Membership, Payment, Role, SingleVisitPayment, User,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const GYMS: &str = "gyms";
    pub const MEMBERSHIPS: &str = "memberships";
    pub const PAYMENTS: &str = "payments";
    pub const SINGLE_VISIT_PAYMENTS: &str = "single_visit_payments";
    pub const CHECK_INS: &str = "check_ins";
    pub const GYM_FEEDBACK: &str = "gym_feedback";
    pub const CHAT_SESSIONS: &str = "chat_sessions";
    pub const CHAT_MESSAGES: &str = "chat_messages";

    pub const ALL: [&str; 9] = [
        USERS,
        GYMS,
        MEMBERSHIPS,
        PAYMENTS,
        SINGLE_VISIT_PAYMENTS,
        CHECK_INS,
        GYM_FEEDBACK,
        CHAT_SESSIONS,
        CHAT_MESSAGES,
    ];
}

/// A storable document.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Result of trying to take one visit from a membership.
#[derive(Debug, Clone)]
pub enum VisitCommit {
    /// Check-in stored and the membership decremented (updated copy).
    Committed(Membership),
    /// Eligibility no longer held at commit time; nothing was written.
    Denied(DenialReason),
}

/// Result of recording a paid single visit.
#[derive(Debug, Clone)]
pub struct PaidVisit {
    pub check_in: CheckIn,
    pub payment: SingleVisitPayment,
    /// True when an earlier confirmation with the same key was returned.
    pub replayed: bool,
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

/// Database handle shared by all services.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

impl Db {
    /// Connect to Firestore for `project_id`.
    pub async fn firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreStore::new(project_id).await?),
        })
    }

    /// Create an empty in-process store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    // ─── Generic Document Access ─────────────────────────────────

    async fn get<T: Document>(&self, collection: &'static str, id: &str) -> Result<Option<T>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.get(collection, id).await,
            Backend::Memory(store) => store.get(collection, id),
        }
    }

    async fn put<T: Document>(&self, collection: &'static str, id: &str, doc: &T) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.put(collection, id, doc).await,
            Backend::Memory(store) => store.put(collection, id, doc),
        }
    }

    async fn patch<T: Document>(
        &self,
        collection: &'static str,
        id: &str,
        fields: &[&str],
        doc: &T,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.patch(collection, id, fields, doc).await,
            Backend::Memory(store) => store.patch(collection, id, fields, doc),
        }
    }

    async fn find<T: Document>(
        &self,
        collection: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.find(collection, field, value).await,
            Backend::Memory(store) => store.find(collection, field, value),
        }
    }

    async fn list<T: Document>(&self, collection: &'static str) -> Result<Vec<T>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.list(collection).await,
            Backend::Memory(store) => store.list(collection),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, user_id).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .find::<User>(collections::USERS, "username", username)
            .await?
            .into_iter()
            .next())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .find::<User>(collections::USERS, "email", email)
            .await?
            .into_iter()
            .next())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.put(collections::USERS, &user.id, user).await
    }

    /// Change a user's role without touching the rest of the profile.
    pub async fn set_user_role(&self, user_id: &str, role: Role) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct RolePatch {
            role: Role,
        }
        self.patch(collections::USERS, user_id, &["role"], &RolePatch { role })
            .await
    }

    // ─── Gym Operations ──────────────────────────────────────────

    pub async fn get_gym(&self, gym_id: &str) -> Result<Option<Gym>, AppError> {
        self.get(collections::GYMS, gym_id).await
    }

    /// All gyms in any status.
    pub async fn list_gyms(&self) -> Result<Vec<Gym>, AppError> {
        self.list(collections::GYMS).await
    }

    /// Gyms owned by `owner_email`, oldest first (the first is the default
    /// operating gym).
    pub async fn gyms_for_owner(&self, owner_email: &str) -> Result<Vec<Gym>, AppError> {
        let mut gyms: Vec<Gym> = self
            .find(collections::GYMS, "owner_email", owner_email)
            .await?;
        gyms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(gyms)
    }

    pub async fn upsert_gym(&self, gym: &Gym) -> Result<(), AppError> {
        self.put(collections::GYMS, &gym.id, gym).await
    }

    // ─── Membership Operations ───────────────────────────────────

    pub async fn get_membership(&self, membership_id: &str) -> Result<Option<Membership>, AppError> {
        self.get(collections::MEMBERSHIPS, membership_id).await
    }

    /// A user's memberships, newest first.
    pub async fn memberships_for_user(&self, user_email: &str) -> Result<Vec<Membership>, AppError> {
        let mut memberships: Vec<Membership> = self
            .find(collections::MEMBERSHIPS, "user_email", user_email)
            .await?;
        memberships.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(memberships)
    }

    /// The most recent membership with status `active`, if any.
    pub async fn latest_active_membership(
        &self,
        user_email: &str,
    ) -> Result<Option<Membership>, AppError> {
        let memberships = self
            .find(collections::MEMBERSHIPS, "user_email", user_email)
            .await?;
        Ok(latest_active(memberships))
    }

    /// Store a purchased membership and its payment record.
    pub async fn record_purchase(
        &self,
        membership: &Membership,
        payment: &Payment,
    ) -> Result<(), AppError> {
        self.put(collections::MEMBERSHIPS, &membership.id, membership)
            .await?;
        self.put(collections::PAYMENTS, &payment.id, payment).await
    }

    /// Overwrite a membership document.
    pub async fn upsert_membership(&self, membership: &Membership) -> Result<(), AppError> {
        self.put(collections::MEMBERSHIPS, &membership.id, membership)
            .await
    }

    /// A user's membership payments, newest first.
    pub async fn payments_for_user(&self, user_email: &str) -> Result<Vec<Payment>, AppError> {
        let mut payments: Vec<Payment> = self
            .find(collections::PAYMENTS, "user_email", user_email)
            .await?;
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    // ─── Check-In Operations ─────────────────────────────────────

    /// Atomically re-check eligibility, decrement the membership and store
    /// the check-in.
    pub async fn commit_plan_visit(
        &self,
        membership_id: &str,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<VisitCommit, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.commit_plan_visit(membership_id, check_in, now).await,
            Backend::Memory(store) => store.commit_plan_visit(membership_id, check_in, now),
        }
    }

    /// Atomically store a paid check-in and its payment. A check-in ID that
    /// already exists returns the stored pair instead.
    pub async fn commit_paid_visit(
        &self,
        check_in: &CheckIn,
        payment: &SingleVisitPayment,
    ) -> Result<PaidVisit, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.commit_paid_visit(check_in, payment).await,
            Backend::Memory(store) => store.commit_paid_visit(check_in, payment),
        }
    }

    pub async fn get_check_in(&self, check_in_id: &str) -> Result<Option<CheckIn>, AppError> {
        self.get(collections::CHECK_INS, check_in_id).await
    }

    /// A gym's check-ins, newest first.
    pub async fn check_ins_for_gym(&self, gym_id: &str) -> Result<Vec<CheckIn>, AppError> {
        let mut check_ins: Vec<CheckIn> = self.find(collections::CHECK_INS, "gym_id", gym_id).await?;
        sort_check_ins(&mut check_ins);
        Ok(check_ins)
    }

    /// A member's check-ins, newest first.
    pub async fn check_ins_for_user(&self, user_email: &str) -> Result<Vec<CheckIn>, AppError> {
        let mut check_ins: Vec<CheckIn> = self
            .find(collections::CHECK_INS, "user_email", user_email)
            .await?;
        sort_check_ins(&mut check_ins);
        Ok(check_ins)
    }

    pub async fn single_visit_payments_for_gym(
        &self,
        gym_id: &str,
    ) -> Result<Vec<SingleVisitPayment>, AppError> {
        let mut payments: Vec<SingleVisitPayment> = self
            .find(collections::SINGLE_VISIT_PAYMENTS, "gym_id", gym_id)
            .await?;
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    pub async fn single_visit_payments_for_user(
        &self,
        user_email: &str,
    ) -> Result<Vec<SingleVisitPayment>, AppError> {
        let mut payments: Vec<SingleVisitPayment> = self
            .find(collections::SINGLE_VISIT_PAYMENTS, "user_email", user_email)
            .await?;
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    // ─── Feedback Operations ─────────────────────────────────────

    pub async fn add_feedback(&self, feedback: &GymFeedback) -> Result<(), AppError> {
        self.put(collections::GYM_FEEDBACK, &feedback.id, feedback)
            .await
    }

    /// Feedback for a gym, newest first.
    pub async fn feedback_for_gym(&self, gym_id: &str) -> Result<Vec<GymFeedback>, AppError> {
        let mut feedback: Vec<GymFeedback> = self
            .find(collections::GYM_FEEDBACK, "gym_id", gym_id)
            .await?;
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(feedback)
    }

    // ─── Chat Operations ─────────────────────────────────────────

    pub async fn get_chat_session(&self, session_id: &str) -> Result<Option<ChatSession>, AppError> {
        self.get(collections::CHAT_SESSIONS, session_id).await
    }

    pub async fn upsert_chat_session(&self, session: &ChatSession) -> Result<(), AppError> {
        self.put(collections::CHAT_SESSIONS, &session.id, session)
            .await
    }

    /// A user's sessions, most recently active first.
    pub async fn chat_sessions_for_user(&self, user_email: &str) -> Result<Vec<ChatSession>, AppError> {
        let mut sessions: Vec<ChatSession> = self
            .find(collections::CHAT_SESSIONS, "user_email", user_email)
            .await?;
        sessions.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        Ok(sessions)
    }

    /// Sessions in `status`, oldest activity first (longest waiting on top).
    pub async fn chat_sessions_with_status(
        &self,
        status: ChatSessionStatus,
    ) -> Result<Vec<ChatSession>, AppError> {
        let value = match status {
            ChatSessionStatus::ActiveAi => "active_ai",
            ChatSessionStatus::ActiveHuman => "active_human",
            ChatSessionStatus::Closed => "closed",
        };
        let mut sessions: Vec<ChatSession> =
            self.find(collections::CHAT_SESSIONS, "status", value).await?;
        sessions.sort_by(|a, b| a.last_message_time.cmp(&b.last_message_time));
        Ok(sessions)
    }

    pub async fn add_chat_message(&self, message: &ChatMessage) -> Result<(), AppError> {
        self.put(collections::CHAT_MESSAGES, &message.id, message)
            .await
    }

    /// Messages of a session in timestamp order.
    pub async fn chat_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        let mut messages: Vec<ChatMessage> = self
            .find(collections::CHAT_MESSAGES, "session_id", session_id)
            .await?;
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }
}

fn sort_check_ins(check_ins: &mut [CheckIn]) {
    check_ins.sort_by(|a, b| {
        b.check_in_time
            .cmp(&a.check_in_time)
            .then_with(|| b.id.cmp(&a.id))
    });
}
