// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod chat;
pub mod check_in;
pub mod entitlement;
pub mod feedback;
pub mod gym;
pub mod membership;
pub mod payment;
pub mod stats;
pub mod user;

pub use chat::{ChatMessage, ChatSession, ChatSessionStatus, SenderType};
pub use check_in::{CheckIn, CheckInStatus};
pub use entitlement::{DenialReason, Eligibility, SingleVisitFee};
pub use feedback::GymFeedback;
pub use gym::{Gym, GymStatus};
pub use membership::{Membership, MembershipStatus, PlanType};
pub use payment::{
    Payment, PaymentMethod, PaymentStatus, SingleVisitPayment, VisitPaymentMethod,
    VisitPaymentStatus,
};
pub use stats::GymStats;
pub use user::{Role, User};
