// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod assistant;
pub mod chat;
pub mod entitlement;
pub mod membership;
pub mod wilaya;

pub use assistant::SupportAssistant;
pub use chat::ChatService;
pub use entitlement::EntitlementService;
pub use membership::MembershipService;
pub use wilaya::{WilayaError, WilayaService};
