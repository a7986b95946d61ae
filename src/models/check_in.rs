// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gym check-in events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How the visit was authorized at check-in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    /// Covered by an active plan (one visit consumed)
    Active,
    Expired,
    Invalid,
    /// Covered by a single-visit payment
    PaidSingle,
}

/// Check-in stored in the `check_ins` collection. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckIn {
    pub id: String,
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    pub gym_id: String,
    #[serde(default)]
    pub gym_name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub check_in_time: DateTime<Utc>,
    pub membership_status: CheckInStatus,
    /// Membership the visit was taken from (plan visits only)
    #[serde(default)]
    pub membership_id: Option<String>,
    /// Client-supplied key used to collapse repeated confirmations
    #[serde(default)]
    pub idempotency_key: Option<String>,
}
