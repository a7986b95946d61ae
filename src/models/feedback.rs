// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member ratings of partner gyms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Feedback stored in the `gym_feedback` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GymFeedback {
    pub id: String,
    pub gym_id: String,
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    /// 1 to 5 stars
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

/// Mean rating rounded to one decimal; 0.0 when there is no feedback.
pub fn average_rating(feedback: &[GymFeedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }
    let sum: u32 = feedback.iter().map(|f| u32::from(f.rating)).sum();
    let mean = f64::from(sum) / feedback.len() as f64;
    (mean * 10.0).round() / 10.0
}
