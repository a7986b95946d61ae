// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Membership plans and purchased memberships.

use crate::time_utils::parse_date;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Classic,
    Professional,
    Royal,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Classic => "classic",
            PlanType::Professional => "professional",
            PlanType::Royal => "royal",
        }
    }
}

/// A purchasable plan from the catalogue.
#[derive(Debug, Clone, Copy, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Plan {
    pub plan_type: PlanType,
    pub name: &'static str,
    /// Price in DZD
    pub price: u32,
    pub visits: u32,
    pub popular: bool,
}

/// The plan catalogue, cheapest first.
pub const PLANS: [Plan; 3] = [
    Plan {
        plan_type: PlanType::Classic,
        name: "Classic",
        price: 3000,
        visits: 15,
        popular: false,
    },
    Plan {
        plan_type: PlanType::Professional,
        name: "Professional",
        price: 4900,
        visits: 15,
        popular: true,
    },
    Plan {
        plan_type: PlanType::Royal,
        name: "Royal",
        price: 7500,
        visits: 15,
        popular: false,
    },
];

/// Look up a plan in the catalogue.
pub fn plan(plan_type: PlanType) -> &'static Plan {
    PLANS
        .iter()
        .find(|p| p.plan_type == plan_type)
        .unwrap_or(&PLANS[0])
}

/// Membership lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    Active,
    Expired,
    Cancelled,
}

/// Purchased membership stored in the `memberships` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Membership {
    pub id: String,
    pub user_email: String,
    pub plan_type: PlanType,
    #[serde(default)]
    pub status: MembershipStatus,
    pub total_visits: u32,
    /// Decremented once per plan visit; never exceeds `total_visits`
    pub remaining_visits: u32,
    /// Price paid in DZD
    pub price: u32,
    /// Purchase date (YYYY-MM-DD)
    pub purchase_date: String,
    /// Expiry date (YYYY-MM-DD). Kept as text: a malformed value means expired.
    pub expiry_date: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Whole days until expiry, truncated toward zero.
    ///
    /// The expiry date is taken at 00:00 UTC, so a membership expiring today
    /// yields 0 for the rest of the day. Missing or unparseable dates yield -1.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        parse_date(&self.expiry_date)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| (midnight.and_utc() - now).num_days())
            .unwrap_or(-1)
    }
}

/// Most recent active membership (by creation time, then purchase date).
pub fn latest_active(memberships: Vec<Membership>) -> Option<Membership> {
    memberships
        .into_iter()
        .filter(|m| m.status == MembershipStatus::Active)
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.purchase_date.cmp(&b.purchase_date))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn membership(expiry_date: &str, created_at: DateTime<Utc>) -> Membership {
        Membership {
            id: "m1".to_string(),
            user_email: "member@example.dz".to_string(),
            plan_type: PlanType::Classic,
            status: MembershipStatus::Active,
            total_visits: 15,
            remaining_visits: 15,
            price: 3000,
            purchase_date: "2026-03-01".to_string(),
            expiry_date: expiry_date.to_string(),
            created_at,
        }
    }

    #[test]
    fn test_days_left_truncates_toward_zero() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap();
        assert_eq!(membership("2026-03-20", now).days_left(now), 9);
        // Expiring today at 00:00 UTC is still day 0.
        assert_eq!(membership("2026-03-10", now).days_left(now), 0);
        assert_eq!(membership("2026-03-09", now).days_left(now), -1);
    }

    #[test]
    fn test_days_left_unparseable_is_expired() {
        let now = Utc::now();
        assert_eq!(membership("", now).days_left(now), -1);
        assert_eq!(membership("soon", now).days_left(now), -1);
    }

    #[test]
    fn test_latest_active_ignores_other_statuses() {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let older = membership("2026-04-01", base);
        let mut newer = membership("2026-04-15", base + Duration::days(5));
        newer.id = "m2".to_string();
        let mut cancelled = membership("2026-05-01", base + Duration::days(10));
        cancelled.id = "m3".to_string();
        cancelled.status = MembershipStatus::Cancelled;

        let latest = latest_active(vec![older, cancelled, newer]).unwrap();
        assert_eq!(latest.id, "m2");
    }

    #[test]
    fn test_catalogue() {
        assert_eq!(plan(PlanType::Classic).price, 3000);
        assert_eq!(plan(PlanType::Professional).price, 4900);
        assert_eq!(plan(PlanType::Royal).price, 7500);
        assert!(PLANS.iter().all(|p| p.visits == 15));
    }
}
