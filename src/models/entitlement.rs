// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit entitlement decision.
//!
//! A visit is covered by the member's plan only when an active membership
//! exists, its expiry date has not passed and it has visits left. Otherwise
//! the member may still enter by paying the fixed single-visit fee.

use crate::models::Membership;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Why a visit is not covered by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoMembership,
    Expired,
    NoVisitsLeft,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoMembership => "no_membership",
            DenialReason::Expired => "expired",
            DenialReason::NoVisitsLeft => "no_visits_left",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating a membership at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Eligibility {
    /// Plan visit: free for the member, one visit is consumed.
    PlanVisit { days_left: i64, remaining_visits: u32 },
    /// Not covered; the single-visit fee applies.
    PayPerVisit { reason: DenialReason, days_left: i64 },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::PlanVisit { .. })
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            Eligibility::PlanVisit { .. } => None,
            Eligibility::PayPerVisit { reason, .. } => Some(*reason),
        }
    }

    pub fn days_left(&self) -> i64 {
        match self {
            Eligibility::PlanVisit { days_left, .. } | Eligibility::PayPerVisit { days_left, .. } => {
                *days_left
            }
        }
    }
}

/// Evaluate whether `membership` covers a visit at `now`.
///
/// Only the membership's dates and counter are consulted; the caller is
/// responsible for having selected the latest *active* membership.
pub fn evaluate(membership: Option<&Membership>, now: DateTime<Utc>) -> Eligibility {
    let Some(membership) = membership else {
        return Eligibility::PayPerVisit {
            reason: DenialReason::NoMembership,
            days_left: -1,
        };
    };

    let days_left = membership.days_left(now);
    if days_left < 0 {
        return Eligibility::PayPerVisit {
            reason: DenialReason::Expired,
            days_left,
        };
    }
    if membership.remaining_visits == 0 {
        return Eligibility::PayPerVisit {
            reason: DenialReason::NoVisitsLeft,
            days_left,
        };
    }

    Eligibility::PlanVisit {
        days_left,
        remaining_visits: membership.remaining_visits,
    }
}

/// Fixed single-visit price split between the gym and the platform (DZD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SingleVisitFee {
    pub amount_paid: u32,
    pub gym_amount: u32,
    pub commission: u32,
}

impl SingleVisitFee {
    pub const GYM_AMOUNT: u32 = 200;
    pub const COMMISSION: u32 = 100;

    /// The standard fee: 200 to the gym plus 100 commission.
    pub const fn standard() -> Self {
        Self {
            amount_paid: Self::GYM_AMOUNT + Self::COMMISSION,
            gym_amount: Self::GYM_AMOUNT,
            commission: Self::COMMISSION,
        }
    }
}

impl Default for SingleVisitFee {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MembershipStatus, PlanType};
    use crate::time_utils::format_date;
    use chrono::Duration;

    fn membership(remaining: u32, expiry_date: String) -> Membership {
        Membership {
            id: "m1".to_string(),
            user_email: "member@example.dz".to_string(),
            plan_type: PlanType::Professional,
            status: MembershipStatus::Active,
            total_visits: 15,
            remaining_visits: remaining,
            price: 4900,
            purchase_date: "2026-01-01".to_string(),
            expiry_date,
            created_at: Utc::now(),
        }
    }

    fn in_days(now: DateTime<Utc>, days: i64) -> String {
        format_date((now + Duration::days(days)).date_naive())
    }

    #[test]
    fn test_valid_membership_is_plan_visit() {
        let now = Utc::now();
        let m = membership(5, in_days(now, 10));
        let decision = evaluate(Some(&m), now);
        assert!(decision.is_eligible());
        assert!(matches!(
            decision,
            Eligibility::PlanVisit {
                remaining_visits: 5,
                ..
            }
        ));
        assert!(decision.days_left() >= 9);
    }

    #[test]
    fn test_no_visits_left_pays() {
        let now = Utc::now();
        let m = membership(0, in_days(now, 10));
        assert_eq!(
            evaluate(Some(&m), now).reason(),
            Some(DenialReason::NoVisitsLeft)
        );
    }

    #[test]
    fn test_expired_pays_regardless_of_visits() {
        let now = Utc::now();
        for remaining in [0, 1, 15] {
            let m = membership(remaining, in_days(now, -1));
            assert_eq!(evaluate(Some(&m), now).reason(), Some(DenialReason::Expired));
        }
    }

    #[test]
    fn test_no_membership_pays() {
        let decision = evaluate(None, Utc::now());
        assert_eq!(decision.reason(), Some(DenialReason::NoMembership));
        assert_eq!(decision.days_left(), -1);
    }

    #[test]
    fn test_unparseable_expiry_is_expired() {
        let now = Utc::now();
        let m = membership(5, "31/12/2099".to_string());
        let decision = evaluate(Some(&m), now);
        assert_eq!(decision.reason(), Some(DenialReason::Expired));
        assert_eq!(decision.days_left(), -1);
    }

    #[test]
    fn test_expired_takes_precedence_over_no_visits() {
        let now = Utc::now();
        let m = membership(0, in_days(now, -3));
        assert_eq!(evaluate(Some(&m), now).reason(), Some(DenialReason::Expired));
    }

    #[test]
    fn test_fee_split_adds_up() {
        let fee = SingleVisitFee::standard();
        assert_eq!(fee.amount_paid, 300);
        assert_eq!(fee.gym_amount, 200);
        assert_eq!(fee.commission, 100);
        assert_eq!(fee.gym_amount + fee.commission, fee.amount_paid);
    }

    #[test]
    fn test_eligibility_wire_format() {
        let json = serde_json::to_value(Eligibility::PayPerVisit {
            reason: DenialReason::NoVisitsLeft,
            days_left: 4,
        })
        .unwrap();
        assert_eq!(json["decision"], "pay_per_visit");
        assert_eq!(json["reason"], "no_visits_left");
    }
}
