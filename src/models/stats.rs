//! Gym owner dashboard aggregates.
//!
//! Computed on read from the gym's recent check-ins and single-visit
//! payments; day and month windows follow the business timezone.

use crate::models::{CheckIn, CheckInStatus, SingleVisitPayment};
use crate::time_utils::{start_of_day, start_of_month};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Dashboard counters for one gym.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GymStats {
    /// Check-ins since local midnight
    pub today_check_ins: u32,
    /// Check-ins since the first of the local month
    pub monthly_check_ins: u32,
    /// Of this month's check-ins, how many used a plan visit
    pub monthly_plan_visits: u32,
    /// Of this month's check-ins, how many were paid single visits
    pub monthly_paid_visits: u32,
    /// Distinct members seen this month
    pub monthly_unique_members: u32,
    /// Gym share of this month's single-visit payments (DZD)
    pub monthly_gym_revenue: u32,
    /// Platform commission on this month's single-visit payments (DZD)
    pub monthly_commission: u32,
}

impl GymStats {
    pub fn compute(
        check_ins: &[CheckIn],
        payments: &[SingleVisitPayment],
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        let day_start = start_of_day(now, offset);
        let month_start = start_of_month(now, offset);

        let mut stats = GymStats::default();
        let mut members = std::collections::HashSet::new();

        for check_in in check_ins {
            if check_in.check_in_time > now {
                continue;
            }
            if check_in.check_in_time >= day_start {
                stats.today_check_ins += 1;
            }
            if check_in.check_in_time >= month_start {
                stats.monthly_check_ins += 1;
                members.insert(check_in.user_email.as_str());
                match check_in.membership_status {
                    CheckInStatus::Active => stats.monthly_plan_visits += 1,
                    CheckInStatus::PaidSingle => stats.monthly_paid_visits += 1,
                    CheckInStatus::Expired | CheckInStatus::Invalid => {}
                }
            }
        }
        stats.monthly_unique_members = members.len() as u32;

        for payment in payments {
            if payment.payment_date >= month_start && payment.payment_date <= now {
                stats.monthly_gym_revenue += payment.gym_amount;
                stats.monthly_commission += payment.commission;
            }
        }

        stats
    }
}
