// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Membership purchases.

use crate::db::Db;
use crate::error::AppError;
use crate::models::entitlement::evaluate;
use crate::models::membership::plan;
use crate::models::payment::transaction_id;
use crate::models::{
    Eligibility, Membership, MembershipStatus, Payment, PaymentMethod, PaymentStatus, PlanType,
    User,
};
use crate::time_utils::format_date;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[derive(Clone)]
pub struct MembershipService {
    db: Db,
    validity_days: i64,
}

impl MembershipService {
    pub fn new(db: Db, validity_days: i64) -> Self {
        Self { db, validity_days }
    }

    pub fn validity_days(&self) -> i64 {
        self.validity_days
    }

    /// Buy a plan: an active membership valid from today plus a completed
    /// payment record. Payment processing itself is simulated.
    pub async fn purchase(
        &self,
        user: &User,
        plan_type: PlanType,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<(Membership, Payment), AppError> {
        let plan = plan(plan_type);
        let today = now.date_naive();
        let expiry = today + Duration::days(self.validity_days);

        let membership = Membership {
            id: Uuid::new_v4().to_string(),
            user_email: user.email.clone(),
            plan_type,
            status: MembershipStatus::Active,
            total_visits: plan.visits,
            remaining_visits: plan.visits,
            price: plan.price,
            purchase_date: format_date(today),
            expiry_date: format_date(expiry),
            created_at: now,
        };
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            user_email: user.email.clone(),
            membership_id: Some(membership.id.clone()),
            amount: plan.price,
            payment_method,
            status: PaymentStatus::Completed,
            transaction_id: transaction_id(now),
            payment_date: now,
        };

        self.db.record_purchase(&membership, &payment).await?;

        tracing::info!(
            user_id = %user.id,
            membership_id = %membership.id,
            plan = plan_type.as_str(),
            expiry_date = %membership.expiry_date,
            "Membership purchased"
        );

        Ok((membership, payment))
    }

    /// The caller's latest active membership and how a visit would be handled now.
    pub async fn current(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(Option<Membership>, Eligibility), AppError> {
        let membership = self.db.latest_active_membership(&user.email).await?;
        let eligibility = evaluate(membership.as_ref(), now);
        Ok((membership, eligibility))
    }
}
