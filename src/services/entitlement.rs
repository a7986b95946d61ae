// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit entitlement resolution at the front desk.
//!
//! Staff scan a member's QR code, see whether the visit is covered by the
//! member's plan, and then either record a plan visit (consuming one visit)
//! or a paid single visit. Plan visits are serialized per membership and
//! committed atomically, so concurrent scans can never consume more visits
//! than the membership has left.

use crate::db::{Db, PaidVisit, VisitCommit};
use crate::error::AppError;
use crate::models::entitlement::evaluate;
use crate::models::{
    CheckIn, CheckInStatus, Eligibility, Gym, Membership, SingleVisitFee, SingleVisitPayment,
    User, VisitPaymentMethod, VisitPaymentStatus,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Prefix of the payload encoded in member QR codes.
pub const QR_PREFIX: &str = "TRINI213";

/// Per-membership locks serializing plan visits within this process.
pub type VisitLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Build the QR payload for a member: `TRINI213:<user id>:<email>`.
pub fn member_qr_payload(user: &User) -> String {
    format!("{}:{}:{}", QR_PREFIX, user.id, user.email)
}

/// Extract the user ID from a scanned QR payload.
///
/// Payloads look like `PREFIX:userId:email`; only the middle segment is
/// used. A payload without any colon is taken as a bare user ID.
pub fn parse_member_qr(payload: &str) -> Result<&str, AppError> {
    let payload = payload.trim();
    let user_id = match payload.split_once(':') {
        Some((_, rest)) => rest.split(':').next().unwrap_or(""),
        None => payload,
    };
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::BadRequest(
            "QR code does not contain a member ID".to_string(),
        ));
    }
    Ok(user_id)
}

/// What the scanner shows for a member before anything is committed.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub member: User,
    pub membership: Option<Membership>,
    pub eligibility: Eligibility,
}

/// A committed plan visit.
#[derive(Debug, Clone)]
pub struct PlanVisit {
    pub member: User,
    pub check_in: CheckIn,
    /// Membership after the decrement
    pub membership: Membership,
}

#[derive(Clone)]
pub struct EntitlementService {
    db: Db,
    visit_locks: VisitLocks,
}

impl EntitlementService {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            visit_locks: Arc::new(DashMap::new()),
        }
    }

    /// Resolve the gym the caller is operating.
    ///
    /// An explicit `gym_id` must belong to the caller unless they are an
    /// admin; otherwise the caller's first registered gym is used. The gym
    /// must be active.
    pub async fn operating_gym(&self, caller: &User, gym_id: Option<&str>) -> Result<Gym, AppError> {
        let gym = match gym_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(gym_id) => {
                let gym = self
                    .db
                    .get_gym(gym_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Gym {} not found", gym_id)))?;
                if gym.owner_email != caller.email && !caller.is_admin() {
                    return Err(AppError::Forbidden(
                        "You do not operate this gym".to_string(),
                    ));
                }
                gym
            }
            None => self
                .db
                .gyms_for_owner(&caller.email)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    AppError::Forbidden("No gym is registered to this account".to_string())
                })?,
        };

        if !gym.is_active() {
            return Err(AppError::Forbidden(format!(
                "Gym {} is not active",
                gym.id
            )));
        }
        Ok(gym)
    }

    /// Look up the member encoded in a QR payload.
    pub async fn resolve_member(&self, qr_payload: &str) -> Result<User, AppError> {
        let user_id = parse_member_qr(qr_payload)?;
        self.db
            .get_user(user_id)
            .await?
            .ok_or(AppError::MemberNotFound)
    }

    /// Evaluate a member's entitlement without committing anything.
    pub async fn scan(&self, qr_payload: &str, now: DateTime<Utc>) -> Result<ScanOutcome, AppError> {
        let member = self.resolve_member(qr_payload).await?;
        let membership = self.db.latest_active_membership(&member.email).await?;
        let eligibility = evaluate(membership.as_ref(), now);

        tracing::debug!(
            user_id = %member.id,
            eligible = eligibility.is_eligible(),
            reason = ?eligibility.reason(),
            days_left = eligibility.days_left(),
            "Member scanned"
        );

        Ok(ScanOutcome {
            member,
            membership,
            eligibility,
        })
    }

    /// Record a plan visit: one check-in plus one visit consumed.
    ///
    /// Fails with [`AppError::PaymentRequired`] when the visit is not (or no
    /// longer) covered by the member's plan.
    pub async fn check_in_with_plan(
        &self,
        gym: &Gym,
        qr_payload: &str,
        now: DateTime<Utc>,
    ) -> Result<PlanVisit, AppError> {
        let ScanOutcome {
            member,
            membership,
            eligibility,
        } = self.scan(qr_payload, now).await?;

        let membership = match (membership, eligibility) {
            (Some(membership), Eligibility::PlanVisit { .. }) => membership,
            (_, other) => {
                let reason = other
                    .reason()
                    .ok_or_else(|| anyhow::anyhow!("Ineligible visit without a reason"))?;
                return Err(AppError::PaymentRequired(reason));
            }
        };

        let lock = self
            .visit_locks
            .entry(membership.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let check_in = CheckIn {
            id: Uuid::new_v4().to_string(),
            user_email: member.email.clone(),
            user_name: member.full_name(),
            gym_id: gym.id.clone(),
            gym_name: gym.name.clone(),
            check_in_time: now,
            membership_status: CheckInStatus::Active,
            membership_id: Some(membership.id.clone()),
            idempotency_key: None,
        };

        match self
            .db
            .commit_plan_visit(&membership.id, &check_in, now)
            .await?
        {
            VisitCommit::Committed(membership) => {
                tracing::info!(
                    user_id = %member.id,
                    gym_id = %gym.id,
                    membership_id = %membership.id,
                    remaining_visits = membership.remaining_visits,
                    "Plan check-in recorded"
                );
                Ok(PlanVisit {
                    member,
                    check_in,
                    membership,
                })
            }
            VisitCommit::Denied(reason) => {
                tracing::info!(
                    user_id = %member.id,
                    membership_id = %membership.id,
                    %reason,
                    "Plan check-in lost eligibility before commit"
                );
                Err(AppError::PaymentRequired(reason))
            }
        }
    }

    /// Record a paid single visit: one check-in plus one payment.
    ///
    /// Refused with [`AppError::Conflict`] when the member's plan covers the
    /// visit. With an idempotency key, repeated confirmations at the same gym
    /// return the first check-in and payment.
    pub async fn check_in_with_payment(
        &self,
        gym: &Gym,
        qr_payload: &str,
        payment_method: VisitPaymentMethod,
        idempotency_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PaidVisit, AppError> {
        let idempotency_key = idempotency_key.map(str::trim).filter(|k| !k.is_empty());
        let check_in_id = match idempotency_key {
            Some(key) => paid_check_in_id(&gym.id, key),
            None => Uuid::new_v4().to_string(),
        };

        let ScanOutcome {
            member,
            eligibility,
            ..
        } = self.scan(qr_payload, now).await?;

        let replay = match idempotency_key {
            Some(_) => self.db.get_check_in(&check_in_id).await?,
            None => None,
        };
        if let Some(existing) = &replay {
            if existing.user_email != member.email {
                return Err(AppError::Conflict(
                    "Idempotency key was already used for another member".to_string(),
                ));
            }
        } else if eligibility.is_eligible() {
            return Err(AppError::Conflict(
                "Member has a usable membership; record a plan visit instead".to_string(),
            ));
        }

        let fee = SingleVisitFee::standard();
        let check_in = CheckIn {
            id: check_in_id,
            user_email: member.email.clone(),
            user_name: member.full_name(),
            gym_id: gym.id.clone(),
            gym_name: gym.name.clone(),
            check_in_time: now,
            membership_status: CheckInStatus::PaidSingle,
            membership_id: None,
            idempotency_key: idempotency_key.map(str::to_string),
        };
        let payment = SingleVisitPayment {
            id: Uuid::new_v4().to_string(),
            user_email: member.email.clone(),
            gym_id: gym.id.clone(),
            gym_name: gym.name.clone(),
            check_in_id: check_in.id.clone(),
            amount_paid: fee.amount_paid,
            gym_amount: fee.gym_amount,
            commission: fee.commission,
            payment_status: VisitPaymentStatus::Completed,
            payment_method,
            payment_date: now,
        };

        let paid = self.db.commit_paid_visit(&check_in, &payment).await?;
        if paid.replayed && paid.check_in.user_email != member.email {
            return Err(AppError::Conflict(
                "Idempotency key was already used for another member".to_string(),
            ));
        }

        tracing::info!(
            user_id = %member.id,
            gym_id = %gym.id,
            check_in_id = %paid.check_in.id,
            method = ?payment_method,
            replayed = paid.replayed,
            "Paid single visit recorded"
        );

        Ok(paid)
    }
}

/// Deterministic check-in ID for a paid visit confirmed with `key` at `gym_id`.
fn paid_check_in_id(gym_id: &str, key: &str) -> String {
    let name = format!("paid-visit:{}:{}", gym_id, key);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
