// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Documents are kept as JSON values, one `DashMap` per collection. Used
//! when no GCP project is configured and by the integration tests.

use super::collections;
use super::{Document, PaidVisit, VisitCommit};
use crate::error::AppError;
use crate::models::entitlement::{evaluate, Eligibility};
use crate::models::{CheckIn, DenialReason, Membership, MembershipStatus, SingleVisitPayment};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;

pub struct MemoryStore {
    collections: HashMap<&'static str, DashMap<String, Value>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: collections::ALL
                .iter()
                .map(|name| (*name, DashMap::new()))
                .collect(),
        }
    }

    fn collection(&self, name: &str) -> Result<&DashMap<String, Value>, AppError> {
        self.collections
            .get(name)
            .ok_or_else(|| AppError::Database(format!("Unknown collection: {}", name)))
    }

    pub fn get<T: Document>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        match self.collection(collection)?.get(id) {
            Some(doc) => decode(doc.value()).map(Some),
            None => Ok(None),
        }
    }

    pub fn put<T: Document>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError> {
        let value = encode(doc)?;
        self.collection(collection)?.insert(id.to_string(), value);
        Ok(())
    }

    /// Overwrite only `fields` of an existing document, under its shard lock.
    pub fn patch<T: Document>(
        &self,
        collection: &str,
        id: &str,
        fields: &[&str],
        doc: &T,
    ) -> Result<(), AppError> {
        let patch = encode(doc)?;
        let mut stored = self
            .collection(collection)?
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("{}/{} not found", collection, id)))?;
        let Value::Object(target) = stored.value_mut() else {
            return Err(AppError::Database(format!("{}/{} is not an object", collection, id)));
        };
        for field in fields {
            if let Some(value) = patch.get(*field) {
                target.insert((*field).to_string(), value.clone());
            }
        }
        Ok(())
    }

    /// Documents whose top-level string `field` equals `value`.
    pub fn find<T: Document>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        self.collection(collection)?
            .iter()
            .filter(|doc| doc.value().get(field).and_then(Value::as_str) == Some(value))
            .map(|doc| decode(doc.value()))
            .collect()
    }

    pub fn list<T: Document>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        self.collection(collection)?
            .iter()
            .map(|doc| decode(doc.value()))
            .collect()
    }

    /// Holds the membership's shard lock for the whole read-check-write.
    pub fn commit_plan_visit(
        &self,
        membership_id: &str,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<VisitCommit, AppError> {
        let memberships = self.collection(collections::MEMBERSHIPS)?;
        let check_ins = self.collection(collections::CHECK_INS)?;

        let Some(mut entry) = memberships.get_mut(membership_id) else {
            return Ok(VisitCommit::Denied(DenialReason::NoMembership));
        };
        let mut membership: Membership = decode(entry.value())?;
        if membership.status != MembershipStatus::Active {
            return Ok(VisitCommit::Denied(DenialReason::NoMembership));
        }
        if let Eligibility::PayPerVisit { reason, .. } = evaluate(Some(&membership), now) {
            return Ok(VisitCommit::Denied(reason));
        }

        membership.remaining_visits -= 1;
        let membership_value = encode(&membership)?;
        let check_in_value = encode(check_in)?;

        check_ins.insert(check_in.id.clone(), check_in_value);
        *entry.value_mut() = membership_value;

        Ok(VisitCommit::Committed(membership))
    }

    /// The check-in ID entry lock makes concurrent replays of one key
    /// resolve to a single stored pair.
    pub fn commit_paid_visit(
        &self,
        check_in: &CheckIn,
        payment: &SingleVisitPayment,
    ) -> Result<PaidVisit, AppError> {
        let check_ins = self.collection(collections::CHECK_INS)?;
        let payments = self.collection(collections::SINGLE_VISIT_PAYMENTS)?;

        match check_ins.entry(check_in.id.clone()) {
            Entry::Occupied(existing) => {
                let check_in: CheckIn = decode(existing.get())?;
                let payment = payments
                    .iter()
                    .find(|doc| {
                        doc.value().get("check_in_id").and_then(Value::as_str)
                            == Some(check_in.id.as_str())
                    })
                    .map(|doc| decode::<SingleVisitPayment>(doc.value()))
                    .transpose()?
                    .ok_or_else(|| {
                        AppError::Database(format!("Missing payment for check-in {}", check_in.id))
                    })?;
                Ok(PaidVisit {
                    check_in,
                    payment,
                    replayed: true,
                })
            }
            Entry::Vacant(slot) => {
                let check_in_value = encode(check_in)?;
                let payment_value = encode(payment)?;
                payments.insert(payment.id.clone(), payment_value);
                slot.insert(check_in_value);
                Ok(PaidVisit {
                    check_in: check_in.clone(),
                    payment: payment.clone(),
                    replayed: false,
                })
            }
        }
    }
}

fn encode<T: Document>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(e.to_string()))
}

fn decode<T: Document>(value: &Value) -> Result<T, AppError> {
    serde_json::from_value(value.clone()).map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckInStatus, PlanType, VisitPaymentMethod, VisitPaymentStatus};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn membership(remaining: u32) -> Membership {
        Membership {
            id: "m1".to_string(),
            user_email: "amine@example.dz".to_string(),
            plan_type: PlanType::Classic,
            status: MembershipStatus::Active,
            total_visits: 15,
            remaining_visits: remaining,
            price: 3000,
            purchase_date: "2026-05-01".to_string(),
            expiry_date: "2026-05-31".to_string(),
            created_at: now(),
        }
    }

    fn check_in(id: &str, status: CheckInStatus) -> CheckIn {
        CheckIn {
            id: id.to_string(),
            user_email: "amine@example.dz".to_string(),
            user_name: "Amine".to_string(),
            gym_id: "g1".to_string(),
            gym_name: "Atlas Fit".to_string(),
            check_in_time: now(),
            membership_status: status,
            membership_id: Some("m1".to_string()),
            idempotency_key: None,
        }
    }

    #[test]
    fn test_find_matches_string_field() {
        let store = MemoryStore::new();
        store.put(collections::MEMBERSHIPS, "m1", &membership(3)).unwrap();
        let found: Vec<Membership> = store
            .find(collections::MEMBERSHIPS, "user_email", "amine@example.dz")
            .unwrap();
        assert_eq!(found.len(), 1);
        let none: Vec<Membership> = store
            .find(collections::MEMBERSHIPS, "user_email", "other@example.dz")
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_plan_visit_decrements_until_exhausted() {
        let store = MemoryStore::new();
        store.put(collections::MEMBERSHIPS, "m1", &membership(1)).unwrap();

        let first = store
            .commit_plan_visit("m1", &check_in("c1", CheckInStatus::Active), now())
            .unwrap();
        assert!(matches!(first, VisitCommit::Committed(ref m) if m.remaining_visits == 0));

        let second = store
            .commit_plan_visit("m1", &check_in("c2", CheckInStatus::Active), now())
            .unwrap();
        assert!(matches!(second, VisitCommit::Denied(DenialReason::NoVisitsLeft)));

        let stored: Option<CheckIn> = store.get(collections::CHECK_INS, "c2").unwrap();
        assert!(stored.is_none());
    }

    #[test]
    fn test_paid_visit_replay_returns_original() {
        let store = MemoryStore::new();
        let check_in = check_in("c1", CheckInStatus::PaidSingle);
        let payment = SingleVisitPayment {
            id: "p1".to_string(),
            user_email: check_in.user_email.clone(),
            gym_id: "g1".to_string(),
            gym_name: "Atlas Fit".to_string(),
            check_in_id: "c1".to_string(),
            amount_paid: 300,
            gym_amount: 200,
            commission: 100,
            payment_status: VisitPaymentStatus::Completed,
            payment_method: VisitPaymentMethod::Cash,
            payment_date: now(),
        };

        let first = store.commit_paid_visit(&check_in, &payment).unwrap();
        assert!(!first.replayed);

        let retry = SingleVisitPayment {
            id: "p2".to_string(),
            ..payment
        };
        let second = store.commit_paid_visit(&check_in, &retry).unwrap();
        assert!(second.replayed);
        assert_eq!(second.payment.id, "p1");

        let all: Vec<SingleVisitPayment> = store.list(collections::SINGLE_VISIT_PAYMENTS).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_patch_overwrites_only_named_fields() {
        let store = MemoryStore::new();
        store
            .put(collections::MEMBERSHIPS, "m1", &membership(5))
            .unwrap();

        let mut changed = membership(0);
        changed.price = 1;
        store
            .patch(collections::MEMBERSHIPS, "m1", &["remaining_visits"], &changed)
            .unwrap();

        let stored: Membership = store.get(collections::MEMBERSHIPS, "m1").unwrap().unwrap();
        assert_eq!(stored.remaining_visits, 0);
        assert_eq!(stored.price, 3000);

        assert!(matches!(
            store.patch(collections::MEMBERSHIPS, "missing", &["price"], &changed),
            Err(AppError::NotFound(_))
        ));
    }
}
