// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend.
//!
//! Documents are stored one per ID in the collections named in
//! [`collections`]. Equality lookups use single-field filters; ordering is
//! done by the caller so no composite indexes are needed.

use super::collections;
use super::{Document, PaidVisit, VisitCommit};
use crate::error::AppError;
use crate::models::entitlement::{evaluate, Eligibility};
use crate::models::{CheckIn, DenialReason, Membership, MembershipStatus, SingleVisitPayment};
use chrono::{DateTime, Utc};
use firestore::errors::BackoffError;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Emulator client with a dummy unsigned token.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0cmluaSJ9."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── Document Access ─────────────────────────────────────────

    pub async fn get<T: Document>(
        &self,
        collection: &'static str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn put<T: Document>(
        &self,
        collection: &'static str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite only `fields` of an existing document.
    pub async fn patch<T: Document>(
        &self,
        collection: &'static str,
        id: &str,
        fields: &[&str],
        doc: &T,
    ) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(fields)
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn find<T: Document>(
        &self,
        collection: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        let value = value.to_string();
        self.client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list<T: Document>(&self, collection: &'static str) -> Result<Vec<T>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Check-In Commits ─────────────────────────────────

    /// Decrement the membership and store the check-in in one transaction.
    ///
    /// The membership is read through the transaction and re-evaluated before
    /// the writes are queued. A concurrent commit on the same membership
    /// aborts this one, and the retry sees the new counter, so a visit that
    /// stopped being covered is denied without writing anything.
    pub async fn commit_plan_visit(
        &self,
        membership_id: &str,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<VisitCommit, AppError> {
        let membership_id = membership_id.to_string();
        let check_in = check_in.clone();

        let outcome = self
            .client
            .run_transaction::<VisitCommit, _, FirestoreError>(|db, transaction| {
                let membership_id = membership_id.clone();
                let check_in = check_in.clone();
                Box::pin(async move {
                    let current: Option<Membership> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::MEMBERSHIPS)
                        .obj()
                        .one(&membership_id)
                        .await
                        .map_err(retryable)?;

                    let mut membership = match current {
                        Some(m) if m.status == MembershipStatus::Active => m,
                        _ => return Ok(VisitCommit::Denied(DenialReason::NoMembership)),
                    };
                    if let Eligibility::PayPerVisit { reason, .. } =
                        evaluate(Some(&membership), now)
                    {
                        return Ok(VisitCommit::Denied(reason));
                    }

                    membership.remaining_visits -= 1;

                    db.fluent()
                        .update()
                        .in_col(collections::MEMBERSHIPS)
                        .document_id(&membership_id)
                        .object(&membership)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::CHECK_INS)
                        .document_id(&check_in.id)
                        .object(&check_in)
                        .add_to_transaction(transaction)?;

                    Ok(VisitCommit::Committed(membership))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Plan visit transaction failed: {}", e)))?;

        if let VisitCommit::Committed(membership) = &outcome {
            tracing::info!(
                membership_id = %membership.id,
                check_in_id = %check_in.id,
                remaining_visits = membership.remaining_visits,
                "Plan visit committed"
            );
        }

        Ok(outcome)
    }

    /// Store a paid check-in and its payment in one transaction, or return
    /// the pair already stored under the same check-in ID.
    pub async fn commit_paid_visit(
        &self,
        check_in: &CheckIn,
        payment: &SingleVisitPayment,
    ) -> Result<PaidVisit, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let existing: Option<CheckIn> = self.get(collections::CHECK_INS, &check_in.id).await?;
        if let Some(existing) = existing {
            let _ = transaction.rollback().await;
            return self.replay_paid_visit(existing).await;
        }

        // Create-only: a concurrent confirmation on another instance fails
        // the commit and is answered as a replay below.
        self.client
            .fluent()
            .update()
            .in_col(collections::CHECK_INS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&check_in.id)
            .object(check_in)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add check-in to transaction: {}", e))
            })?;

        self.client
            .fluent()
            .update()
            .in_col(collections::SINGLE_VISIT_PAYMENTS)
            .document_id(&payment.id)
            .object(payment)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add payment to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            if let Some(existing) = self.get::<CheckIn>(collections::CHECK_INS, &check_in.id).await? {
                return self.replay_paid_visit(existing).await;
            }
            return Err(AppError::Database(format!("Transaction commit failed: {}", e)));
        }

        tracing::info!(
            check_in_id = %check_in.id,
            gym_id = %check_in.gym_id,
            amount = payment.amount_paid,
            "Paid visit committed"
        );

        Ok(PaidVisit {
            check_in: check_in.clone(),
            payment: payment.clone(),
            replayed: false,
        })
    }

    /// The check-in and payment stored by an earlier confirmation.
    async fn replay_paid_visit(&self, existing: CheckIn) -> Result<PaidVisit, AppError> {
        let payment = self
            .find::<SingleVisitPayment>(
                collections::SINGLE_VISIT_PAYMENTS,
                "check_in_id",
                &existing.id,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::Database(format!("Missing payment for check-in {}", existing.id))
            })?;
        tracing::debug!(check_in_id = %existing.id, "Paid visit replayed (idempotent)");
        Ok(PaidVisit {
            check_in: existing,
            payment,
            replayed: true,
        })
    }
}

/// Contention inside a transaction is retried; anything else aborts it.
fn retryable(err: FirestoreError) -> BackoffError<FirestoreError> {
    match err {
        FirestoreError::DatabaseError(ref db_err) if db_err.retry_possible => {
            BackoffError::transient(err)
        }
        other => BackoffError::permanent(other),
    }
}
