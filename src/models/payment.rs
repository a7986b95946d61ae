// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Membership purchases and single-visit payments.

use crate::models::SingleVisitFee;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How a membership purchase was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    BankTransfer,
    Paypal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Membership purchase stored in the `payments` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Payment {
    pub id: String,
    pub user_email: String,
    #[serde(default)]
    pub membership_id: Option<String>,
    /// Amount in DZD
    pub amount: u32,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: PaymentStatus,
    /// "TRN-<unix millis>"
    pub transaction_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub payment_date: DateTime<Utc>,
}

/// How a single visit was paid at the front desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum VisitPaymentMethod {
    #[default]
    Cash,
    Baridimob,
    Ccp,
    Dahabia,
    CreditCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum VisitPaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

/// Pay-per-visit transaction stored in the `single_visit_payments` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SingleVisitPayment {
    pub id: String,
    pub user_email: String,
    pub gym_id: String,
    #[serde(default)]
    pub gym_name: String,
    /// The check-in this payment covers
    pub check_in_id: String,
    pub amount_paid: u32,
    pub gym_amount: u32,
    pub commission: u32,
    #[serde(default)]
    pub payment_status: VisitPaymentStatus,
    #[serde(default)]
    pub payment_method: VisitPaymentMethod,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub payment_date: DateTime<Utc>,
}

impl SingleVisitPayment {
    pub fn fee(&self) -> SingleVisitFee {
        SingleVisitFee {
            amount_paid: self.amount_paid,
            gym_amount: self.gym_amount,
            commission: self.commission,
        }
    }
}

/// Transaction reference for a membership purchase.
pub fn transaction_id(now: DateTime<Utc>) -> String {
    format!("TRN-{}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transaction_id_format() {
        let now = Utc.timestamp_millis_opt(1_767_225_600_123).unwrap();
        assert_eq!(transaction_id(now), "TRN-1767225600123");
    }

    #[test]
    fn test_visit_payment_method_wire_names() {
        let methods: Vec<VisitPaymentMethod> =
            serde_json::from_str(r#"["cash","baridimob","ccp","dahabia","credit_card"]"#).unwrap();
        assert_eq!(methods.len(), 5);
        assert_eq!(methods[4], VisitPaymentMethod::CreditCard);
        assert!(serde_json::from_str::<VisitPaymentMethod>(r#""paypal""#).is_err());
    }
}
