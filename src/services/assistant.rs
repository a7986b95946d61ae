// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Support assistant client.
//!
//! Builds the support prompt from the live plan catalogue and pricing, and
//! posts it to an external text-generation endpoint when one is configured.
//! Without an endpoint every question gets a canned reply.

use crate::error::AppError;
use crate::i18n::Locale;
use crate::models::membership::PLANS;
use crate::models::SingleVisitFee;
use serde::Deserialize;
use std::fmt::Write as _;
use std::time::Duration;

/// Reply used when no assistant endpoint is configured.
pub const CANNED_REPLY: &str = "Thank you for your question. This is a mock AI response.";

#[derive(Clone)]
pub struct SupportAssistant {
    http: reqwest::Client,
    url: Option<String>,
    validity_days: i64,
}

#[derive(Debug, Deserialize)]
struct AssistantResponse {
    response: String,
}

impl SupportAssistant {
    pub fn new(
        url: Option<String>,
        timeout_secs: u64,
        validity_days: i64,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url,
            validity_days,
        })
    }

    /// Prompt for answering `question` in `locale`.
    pub fn prompt(&self, question: &str, locale: Locale) -> String {
        let fee = SingleVisitFee::standard();
        let mut plans = String::new();
        for plan in PLANS.iter() {
            let _ = writeln!(
                plans,
                "  - {}: {} visits for {} DZD",
                plan.name, plan.visits, plan.price
            );
        }

        format!(
            "You are a helpful customer support assistant for TRini213, a gym membership app in Algeria.\n\
             \n\
             Context about TRini213:\n\
             - We offer {count} membership plans:\n\
             {plans}\
             - Members can access any partner gym in Algeria with their membership\n\
             - Plans are valid for {days} days from purchase\n\
             - If members run out of visits, they can pay {paid} DZD per single visit\n\
             - Gym owners receive {gym} DZD per single visit ({commission} DZD commission for TRini213)\n\
             \n\
             User question: {question}\n\
             \n\
             Provide a helpful, friendly response in {language}.\n\
             If the user asks to speak with a human or if the question is too complex, suggest they can request human support.\n\
             Keep responses concise and helpful.\n",
            count = PLANS.len(),
            plans = plans,
            days = self.validity_days,
            paid = fee.amount_paid,
            gym = fee.gym_amount,
            commission = fee.commission,
            question = question.trim(),
            language = locale.english_name(),
        )
    }

    /// Answer a support question.
    pub async fn reply(&self, question: &str, locale: Locale) -> Result<String, AppError> {
        let Some(url) = &self.url else {
            return Ok(CANNED_REPLY.to_string());
        };

        let body = serde_json::json!({
            "prompt": self.prompt(question, locale)
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Assistant(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Assistant endpoint returned an error");
            return Err(AppError::Assistant(format!("HTTP {}: {}", status, body)));
        }

        let parsed: AssistantResponse = response
            .json()
            .await
            .map_err(|e| AppError::Assistant(format!("JSON parse error: {}", e)))?;

        let reply = parsed.response.trim().to_string();
        if reply.is_empty() {
            return Err(AppError::Assistant("Empty assistant response".to_string()));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_tracks_catalogue_and_fee() {
        let assistant = SupportAssistant::new(None, 5, 30).unwrap();
        let prompt = assistant.prompt("How much is a visit?", Locale::Fr);

        assert!(prompt.contains("Classic: 15 visits for 3000 DZD"));
        assert!(prompt.contains("Royal: 15 visits for 7500 DZD"));
        assert!(prompt.contains("valid for 30 days"));
        assert!(prompt.contains("pay 300 DZD per single visit"));
        assert!(prompt.contains("receive 200 DZD"));
        assert!(prompt.contains("response in French"));
        assert!(prompt.contains("User question: How much is a visit?"));
    }

    #[tokio::test]
    async fn test_canned_reply_without_endpoint() {
        let assistant = SupportAssistant::new(None, 5, 30).unwrap();
        let reply = assistant.reply("hello", Locale::En).await.unwrap();
        assert_eq!(reply, CANNED_REPLY);
    }
}
