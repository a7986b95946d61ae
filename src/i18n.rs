// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Localized operator-facing messages (English, French, Arabic).

use crate::models::DenialReason;
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Supported display languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
    Ar,
}

impl Locale {
    pub fn parse(raw: &str) -> Option<Self> {
        let primary = raw.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Locale::En),
            "fr" => Some(Locale::Fr),
            "ar" => Some(Locale::Ar),
            _ => None,
        }
    }

    /// Pick the locale from an explicit `lang` parameter, then the
    /// highest-weighted supported `Accept-Language` entry, then English.
    /// Entries of equal weight keep their header order.
    pub fn negotiate(lang: Option<&str>, headers: &HeaderMap) -> Self {
        if let Some(locale) = lang.and_then(Locale::parse) {
            return locale;
        }
        let Some(accept) = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
        else {
            return Locale::default();
        };

        let mut ranked: Vec<(Locale, f32)> = accept
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let locale = Locale::parse(parts.next()?)?;
                let weight = parts
                    .find_map(|param| param.trim().strip_prefix("q="))
                    .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok())?;
                (weight > 0.0).then_some((locale, weight))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.first().map(|(locale, _)| *locale).unwrap_or_default()
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Locale::Ar)
    }

    /// Language name as it appears in assistant prompts.
    pub fn english_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Fr => "French",
            Locale::Ar => "Arabic",
        }
    }
}

/// Message keys shown to gym staff after a scan or check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    MembershipValid,
    NoMembership,
    Expired,
    NoVisitsLeft,
    CheckInSuccess,
}

impl From<DenialReason> for Message {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::NoMembership => Message::NoMembership,
            DenialReason::Expired => Message::Expired,
            DenialReason::NoVisitsLeft => Message::NoVisitsLeft,
        }
    }
}

/// Translate a message key.
pub fn translate(message: Message, locale: Locale) -> &'static str {
    use Locale::*;
    use Message::*;
    match (message, locale) {
        (MembershipValid, En) => "Valid Membership",
        (MembershipValid, Fr) => "Abonnement Valide",
        (MembershipValid, Ar) => "اشتراك صالح",
        (NoMembership, En) => "No active membership found",
        (NoMembership, Fr) => "Aucun abonnement actif trouvé",
        (NoMembership, Ar) => "لا يوجد اشتراك نشط",
        (Expired, En) => "Membership expired",
        (Expired, Fr) => "Abonnement expiré",
        (Expired, Ar) => "انتهت صلاحية الاشتراك",
        (NoVisitsLeft, En) => "No visits remaining",
        (NoVisitsLeft, Fr) => "Plus de visites",
        (NoVisitsLeft, Ar) => "لا توجد زيارات متبقية",
        (CheckInSuccess, En) => "Check-in successful!",
        (CheckInSuccess, Fr) => "Enregistrement réussi!",
        (CheckInSuccess, Ar) => "تم التسجيل بنجاح!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_explicit_lang_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR"));
        assert_eq!(Locale::negotiate(Some("ar"), &headers), Locale::Ar);
    }

    #[test]
    fn test_accept_language_first_supported() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-DE,fr;q=0.8,en;q=0.5"),
        );
        assert_eq!(Locale::negotiate(None, &headers), Locale::Fr);
    }

    #[test]
    fn test_accept_language_honors_weights() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr;q=0.1, ar"),
        );
        assert_eq!(Locale::negotiate(None, &headers), Locale::Ar);

        // q=0 means "not acceptable"
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("ar;q=0, fr;q=0.4"),
        );
        assert_eq!(Locale::negotiate(None, &headers), Locale::Fr);
    }

    #[test]
    fn test_defaults_to_english() {
        assert_eq!(Locale::negotiate(Some("xx"), &HeaderMap::new()), Locale::En);
    }

    #[test]
    fn test_translations() {
        assert!(Locale::Ar.is_rtl());
        assert!(!Locale::Fr.is_rtl());
        assert_eq!(
            translate(DenialReason::NoVisitsLeft.into(), Locale::Fr),
            "Plus de visites"
        );
        assert_eq!(translate(Message::Expired, Locale::En), "Membership expired");
    }
}
