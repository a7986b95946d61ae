//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Only the JWT signing key
//! is required; everything else has a default.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// GCP project ID. When unset the in-memory store is used.
    pub gcp_project_id: Option<String>,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Session token lifetime in days
    pub jwt_ttl_days: i64,
    /// Days a purchased membership stays valid
    pub membership_validity_days: i64,
    /// Offset of the business timezone from UTC, in hours (Algeria: +1)
    pub business_utc_offset_hours: i32,
    /// Optional support assistant endpoint; canned replies when unset
    pub assistant_url: Option<String>,
    /// Timeout for assistant calls, in seconds
    pub assistant_timeout_secs: u64,
    /// Wilaya gazetteer (GeoJSON points)
    pub wilaya_data_path: String,
    /// Emails that receive the admin role when they register
    pub admin_emails: Vec<String>,
}

impl Config {
    /// Config for tests: in-memory store, fixed signing key.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            gcp_project_id: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_ttl_days: 30,
            membership_validity_days: 30,
            business_utc_offset_hours: 1,
            assistant_url: None,
            assistant_timeout_secs: 20,
            wilaya_data_path: "data/wilayas.geojson".to_string(),
            admin_emails: vec!["admin@trini213.dz".to_string()],
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_or("PORT", 8080)?,
            gcp_project_id: optional("GCP_PROJECT_ID"),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            jwt_ttl_days: parse_or("JWT_TTL_DAYS", 30)?,
            membership_validity_days: parse_or("MEMBERSHIP_VALIDITY_DAYS", 30)?,
            business_utc_offset_hours: parse_or("BUSINESS_UTC_OFFSET_HOURS", 1)?,
            assistant_url: optional("ASSISTANT_URL"),
            assistant_timeout_secs: parse_or("ASSISTANT_TIMEOUT_SECS", 20)?,
            wilaya_data_path: env::var("WILAYA_DATA_PATH")
                .unwrap_or_else(|_| "data/wilayas.geojson".to_string()),
            admin_emails: optional("ADMIN_EMAILS")
                .map(|raw| {
                    raw.split(',')
                        .map(|e| e.trim().to_lowercase())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Single test touching the environment to avoid races between tests.
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("MEMBERSHIP_VALIDITY_DAYS", "45");
        env::set_var("ADMIN_EMAILS", "Boss@TRini213.dz, ops@trini213.dz");
        env::remove_var("GCP_PROJECT_ID");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.membership_validity_days, 45);
        assert!(config.gcp_project_id.is_none());
        assert!(config.is_admin_email("boss@trini213.dz"));
        assert!(!config.is_admin_email("member@trini213.dz"));

        env::set_var("MEMBERSHIP_VALIDITY_DAYS", "thirty");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MEMBERSHIP_VALIDITY_DAYS")));

        env::remove_var("MEMBERSHIP_VALIDITY_DAYS");
        env::remove_var("ADMIN_EMAILS");
    }
}
