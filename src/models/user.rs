//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    GymOwner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::GymOwner => "gym_owner",
            Role::Admin => "admin",
        }
    }
}

/// User profile stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document ID (UUID); also the middle segment of the member QR code
    pub id: String,
    /// Login name
    pub username: String,
    /// Email address (identity used by memberships and check-ins)
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    /// Birth date (YYYY-MM-DD)
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub emergency_contact: String,
    #[serde(default)]
    pub emergency_phone: String,
    #[serde(default)]
    pub fitness_goals: String,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub role: Role,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name: "first last", or the username when both are blank.
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: "u1".to_string(),
            username: "amine".to_string(),
            email: "amine@example.dz".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            birth_date: None,
            emergency_contact: String::new(),
            emergency_phone: String::new(),
            fitness_goals: String::new(),
            profile_image: String::new(),
            role: Role::Member,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(user("Amine", "Benali").full_name(), "Amine Benali");
        assert_eq!(user("Amine", "").full_name(), "Amine");
        assert_eq!(user("", "").full_name(), "amine");
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::GymOwner).unwrap(), "\"gym_owner\"");
        assert_eq!(Role::GymOwner.as_str(), "gym_owner");
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }
}
