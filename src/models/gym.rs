// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner gym model and listing filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Gym lifecycle status. New registrations start as `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum GymStatus {
    #[default]
    Pending,
    Active,
    Suspended,
}

/// Partner gym stored in the `gyms` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Gym {
    pub id: String,
    pub name: String,
    /// Email of the owning user
    pub owner_email: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub city: String,
    /// Wilaya name (e.g. "Alger", "Oran")
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub hours: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub status: GymStatus,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub featured: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Gym {
    pub fn is_active(&self) -> bool {
        self.status == GymStatus::Active
    }

    /// Case-insensitive substring match over name, city, area and description.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.name, &self.city, &self.area, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Public listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GymFilter {
    /// Free-text search
    #[serde(default)]
    pub search: Option<String>,
    /// Exact wilaya (area) match; "all" disables the filter
    #[serde(default)]
    pub wilaya: Option<String>,
    /// Only featured gyms
    #[serde(default)]
    pub featured: Option<bool>,
}

impl GymFilter {
    pub fn matches(&self, gym: &Gym) -> bool {
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |query| gym.matches_search(query));
        let wilaya_ok = match self.wilaya.as_deref() {
            None | Some("") | Some("all") => true,
            Some(wilaya) => gym.area == wilaya,
        };
        let featured_ok = self.featured.map_or(true, |featured| gym.featured == featured);
        search_ok && wilaya_ok && featured_ok
    }
}

/// Active gyms matching `filter`, newest first.
pub fn filter_gyms(gyms: &[Gym], filter: &GymFilter) -> Vec<Gym> {
    let mut matched: Vec<Gym> = gyms
        .iter()
        .filter(|gym| gym.is_active() && filter.matches(gym))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matched
}
