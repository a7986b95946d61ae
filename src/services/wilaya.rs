// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wilaya gazetteer and gym map placement.

use crate::models::Gym;
use geo::{Distance, Haversine, Point};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde::Serialize;
use std::fs;
use std::path::Path;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Gazetteer shipped with the binary, used when no data file is found.
const BUILTIN_WILAYAS: &str = include_str!("../../data/wilayas.geojson");

/// One of Algeria's wilayas (provinces).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Wilaya {
    /// Two-digit official code ("01".."58")
    pub code: String,
    pub name: String,
    pub name_ar: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Wilaya {
    fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// An active gym with its distance from a reference point.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyGym {
    pub gym: Gym,
    pub distance_km: f64,
}

#[derive(Default, Clone)]
pub struct WilayaService {
    wilayas: Vec<Wilaya>,
}

impl WilayaService {
    /// Load wilayas from a GeoJSON file of points.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, WilayaError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| WilayaError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load wilayas from a GeoJSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, WilayaError> {
        let geojson: GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| WilayaError::ParseError(e.to_string()))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(WilayaError::ParseError(
                "Expected a FeatureCollection".to_string(),
            ));
        };

        let mut wilayas = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let text = |key: &str| {
                feature
                    .property(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let code = text("code");
            let name = text("name");
            let name_ar = text("name_ar");
            if name.is_empty() {
                continue;
            }

            let Some(geometry) = feature.geometry else {
                return Err(WilayaError::UnsupportedGeometry(name));
            };
            let geojson::Value::Point(position) = geometry.value else {
                return Err(WilayaError::UnsupportedGeometry(name));
            };
            let (Some(&longitude), Some(&latitude)) = (position.first(), position.get(1)) else {
                return Err(WilayaError::UnsupportedGeometry(name));
            };

            wilayas.push(Wilaya {
                code,
                name,
                name_ar,
                latitude,
                longitude,
            });
        }

        wilayas.sort_by(|a, b| a.code.cmp(&b.code));
        tracing::info!(count = wilayas.len(), "Loaded wilayas");
        Ok(Self { wilayas })
    }

    /// The gazetteer compiled into the binary.
    pub fn builtin() -> Result<Self, WilayaError> {
        Self::load_from_json(BUILTIN_WILAYAS)
    }

    pub fn wilayas(&self) -> &[Wilaya] {
        &self.wilayas
    }

    /// Find a wilaya by name (case-insensitive) or by code.
    pub fn find(&self, name_or_code: &str) -> Option<&Wilaya> {
        let needle = name_or_code.trim();
        if needle.is_empty() {
            return None;
        }
        self.wilayas
            .iter()
            .find(|w| w.code == needle || w.name.eq_ignore_ascii_case(needle) || w.name_ar == needle)
            .or_else(|| {
                let lowered = needle.to_lowercase();
                self.wilayas
                    .iter()
                    .find(|w| w.name.to_lowercase() == lowered)
            })
    }

    /// Active gyms as a GeoJSON FeatureCollection of points placed at their
    /// wilaya. Gyms in an unknown wilaya are left out.
    pub fn gym_map(&self, gyms: &[Gym]) -> FeatureCollection {
        let features = gyms
            .iter()
            .filter(|gym| gym.is_active())
            .filter_map(|gym| {
                let wilaya = self.find(&gym.area)?;
                let mut properties = JsonObject::new();
                properties.insert("id".to_string(), gym.id.clone().into());
                properties.insert("name".to_string(), gym.name.clone().into());
                properties.insert("city".to_string(), gym.city.clone().into());
                properties.insert("area".to_string(), wilaya.name.clone().into());
                properties.insert("address".to_string(), gym.address.clone().into());
                properties.insert("featured".to_string(), gym.featured.into());
                properties.insert("image_url".to_string(), gym.image_url.clone().into());

                Some(Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::Point(vec![
                        wilaya.longitude,
                        wilaya.latitude,
                    ]))),
                    id: Some(geojson::feature::Id::String(gym.id.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                })
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    /// Active gyms ordered by great-circle distance from (`lat`, `lng`).
    pub fn nearby(&self, gyms: &[Gym], lat: f64, lng: f64) -> Vec<NearbyGym> {
        let origin = Point::new(lng, lat);
        let mut nearby: Vec<NearbyGym> = gyms
            .iter()
            .filter(|gym| gym.is_active())
            .filter_map(|gym| {
                let wilaya = self.find(&gym.area)?;
                let meters = Haversine.distance(origin, wilaya.point());
                Some(NearbyGym {
                    gym: gym.clone(),
                    distance_km: (meters / 100.0).round() / 10.0,
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        nearby
    }
}

/// Errors from wilaya loading.
#[derive(Debug, thiserror::Error)]
pub enum WilayaError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Wilaya {0} is not a point")]
    UnsupportedGeometry(String),
}
