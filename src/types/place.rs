use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A place as returned by a text search.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    /// Always within [0, 5].
    pub rating: Option<f32>,
    pub categories: BTreeSet<String>,
}

/// A summary plus contact fields, open status and opening hours.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetail {
    #[serde(flatten)]
    pub summary: PlaceSummary,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub maps_url: Option<String>,
    pub open_now: Option<bool>,
    pub hours: Vec<String>,
}

/// Drops ratings outside the [0, 5] scale.
pub fn bounded_rating(rating: Option<f64>) -> Option<f32> {
    rating
        .filter(|r| r.is_finite() && (0.0..=5.0).contains(r))
        .map(|r| r as f32)
}
