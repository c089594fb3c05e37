use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::place::{bounded_rating, Coordinates, PlaceDetail, PlaceSummary};

#[derive(Serialize, Deserialize, Debug)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GooglePlace>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DetailsResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result: Option<GooglePlace>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GooglePlace {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub geometry: Option<GoogleGeometry>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<GoogleOpeningHours>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GoogleGeometry {
    pub location: GoogleLatLng,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GoogleLatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GoogleOpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

/// A provider result without a geometry cannot be placed on a map.
#[derive(Error, Debug)]
#[error("place {0} has no coordinates")]
pub struct MissingGeometry(pub String);

impl TryFrom<GooglePlace> for PlaceSummary {
    type Error = MissingGeometry;

    fn try_from(place: GooglePlace) -> Result<Self, Self::Error> {
        let Some(geometry) = place.geometry else {
            return Err(MissingGeometry(place.place_id));
        };
        let coordinates = Coordinates {
            lat: geometry.location.lat,
            lng: geometry.location.lng,
        };
        Ok(PlaceSummary {
            place_id: place.place_id,
            name: place.name,
            address: place
                .formatted_address
                .or(place.vicinity)
                .unwrap_or_default(),
            coordinates,
            rating: bounded_rating(place.rating),
            categories: place.types.into_iter().collect(),
        })
    }
}

impl TryFrom<GooglePlace> for PlaceDetail {
    type Error = MissingGeometry;

    fn try_from(mut place: GooglePlace) -> Result<Self, Self::Error> {
        let phone = place
            .formatted_phone_number
            .take()
            .or(place.international_phone_number.take());
        let website = place.website.take();
        let maps_url = place.url.take();
        let (open_now, hours) = match place.opening_hours.take() {
            Some(hours) => (hours.open_now, hours.weekday_text),
            None => (None, vec![]),
        };
        Ok(PlaceDetail {
            summary: place.try_into()?,
            phone,
            website,
            maps_url,
            open_now,
            hours,
        })
    }
}
