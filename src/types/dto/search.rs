use serde::{Deserialize, Serialize};

use crate::types::{
    intent::SearchIntent,
    place::{PlaceDetail, PlaceSummary},
};

/// Body of `POST /api/search`, also the query string of `GET /api/search`.
#[derive(Deserialize, Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Location {
    Detail(PlaceDetail),
    Summary(PlaceSummary),
}

impl Location {
    pub fn place_id(&self) -> &str {
        match self {
            Location::Detail(detail) => &detail.summary.place_id,
            Location::Summary(summary) => &summary.place_id,
        }
    }
}

/// A detail fetch that failed while the rest of the batch went through.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentFailure {
    pub place_id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Raw model text, returned for transparency.
    pub llm_response: String,
    pub intent: SearchIntent,
    pub locations: Vec<Location>,
    pub errors: Vec<EnrichmentFailure>,
}
