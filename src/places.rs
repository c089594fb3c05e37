use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::types::{
    dto::google::{DetailsResponse, GooglePlace, MissingGeometry, TextSearchResponse},
    intent::SearchIntent,
    place::{PlaceDetail, PlaceSummary},
};

const DETAIL_FIELDS: &str = "place_id,name,formatted_address,geometry,rating,types,\
formatted_phone_number,international_phone_number,website,url,opening_hours";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("request denied: {0}")]
    InvalidKey(String),

    #[error("no place with id {0}")]
    NotFound(String),

    #[error("provider returned {status}: {message}")]
    Rejected { status: String, message: String },

    #[error("incomplete place data: {0}")]
    Incomplete(#[from] MissingGeometry),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    fn from_status(status: &str, message: Option<String>, place_id: Option<&str>) -> Self {
        match status {
            "OVER_QUERY_LIMIT" => ProviderError::QuotaExceeded,
            "REQUEST_DENIED" => {
                ProviderError::InvalidKey(message.unwrap_or_else(|| status.to_string()))
            }
            "NOT_FOUND" => ProviderError::NotFound(place_id.unwrap_or_default().to_string()),
            _ => ProviderError::Rejected {
                status: status.to_string(),
                message: message.unwrap_or_default(),
            },
        }
    }
}

#[async_trait]
pub trait PlaceProvider: Send + Sync {
    async fn text_search(&self, intent: &SearchIntent) -> Result<Vec<PlaceSummary>, ProviderError>;

    async fn get_details(&self, place_id: &str) -> Result<PlaceDetail, ProviderError>;
}

/// Google Places web service (text search + details).
pub struct GooglePlacesClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GooglePlacesClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Places client initialized (url={})", base_url);
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl PlaceProvider for GooglePlacesClient {
    #[instrument(skip(self))]
    async fn text_search(&self, intent: &SearchIntent) -> Result<Vec<PlaceSummary>, ProviderError> {
        let query = intent.text_query();
        let mut params = vec![("query", query.as_str()), ("key", self.api_key.as_str())];
        if let Some(place_type) = intent.provider_type() {
            params.push(("type", place_type));
        }
        let response = self
            .client
            .get(format!("{}/textsearch/json", self.base_url))
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<TextSearchResponse>()
            .await?;
        match response.status.as_str() {
            "OK" => {
                debug!(count = response.results.len(), "text search returned");
                Ok(locatable(response.results))
            }
            "ZERO_RESULTS" => Ok(vec![]),
            _ => {
                warn!(status = %response.status, "text search rejected");
                Err(ProviderError::from_status(
                    &response.status,
                    response.error_message,
                    None,
                ))
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_details(&self, place_id: &str) -> Result<PlaceDetail, ProviderError> {
        let response = self
            .client
            .get(format!("{}/details/json", self.base_url))
            .query(&[
                ("place_id", place_id),
                ("fields", DETAIL_FIELDS),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<DetailsResponse>()
            .await?;
        if response.status != "OK" {
            return Err(ProviderError::from_status(
                &response.status,
                response.error_message,
                Some(place_id),
            ));
        }
        let place = response
            .result
            .ok_or_else(|| ProviderError::NotFound(place_id.to_string()))?;
        Ok(place.try_into()?)
    }
}

/// Keeps the results that carry coordinates.
fn locatable(results: Vec<GooglePlace>) -> Vec<PlaceSummary> {
    results
        .into_iter()
        .filter_map(|place| match PlaceSummary::try_from(place) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(%err, "dropping search result");
                None
            }
        })
        .collect()
}
