//! Scripted collaborators with call counters.

use std::{
    collections::{BTreeSet, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    llm::{LanguageModel, LlmError},
    places::{PlaceProvider, ProviderError},
    types::{
        intent::SearchIntent,
        place::{Coordinates, PlaceDetail, PlaceSummary},
    },
};

pub enum ModelReply {
    Text(String),
    Fail(String),
    Hang,
}

pub struct MockModel {
    reply: ModelReply,
    pub calls: AtomicUsize,
}

impl MockModel {
    pub fn replying(text: &str) -> Self {
        Self::new(ModelReply::Text(text.to_string()))
    }

    pub fn new(reply: ModelReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            ModelReply::Text(text) => Ok(text.clone()),
            ModelReply::Fail(message) => Err(LlmError::Provider(message.clone())),
            ModelReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::Provider("unreachable".to_string()))
            }
        }
    }
}

pub fn summary(place_id: &str) -> PlaceSummary {
    PlaceSummary {
        place_id: place_id.to_string(),
        name: format!("Place {place_id}"),
        address: "1 Main St".to_string(),
        coordinates: Coordinates { lat: 30.27, lng: -97.74 },
        rating: Some(4.2),
        categories: BTreeSet::from(["restaurant".to_string()]),
    }
}

pub struct MockPlaces {
    pub results: Vec<PlaceSummary>,
    pub search_fails: bool,
    pub failing_details: HashSet<String>,
    pub missing_details: HashSet<String>,
    pub detail_delay: Option<Duration>,
    pub search_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockPlaces {
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            results: ids.iter().map(|id| summary(id)).collect(),
            search_fails: false,
            failing_details: HashSet::new(),
            missing_details: HashSet::new(),
            detail_delay: None,
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst) + self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceProvider for MockPlaces {
    async fn text_search(&self, _intent: &SearchIntent) -> Result<Vec<PlaceSummary>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.search_fails {
            return Err(ProviderError::QuotaExceeded);
        }
        Ok(self.results.clone())
    }

    async fn get_details(&self, place_id: &str) -> Result<PlaceDetail, ProviderError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.detail_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.missing_details.contains(place_id) {
            return Err(ProviderError::NotFound(place_id.to_string()));
        }
        if self.failing_details.contains(place_id) {
            return Err(ProviderError::Rejected {
                status: "UNKNOWN_ERROR".to_string(),
                message: "backend hiccup".to_string(),
            });
        }
        Ok(PlaceDetail {
            summary: summary(place_id),
            phone: Some("+1 512-555-0100".to_string()),
            website: None,
            maps_url: None,
            open_now: Some(true),
            hours: vec!["Monday: 9:00 AM – 5:00 PM".to_string()],
        })
    }
}
