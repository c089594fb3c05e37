use std::{sync::Arc, time::Duration};

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::{
    error::{OrchestratorError, Upstream},
    llm::{build_prompt, LanguageModel},
    parser,
    places::{PlaceProvider, ProviderError},
    rate_limit::RateLimiter,
    types::{
        dto::search::{EnrichmentFailure, Location, SearchResult},
        intent::SearchIntent,
        place::{PlaceDetail, PlaceSummary},
    },
};

/// Longest place id accepted by [`QueryOrchestrator::lookup_place`].
const MAX_PLACE_ID_LENGTH: usize = 512;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_query_length: usize,
    pub max_results: usize,
    pub detail_concurrency: usize,
    pub llm_timeout: Duration,
    pub maps_timeout: Duration,
}

/// Drives a query through the model, the parser and the place provider.
pub struct QueryOrchestrator {
    llm: Arc<dyn LanguageModel>,
    places: Arc<dyn PlaceProvider>,
    limiter: Arc<RateLimiter>,
    settings: OrchestratorSettings,
}

impl QueryOrchestrator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        places: Arc<dyn PlaceProvider>,
        limiter: Arc<RateLimiter>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            llm,
            places,
            limiter,
            settings,
        }
    }

    #[instrument(skip(self))]
    pub async fn handle_search(
        &self,
        raw_query: &str,
        client_id: &str,
        enrich: bool,
    ) -> Result<SearchResult, OrchestratorError> {
        let query = self.validate(raw_query)?;
        self.limiter
            .check(client_id)
            .map_err(|retry_after| OrchestratorError::RateLimitExceeded { retry_after })?;

        let llm_response = self.ask_model(query).await?;
        let intent = parser::parse(&llm_response).map_err(|err| {
            warn!(reason = err.reason(), "model output not understood");
            err
        })?;
        info!(?intent, known_type = intent.is_known_type(), "query understood");

        let mut summaries = self.search(&intent).await?;
        summaries.truncate(self.settings.max_results);

        let (locations, errors) = if enrich {
            self.enrich(summaries).await
        } else {
            (summaries.into_iter().map(Location::Summary).collect(), vec![])
        };

        Ok(SearchResult {
            llm_response,
            intent,
            locations,
            errors,
        })
    }

    /// Details for a single place, outside the model pipeline.
    #[instrument(skip(self))]
    pub async fn lookup_place(&self, place_id: &str) -> Result<PlaceDetail, OrchestratorError> {
        let place_id = place_id.trim();
        if place_id.is_empty() || place_id.len() > MAX_PLACE_ID_LENGTH {
            return Err(OrchestratorError::Validation("invalid place id".to_string()));
        }
        match self.fetch_details(place_id).await {
            Ok(detail) => Ok(detail),
            Err(DetailError::Provider(ProviderError::NotFound(id))) => {
                Err(OrchestratorError::NotFound(id))
            }
            Err(err) => Err(OrchestratorError::unavailable(Upstream::Maps, err)),
        }
    }

    fn validate<'a>(&self, raw_query: &'a str) -> Result<&'a str, OrchestratorError> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Err(OrchestratorError::Validation(
                "query must not be empty".to_string(),
            ));
        }
        if query.chars().count() > self.settings.max_query_length {
            return Err(OrchestratorError::Validation(format!(
                "query must be at most {} characters",
                self.settings.max_query_length
            )));
        }
        Ok(query)
    }

    async fn ask_model(&self, query: &str) -> Result<String, OrchestratorError> {
        let prompt = build_prompt(query);
        let limit = self.settings.llm_timeout;
        tokio::time::timeout(limit, self.llm.generate(&prompt))
            .await
            .map_err(|_| timed_out(Upstream::Llm, limit))?
            .map_err(|err| {
                warn!(%err, "language model call failed");
                OrchestratorError::unavailable(Upstream::Llm, err)
            })
    }

    async fn search(&self, intent: &SearchIntent) -> Result<Vec<PlaceSummary>, OrchestratorError> {
        let limit = self.settings.maps_timeout;
        tokio::time::timeout(limit, self.places.text_search(intent))
            .await
            .map_err(|_| timed_out(Upstream::Maps, limit))?
            .map_err(|err| {
                warn!(%err, "place search failed");
                OrchestratorError::unavailable(Upstream::Maps, err)
            })
    }

    /// Fetches details with bounded concurrency, keeping search order.
    /// Failed items are reported instead of failing the batch.
    async fn enrich(&self, summaries: Vec<PlaceSummary>) -> (Vec<Location>, Vec<EnrichmentFailure>) {
        let results: Vec<(PlaceSummary, Result<PlaceDetail, DetailError>)> = stream::iter(summaries)
            .map(|summary| async move {
                let detail = self.fetch_details(&summary.place_id).await;
                (summary, detail)
            })
            .buffered(self.settings.detail_concurrency.max(1))
            .collect()
            .await;

        let mut locations = Vec::with_capacity(results.len());
        let mut errors = vec![];
        for (summary, detail) in results {
            match detail {
                Ok(detail) => locations.push(Location::Detail(detail)),
                Err(err) => {
                    warn!(place_id = %summary.place_id, %err, "detail fetch failed");
                    errors.push(EnrichmentFailure {
                        place_id: summary.place_id,
                        name: summary.name,
                        reason: err.to_string(),
                    });
                }
            }
        }
        (locations, errors)
    }

    async fn fetch_details(&self, place_id: &str) -> Result<PlaceDetail, DetailError> {
        let limit = self.settings.maps_timeout;
        tokio::time::timeout(limit, self.places.get_details(place_id))
            .await
            .map_err(|_| DetailError::TimedOut(limit))?
            .map_err(DetailError::Provider)
    }
}

fn timed_out(upstream: Upstream, limit: Duration) -> OrchestratorError {
    warn!(%upstream, ?limit, "upstream call timed out");
    OrchestratorError::unavailable(upstream, format!("timed out after {limit:?}"))
}

#[derive(Debug, thiserror::Error)]
enum DetailError {
    #[error(transparent)]
    Provider(ProviderError),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}
