use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::instrument;

use crate::{
    error::OrchestratorError,
    net::response::{ResponseError, Result},
    orchestrator::QueryOrchestrator,
    rate_limit::RateLimiter,
    types::{
        dto::search::{SearchRequest, SearchResult},
        place::PlaceDetail,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub limiter: Arc<RateLimiter>,
}

pub fn app(state: AppState) -> Router {
    let places = Router::new()
        .route("/api/places/:place_id", get(get_place))
        .route_layer(middleware::from_fn_with_state(state.clone(), admit));

    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search_by_query).post(search))
        .merge(places)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Admission gate for routes that reach the place provider directly.
async fn admit<B>(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response> {
    state
        .limiter
        .check(&addr.ip().to_string())
        .map_err(|retry_after| OrchestratorError::RateLimitExceeded { retry_after })?;
    Ok(next.run(request).await)
}

async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResult>> {
    run_search(&state, addr, request).await
}

#[instrument(skip(state))]
async fn search_by_query(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<SearchResult>> {
    run_search(&state, addr, request).await
}

async fn run_search(
    state: &AppState,
    addr: SocketAddr,
    request: SearchRequest,
) -> Result<Json<SearchResult>> {
    let result = state
        .orchestrator
        .handle_search(&request.query, &addr.ip().to_string(), request.enrich)
        .await
        .map_err(ResponseError::from)?;
    Ok(Json(result))
}

#[instrument(skip(state))]
async fn get_place(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> Result<Json<PlaceDetail>> {
    let detail = state.orchestrator.lookup_place(&place_id).await?;
    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        orchestrator::OrchestratorSettings,
        testing::{MockModel, MockPlaces},
    };

    fn router(model: MockModel, places: MockPlaces, max_requests: u32) -> Router {
        let limiter = Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60)));
        let orchestrator = QueryOrchestrator::new(
            Arc::new(model),
            Arc::new(places),
            limiter.clone(),
            OrchestratorSettings {
                max_query_length: 200,
                max_results: 10,
                detail_concurrency: 2,
                llm_timeout: Duration::from_secs(5),
                maps_timeout: Duration::from_secs(5),
            },
        );
        app(AppState {
            orchestrator: Arc::new(orchestrator),
            limiter,
        })
    }

    fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        request
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_search_returns_combined_result() {
        let app = router(
            MockModel::replying(r#"{"type":"park","location":"Denver","keywords":"dog-friendly"}"#),
            MockPlaces::with_ids(&["p1", "p2"]),
            10,
        );
        let response = app
            .oneshot(request(
                "POST",
                "/api/search",
                Body::from(r#"{"query":"dog parks in Denver","enrich":true}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["intent"]["placeType"], "park");
        assert_eq!(body["locations"].as_array().unwrap().len(), 2);
        assert_eq!(body["locations"][0]["openNow"], true);
        assert!(body["llmResponse"].as_str().unwrap().contains("Denver"));
    }

    #[tokio::test]
    async fn empty_query_is_bad_request() {
        let app = router(MockModel::replying("{}"), MockPlaces::with_ids(&[]), 10);
        let response = app
            .oneshot(request("GET", "/api/search?query=", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn vague_model_output_is_unprocessable() {
        let app = router(
            MockModel::replying("Could you be more specific?"),
            MockPlaces::with_ids(&[]),
            10,
        );
        let response = app
            .oneshot(request("GET", "/api/search?query=stuff", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "could_not_understand_query");
    }

    #[tokio::test]
    async fn place_route_is_rate_limited() {
        let app = router(MockModel::replying("{}"), MockPlaces::with_ids(&[]), 1);

        let first = app
            .clone()
            .oneshot(request("GET", "/api/places/abc", Body::empty()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(json_body(first).await["placeId"], "abc");

        let second = app
            .oneshot(request("GET", "/api/places/abc", Body::empty()))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn health_is_not_rate_limited() {
        let app = router(MockModel::replying("{}"), MockPlaces::with_ids(&[]), 1);
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(request("GET", "/health", Body::empty()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
