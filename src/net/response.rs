use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{whole_seconds, OrchestratorError};

pub struct ResponseError(Response);

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<OrchestratorError> for ResponseError {
    fn from(err: OrchestratorError) -> Self {
        let status = match &err {
            OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            OrchestratorError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            OrchestratorError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let mut body = json!({
            "error": err.code(),
            "message": err.to_string(),
        });
        if let OrchestratorError::UpstreamUnavailable { upstream, .. } = &err {
            body["upstream"] = json!(upstream);
        }
        let mut response = ResponseError::with_status(status, Json(body)).0;
        if let OrchestratorError::RateLimitExceeded { retry_after } = err {
            let seconds = whole_seconds(&retry_after);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        ResponseError(response)
    }
}

impl ResponseError {
    pub fn with_status<T>(status_code: StatusCode, data: T) -> Self
    where
        (StatusCode, T): IntoResponse,
    {
        ResponseError((status_code, data).into_response())
    }
}

pub type Result<T, E = ResponseError> = axum::response::Result<T, E>;
