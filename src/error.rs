use std::{fmt, time::Duration};

use serde::Serialize;
use thiserror::Error;

use crate::parser::ParseError;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Upstream {
    Llm,
    Maps,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Llm => write!(f, "llm"),
            Upstream::Maps => write!(f, "maps"),
        }
    }
}

/// Rounds up to whole seconds, never below one, so a client that waits this
/// long finds the window reset.
pub fn whole_seconds(duration: &Duration) -> u64 {
    (duration.as_secs() + u64::from(duration.subsec_nanos() > 0)).max(1)
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("invalid query: {0}")]
    Validation(String),

    #[error("rate limit exceeded, retry in {}s", whole_seconds(.retry_after))]
    RateLimitExceeded { retry_after: Duration },

    #[error("{upstream} is unavailable: {reason}")]
    UpstreamUnavailable { upstream: Upstream, reason: String },

    #[error("could not understand query ({0})")]
    Parse(#[from] ParseError),

    #[error("no place with id {0}")]
    NotFound(String),
}

impl OrchestratorError {
    pub fn unavailable(upstream: Upstream, reason: impl ToString) -> Self {
        OrchestratorError::UpstreamUnavailable {
            upstream,
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "validation_error",
            OrchestratorError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            OrchestratorError::UpstreamUnavailable { .. } => "upstream_unavailable",
            OrchestratorError::Parse(_) => "could_not_understand_query",
            OrchestratorError::NotFound(_) => "not_found",
        }
    }
}
