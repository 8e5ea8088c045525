//! Pipeline error type.

use axum::http::StatusCode;

/// Errors a pipeline stage can return.
///
/// Cache backend and scrub failures never appear here; they are absorbed
/// by the caching stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream request timed out")]
    Timeout,

    #[error("failed to cache: {0}")]
    Buffer(#[source] axum::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    /// HTTP status reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Buffer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}
