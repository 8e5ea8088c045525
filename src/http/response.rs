//! Error responses.
//!
//! # Design Decisions
//! - Upstream transport failures map to 502, deadline overruns to 504
//! - Bodies are short plain-text messages; querier error bodies pass through
//!   untouched because they are responses, not errors

use axum::response::{IntoResponse, Response};

use crate::pipeline::PipelineError;

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Query failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Rejected query");
        }
        (status, self.to_string()).into_response()
    }
}
