//! HTTP mapping for pipeline errors.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use remedia_core::PipelineError;

/// JSON error body returned by all API endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Wrapper turning a [`PipelineError`] into an HTTP response.
///
/// Client errors map to 4xx, service errors to 5xx. The split comes from
/// [`PipelineError::is_client_error`], so handlers never hand-pick status
/// codes per call site.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) | PipelineError::JobNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::QueueUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Engine(_) | PipelineError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
