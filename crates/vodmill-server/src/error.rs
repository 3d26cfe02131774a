//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vodmill_models::{JobOutcome, NotificationError};

use crate::pipeline::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a request can terminate with.
///
/// Validation failures echo their real cause with a 400 so the sender can
/// fix the payload. Pipeline failures respond 500 with a generic body; the
/// original detail stays in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid notification: {0}")]
    Validation(#[from] NotificationError),

    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Outcome label the error terminates the job with.
    pub fn outcome(&self) -> JobOutcome {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => JobOutcome::ValidationError,
            ApiError::Pipeline(e) => e.outcome(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    outcome: JobOutcome,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let outcome = self.outcome();

        // Pipeline detail never reaches the caller; it is logged where the
        // job failed.
        let detail = match &self {
            ApiError::Pipeline(_) => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponse { detail, outcome };

        (status, Json(body)).into_response()
    }
}
