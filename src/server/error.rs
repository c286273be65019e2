// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! HTTP error responses.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::MeasureError;

/// Error body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable reason for the failure.
    pub detail: String,
}

/// An error ready to be turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Status code this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Message placed in the `detail` field.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// HTTP status for each error kind.
#[must_use]
pub const fn status_for(err: &MeasureError) -> StatusCode {
    match err {
        MeasureError::InvalidHeight(_)
        | MeasureError::MissingField(_)
        | MeasureError::InvalidImage(_)
        | MeasureError::IncompleteDetection { .. }
        | MeasureError::InvalidInput(_)
        | MeasureError::DegenerateCalibration => StatusCode::BAD_REQUEST,
        MeasureError::NoPersonDetected => StatusCode::NOT_FOUND,
        MeasureError::DetectionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        MeasureError::ModelLoadError(_)
        | MeasureError::InferenceError(_)
        | MeasureError::ConfigError(_)
        | MeasureError::Io(_)
        | MeasureError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<MeasureError> for ApiError {
    fn from(err: MeasureError) -> Self {
        Self {
            status: status_for(&err),
            detail: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            detail: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "Request failed");
        } else {
            tracing::warn!(status = %self.status, detail = %self.detail, "Request rejected");
        }
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}
