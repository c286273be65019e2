// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AppState;
use super::error::{ApiError, ErrorResponse};
use super::upload::{UploadedImage, decode_image};
use crate::detector::measure_person;
use crate::error::{MeasureError, Result};
use crate::measurement::{CalibrationConfig, Measurements, parse_height};

/// Message sent with every successful analysis.
pub const SUCCESS_MESSAGE: &str = "Analysis successful";

/// Successful analysis.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    /// Fixed success message.
    pub message: String,
    /// Estimated body measurements in centimeters.
    pub measurements: Measurements,
}

impl AnalysisResponse {
    /// Wrap measurements with the success message.
    #[must_use]
    pub fn new(measurements: Measurements) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            measurements,
        }
    }
}

/// Multipart form accepted by `/analyze-pose` (documentation only).
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AnalyzeForm {
    /// Full-body photo.
    #[schema(format = Binary)]
    image: String,
    /// User height in centimeters, e.g. "175".
    height: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server status
    status: String,
    /// Service name
    service: String,
    /// API version
    version: String,
}

#[derive(Serialize, ToSchema)]
pub struct InfoResponse {
    /// Model task
    task: String,
    /// Description of the keypoint provider
    model: String,
    /// Input image size (height, width)
    imgsz: (usize, usize),
    /// Keypoints per person and values per keypoint
    kpt_shape: (usize, usize),
    /// Policy used when several people are detected
    person_selection: String,
    /// Calibration coefficients used by the calculator
    calibration: CalibrationConfig,
}

/// Root endpoint
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Welcome message", body = String)
    )
)]
pub async fn root() -> &'static str {
    "Pose Measurement API - POST /analyze-pose with 'image' and 'height'. Swagger UI at /swagger-ui/"
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Service information endpoint
///
/// Returns the loaded model description and the calculator settings.
#[utoipa::path(
    get,
    path = "/info",
    tag = "measurement",
    responses(
        (status = 200, description = "Service information", body = InfoResponse)
    )
)]
pub async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        task: "pose".to_string(),
        model: state.model_info.description.clone(),
        imgsz: state.model_info.imgsz,
        kpt_shape: state.model_info.kpt_shape,
        person_selection: state.config.person_selection.to_string(),
        calibration: state.config.calibration,
    })
}

/// Estimate body measurements from a photo
///
/// Upload a full-body photo and the user's height in centimeters. The person's
/// keypoints are detected and converted into six measurements.
#[utoipa::path(
    post,
    path = "/analyze-pose",
    tag = "measurement",
    request_body(content = AnalyzeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Analysis successful", body = AnalysisResponse),
        (status = 400, description = "Invalid height, image, or incomplete detection", body = ErrorResponse),
        (status = 404, description = "No person detected", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 504, description = "Pose detection timed out", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn analyze_pose(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> std::result::Result<Json<AnalysisResponse>, ApiError> {
    let mut image: Option<(Option<String>, axum::body::Bytes)> = None;
    let mut height: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                image = Some((file_name, field.bytes().await?));
            }
            Some("height") => height = Some(field.text().await?),
            _ => {}
        }
    }

    let height = parse_height(
        height
            .as_deref()
            .ok_or_else(|| MeasureError::InvalidHeight("missing 'height' field".to_string()))?,
    )?;
    let (file_name, bytes) = image.ok_or_else(|| MeasureError::MissingField("image".to_string()))?;

    let upload = UploadedImage::save(&state.config.upload_dir, file_name.as_deref(), &bytes).await?;
    let measurements = run_detection(&state, &upload, height).await?;

    tracing::info!(height, ?measurements, "Pose analysed");
    Ok(Json(AnalysisResponse::new(measurements)))
}

/// Decode the stored upload and measure it on the blocking pool.
///
/// Waiting for a permit counts against the timeout. A timed-out detection keeps
/// running in the background and still holds its permit until it finishes.
async fn run_detection(state: &AppState, upload: &UploadedImage, height: f64) -> Result<Measurements> {
    let limit = state.config.detection_timeout;
    let permits = Arc::clone(&state.permits);
    let provider = Arc::clone(&state.provider);
    let path = upload.path().to_path_buf();
    let policy = state.config.person_selection;
    let calibration = state.config.calibration;

    let work = async move {
        let permit = permits
            .acquire_owned()
            .await
            .map_err(|_| MeasureError::Internal("detection pool closed".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let image = decode_image(&path)?;
            let mut provider = provider.blocking_lock();
            measure_person(&mut **provider, &image, height, policy, &calibration)
        })
        .await
        .map_err(|e| MeasureError::Internal(format!("detection task failed: {e}")))?
    };

    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| MeasureError::DetectionTimeout(limit))?
}
