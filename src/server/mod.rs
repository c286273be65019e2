// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! HTTP API for pose-based body measurement.
//!
//! The router exposes `POST /analyze-pose` plus health, info and OpenAPI
//! endpoints. It is generic over the [`KeypointProvider`] so the whole stack
//! can be exercised without an ONNX model.

mod error;
mod handlers;
mod upload;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tokio::sync::{Mutex, Semaphore};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ErrorResponse, status_for};
pub use handlers::{AnalysisResponse, SUCCESS_MESSAGE};
pub use upload::{UploadedImage, decode_image};

use crate::config::ServerConfig;
use crate::detector::KeypointProvider;
use crate::error::{MeasureError, Result};
use crate::model::PoseModel;

/// Description of the keypoint provider, reported by `/info`.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Free-form description (model path and version).
    pub description: String,
    /// Model input size as (height, width).
    pub imgsz: (usize, usize),
    /// Keypoints per person and values per keypoint.
    pub kpt_shape: (usize, usize),
}

impl ModelInfo {
    /// Describe a loaded pose model.
    #[must_use]
    pub fn from_model(model: &PoseModel) -> Self {
        let metadata = model.metadata();
        let description = if metadata.description.is_empty() {
            model.path().display().to_string()
        } else {
            format!("{} ({})", metadata.description, model.path().display())
        };
        Self {
            description,
            imgsz: model.input_size(),
            kpt_shape: metadata.kpt_shape,
        }
    }
}

/// Shared application state.
pub struct AppState {
    provider: Arc<Mutex<Box<dyn KeypointProvider>>>,
    permits: Arc<Semaphore>,
    config: ServerConfig,
    model_info: ModelInfo,
}

impl AppState {
    /// Bundle a provider with the server configuration.
    #[must_use]
    pub fn new(provider: Box<dyn KeypointProvider>, model_info: ModelInfo, config: ServerConfig) -> Self {
        Self {
            provider: Arc::new(Mutex::new(provider)),
            permits: Arc::new(Semaphore::new(config.max_concurrent_detections)),
            config,
            model_info,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pose Measurement API",
        description = "Estimate body measurements from a full-body photo and the user's height.\n\nErrors are returned as `{\"detail\": \"...\"}`.",
        license(name = "AGPL-3.0", url = "https://github.com/ultralytics/inference/blob/main/LICENSE")
    ),
    paths(handlers::root, handlers::health, handlers::info, handlers::analyze_pose),
    components(schemas(
        handlers::AnalysisResponse,
        handlers::AnalyzeForm,
        handlers::HealthResponse,
        handlers::InfoResponse,
        crate::measurement::Measurements,
        crate::measurement::CalibrationConfig,
        ErrorResponse
    )),
    tags(
        (name = "measurement", description = "Body measurement endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
struct ApiDoc;

/// CORS policy allowing only the configured front-end, with credentials.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .map_err(|_| MeasureError::ConfigError(format!("Invalid allowed origin: {origin}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Build the application router.
///
/// # Errors
///
/// Returns [`MeasureError::ConfigError`] if the configuration is invalid.
pub fn router(state: AppState) -> Result<Router> {
    state.config.validate()?;
    let cors = cors_layer(&state.config.allowed_origin)?;
    let body_limit = state.config.max_upload_bytes;

    Ok(Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .route("/analyze-pose", post(handlers::analyze_pose))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}

/// Create the upload directory, bind, and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the address cannot be
/// bound, or the server fails.
pub async fn serve(state: AppState) -> Result<()> {
    let config = state.config.clone();
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let app = router(state)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;

    tracing::info!(
        %addr,
        origin = %config.allowed_origin,
        upload_dir = %config.upload_dir.display(),
        "Server listening"
    );
    tracing::info!("Swagger UI available at http://{addr}/swagger-ui/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
