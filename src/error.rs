// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the measurement library.

use std::fmt;
use std::time::Duration;

/// Result type alias for measurement operations.
pub type Result<T> = std::result::Result<T, MeasureError>;

/// Main error type for the measurement library.
#[derive(Debug)]
pub enum MeasureError {
    /// The `height` form field is missing, not numeric, or not positive.
    InvalidHeight(String),
    /// A required multipart field was not sent.
    MissingField(String),
    /// The uploaded bytes could not be decoded as an image.
    InvalidImage(String),
    /// The detector found nobody in the image.
    NoPersonDetected,
    /// The detector returned fewer keypoints than the body schema needs.
    IncompleteDetection {
        /// Number of keypoints actually returned.
        found: usize,
    },
    /// Calculation preconditions violated (too few keypoints, bad height).
    InvalidInput(String),
    /// Shoulder and ankle midpoints share the same row, so no pixel scale exists.
    DegenerateCalibration,
    /// Detection did not finish within the configured budget.
    DetectionTimeout(Duration),
    /// Error loading the ONNX model.
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Anything else that went wrong while serving a request.
    Internal(String),
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeight(msg) => write!(f, "Invalid height: {msg}"),
            Self::MissingField(name) => write!(f, "Missing '{name}' field"),
            Self::InvalidImage(msg) => write!(f, "Invalid image: {msg}"),
            Self::NoPersonDetected => write!(f, "No person detected in the image"),
            Self::IncompleteDetection { found } => {
                write!(f, "Incomplete pose detection: {found} keypoints found, 17 required")
            }
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::DegenerateCalibration => write!(
                f,
                "Degenerate calibration: shoulder-to-ankle pixel height is zero"
            ),
            Self::DetectionTimeout(limit) => {
                write!(f, "Pose detection timed out after {:.1}s", limit.as_secs_f64())
            }
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for MeasureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MeasureError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for MeasureError {
    fn from(err: image::ImageError) -> Self {
        Self::InvalidImage(err.to_string())
    }
}
