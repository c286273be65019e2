// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! HTTP server configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::detector::PersonSelection;
use crate::error::{MeasureError, Result};
use crate::measurement::CalibrationConfig;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 8000;
/// Default front-end origin allowed by CORS.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
/// Default directory for transient uploads.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Everything the HTTP layer needs besides the keypoint provider.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use pose_measure::ServerConfig;
///
/// let config = ServerConfig::default()
///     .with_port(9000)
///     .with_detection_timeout(Duration::from_secs(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host or IP to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
    /// The single browser origin allowed to call the API.
    pub allowed_origin: String,
    /// Where uploads are written while a request is processed.
    pub upload_dir: PathBuf,
    /// Maximum accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Wall-clock budget for one detection.
    pub detection_timeout: Duration,
    /// Maximum detections running at once.
    pub max_concurrent_detections: usize,
    /// Which person to measure when several are found.
    pub person_selection: PersonSelection,
    /// Calibration coefficients for the calculator.
    pub calibration: CalibrationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            detection_timeout: Duration::from_secs(30),
            max_concurrent_detections: 2,
            person_selection: PersonSelection::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Set the bind port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the upload directory.
    #[must_use]
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the request body limit in bytes.
    #[must_use]
    pub const fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Set the detection timeout.
    #[must_use]
    pub const fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = timeout;
        self
    }

    /// Set the number of concurrent detections.
    #[must_use]
    pub const fn with_max_concurrent_detections(mut self, n: usize) -> Self {
        self.max_concurrent_detections = n;
        self
    }

    /// Set the person selection policy.
    #[must_use]
    pub const fn with_person_selection(mut self, policy: PersonSelection) -> Self {
        self.person_selection = policy;
        self
    }

    /// Set the calibration coefficients.
    #[must_use]
    pub const fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    /// `host:port` for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::ConfigError`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(MeasureError::ConfigError("max upload size must be positive".to_string()));
        }
        if self.detection_timeout.is_zero() {
            return Err(MeasureError::ConfigError("detection timeout must be positive".to_string()));
        }
        if self.max_concurrent_detections == 0 {
            return Err(MeasureError::ConfigError(
                "max concurrent detections must be at least 1".to_string(),
            ));
        }
        if self.allowed_origin.parse::<axum::http::HeaderValue>().is_err() {
            return Err(MeasureError::ConfigError(format!(
                "allowed origin '{}' is not a valid header value",
                self.allowed_origin
            )));
        }
        self.calibration.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.detection_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_detections, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_values() {
        let zero_concurrency = ServerConfig::default().with_max_concurrent_detections(0);
        assert!(matches!(zero_concurrency.validate(), Err(MeasureError::ConfigError(_))));

        let zero_timeout = ServerConfig::default().with_detection_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());

        let zero_limit = ServerConfig::default().with_max_upload_bytes(0);
        assert!(zero_limit.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_calibration() {
        let config = ServerConfig::default()
            .with_calibration(CalibrationConfig::default().with_body_height_ratio(0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_origin() {
        let config = ServerConfig {
            allowed_origin: "http://bad\norigin".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
