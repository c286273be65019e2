// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detector configuration.
//!
//! This module defines the [`DetectorConfig`] struct, which controls the pose
//! model: confidence and NMS thresholds, input sizing, and runtime threading.

/// Configuration for the pose detector.
///
/// # Example
///
/// ```rust
/// use pose_measure::DetectorConfig;
///
/// let config = DetectorConfig::new()
///     .with_confidence(0.5)
///     .with_iou(0.45)
///     .with_imgsz(640, 640);
/// ```
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum person score (0.0 to 1.0) for a candidate to be kept.
    pub confidence_threshold: f32,
    /// `IoU` threshold for Non-Maximum Suppression (0.0 to 1.0).
    pub iou_threshold: f32,
    /// Maximum number of people kept per image after NMS.
    pub max_detections: usize,
    /// Explicit input image size (height, width).
    /// If `None`, the model's metadata decides.
    pub imgsz: Option<(usize, usize)>,
    /// Number of intra-op threads for ONNX Runtime.
    /// Setting this to `0` allows ONNX Runtime to choose the optimal number.
    pub num_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
            imgsz: None,
            num_threads: 0,
        }
    }
}

impl DetectorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the IoU threshold for Non-Maximum Suppression (NMS).
    #[must_use]
    pub const fn with_iou(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Set the maximum number of detections kept after NMS.
    #[must_use]
    pub const fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Set the input image size.
    ///
    /// If not set, the size stored in the model metadata is used.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the number of intra-op threads. `0` lets the runtime decide.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert!((config.confidence_threshold - 0.25).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 300);
        assert_eq!(config.imgsz, None);
    }

    #[test]
    fn test_config_builder() {
        let config = DetectorConfig::new()
            .with_confidence(0.5)
            .with_iou(0.6)
            .with_max_detections(5)
            .with_imgsz(320, 480)
            .with_threads(4);

        assert!((config.confidence_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 5);
        assert_eq!(config.imgsz, Some((320, 480)));
        assert_eq!(config.num_threads, 4);
    }
}
