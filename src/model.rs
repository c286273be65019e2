// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! YOLO pose model loading and inference.
//!
//! This module provides [`PoseModel`], which wraps an ONNX Runtime session for
//! an Ultralytics pose export and turns images into [`PoseDetection`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;

use crate::detector::KeypointProvider;
use crate::error::{MeasureError, Result};
use crate::inference::DetectorConfig;
use crate::metadata::ModelMetadata;
use crate::postprocessing::{PoseDetection, decode_poses};
use crate::preprocessing::preprocess_image;

/// Custom metadata keys written by Ultralytics exporters.
const METADATA_KEYS: [&str; 14] = [
    "description", "author", "date", "version", "license", "docs", "stride", "task", "batch",
    "imgsz", "names", "half", "channels", "kpt_shape",
];

/// YOLO pose model backed by ONNX Runtime.
///
/// # Example
///
/// ```no_run
/// use pose_measure::PoseModel;
///
/// let mut model = PoseModel::load("yolo11n-pose.onnx")?;
/// let img = image::open("person.jpg")?;
/// let people = model.predict_image(&img)?;
/// println!("Found {} people", people.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PoseModel {
    session: Session,
    metadata: ModelMetadata,
    input_name: String,
    output_name: String,
    config: DetectorConfig,
    path: PathBuf,
    warmed_up: bool,
}

impl PoseModel {
    /// Load a pose model from an ONNX file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::ModelLoadError`] if the file is missing, cannot be
    /// loaded, or is not a 17-keypoint pose model.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, DetectorConfig::default())
    }

    /// Load a pose model with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::ModelLoadError`] if the file is missing, cannot be
    /// loaded, or is not a 17-keypoint pose model.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: DetectorConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MeasureError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        #[allow(unused_mut)]
        let mut builder = Session::builder()
            .map_err(|e| MeasureError::ModelLoadError(format!("Failed to create session builder: {e}")))?;

        #[cfg(feature = "coreml")]
        {
            builder = builder
                .with_execution_providers([CoreMLExecutionProvider::default().with_subgraphs(true).build()])
                .map_err(|e| MeasureError::ModelLoadError(format!("Failed to register CoreML EP: {e}")))?;
        }

        #[cfg(feature = "cuda")]
        {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| MeasureError::ModelLoadError(format!("Failed to register CUDA EP: {e}")))?;
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MeasureError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| MeasureError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| MeasureError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let metadata = Self::extract_metadata(&session)?;
        metadata.ensure_pose()?;

        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "images".to_string(), |i| i.name.clone());
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| MeasureError::ModelLoadError("Model has no outputs".to_string()))?;

        let config = DetectorConfig {
            imgsz: config.imgsz.or(Some(metadata.imgsz)),
            ..config
        };

        tracing::info!(
            model = %path.display(),
            imgsz = ?config.imgsz,
            kpt_shape = ?metadata.kpt_shape,
            version = %metadata.version,
            "Loaded pose model"
        );

        Ok(Self {
            session,
            metadata,
            input_name,
            output_name,
            config,
            path: path.to_path_buf(),
            warmed_up: false,
        })
    }

    /// Read Ultralytics metadata, falling back to COCO pose defaults.
    fn extract_metadata(session: &Session) -> Result<ModelMetadata> {
        let model_metadata = session
            .metadata()
            .map_err(|e| MeasureError::ModelLoadError(format!("Failed to get model metadata: {e}")))?;

        let mut metadata_map: HashMap<String, String> = METADATA_KEYS
            .iter()
            .filter_map(|key| match model_metadata.custom(key) {
                Ok(Some(value)) => Some(((*key).to_string(), value)),
                _ => None,
            })
            .collect();

        if metadata_map.is_empty() {
            for key in ["", "metadata", "model_metadata"] {
                if let Ok(Some(value)) = model_metadata.custom(key) {
                    metadata_map.insert(key.to_string(), value);
                }
            }
        }

        if metadata_map.is_empty() {
            tracing::warn!("Model has no Ultralytics metadata, assuming COCO pose defaults");
            return Ok(ModelMetadata::default());
        }

        ModelMetadata::from_onnx_metadata(&metadata_map)
    }

    /// Run one inference on a zero tensor so the first request is not slow.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails to run.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }

        let (h, w) = self.input_size();
        let start = Instant::now();
        self.run_inference(&Array4::<f32>::zeros((1, 3, h, w)))?;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis(), "Model warmed up");

        self.warmed_up = true;
        Ok(())
    }

    /// Detect people and their keypoints in an image.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    pub fn predict_image(&mut self, image: &DynamicImage) -> Result<Vec<PoseDetection>> {
        if !self.warmed_up {
            self.warmup()?;
        }

        let start = Instant::now();
        let preprocess = preprocess_image(image, self.input_size())?;
        let preprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        let (output, shape) = self.run_inference(&preprocess.tensor)?;
        let inference_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        let detections = decode_poses(&output, &shape, &preprocess, &self.config, self.metadata.kpt_shape);
        let postprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            people = detections.len(),
            preprocess_ms,
            inference_ms,
            postprocess_ms,
            "Pose inference"
        );

        Ok(detections)
    }

    /// Run the ONNX session, returning the first output as `(data, shape)`.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<(Vec<f32>, Vec<usize>)> {
        let input = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input)
            .map_err(|e| MeasureError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| MeasureError::InferenceError(format!("Inference failed: {e}")))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            MeasureError::InferenceError(format!("Output '{}' not found", self.output_name))
        })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MeasureError::InferenceError(format!("Failed to extract output: {e}")))?;

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        Ok((data.to_vec(), shape))
    }

    /// Model input size as (height, width).
    #[must_use]
    pub fn input_size(&self) -> (usize, usize) {
        self.config.imgsz.unwrap_or(self.metadata.imgsz)
    }

    /// Get the model metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Path the model was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeypointProvider for PoseModel {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<PoseDetection>> {
        self.predict_image(image)
    }
}

impl std::fmt::Debug for PoseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseModel")
            .field("path", &self.path)
            .field("imgsz", &self.input_size())
            .field("kpt_shape", &self.metadata.kpt_shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = PoseModel::load("nonexistent-pose.onnx");
        assert!(matches!(result, Err(MeasureError::ModelLoadError(_))));
    }
}
