// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX model metadata parsing.
//!
//! Ultralytics exports store their configuration as YAML-ish strings in the
//! ONNX custom metadata. Only the fields the pose pipeline needs are kept.

use std::collections::HashMap;

use crate::error::{MeasureError, Result};
use crate::keypoints::NUM_KEYPOINTS;

/// Metadata extracted from an Ultralytics YOLO pose ONNX model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// Model description (e.g., "Ultralytics YOLO11n-pose model trained on coco-pose.yaml").
    pub description: String,
    /// Ultralytics version used for export.
    pub version: String,
    /// Task name as written by the exporter ("pose" for keypoint models).
    pub task: String,
    /// Input image size as (height, width).
    pub imgsz: (usize, usize),
    /// Keypoint layout as (keypoints per person, values per keypoint).
    pub kpt_shape: (usize, usize),
}

impl ModelMetadata {
    /// Parse metadata from ONNX custom metadata properties.
    ///
    /// Entries are joined into one `key: value` document before parsing, so the
    /// same code handles per-key and single-blob exports.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric field is malformed.
    pub fn from_onnx_metadata(metadata_map: &HashMap<String, String>) -> Result<Self> {
        let yaml: String = metadata_map
            .iter()
            .map(|(key, value)| {
                if key.is_empty() || key == "metadata" || key == "model_metadata" {
                    value.clone()
                } else {
                    format!("{key}: {value}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self::from_yaml_str(&yaml)
    }

    /// Parse metadata from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the `imgsz` or `kpt_shape` values are malformed.
    pub fn from_yaml_str(yaml_str: &str) -> Result<Self> {
        let mut metadata = Self::default();

        for line in yaml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_matches('\'').trim_matches('"');

            match key.trim() {
                "description" => metadata.description = value.to_string(),
                "version" => metadata.version = value.to_string(),
                "task" => metadata.task = value.to_lowercase(),
                _ => {}
            }
        }

        if let Some(imgsz) = parse_pair(yaml_str, "imgsz")? {
            metadata.imgsz = imgsz;
        }
        if let Some(kpt_shape) = parse_pair(yaml_str, "kpt_shape")? {
            metadata.kpt_shape = kpt_shape;
        }

        Ok(metadata)
    }

    /// Check that the model produces COCO body keypoints.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::ModelLoadError`] for non-pose models or an
    /// unsupported keypoint layout.
    pub fn ensure_pose(&self) -> Result<()> {
        if self.task != "pose" {
            return Err(MeasureError::ModelLoadError(format!(
                "Expected a pose model, got task '{}'",
                self.task
            )));
        }
        let (num_kpts, kpt_dim) = self.kpt_shape;
        if num_kpts != NUM_KEYPOINTS || !(kpt_dim == 2 || kpt_dim == 3) {
            return Err(MeasureError::ModelLoadError(format!(
                "Unsupported keypoint shape [{num_kpts}, {kpt_dim}], expected [{NUM_KEYPOINTS}, 2] or [{NUM_KEYPOINTS}, 3]"
            )));
        }
        Ok(())
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            version: String::new(),
            task: "pose".to_string(),
            imgsz: (640, 640),
            kpt_shape: (NUM_KEYPOINTS, 3),
        }
    }
}

/// Parse a two-element list, inline (`key: [a, b]`) or as a block list.
fn parse_pair(yaml_str: &str, key: &str) -> Result<Option<(usize, usize)>> {
    let prefix = format!("{key}:");
    let lines: Vec<&str> = yaml_str.lines().collect();
    let Some(pos) = lines.iter().position(|l| l.trim_start().starts_with(&prefix)) else {
        return Ok(None);
    };

    let rest = lines[pos].trim_start()[prefix.len()..].trim();
    let values: Vec<&str> = if let Some(inner) = rest.strip_prefix('[') {
        inner.trim_end_matches(']').split(',').map(str::trim).collect()
    } else if rest.is_empty() {
        lines[pos + 1..]
            .iter()
            .map(|l| l.trim())
            .take_while(|l| l.starts_with('-'))
            .map(|l| l.trim_start_matches('-').trim())
            .collect()
    } else {
        // A scalar applies to both dimensions (e.g. "imgsz: 640")
        vec![rest, rest]
    };

    let parsed: Vec<usize> = values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse().map_err(|_| {
                MeasureError::ModelLoadError(format!("Invalid {key} value: {v}"))
            })
        })
        .collect::<Result<_>>()?;

    match parsed.as_slice() {
        [a, b, ..] => Ok(Some((*a, *b))),
        _ => Err(MeasureError::ModelLoadError(format!(
            "Expected two values for {key}, got {}",
            parsed.len()
        ))),
    }
}
