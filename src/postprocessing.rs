// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose output decoding.
//!
//! YOLO pose heads emit one row of features per anchor: a `cx, cy, w, h` box,
//! one score per class, then `kpt_dim` values for each keypoint. Exports differ
//! in whether the tensor is `[1, features, anchors]` or `[1, anchors, features]`,
//! so the layout is inferred from the shape.

#![allow(clippy::cast_precision_loss)]

use ndarray::{Array2, s};

use crate::inference::DetectorConfig;
use crate::keypoints::{Keypoint, KeypointSet};
use crate::preprocessing::{PreprocessResult, clip_coords, scale_coords, scale_point};
use crate::utils::{box_area, nms};

/// A single person found by the pose model, in original image coordinates.
#[derive(Debug, Clone)]
pub struct PoseDetection {
    /// Person bounding box as `[x1, y1, x2, y2]`.
    pub bbox: [f32; 4],
    /// Person score after NMS.
    pub confidence: f32,
    /// Keypoints in COCO order.
    pub keypoints: KeypointSet,
}

impl PoseDetection {
    /// Area of the bounding box in square pixels.
    #[must_use]
    pub fn area(&self) -> f32 {
        box_area(&self.bbox)
    }
}

/// Work out `(num_preds, is_transposed)` for a pose output tensor.
///
/// `is_transposed` is true when rows are predictions (`[1, anchors, features]`).
fn parse_pose_shape(shape: &[usize], min_features: usize) -> (usize, bool) {
    let (a, b) = match shape {
        [1, a, b] | [a, b] => (*a, *b),
        _ => return (0, false),
    };

    if a >= min_features && (a < b || b < min_features) {
        (b, false)
    } else {
        (a, true)
    }
}

/// Decode raw pose model output into people.
///
/// Candidates below `config.confidence_threshold` are dropped before NMS, and
/// at most `config.max_detections` survive. The returned list is sorted by
/// descending confidence. Malformed output yields an empty list.
///
/// # Arguments
///
/// * `output` - Flattened output tensor.
/// * `shape` - Output tensor shape.
/// * `preprocess` - Letterbox transform of the input image.
/// * `config` - Thresholds for filtering and NMS.
/// * `kpt_shape` - Keypoints per person and values per keypoint (2 or 3).
#[must_use]
pub fn decode_poses(
    output: &[f32],
    shape: &[usize],
    preprocess: &PreprocessResult,
    config: &DetectorConfig,
    kpt_shape: (usize, usize),
) -> Vec<PoseDetection> {
    let (num_keypoints, kpt_dim) = kpt_shape;
    let kpt_features = num_keypoints * kpt_dim;
    let min_features = 4 + 1 + kpt_features;

    let (num_preds, is_transposed) = parse_pose_shape(shape, min_features);
    if output.is_empty() || num_preds == 0 || output.len() % num_preds != 0 {
        return Vec::new();
    }

    let num_features = output.len() / num_preds;
    if num_features < min_features {
        tracing::warn!(
            num_features,
            expected = min_features,
            "Pose model output has too few features"
        );
        return Vec::new();
    }

    let rows = if is_transposed {
        Array2::from_shape_vec((num_preds, num_features), output.to_vec()).ok()
    } else {
        Array2::from_shape_vec((num_features, num_preds), output.to_vec())
            .ok()
            .map(|a| a.reversed_axes())
    };
    let Some(rows) = rows else {
        return Vec::new();
    };

    let num_classes = num_features - 4 - kpt_features;
    let kpt_start = 4 + num_classes;
    let (orig_h, orig_w) = preprocess.orig_shape;

    let mut candidates: Vec<PoseDetection> = Vec::new();
    for row in rows.outer_iter() {
        let score = row
            .slice(s![4..kpt_start])
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(0.0_f32, f32::max);
        if score < config.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let xyxy = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0];
        let bbox = clip_coords(
            &scale_coords(&xyxy, preprocess.scale, preprocess.padding),
            preprocess.orig_shape,
        );

        let points = (0..num_keypoints)
            .map(|k| {
                let offset = kpt_start + k * kpt_dim;
                let (x, y) = scale_point(row[offset], row[offset + 1], preprocess.scale, preprocess.padding);
                let confidence = if kpt_dim >= 3 { row[offset + 2] } else { 1.0 };
                Keypoint::with_confidence(
                    x.clamp(0.0, orig_w as f32),
                    y.clamp(0.0, orig_h as f32),
                    confidence,
                )
            })
            .collect::<Vec<_>>();

        candidates.push(PoseDetection {
            bbox,
            confidence: score,
            keypoints: KeypointSet::new(points),
        });
    }

    if candidates.is_empty() {
        return Vec::new();
    }

    let scored: Vec<([f32; 4], f32)> = candidates.iter().map(|c| (c.bbox, c.confidence)).collect();
    let keep = nms(&scored, config.iou_threshold);

    let mut slots: Vec<Option<PoseDetection>> = candidates.into_iter().map(Some).collect();
    keep.into_iter()
        .take(config.max_detections)
        .filter_map(|i| slots[i].take())
        .collect()
}
