// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Body measurements from pose keypoints.
//!
//! A single linear pixel-to-centimeter factor is derived from the vertical
//! shoulder-to-ankle span and the user's stated height, then applied to
//! landmark distances:
//!
//! | Measurement | Landmarks |
//! |-------------|-----------|
//! | `shoulder_width` | left shoulder ↔ right shoulder |
//! | `waist_width` | left hip ↔ right hip |
//! | `arm_length` | mean of shoulder → elbow → wrist, both sides |
//! | `leg_length` | mean of hip → knee → ankle, both sides |
//! | `estimated_chest_circumference` | `shoulder_width × π × chest_correction` |
//! | `estimated_waist_circumference` | `waist_width × π` |
//!
//! The circumference estimates treat a frontal width as the diameter of a
//! circle. They are rough by construction.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{MeasureError, Result};
use crate::keypoints::{BodyPart, Keypoint, KeypointSet, NUM_KEYPOINTS};

/// Calibration coefficients for the measurement formulas.
///
/// # Example
///
/// ```rust
/// use pose_measure::CalibrationConfig;
///
/// let calibration = CalibrationConfig::new()
///     .with_body_height_ratio(0.82)
///     .with_chest_correction(0.95);
/// assert!(calibration.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CalibrationConfig {
    /// Share of the stated height covered by the shoulder-to-ankle span.
    pub body_height_ratio: f64,
    /// Correction applied to the shoulder-width circle when estimating the chest.
    pub chest_correction: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            body_height_ratio: 0.80,
            chest_correction: 0.9,
        }
    }
}

impl CalibrationConfig {
    /// Create a calibration with default coefficients.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shoulder-to-ankle share of total height.
    #[must_use]
    pub const fn with_body_height_ratio(mut self, ratio: f64) -> Self {
        self.body_height_ratio = ratio;
        self
    }

    /// Set the chest circumference correction factor.
    #[must_use]
    pub const fn with_chest_correction(mut self, factor: f64) -> Self {
        self.chest_correction = factor;
        self
    }

    /// Check that both coefficients are positive and finite.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::ConfigError`] naming the offending coefficient.
    pub fn validate(&self) -> Result<()> {
        if !(self.body_height_ratio.is_finite() && self.body_height_ratio > 0.0) {
            return Err(MeasureError::ConfigError(format!(
                "body height ratio must be positive, got {}",
                self.body_height_ratio
            )));
        }
        if !(self.chest_correction.is_finite() && self.chest_correction > 0.0) {
            return Err(MeasureError::ConfigError(format!(
                "chest correction must be positive, got {}",
                self.chest_correction
            )));
        }
        Ok(())
    }
}

/// Derived body measurements in centimeters, rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Measurements {
    /// Distance between the shoulders.
    #[schema(example = 28.8)]
    pub shoulder_width: f64,
    /// Distance between the hips.
    #[schema(example = 21.6)]
    pub waist_width: f64,
    /// Mean shoulder-elbow-wrist chain length.
    pub arm_length: f64,
    /// Mean hip-knee-ankle chain length.
    pub leg_length: f64,
    /// Circle estimate from shoulder width with chest correction.
    pub estimated_chest_circumference: f64,
    /// Circle estimate from waist width.
    #[schema(example = 67.9)]
    pub estimated_waist_circumference: f64,
}

impl Measurements {
    /// All six values in declaration order.
    #[must_use]
    pub const fn values(&self) -> [f64; 6] {
        [
            self.shoulder_width,
            self.waist_width,
            self.arm_length,
            self.leg_length,
            self.estimated_chest_circumference,
            self.estimated_waist_circumference,
        ]
    }
}

/// Compute body measurements from one person's keypoints.
///
/// # Arguments
///
/// * `keypoints` - Keypoints in COCO order; at least 17 are required.
/// * `user_height_cm` - The person's stated height.
/// * `calibration` - Calibration coefficients.
///
/// # Errors
///
/// * [`MeasureError::InvalidInput`] if fewer than 17 keypoints are given, or the
///   height is not a positive finite number.
/// * [`MeasureError::DegenerateCalibration`] if the shoulder and ankle midpoints
///   lie on the same row.
///
/// # Example
///
/// ```rust
/// use pose_measure::{CalibrationConfig, KeypointSet, compute};
///
/// let mut coords = vec![(120.0, 20.0); 17];
/// coords[5] = (100.0, 50.0);
/// coords[6] = (140.0, 50.0);
/// coords[15] = (100.0, 250.0);
/// coords[16] = (140.0, 250.0);
///
/// let m = compute(&KeypointSet::from_xy(&coords), 180.0, &CalibrationConfig::default())?;
/// assert!((m.shoulder_width - 28.8).abs() < 1e-9);
/// # Ok::<(), pose_measure::MeasureError>(())
/// ```
pub fn compute(
    keypoints: &KeypointSet,
    user_height_cm: f64,
    calibration: &CalibrationConfig,
) -> Result<Measurements> {
    if !keypoints.is_complete() {
        return Err(MeasureError::InvalidInput(format!(
            "expected at least {NUM_KEYPOINTS} keypoints, got {}",
            keypoints.len()
        )));
    }
    if !(user_height_cm.is_finite() && user_height_cm > 0.0) {
        return Err(MeasureError::InvalidInput(format!(
            "height must be a positive number of centimeters, got {user_height_cm}"
        )));
    }

    let ratio = pixel_to_cm_ratio(keypoints, user_height_cm, calibration)?;
    let dist = |a: BodyPart, b: BodyPart| -> Result<f64> {
        Ok(point(keypoints, a)?.distance(point(keypoints, b)?))
    };

    let shoulder_width = dist(BodyPart::LeftShoulder, BodyPart::RightShoulder)? * ratio;
    let waist_width = dist(BodyPart::LeftHip, BodyPart::RightHip)? * ratio;

    let left_arm = dist(BodyPart::LeftShoulder, BodyPart::LeftElbow)?
        + dist(BodyPart::LeftElbow, BodyPart::LeftWrist)?;
    let right_arm = dist(BodyPart::RightShoulder, BodyPart::RightElbow)?
        + dist(BodyPart::RightElbow, BodyPart::RightWrist)?;
    let arm_length = (left_arm + right_arm) / 2.0 * ratio;

    let left_leg =
        dist(BodyPart::LeftHip, BodyPart::LeftKnee)? + dist(BodyPart::LeftKnee, BodyPart::LeftAnkle)?;
    let right_leg = dist(BodyPart::RightHip, BodyPart::RightKnee)?
        + dist(BodyPart::RightKnee, BodyPart::RightAnkle)?;
    let leg_length = (left_leg + right_leg) / 2.0 * ratio;

    let chest_circumference = shoulder_width * PI * calibration.chest_correction;
    let waist_circumference = waist_width * PI;

    Ok(Measurements {
        shoulder_width: round_to_tenth(shoulder_width),
        waist_width: round_to_tenth(waist_width),
        arm_length: round_to_tenth(arm_length),
        leg_length: round_to_tenth(leg_length),
        estimated_chest_circumference: round_to_tenth(chest_circumference),
        estimated_waist_circumference: round_to_tenth(waist_circumference),
    })
}

/// Centimeters per pixel, anchored on the vertical shoulder-to-ankle span.
///
/// The span avoids the head, which tilts and is often cropped.
///
/// # Errors
///
/// Returns [`MeasureError::InvalidInput`] when a shoulder or ankle is missing
/// and [`MeasureError::DegenerateCalibration`] when the span is zero.
pub fn pixel_to_cm_ratio(
    keypoints: &KeypointSet,
    user_height_cm: f64,
    calibration: &CalibrationConfig,
) -> Result<f64> {
    let mid_y = |a: BodyPart, b: BodyPart| -> Result<f64> {
        Ok((f64::from(point(keypoints, a)?.y) + f64::from(point(keypoints, b)?.y)) / 2.0)
    };

    let shoulder_mid_y = mid_y(BodyPart::LeftShoulder, BodyPart::RightShoulder)?;
    let ankle_mid_y = mid_y(BodyPart::LeftAnkle, BodyPart::RightAnkle)?;
    let pixel_height = (ankle_mid_y - shoulder_mid_y).abs();

    if pixel_height == 0.0 {
        return Err(MeasureError::DegenerateCalibration);
    }

    let body_height_cm = user_height_cm * calibration.body_height_ratio;
    Ok(body_height_cm / pixel_height)
}

/// Parse a user height in centimeters as sent in the `height` form field.
///
/// # Errors
///
/// Returns [`MeasureError::InvalidHeight`] unless the text is a positive,
/// finite decimal number.
pub fn parse_height(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    let height: f64 = raw
        .parse()
        .map_err(|_| MeasureError::InvalidHeight(format!("'{raw}' is not a number")))?;
    if !(height.is_finite() && height > 0.0) {
        return Err(MeasureError::InvalidHeight(format!(
            "{raw} must be a positive number of centimeters"
        )));
    }
    Ok(height)
}

fn point(keypoints: &KeypointSet, part: BodyPart) -> Result<&Keypoint> {
    keypoints.get(part).ok_or_else(|| {
        MeasureError::InvalidInput(format!(
            "missing {part} keypoint: got {} of {NUM_KEYPOINTS}",
            keypoints.len()
        ))
    })
}

/// Round to one decimal.
///
/// Formatting rounds the exact binary value with ties to even, so 28.05
/// (stored slightly above the tie) becomes 28.1.
fn round_to_tenth(v: f64) -> f64 {
    format!("{v:.1}").parse().unwrap_or(v)
}
