// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Person detection seam.
//!
//! The HTTP layer and CLI only need "give me the 17 keypoints of the person in
//! this image". [`KeypointProvider`] abstracts the pose model so tests can swap
//! in a fixed answer, and [`detect_person`] applies the selection policy when
//! several people are in frame.

use image::DynamicImage;

use crate::error::{MeasureError, Result};
use crate::keypoints::{KeypointSet, NUM_KEYPOINTS};
use crate::measurement::{CalibrationConfig, Measurements, compute};
use crate::postprocessing::PoseDetection;

/// Anything that can find people and their keypoints in an image.
pub trait KeypointProvider: Send {
    /// Run pose detection, returning every person found (possibly none).
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<PoseDetection>>;
}

impl<T: KeypointProvider + ?Sized> KeypointProvider for Box<T> {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<PoseDetection>> {
        (**self).detect(image)
    }
}

/// Which person to measure when more than one is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PersonSelection {
    /// The detection with the highest person score.
    #[default]
    HighestConfidence,
    /// The detection with the largest bounding box.
    LargestBox,
    /// The first detection reported by the model.
    First,
}

impl PersonSelection {
    /// Policy name as accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighestConfidence => "highest-confidence",
            Self::LargestBox => "largest-box",
            Self::First => "first",
        }
    }
}

impl std::fmt::Display for PersonSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick one detection according to `policy`.
///
/// Ties keep the earlier detection.
#[must_use]
pub fn select_person(detections: &[PoseDetection], policy: PersonSelection) -> Option<&PoseDetection> {
    let better = |best: &PoseDetection, cand: &PoseDetection| match policy {
        PersonSelection::HighestConfidence => cand.confidence > best.confidence,
        PersonSelection::LargestBox => cand.area() > best.area(),
        PersonSelection::First => false,
    };

    detections.iter().fold(None, |best, cand| match best {
        Some(b) if !better(b, cand) => Some(b),
        _ => Some(cand),
    })
}

/// Detect the measured person's keypoints in `image`.
///
/// # Errors
///
/// * [`MeasureError::NoPersonDetected`] when the model finds nobody.
/// * [`MeasureError::IncompleteDetection`] when the chosen person has fewer
///   than 17 keypoints.
/// * Any error raised by the provider itself.
pub fn detect_person<P: KeypointProvider + ?Sized>(
    provider: &mut P,
    image: &DynamicImage,
    policy: PersonSelection,
) -> Result<KeypointSet> {
    let detections = provider.detect(image)?;
    tracing::debug!(people = detections.len(), %policy, "Pose detection finished");

    let person = select_person(&detections, policy).ok_or(MeasureError::NoPersonDetected)?;
    if person.keypoints.len() < NUM_KEYPOINTS {
        return Err(MeasureError::IncompleteDetection {
            found: person.keypoints.len(),
        });
    }

    Ok(person.keypoints.clone())
}

/// Detect the person in `image` and measure them.
///
/// # Errors
///
/// Any error from [`detect_person`] or [`compute`].
pub fn measure_person<P: KeypointProvider + ?Sized>(
    provider: &mut P,
    image: &DynamicImage,
    user_height_cm: f64,
    policy: PersonSelection,
    calibration: &CalibrationConfig,
) -> Result<Measurements> {
    let keypoints = detect_person(provider, image, policy)?;
    compute(&keypoints, user_height_cm, calibration)
}
