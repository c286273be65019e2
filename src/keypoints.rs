// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! COCO body keypoints.
//!
//! Pose models emit keypoints positionally. [`BodyPart`] names each position of
//! the 17-point COCO schema so downstream code never indexes by bare integers.

use std::fmt;

/// Number of keypoints in the COCO pose schema.
pub const NUM_KEYPOINTS: usize = 17;

/// Anatomical landmark in the COCO pose schema, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    /// All body parts in schema order.
    pub const ALL: [Self; NUM_KEYPOINTS] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Position of this part in the model output.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name of the part.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected landmark in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X coordinate in pixels.
    pub x: f32,
    /// Y coordinate in pixels.
    pub y: f32,
    /// Detector confidence (1.0 when the source carries none).
    pub confidence: f32,
}

impl Keypoint {
    /// Create a keypoint with full confidence.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            confidence: 1.0,
        }
    }

    /// Create a keypoint with an explicit confidence.
    #[must_use]
    pub const fn with_confidence(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Euclidean pixel distance to another keypoint.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.mul_add(dx, dy * dy).sqrt()
    }
}

/// Ordered keypoints of one person.
///
/// The set may hold fewer points than the schema when a provider returns a
/// partial detection; [`KeypointSet::is_complete`] reports whether every
/// [`BodyPart`] is addressable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointSet {
    points: Vec<Keypoint>,
}

impl KeypointSet {
    /// Wrap keypoints given in schema order.
    #[must_use]
    pub const fn new(points: Vec<Keypoint>) -> Self {
        Self { points }
    }

    /// Build a set from `(x, y)` pairs in schema order.
    #[must_use]
    pub fn from_xy(coords: &[(f32, f32)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Keypoint::new(x, y)).collect())
    }

    /// Number of keypoints held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the set holds no keypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether every body part of the schema is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.len() >= NUM_KEYPOINTS
    }

    /// Look up a body part, or `None` if the set is too short to contain it.
    #[must_use]
    pub fn get(&self, part: BodyPart) -> Option<&Keypoint> {
        self.points.get(part.index())
    }

    /// All keypoints in schema order.
    #[must_use]
    pub fn points(&self) -> &[Keypoint] {
        &self.points
    }
}

impl From<Vec<Keypoint>> for KeypointSet {
    fn from(points: Vec<Keypoint>) -> Self {
        Self::new(points)
    }
}
