//! Named body keypoints and per-frame poses.

use crate::{constants::NUM_KEYPOINTS, Error, Result};
use std::fmt;
use std::str::FromStr;

/// MoveNet keypoint layout (COCO order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointName {
    /// All names in model output order
    pub const ALL: [KeypointName; NUM_KEYPOINTS] = [
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

    /// Name for a model output index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position in the model output
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Snake-case label, as used by the pose-detection model family
    #[must_use]
    pub fn as_str(self) -> &'static str {
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

impl fmt::Display for KeypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeypointName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown keypoint name: {s}")))
    }
}

/// A scored 2D landmark in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub name: KeypointName,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    #[must_use]
    pub fn new(name: KeypointName, x: f32, y: f32, score: f32) -> Self {
        Self { name, x, y, score }
    }

    /// Whether the score is strictly above `threshold`
    #[must_use]
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.score > threshold
    }

    /// Euclidean distance to another keypoint
    #[must_use]
    pub fn distance_to(&self, other: &Keypoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point halfway between two keypoints
    #[must_use]
    pub fn midpoint(&self, other: &Keypoint) -> (f32, f32) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Keypoints of one detected subject in one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    pub score: f32,
}

impl Pose {
    /// Build a pose; the pose score is the mean keypoint score
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        let score = if keypoints.is_empty() {
            0.0
        } else {
            keypoints.iter().map(|k| k.score).sum::<f32>() / keypoints.len() as f32
        };
        Self { keypoints, score }
    }

    /// Look up a keypoint by name
    #[must_use]
    pub fn get(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.name == name)
    }

    /// Look up a keypoint that passes the confidence gate
    #[must_use]
    pub fn confident(&self, name: KeypointName, threshold: f32) -> Option<&Keypoint> {
        self.get(name).filter(|k| k.is_confident(threshold))
    }

    /// Keypoints passing the confidence gate
    pub fn confident_keypoints(&self, threshold: f32) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter().filter(move |k| k.is_confident(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index() {
        assert_eq!(KeypointName::from_index(0), Some(KeypointName::Nose));
        assert_eq!(KeypointName::from_index(16), Some(KeypointName::RightAnkle));
        assert_eq!(KeypointName::from_index(NUM_KEYPOINTS), None);
    }

    #[test]
    fn test_name_round_trip() {
        for name in KeypointName::ALL {
            assert_eq!(name.as_str().parse::<KeypointName>().unwrap(), name);
            assert_eq!(KeypointName::from_index(name.index()), Some(name));
        }
        assert!("left_toe".parse::<KeypointName>().is_err());
    }

    #[test]
    fn test_confidence_gate_is_strict() {
        let kp = Keypoint::new(KeypointName::Nose, 1.0, 1.0, 0.5);
        assert!(!kp.is_confident(0.5));
        assert!(kp.is_confident(0.49));
    }

    #[test]
    fn test_pose_lookup() {
        let pose = Pose::new(vec![
            Keypoint::new(KeypointName::LeftEye, 100.0, 200.0, 0.9),
            Keypoint::new(KeypointName::RightEye, 140.0, 200.0, 0.3),
        ]);
        assert!(pose.confident(KeypointName::LeftEye, 0.5).is_some());
        assert!(pose.confident(KeypointName::RightEye, 0.5).is_none());
        assert!(pose.get(KeypointName::Nose).is_none());
        assert!((pose.score - 0.6).abs() < 1e-6);
        assert_eq!(pose.confident_keypoints(0.5).count(), 1);
    }

    #[test]
    fn test_distance_and_midpoint() {
        let a = Keypoint::new(KeypointName::LeftEye, 0.0, 0.0, 1.0);
        let b = Keypoint::new(KeypointName::RightEye, 3.0, 4.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);
        assert_eq!(a.midpoint(&b), (1.5, 2.0));
    }
}
