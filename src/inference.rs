//! Inference adapters: a common interface over the pose and segmentation models.

use crate::{
    body_segmentation::{BodySegmenter, PartSegmentation},
    config::ModelConfig,
    error::Error,
    keypoint::Pose,
    pose_detection::{MoveNetVariant, PoseDetector},
    Result,
};
use opencv::core::Mat;
use std::fmt;
use std::str::FromStr;

/// Output of one inference call
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// Poses of the detected subjects
    Poses(Vec<Pose>),
    /// Body part map of the frame
    Parts(PartSegmentation),
}

impl Detection {
    /// The first detected pose, which the single-subject overlays use
    #[must_use]
    pub fn primary_pose(&self) -> Option<&Pose> {
        match self {
            Self::Poses(poses) => poses.first(),
            Self::Parts(_) => None,
        }
    }

    /// The part map, if this detection carries one
    #[must_use]
    pub fn parts(&self) -> Option<&PartSegmentation> {
        match self {
            Self::Parts(parts) => Some(parts),
            Self::Poses(_) => None,
        }
    }
}

/// Per-frame model inference
pub trait InferenceAdapter {
    /// Run the model on one frame
    fn infer(&mut self, frame: &Mat) -> Result<Detection>;

    /// Model name for logging
    fn name(&self) -> &str;
}

impl InferenceAdapter for PoseDetector {
    fn infer(&mut self, frame: &Mat) -> Result<Detection> {
        self.detect(frame).map(Detection::Poses)
    }

    fn name(&self) -> &str {
        match self.variant() {
            MoveNetVariant::Lightning => "movenet_lightning",
            MoveNetVariant::Thunder => "movenet_thunder",
        }
    }
}

impl InferenceAdapter for BodySegmenter {
    fn infer(&mut self, frame: &Mat) -> Result<Detection> {
        self.segment_parts(frame).map(Detection::Parts)
    }

    fn name(&self) -> &str {
        "body_parts"
    }
}

/// Which model a view runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelector {
    MoveNetLightning,
    MoveNetThunder,
    BodyParts,
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MoveNetLightning => "movenet_lightning",
            Self::MoveNetThunder => "movenet_thunder",
            Self::BodyParts => "body_parts",
        })
    }
}

impl FromStr for ModelSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "movenet" | "movenet_lightning" | "lightning" => Ok(Self::MoveNetLightning),
            "movenet_thunder" | "thunder" => Ok(Self::MoveNetThunder),
            "body_parts" | "bodypix" | "segmentation" => Ok(Self::BodyParts),
            _ => Err(Error::ModelError(format!("Unknown model: {s}"))),
        }
    }
}

/// Load the model for a selector
///
/// # Errors
///
/// Returns an error if the model file cannot be loaded
pub fn load_model(selector: ModelSelector, config: &ModelConfig) -> Result<Box<dyn InferenceAdapter>> {
    match selector {
        ModelSelector::MoveNetLightning => Ok(Box::new(PoseDetector::new(
            &config.movenet_lightning,
            MoveNetVariant::Lightning,
        )?)),
        ModelSelector::MoveNetThunder => Ok(Box::new(PoseDetector::new(
            &config.movenet_thunder,
            MoveNetVariant::Thunder,
        )?)),
        ModelSelector::BodyParts => Ok(Box::new(BodySegmenter::new(
            &config.body_parts,
            config.segmentation_threshold,
        )?)),
    }
}
