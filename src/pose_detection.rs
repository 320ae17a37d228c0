use crate::{
    constants::{MOVENET_LIGHTNING_INPUT_SIZE, MOVENET_THUNDER_INPUT_SIZE, NUM_KEYPOINTS},
    error::Error,
    keypoint::{Keypoint, KeypointName, Pose},
    utils::image_conversion::frame_to_nhwc,
    Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::Mat;
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// MoveNet single-pose model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveNetVariant {
    /// Fast, 192x192 input
    Lightning,
    /// Accurate, 256x256 input
    Thunder,
}

impl MoveNetVariant {
    /// Square input size expected by the model
    #[must_use]
    pub fn input_size(self) -> i32 {
        match self {
            Self::Lightning => MOVENET_LIGHTNING_INPUT_SIZE,
            Self::Thunder => MOVENET_THUNDER_INPUT_SIZE,
        }
    }
}

impl FromStr for MoveNetVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lightning" | "singlepose_lightning" => Ok(Self::Lightning),
            "thunder" | "singlepose_thunder" => Ok(Self::Thunder),
            _ => Err(Error::InvalidInput(format!("Unknown MoveNet variant: {s}"))),
        }
    }
}

/// Single-person pose detector running MoveNet through `ONNX` Runtime
pub struct PoseDetector {
    session: Session,
    variant: MoveNetVariant,
    input_size: i32,
}

impl PoseDetector {
    /// Load a MoveNet model from an `ONNX` file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX runtime environment cannot be created
    /// - The model file cannot be loaded
    /// - The model has no inputs or outputs
    pub fn new<P: AsRef<Path>>(model_path: P, variant: MoveNetVariant) -> Result<Self> {
        log::info!(
            "Initializing PoseDetector ({:?}) with model: {}",
            variant,
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("pose_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            variant,
            input_size: variant.input_size(),
        })
    }

    /// Model variant in use
    #[must_use]
    pub fn variant(&self) -> MoveNetVariant {
        self.variant
    }

    /// Detect the pose of the most prominent person in a BGR frame
    ///
    /// Keypoints are returned in frame pixel coordinates. The single-pose
    /// model always reports one pose; its keypoint scores tell whether the
    /// person is actually visible.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing, inference or output decoding fails
    pub fn detect(&self, frame: &Mat) -> Result<Vec<Pose>> {
        let input = frame_to_nhwc(frame, self.input_size, self.input_size, |v| v)?;
        let output = self.forward(input)?;

        #[allow(clippy::cast_precision_loss)]
        let pose = decode_movenet_output(&output, frame.cols() as f32, frame.rows() as f32)?;
        log::debug!("MoveNet pose score {:.3}", pose.score);
        Ok(vec![pose])
    }

    /// Run forward pass through the model
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let keypoints_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;

        let tensor = keypoints_output.try_extract::<f32>()?;
        let view = tensor.view();
        let data = view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Failed to get output data".to_string()))?;

        Ok(data.to_vec())
    }
}

/// Decode a MoveNet `[1, 1, 17, 3]` output into a pose in pixel space
///
/// Each keypoint row is `(y, x, score)` with coordinates normalized to
/// `[0, 1]`.
///
/// # Errors
///
/// Returns an error if the output holds fewer than 17 keypoint rows
pub fn decode_movenet_output(output: &[f32], frame_width: f32, frame_height: f32) -> Result<Pose> {
    let expected = NUM_KEYPOINTS * 3;
    if output.len() < expected {
        return Err(Error::ModelDataFormatError(format!(
            "Expected {expected} values in MoveNet output, got {}",
            output.len()
        )));
    }

    let keypoints = KeypointName::ALL
        .iter()
        .zip(output.chunks_exact(3))
        .map(|(&name, row)| Keypoint::new(name, row[1] * frame_width, row[0] * frame_height, row[2]))
        .collect();

    Ok(Pose::new(keypoints))
}
