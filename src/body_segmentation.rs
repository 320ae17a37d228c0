//! Body part segmentation.
//!
//! The segmentation model produces, at reduced resolution, a person logit map
//! `[1, h, w, 1]` and 24 part heatmaps `[1, h, w, 24]`. A pixel belongs to the
//! person when the sigmoid of its logit exceeds the segmentation threshold;
//! its part is the heatmap argmax. The decoded map is upsampled to frame size.

use crate::{
    constants::{DEFAULT_SEGMENTATION_INPUT_SIZE, NUM_BODY_PARTS, SEGMENTATION_NORMALIZATION_OFFSET},
    error::Error,
    utils::{image_conversion::frame_to_nhwc, safe_cast::i32_to_usize},
    Result,
};
use ndarray::{Array4, ArrayView4, CowArray, Ix4};
use opencv::core::{Mat, Scalar, Vec4b, VecN, CV_8UC4};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Part id used for pixels outside the person
pub const BACKGROUND: i32 = -1;

/// Body parts in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    LeftFace,
    RightFace,
    LeftUpperArmFront,
    LeftUpperArmBack,
    RightUpperArmFront,
    RightUpperArmBack,
    LeftLowerArmFront,
    LeftLowerArmBack,
    RightLowerArmFront,
    RightLowerArmBack,
    LeftHand,
    RightHand,
    TorsoFront,
    TorsoBack,
    LeftUpperLegFront,
    LeftUpperLegBack,
    RightUpperLegFront,
    RightUpperLegBack,
    LeftLowerLegFront,
    LeftLowerLegBack,
    RightLowerLegFront,
    RightLowerLegBack,
    LeftFeet,
    RightFeet,
}

impl BodyPart {
    pub const ALL: [BodyPart; NUM_BODY_PARTS] = [
        Self::LeftFace,
        Self::RightFace,
        Self::LeftUpperArmFront,
        Self::LeftUpperArmBack,
        Self::RightUpperArmFront,
        Self::RightUpperArmBack,
        Self::LeftLowerArmFront,
        Self::LeftLowerArmBack,
        Self::RightLowerArmFront,
        Self::RightLowerArmBack,
        Self::LeftHand,
        Self::RightHand,
        Self::TorsoFront,
        Self::TorsoBack,
        Self::LeftUpperLegFront,
        Self::LeftUpperLegBack,
        Self::RightUpperLegFront,
        Self::RightUpperLegBack,
        Self::LeftLowerLegFront,
        Self::LeftLowerLegBack,
        Self::RightLowerLegFront,
        Self::RightLowerLegBack,
        Self::LeftFeet,
        Self::RightFeet,
    ];

    /// Part for a part id, `None` for background or out-of-range ids
    #[must_use]
    pub fn from_id(id: i32) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Snake-case label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftFace => "left_face",
            Self::RightFace => "right_face",
            Self::LeftUpperArmFront => "left_upper_arm_front",
            Self::LeftUpperArmBack => "left_upper_arm_back",
            Self::RightUpperArmFront => "right_upper_arm_front",
            Self::RightUpperArmBack => "right_upper_arm_back",
            Self::LeftLowerArmFront => "left_lower_arm_front",
            Self::LeftLowerArmBack => "left_lower_arm_back",
            Self::RightLowerArmFront => "right_lower_arm_front",
            Self::RightLowerArmBack => "right_lower_arm_back",
            Self::LeftHand => "left_hand",
            Self::RightHand => "right_hand",
            Self::TorsoFront => "torso_front",
            Self::TorsoBack => "torso_back",
            Self::LeftUpperLegFront => "left_upper_leg_front",
            Self::LeftUpperLegBack => "left_upper_leg_back",
            Self::RightUpperLegFront => "right_upper_leg_front",
            Self::RightUpperLegBack => "right_upper_leg_back",
            Self::LeftLowerLegFront => "left_lower_leg_front",
            Self::LeftLowerLegBack => "left_lower_leg_back",
            Self::RightLowerLegFront => "right_lower_leg_front",
            Self::RightLowerLegBack => "right_lower_leg_back",
            Self::LeftFeet => "left_feet",
            Self::RightFeet => "right_feet",
        }
    }
}

/// Rainbow palette, one RGB color per body part
pub const RAINBOW_PART_COLORS: [[u8; 3]; NUM_BODY_PARTS] = [
    [110, 64, 170],
    [143, 61, 178],
    [178, 60, 178],
    [210, 62, 167],
    [238, 67, 149],
    [255, 78, 125],
    [255, 94, 99],
    [255, 115, 75],
    [255, 140, 56],
    [239, 167, 47],
    [217, 194, 53],
    [194, 219, 64],
    [175, 240, 91],
    [135, 245, 87],
    [96, 247, 96],
    [64, 243, 115],
    [40, 234, 141],
    [28, 219, 169],
    [26, 199, 194],
    [33, 176, 213],
    [47, 150, 224],
    [65, 125, 224],
    [84, 101, 214],
    [99, 81, 195],
];

/// Per-pixel body part ids for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PartSegmentation {
    pub width: usize,
    pub height: usize,
    /// Row-major part ids, [`BACKGROUND`] outside the person
    pub data: Vec<i32>,
}

impl PartSegmentation {
    /// Part id at a pixel, `None` outside the map
    #[must_use]
    pub fn part_id(&self, x: usize, y: usize) -> Option<i32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Fraction of pixels covered by the person
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&id| id != BACKGROUND).count() as f32 / self.data.len() as f32
    }

    /// Number of pixels assigned to each part
    #[must_use]
    pub fn part_histogram(&self) -> [usize; NUM_BODY_PARTS] {
        let mut counts = [0usize; NUM_BODY_PARTS];
        for &id in &self.data {
            if let Ok(i) = usize::try_from(id) {
                if let Some(count) = counts.get_mut(i) {
                    *count += 1;
                }
            }
        }
        counts
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Decode model outputs into a part map of `out_width` x `out_height`
///
/// # Errors
///
/// Returns an error if either output has an empty batch, the segmentation is
/// not single-channel, the two outputs disagree in spatial size or the heatmap
/// tensor does not carry one channel per body part
pub fn decode_part_segmentation(
    segments: ArrayView4<f32>,
    part_heatmaps: ArrayView4<f32>,
    threshold: f32,
    out_width: usize,
    out_height: usize,
) -> Result<PartSegmentation> {
    let (seg_batch, seg_h, seg_w, seg_channels) = segments.dim();
    let (part_batch, part_h, part_w, parts) = part_heatmaps.dim();
    if seg_batch == 0 || part_batch == 0 {
        return Err(Error::ModelDataFormatError("Segmentation output has an empty batch".to_string()));
    }
    if seg_channels != 1 {
        return Err(Error::ModelDataFormatError(format!(
            "Expected a single-channel segmentation output, got {seg_channels} channels"
        )));
    }
    if seg_h != part_h || seg_w != part_w {
        return Err(Error::ModelDataFormatError(format!(
            "Segmentation {seg_w}x{seg_h} and part heatmaps {part_w}x{part_h} differ in size"
        )));
    }
    if parts != NUM_BODY_PARTS {
        return Err(Error::ModelDataFormatError(format!(
            "Expected {NUM_BODY_PARTS} part heatmaps, got {parts}"
        )));
    }
    if seg_h == 0 || seg_w == 0 {
        return Err(Error::ModelDataFormatError("Empty segmentation output".to_string()));
    }

    // Decode at model resolution first
    let mut low_res = vec![BACKGROUND; seg_h * seg_w];
    for y in 0..seg_h {
        for x in 0..seg_w {
            if sigmoid(segments[[0, y, x, 0]]) <= threshold {
                continue;
            }
            let mut best = 0;
            let mut best_score = f32::NEG_INFINITY;
            for p in 0..NUM_BODY_PARTS {
                let score = part_heatmaps[[0, y, x, p]];
                if score > best_score {
                    best = p;
                    best_score = score;
                }
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            {
                low_res[y * seg_w + x] = best as i32;
            }
        }
    }

    // Nearest-neighbour upsampling to output size
    let mut data = Vec::with_capacity(out_width * out_height);
    for y in 0..out_height {
        let sy = (y * seg_h / out_height.max(1)).min(seg_h - 1);
        for x in 0..out_width {
            let sx = (x * seg_w / out_width.max(1)).min(seg_w - 1);
            data.push(low_res[sy * seg_w + sx]);
        }
    }

    Ok(PartSegmentation {
        width: out_width,
        height: out_height,
        data,
    })
}

/// Render a part map as a BGRA image: parts in the rainbow palette, background transparent
///
/// # Errors
///
/// Returns an error if the map is too large for an `OpenCV` image
pub fn to_colored_part_mask(segmentation: &PartSegmentation) -> Result<Mat> {
    let rows = crate::utils::safe_cast::usize_to_i32(segmentation.height)?;
    let cols = crate::utils::safe_cast::usize_to_i32(segmentation.width)?;
    let mut mask = Mat::new_rows_cols_with_default(rows, cols, CV_8UC4, Scalar::all(0.0))?;

    for y in 0..rows {
        for x in 0..cols {
            let Some(part) = segmentation
                .part_id(i32_to_usize(x)?, i32_to_usize(y)?)
                .and_then(BodyPart::from_id)
            else {
                continue;
            };
            let [r, g, b] = RAINBOW_PART_COLORS[part as usize];
            *mask.at_2d_mut::<Vec4b>(y, x)? = VecN([b, g, r, 255]);
        }
    }

    Ok(mask)
}

/// Body part segmenter running through `ONNX` Runtime
pub struct BodySegmenter {
    session: Session,
    input_size: (i32, i32),
    threshold: f32,
    segments_index: usize,
    parts_index: usize,
}

impl BodySegmenter {
    /// Load a part segmentation model from an `ONNX` file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX runtime environment cannot be created
    /// - The model file cannot be loaded
    /// - The model does not expose the two expected outputs
    pub fn new<P: AsRef<Path>>(model_path: P, threshold: f32) -> Result<Self> {
        log::info!(
            "Initializing BodySegmenter with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("body_segmenter")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?;

        // Input is NHWC; dynamic dimensions fall back to the default size
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let input_size = if input_meta.dimensions.len() >= 4 {
            let height = input_meta.dimensions[1].map_or(DEFAULT_SEGMENTATION_INPUT_SIZE, |d| d as i32);
            let width = input_meta.dimensions[2].map_or(DEFAULT_SEGMENTATION_INPUT_SIZE, |d| d as i32);
            (width, height)
        } else {
            (DEFAULT_SEGMENTATION_INPUT_SIZE, DEFAULT_SEGMENTATION_INPUT_SIZE)
        };

        if session.outputs.len() < 2 {
            return Err(Error::ModelOutputError(format!(
                "Expected segmentation and part heatmap outputs, model has {}",
                session.outputs.len()
            )));
        }
        let find_output = |needle: &str, fallback: usize| {
            session
                .outputs
                .iter()
                .position(|o| o.name.contains(needle))
                .unwrap_or(fallback)
        };
        let parts_index = find_output("part_heatmaps", 1);
        let segments_index = find_output("segments", if parts_index == 0 { 1 } else { 0 });

        Ok(Self {
            session,
            input_size,
            threshold,
            segments_index,
            parts_index,
        })
    }

    /// Segment the person in a BGR frame into body parts at frame resolution
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing, inference or decoding fails
    pub fn segment_parts(&self, frame: &Mat) -> Result<PartSegmentation> {
        let (width, height) = self.input_size;
        let input = frame_to_nhwc(frame, width, height, |v| {
            v / SEGMENTATION_NORMALIZATION_OFFSET - 1.0
        })?;
        let (segments, parts) = self.forward(input)?;

        let segmentation = decode_part_segmentation(
            segments.view(),
            parts.view(),
            self.threshold,
            i32_to_usize(frame.cols())?,
            i32_to_usize(frame.rows())?,
        )?;
        log::debug!("Person coverage {:.1}%", segmentation.coverage() * 100.0);
        Ok(segmentation)
    }

    fn forward(&self, input: Array4<f32>) -> Result<(Array4<f32>, Array4<f32>)> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let extract = |index: usize| -> Result<Array4<f32>> {
            let value = outputs
                .get(index)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing output {index}")))?;
            let tensor = value.try_extract::<f32>()?;
            let view = tensor.view();
            view.to_owned()
                .into_dimensionality::<Ix4>()
                .map_err(|e| Error::ModelDataFormatError(format!("Expected a 4D output, got {:?}: {e}", view.shape())))
        };

        Ok((extract(self.segments_index)?, extract(self.parts_index)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn outputs(h: usize, w: usize) -> (Array4<f32>, Array4<f32>) {
        (
            Array4::from_elem((1, h, w, 1), -10.0),
            Array4::zeros((1, h, w, NUM_BODY_PARTS)),
        )
    }

    #[test]
    fn test_part_ids() {
        assert_eq!(BodyPart::from_id(0), Some(BodyPart::LeftFace));
        assert_eq!(BodyPart::from_id(12), Some(BodyPart::TorsoFront));
        assert_eq!(BodyPart::from_id(23), Some(BodyPart::RightFeet));
        assert_eq!(BodyPart::from_id(BACKGROUND), None);
        assert_eq!(BodyPart::from_id(24), None);
    }

    #[test]
    fn test_decode_background() {
        let (segments, parts) = outputs(2, 2);
        let seg = decode_part_segmentation(segments.view(), parts.view(), 0.7, 4, 4).unwrap();
        assert_eq!(seg.data.len(), 16);
        assert_eq!(seg.coverage(), 0.0);
    }

    #[test]
    fn test_decode_argmax_and_upsampling() {
        let (mut segments, mut parts) = outputs(2, 2);
        // Top-left cell is a torso pixel
        segments[[0, 0, 0, 0]] = 5.0;
        parts[[0, 0, 0, 12]] = 3.0;
        parts[[0, 0, 0, 3]] = 1.0;

        let seg = decode_part_segmentation(segments.view(), parts.view(), 0.7, 4, 4).unwrap();
        // The top-left 2x2 block maps to the torso cell
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(seg.part_id(x, y), Some(12));
        }
        assert_eq!(seg.part_id(2, 0), Some(BACKGROUND));
        assert_eq!(seg.part_id(4, 0), None);
        assert!((seg.coverage() - 0.25).abs() < 1e-6);
        assert_eq!(seg.part_histogram()[12], 4);
    }

    #[test]
    fn test_decode_threshold_is_strict() {
        let (mut segments, parts) = outputs(1, 1);
        // sigmoid(0) == 0.5
        segments[[0, 0, 0, 0]] = 0.0;
        let seg = decode_part_segmentation(segments.view(), parts.view(), 0.5, 1, 1).unwrap();
        assert_eq!(seg.data, vec![BACKGROUND]);
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let segments = Array4::<f32>::zeros((1, 2, 2, 1));
        let parts = Array4::<f32>::zeros((1, 3, 2, NUM_BODY_PARTS));
        assert!(decode_part_segmentation(segments.view(), parts.view(), 0.7, 4, 4).is_err());

        let parts = Array4::<f32>::zeros((1, 2, 2, 5));
        assert!(decode_part_segmentation(segments.view(), parts.view(), 0.7, 4, 4).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_batch_and_channels() {
        let parts = Array4::<f32>::zeros((1, 2, 2, NUM_BODY_PARTS));
        for shape in [(1, 2, 2, 0), (0, 2, 2, 1), (1, 2, 2, 3)] {
            let segments = Array4::<f32>::zeros(shape);
            assert!(matches!(
                decode_part_segmentation(segments.view(), parts.view(), 0.7, 4, 4),
                Err(Error::ModelDataFormatError(_))
            ));
        }

        let segments = Array4::<f32>::zeros((1, 2, 2, 1));
        let empty_parts = Array4::<f32>::zeros((0, 2, 2, NUM_BODY_PARTS));
        assert!(decode_part_segmentation(segments.view(), empty_parts.view(), 0.7, 4, 4).is_err());
    }

    #[test]
    fn test_colored_mask() {
        let seg = PartSegmentation {
            width: 2,
            height: 1,
            data: vec![BACKGROUND, 0],
        };
        let mask = to_colored_part_mask(&seg).unwrap();
        assert_eq!(mask.typ(), CV_8UC4);
        assert_eq!(mask.at_2d::<Vec4b>(0, 0).unwrap().0, [0, 0, 0, 0]);
        // RGB [110, 64, 170] stored as BGRA
        assert_eq!(mask.at_2d::<Vec4b>(0, 1).unwrap().0, [170, 64, 110, 255]);
    }
}
