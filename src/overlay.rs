//! Overlay transform calculators.
//!
//! Each calculator turns the keypoints of one detection into the placement of
//! one overlay. A calculator consumes only keypoints whose score is strictly
//! above its threshold; if any required keypoint fails the gate, it yields
//! nothing for that frame.

use crate::{
    asset::AssetStore,
    body_segmentation::PartSegmentation,
    constants::{EPSILON, KEYPOINT_MARKER_RADIUS},
    inference::Detection,
    keypoint::{Keypoint, KeypointName, Pose},
    utils::safe_cast::round_to_pixel,
    Result,
};
use nalgebra::{UnitQuaternion, Vector3};
use opencv::core::{Rect, Scalar};

/// Screen-space placement of a 2D overlay, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl OverlayRect {
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle of the given size centred on a point
    #[must_use]
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when the rectangle has no drawable area or is not finite
    ///
    /// A garment whose hips are detected above the neckline comes out with a
    /// negative height and is degenerate.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let finite = self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite();
        !finite || self.width <= 0.0 || self.height <= 0.0
    }

    /// Round to integer pixels
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate is not representable as a pixel
    pub fn to_pixel_rect(&self) -> Result<Rect> {
        Ok(Rect::new(
            round_to_pixel(self.x)?,
            round_to_pixel(self.y)?,
            round_to_pixel(self.width)?,
            round_to_pixel(self.height)?,
        ))
    }
}

/// Place a 2D eyewear image over the eyes
///
/// The width is the eye distance plus `padding`, the height keeps the
/// image's natural aspect ratio and the rectangle is centred between the eyes.
#[must_use]
pub fn eyewear_rect(
    left_eye: &Keypoint,
    right_eye: &Keypoint,
    asset_size: (f32, f32),
    threshold: f32,
    padding: f32,
) -> Option<OverlayRect> {
    if !(left_eye.is_confident(threshold) && right_eye.is_confident(threshold)) {
        return None;
    }
    let (natural_width, natural_height) = asset_size;
    if natural_width <= EPSILON || natural_height <= EPSILON {
        return None;
    }

    let width = left_eye.distance_to(right_eye) + padding;
    let height = width * natural_height / natural_width;
    let (cx, cy) = left_eye.midpoint(right_eye);

    Some(OverlayRect::centered(cx, cy, width, height))
}

/// Place a 2D garment between the shoulders and the hips
///
/// The top edge sits on the neckline (shoulder midpoint), the bottom edge on
/// the higher of the two hips. The result is returned as computed even when
/// the hips lie above the neckline; see [`OverlayRect::is_degenerate`].
#[must_use]
pub fn garment_rect(
    left_shoulder: &Keypoint,
    right_shoulder: &Keypoint,
    left_hip: &Keypoint,
    right_hip: &Keypoint,
    threshold: f32,
) -> Option<OverlayRect> {
    let points = [left_shoulder, right_shoulder, left_hip, right_hip];
    if !points.iter().all(|k| k.is_confident(threshold)) {
        return None;
    }

    let min_x = points.iter().map(|k| k.x).fold(f32::INFINITY, f32::min);
    let max_x = points.iter().map(|k| k.x).fold(f32::NEG_INFINITY, f32::max);
    let neck_y = (left_shoulder.y + right_shoulder.y) / 2.0;
    let bottom = left_hip.y.min(right_hip.y);

    Some(OverlayRect::new(min_x, neck_y, max_x - min_x, bottom - neck_y))
}

/// Map a pixel position to normalized device coordinates
///
/// The frame centre maps to `(0, 0)`, the top-left corner to `(-1, 1)`.
#[must_use]
pub fn to_ndc(x: f32, y: f32, frame_width: f32, frame_height: f32) -> (f32, f32) {
    (x / frame_width * 2.0 - 1.0, -(y / frame_height) * 2.0 + 1.0)
}

/// How a 3D object is oriented when rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    /// Re-oriented every render to face the camera
    FaceCamera,
    Fixed(UnitQuaternion<f32>),
}

/// Placement of a 3D object in scene space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3d {
    pub position: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub orientation: Orientation,
}

impl Transform3d {
    #[must_use]
    pub fn fixed(position: Vector3<f32>, scale: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            position,
            scale,
            orientation: Orientation::Fixed(rotation),
        }
    }
}

/// Place 3D eyewear on the face
///
/// Horizontally centred between the eyes and vertically on the nose, sized to
/// `target_width_px` of the frame and kept at the model's aspect ratio.
#[must_use]
pub fn eyewear_transform(
    pose: &Pose,
    frame_size: (f32, f32),
    aspect: f32,
    threshold: f32,
    target_width_px: f32,
    depth: f32,
) -> Option<Transform3d> {
    let left_eye = pose.confident(KeypointName::LeftEye, threshold)?;
    let right_eye = pose.confident(KeypointName::RightEye, threshold)?;
    let nose = pose.confident(KeypointName::Nose, threshold)?;

    let (frame_width, frame_height) = frame_size;
    if frame_width <= EPSILON || frame_height <= EPSILON || aspect <= EPSILON {
        return None;
    }

    let (center_x, _) = left_eye.midpoint(right_eye);
    let (ndc_x, ndc_y) = to_ndc(center_x, nose.y, frame_width, frame_height);

    let w = target_width_px / frame_width;
    let h = w / aspect;

    Some(Transform3d {
        position: Vector3::new(ndc_x, ndc_y, depth),
        scale: Vector3::new(w, h, w),
        orientation: Orientation::FaceCamera,
    })
}

/// One renderable item derived from one detection
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Filled circle on a keypoint
    Marker { x: f32, y: f32, radius: i32, color: Scalar },
    /// Image asset stretched into a rectangle
    Image { asset: String, rect: OverlayRect },
    /// Textured model placed in the 3D scene
    Object { asset: String, transform: Transform3d },
    /// Colour part mask blended over the frame
    PartMask { segmentation: PartSegmentation, opacity: f32 },
}

/// Marker colour (BGR red)
#[must_use]
pub fn marker_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 255.0)
}

/// An overlay stage of a view, evaluated once per detection
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    /// Dots on every keypoint above the threshold
    KeypointMarkers { threshold: f32 },
    /// 2D garment image between shoulders and hips
    Garment { asset: String, threshold: f32 },
    /// 2D eyewear image over the eyes
    Eyewear2d { asset: String, threshold: f32, padding: f32 },
    /// Billboarded 3D eyewear
    Eyewear3d {
        asset: String,
        threshold: f32,
        target_width: f32,
        depth: f32,
    },
    /// Colour part mask
    PartMask { opacity: f32 },
    /// 3D object at a fixed placement, independent of the detection
    StaticObject { asset: String, transform: Transform3d },
}

impl OverlayKind {
    /// Asset key this stage is gated on
    #[must_use]
    pub fn required_asset(&self) -> Option<&str> {
        match self {
            Self::Garment { asset, .. }
            | Self::Eyewear2d { asset, .. }
            | Self::Eyewear3d { asset, .. }
            | Self::StaticObject { asset, .. } => Some(asset),
            Self::KeypointMarkers { .. } | Self::PartMask { .. } => None,
        }
    }

    /// Overlays for one frame
    ///
    /// Returns nothing when the required asset is not loaded, when the
    /// detection carries no usable data for this stage, or when a keypoint
    /// fails the confidence gate.
    #[must_use]
    pub fn compute(&self, detection: Option<&Detection>, frame_size: (f32, f32), assets: &AssetStore) -> Vec<Overlay> {
        if let Some(key) = self.required_asset() {
            if !assets.contains(key) {
                log::debug!("Asset '{key}' not loaded, skipping overlay");
                return Vec::new();
            }
        }

        let pose = detection.and_then(Detection::primary_pose);

        match self {
            Self::KeypointMarkers { threshold } => pose
                .map(|pose| {
                    pose.confident_keypoints(*threshold)
                        .map(|k| Overlay::Marker {
                            x: k.x,
                            y: k.y,
                            radius: KEYPOINT_MARKER_RADIUS,
                            color: marker_color(),
                        })
                        .collect()
                })
                .unwrap_or_default(),

            Self::Garment { asset, threshold } => pose
                .and_then(|pose| {
                    garment_rect(
                        pose.get(KeypointName::LeftShoulder)?,
                        pose.get(KeypointName::RightShoulder)?,
                        pose.get(KeypointName::LeftHip)?,
                        pose.get(KeypointName::RightHip)?,
                        *threshold,
                    )
                })
                .map(|rect| Overlay::Image {
                    asset: asset.clone(),
                    rect,
                })
                .into_iter()
                .collect(),

            Self::Eyewear2d {
                asset,
                threshold,
                padding,
            } => {
                let Some(size) = assets.image(asset).map(|image| image.natural_size()) else {
                    return Vec::new();
                };
                pose.and_then(|pose| {
                    eyewear_rect(
                        pose.get(KeypointName::LeftEye)?,
                        pose.get(KeypointName::RightEye)?,
                        size,
                        *threshold,
                        *padding,
                    )
                })
                .map(|rect| Overlay::Image {
                    asset: asset.clone(),
                    rect,
                })
                .into_iter()
                .collect()
            }

            Self::Eyewear3d {
                asset,
                threshold,
                target_width,
                depth,
            } => {
                let Some(model) = assets.model(asset) else {
                    return Vec::new();
                };
                let extent = model.extent;
                pose.and_then(|pose| {
                    eyewear_transform(pose, frame_size, model.aspect_ratio(), *threshold, *target_width, *depth)
                })
                // Scale is relative to the model's own size
                .map(|transform| Overlay::Object {
                    asset: asset.clone(),
                    transform: Transform3d {
                        scale: transform.scale.component_mul(&extent),
                        ..transform
                    },
                })
                .into_iter()
                .collect()
            }

            Self::PartMask { opacity } => detection
                .and_then(Detection::parts)
                .map(|segmentation| Overlay::PartMask {
                    segmentation: segmentation.clone(),
                    opacity: *opacity,
                })
                .into_iter()
                .collect(),

            Self::StaticObject { asset, transform } => vec![Overlay::Object {
                asset: asset.clone(),
                transform: *transform,
            }],
        }
    }
}
