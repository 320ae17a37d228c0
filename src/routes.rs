//! Named routes and the view each one mounts.

use crate::{
    asset::{EYEWEAR_IMAGE, EYEWEAR_MODEL, GARMENT_IMAGE, GARMENT_MODEL},
    config::Config,
    constants::{DEFAULT_CAMERA_Z, PREVIEW_CAMERA_Z, PREVIEW_CANVAS_SIZE, PREVIEW_TARGET_WIDTH},
    inference::ModelSelector,
    loop_driver::Pacing,
    overlay::{OverlayKind, Transform3d},
    render::RendererKind,
    scene::{Scene, SceneCamera},
    view::{SourceKind, ViewSpec},
    Error, Result,
};
use nalgebra::{UnitQuaternion, Vector3};
use opencv::core::Scalar;
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Position of the static garment in the body part view
const STATIC_GARMENT_POSITION: [f32; 3] = [0.0, -1.0, 0.0];
/// Scale of the static garment relative to its extent
const STATIC_GARMENT_SCALE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Route list
    Welcome,
    /// 3D asset preview on a blank canvas
    Load,
    /// 3D eyewear following the face
    Posenet,
    /// Keypoint markers
    PoseDetection,
    /// Body part mask with a static 3D garment
    BodyDetection,
    /// 2D garment between shoulders and hips
    Dress,
    /// 2D eyewear over the eyes
    Eyewear,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Self::Welcome,
        Self::Load,
        Self::Posenet,
        Self::PoseDetection,
        Self::BodyDetection,
        Self::Dress,
        Self::Eyewear,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Welcome => "/",
            Self::Load => "/load",
            Self::Posenet => "/posenet",
            Self::PoseDetection => "/pose-detection",
            Self::BodyDetection => "/body-detection",
            Self::Dress => "/dress",
            Self::Eyewear => "/eyewear",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Load => "Asset Preview",
            Self::Posenet => "3D Eyewear",
            Self::PoseDetection => "Pose Detection",
            Self::BodyDetection => "Body Part Detection",
            Self::Dress => "Garment Try-On",
            Self::Eyewear => "Eyewear Try-On",
        }
    }

    /// The view mounted for this route; the welcome route mounts none
    #[must_use]
    pub fn view_spec(self, config: &Config) -> Option<ViewSpec> {
        let overlay = &config.overlay;
        let refresh = Pacing::Refresh {
            fps: config.display.refresh_fps,
        };
        let camera_view = |model, overlays, renderer, pacing| ViewSpec {
            title: self.title().to_string(),
            source: SourceKind::Camera,
            model: Some(model),
            overlays,
            renderer,
            pacing,
        };

        match self {
            Self::Welcome => None,

            Self::Load => {
                let extent = Vector3::from(config.assets.eyewear_model_extent);
                Some(ViewSpec {
                    title: self.title().to_string(),
                    source: SourceKind::Blank {
                        width: PREVIEW_CANVAS_SIZE,
                        height: PREVIEW_CANVAS_SIZE,
                        color: Scalar::all(255.0),
                    },
                    model: None,
                    overlays: vec![OverlayKind::StaticObject {
                        asset: EYEWEAR_MODEL.to_string(),
                        transform: preview_transform(extent),
                    }],
                    renderer: RendererKind::Scene {
                        camera_z: PREVIEW_CAMERA_Z,
                    },
                    pacing: refresh,
                })
            }

            Self::Posenet => Some(camera_view(
                ModelSelector::MoveNetLightning,
                vec![OverlayKind::Eyewear3d {
                    asset: EYEWEAR_MODEL.to_string(),
                    threshold: overlay.confidence_threshold,
                    target_width: overlay.eyewear_target_width,
                    depth: overlay.eyewear_depth,
                }],
                RendererKind::Scene {
                    camera_z: DEFAULT_CAMERA_Z,
                },
                refresh,
            )),

            Self::PoseDetection => Some(camera_view(
                ModelSelector::MoveNetLightning,
                vec![OverlayKind::KeypointMarkers {
                    threshold: overlay.marker_threshold,
                }],
                RendererKind::Canvas,
                refresh,
            )),

            Self::BodyDetection => {
                let extent = Vector3::from(config.assets.garment_model_extent);
                Some(camera_view(
                    ModelSelector::BodyParts,
                    vec![
                        OverlayKind::PartMask {
                            opacity: overlay.mask_opacity,
                        },
                        OverlayKind::StaticObject {
                            asset: GARMENT_MODEL.to_string(),
                            transform: Transform3d::fixed(
                                Vector3::from(STATIC_GARMENT_POSITION),
                                extent * STATIC_GARMENT_SCALE,
                                UnitQuaternion::identity(),
                            ),
                        },
                    ],
                    RendererKind::Scene {
                        camera_z: DEFAULT_CAMERA_Z,
                    },
                    refresh,
                ))
            }

            Self::Dress => Some(camera_view(
                ModelSelector::MoveNetLightning,
                vec![
                    OverlayKind::KeypointMarkers {
                        threshold: overlay.confidence_threshold,
                    },
                    OverlayKind::Garment {
                        asset: GARMENT_IMAGE.to_string(),
                        threshold: overlay.confidence_threshold,
                    },
                ],
                RendererKind::Canvas,
                Pacing::Interval(Duration::from_millis(config.display.poll_interval_ms)),
            )),

            Self::Eyewear => Some(camera_view(
                ModelSelector::MoveNetLightning,
                vec![OverlayKind::Eyewear2d {
                    asset: EYEWEAR_IMAGE.to_string(),
                    threshold: overlay.confidence_threshold,
                    padding: overlay.eyewear_padding,
                }],
                RendererKind::Canvas,
                refresh,
            )),
        }
    }
}

/// Placement of the previewed model: at the origin, turned half a revolution
/// about y, sized so its width is `PREVIEW_TARGET_WIDTH / viewport_width`
#[must_use]
pub fn preview_transform(extent: Vector3<f32>) -> Transform3d {
    #[allow(clippy::cast_precision_loss)]
    let size = PREVIEW_CANVAS_SIZE as f32;
    let scene = Scene::new(SceneCamera::at_z(PREVIEW_CAMERA_Z), (size, size));
    let viewport_width = scene.viewport_width_at(PREVIEW_CAMERA_Z);
    let scale = (PREVIEW_TARGET_WIDTH / viewport_width) / extent.x;

    Transform3d::fixed(
        Vector3::zeros(),
        extent * scale,
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI),
    )
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = if s.starts_with('/') { s.to_string() } else { format!("/{s}") };
        Self::ALL
            .iter()
            .copied()
            .find(|route| route.path() == normalized)
            .ok_or_else(|| Error::UnknownRoute(s.to_string()))
    }
}
