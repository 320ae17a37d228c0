//! Configuration management for the overlay application

use crate::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_EYEWEAR_DEPTH, DEFAULT_EYEWEAR_PADDING, DEFAULT_EYEWEAR_TARGET_WIDTH,
    DEFAULT_MARKER_THRESHOLD, DEFAULT_MASK_OPACITY, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REFRESH_FPS,
    DEFAULT_SEGMENTATION_THRESHOLD,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Model file paths
    pub models: ModelConfig,

    /// Overlay asset paths
    pub assets: AssetConfig,

    /// Overlay geometry parameters
    pub overlay: OverlayConfig,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Display and pacing configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// MoveNet single-pose lightning model
    pub movenet_lightning: PathBuf,

    /// MoveNet single-pose thunder model
    pub movenet_thunder: PathBuf,

    /// Body part segmentation model
    pub body_parts: PathBuf,

    /// Person probability above which a pixel belongs to the body (0.0-1.0)
    pub segmentation_threshold: f32,
}

/// Overlay asset paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// 2D eyewear image
    pub eyewear_image: PathBuf,

    /// 2D garment image
    pub garment_image: PathBuf,

    /// Texture of the 3D eyewear billboard
    pub eyewear_model: PathBuf,

    /// Bounding box extent of the eyewear model (x, y, z)
    pub eyewear_model_extent: [f32; 3],

    /// Texture of the 3D garment billboard
    pub garment_model: PathBuf,

    /// Bounding box extent of the garment model (x, y, z)
    pub garment_model_extent: [f32; 3],
}

/// Overlay geometry parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Score a keypoint must exceed to drive an overlay
    pub confidence_threshold: f32,

    /// Score a keypoint must exceed to be drawn as a marker
    pub marker_threshold: f32,

    /// Pixels added to the eye distance for 2D eyewear
    pub eyewear_padding: f32,

    /// Target pixel width for 3D eyewear
    pub eyewear_target_width: f32,

    /// Depth of the 3D eyewear
    pub eyewear_depth: f32,

    /// Opacity of the body part mask
    pub mask_opacity: f32,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Webcam index
    pub index: i32,

    /// Requested frame width (0 keeps the driver default)
    pub width: u32,

    /// Requested frame height (0 keeps the driver default)
    pub height: u32,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show a window
    pub gui: bool,

    /// Display refresh rate driving the per-frame views
    pub refresh_fps: u32,

    /// Period of the interval-driven views in milliseconds
    pub poll_interval_ms: u64,

    /// Mirror the camera image horizontally
    pub mirror: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            movenet_lightning: PathBuf::from("assets/movenet_lightning.onnx"),
            movenet_thunder: PathBuf::from("assets/movenet_thunder.onnx"),
            body_parts: PathBuf::from("assets/bodypix.onnx"),
            segmentation_threshold: DEFAULT_SEGMENTATION_THRESHOLD,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            eyewear_image: PathBuf::from("assets/glasses.png"),
            garment_image: PathBuf::from("assets/mobi.png"),
            eyewear_model: PathBuf::from("assets/glass.png"),
            eyewear_model_extent: [2.0, 0.7, 0.3],
            garment_model: PathBuf::from("assets/blue.png"),
            garment_model_extent: [1.0, 1.6, 0.4],
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            marker_threshold: DEFAULT_MARKER_THRESHOLD,
            eyewear_padding: DEFAULT_EYEWEAR_PADDING,
            eyewear_target_width: DEFAULT_EYEWEAR_TARGET_WIDTH,
            eyewear_depth: DEFAULT_EYEWEAR_DEPTH,
            mask_opacity: DEFAULT_MASK_OPACITY,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            gui: true,
            refresh_fps: DEFAULT_REFRESH_FPS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            mirror: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate value ranges
    ///
    /// Model and asset files are not required to exist: a missing file only
    /// leaves the corresponding overlay idle at runtime.
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.overlay.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !unit.contains(&self.overlay.marker_threshold) {
            return Err(Error::ConfigError(
                "Marker threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !unit.contains(&self.overlay.mask_opacity) {
            return Err(Error::ConfigError("Mask opacity must be between 0.0 and 1.0".to_string()));
        }
        if !unit.contains(&self.models.segmentation_threshold) {
            return Err(Error::ConfigError(
                "Segmentation threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        // Coincident eyes must still produce a visible overlay
        if !(self.overlay.eyewear_padding > 0.0) {
            return Err(Error::ConfigError("Eyewear padding must be greater than 0".to_string()));
        }
        if !(self.overlay.eyewear_target_width > 0.0) {
            return Err(Error::ConfigError(
                "Eyewear target width must be greater than 0".to_string(),
            ));
        }

        for (name, extent) in [
            ("eyewear", self.assets.eyewear_model_extent),
            ("garment", self.assets.garment_model_extent),
        ] {
            if !(extent[0] > 0.0 && extent[1] > 0.0) {
                return Err(Error::ConfigError(format!(
                    "The {name} model extent must have positive width and height"
                )));
            }
        }

        if self.display.refresh_fps == 0 {
            return Err(Error::ConfigError("Refresh rate must be greater than 0".to_string()));
        }
        if self.display.poll_interval_ms == 0 {
            return Err(Error::ConfigError("Poll interval must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pose Overlay Configuration

# Model paths
models:
  movenet_lightning: "assets/movenet_lightning.onnx"
  movenet_thunder: "assets/movenet_thunder.onnx"
  body_parts: "assets/bodypix.onnx"
  segmentation_threshold: 0.7

# Overlay assets
assets:
  eyewear_image: "assets/glasses.png"
  garment_image: "assets/mobi.png"
  eyewear_model: "assets/glass.png"
  eyewear_model_extent: [2.0, 0.7, 0.3]
  garment_model: "assets/blue.png"
  garment_model_extent: [1.0, 1.6, 0.4]

# Overlay geometry
overlay:
  confidence_threshold: 0.5
  marker_threshold: 0.3
  eyewear_padding: 50.0
  eyewear_target_width: 200.0
  eyewear_depth: -1.0
  mask_opacity: 0.7

# Camera
camera:
  index: 0
  width: 640
  height: 480

# Display settings
display:
  gui: true
  refresh_fps: 60
  poll_interval_ms: 100
  mirror: false
"#;
