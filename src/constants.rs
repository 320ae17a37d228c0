//! Constants used throughout the application

/// Number of keypoints produced by MoveNet (COCO layout)
pub const NUM_KEYPOINTS: usize = 17;

/// Number of body parts produced by the part segmentation model
pub const NUM_BODY_PARTS: usize = 24;

/// Minimum keypoint score for a keypoint to drive an overlay
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Minimum keypoint score for a keypoint marker to be drawn
pub const DEFAULT_MARKER_THRESHOLD: f32 = 0.3;

/// Radius of keypoint markers in pixels
pub const KEYPOINT_MARKER_RADIUS: i32 = 5;

/// Pixels added to the eye distance when sizing 2D eyewear
pub const DEFAULT_EYEWEAR_PADDING: f32 = 50.0;

/// Pixel width the 3D eyewear is scaled to, relative to the frame width
pub const DEFAULT_EYEWEAR_TARGET_WIDTH: f32 = 200.0;

/// Depth at which 3D eyewear is placed
pub const DEFAULT_EYEWEAR_DEPTH: f32 = -1.0;

/// Input sizes of the MoveNet variants
pub const MOVENET_LIGHTNING_INPUT_SIZE: i32 = 192;
pub const MOVENET_THUNDER_INPUT_SIZE: i32 = 256;

/// Part segmentation defaults
pub const DEFAULT_SEGMENTATION_INPUT_SIZE: i32 = 257;
pub const DEFAULT_SEGMENTATION_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MASK_OPACITY: f32 = 0.7;

/// Image normalization for the segmentation model (maps [0, 255] to [-1, 1])
pub const SEGMENTATION_NORMALIZATION_OFFSET: f32 = 127.5;

/// Loop pacing defaults
pub const DEFAULT_REFRESH_FPS: u32 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Scene camera defaults
pub const DEFAULT_FOV_DEGREES: f32 = 75.0;
pub const DEFAULT_NEAR_PLANE: f32 = 0.1;
pub const DEFAULT_FAR_PLANE: f32 = 1000.0;
pub const DEFAULT_CAMERA_Z: f32 = 5.0;

/// Asset preview canvas
pub const PREVIEW_CANVAS_SIZE: i32 = 600;
pub const PREVIEW_CAMERA_Z: f32 = 1.0;
pub const PREVIEW_TARGET_WIDTH: f32 = 30.0;

/// Numeric precision epsilon
pub const EPSILON: f32 = 1e-6;
