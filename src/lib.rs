//! Pose-driven overlays for live video.
//!
//! This library places computer-generated imagery on a webcam feed using:
//! - ONNX Runtime for pose detection and body part segmentation
//! - `OpenCV` for capture, image compositing and display
//! - `nalgebra` for the 3D billboard scene
//!
//! Every frame goes through the same pipeline:
//! 1. A [`camera::FrameSource`] delivers a frame
//! 2. An [`inference::InferenceAdapter`] turns it into a [`inference::Detection`]
//! 3. Each [`overlay::OverlayKind`] stage computes its overlays from the detection
//! 4. A [`render::Renderer`] composites them onto a fresh copy of the frame
//!
//! # Examples
//!
//! ## Placing eyewear
//!
//! ```
//! use pose_overlay::keypoint::{Keypoint, KeypointName};
//! use pose_overlay::overlay::eyewear_rect;
//!
//! let left = Keypoint::new(KeypointName::LeftEye, 100.0, 200.0, 0.9);
//! let right = Keypoint::new(KeypointName::RightEye, 140.0, 200.0, 0.9);
//!
//! // A 2:1 image, padded by 50 px
//! let rect = eyewear_rect(&left, &right, (200.0, 100.0), 0.5, 50.0).unwrap();
//! assert_eq!(rect.center(), (120.0, 200.0));
//! assert_eq!(rect.width, 90.0);
//! assert_eq!(rect.height, 45.0);
//! ```
//!
//! ## Running a view
//!
//! ```no_run
//! use pose_overlay::{camera::VideoSource, config::Config, routes::Route, view::DetectionView};
//!
//! let config = Config::default();
//! let spec = Route::Eyewear.view_spec(&config).unwrap();
//! let mut view = DetectionView::from_spec(&spec, &config, &VideoSource::Camera(0));
//!
//! for _ in 0..100 {
//!     view.cycle();
//! }
//! ```

/// Keypoint names and per-frame poses
pub mod keypoint;

/// MoveNet single-pose detection
pub mod pose_detection;

/// Body part segmentation and colour part masks
pub mod body_segmentation;

/// Common interface over the detection models
pub mod inference;

/// Keypoint-to-overlay placement
pub mod overlay;

/// Overlay images and model billboards
pub mod asset;

/// Perspective camera and 3D projection
pub mod scene;

/// Overlay compositing
pub mod render;

/// Webcam, video file and blank frame sources
pub mod camera;

/// Paced, cancellable cycle loop
pub mod loop_driver;

/// The parameterized detection view
pub mod view;

/// Named routes
pub mod routes;

/// Utility functions for pixel geometry and tensor conversion
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
