//! The detection view: one source, one model, a list of overlay stages and a
//! renderer, configured by a [`ViewSpec`].

use crate::{
    asset::AssetStore,
    camera::{BlankSource, CameraSource, FrameSource, VideoSource},
    config::Config,
    inference::{load_model, Detection, InferenceAdapter, ModelSelector},
    loop_driver::{CancellationToken, Pacing},
    overlay::{Overlay, OverlayKind},
    render::{Renderer, RendererKind},
};
use log::{debug, error, info, warn};
use opencv::{
    core::{Mat, Scalar},
    prelude::*,
};

/// Where a view takes its frames from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// The configured webcam or video file
    Camera,
    /// Solid frames of a fixed size
    Blank { width: i32, height: i32, color: Scalar },
}

/// Configuration of one detection view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpec {
    pub title: String,
    pub source: SourceKind,
    pub model: Option<ModelSelector>,
    pub overlays: Vec<OverlayKind>,
    pub renderer: RendererKind,
    pub pacing: Pacing,
}

/// Result of one view cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// No frame source; nothing to do
    Idle,
    /// The source has no frame yet
    NotReady,
    /// Capture, inference or rendering failed; nothing was drawn
    Skipped,
    /// A fresh canvas with this cycle's overlays
    Rendered { canvas: Mat, overlays: usize },
    /// A finite source has no more frames
    EndOfStream,
}

/// Per-view cycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub rendered: u64,
    pub skipped: u64,
    pub not_ready: u64,
    pub idle: u64,
}

/// A running view
///
/// The view owns its source, model and renderer. Dropping it cancels its
/// token so a loop driving it stops before scheduling another cycle.
pub struct DetectionView {
    title: String,
    source: Option<Box<dyn FrameSource>>,
    model: Option<Box<dyn InferenceAdapter>>,
    overlays: Vec<OverlayKind>,
    renderer: Box<dyn Renderer>,
    assets: AssetStore,
    pacing: Pacing,
    token: CancellationToken,
    stats: ViewStats,
}

impl DetectionView {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        source: Option<Box<dyn FrameSource>>,
        model: Option<Box<dyn InferenceAdapter>>,
        overlays: Vec<OverlayKind>,
        renderer: Box<dyn Renderer>,
        assets: AssetStore,
        pacing: Pacing,
    ) -> Self {
        Self {
            title: title.into(),
            source,
            model,
            overlays,
            renderer,
            assets,
            pacing,
            token: CancellationToken::new(),
            stats: ViewStats::default(),
        }
    }

    /// Build a view from a [`ViewSpec`]
    ///
    /// A source or model that fails to open is logged and left out: without a
    /// source the view idles, without a model it renders frames with only the
    /// detection-independent overlays.
    #[must_use]
    pub fn from_spec(spec: &ViewSpec, config: &Config, video: &VideoSource) -> Self {
        info!("Mounting view '{}'", spec.title);

        let source: Option<Box<dyn FrameSource>> = match &spec.source {
            SourceKind::Camera => match CameraSource::open(video, &config.camera, config.display.mirror) {
                Ok(camera) => Some(Box::new(camera)),
                Err(e) => {
                    error!("Failed to open video source: {e}");
                    None
                }
            },
            SourceKind::Blank { width, height, color } => Some(Box::new(BlankSource::new(*width, *height, *color))),
        };

        let model = spec.model.and_then(|selector| match load_model(selector, &config.models) {
            Ok(model) => {
                info!("Loaded model {}", model.name());
                Some(model)
            }
            Err(e) => {
                error!("Failed to load model {selector}: {e}");
                None
            }
        });

        let assets = if spec.overlays.iter().any(|kind| kind.required_asset().is_some()) {
            AssetStore::load_from_config(&config.assets)
        } else {
            AssetStore::new()
        };

        Self::new(
            spec.title.clone(),
            source,
            model,
            spec.overlays.clone(),
            spec.renderer.build(),
            assets,
            spec.pacing,
        )
    }

    /// Run one capture-infer-render cycle
    ///
    /// Failures are logged and reported as [`CycleOutcome::Skipped`]; they
    /// never propagate. Every rendered canvas starts as a copy of the new
    /// frame so nothing from an earlier cycle remains.
    pub fn cycle(&mut self) -> CycleOutcome {
        let Some(source) = self.source.as_mut() else {
            self.stats.idle += 1;
            return CycleOutcome::Idle;
        };

        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) if source.is_exhausted() => return CycleOutcome::EndOfStream,
            Ok(None) => {
                self.stats.not_ready += 1;
                return CycleOutcome::NotReady;
            }
            Err(e) => {
                warn!("Frame capture failed: {e}");
                self.stats.skipped += 1;
                return CycleOutcome::Skipped;
            }
        };

        let detection = match self.model.as_mut().map(|model| model.infer(&frame)).transpose() {
            Ok(detection) => detection,
            Err(e) => {
                warn!("Inference failed, skipping frame: {e}");
                self.stats.skipped += 1;
                return CycleOutcome::Skipped;
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let frame_size = (frame.cols() as f32, frame.rows() as f32);
        let overlays = self.compute_overlays(detection.as_ref(), frame_size);

        let mut canvas = frame;
        if let Err(e) = self.renderer.render(&mut canvas, &overlays, &self.assets) {
            warn!("Rendering with {} failed: {e}", self.renderer.name());
            self.stats.skipped += 1;
            return CycleOutcome::Skipped;
        }

        debug!("Rendered {} overlays", overlays.len());
        self.stats.rendered += 1;
        CycleOutcome::Rendered {
            canvas,
            overlays: overlays.len(),
        }
    }

    fn compute_overlays(&self, detection: Option<&Detection>, frame_size: (f32, f32)) -> Vec<Overlay> {
        self.overlays
            .iter()
            .flat_map(|kind| kind.compute(detection, frame_size, &self.assets))
            .collect()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Token cancelled when the view is torn down
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn stats(&self) -> ViewStats {
        self.stats
    }

    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

impl Drop for DetectionView {
    fn drop(&mut self) {
        self.token.cancel();
        info!(
            "Unmounted view '{}' ({} rendered, {} skipped)",
            self.title, self.stats.rendered, self.stats.skipped
        );
    }
}
