//! Application wiring: mounts the view for a route and presents it.

use crate::{
    camera::VideoSource,
    config::Config,
    error::{Error, Result},
    loop_driver::{LoopControl, LoopDriver, LoopSummary},
    routes::Route,
    view::{CycleOutcome, DetectionView},
};
use log::{info, warn};
use opencv::highgui::{self, WINDOW_NORMAL};
use std::fmt::Write as _;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Route whose view is mounted
    pub route: Route,
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// Show the view in a window
    pub gui: bool,
    /// Stop after this many rendered frames
    pub max_frames: Option<u64>,
    /// File configuration
    pub config: Config,
}

/// What a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub loop_summary: LoopSummary,
    pub frames: u64,
}

/// Route list shown by the welcome route
#[must_use]
pub fn welcome_text() -> String {
    let mut text = String::from("Available views:\n");
    for route in Route::ALL.iter().filter(|r| **r != Route::Welcome) {
        let _ = writeln!(text, "  {:<16} {}", route.path(), route.title());
    }
    text
}

/// Main application struct
pub struct OverlayApp {
    view: DetectionView,
    gui: bool,
    max_frames: Option<u64>,
}

impl OverlayApp {
    /// Mount the view for the configured route
    ///
    /// # Errors
    ///
    /// Returns an error if the route mounts no view or the window cannot be
    /// created
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing overlay application for route {}", config.route);

        let spec = config
            .route
            .view_spec(&config.config)
            .ok_or_else(|| Error::InvalidInput(format!("Route {} has no view", config.route)))?;
        let view = DetectionView::from_spec(&spec, &config.config, &config.video_source);

        Self::with_view(view, config.gui, config.max_frames)
    }

    /// Wrap an already built view
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created
    pub fn with_view(view: DetectionView, gui: bool, max_frames: Option<u64>) -> Result<Self> {
        if gui {
            highgui::named_window(view.title(), WINDOW_NORMAL)?;
        }
        Ok(Self { view, gui, max_frames })
    }

    /// Run the view until the user quits, the source ends or the frame limit
    /// is reached
    ///
    /// # Errors
    ///
    /// Returns an error only if the window cannot be updated
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting main application loop");

        let token = self.view.token();
        let driver = LoopDriver::new(self.view.pacing());
        let gui = self.gui;
        let max_frames = self.max_frames;
        let view = &mut self.view;
        let mut frames = 0u64;

        let loop_summary = driver.run(&token, || {
            match view.cycle() {
                CycleOutcome::Rendered { canvas, .. } => {
                    frames += 1;
                    if gui {
                        highgui::imshow(view.title(), &canvas)?;
                    }
                }
                CycleOutcome::EndOfStream => return Ok(LoopControl::Break),
                CycleOutcome::Idle if !gui => {
                    warn!("No frame source and no window, stopping");
                    return Ok(LoopControl::Break);
                }
                CycleOutcome::Idle | CycleOutcome::NotReady | CycleOutcome::Skipped => {}
            }

            if gui {
                let key = highgui::wait_key(1)?;
                if key == 27 || key == i32::from(b'q') {
                    info!("Exit requested by user");
                    return Ok(LoopControl::Break);
                }
            }

            if max_frames.is_some_and(|max| frames >= max) {
                info!("Reached frame limit of {frames}");
                return Ok(LoopControl::Break);
            }
            Ok(LoopControl::Continue)
        });

        info!("Application shutting down after {frames} frames");
        Ok(RunSummary { loop_summary, frames })
    }

    #[must_use]
    pub fn view(&self) -> &DetectionView {
        &self.view
    }
}
