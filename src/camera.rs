//! Frame sources: webcam or video file through `OpenCV`, and solid blank frames.

use crate::{config::CameraConfig, Error, Result};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// A stream of BGR frames
pub trait FrameSource {
    /// Current frame size `(width, height)`
    fn frame_size(&self) -> (i32, i32);

    /// Next frame, or `Ok(None)` when no frame is ready yet
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails
    fn read_frame(&mut self) -> Result<Option<Mat>>;

    /// Whether the source ends (a video file) rather than streaming forever
    fn is_finite(&self) -> bool {
        false
    }

    /// Whether a finite source has been read to its end
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Webcam or video file opened through `OpenCV`
pub struct CameraSource {
    capture: VideoCapture,
    source: VideoSource,
    mirror: bool,
    size: (i32, i32),
    exhausted: bool,
    pending: Option<Mat>,
}

impl CameraSource {
    /// Open a webcam or video file
    ///
    /// Webcams use a one-frame buffer so every read returns the latest image.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or file cannot be opened
    pub fn open(source: &VideoSource, config: &CameraConfig, mirror: bool) -> Result<Self> {
        let mut capture = match source {
            VideoSource::Camera(index) => {
                info!("Opening camera {index}");
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                if config.width > 0 && config.height > 0 {
                    cap.set(CAP_PROP_FRAME_WIDTH, f64::from(config.width))?;
                    cap.set(CAP_PROP_FRAME_HEIGHT, f64::from(config.height))?;
                }
                cap
            }
            VideoSource::File(path) => {
                info!("Opening video file: {path}");
                VideoCapture::from_file(path, videoio::CAP_ANY)?
            }
        };

        if !capture.is_opened()? {
            return Err(Error::Camera(format!("Failed to open {source:?}")));
        }

        #[allow(clippy::cast_possible_truncation)]
        let mut size = (
            capture.get(CAP_PROP_FRAME_WIDTH)? as i32,
            capture.get(CAP_PROP_FRAME_HEIGHT)? as i32,
        );

        // Some backends report 0x0 until the first grab; the grabbed frame is
        // kept for the first read
        let mut pending = None;
        if size.0 <= 0 || size.1 <= 0 {
            let mut probe = Mat::default();
            if capture.read(&mut probe)? && !probe.empty() {
                size = (probe.cols(), probe.rows());
                pending = Some(probe);
            }
            debug!("Probed frame size {}x{}", size.0, size.1);
        }
        info!("Video source ready at {}x{}", size.0, size.1);

        Ok(Self {
            capture,
            source: source.clone(),
            mirror,
            size,
            exhausted: false,
            pending,
        })
    }

    #[must_use]
    pub fn source(&self) -> &VideoSource {
        &self.source
    }
}

impl FrameSource for CameraSource {
    fn frame_size(&self) -> (i32, i32) {
        self.size
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = self.pending.take().unwrap_or_default();
        if frame.empty() && (!self.capture.read(&mut frame)? || frame.empty()) {
            if self.is_finite() {
                info!("End of video file reached");
                self.exhausted = true;
            } else {
                warn!("Camera returned no frame");
            }
            return Ok(None);
        }

        if self.mirror {
            let temp = frame.clone();
            opencv::core::flip(&temp, &mut frame, 1)?;
        }
        self.size = (frame.cols(), frame.rows());
        Ok(Some(frame))
    }

    fn is_finite(&self) -> bool {
        matches!(self.source, VideoSource::File(_))
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Endless source of identical solid-colour frames
#[derive(Debug, Clone)]
pub struct BlankSource {
    width: i32,
    height: i32,
    color: Scalar,
}

impl BlankSource {
    #[must_use]
    pub fn new(width: i32, height: i32, color: Scalar) -> Self {
        Self { width, height, color }
    }
}

impl FrameSource for BlankSource {
    fn frame_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let frame = Mat::new_rows_cols_with_default(self.height, self.width, CV_8UC3, self.color)?;
        Ok(Some(frame))
    }
}
