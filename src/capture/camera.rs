//! Webcam capture via OpenCV (`camera` feature).
//!
//! [`CameraSource`] wraps an OpenCV `VideoCapture` opened by device index.
//! Frames arrive as BGR `Mat`s and are converted to the pipeline's tightly
//! packed RGB8 layout before leaving this module. Release is idempotent.

use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::{CaptureError, FrameSource, VideoFrame};

impl From<opencv::Error> for CaptureError {
    fn from(e: opencv::Error) -> Self {
        CaptureError::Backend(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// CameraSource
// ---------------------------------------------------------------------------

/// Live webcam frame source.
///
/// # Example
///
/// ```rust,no_run
/// use finger_rhythm::capture::{CameraSource, FrameSource};
///
/// let mut cam = CameraSource::open(0, 640, 480).unwrap();
/// let frame = cam.grab().unwrap();
/// ```
pub struct CameraSource {
    /// `None` once released; `release` must be a no-op the second time.
    capture: Option<VideoCapture>,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Open the capture device at `index`, requesting an ideal resolution.
    ///
    /// The device may negotiate a different resolution; the actual frame
    /// dimensions are read back after opening and reported by
    /// [`FrameSource::dimensions`].
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] when the device cannot be opened — fatal,
    /// the caller must not retry.
    pub fn open(index: u32, ideal_width: u32, ideal_height: u32) -> Result<Self, CaptureError> {
        let mut capture = VideoCapture::new(index as i32, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CaptureError::NoDevice(index));
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, ideal_width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, ideal_height as f64)?;
        // Smallest driver-side buffer keeps frames as fresh as possible.
        let _ = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        log::info!("camera {index} opened at {width}x{height}");

        Ok(Self {
            capture: Some(capture),
            width,
            height,
        })
    }

    /// Stop the camera and free the device. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                log::warn!("camera release failed: {e}");
            } else {
                log::info!("camera released");
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn grab(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        let capture = match self.capture.as_mut() {
            Some(c) => c,
            // Released: report a clean end of stream.
            None => return Ok(None),
        };

        let mut bgr = Mat::default();
        if !capture.read(&mut bgr)? || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes()?.to_vec();

        Ok(Some(VideoFrame {
            data,
            width,
            height,
            timestamp_ms: 0.0, // stamped by the feed
            frame_id: 0,       // stamped by the feed
        }))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
