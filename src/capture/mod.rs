//! Video capture: frames, sources, and the feed thread.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                 FrameSource (trait)                    │
//! │                                                        │
//! │   CameraSource (`camera` feature, OpenCV webcam)       │
//! │   SyntheticSource (paced synthetic frames, no hw)      │
//! │                        │                               │
//! │                        ▼                               │
//! │   FrameFeed — capture thread, stamps frame ids,        │
//! │   publishes the latest frame on a tokio watch channel  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! The watch channel doubles as the pipeline's frame-pacing primitive:
//! awaiting a change on it ties the detection cadence to actual captured
//! frames rather than to a timer.

#[cfg(feature = "camera")]
pub mod camera;
pub mod feed;
pub mod synthetic;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use feed::FrameFeed;
pub use synthetic::SyntheticSource;

use thiserror::Error;

// ---------------------------------------------------------------------------
// VideoFrame
// ---------------------------------------------------------------------------

/// One captured video frame, tightly packed RGB8.
///
/// Frames are owned values that move through the pipeline; the compositor
/// and the detection workers receive them by transfer, never by shared
/// reference, so every frame has exactly one owner at any time.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Tightly packed RGB8 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
    /// Frame width in pixels (> 0 for any frame that reaches detection).
    pub width: u32,
    /// Frame height in pixels (> 0 for any frame that reaches detection).
    pub height: u32,
    /// Milliseconds since the feed started, monotone across frames.
    pub timestamp_ms: f64,
    /// Capture-order id assigned by the feed.
    pub frame_id: u64,
}

impl VideoFrame {
    /// Width over height. Used by the classifier to correct distances on
    /// non-square frames.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised while opening or reading a capture device.
///
/// These are fatal for the pipeline: camera access is surfaced immediately
/// and never retried.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No capture device could be opened at the requested index.
    #[error("no capture device available at index {0}")]
    NoDevice(u32),

    /// The platform capture backend reported an error.
    #[error("capture backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// FrameSource trait
// ---------------------------------------------------------------------------

/// A producer of video frames, driven from the capture thread.
///
/// `grab` blocks until the next frame is available (hardware sources pace
/// themselves; synthetic sources sleep). Returning `Ok(None)` signals a
/// transient empty read; returning `Err` ends the feed.
pub trait FrameSource: Send {
    /// Block until the next frame and return its raw RGB data.
    ///
    /// The feed thread stamps `frame_id` and `timestamp_ms`, so sources fill
    /// only `data`, `width`, and `height`.
    fn grab(&mut self) -> Result<Option<VideoFrame>, CaptureError>;

    /// Reported `(width, height)` of the source. Detection requires both to
    /// be non-zero.
    fn dimensions(&self) -> (u32, u32);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_is_width_over_height() {
        let frame = VideoFrame {
            data: vec![0; 4 * 3 * 3],
            width: 4,
            height: 3,
            timestamp_ms: 0.0,
            frame_id: 0,
        };
        assert!((frame.aspect_ratio() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_height_aspect_defaults_to_one() {
        let frame = VideoFrame {
            data: Vec::new(),
            width: 640,
            height: 0,
            timestamp_ms: 0.0,
            frame_id: 0,
        };
        assert_eq!(frame.aspect_ratio(), 1.0);
    }

    #[test]
    fn capture_error_display() {
        let e = CaptureError::NoDevice(0);
        assert!(e.to_string().contains("index 0"));
    }
}
