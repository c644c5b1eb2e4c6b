//! Hardware-free frame source for the simulation mode and tests.

use std::time::Duration;

use super::{CaptureError, FrameSource, VideoFrame};

/// Produces flat-shaded frames at a fixed rate without any capture device.
///
/// Each grab sleeps for the configured frame interval and returns a frame
/// whose fill value advances with the frame counter, so consumers can tell
/// frames apart.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    interval: Duration,
    counter: u64,
}

impl SyntheticSource {
    /// A source producing `width`×`height` frames roughly every
    /// `interval_ms` milliseconds.
    pub fn new(width: u32, height: u32, interval_ms: u64) -> Self {
        Self {
            width,
            height,
            interval: Duration::from_millis(interval_ms),
            counter: 0,
        }
    }

    /// 640×480 at ~30 fps — the default simulation camera.
    pub fn vga() -> Self {
        Self::new(640, 480, 33)
    }
}

impl FrameSource for SyntheticSource {
    fn grab(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        std::thread::sleep(self.interval);

        let shade = (self.counter % 256) as u8;
        self.counter += 1;

        Ok(Some(VideoFrame {
            data: vec![shade; (self.width * self.height * 3) as usize],
            width: self.width,
            height: self.height,
            timestamp_ms: 0.0, // stamped by the feed
            frame_id: 0,       // stamped by the feed
        }))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grab_returns_correctly_sized_frames() {
        let mut source = SyntheticSource::new(8, 4, 0);
        let frame = source.grab().unwrap().unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.data.len(), 8 * 4 * 3);
    }

    #[test]
    fn consecutive_frames_differ() {
        let mut source = SyntheticSource::new(2, 2, 0);
        let a = source.grab().unwrap().unwrap();
        let b = source.grab().unwrap().unwrap();
        assert_ne!(a.data[0], b.data[0]);
    }

    #[test]
    fn dimensions_match_construction() {
        let source = SyntheticSource::vga();
        assert_eq!(source.dimensions(), (640, 480));
    }
}
