//! The capture thread: owns a [`FrameSource`] and publishes frames.
//!
//! Capture reads block (a webcam delivers frames at its own rate), so they
//! live on a dedicated named OS thread. Each frame is stamped with a
//! monotone timestamp and a capture-order id, then published on a
//! `tokio::sync::watch` channel — subscribers always see the *latest* frame
//! and awaiting the channel ties a consumer's cadence to real captured
//! frames.
//!
//! Stopping is explicit and idempotent; the thread drops the source on the
//! way out, which releases the underlying device exactly once.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use tokio::sync::watch;

use super::{FrameSource, VideoFrame};

// ---------------------------------------------------------------------------
// FrameFeed
// ---------------------------------------------------------------------------

/// Handle to a running capture thread.
///
/// Construct with [`FrameFeed::start`]; call [`subscribe`](Self::subscribe)
/// for a frame receiver; call [`stop`](Self::stop) (or drop the feed) to
/// end capture and release the device.
pub struct FrameFeed {
    rx: watch::Receiver<Option<VideoFrame>>,
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
    dimensions: (u32, u32),
}

impl FrameFeed {
    /// Spawn the capture thread around `source`.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(mut source: Box<dyn FrameSource>) -> Self {
        let dimensions = source.dimensions();
        let (tx, rx) = watch::channel::<Option<VideoFrame>>(None);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("frame-feed".into())
            .spawn(move || {
                let epoch = Instant::now();
                let mut next_id: u64 = 0;

                while !stop_flag.load(Ordering::Relaxed) {
                    match source.grab() {
                        Ok(Some(mut frame)) => {
                            frame.frame_id = next_id;
                            frame.timestamp_ms = epoch.elapsed().as_secs_f64() * 1_000.0;
                            next_id += 1;

                            // send_replace never fails and wakes all waiters
                            // even after every receiver handle was dropped.
                            tx.send_replace(Some(frame));
                        }
                        Ok(None) => {
                            // Transient empty read; try again.
                            continue;
                        }
                        Err(e) => {
                            log::error!("frame-feed: capture failed, stopping: {e}");
                            break;
                        }
                    }
                }
                // `source` drops here — device released exactly once.
            })
            .expect("failed to spawn frame-feed thread");

        Self {
            rx,
            stop,
            thread: Some(thread),
            dimensions,
        }
    }

    /// A receiver for the latest captured frame.
    ///
    /// `None` until the first frame arrives. Awaiting `changed()` on the
    /// receiver is the frame-synced pacing primitive.
    pub fn subscribe(&self) -> watch::Receiver<Option<VideoFrame>> {
        self.rx.clone()
    }

    /// Source dimensions reported at start.
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Stop capturing and join the thread. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("frame-feed thread panicked during shutdown");
            }
        }
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
