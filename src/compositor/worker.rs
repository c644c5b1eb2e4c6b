//! The render worker thread.
//!
//! Compositing is pure CPU work that must never block the detection loop,
//! so it runs on its own named OS thread behind the typed
//! [`RenderRequest`]/[`RenderReply`] protocol. The worker pulls nothing:
//! its overlay state is updated exclusively by fire-and-forget messages.
//!
//! A slow consumer cannot stall detection either — replies go through a
//! bounded channel and the two paths share only the frame source.

use ab_glyph::FontArc;
use tokio::sync::mpsc;

use super::canvas::Compositor;
use super::protocol::{RenderReply, RenderRequest};

/// Bound on queued replies; the consumer is expected to drain promptly.
const REPLY_CHANNEL_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// RenderWorker
// ---------------------------------------------------------------------------

/// Handle to a running render worker.
///
/// # Example
///
/// ```rust,no_run
/// use finger_rhythm::compositor::{RenderRequest, RenderWorker};
///
/// # async fn example() {
/// let (worker, mut replies) = RenderWorker::spawn(None);
/// worker.send(RenderRequest::Init { width: 720, height: 1280, mobile: false });
/// let ready = replies.recv().await; // RenderReply::Ready
/// # }
/// ```
pub struct RenderWorker {
    req_tx: std::sync::mpsc::Sender<RenderRequest>,
}

impl RenderWorker {
    /// Spawn the worker thread. `font` is used for all text layers; pass
    /// `None` to render texture-only frames.
    ///
    /// Returns the handle plus the reply stream.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread.
    pub fn spawn(font: Option<FontArc>) -> (Self, mpsc::Receiver<RenderReply>) {
        let (req_tx, req_rx) = std::sync::mpsc::channel::<RenderRequest>();
        let (reply_tx, reply_rx) = mpsc::channel::<RenderReply>(REPLY_CHANNEL_CAPACITY);

        std::thread::Builder::new()
            .name("render-worker".into())
            .spawn(move || {
                let mut compositor: Option<Compositor> = None;

                while let Ok(request) = req_rx.recv() {
                    match request {
                        RenderRequest::Init {
                            width,
                            height,
                            mobile,
                        } => {
                            log::info!("render-worker: canvas {width}x{height} (mobile={mobile})");
                            compositor =
                                Some(Compositor::new(width, height, mobile, font.clone()));
                            let _ = reply_tx.blocking_send(RenderReply::Ready);
                        }
                        RenderRequest::UpdateOverlay { lines } => {
                            if let Some(c) = compositor.as_mut() {
                                c.set_overlay(lines);
                            }
                        }
                        RenderRequest::UpdateFailInfo { show, round } => {
                            if let Some(c) = compositor.as_mut() {
                                c.set_fail(show, round);
                            }
                        }
                        RenderRequest::DrawFrame {
                            bitmap,
                            video_width,
                            video_height,
                            frame_id,
                        } => {
                            let reply = match compositor.as_mut() {
                                Some(c) if bitmap.dimensions() == (video_width, video_height) => {
                                    let out = c.draw_frame(bitmap);
                                    RenderReply::FrameReady {
                                        bitmap: out,
                                        frame_id,
                                    }
                                }
                                Some(_) => {
                                    // Input consumed (dropped) either way.
                                    RenderReply::Error {
                                        message: format!(
                                            "frame {frame_id}: bitmap does not match \
                                             {video_width}x{video_height}"
                                        ),
                                    }
                                }
                                None => RenderReply::Error {
                                    message: format!(
                                        "frame {frame_id}: draw requested before init"
                                    ),
                                },
                            };
                            let _ = reply_tx.blocking_send(reply);
                        }
                        RenderRequest::Terminate => {
                            compositor = None;
                            break;
                        }
                    }
                }
                log::debug!("render-worker thread exiting");
            })
            .expect("failed to spawn render-worker thread");

        (Self { req_tx }, reply_rx)
    }

    /// Queue a request. Returns `false` when the worker has terminated.
    pub fn send(&self, request: RenderRequest) -> bool {
        self.req_tx.send(request).is_ok()
    }

    /// Ask the worker to stop. Idempotent (a second call is a failed send).
    pub fn terminate(&self) {
        let _ = self.req_tx.send(RenderRequest::Terminate);
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
