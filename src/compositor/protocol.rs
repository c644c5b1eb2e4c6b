//! Typed message protocol of the render worker.
//!
//! Bitmaps are owned [`RgbImage`]s that *move* through the channels — an
//! explicit ownership handoff, never a shared buffer. Whichever side holds
//! a bitmap last is responsible for dropping it; the worker consumes every
//! input bitmap it receives and emits at most one output bitmap per draw
//! request.

use image::RgbImage;

/// Requests accepted by the render worker.
pub enum RenderRequest {
    /// Create the canvas. Must precede the first `DrawFrame`.
    Init {
        width: u32,
        height: u32,
        mobile: bool,
    },
    /// Replace the overlay text lines. Fire-and-forget (no reply).
    UpdateOverlay { lines: Vec<String> },
    /// Update the fail banner. Fire-and-forget (no reply).
    UpdateFailInfo { show: bool, round: u32 },
    /// Compose one frame. Ownership of `bitmap` transfers to the worker;
    /// exactly one `FrameReady` or `Error` reply comes back, tagged with
    /// `frame_id`.
    DrawFrame {
        bitmap: RgbImage,
        video_width: u32,
        video_height: u32,
        frame_id: u64,
    },
    /// Drop the canvas and stop the worker thread.
    Terminate,
}

impl std::fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderRequest::Init {
                width,
                height,
                mobile,
            } => f
                .debug_struct("Init")
                .field("width", width)
                .field("height", height)
                .field("mobile", mobile)
                .finish(),
            RenderRequest::UpdateOverlay { lines } => f
                .debug_struct("UpdateOverlay")
                .field("lines", &lines.len())
                .finish(),
            RenderRequest::UpdateFailInfo { show, round } => f
                .debug_struct("UpdateFailInfo")
                .field("show", show)
                .field("round", round)
                .finish(),
            RenderRequest::DrawFrame {
                video_width,
                video_height,
                frame_id,
                ..
            } => f
                .debug_struct("DrawFrame")
                .field("video_width", video_width)
                .field("video_height", video_height)
                .field("frame_id", frame_id)
                .finish(),
            RenderRequest::Terminate => f.write_str("Terminate"),
        }
    }
}

/// Replies produced by the render worker.
pub enum RenderReply {
    /// The canvas exists; draw requests will be honored.
    Ready,
    /// One composited bitmap, ownership transferred to the receiver,
    /// correlated to its request by `frame_id`.
    FrameReady { bitmap: RgbImage, frame_id: u64 },
    /// A draw request could not be honored. The input bitmap was still
    /// consumed — never both a reply and a leak, never neither.
    Error { message: String },
}

impl std::fmt::Debug for RenderReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderReply::Ready => f.write_str("Ready"),
            RenderReply::FrameReady { frame_id, .. } => f
                .debug_struct("FrameReady")
                .field("frame_id", frame_id)
                .finish(),
            RenderReply::Error { message } => {
                f.debug_struct("Error").field("message", message).finish()
            }
        }
    }
}
