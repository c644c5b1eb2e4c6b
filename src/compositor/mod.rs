//! Off-thread frame compositor.
//!
//! # Architecture
//!
//! ```text
//! main thread                         render-worker thread
//! ───────────                         ────────────────────
//! RenderWorker::send ── RenderRequest ──▶ Compositor
//!   Init / UpdateOverlay /                 · crop to 9:16, mirror, resize
//!   UpdateFailInfo /                       · hook line, watermark,
//!   DrawFrame{bitmap ──move──▶}              fail banner, countdown,
//!                                            emphasized sequence text
//!   ◀── RenderReply ─────────────────────  one reply per draw request,
//!        Ready / FrameReady{bitmap} /      tagged with the frame id
//!        Error
//! ```
//!
//! The worker is fully decoupled from the detection scheduler: the two
//! share only the frame source, and a stalled draw can never throttle
//! detection (or vice versa).

pub mod canvas;
pub mod layout;
pub mod protocol;
pub mod worker;

pub use canvas::{crop_rect, Compositor};
pub use layout::{find_countdown, find_sequence_line, split_emphasis, wrap_sequence, Segment};
pub use protocol::{RenderReply, RenderRequest};
pub use worker::RenderWorker;
