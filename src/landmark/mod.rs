//! Hand-landmark data model.
//!
//! A tracked hand is a fixed set of [`LANDMARK_COUNT`] (21) ordered points
//! following the MediaPipe hand topology: index 0 is the wrist, 1–4 the
//! thumb, then four fingers of four points each, MCP → tip. Any detection
//! backend plugged into this pipeline must emit this topology — it is an
//! external contract, not an implementation detail.
//!
//! Submodules:
//!
//! - [`geometry`] — pure finger-count classifiers over a landmark set.
//! - [`stabilize`] — temporal mode-smoothing of raw per-frame counts.
//! - [`synthetic`] — canonical poses for the simulation mode and tests.

pub mod geometry;
pub mod stabilize;
pub mod synthetic;

pub use geometry::{count_extended_fingers, count_extended_fingers_angular};
pub use stabilize::{CountStabilizer, Stabilized};

// ---------------------------------------------------------------------------
// Landmark indices (MediaPipe hand topology)
// ---------------------------------------------------------------------------

/// Number of landmarks in a complete hand.
pub const LANDMARK_COUNT: usize = 21;

/// Named landmark indices.
///
/// See <https://google.github.io/mediapipe/solutions/hands.html> for the
/// skeleton diagram.
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

// ---------------------------------------------------------------------------
// Landmark
// ---------------------------------------------------------------------------

/// One point of the 21-point hand skeleton.
///
/// `x` and `y` are normalized to `[0, 1]` over the image width and height.
/// `z` is relative depth on the same scale as `x`, origin at the wrist,
/// negative toward the camera (MediaPipe world convention). Backends that
/// provide no depth emit `z = 0.0` for every point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// FrameSample
// ---------------------------------------------------------------------------

/// The result of one detection cycle, owned transiently by the scheduler.
///
/// `landmarks == None` means "no hand detected" and must propagate as a raw
/// finger count of 0. A new sample replaces the previous one wholesale every
/// cycle; consumers receive a read-only snapshot and never mutate it.
#[derive(Clone, Debug, Default)]
pub struct FrameSample {
    /// The 21 landmarks of the detected hand, or `None` when no hand was
    /// found in the frame.
    pub landmarks: Option<Vec<Landmark>>,
    /// Capture-order id of the frame this sample was computed from.
    pub frame_id: u64,
    /// Capture timestamp in milliseconds since the feed started.
    pub timestamp_ms: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
