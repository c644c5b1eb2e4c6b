//! Core landmark-model trait, engine identity, and errors.
//!
//! [`LandmarkModel`] is the blocking backend interface: one call turns a
//! video frame into a normalized 21-point landmark set (or `None` when no
//! hand is present). It is object-safe and `Send + Sync` so backends can be
//! held behind `Arc<dyn LandmarkModel>` and driven from the blocking thread
//! pool.
//!
//! The two production backends ([`FullLandmarkModel`], [`LiteLandmarkModel`])
//! live behind the `onnx` feature; [`ScriptedModel`] is the hardware-free
//! playback backend used by the simulation mode and the test suite.
//!
//! [`FullLandmarkModel`]: crate::detect::FullLandmarkModel
//! [`LiteLandmarkModel`]: crate::detect::LiteLandmarkModel

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::capture::VideoFrame;
use crate::landmark::Landmark;

// ---------------------------------------------------------------------------
// EngineKind
// ---------------------------------------------------------------------------

/// Identity of a detection backend.
///
/// The two variants trade accuracy against per-call cost; the throughput
/// variant is allowed a shorter detection interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    /// Accuracy-oriented model. Higher per-call cost.
    Full,
    /// Throughput-oriented model. Cheaper calls, may be run more often.
    Lite,
}

impl EngineKind {
    /// Minimum milliseconds between detection attempts for this engine.
    ///
    /// The lite model is cheap enough to run more often; on constrained
    /// devices its interval is widened to save power.
    pub fn detection_interval_ms(self, mobile: bool) -> u64 {
        match self {
            EngineKind::Lite => {
                if mobile {
                    45
                } else {
                    35
                }
            }
            EngineKind::Full => 55,
        }
    }

    /// The other backend — the fallback target.
    pub fn other(self) -> Self {
        match self {
            EngineKind::Full => EngineKind::Lite,
            EngineKind::Lite => EngineKind::Full,
        }
    }

    /// Short label for logs.
    pub fn label(self) -> &'static str {
        match self {
            EngineKind::Full => "full",
            EngineKind::Lite => "lite",
        }
    }
}

// ---------------------------------------------------------------------------
// DetectError
// ---------------------------------------------------------------------------

/// Errors raised by detection backends and the tracker around them.
#[derive(Debug, Clone, Error)]
pub enum DetectError {
    /// The model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The backend failed to initialise (bad model, unsupported runtime).
    #[error("backend initialisation failed: {0}")]
    Init(String),

    /// An error occurred during one inference pass.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Both backends failed to initialise — terminal for the pipeline.
    #[error("both detection backends failed — lite: {lite}; full: {full}")]
    AllBackendsFailed { lite: String, full: String },

    /// The detection worker channel is closed (worker terminated).
    #[error("detection worker is not running")]
    WorkerGone,
}

// ---------------------------------------------------------------------------
// LandmarkModel trait
// ---------------------------------------------------------------------------

/// Blocking, thread-safe interface for landmark-detection backends.
///
/// # Contract
///
/// - The returned landmark set always has exactly 21 points in the
///   MediaPipe hand topology, x/y normalized to `[0, 1]`, z wrist-relative
///   (0 when the backend has no depth output).
/// - `Ok(None)` means "no hand in this frame" and is not an error.
/// - Implementations may assume calls are serialized per instance; the
///   tracker guarantees at most one detect is in flight at a time.
pub trait LandmarkModel: Send + Sync + std::fmt::Debug {
    /// Which backend this is.
    fn kind(&self) -> EngineKind;

    /// Run detection on one frame.
    fn detect(&self, frame: &VideoFrame) -> Result<Option<Vec<Landmark>>, DetectError>;
}

// Compile-time assertion: Box<dyn LandmarkModel> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn LandmarkModel>) {}
};

// ---------------------------------------------------------------------------
// ModelBuilder trait
// ---------------------------------------------------------------------------

/// Constructs backends by kind.
///
/// Separating construction from the tracker keeps the fallback policy
/// testable: tests hand the tracker a builder whose lite variant fails.
pub trait ModelBuilder: Send + Sync {
    /// Build the backend of the given kind. Blocking (model load / session
    /// creation); the tracker runs it on the blocking thread pool.
    fn build(&self, kind: EngineKind) -> Result<Box<dyn LandmarkModel>, DetectError>;
}

/// Build `preferred`, falling back from the lite backend to the full one.
///
/// The fallback direction is part of the adapter contract: a lite-backend
/// initialisation failure automatically retries with the full backend; a
/// full-backend failure is surfaced directly. Returns the model plus
/// whether a fallback substitution occurred.
pub(crate) fn build_with_fallback(
    builder: &dyn ModelBuilder,
    preferred: EngineKind,
) -> Result<(Box<dyn LandmarkModel>, bool), DetectError> {
    match builder.build(preferred) {
        Ok(model) => Ok((model, false)),
        Err(primary) if preferred == EngineKind::Lite => {
            log::warn!("lite backend failed to initialise ({primary}); retrying with full");
            match builder.build(EngineKind::Full) {
                Ok(model) => Ok((model, true)),
                Err(fallback) => Err(DetectError::AllBackendsFailed {
                    lite: primary.to_string(),
                    full: fallback.to_string(),
                }),
            }
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// Playback backend: cycles through a fixed sequence of landmark sets.
///
/// Powers the hardware-free simulation mode and most of the test suite.
///
/// # Example
///
/// ```rust
/// use finger_rhythm::detect::{EngineKind, LandmarkModel, ScriptedModel};
/// use finger_rhythm::landmark::synthetic;
///
/// let model = ScriptedModel::new(
///     EngineKind::Lite,
///     vec![Some(synthetic::open_hand()), None],
/// );
/// assert_eq!(model.kind(), EngineKind::Lite);
/// ```
#[derive(Debug)]
pub struct ScriptedModel {
    kind: EngineKind,
    frames: Vec<Option<Vec<Landmark>>>,
    cursor: Mutex<usize>,
}

impl ScriptedModel {
    /// A model that replays `frames` in order, looping forever.
    ///
    /// # Panics
    ///
    /// Panics if `frames` is empty.
    pub fn new(kind: EngineKind, frames: Vec<Option<Vec<Landmark>>>) -> Self {
        assert!(!frames.is_empty(), "ScriptedModel needs at least one frame");
        Self {
            kind,
            frames,
            cursor: Mutex::new(0),
        }
    }

    /// A model that returns the same landmark set on every call.
    pub fn constant(kind: EngineKind, landmarks: Option<Vec<Landmark>>) -> Self {
        Self::new(kind, vec![landmarks])
    }
}

impl LandmarkModel for ScriptedModel {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn detect(&self, _frame: &VideoFrame) -> Result<Option<Vec<Landmark>>, DetectError> {
        let mut cursor = self.cursor.lock().unwrap();
        let result = self.frames[*cursor].clone();
        *cursor = (*cursor + 1) % self.frames.len();
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::synthetic;

    fn frame() -> VideoFrame {
        VideoFrame {
            data: vec![0; 12],
            width: 2,
            height: 2,
            timestamp_ms: 0.0,
            frame_id: 0,
        }
    }

    struct FailsFor(Option<EngineKind>);

    impl ModelBuilder for FailsFor {
        fn build(&self, kind: EngineKind) -> Result<Box<dyn LandmarkModel>, DetectError> {
            if self.0 == Some(kind) || self.0.is_none() {
                Err(DetectError::Init(format!("{} unavailable", kind.label())))
            } else {
                Ok(Box::new(ScriptedModel::constant(kind, None)))
            }
        }
    }

    // ---- EngineKind ---------------------------------------------------------

    #[test]
    fn lite_interval_is_shorter_than_full() {
        assert!(
            EngineKind::Lite.detection_interval_ms(false)
                < EngineKind::Full.detection_interval_ms(false)
        );
    }

    #[test]
    fn mobile_widens_the_lite_interval() {
        assert!(
            EngineKind::Lite.detection_interval_ms(true)
                > EngineKind::Lite.detection_interval_ms(false)
        );
    }

    #[test]
    fn other_flips_the_kind() {
        assert_eq!(EngineKind::Full.other(), EngineKind::Lite);
        assert_eq!(EngineKind::Lite.other(), EngineKind::Full);
    }

    // ---- ScriptedModel ------------------------------------------------------

    #[test]
    fn scripted_model_loops_its_frames() {
        let model = ScriptedModel::new(
            EngineKind::Lite,
            vec![Some(synthetic::open_hand()), None],
        );
        let f = frame();
        assert!(model.detect(&f).unwrap().is_some());
        assert!(model.detect(&f).unwrap().is_none());
        assert!(model.detect(&f).unwrap().is_some()); // wrapped around
    }

    #[test]
    #[should_panic(expected = "at least one frame")]
    fn scripted_model_rejects_empty_script() {
        let _ = ScriptedModel::new(EngineKind::Lite, Vec::new());
    }

    // ---- build_with_fallback ------------------------------------------------

    #[test]
    fn lite_failure_falls_back_to_full() {
        let builder = FailsFor(Some(EngineKind::Lite));
        let (model, fell_back) = build_with_fallback(&builder, EngineKind::Lite).unwrap();
        assert_eq!(model.kind(), EngineKind::Full);
        assert!(fell_back);
    }

    #[test]
    fn full_failure_is_surfaced_directly() {
        let builder = FailsFor(Some(EngineKind::Full));
        let err = build_with_fallback(&builder, EngineKind::Full).unwrap_err();
        assert!(matches!(err, DetectError::Init(_)));
    }

    #[test]
    fn both_failing_reports_terminal_error() {
        let builder = FailsFor(None);
        let err = build_with_fallback(&builder, EngineKind::Lite).unwrap_err();
        assert!(matches!(err, DetectError::AllBackendsFailed { .. }));
    }

    #[test]
    fn successful_preferred_build_does_not_fall_back() {
        struct AlwaysOk;
        impl ModelBuilder for AlwaysOk {
            fn build(&self, kind: EngineKind) -> Result<Box<dyn LandmarkModel>, DetectError> {
                Ok(Box::new(ScriptedModel::constant(kind, None)))
            }
        }
        let (model, fell_back) = build_with_fallback(&AlwaysOk, EngineKind::Lite).unwrap();
        assert_eq!(model.kind(), EngineKind::Lite);
        assert!(!fell_back);
    }
}
