//! Landmark detection: dual backends behind one adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Detector (async trait)                     │
//! │                                                              │
//! │  HandTracker ──────────────┐      DetectionWorker            │
//! │  in-process adapter        │      worker-thread variant      │
//! │   · single-flight init     │       · typed request/reply     │
//! │   · lite→full fallback     │       · frame-id correlation    │
//! │   · watch-based readiness  │                                 │
//! │            │               │                                 │
//! │            ▼               ▼                                 │
//! │      LandmarkModel (blocking trait)                          │
//! │       · FullLandmarkModel   (`onnx`, accuracy)               │
//! │       · LiteLandmarkModel   (`onnx`, throughput)             │
//! │       · ScriptedModel       (playback, no hardware)          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two ONNX backends have structurally different outputs (normalized
//! landmarks vs. pixel-space keypoints with optional secondary depth);
//! each variant coerces its own output to the shared 21-point normalized
//! contract so nothing downstream knows which one ran.

#[cfg(feature = "onnx")]
pub mod full;
#[cfg(feature = "onnx")]
pub mod lite;
pub mod model;
pub mod offload;
#[cfg(feature = "onnx")]
pub(crate) mod tensor;
pub mod tracker;

#[cfg(feature = "onnx")]
pub use full::FullLandmarkModel;
#[cfg(feature = "onnx")]
pub use lite::LiteLandmarkModel;
pub use model::{DetectError, EngineKind, LandmarkModel, ModelBuilder, ScriptedModel};
pub use offload::{DetectReply, DetectRequest, DetectionWorker};
pub use tracker::{Detector, EngineStatus, HandTracker, ScriptedBuilder};

// ---------------------------------------------------------------------------
// OnnxModelBuilder
// ---------------------------------------------------------------------------

/// Builds the production ONNX backends from model files on disk.
#[cfg(feature = "onnx")]
pub struct OnnxModelBuilder {
    models_dir: std::path::PathBuf,
}

#[cfg(feature = "onnx")]
impl OnnxModelBuilder {
    /// File name of the accuracy-oriented model under the models dir.
    pub const FULL_MODEL_FILE: &'static str = "hand_landmark_full.onnx";
    /// File name of the throughput-oriented model under the models dir.
    pub const LITE_MODEL_FILE: &'static str = "hand_landmark_lite.onnx";

    pub fn new(models_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }
}

#[cfg(feature = "onnx")]
impl ModelBuilder for OnnxModelBuilder {
    fn build(&self, kind: EngineKind) -> Result<Box<dyn LandmarkModel>, DetectError> {
        match kind {
            EngineKind::Full => Ok(Box::new(FullLandmarkModel::load(
                self.models_dir.join(Self::FULL_MODEL_FILE),
            )?)),
            EngineKind::Lite => Ok(Box::new(LiteLandmarkModel::load(
                self.models_dir.join(Self::LITE_MODEL_FILE),
            )?)),
        }
    }
}
