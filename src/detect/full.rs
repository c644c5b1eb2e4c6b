//! Accuracy-oriented landmark backend (`onnx` feature).
//!
//! Wraps the full-size hand-landmark ONNX model. The model consumes one
//! video frame per call together with the frame's capture timestamp — the
//! temporal tracking head assumes frames arrive in time order, so
//! regressive timestamps (a restarted feed) are clamped forward rather
//! than handed to the model out of order.
//!
//! Output contract: a `landmarks` tensor of 21 × (x, y, z) with x and y
//! *already normalized* to `[0, 1]` over the input square and z
//! wrist-relative (negative toward the camera), plus a scalar `presence`
//! score. Everything this backend returns is therefore used as-is; no
//! coordinate conversion happens outside it.

use std::path::Path;
use std::sync::Mutex;

use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};

use crate::capture::VideoFrame;
use crate::landmark::{Landmark, LANDMARK_COUNT};

use super::model::{DetectError, EngineKind, LandmarkModel};
use super::tensor::frame_to_tensor;

/// Minimum presence score for a hand to be reported.
const PRESENCE_THRESHOLD: f32 = 0.5;

/// Full-size hand-landmark model.
pub struct FullLandmarkModel {
    /// `Session::run` needs `&mut`; calls are serialized by the tracker but
    /// the trait takes `&self`, so the session sits behind a mutex.
    session: Mutex<Session>,
    last_timestamp_ms: Mutex<f64>,
}

impl FullLandmarkModel {
    /// Load the model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`DetectError::ModelNotFound`] — the file does not exist.
    /// - [`DetectError::Init`] — ONNX Runtime rejected the model.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(DetectError::ModelNotFound(path.display().to_string()));
        }

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| DetectError::Init(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            last_timestamp_ms: Mutex::new(f64::NEG_INFINITY),
        })
    }
}

impl std::fmt::Debug for FullLandmarkModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullLandmarkModel").finish_non_exhaustive()
    }
}

impl LandmarkModel for FullLandmarkModel {
    fn kind(&self) -> EngineKind {
        EngineKind::Full
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Option<Vec<Landmark>>, DetectError> {
        // Keep timestamps strictly increasing for the tracking head.
        {
            let mut last = self.last_timestamp_ms.lock().unwrap();
            *last = if frame.timestamp_ms > *last {
                frame.timestamp_ms
            } else {
                *last + 1.0
            };
        }

        let input = Value::from_array(frame_to_tensor(frame)?)
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(inputs!["image" => input])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let (_, presence) = outputs["presence"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        if presence.first().copied().unwrap_or(0.0) < PRESENCE_THRESHOLD {
            return Ok(None);
        }

        let (_, coords) = outputs["landmarks"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        if coords.len() < LANDMARK_COUNT * 3 {
            return Err(DetectError::Inference(format!(
                "landmark tensor too small: {} values",
                coords.len()
            )));
        }

        let landmarks = coords
            .chunks_exact(3)
            .take(LANDMARK_COUNT)
            .map(|c| Landmark::new(c[0], c[1], c[2]))
            .collect();

        Ok(Some(landmarks))
    }
}
