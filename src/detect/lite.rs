//! Throughput-oriented landmark backend (`onnx` feature).
//!
//! Wraps the lite hand-landmark ONNX model. Unlike the full backend, this
//! model reports keypoints in *pixel space* of its input square, so this
//! adapter divides them by the input width/height to produce the
//! pipeline's normalized coordinates. Depth comes from a secondary 3-D
//! keypoint tensor when the exported model carries one; otherwise every
//! `z` defaults to 0. Both coercions live here and nowhere else.

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
use super::tensor::{frame_to_tensor, INPUT_SIZE};

/// Minimum hand score for a detection to be reported.
const SCORE_THRESHOLD: f32 = 0.5;

/// Lite hand-landmark model.
pub struct LiteLandmarkModel {
    session: Mutex<Session>,
    /// Whether the exported model carries the secondary 3-D keypoint
    /// output. Checked once at load time.
    has_depth: bool,
}

impl LiteLandmarkModel {
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

        let has_depth = session.outputs().iter().any(|o| o.name == "keypoints3d");
        if !has_depth {
            log::debug!("lite model has no keypoints3d output; z will default to 0");
        }

        Ok(Self {
            session: Mutex::new(session),
            has_depth,
        })
    }
}

impl std::fmt::Debug for LiteLandmarkModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiteLandmarkModel")
            .field("has_depth", &self.has_depth)
            .finish_non_exhaustive()
    }
}

impl LandmarkModel for LiteLandmarkModel {
    fn kind(&self) -> EngineKind {
        EngineKind::Lite
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Option<Vec<Landmark>>, DetectError> {
        let input = Value::from_array(frame_to_tensor(frame)?)
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(inputs!["image" => input])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let (_, score) = outputs["score"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        if score.first().copied().unwrap_or(0.0) < SCORE_THRESHOLD {
            return Ok(None);
        }

        let (_, keypoints) = outputs["keypoints"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        if keypoints.len() < LANDMARK_COUNT * 2 {
            return Err(DetectError::Inference(format!(
                "keypoint tensor too small: {} values",
                keypoints.len()
            )));
        }

        // Depth from the secondary keypoint array when present.
        let depths: Option<Vec<f32>> = if self.has_depth {
            let (_, world) = outputs["keypoints3d"]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectError::Inference(e.to_string()))?;
            Some(
                world
                    .chunks_exact(3)
                    .take(LANDMARK_COUNT)
                    .map(|c| c[2])
                    .collect(),
            )
        } else {
            None
        };

        let width = INPUT_SIZE as f32;
        let height = INPUT_SIZE as f32;

        let landmarks = (0..LANDMARK_COUNT)
            .map(|i| {
                let x = keypoints[i * 2] / width;
                let y = keypoints[i * 2 + 1] / height;
                let z = depths
                    .as_ref()
                    .and_then(|d| d.get(i).copied())
                    .unwrap_or(0.0);
                Landmark::new(x, y, z)
            })
            .collect();

        Ok(Some(landmarks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_model_returns_model_not_found() {
        let result = LiteLandmarkModel::load("/nonexistent/hand_landmark_lite.onnx");
        assert!(matches!(result, Err(DetectError::ModelNotFound(_))));
    }
}
