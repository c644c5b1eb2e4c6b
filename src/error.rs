//! User-visible pipeline errors.
//!
//! Only initialisation-phase failures reach this type: camera access and
//! backend loading. Steady-state per-frame failures are recovered inside
//! the detection loop (logged, treated as a null-landmark frame) and are
//! deliberately invisible to the consumer — momentary detector misses must
//! not interrupt gameplay.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::detect::DetectError;

/// Errors surfaced while starting the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Camera access failed (permission denied, no device). Fatal;
    /// never retried.
    #[error("camera unavailable: {0}")]
    Camera(#[from] CaptureError),

    /// No detection backend could be initialised, even after the fallback
    /// retry.
    #[error("detection backend unavailable: {0}")]
    Provider(#[from] DetectError),
}
