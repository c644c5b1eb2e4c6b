//! Application entry point — headless finger-rhythm pipeline runner.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Open the frame source (webcam with the `camera` feature, synthetic
//!    frames otherwise) and start the capture feed.
//! 5. Build the detector — in-process [`HandTracker`] or the offload
//!    worker — and initialise the preferred backend (with fallback).
//! 6. Spawn the render worker and a task feeding it captured frames.
//! 7. Start the detection scheduler; stabilized counts go to the log.
//! 8. Wait for Ctrl-C, then tear everything down.
//!
//! Without the `onnx` feature the runner plays back scripted poses
//! (open hand / fist), which exercises the full pipeline with no model
//! files or hardware.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use finger_rhythm::{
    capture::{FrameFeed, FrameSource},
    compositor::{RenderReply, RenderRequest, RenderWorker},
    config::AppConfig,
    detect::{Detector, DetectionWorker, HandTracker, ModelBuilder},
    scheduler::{DetectionScheduler, SchedulerConfig},
    PipelineError,
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("finger-rhythm pipeline starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 workers — detection + housekeeping)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Frame source + capture feed
    let source = open_source(&config)?;
    let feed = FrameFeed::start(source);
    let frames_for_render = feed.subscribe();

    // 5. Detector
    let builder = make_builder();
    let preferred = config.detection.preferred_engine;

    let detector: Arc<dyn Detector> = if config.detection.offload {
        let worker = DetectionWorker::spawn(builder);
        worker
            .initialize(preferred)
            .await
            .map_err(PipelineError::Provider)?;
        Arc::new(worker)
    } else {
        let tracker = HandTracker::with_ready_timeout(
            builder,
            Duration::from_millis(config.detection.ready_timeout_ms),
        );
        tracker
            .initialize(preferred)
            .await
            .map_err(PipelineError::Provider)?;
        Arc::new(tracker)
    };

    // 6. Render worker + frame forwarding
    let font = load_font(&config);
    let (render, mut render_replies) = RenderWorker::spawn(font);
    render.send(RenderRequest::Init {
        width: config.compositor.width,
        height: config.compositor.height,
        mobile: config.compositor.mobile,
    });

    // Forward captured frames to the compositor. The worker terminates
    // when this task drops it (feed closed at teardown).
    tokio::spawn(async move {
        let mut frames = frames_for_render;
        while frames.changed().await.is_ok() {
            let Some(frame) = frames.borrow_and_update().clone() else {
                continue;
            };
            let Some(bitmap) =
                image::RgbImage::from_raw(frame.width, frame.height, frame.data)
            else {
                continue;
            };
            if !render.send(RenderRequest::DrawFrame {
                bitmap,
                video_width: frame.width,
                video_height: frame.height,
                frame_id: frame.frame_id,
            }) {
                break;
            }
        }
    });

    // Drain composited frames. A recorder would encode them; the headless
    // runner just closes them (drop) to honor the bitmap lifecycle.
    tokio::spawn(async move {
        while let Some(reply) = render_replies.recv().await {
            match reply {
                RenderReply::Ready => log::info!("render worker ready"),
                RenderReply::FrameReady { frame_id, .. } => {
                    log::trace!("composited frame {frame_id}");
                }
                RenderReply::Error { message } => log::warn!("render worker: {message}"),
            }
        }
    });

    // 7. Detection scheduler
    let (_visibility_tx, visibility_rx) = watch::channel(true);
    let handle = DetectionScheduler::start(
        detector,
        feed,
        SchedulerConfig::for_device(config.detection.mobile),
        visibility_rx,
        |count| log::info!("fingers: {count}"),
    );

    // 8. Run until Ctrl-C
    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    handle.join().await;

    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

#[cfg(feature = "camera")]
fn open_source(config: &AppConfig) -> Result<Box<dyn FrameSource>, PipelineError> {
    let camera = finger_rhythm::capture::CameraSource::open(
        config.camera.device_index,
        config.camera.width,
        config.camera.height,
    )?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "camera"))]
fn open_source(config: &AppConfig) -> Result<Box<dyn FrameSource>, PipelineError> {
    log::info!("camera feature disabled; using synthetic frames");
    Ok(Box::new(finger_rhythm::capture::SyntheticSource::new(
        config.camera.width,
        config.camera.height,
        33,
    )))
}

#[cfg(feature = "onnx")]
fn make_builder() -> Arc<dyn ModelBuilder> {
    Arc::new(finger_rhythm::detect::OnnxModelBuilder::new(
        finger_rhythm::config::AppPaths::new().models_dir,
    ))
}

/// Scripted playback: half a second of open hand, then half a second of
/// fist, so the log shows the stabilized count swinging 5 ↔ 0.
#[cfg(not(feature = "onnx"))]
fn make_builder() -> Arc<dyn ModelBuilder> {
    use finger_rhythm::landmark::synthetic;

    log::info!("onnx feature disabled; playing back scripted poses");

    let mut frames = Vec::new();
    frames.extend(std::iter::repeat_with(|| Some(synthetic::open_hand())).take(15));
    frames.extend(std::iter::repeat_with(|| Some(synthetic::closed_fist())).take(15));
    Arc::new(finger_rhythm::detect::ScriptedBuilder::new(frames))
}

fn load_font(config: &AppConfig) -> Option<ab_glyph::FontArc> {
    let path = config.compositor.font_path.as_ref()?;
    match std::fs::read(path) {
        Ok(bytes) => match ab_glyph::FontArc::try_from_vec(bytes) {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("invalid font {}: {e}", path.display());
                None
            }
        },
        Err(e) => {
            log::warn!("could not read font {}: {e}", path.display());
            None
        }
    }
}
