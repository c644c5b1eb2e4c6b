//! The detection loop: capture → detect → classify → stabilize → notify.
//!
//! [`DetectionScheduler::start`] spawns one tokio task that drives the
//! whole pipeline. Each cycle is a single suspension point — the await on
//! the detector — so cycles are strictly sequential: cycle N+1 cannot
//! begin until cycle N's detect + classify + stabilize sequence has
//! settled, and results reach the stabilizer in capture order.
//!
//! # Pipeline flow
//!
//! ```text
//! start()
//!   └─▶ AwaitingCamera: wait for a sized frame AND a ready backend
//!         └─▶ Detecting: loop
//!               pace (frame-synced watch, or interval fallback)
//!               rate-limit by the active engine's minimum interval
//!               snapshot the latest frame once
//!               detect → classify → stabilize → notify on change
//!               publish the landmark snapshot for consumers
//!         └─▶ Suspended while the host is hidden (no CPU burned)
//! stop()  — immediate for scheduling; an in-flight detect completes and
//!           is discarded, never awaited by the caller
//! ```
//!
//! Per-cycle failures are logged and treated as null-landmark frames; the
//! loop never halts on them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::capture::FrameFeed;
use crate::detect::{Detector, EngineKind, EngineStatus};
use crate::landmark::{count_extended_fingers, CountStabilizer, FrameSample};

use super::state::SchedulerState;

// ---------------------------------------------------------------------------
// FramePacing
// ---------------------------------------------------------------------------

/// How the loop waits between cycles.
#[derive(Clone, Copy, Debug)]
pub enum FramePacing {
    /// Await the next captured frame on the feed's watch channel — ties
    /// detection cadence to actual frames. Preferred.
    VideoSynced,
    /// Tick on a plain timer. Fallback for sources without their own
    /// pacing.
    Interval(Duration),
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the detection loop.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Constrained-device flag: widens detection intervals and shrinks the
    /// smoothing window.
    pub mobile: bool,
    /// Pacing primitive.
    pub pacing: FramePacing,
    /// Smoothing-window capacity.
    pub history_capacity: usize,
}

impl SchedulerConfig {
    /// Defaults for the given device class: history 3 on mobile, 5
    /// otherwise; frame-synced pacing.
    pub fn for_device(mobile: bool) -> Self {
        Self {
            mobile,
            pacing: FramePacing::VideoSynced,
            history_capacity: if mobile { 3 } else { 5 },
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::for_device(false)
    }
}

// ---------------------------------------------------------------------------
// DetectionScheduler
// ---------------------------------------------------------------------------

/// Entry point for the detection loop.
pub struct DetectionScheduler;

impl DetectionScheduler {
    /// Spawn the loop. Must be called within a tokio runtime.
    ///
    /// The scheduler takes ownership of `feed` (and with it the camera) for
    /// its lifetime; teardown stops the feed exactly once and disposes the
    /// detector. `visibility` carries the host's shown/hidden state;
    /// `on_count` fires only when the stabilized count changes.
    pub fn start(
        detector: Arc<dyn Detector>,
        feed: FrameFeed,
        config: SchedulerConfig,
        visibility: watch::Receiver<bool>,
        on_count: impl Fn(u8) + Send + Sync + 'static,
    ) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (sample_tx, sample_rx) = watch::channel(FrameSample::default());

        let task = tokio::spawn(run(
            detector, feed, config, visibility, stop_rx, state_tx, sample_tx,
            Box::new(on_count),
        ));

        SchedulerHandle {
            stop_tx,
            state_rx,
            sample_rx,
            task,
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerHandle
// ---------------------------------------------------------------------------

/// Handle to a running detection loop.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SchedulerState>,
    sample_rx: watch::Receiver<FrameSample>,
    task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request teardown. Returns immediately: no further cycles start, but
    /// an in-flight detect is allowed to finish and be discarded.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Receiver for state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    /// The latest frame sample (landmarks or a recorded miss). Replaced
    /// wholesale each cycle; consumers must treat it as read-only.
    pub fn latest_sample(&self) -> FrameSample {
        self.sample_rx.borrow().clone()
    }

    /// Receiver for per-cycle frame samples.
    pub fn subscribe_samples(&self) -> watch::Receiver<FrameSample> {
        self.sample_rx.clone()
    }

    /// Stop and wait for the loop task to finish its teardown.
    pub async fn join(self) {
        self.stop();
        let _ = self.task.await;
    }
}

// ---------------------------------------------------------------------------
// Loop implementation
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn run(
    detector: Arc<dyn Detector>,
    feed: FrameFeed,
    config: SchedulerConfig,
    mut visibility: watch::Receiver<bool>,
    mut stop: watch::Receiver<bool>,
    state_tx: watch::Sender<SchedulerState>,
    sample_tx: watch::Sender<FrameSample>,
    on_count: Box<dyn Fn(u8) + Send + Sync>,
) {
    let mut frame_rx = feed.subscribe();
    let mut status_rx = detector.status();

    drive(
        &detector,
        &config,
        &mut frame_rx,
        &mut status_rx,
        &mut visibility,
        &mut stop,
        &state_tx,
        &sample_tx,
        on_count.as_ref(),
    )
    .await;

    // Teardown: stop the camera exactly once, then clear the provider.
    log::info!("scheduler: tearing down");
    let mut feed = feed;
    let _ = tokio::task::spawn_blocking(move || feed.stop()).await;
    detector.dispose();
    state_tx.send_replace(SchedulerState::Idle);
}

#[allow(clippy::too_many_arguments)]
async fn drive(
    detector: &Arc<dyn Detector>,
    config: &SchedulerConfig,
    frame_rx: &mut watch::Receiver<Option<crate::capture::VideoFrame>>,
    status_rx: &mut watch::Receiver<EngineStatus>,
    visibility: &mut watch::Receiver<bool>,
    stop: &mut watch::Receiver<bool>,
    state_tx: &watch::Sender<SchedulerState>,
    sample_tx: &watch::Sender<FrameSample>,
    on_count: &(dyn Fn(u8) + Send + Sync),
) {
    state_tx.send_replace(SchedulerState::AwaitingCamera);

    // Phase 1: both the camera and the provider must be ready.
    loop {
        if *stop.borrow() {
            return;
        }
        let frame_sized = frame_rx
            .borrow()
            .as_ref()
            .map(|f| f.width > 0 && f.height > 0)
            .unwrap_or(false);
        let status = *status_rx.borrow();

        if status == EngineStatus::Failed {
            log::error!("scheduler: detection backend failed; not starting the loop");
            return;
        }
        if frame_sized && status.is_ready() {
            break;
        }

        let bail = tokio::select! {
            r = frame_rx.changed() => r.is_err(),
            r = status_rx.changed() => r.is_err(),
            r = stop.changed() => r.is_err(),
        };
        if bail {
            return;
        }
    }

    state_tx.send_replace(SchedulerState::Detecting);
    log::info!("scheduler: detection loop running");

    let mut stabilizer = CountStabilizer::new(config.history_capacity);
    let mut last_detection: Option<Instant> = None;

    loop {
        if *stop.borrow() {
            return;
        }

        // Visibility gate: park while hidden, resume automatically.
        if !*visibility.borrow() {
            if *state_tx.borrow() != SchedulerState::Suspended {
                state_tx.send_replace(SchedulerState::Suspended);
                log::debug!("scheduler: suspended (host hidden)");
            }
            let bail = tokio::select! {
                r = visibility.changed() => r.is_err(),
                r = stop.changed() => r.is_err(),
            };
            if bail {
                return;
            }
            continue;
        }
        if *state_tx.borrow() == SchedulerState::Suspended {
            state_tx.send_replace(SchedulerState::Detecting);
            log::debug!("scheduler: resumed");
        }

        // Pace the next cycle.
        let bail = match config.pacing {
            FramePacing::VideoSynced => tokio::select! {
                r = frame_rx.changed() => r.is_err(),
                r = stop.changed() => r.is_err(),
            },
            FramePacing::Interval(period) => tokio::select! {
                _ = tokio::time::sleep(period) => false,
                r = stop.changed() => r.is_err(),
            },
        };
        if bail || *stop.borrow() {
            return;
        }

        // Rate-limit by the active engine's minimum interval.
        let engine = match *status_rx.borrow() {
            EngineStatus::Ready { engine, .. } => engine,
            _ => EngineKind::Full,
        };
        let interval = Duration::from_millis(engine.detection_interval_ms(config.mobile));
        if let Some(at) = last_detection {
            if at.elapsed() < interval {
                continue;
            }
        }

        // Snapshot the current frame once per cycle.
        let Some(frame) = frame_rx.borrow_and_update().clone() else {
            continue;
        };
        if frame.width == 0 || frame.height == 0 {
            continue;
        }
        last_detection = Some(Instant::now());

        let aspect = frame.aspect_ratio();
        let frame_id = frame.frame_id;
        let timestamp_ms = frame.timestamp_ms;

        // One suspension point: cycle N+1 cannot start before this settles,
        // so at most one provider call is ever outstanding.
        let raw = match detector.detect(frame).await {
            Ok(Some(landmarks)) => {
                let count = count_extended_fingers(&landmarks, aspect);
                sample_tx.send_replace(FrameSample {
                    landmarks: Some(landmarks),
                    frame_id,
                    timestamp_ms,
                });
                count
            }
            Ok(None) => {
                sample_tx.send_replace(FrameSample {
                    landmarks: None,
                    frame_id,
                    timestamp_ms,
                });
                0
            }
            Err(e) => {
                // Recovered locally: a failed cycle is a null-landmark frame.
                log::warn!("scheduler: detection cycle failed (treated as no hand): {e}");
                sample_tx.send_replace(FrameSample {
                    landmarks: None,
                    frame_id,
                    timestamp_ms,
                });
                0
            }
        };

        let smoothed = stabilizer.push(raw);
        if smoothed.changed {
            on_count(smoothed.count);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{SyntheticSource, VideoFrame};
    use crate::detect::{DetectError, HandTracker, ScriptedBuilder};
    use crate::landmark::{synthetic, Landmark};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Poll until `predicate` holds, failing after ~2 s.
    async fn wait_until(mut predicate: impl FnMut() -> bool, what: &str) {
        for _ in 0..200 {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for: {what}");
    }

    fn counts_sink() -> (Arc<Mutex<Vec<u8>>>, impl Fn(u8) + Send + 'static) {
        let counts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&counts);
        (counts, move |c| sink.lock().unwrap().push(c))
    }

    async fn ready_tracker(frames: Vec<Option<Vec<Landmark>>>) -> Arc<HandTracker> {
        let tracker = Arc::new(HandTracker::new(Arc::new(ScriptedBuilder::new(frames))));
        tracker.initialize(EngineKind::Lite).await.unwrap();
        tracker
    }

    #[tokio::test]
    async fn pipeline_reaches_detecting_and_reports_a_count() {
        let tracker = ready_tracker(vec![Some(synthetic::open_hand())]).await;
        let feed = FrameFeed::start(Box::new(SyntheticSource::new(32, 24, 5)));
        let (_, vis_rx) = watch::channel(true);
        let (counts, sink) = counts_sink();

        let handle = DetectionScheduler::start(
            tracker,
            feed,
            SchedulerConfig::default(),
            vis_rx,
            sink,
        );

        wait_until(|| !counts.lock().unwrap().is_empty(), "first count").await;
        assert_eq!(handle.state(), SchedulerState::Detecting);

        // A steady open hand reports 5 exactly once — the callback fires on
        // change only, never per frame.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*counts.lock().unwrap(), vec![5]);

        // The landmark snapshot is published for consumers.
        let sample = handle.latest_sample();
        assert!(sample.landmarks.is_some());

        handle.join().await;
    }

    #[tokio::test]
    async fn no_hand_reports_zero_once() {
        let tracker = ready_tracker(vec![None]).await;
        let feed = FrameFeed::start(Box::new(SyntheticSource::new(16, 16, 5)));
        let (_, vis_rx) = watch::channel(true);
        let (counts, sink) = counts_sink();

        let handle = DetectionScheduler::start(
            tracker,
            feed,
            SchedulerConfig::default(),
            vis_rx,
            sink,
        );

        wait_until(|| !counts.lock().unwrap().is_empty(), "first count").await;
        assert_eq!(*counts.lock().unwrap(), vec![0]);
        let sample = handle.latest_sample();
        assert!(sample.landmarks.is_none());

        handle.join().await;
    }

    #[tokio::test]
    async fn waits_in_awaiting_camera_until_provider_ready() {
        // Tracker constructed but not initialized: the scheduler must sit in
        // AwaitingCamera.
        let tracker = Arc::new(HandTracker::new(Arc::new(ScriptedBuilder::new(vec![
            Some(synthetic::open_hand()),
        ]))));
        let feed = FrameFeed::start(Box::new(SyntheticSource::new(16, 16, 5)));
        let (_, vis_rx) = watch::channel(true);
        let (counts, sink) = counts_sink();

        let handle = DetectionScheduler::start(
            Arc::clone(&tracker) as Arc<dyn Detector>,
            feed,
            SchedulerConfig::default(),
            vis_rx,
            sink,
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.state(), SchedulerState::AwaitingCamera);
        assert!(counts.lock().unwrap().is_empty());

        // Initialise late: the scheduler must pick it up and start.
        tracker.initialize(EngineKind::Lite).await.unwrap();
        wait_until(|| !counts.lock().unwrap().is_empty(), "loop start").await;

        handle.join().await;
    }

    #[tokio::test]
    async fn hidden_host_suspends_and_resumes() {
        /// Detector stub that counts calls.
        struct Counting {
            calls: AtomicUsize,
            rx: watch::Receiver<EngineStatus>,
            _tx: watch::Sender<EngineStatus>,
        }

        impl Counting {
            fn new() -> Self {
                let (tx, rx) = watch::channel(EngineStatus::Ready {
                    engine: EngineKind::Lite,
                    fell_back: false,
                });
                Self {
                    calls: AtomicUsize::new(0),
                    rx,
                    _tx: tx,
                }
            }
        }

        #[async_trait]
        impl Detector for Counting {
            async fn detect(
                &self,
                _frame: VideoFrame,
            ) -> Result<Option<Vec<Landmark>>, DetectError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
            fn status(&self) -> watch::Receiver<EngineStatus> {
                self.rx.clone()
            }
            fn dispose(&self) {}
        }

        let detector = Arc::new(Counting::new());
        let feed = FrameFeed::start(Box::new(SyntheticSource::new(16, 16, 5)));
        let (vis_tx, vis_rx) = watch::channel(true);
        let (_, sink) = counts_sink();

        let handle = DetectionScheduler::start(
            Arc::clone(&detector) as Arc<dyn Detector>,
            feed,
            SchedulerConfig::default(),
            vis_rx,
            sink,
        );

        let d = Arc::clone(&detector);
        wait_until(move || d.calls.load(Ordering::SeqCst) > 0, "first detect").await;

        // Hide the host: the loop must park and stop issuing detect calls.
        vis_tx.send_replace(false);
        let h = handle.subscribe_state();
        wait_until(
            move || *h.borrow() == SchedulerState::Suspended,
            "suspension",
        )
        .await;

        let before = detector.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        let after = detector.calls.load(Ordering::SeqCst);
        // One call may have been in flight when visibility flipped.
        assert!(after <= before + 1, "detect ran while suspended");

        // Visibility regained: detection resumes automatically.
        vis_tx.send_replace(true);
        let d = Arc::clone(&detector);
        wait_until(
            move || d.calls.load(Ordering::SeqCst) > after,
            "resume",
        )
        .await;
        assert_eq!(handle.state(), SchedulerState::Detecting);

        handle.join().await;
    }

    #[tokio::test]
    async fn provider_calls_never_overlap() {
        /// Slow detector that asserts call concurrency ≤ 1.
        struct Slow {
            current: AtomicUsize,
            max_seen: AtomicUsize,
            total: AtomicUsize,
            rx: watch::Receiver<EngineStatus>,
            _tx: watch::Sender<EngineStatus>,
        }

        impl Slow {
            fn new() -> Self {
                let (tx, rx) = watch::channel(EngineStatus::Ready {
                    engine: EngineKind::Lite,
                    fell_back: false,
                });
                Self {
                    current: AtomicUsize::new(0),
                    max_seen: AtomicUsize::new(0),
                    total: AtomicUsize::new(0),
                    rx,
                    _tx: tx,
                }
            }
        }

        #[async_trait]
        impl Detector for Slow {
            async fn detect(
                &self,
                _frame: VideoFrame,
            ) -> Result<Option<Vec<Landmark>>, DetectError> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(now, Ordering::SeqCst);
                // Far longer than the frame interval: overlap would be
                // visible if the scheduler ever double-issued.
                tokio::time::sleep(Duration::from_millis(80)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                self.total.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
            fn status(&self) -> watch::Receiver<EngineStatus> {
                self.rx.clone()
            }
            fn dispose(&self) {}
        }

        let detector = Arc::new(Slow::new());
        let feed = FrameFeed::start(Box::new(SyntheticSource::new(16, 16, 2)));
        let (_, vis_rx) = watch::channel(true);
        let (_, sink) = counts_sink();

        let config = SchedulerConfig {
            pacing: FramePacing::Interval(Duration::from_millis(1)),
            ..SchedulerConfig::default()
        };
        let handle = DetectionScheduler::start(
            Arc::clone(&detector) as Arc<dyn Detector>,
            feed,
            config,
            vis_rx,
            sink,
        );

        let d = Arc::clone(&detector);
        wait_until(move || d.total.load(Ordering::SeqCst) >= 3, "three cycles").await;
        handle.join().await;

        assert_eq!(
            detector.max_seen.load(Ordering::SeqCst),
            1,
            "provider calls overlapped"
        );
    }

    #[tokio::test]
    async fn stop_is_immediate_and_join_reaches_idle() {
        let tracker = ready_tracker(vec![Some(synthetic::open_hand())]).await;
        let feed = FrameFeed::start(Box::new(SyntheticSource::new(16, 16, 5)));
        let (_, vis_rx) = watch::channel(true);
        let (_, sink) = counts_sink();

        let handle = DetectionScheduler::start(
            tracker,
            feed,
            SchedulerConfig::default(),
            vis_rx,
            sink,
        );

        // stop() must return without awaiting anything.
        let begun = Instant::now();
        handle.stop();
        assert!(begun.elapsed() < Duration::from_millis(50));

        let state_rx = handle.subscribe_state();
        handle.join().await;
        assert_eq!(*state_rx.borrow(), SchedulerState::Idle);
    }
}
