//! Detection offload: run the landmark model on a dedicated worker thread.
//!
//! The worker owns its own backend and is spoken to exclusively through
//! typed messages — frames move *into* [`DetectRequest::Detect`] (ownership
//! handoff, never a shared buffer) and results come back tagged with the
//! frame id they belong to, so the caller can correlate asynchronous
//! replies even when they arrive out of order with new requests.
//!
//! Each outstanding request is backed by a oneshot future keyed by frame
//! id; there is no polling and no shared mutable state across the thread
//! boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use crate::capture::VideoFrame;
use crate::landmark::Landmark;

use super::model::{build_with_fallback, DetectError, EngineKind, LandmarkModel, ModelBuilder};
use super::tracker::{Detector, EngineStatus};

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Requests accepted by the detection worker.
#[derive(Debug)]
pub enum DetectRequest {
    /// Build the backend (with the lite→full fallback policy).
    Init { preferred: EngineKind },
    /// Detect a hand in `frame`. The frame carries its own dimensions and
    /// id; ownership transfers to the worker, which drops the pixel data
    /// as soon as inference is done.
    Detect { frame: VideoFrame },
    /// Release the backend and stop the thread.
    Terminate,
}

/// Replies produced by the detection worker.
#[derive(Debug)]
pub enum DetectReply {
    /// The backend finished initialising.
    Ready { engine: EngineKind, fell_back: bool },
    /// Result for the frame with this id. `None` landmarks = no hand (also
    /// used for per-frame inference errors, which are logged and otherwise
    /// invisible downstream).
    Detection {
        landmarks: Option<Vec<Landmark>>,
        frame_id: u64,
    },
    /// Initialisation failed; the worker stays up but will answer every
    /// detect with an empty result.
    Error { message: String },
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Option<Vec<Landmark>>>>>>;

// ---------------------------------------------------------------------------
// DetectionWorker
// ---------------------------------------------------------------------------

/// Handle to a detection worker thread.
///
/// Spawn with [`DetectionWorker::spawn`] (requires a tokio runtime — the
/// reply pump is a tokio task), then drive it through the [`Detector`]
/// trait like any in-process tracker.
pub struct DetectionWorker {
    /// `None` after dispose; requests fail with [`DetectError::WorkerGone`].
    req_tx: Mutex<Option<std::sync::mpsc::Sender<DetectRequest>>>,
    pending: PendingMap,
    status_rx: watch::Receiver<EngineStatus>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl DetectionWorker {
    /// Spawn the worker thread and its reply pump.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread, or when called
    /// outside a tokio runtime.
    pub fn spawn(builder: Arc<dyn ModelBuilder>) -> Self {
        let (req_tx, req_rx) = std::sync::mpsc::channel::<DetectRequest>();
        let (reply_tx, mut reply_rx) = mpsc::channel::<DetectReply>(32);
        let (status_tx, status_rx) = watch::channel(EngineStatus::Idle);

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let last_error = Arc::new(Mutex::new(None::<String>));

        // Worker thread: owns the model, answers requests in queue order.
        // A Detect that arrives before Init has completed simply waits its
        // turn in the queue — no readiness polling.
        std::thread::Builder::new()
            .name("detect-worker".into())
            .spawn(move || {
                let mut model: Option<Box<dyn LandmarkModel>> = None;

                while let Ok(request) = req_rx.recv() {
                    match request {
                        DetectRequest::Init { preferred } => {
                            match build_with_fallback(builder.as_ref(), preferred) {
                                Ok((built, fell_back)) => {
                                    let engine = built.kind();
                                    model = Some(built);
                                    let _ = reply_tx
                                        .blocking_send(DetectReply::Ready { engine, fell_back });
                                }
                                Err(e) => {
                                    let _ = reply_tx.blocking_send(DetectReply::Error {
                                        message: e.to_string(),
                                    });
                                }
                            }
                        }
                        DetectRequest::Detect { frame } => {
                            let frame_id = frame.frame_id;
                            let landmarks = match model.as_ref() {
                                Some(m) => match m.detect(&frame) {
                                    Ok(lm) => lm,
                                    Err(e) => {
                                        log::warn!("detect-worker: inference failed: {e}");
                                        None
                                    }
                                },
                                None => None,
                            };
                            // `frame` drops here — the transferred bitmap is
                            // freed by the side that consumed it.
                            let _ = reply_tx
                                .blocking_send(DetectReply::Detection { landmarks, frame_id });
                        }
                        DetectRequest::Terminate => {
                            model.take();
                            break;
                        }
                    }
                }
                log::debug!("detect-worker thread exiting");
            })
            .expect("failed to spawn detect-worker thread");

        // Reply pump: resolves per-request futures and tracks status.
        let pump_pending = Arc::clone(&pending);
        let pump_error = Arc::clone(&last_error);
        tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                match reply {
                    DetectReply::Ready { engine, fell_back } => {
                        status_tx.send_replace(EngineStatus::Ready { engine, fell_back });
                    }
                    DetectReply::Error { message } => {
                        log::error!("detect-worker: {message}");
                        *pump_error.lock().unwrap() = Some(message);
                        status_tx.send_replace(EngineStatus::Failed);
                    }
                    DetectReply::Detection {
                        landmarks,
                        frame_id,
                    } => {
                        let waiter = pump_pending.lock().unwrap().remove(&frame_id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(landmarks);
                            }
                            None => log::debug!(
                                "detect-worker: reply for frame {frame_id} had no waiter"
                            ),
                        }
                    }
                }
            }
        });

        Self {
            req_tx: Mutex::new(Some(req_tx)),
            pending,
            status_rx,
            last_error,
        }
    }

    fn send(&self, request: DetectRequest) -> Result<(), DetectError> {
        let guard = self.req_tx.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.send(request).map_err(|_| DetectError::WorkerGone),
            None => Err(DetectError::WorkerGone),
        }
    }

    /// Queue backend initialisation and wait for it to settle.
    ///
    /// Concurrent detect requests queued behind the init are answered after
    /// it completes, in order.
    pub async fn initialize(&self, preferred: EngineKind) -> Result<(), DetectError> {
        self.send(DetectRequest::Init { preferred })?;

        let mut rx = self.status_rx.clone();
        loop {
            let status = *rx.borrow_and_update();
            match status {
                EngineStatus::Ready { .. } => return Ok(()),
                EngineStatus::Failed => {
                    let message = self
                        .last_error
                        .lock()
                        .unwrap()
                        .clone()
                        .unwrap_or_else(|| "unknown worker error".into());
                    return Err(DetectError::Init(message));
                }
                _ => {}
            }
            if rx.changed().await.is_err() {
                return Err(DetectError::WorkerGone);
            }
        }
    }
}

#[async_trait]
impl Detector for DetectionWorker {
    /// Queue a detect request and await its correlated reply.
    ///
    /// Frame ids must be unique among outstanding requests (the capture
    /// feed guarantees this). A worker that terminates mid-request resolves
    /// the future as "no hand".
    async fn detect(&self, frame: VideoFrame) -> Result<Option<Vec<Landmark>>, DetectError> {
        let frame_id = frame.frame_id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(frame_id, tx);

        if let Err(e) = self.send(DetectRequest::Detect { frame }) {
            self.pending.lock().unwrap().remove(&frame_id);
            return Err(e);
        }

        match rx.await {
            Ok(landmarks) => Ok(landmarks),
            // Sender dropped (worker terminated): a defined miss.
            Err(_) => Ok(None),
        }
    }

    fn status(&self) -> watch::Receiver<EngineStatus> {
        self.status_rx.clone()
    }

    /// Terminate the worker. Idempotent; outstanding requests resolve as
    /// "no hand".
    fn dispose(&self) {
        let taken = self.req_tx.lock().unwrap().take();
        if let Some(tx) = taken {
            let _ = tx.send(DetectRequest::Terminate);
            log::info!("detect-worker terminated");
        }
        // Drop any waiters so callers are not left hanging.
        self.pending.lock().unwrap().clear();
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
