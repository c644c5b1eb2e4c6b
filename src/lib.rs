//! Real-time hand-landmark detection pipeline for a finger-counting
//! rhythm game.
//!
//! The pipeline captures live video, runs hand-landmark detection through
//! one of two interchangeable backends, converts the 21-point landmark set
//! into an extended-finger count, stabilizes that count against detector
//! jitter, and hands the result to the game over a count-changed callback.
//! An independent worker thread composites frames (crop, mirror, text
//! overlays) for recording without ever touching the detection path.
//!
//! # Module map
//!
//! - [`capture`] — video frames, camera / synthetic sources, the feed thread
//! - [`detect`] — the dual-backend landmark provider adapter
//! - [`landmark`] — data model, finger-count geometry, mode smoothing
//! - [`scheduler`] — the detection loop and its state machine
//! - [`compositor`] — the off-thread render worker
//! - [`config`] — TOML settings and platform paths
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use finger_rhythm::capture::{FrameFeed, SyntheticSource};
//! use finger_rhythm::detect::{EngineKind, HandTracker, ScriptedBuilder};
//! use finger_rhythm::scheduler::{DetectionScheduler, SchedulerConfig};
//! use tokio::sync::watch;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tracker = Arc::new(HandTracker::new(Arc::new(ScriptedBuilder::empty())));
//! tracker.initialize(EngineKind::Lite).await?;
//!
//! let feed = FrameFeed::start(Box::new(SyntheticSource::vga()));
//! let (_visibility, visibility_rx) = watch::channel(true);
//!
//! let handle = DetectionScheduler::start(
//!     tracker,
//!     feed,
//!     SchedulerConfig::default(),
//!     visibility_rx,
//!     |count| println!("fingers: {count}"),
//! );
//! # handle.join().await;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod compositor;
pub mod config;
pub mod detect;
pub mod error;
pub mod landmark;
pub mod scheduler;

pub use error::PipelineError;
