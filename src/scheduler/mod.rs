//! Detection scheduling: the loop that drives the whole pipeline.
//!
//! [`DetectionScheduler`] runs capture → detect → classify → stabilize at a
//! bounded rate, respecting host visibility and the in-flight-exclusivity
//! invariant, and publishes its [`SchedulerState`] and the latest landmark
//! snapshot for the surrounding application.

pub mod runner;
pub mod state;

pub use runner::{DetectionScheduler, FramePacing, SchedulerConfig, SchedulerHandle};
pub use state::SchedulerState;
