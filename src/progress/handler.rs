//! Progress handler trait and events

use crate::pipeline::Step;
use std::time::Duration;

/// Events emitted while the pipeline runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Pipeline started
    Started { package: String, platforms: usize },

    /// A platform iteration started
    PlatformStarted {
        platform: String,
        index: usize,
        total: usize,
    },

    /// A step of the current platform started
    StepStarted { platform: String, step: Step },

    /// A step of the current platform finished successfully
    StepComplete {
        platform: String,
        step: Step,
        duration: Duration,
    },

    /// A platform iteration finished and its artifact was copied out
    PlatformComplete {
        platform: String,
        index: usize,
        total: usize,
        duration: Duration,
    },

    /// Best-effort cleanup after a failure did not succeed
    TeardownFailed {
        platform: String,
        instance: String,
        error: String,
    },

    /// All platforms built
    Completed {
        platforms: usize,
        total_time: Duration,
    },

    /// Pipeline aborted
    Failed { platform: String, error: String },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
