//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { package, platforms } => {
                info!(package = %package, platforms, "Starting build");
            }
            ProgressEvent::PlatformStarted {
                platform,
                index,
                total,
            } => {
                info!(
                    platform = %platform,
                    progress = format!("{}/{}", index + 1, total),
                    "Building platform"
                );
            }
            ProgressEvent::StepStarted { platform, step } => {
                debug!(platform = %platform, step = %step, "Step started");
            }
            ProgressEvent::StepComplete {
                platform,
                step,
                duration,
            } => {
                debug!(
                    platform = %platform,
                    step = %step,
                    duration_ms = duration.as_millis(),
                    "Step complete"
                );
            }
            ProgressEvent::PlatformComplete {
                platform,
                index,
                total,
                duration,
            } => {
                info!(
                    platform = %platform,
                    progress = format!("{}/{}", index + 1, total),
                    duration_ms = duration.as_millis(),
                    "Platform complete"
                );
            }
            ProgressEvent::TeardownFailed {
                platform,
                instance,
                error,
            } => {
                warn!(
                    platform = %platform,
                    instance = %instance,
                    error = %error,
                    "Teardown after failure did not succeed; the instance may still exist"
                );
            }
            ProgressEvent::Completed {
                platforms,
                total_time,
            } => {
                info!(
                    platforms,
                    total_time_ms = total_time.as_millis(),
                    "Build complete"
                );
            }
            ProgressEvent::Failed { platform, error } => {
                error!(platform = %platform, error = %error, "Build failed");
            }
        }
    }
}
