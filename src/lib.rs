//! rpmbox - templated multi-platform RPM builds through a container engine
//!
//! For each target platform, rpmbox renders a build descriptor from a template,
//! builds an image from it with an external container engine (`docker` by default),
//! runs an instance, copies the produced RPM out, and stops the instance.
//!
//! # Example Usage
//!
//! ```no_run
//! use rpmbox::{BuildConfig, ContainerEngine, DescriptorTemplate, PipelineOrchestrator, SystemRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = BuildConfig::builder("collectd", "5.4.1")
//!     .revision("1")
//!     .platforms(["el6", "el7"])
//!     .base_dir("/srv/rpmbox")
//!     .build();
//!
//! let template = DescriptorTemplate::load(&config.template_path)?;
//! let orchestrator = PipelineOrchestrator::new(
//!     SystemRunner::new(),
//!     ContainerEngine::new(&config.engine_path),
//! );
//!
//! let summary = orchestrator.execute(&mut config, &template).await?;
//! for build in &summary.builds {
//!     println!("{} -> {}", build.platform, build.artifact.destination);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`config`]: option resolution and defaults
//! - [`template`]: descriptor templating
//! - [`engine`]: process execution and engine command lines
//! - [`artifact`]: artifact source and destination paths
//! - [`pipeline`]: the per-platform build sequence
//! - [`progress`]: progress events

pub mod artifact;
pub mod cli;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod progress;
pub mod template;
pub mod util;

pub use artifact::{locate, ArtifactLocation};
pub use config::{BuildConfig, ConfigError, ConfigResolver};
pub use engine::{CommandRunner, ContainerEngine, Invocation, MockRunner, ProcessError, SystemRunner};
pub use pipeline::{PipelineError, PipelineOrchestrator, PipelineSummary, PlatformBuild, Step};
pub use template::{DescriptorTemplate, TemplateError};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_rpmbox() {
        assert_eq!(NAME, "rpmbox");
    }
}
