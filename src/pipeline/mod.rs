//! The multi-platform build pipeline
//!
//! For every configured platform, in order:
//!
//! 1. **render** the descriptor template with the platform bound
//! 2. **persist** it as `<package>/Dockerfile`
//! 3. **build** the image `<package>:build_<platform>`
//! 4. **launch** a uniquely named instance of it
//! 5. **extract** the RPM into `pkg/<package>/<platform>/`
//! 6. **teardown** the instance
//!
//! The first failure aborts the run. If it happens once an instance may exist
//! (launch or extract), the instance is stopped on a best-effort basis first.

mod error;
mod orchestrator;
mod step;

pub use error::PipelineError;
pub use orchestrator::{PipelineOrchestrator, PipelineSummary, PlatformBuild};
pub use step::{instance_name, Step};
