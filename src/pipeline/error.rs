use super::Step;
use crate::engine::ProcessError;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Error writing generated descriptor {}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error creating artifact directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The {step} step failed for platform {platform}")]
    Step {
        platform: String,
        step: Step,
        #[source]
        source: ProcessError,
    },
}

impl PipelineError {
    /// The step that failed
    pub fn step(&self) -> Step {
        match self {
            PipelineError::Template(_) => Step::Render,
            PipelineError::Persist { .. } => Step::Persist,
            PipelineError::CreateDir { .. } => Step::Extract,
            PipelineError::Step { step, .. } => *step,
        }
    }
}
