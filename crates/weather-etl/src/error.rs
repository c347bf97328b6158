//! Pipeline error types.

use thiserror::Error;

use crate::dag::Task;
use crate::extract::FetchError;
use crate::load::WriteError;
use crate::transform::TransformError;

/// A failed run, tagged with the task that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extract_weather_data failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("transform_weather_data failed: {0}")]
    Transform(#[from] TransformError),

    #[error("load_weather_data failed: {0}")]
    Write(#[from] WriteError),

    /// Step input handed over by the scheduler could not be decoded
    #[error("invalid input for {task}: {message}")]
    Input { task: Task, message: String },
}

impl PipelineError {
    /// The task that failed.
    pub fn task(&self) -> Task {
        match self {
            PipelineError::Fetch(_) => Task::Extract,
            PipelineError::Transform(_) => Task::Transform,
            PipelineError::Write(_) => Task::Load,
            PipelineError::Input { task, .. } => *task,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
