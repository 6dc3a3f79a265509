use super::StepError;
use serde::Serialize;
use thiserror::Error;

/// The pipeline stage a run failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Options,
    Expand,
    Resolve,
    Execute,
}

/// Run-level errors. Any of these aborts the whole run at its stage,
/// before or instead of producing feature results.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Options error: {0}")]
    Options(String),
    #[error("Expand error: {0}")]
    Expand(String),
    #[error("Resolve error in '{path}': {source}")]
    Resolve {
        path: String,
        #[source]
        source: StepError,
    },
    #[error("Execute error: {0}")]
    Execute(String),
}

impl RunError {
    /// The stage this error aborts at.
    pub fn stage(&self) -> RunStage {
        match self {
            RunError::Options(_) => RunStage::Options,
            RunError::Expand(_) => RunStage::Expand,
            RunError::Resolve { .. } => RunStage::Resolve,
            RunError::Execute(_) => RunStage::Execute,
        }
    }
}
