//! Pipeline-specific error types.

use crate::pipeline::message::Diagnostic;
use thiserror::Error;

/// Errors that can occur while compiling or running a cast pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A filter, NA check, find-first or coercion failed for the current call
    #[error("{0}")]
    Validation(Diagnostic),

    /// The step chain contains a combination the compiler cannot lower
    #[error("Internal configuration error in {step} step: {message}")]
    InternalConfiguration { step: &'static str, message: String },
}

impl PipelineError {
    pub fn configuration(step: &'static str, message: impl Into<String>) -> Self {
        PipelineError::InternalConfiguration {
            step,
            message: message.into(),
        }
    }

    /// The raised diagnostic, for validation errors
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            PipelineError::Validation(diag) => Some(diag),
            PipelineError::InternalConfiguration { .. } => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
