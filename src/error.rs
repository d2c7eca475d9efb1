//! Error handling for argcast
//!
//! This module defines the crate-level error type and a Result alias used by
//! configuration loading and the binary. Pipeline compilation and casting use
//! [`PipelineError`](crate::pipeline::PipelineError), which converts into
//! [`ArgcastError`].

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for argcast operations
#[derive(Error, Debug)]
pub enum ArgcastError {
    /// Validation or configuration errors raised by a cast pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ArgcastError>,
    },
}

impl ArgcastError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ArgcastError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The pipeline error at the bottom of any context chain
    pub fn pipeline_error(&self) -> Option<&PipelineError> {
        match self {
            ArgcastError::Pipeline(e) => Some(e),
            ArgcastError::WithContext { source, .. } => source.pipeline_error(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ArgcastError {
    fn from(err: serde_json::Error) -> Self {
        ArgcastError::Serialization(err.to_string())
    }
}

/// Result type alias for argcast operations
pub type Result<T> = std::result::Result<T, ArgcastError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ArgcastError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArgcastError::Config("missing defaults table".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing defaults table");
    }

    #[test]
    fn test_error_with_context() {
        let err = ArgcastError::Serialization("test".to_string());
        let with_ctx = err.with_context("Failed to parse");
        assert!(with_ctx.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_pipeline_error_through_context() {
        let inner = PipelineError::configuration("filter", "bad operator");
        let result: std::result::Result<(), PipelineError> = Err(inner.clone());
        let err = result.context("Failed to compile argument 'x'").unwrap_err();
        assert_eq!(err.pipeline_error(), Some(&inner));
        assert!(err.to_string().starts_with("Failed to compile argument 'x'"));
    }

    #[test]
    fn test_io_error_context() {
        let result: std::result::Result<String, std::io::Error> =
            std::fs::read_to_string("/definitely/not/here.toml");
        let err = result.with_context(|| "Failed to read config".to_string()).unwrap_err();
        assert!(matches!(err, ArgcastError::WithContext { .. }));
    }
}
