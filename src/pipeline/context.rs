//! Per-call execution context.

use crate::pipeline::error::PipelineError;
use crate::pipeline::message::{Diagnostic, MessageTemplate};

/// State of a single cast: the argument name used to fill message
/// placeholders and the warnings raised so far.
#[derive(Debug)]
pub struct CastContext<'a> {
    argument: &'a str,
    warnings: Vec<Diagnostic>,
}

impl<'a> CastContext<'a> {
    pub fn new(argument: &'a str) -> Self {
        Self {
            argument,
            warnings: Vec::new(),
        }
    }

    pub fn argument(&self) -> &str {
        self.argument
    }

    /// Record a warning; the cast continues
    pub fn warn(&mut self, message: &MessageTemplate) {
        let diag = message.raise(self.argument, true);
        tracing::trace!("argument '{}' raised warning: {}", self.argument, diag);
        self.warnings.push(diag);
    }

    /// Build the validation error for `message`
    pub fn error(&self, message: &MessageTemplate) -> PipelineError {
        PipelineError::Validation(message.raise(self.argument, false))
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Diagnostic> {
        self.warnings
    }
}
