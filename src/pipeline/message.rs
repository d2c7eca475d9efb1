//! Message templates and raised diagnostics.
//!
//! Pipelines never render text themselves: a failing unit turns its resolved
//! [`MessageTemplate`] into a [`Diagnostic`] carrying the template, the
//! positional arguments and the severity. Presentation belongs to the host.

use serde::{Deserialize, Serialize};

/// Default-default error message, used when nothing more specific is configured.
pub const INVALID_ARGUMENT: &str = "invalid argument '%s'";

/// Built-in message raised by `FindFirst` on empty input.
pub const LENGTH_ZERO: &str = "argument of length zero";

/// Warning raised when a string cannot be parsed during coercion.
pub const NA_INTRODUCED_COERCION: &str = "NAs introduced by coercion";

/// Warning raised when complex values lose their imaginary part.
pub const IMAGINARY_PARTS_DISCARDED: &str = "imaginary parts discarded in coercion";

/// Warning raised for out-of-range raw conversions.
pub const OUT_OF_RANGE_RAW: &str = "out-of-range values treated as 0 in coercion to raw";

/// Error raised when a value has no coercion to the requested type.
pub const CANNOT_COERCE: &str = "cannot coerce type '%s' to vector of type '%s'";

/// A positional message argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageArg {
    /// Replaced by the name of the argument being cast
    ArgumentName,
    Text(String),
}

/// An unrendered message: a `%s` template plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub template: String,
    #[serde(default)]
    pub args: Vec<MessageArg>,
}

impl MessageTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
        }
    }

    /// Append the argument-name placeholder
    pub fn with_argument_name(mut self) -> Self {
        self.args.push(MessageArg::ArgumentName);
        self
    }

    /// Append a literal argument
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.args.push(MessageArg::Text(text.into()));
        self
    }

    /// The default-default message: `invalid argument '<name>'`
    pub fn invalid_argument() -> Self {
        Self::new(INVALID_ARGUMENT).with_argument_name()
    }

    pub fn length_zero() -> Self {
        Self::new(LENGTH_ZERO)
    }

    /// Substitute placeholders and produce a diagnostic
    pub fn raise(&self, argument: &str, is_warning: bool) -> Diagnostic {
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                MessageArg::ArgumentName => argument.to_string(),
                MessageArg::Text(text) => text.clone(),
            })
            .collect();
        Diagnostic {
            template: self.template.clone(),
            args,
            is_warning,
        }
    }
}

/// A raised error or warning, ready for the host's message subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub template: String,
    pub args: Vec<String>,
    pub is_warning: bool,
}

impl Diagnostic {
    /// Positional `%s` substitution; extra placeholders are left untouched
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut args = self.args.iter();
        let mut rest = self.template.as_str();
        while let Some(pos) = rest.find("%s") {
            out.push_str(&rest[..pos]);
            match args.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("%s"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_substitutes_argument_name() {
        let diag = MessageTemplate::invalid_argument().raise("na.rm", false);
        assert_eq!(diag.args, vec!["na.rm".to_string()]);
        assert_eq!(diag.render(), "invalid argument 'na.rm'");
        assert!(!diag.is_warning);
    }

    #[test]
    fn test_render_with_missing_args() {
        let diag = MessageTemplate::new("%s and %s").with_text("a").raise("x", true);
        assert_eq!(diag.render(), "a and %s");
        assert!(diag.is_warning);
    }
}
