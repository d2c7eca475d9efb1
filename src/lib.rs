//! # argcast: argument validation and coercion pipelines
//!
//! Builtin functions of an R-like runtime validate and coerce each argument
//! through a small declarative pipeline: coerce to a vector type, take the
//! first element, reject NA, check a predicate, branch on a condition. This
//! crate compiles such pipelines and runs them, with two shortcuts proven
//! safe ahead of time:
//!
//! - **Forwarding bypass**: inputs whose category provably passes through
//!   unchanged under every branch combination are returned without running
//!   anything.
//! - **Single-scalar fast path**: for the common "coerce, find first" shape
//!   an input that already is a scalar of the target type skips straight to
//!   the steps after the `FindFirst`.
//!
//! ## Configuration
//!
//! Per-argument settings live in `argcast.toml` under the platform config
//! directory (see [`config`]); pipelines can be declared in JSON files.
//!
//! ## Example
//!
//! ```
//! use argcast::pipeline::{ArgumentDeclaration, Filter};
//! use argcast::types::Value;
//!
//! let cast = ArgumentDeclaration::build("n", |b| {
//!     b.as_integer_vector()
//!         .find_first()
//!         .must_not_be_na()
//!         .must_be(Filter::gt(Value::Integer(0)))
//! })
//! .into_cast()
//! .unwrap();
//!
//! assert_eq!(cast.cast(Value::Double(3.0)).unwrap().value, Value::Integer(3));
//! assert!(cast.cast(Value::Integer(0)).is_err());
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::{ArgcastConfig, CastSettings, PipelineFile};
pub use error::{ArgcastError, Result};
pub use pipeline::{ArgumentCast, ArgumentDeclaration, Chain, PipelineBuilder, PipelineError};
pub use types::{SemanticType, Value};
