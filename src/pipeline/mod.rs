//! Argument cast pipelines.
//!
//! A declarative [`Chain`] of [`Step`]s describes how one function argument is
//! validated and coerced. From the chain three artifacts are derived:
//!
//! ```text
//!                 ┌─► PipelineCompiler ──► CompiledPipeline
//! Chain (steps) ──┼─► analysis::analyze ─► ForwardingAnalysisResult
//!                 └─► fast_path::recognize ─► Option<FastPathDescriptor>
//! ```
//!
//! At call time [`ArgumentCast::cast`] tries the forwarding bypass, then the
//! fast path, then the general pipeline.
//!
//! # Design
//!
//! - **Sum types** for steps, filters, mappers and units; exhaustive matches.
//! - **Explicit compiler state**: [`CompilerState`] is advanced per step.
//! - **Short-circuit as `ControlFlow`**: a taken short-circuiting branch
//!   breaks out of every enclosing chain.
//! - **Immutable artifacts**: cached once per argument in `OnceLock`s.

pub mod analysis;
pub mod builder;
pub mod bypass;
pub mod coercion;
pub mod compiled_pipeline;
pub mod compiler;
pub mod context;
pub mod error;
pub mod fast_path;
pub mod filter;
pub mod mapper;
pub mod message;
pub mod predicate;
pub mod step;

pub use analysis::{
    analyze, BranchEnumerator, ForwardingAnalysisResult, PathOutcome, SentinelCategory, Symbolic,
};
pub use builder::{ArgumentDeclaration, PipelineBuilder};
pub use bypass::{ArgumentCast, CastOutcome, CastRoute};
pub use compiled_pipeline::{CastUnit, CompiledChain, CompiledPipeline, PipelineStats};
pub use compiler::{CompilerState, PipelineCompiler};
pub use context::CastContext;
pub use error::{PipelineError, PipelineResult};
pub use fast_path::FastPathDescriptor;
pub use filter::{
    CompareOp, CompareSubject, DoubleKind, Filter, FilterKind, MatrixKind, Tristate, ValueClass,
};
pub use mapper::Mapper;
pub use message::{Diagnostic, MessageArg, MessageTemplate};
pub use step::{
    AttributableCoercionStep, Chain, CoercionStep, FilterStep, FindFirstStep, MapIfStep,
    NotNaStep, Step,
};
