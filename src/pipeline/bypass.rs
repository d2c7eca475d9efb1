//! Per-argument cast entry point.
//!
//! [`ArgumentCast`] owns one step chain and everything derived from it. The
//! compiled pipeline is built eagerly so configuration errors surface at
//! construction; the forwarding analysis and the fast-path descriptor are
//! computed on first use. Derived artifacts are pure functions of the chain,
//! so when threads race on first use the first stored value wins and the
//! others are dropped.

use std::sync::OnceLock;

use serde::Serialize;

use super::analysis::{analyze, ForwardingAnalysisResult, SentinelCategory};
use super::compiled_pipeline::CompiledPipeline;
use super::compiler::PipelineCompiler;
use super::context::CastContext;
use super::error::PipelineResult;
use super::fast_path::{recognize, FastPathDescriptor};
use super::message::Diagnostic;
use super::step::Chain;
use crate::config::CastSettings;
use crate::types::{Logical, Value};

/// How a cast produced its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CastRoute {
    /// Returned unchanged (or converted to a boolean) by the forwarding bypass
    Forwarded,
    FastPath,
    Pipeline,
}

/// A successful cast: the value plus any warnings raised on the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastOutcome {
    pub value: Value,
    pub warnings: Vec<Diagnostic>,
    pub route: CastRoute,
}

/// A compiled, cached cast for one argument
#[derive(Debug)]
pub struct ArgumentCast {
    name: String,
    chain: Chain,
    settings: CastSettings,
    pipeline: CompiledPipeline,
    analysis: OnceLock<ForwardingAnalysisResult>,
    fast_path: OnceLock<Option<FastPathDescriptor>>,
}

impl ArgumentCast {
    /// Compile `chain` for the argument `name`
    pub fn new(
        name: impl Into<String>,
        chain: Chain,
        settings: CastSettings,
    ) -> PipelineResult<Self> {
        let name = name.into();
        let compiler = PipelineCompiler::new(settings.default_message());
        let pipeline = compiler.compile(&chain)?;
        tracing::debug!(
            "Argument '{}' compiled ({} steps, forwarding={}, fast_path={})",
            name,
            chain.len(),
            settings.forwarding,
            settings.fast_path
        );
        Ok(Self {
            name,
            chain,
            settings,
            pipeline,
            analysis: OnceLock::new(),
            fast_path: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn settings(&self) -> &CastSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &CompiledPipeline {
        &self.pipeline
    }

    /// Forwarding verdicts, computed on first use
    pub fn analysis(&self) -> &ForwardingAnalysisResult {
        if let Some(result) = self.analysis.get() {
            return result;
        }
        let computed = analyze(&self.chain, self.settings.max_conditional_steps);
        if self.analysis.set(computed).is_err() {
            tracing::trace!("Forwarding analysis for '{}' already cached", self.name);
        }
        self.analysis.get().unwrap_or(&BLOCKED)
    }

    /// Fast-path descriptor, computed on first use
    pub fn fast_path(&self) -> Option<&FastPathDescriptor> {
        if let Some(descriptor) = self.fast_path.get() {
            return descriptor.as_ref();
        }
        let computed = recognize(&self.chain, &self.pipeline);
        if self.fast_path.set(computed).is_err() {
            tracing::trace!("Fast path for '{}' already cached", self.name);
        }
        self.fast_path.get().and_then(Option::as_ref)
    }

    /// Forwarded result for `value`, if the bypass applies
    fn forward(&self, value: &Value) -> Option<Value> {
        let category = SentinelCategory::of(value)?;
        let analysis = self.analysis();
        if analysis.forwards(category) {
            return Some(value.clone());
        }
        match value {
            Value::Logical(l) if analysis.logical_to_boolean => {
                Some(Value::Boolean(*l == Logical::True))
            }
            _ => None,
        }
    }

    /// Cast one value.
    ///
    /// The forwarding bypass is consulted first, then the fast path, then the
    /// general pipeline. All three produce the same observable result.
    pub fn cast(&self, value: Value) -> PipelineResult<CastOutcome> {
        if self.settings.forwarding {
            if let Some(value) = self.forward(&value) {
                tracing::trace!("'{}': forwarded {}", self.name, value);
                return Ok(CastOutcome {
                    value,
                    warnings: Vec::new(),
                    route: CastRoute::Forwarded,
                });
            }
        }

        let mut ctx = CastContext::new(&self.name);

        if self.settings.fast_path {
            if let Some(result) = self
                .fast_path()
                .and_then(|descriptor| descriptor.execute(&value, &mut ctx))
            {
                let value = result?;
                return Ok(CastOutcome {
                    value,
                    warnings: ctx.into_warnings(),
                    route: CastRoute::FastPath,
                });
            }
        }

        let value = self.pipeline.execute(value, &mut ctx)?;
        Ok(CastOutcome {
            value,
            warnings: ctx.into_warnings(),
            route: CastRoute::Pipeline,
        })
    }

    /// Run only the general pipeline, bypassing both shortcuts
    pub fn cast_general(&self, value: Value) -> PipelineResult<CastOutcome> {
        let mut ctx = CastContext::new(&self.name);
        let value = self.pipeline.execute(value, &mut ctx)?;
        Ok(CastOutcome {
            value,
            warnings: ctx.into_warnings(),
            route: CastRoute::Pipeline,
        })
    }
}

static BLOCKED: ForwardingAnalysisResult = ForwardingAnalysisResult {
    null: false,
    missing: false,
    integer: false,
    logical: false,
    logical_to_boolean: false,
    double: false,
    complex: false,
    string: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::filter::Filter;
    use crate::pipeline::mapper::Mapper;
    use crate::pipeline::step::{CoercionStep, FindFirstStep, MapIfStep, Step};
    use crate::types::{SemanticType, VectorData};

    fn flag_chain() -> Chain {
        Chain::new(vec![
            Step::Coercion(CoercionStep::vector(SemanticType::Logical)),
            Step::FindFirst(FindFirstStep {
                default_value: Some(Value::Logical(Logical::Na)),
                element_type: SemanticType::Logical,
                on_empty_message: None,
            }),
            Step::Map(Mapper::LogicalToBoolean),
        ])
    }

    #[test]
    fn test_routes() {
        let cast = ArgumentCast::new("flag", flag_chain(), CastSettings::default()).unwrap();

        let out = cast.cast(Value::Logical(Logical::True)).unwrap();
        assert_eq!(out.value, Value::Boolean(true));
        assert_eq!(out.route, CastRoute::Forwarded);

        let out = cast
            .cast(Value::vector(VectorData::Logical(vec![Logical::False])))
            .unwrap();
        assert_eq!(out.value, Value::Boolean(false));
        assert_eq!(out.route, CastRoute::FastPath);

        let out = cast.cast(Value::Integer(1)).unwrap();
        assert_eq!(out.value, Value::Boolean(true));
        assert_eq!(out.route, CastRoute::Pipeline);
    }

    #[test]
    fn test_shortcuts_disabled() {
        let settings = CastSettings {
            forwarding: false,
            fast_path: false,
            ..CastSettings::default()
        };
        let cast = ArgumentCast::new("flag", flag_chain(), settings).unwrap();
        let out = cast.cast(Value::Logical(Logical::True)).unwrap();
        assert_eq!(out.route, CastRoute::Pipeline);
        assert_eq!(out.value, Value::Boolean(true));
    }

    #[test]
    fn test_configuration_error_is_eager() {
        let chain = Chain::new(vec![Step::MapIf(MapIfStep {
            condition: Filter::semantic_type(SemanticType::Any),
            true_branch: Chain::default(),
            false_branch: Chain::default(),
            short_circuit: false,
        })]);
        assert!(ArgumentCast::new("x", chain, CastSettings::default()).is_err());
    }

    #[test]
    fn test_caches_are_stable() {
        let cast = ArgumentCast::new("flag", flag_chain(), CastSettings::default()).unwrap();
        let first = *cast.analysis();
        assert_eq!(*cast.analysis(), first);
        assert!(std::ptr::eq(cast.fast_path().unwrap(), cast.fast_path().unwrap()));
    }
}
