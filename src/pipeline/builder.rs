//! Fluent construction of step chains.
//!
//! # Example
//!
//! ```
//! use argcast::pipeline::{Filter, PipelineBuilder};
//! use argcast::types::Value;
//!
//! // `digits`: an integer >= 0, NULL means "use the default of 7"
//! let chain = PipelineBuilder::new()
//!     .return_if(Filter::null(), |b| b.map_to(Value::Integer(7)))
//!     .as_integer_vector()
//!     .find_first()
//!     .must_not_be_na()
//!     .must_be(Filter::ge(Value::Integer(0)))
//!     .build();
//! assert_eq!(chain.conditional_count(), 1);
//! ```

use super::bypass::ArgumentCast;
use super::error::PipelineResult;
use super::filter::Filter;
use super::mapper::Mapper;
use super::message::MessageTemplate;
use super::step::{
    AttributableCoercionStep, Chain, CoercionStep, FilterStep, FindFirstStep, MapIfStep,
    NotNaStep, Step,
};
use crate::config::CastSettings;
use crate::types::{SemanticType, Value};

/// Builds a [`Chain`] one step at a time
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    chain: Chain,
    /// Element type of the last vector coercion, used by `find_first`
    element_type: Option<SemanticType>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append any step
    pub fn step(mut self, step: Step) -> Self {
        if let Step::Coercion(coercion) = &step {
            self.element_type = Some(coercion.target);
        }
        self.chain.push(step);
        self
    }

    /// Default error message for the steps that follow
    pub fn default_error(self, message: MessageTemplate) -> Self {
        self.step(Step::DefaultErrorMessage(message))
    }

    /// Default warning message for the steps that follow
    pub fn default_warning(self, message: MessageTemplate) -> Self {
        self.step(Step::DefaultWarningMessage(message))
    }

    pub fn coerce(self, coercion: CoercionStep) -> Self {
        self.step(Step::Coercion(coercion))
    }

    pub fn as_logical_vector(self) -> Self {
        self.coerce(CoercionStep::vector(SemanticType::Logical))
    }

    pub fn as_integer_vector(self) -> Self {
        self.coerce(CoercionStep::vector(SemanticType::Integer))
    }

    pub fn as_double_vector(self) -> Self {
        self.coerce(CoercionStep::vector(SemanticType::Double))
    }

    pub fn as_complex_vector(self) -> Self {
        self.coerce(CoercionStep::vector(SemanticType::Complex))
    }

    pub fn as_string_vector(self) -> Self {
        self.coerce(CoercionStep::vector(SemanticType::Character))
    }

    pub fn as_raw_vector(self) -> Self {
        self.coerce(CoercionStep::vector(SemanticType::Raw))
    }

    /// Vector coercion keeping names, dims and attributes
    pub fn as_vector_preserving(self, target: SemanticType) -> Self {
        self.coerce(CoercionStep::vector(target).preserving(true, true, true))
    }

    pub fn as_attributable(self, names: bool, dims: bool, attrs: bool) -> Self {
        self.step(Step::AttributableCoercion(AttributableCoercionStep {
            preserve_names: names,
            preserve_dims: dims,
            preserve_attrs: attrs,
        }))
    }

    fn first_step(&self, default_value: Option<Value>, message: Option<MessageTemplate>) -> Step {
        Step::FindFirst(FindFirstStep {
            default_value,
            element_type: self.element_type.unwrap_or(SemanticType::Any),
            on_empty_message: message,
        })
    }

    /// First element; empty input is an error
    pub fn find_first(self) -> Self {
        let step = self.first_step(None, None);
        self.step(step)
    }

    /// First element; empty input is an error with `message`
    pub fn find_first_or_error(self, message: MessageTemplate) -> Self {
        let step = self.first_step(None, Some(message));
        self.step(step)
    }

    /// First element, `default` for empty input
    pub fn find_first_or(self, default: Value) -> Self {
        let step = self.first_step(Some(default), None);
        self.step(step)
    }

    /// First element, `default` with a warning for empty input
    pub fn find_first_or_warn(self, default: Value, message: MessageTemplate) -> Self {
        let step = self.first_step(Some(default), Some(message));
        self.step(step)
    }

    fn filter(self, condition: Filter, message: Option<MessageTemplate>, is_warning: bool) -> Self {
        self.step(Step::Filter(FilterStep {
            condition,
            on_fail_message: message,
            is_warning,
        }))
    }

    /// Error unless `condition` holds
    pub fn must_be(self, condition: Filter) -> Self {
        self.filter(condition, None, false)
    }

    pub fn must_be_with(self, condition: Filter, message: MessageTemplate) -> Self {
        self.filter(condition, Some(message), false)
    }

    /// Warning unless `condition` holds
    pub fn should_be(self, condition: Filter) -> Self {
        self.filter(condition, None, true)
    }

    pub fn should_be_with(self, condition: Filter, message: MessageTemplate) -> Self {
        self.filter(condition, Some(message), true)
    }

    pub fn must_not_be_null(self) -> Self {
        self.must_be(Filter::null().not())
    }

    pub fn must_not_be_na(self) -> Self {
        self.step(Step::NotNa(NotNaStep {
            replacement: None,
            on_na_message: None,
        }))
    }

    pub fn must_not_be_na_with(self, message: MessageTemplate) -> Self {
        self.step(Step::NotNa(NotNaStep {
            replacement: None,
            on_na_message: Some(message),
        }))
    }

    /// Replace NA silently
    pub fn replace_na(self, replacement: Value) -> Self {
        self.step(Step::NotNa(NotNaStep {
            replacement: Some(replacement),
            on_na_message: None,
        }))
    }

    /// Replace NA with a warning
    pub fn replace_na_with(self, replacement: Value, message: MessageTemplate) -> Self {
        self.step(Step::NotNa(NotNaStep {
            replacement: Some(replacement),
            on_na_message: Some(message),
        }))
    }

    pub fn map(self, mapper: Mapper) -> Self {
        self.step(Step::Map(mapper))
    }

    pub fn map_to(self, constant: Value) -> Self {
        self.map(Mapper::ToConstant(constant))
    }

    pub fn as_boolean(self) -> Self {
        self.map(Mapper::LogicalToBoolean)
    }

    pub fn box_primitive(self) -> Self {
        self.step(Step::BoxPrimitive)
    }

    /// Conditional: run `on_true` or `on_false` depending on `condition`
    pub fn map_if<T, F>(self, condition: Filter, on_true: T, on_false: F) -> Self
    where
        T: FnOnce(PipelineBuilder) -> PipelineBuilder,
        F: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        self.conditional(condition, on_true, on_false, false)
    }

    /// Conditional whose true branch ends the whole pipeline
    pub fn return_if<T>(self, condition: Filter, on_true: T) -> Self
    where
        T: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        self.conditional(condition, on_true, |b| b, true)
    }

    /// Short-circuiting conditional with both branches
    pub fn return_if_else<T, F>(self, condition: Filter, on_true: T, on_false: F) -> Self
    where
        T: FnOnce(PipelineBuilder) -> PipelineBuilder,
        F: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        self.conditional(condition, on_true, on_false, true)
    }

    fn conditional<T, F>(self, condition: Filter, on_true: T, on_false: F, short_circuit: bool) -> Self
    where
        T: FnOnce(PipelineBuilder) -> PipelineBuilder,
        F: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        let element_type = self.element_type;
        let seed = || PipelineBuilder {
            chain: Chain::default(),
            element_type,
        };
        let true_branch = on_true(seed()).build();
        let false_branch = on_false(seed()).build();
        self.step(Step::MapIf(MapIfStep {
            condition,
            true_branch,
            false_branch,
            short_circuit,
        }))
    }

    pub fn build(self) -> Chain {
        self.chain
    }
}

/// A step chain bundled with the configuration of the argument it casts
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDeclaration {
    pub name: String,
    pub chain: Chain,
    pub settings: CastSettings,
}

impl ArgumentDeclaration {
    pub fn new(name: impl Into<String>, chain: Chain) -> Self {
        Self {
            name: name.into(),
            chain,
            settings: CastSettings::default(),
        }
    }

    /// Declare an argument by building its chain in place
    pub fn build(name: impl Into<String>, f: impl FnOnce(PipelineBuilder) -> PipelineBuilder) -> Self {
        Self::new(name, f(PipelineBuilder::new()).build())
    }

    pub fn with_settings(mut self, settings: CastSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Compile into a ready-to-use cast
    pub fn into_cast(self) -> PipelineResult<ArgumentCast> {
        ArgumentCast::new(self.name, self.chain, self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Logical;

    #[test]
    fn test_find_first_uses_coercion_type() {
        let chain = PipelineBuilder::new().as_double_vector().find_first().build();
        match &chain.steps()[1] {
            Step::FindFirst(ff) => assert_eq!(ff.element_type, SemanticType::Double),
            other => panic!("unexpected step {:?}", other),
        }

        let chain = PipelineBuilder::new().find_first().build();
        match &chain.steps()[0] {
            Step::FindFirst(ff) => assert_eq!(ff.element_type, SemanticType::Any),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_return_if_builds_short_circuit() {
        let chain = PipelineBuilder::new()
            .return_if(Filter::null(), |b| b.map_to(Value::Integer(0)))
            .map_to(Value::Integer(99))
            .build();
        match &chain.steps()[0] {
            Step::MapIf(map_if) => {
                assert!(map_if.short_circuit);
                assert_eq!(map_if.true_branch.len(), 1);
                assert!(map_if.false_branch.is_empty());
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_declaration_into_cast() {
        let decl = ArgumentDeclaration::build("na.rm", |b| {
            b.as_logical_vector()
                .find_first_or(Value::Logical(Logical::False))
                .as_boolean()
        });
        let cast = decl.into_cast().unwrap();
        assert_eq!(cast.name(), "na.rm");
        assert_eq!(cast.cast(Value::Null).unwrap().value, Value::Boolean(false));
    }
}
