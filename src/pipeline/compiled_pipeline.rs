//! Executable form of a step chain.
//!
//! Units mirror the step tree with metadata steps erased. A unit returns
//! `ControlFlow::Break` when a short-circuiting conditional took its true
//! branch; enclosing chains stop applying units and pass the break up.

use std::ops::ControlFlow;

use crate::pipeline::coercion::{coerce, CoercionSpec};
use crate::pipeline::context::CastContext;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::mapper::Mapper;
use crate::pipeline::message::{MessageTemplate, CANNOT_COERCE};
use crate::pipeline::predicate::Condition;
use crate::pipeline::step::AttributableCoercionStep;
use crate::types::{Logical, SemanticType, Value, Vector, INT_NA};

/// Result of running a unit: continue with a value, or stop the whole pipeline with one
pub type Flow = ControlFlow<Value, Value>;

/// `FindFirst` with its message already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FindFirstUnit {
    pub default_value: Option<Value>,
    pub element_type: SemanticType,
    pub message: MessageTemplate,
    /// Warn when the default is substituted; only when the step had its own message
    pub warn_on_default: bool,
}

impl FindFirstUnit {
    fn on_empty(&self, ctx: &mut CastContext<'_>) -> PipelineResult<Value> {
        match &self.default_value {
            Some(default) => {
                if self.warn_on_default {
                    ctx.warn(&self.message);
                }
                Ok(default.clone())
            }
            None => Err(ctx.error(&self.message)),
        }
    }

    pub fn execute(&self, value: Value, ctx: &mut CastContext<'_>) -> PipelineResult<Value> {
        match value {
            Value::Null | Value::Missing => self.on_empty(ctx),
            Value::Vector(ref v) => match v.data.get(0) {
                Some(first) => Ok(first),
                None => self.on_empty(ctx),
            },
            Value::Opaque(_) => Err(ctx.error(&self.message)),
            scalar => Ok(scalar),
        }
    }
}

/// What a `NotNA` unit does when it meets NA
#[derive(Debug, Clone, PartialEq)]
pub enum NaPolicy {
    Reject(MessageTemplate),
    Replace {
        value: Value,
        warning: Option<MessageTemplate>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterUnit {
    pub condition: Condition,
    pub message: MessageTemplate,
    pub is_warning: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalUnit {
    pub condition: Condition,
    pub true_branch: CompiledChain,
    pub false_branch: CompiledChain,
    pub short_circuit: bool,
}

/// One executable unit
#[derive(Debug, Clone, PartialEq)]
pub enum CastUnit {
    Coerce(CoercionSpec),
    Attributable(AttributableCoercionStep),
    BoxPrimitive,
    FindFirst(FindFirstUnit),
    NotNa(NaPolicy),
    Filter(FilterUnit),
    Map(Mapper),
    Conditional(ConditionalUnit),
}

impl CastUnit {
    pub fn name(&self) -> &'static str {
        match self {
            CastUnit::Coerce(_) => "coercion",
            CastUnit::Attributable(_) => "attributable_coercion",
            CastUnit::BoxPrimitive => "box_primitive",
            CastUnit::FindFirst(_) => "find_first",
            CastUnit::NotNa(_) => "not_na",
            CastUnit::Filter(_) => "filter",
            CastUnit::Map(_) => "map",
            CastUnit::Conditional(_) => "map_if",
        }
    }

    pub fn execute(&self, value: Value, ctx: &mut CastContext<'_>) -> PipelineResult<Flow> {
        let out = match self {
            CastUnit::Coerce(spec) => coerce(value, spec, ctx)?,
            CastUnit::Attributable(step) => make_attributable(value, step, ctx)?,
            CastUnit::BoxPrimitive => value.boxed(),
            CastUnit::FindFirst(unit) => unit.execute(value, ctx)?,
            CastUnit::NotNa(policy) => {
                if matches!(value, Value::Null | Value::Missing) || !value.is_na() {
                    value
                } else {
                    match policy {
                        NaPolicy::Reject(message) => return Err(ctx.error(message)),
                        NaPolicy::Replace { value, warning } => {
                            if let Some(warning) = warning {
                                ctx.warn(warning);
                            }
                            value.clone()
                        }
                    }
                }
            }
            CastUnit::Filter(unit) => {
                if !unit.condition.evaluate(&value) {
                    if unit.is_warning {
                        ctx.warn(&unit.message);
                    } else {
                        return Err(ctx.error(&unit.message));
                    }
                }
                value
            }
            CastUnit::Map(mapper) => apply_mapper(mapper, value),
            CastUnit::Conditional(unit) => {
                let taken = unit.condition.evaluate(&value);
                let branch = if taken {
                    &unit.true_branch
                } else {
                    &unit.false_branch
                };
                return Ok(match branch.execute(value, ctx)? {
                    ControlFlow::Continue(v) if taken && unit.short_circuit => {
                        ControlFlow::Break(v)
                    }
                    flow => flow,
                });
            }
        };
        Ok(ControlFlow::Continue(out))
    }
}

fn make_attributable(
    value: Value,
    step: &AttributableCoercionStep,
    ctx: &CastContext<'_>,
) -> PipelineResult<Value> {
    match value {
        Value::Null | Value::Missing => Ok(value),
        Value::Opaque(_) => Err(ctx.error(
            &MessageTemplate::new(CANNOT_COERCE)
                .with_text(value.type_name())
                .with_text(SemanticType::Any.name()),
        )),
        Value::Boolean(b) => Ok(Value::Logical(b.into()).boxed()),
        Value::Vector(v) => {
            let Vector {
                data,
                names,
                dims,
                attributes,
            } = v;
            let mut out = Vector::new(data);
            if step.preserve_names {
                out.names = names;
            }
            if step.preserve_dims {
                out.dims = dims;
            }
            if step.preserve_attrs {
                out.attributes = attributes;
            }
            Ok(Value::Vector(out))
        }
        scalar => Ok(scalar.boxed()),
    }
}

/// Apply a mapper.
///
/// The compiler rejects mappers on values of a known wrong type; inputs still
/// outside the domain (NULL, a missing argument) pass through unchanged.
pub fn apply_mapper(mapper: &Mapper, value: Value) -> Value {
    match mapper {
        Mapper::ToConstant(constant) => constant.clone(),
        Mapper::LogicalToBoolean => match value {
            Value::Boolean(_) => value,
            other => match other.as_scalar() {
                Some(Value::Logical(l)) => Value::Boolean(l == Logical::True),
                _ => other,
            },
        },
        Mapper::DoubleToIntWithNa => match value.as_scalar() {
            Some(Value::Double(d)) => {
                let truncated = d.trunc();
                if d.is_nan() || truncated <= INT_NA as f64 || truncated > i32::MAX as f64 {
                    Value::Integer(INT_NA)
                } else {
                    Value::Integer(truncated as i32)
                }
            }
            _ => value,
        },
        Mapper::CharAtIndex {
            index,
            default_if_empty,
        } => match value.as_scalar() {
            Some(Value::Str(None)) => Value::Integer(INT_NA),
            Some(Value::Str(Some(s))) => Value::Integer(
                s.chars()
                    .nth(*index)
                    .map(|c| c as i32)
                    .unwrap_or(*default_if_empty),
            ),
            _ => value,
        },
    }
}

/// A compiled chain: units applied left to right
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledChain {
    units: Vec<CastUnit>,
}

impl CompiledChain {
    pub fn new(units: Vec<CastUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[CastUnit] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units after position `index` as a chain of their own
    pub(crate) fn tail(&self, index: usize) -> CompiledChain {
        Self::new(self.units.get(index + 1..).unwrap_or_default().to_vec())
    }

    pub fn execute(&self, value: Value, ctx: &mut CastContext<'_>) -> PipelineResult<Flow> {
        let mut current = value;
        for unit in &self.units {
            match unit.execute(current, ctx)? {
                ControlFlow::Continue(next) => current = next,
                stop @ ControlFlow::Break(_) => return Ok(stop),
            }
        }
        Ok(ControlFlow::Continue(current))
    }

    /// Run to completion; a short-circuit result is the final result
    pub fn run(&self, value: Value, ctx: &mut CastContext<'_>) -> PipelineResult<Value> {
        Ok(match self.execute(value, ctx)? {
            ControlFlow::Continue(v) | ControlFlow::Break(v) => v,
        })
    }
}

/// Statistics about a compiled pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Units across the whole tree, nested branches included
    pub units: usize,

    /// Number of conditional units
    pub conditionals: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

/// The executable form of a whole step chain. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub root: CompiledChain,
    pub stats: PipelineStats,
}

impl CompiledPipeline {
    pub fn execute(&self, value: Value, ctx: &mut CastContext<'_>) -> PipelineResult<Value> {
        self.root.run(value, ctx)
    }
}
