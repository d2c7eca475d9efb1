use super::compiled_pipeline::{
    CastUnit, CompiledChain, CompiledPipeline, ConditionalUnit, FilterUnit, FindFirstUnit,
    NaPolicy, PipelineStats,
};
use super::coercion::CoercionSpec;
use super::error::{PipelineError, PipelineResult};
use super::filter::{Filter, FilterKind};
use super::mapper::Mapper;
use super::message::MessageTemplate;
use super::predicate::Condition;
use super::step::{Chain, CoercionStep, FindFirstStep, NotNaStep, Step};
use crate::types::{SemanticType, Value};

/// Compiler state threaded through a walk of the step chain.
///
/// Each step maps one state to the next; nothing is mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerState {
    pub default_error: Option<MessageTemplate>,
    pub default_warning: Option<MessageTemplate>,
    /// Filters box bare scalars before testing them
    pub box_primitives: bool,
    /// Element type every non-NULL value is known to have at this point
    pub value_type: Option<SemanticType>,
}

impl CompilerState {
    /// State after `step`
    pub fn advance(&self, step: &Step) -> CompilerState {
        let mut next = self.clone();
        match step {
            Step::DefaultErrorMessage(message) => next.default_error = Some(message.clone()),
            Step::DefaultWarningMessage(message) => next.default_warning = Some(message.clone()),
            Step::Coercion(coercion) => {
                next.box_primitives = true;
                next.value_type = match coercion.target {
                    SemanticType::Any | SemanticType::List => None,
                    target => Some(target),
                };
            }
            Step::AttributableCoercion(_) => next.box_primitives = true,
            Step::FindFirst(find_first) => {
                next.box_primitives = false;
                next.value_type = Self::merge_constant(self.value_type, &find_first.default_value);
            }
            Step::NotNa(not_na) => {
                next.value_type = Self::merge_constant(self.value_type, &not_na.replacement);
            }
            Step::Map(mapper) => next.value_type = Self::mapped_type(mapper),
            Step::MapIf(map_if) => {
                let taken = self.advance_chain(&map_if.true_branch);
                let skipped = self.advance_chain(&map_if.false_branch);
                next.box_primitives = taken.box_primitives || skipped.box_primitives;
                next.value_type = if map_if.short_circuit || taken.value_type == skipped.value_type
                {
                    skipped.value_type
                } else {
                    None
                };
            }
            Step::Filter(_) | Step::BoxPrimitive => {}
        }
        next
    }

    /// Known type once `constant` may replace the current value
    fn merge_constant(
        current: Option<SemanticType>,
        constant: &Option<Value>,
    ) -> Option<SemanticType> {
        match constant {
            None | Some(Value::Null) => current,
            Some(value) if value.semantic_type() == current => current,
            Some(_) => None,
        }
    }

    fn mapped_type(mapper: &Mapper) -> Option<SemanticType> {
        match mapper {
            Mapper::ToConstant(constant) => constant.semantic_type(),
            Mapper::LogicalToBoolean => None,
            Mapper::DoubleToIntWithNa | Mapper::CharAtIndex { .. } => Some(SemanticType::Integer),
        }
    }

    /// State after every step of `chain`
    pub fn advance_chain(&self, chain: &Chain) -> CompilerState {
        chain
            .iter()
            .fold(self.clone(), |state, step| state.advance(step))
    }

    fn error_message(
        &self,
        local: Option<&MessageTemplate>,
        fallback: &MessageTemplate,
    ) -> MessageTemplate {
        local
            .or(self.default_error.as_ref())
            .unwrap_or(fallback)
            .clone()
    }

    fn warning_message(
        &self,
        local: Option<&MessageTemplate>,
        fallback: &MessageTemplate,
    ) -> MessageTemplate {
        local
            .or(self.default_warning.as_ref())
            .unwrap_or(fallback)
            .clone()
    }
}

/// Lowers a step chain into a [`CompiledPipeline`]
#[derive(Debug, Clone)]
pub struct PipelineCompiler {
    default_message: MessageTemplate,
}

impl Default for PipelineCompiler {
    fn default() -> Self {
        Self::new(MessageTemplate::invalid_argument())
    }
}

impl PipelineCompiler {
    /// Create a compiler using `default_message` when neither the step nor
    /// the chain supplies one
    pub fn new(default_message: MessageTemplate) -> Self {
        Self { default_message }
    }

    pub fn default_message(&self) -> &MessageTemplate {
        &self.default_message
    }

    /// Compile a step chain.
    ///
    /// Every filter, mapper and coercion is validated here; a combination
    /// without an implementation fails with
    /// [`PipelineError::InternalConfiguration`] instead of at call time.
    pub fn compile(&self, chain: &Chain) -> PipelineResult<CompiledPipeline> {
        let start_time = std::time::Instant::now();

        let (root, _) = self.compile_chain(chain, CompilerState::default())?;

        let mut stats = PipelineStats::default();
        Self::count_units(&root, &mut stats);
        stats.compile_time_us = start_time.elapsed().as_micros() as u64;

        tracing::debug!(
            "Compiled pipeline: {} units ({} conditional) in {}us",
            stats.units,
            stats.conditionals,
            stats.compile_time_us
        );

        Ok(CompiledPipeline { root, stats })
    }

    /// Compile a chain starting from `state`, returning the units and the final state
    pub fn compile_chain(
        &self,
        chain: &Chain,
        state: CompilerState,
    ) -> PipelineResult<(CompiledChain, CompilerState)> {
        let mut units = Vec::with_capacity(chain.len());
        let mut state = state;
        for step in chain {
            if let Some(unit) = self.compile_step(step, &state)? {
                units.push(unit);
            }
            state = state.advance(step);
        }
        Ok((CompiledChain::new(units), state))
    }

    /// Compile a single step under `state`; metadata steps emit no unit
    fn compile_step(&self, step: &Step, state: &CompilerState) -> PipelineResult<Option<CastUnit>> {
        let unit = match step {
            Step::DefaultErrorMessage(_) | Step::DefaultWarningMessage(_) => return Ok(None),
            Step::Coercion(coercion) => CastUnit::Coerce(Self::coercion_spec(coercion)?),
            Step::AttributableCoercion(step) => CastUnit::Attributable(*step),
            Step::BoxPrimitive => CastUnit::BoxPrimitive,
            Step::FindFirst(find_first) => {
                CastUnit::FindFirst(self.find_first_unit(find_first, state)?)
            }
            Step::NotNa(not_na) => CastUnit::NotNa(self.na_policy(not_na, state)?),
            Step::Map(mapper) => {
                Self::validate_mapper(mapper, state)?;
                CastUnit::Map(mapper.clone())
            }
            Step::Filter(filter) => {
                let message = if filter.is_warning {
                    state.warning_message(filter.on_fail_message.as_ref(), &self.default_message)
                } else {
                    state.error_message(filter.on_fail_message.as_ref(), &self.default_message)
                };
                Self::validate_filter(&filter.condition, state)?;
                CastUnit::Filter(FilterUnit {
                    condition: Condition::new(&filter.condition, state.box_primitives)?,
                    message,
                    is_warning: filter.is_warning,
                })
            }
            Step::MapIf(map_if) => {
                Self::validate_filter(&map_if.condition, state)?;
                let (true_branch, _) = self.compile_chain(&map_if.true_branch, state.clone())?;
                let (false_branch, _) = self.compile_chain(&map_if.false_branch, state.clone())?;
                CastUnit::Conditional(ConditionalUnit {
                    condition: Condition::new(&map_if.condition, false)?,
                    true_branch,
                    false_branch,
                    short_circuit: map_if.short_circuit,
                })
            }
        };
        Ok(Some(unit))
    }

    fn coercion_spec(step: &CoercionStep) -> PipelineResult<CoercionSpec> {
        if step.target == SemanticType::Any && !step.vector_coercion {
            return Err(PipelineError::configuration(
                "coercion",
                "scalar coercion requires a concrete target type",
            ));
        }
        Ok(CoercionSpec {
            target: step.target,
            vector_coercion: step.vector_coercion,
            preserve_names: step.preserve_names,
            preserve_dims: step.preserve_dims,
            preserve_attrs: step.preserve_attrs,
            preserve_non_vector: step.preserve_non_vector,
        })
    }

    fn find_first_unit(
        &self,
        step: &FindFirstStep,
        state: &CompilerState,
    ) -> PipelineResult<FindFirstUnit> {
        if let Some(default) = &step.default_value {
            let accepted = match default {
                Value::Null => true,
                v if v.is_scalar() => {
                    step.element_type == SemanticType::Any
                        || v.semantic_type() == Some(step.element_type)
                }
                _ => false,
            };
            if !accepted {
                return Err(PipelineError::configuration(
                    "find_first",
                    format!(
                        "default value {} does not match element type {}",
                        default, step.element_type
                    ),
                ));
            }
        }
        Ok(FindFirstUnit {
            default_value: step.default_value.clone(),
            element_type: step.element_type,
            message: state.error_message(
                step.on_empty_message.as_ref(),
                &MessageTemplate::length_zero(),
            ),
            warn_on_default: step.on_empty_message.is_some(),
        })
    }

    fn na_policy(&self, step: &NotNaStep, state: &CompilerState) -> PipelineResult<NaPolicy> {
        Ok(match &step.replacement {
            None => NaPolicy::Reject(
                state.error_message(step.on_na_message.as_ref(), &self.default_message),
            ),
            Some(value) if value.is_scalar() => NaPolicy::Replace {
                value: value.clone(),
                warning: step.on_na_message.clone(),
            },
            Some(value) => {
                return Err(PipelineError::configuration(
                    "not_na",
                    format!("replacement {} is not a scalar", value),
                ))
            }
        })
    }

    fn validate_mapper(mapper: &Mapper, state: &CompilerState) -> PipelineResult<()> {
        let domain = match mapper {
            Mapper::ToConstant(Value::Missing) => {
                return Err(PipelineError::configuration(
                    "map",
                    "cannot map to the missing marker",
                ))
            }
            Mapper::ToConstant(_) => return Ok(()),
            Mapper::LogicalToBoolean => SemanticType::Logical,
            Mapper::DoubleToIntWithNa => SemanticType::Double,
            Mapper::CharAtIndex { .. } => SemanticType::Character,
        };
        match state.value_type {
            Some(ty) if ty != domain => Err(PipelineError::configuration(
                "map",
                format!("{} mapper applied to {} values", mapper.name(), ty),
            )),
            _ => Ok(()),
        }
    }

    /// Reject double-only filters on values known to be of another type
    fn validate_filter(filter: &Filter, state: &CompilerState) -> PipelineResult<()> {
        match state.value_type {
            Some(ty) if ty != SemanticType::Double && Self::tests_double(filter) => {
                Err(PipelineError::configuration(
                    "filter",
                    format!("double filter applied to {} values", ty),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Whether `filter` runs a double test on the value itself (type-guarded tests excluded)
    fn tests_double(filter: &Filter) -> bool {
        match filter.kind() {
            FilterKind::Double(_) => true,
            FilterKind::And(l, r) | FilterKind::Or(l, r) => {
                Self::tests_double(l) || Self::tests_double(r)
            }
            FilterKind::Not(f) => Self::tests_double(f),
            _ => false,
        }
    }

    fn count_units(chain: &CompiledChain, stats: &mut PipelineStats) {
        for unit in chain.units() {
            stats.units += 1;
            if let CastUnit::Conditional(conditional) = unit {
                stats.conditionals += 1;
                Self::count_units(&conditional.true_branch, stats);
                Self::count_units(&conditional.false_branch, stats);
            }
        }
    }
}
