//! Branch-enumeration forwarding analysis.
//!
//! For each sentinel category a symbolic seed is pushed through the step
//! chain once per combination of conditional branch choices. A category is
//! forwarded when every feasible path hands the seed back untouched (or, for
//! `logical_to_boolean`, converted by a single `LogicalToBoolean` map).
//!
//! Conditionals are numbered in pre-order over the whole step tree, true
//! branch before false branch, so bit `i` of a mask always belongs to the same
//! `MapIf`. A conditional that a path never reaches simply ignores its bit.

use std::ops::ControlFlow;

use serde::Serialize;

use super::compiler::CompilerState;
use super::filter::{CompareSubject, Filter, FilterKind, Tristate, ValueClass};
use super::mapper::Mapper;
use super::step::{Chain, Step};
use crate::types::{Complex, Logical, SemanticType, Value};

/// Input classes the forwarding bypass can dispatch on without inspecting the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelCategory {
    Null,
    Missing,
    Integer,
    Logical,
    Double,
    Complex,
    Character,
}

impl SentinelCategory {
    pub const ALL: [SentinelCategory; 7] = [
        SentinelCategory::Null,
        SentinelCategory::Missing,
        SentinelCategory::Integer,
        SentinelCategory::Logical,
        SentinelCategory::Double,
        SentinelCategory::Complex,
        SentinelCategory::Character,
    ];

    /// Category of a runtime value; only sentinels and bare scalars have one
    pub fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => SentinelCategory::Null,
            Value::Missing => SentinelCategory::Missing,
            Value::Integer(_) => SentinelCategory::Integer,
            Value::Logical(_) => SentinelCategory::Logical,
            Value::Double(_) => SentinelCategory::Double,
            Value::Complex(_) => SentinelCategory::Complex,
            Value::Str(_) => SentinelCategory::Character,
            _ => return None,
        })
    }

    fn scalar_type(self) -> Option<SemanticType> {
        match self {
            SentinelCategory::Null | SentinelCategory::Missing => None,
            SentinelCategory::Integer => Some(SemanticType::Integer),
            SentinelCategory::Logical => Some(SemanticType::Logical),
            SentinelCategory::Double => Some(SemanticType::Double),
            SentinelCategory::Complex => Some(SemanticType::Complex),
            SentinelCategory::Character => Some(SemanticType::Character),
        }
    }

    /// A concrete, non-NA value of this category
    pub fn representative(self) -> Value {
        match self {
            SentinelCategory::Null => Value::Null,
            SentinelCategory::Missing => Value::Missing,
            SentinelCategory::Integer => Value::Integer(42),
            SentinelCategory::Logical => Value::Logical(Logical::True),
            SentinelCategory::Double => Value::Double(2.5),
            SentinelCategory::Complex => Value::Complex(Complex::new(1.0, -1.0)),
            SentinelCategory::Character => Value::string("abc"),
        }
    }
}

/// Per-category verdict: forwarded unchanged under every reachable branch combination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwardingAnalysisResult {
    pub null: bool,
    pub missing: bool,
    pub integer: bool,
    pub logical: bool,
    /// Logical scalars forwarded through exactly one `LogicalToBoolean` conversion
    pub logical_to_boolean: bool,
    pub double: bool,
    pub complex: bool,
    pub string: bool,
}

impl ForwardingAnalysisResult {
    /// Nothing forwarded
    pub fn blocked() -> Self {
        Self::default()
    }

    pub fn forwards(&self, category: SentinelCategory) -> bool {
        match category {
            SentinelCategory::Null => self.null,
            SentinelCategory::Missing => self.missing,
            SentinelCategory::Integer => self.integer,
            SentinelCategory::Logical => self.logical,
            SentinelCategory::Double => self.double,
            SentinelCategory::Complex => self.complex,
            SentinelCategory::Character => self.string,
        }
    }

    /// True if any category is forwarded
    pub fn any(&self) -> bool {
        self.null
            || self.missing
            || self.integer
            || self.logical
            || self.logical_to_boolean
            || self.double
            || self.complex
            || self.string
    }
}

/// Symbolic value of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbolic {
    /// Still the input value
    Seed,
    /// The input after `LogicalToBoolean`
    ToBoolean,
    /// Anything else: changed, replaced, or possibly an error
    Unknown,
}

/// Outcome of one branch combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// A branch choice contradicts a condition decided statically for the seed
    Infeasible,
    Reached(Symbolic),
}

#[derive(Debug, Clone, Copy)]
struct Trace {
    value: Symbolic,
    boxing: bool,
}

enum Exit {
    ShortCircuit(Trace),
    Infeasible,
}

/// Walks one step chain for one category and one branch mask
struct PathWalker {
    category: SentinelCategory,
    mask: u64,
}

impl PathWalker {
    fn bit(&self, index: usize) -> bool {
        (self.mask >> index) & 1 == 1
    }

    /// Walk `chain`; `base` is the pre-order index of its first conditional
    fn walk(&self, chain: &Chain, trace: Trace, base: usize) -> ControlFlow<Exit, Trace> {
        let mut trace = trace;
        let mut next_index = base;
        let mut state = CompilerState {
            box_primitives: trace.boxing,
            ..CompilerState::default()
        };
        for step in chain {
            if let Step::MapIf(map_if) = step {
                let index = next_index;
                let true_base = index + 1;
                let false_base = true_base + map_if.true_branch.conditional_count();
                next_index = false_base + map_if.false_branch.conditional_count();

                let take_true = self.bit(index);
                if let Some(decided) = static_outcome(&map_if.condition, self.category, false).known() {
                    if trace.value == Symbolic::Seed && decided != take_true {
                        return ControlFlow::Break(Exit::Infeasible);
                    }
                }
                let (branch, branch_base) = if take_true {
                    (&map_if.true_branch, true_base)
                } else {
                    (&map_if.false_branch, false_base)
                };
                match self.walk(branch, trace, branch_base) {
                    ControlFlow::Continue(out) if take_true && map_if.short_circuit => {
                        return ControlFlow::Break(Exit::ShortCircuit(out));
                    }
                    ControlFlow::Continue(out) => trace.value = out.value,
                    exit @ ControlFlow::Break(_) => return exit,
                }
            } else if trace.value != Symbolic::Unknown {
                trace.value = self.transfer(step, trace);
            }
            state = state.advance(step);
            trace.boxing = state.box_primitives;
        }
        ControlFlow::Continue(trace)
    }

    /// Effect of a non-conditional step on a symbolic value
    fn transfer(&self, step: &Step, trace: Trace) -> Symbolic {
        use Symbolic::{Seed, ToBoolean, Unknown};

        if step.is_metadata() {
            return trace.value;
        }
        if trace.value == ToBoolean {
            return Unknown;
        }
        let sentinel = self.category.scalar_type().is_none();
        match step {
            Step::Coercion(coercion) => match self.category.scalar_type() {
                None if coercion.preserve_non_vector => Seed,
                Some(ty) if coercion.target == SemanticType::Any || coercion.target == ty => Seed,
                _ => Unknown,
            },
            Step::AttributableCoercion(_) | Step::BoxPrimitive => {
                if sentinel {
                    Seed
                } else {
                    Unknown
                }
            }
            Step::FindFirst(find_first) => match self.category {
                SentinelCategory::Null
                    if find_first.default_value == Some(Value::Null)
                        && find_first.on_empty_message.is_none() =>
                {
                    Seed
                }
                SentinelCategory::Null | SentinelCategory::Missing => Unknown,
                _ => Seed,
            },
            Step::NotNa(_) => {
                if sentinel {
                    Seed
                } else {
                    Unknown
                }
            }
            Step::Map(Mapper::LogicalToBoolean) if self.category == SentinelCategory::Logical => {
                ToBoolean
            }
            Step::Map(_) => Unknown,
            Step::Filter(filter) => {
                match static_outcome(&filter.condition, self.category, trace.boxing) {
                    Tristate::True => Seed,
                    _ => Unknown,
                }
            }
            Step::MapIf(_) | Step::DefaultErrorMessage(_) | Step::DefaultWarningMessage(_) => {
                trace.value
            }
        }
    }
}

/// Outcome of `filter` for every value of `category`, when that is decidable
pub fn static_outcome(filter: &Filter, category: SentinelCategory, boxing: bool) -> Tristate {
    let Some(ty) = category.scalar_type() else {
        return match category {
            SentinelCategory::Null => filter.result_for_null(),
            _ => filter.result_for_missing(),
        };
    };
    match filter.kind() {
        FilterKind::Type { class, extra } => {
            let matches = match class {
                ValueClass::Scalar(t) => !boxing && *t == ty,
                ValueClass::Vector(t) => boxing && *t == ty,
                ValueClass::AnyVector => boxing,
                ValueClass::Null | ValueClass::Missing | ValueClass::Boolean | ValueClass::Opaque => {
                    false
                }
            };
            match (matches, extra) {
                (false, _) => Tristate::False,
                (true, None) => Tristate::True,
                (true, Some(extra)) => static_outcome(extra, category, boxing),
            }
        }
        FilterKind::SemanticType(t) => Tristate::from(*t == ty),
        FilterKind::Null | FilterKind::Missing => Tristate::False,
        FilterKind::Matrix(_) => Tristate::False,
        FilterKind::Compare {
            subject: CompareSubject::Dim { .. },
            ..
        } => Tristate::False,
        FilterKind::Compare { .. } | FilterKind::Double(_) => Tristate::Undefined,
        FilterKind::And(l, r) => {
            static_outcome(l, category, boxing).and(static_outcome(r, category, boxing))
        }
        FilterKind::Or(l, r) => {
            static_outcome(l, category, boxing).or(static_outcome(r, category, boxing))
        }
        FilterKind::Not(f) => static_outcome(f, category, boxing).not(),
    }
}

/// Runs every branch combination of a chain
#[derive(Debug, Clone, Copy)]
pub struct BranchEnumerator<'a> {
    chain: &'a Chain,
    conditionals: usize,
}

impl<'a> BranchEnumerator<'a> {
    pub fn new(chain: &'a Chain) -> Self {
        Self {
            chain,
            conditionals: chain.conditional_count(),
        }
    }

    /// Number of conditional steps, k
    pub fn conditionals(&self) -> usize {
        self.conditionals
    }

    /// One outcome per mask in `0..2^k`, mask 0 taking every false branch.
    ///
    /// Masks are `u64`, so chains with 64 or more conditionals yield no
    /// outcomes, which blocks every category.
    pub fn enumerate(&self, category: SentinelCategory) -> Vec<PathOutcome> {
        let Some(paths) = u32::try_from(self.conditionals)
            .ok()
            .and_then(|k| 1u64.checked_shl(k))
        else {
            tracing::debug!("Cannot enumerate {} conditional steps", self.conditionals);
            return Vec::new();
        };
        (0..paths)
            .map(|mask| self.walk_mask(category, mask))
            .collect()
    }

    /// Outcome of the single path selected by `mask`
    pub fn walk_mask(&self, category: SentinelCategory, mask: u64) -> PathOutcome {
        let walker = PathWalker { category, mask };
        let seed = Trace {
            value: Symbolic::Seed,
            boxing: false,
        };
        match walker.walk(self.chain, seed, 0) {
            ControlFlow::Continue(trace) | ControlFlow::Break(Exit::ShortCircuit(trace)) => {
                PathOutcome::Reached(trace.value)
            }
            ControlFlow::Break(Exit::Infeasible) => PathOutcome::Infeasible,
        }
    }

    /// True if every feasible path ends in `expected`
    fn all_paths(&self, category: SentinelCategory, expected: Symbolic) -> bool {
        let outcomes = self.enumerate(category);
        let mut reached = false;
        for outcome in outcomes {
            match outcome {
                PathOutcome::Infeasible => {}
                PathOutcome::Reached(value) if value == expected => reached = true,
                PathOutcome::Reached(_) => return false,
            }
        }
        reached
    }
}

/// Compute the forwarding verdicts for `chain`.
///
/// Chains with more than `max_conditionals` conditional steps are not
/// enumerated and every category is blocked.
pub fn analyze(chain: &Chain, max_conditionals: usize) -> ForwardingAnalysisResult {
    let enumerator = BranchEnumerator::new(chain);
    let k = enumerator.conditionals();
    if k > max_conditionals || k >= 64 {
        tracing::debug!(
            "Skipping forwarding analysis: {} conditional steps exceed the limit of {}",
            k,
            max_conditionals
        );
        return ForwardingAnalysisResult::blocked();
    }

    let identity = |category| enumerator.all_paths(category, Symbolic::Seed);
    let result = ForwardingAnalysisResult {
        null: identity(SentinelCategory::Null),
        missing: identity(SentinelCategory::Missing),
        integer: identity(SentinelCategory::Integer),
        logical: identity(SentinelCategory::Logical),
        logical_to_boolean: enumerator.all_paths(SentinelCategory::Logical, Symbolic::ToBoolean),
        double: identity(SentinelCategory::Double),
        complex: identity(SentinelCategory::Complex),
        string: identity(SentinelCategory::Character),
    };
    tracing::debug!("Forwarding analysis over {} paths: {:?}", 1u64 << k, result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::message::MessageTemplate;
    use crate::pipeline::step::{CoercionStep, FilterStep, FindFirstStep, MapIfStep, NotNaStep};

    fn map_if(condition: Filter, t: Vec<Step>, f: Vec<Step>, short_circuit: bool) -> Step {
        Step::MapIf(MapIfStep {
            condition,
            true_branch: t.into(),
            false_branch: f.into(),
            short_circuit,
        })
    }

    fn constant(v: Value) -> Step {
        Step::Map(Mapper::ToConstant(v))
    }

    #[test]
    fn test_enumeration_completeness() {
        let empty = Chain::default();
        assert_eq!(BranchEnumerator::new(&empty).enumerate(SentinelCategory::Null).len(), 1);

        let chain = Chain::new(vec![
            map_if(Filter::null(), vec![map_if(Filter::null(), vec![], vec![], false)], vec![], false),
            map_if(Filter::missing(), vec![], vec![], false),
        ]);
        let enumerator = BranchEnumerator::new(&chain);
        assert_eq!(enumerator.conditionals(), 3);
        assert_eq!(enumerator.enumerate(SentinelCategory::Integer).len(), 8);
    }

    #[test]
    fn test_string_only_pipeline_forwards_integer() {
        let chain = Chain::new(vec![map_if(
            Filter::semantic_type(SemanticType::Character),
            vec![Step::NotNa(NotNaStep {
                replacement: Some(Value::string("")),
                on_na_message: None,
            })],
            vec![],
            false,
        )]);
        let result = analyze(&chain, 4);
        assert!(result.integer);
        assert!(result.double);
        assert!(!result.string);
        assert!(result.null);
    }

    #[test]
    fn test_short_circuit_ends_path() {
        // Null takes the short-circuiting true branch, which is the identity
        let chain = Chain::new(vec![
            map_if(Filter::null(), vec![], vec![], true),
            constant(Value::Integer(99)),
        ]);
        let enumerator = BranchEnumerator::new(&chain);
        assert_eq!(
            enumerator.enumerate(SentinelCategory::Null),
            vec![PathOutcome::Infeasible, PathOutcome::Reached(Symbolic::Seed)]
        );
        let result = analyze(&chain, 4);
        assert!(result.null);
        assert!(!result.integer);
    }

    #[test]
    fn test_logical_to_boolean_conversion() {
        let chain = Chain::new(vec![
            Step::Coercion(CoercionStep::vector(SemanticType::Logical)),
            Step::FindFirst(FindFirstStep {
                default_value: Some(Value::Logical(Logical::Na)),
                element_type: SemanticType::Logical,
                on_empty_message: None,
            }),
            Step::Map(Mapper::LogicalToBoolean),
        ]);
        let result = analyze(&chain, 4);
        assert!(result.logical_to_boolean);
        assert!(!result.logical);
        assert!(!result.integer);
        assert!(!result.null);
    }

    #[test]
    fn test_filters_respect_boxing() {
        let vector_check = |boxed: bool| {
            let mut steps = Vec::new();
            if boxed {
                steps.push(Step::Coercion(CoercionStep::vector(SemanticType::Double)));
            }
            steps.push(Step::Filter(FilterStep {
                condition: Filter::type_of(ValueClass::Vector(SemanticType::Double)),
                on_fail_message: Some(MessageTemplate::new("not a vector")),
                is_warning: false,
            }));
            analyze(&Chain::new(steps), 4).double
        };
        assert!(vector_check(true));
        assert!(!vector_check(false));
    }

    #[test]
    fn test_too_many_conditionals_blocks_everything() {
        let steps = (0..3)
            .map(|_| map_if(Filter::null(), vec![], vec![], false))
            .collect::<Vec<_>>();
        let chain = Chain::new(steps);
        assert!(analyze(&chain, 4).integer);
        assert_eq!(analyze(&chain, 2), ForwardingAnalysisResult::blocked());
    }

    #[test]
    fn test_sixty_four_conditionals_do_not_overflow() {
        let steps = (0..64)
            .map(|_| map_if(Filter::null(), vec![], vec![], false))
            .collect::<Vec<_>>();
        let chain = Chain::new(steps);
        let enumerator = BranchEnumerator::new(&chain);
        assert_eq!(enumerator.conditionals(), 64);
        assert!(enumerator.enumerate(SentinelCategory::Integer).is_empty());
        assert_eq!(analyze(&chain, usize::MAX), ForwardingAnalysisResult::blocked());
    }
}
